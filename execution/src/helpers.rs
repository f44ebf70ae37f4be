//! Side effects shared by the battle handlers: spend accounting, health refresh and the
//! per-snapshot skill records.

use anyhow::{Context as _, Result};
use tracing::debug;
use wyvern_types::{
    dragon::Dragon,
    execution::{Key, TransactionContext, Value},
    DragonId, SnapshotId,
};

use crate::{
    chain::Chain,
    state::{load_dragon, save_dragon, State},
};

/// Adds what the sender paid for the transaction (value plus gas) to the dragon's total.
///
/// Only mutates the in-flight record; the caller saves it.
pub fn record_ether_spent(dragon: &mut Dragon, transaction: &TransactionContext) {
    dragon.ether_spent = dragon
        .ether_spent
        .saturating_add(transaction.total_cost());
}

/// Copies current health and mana from the chain onto a stored dragon.
///
/// Returns `false` without writing when the dragon is not stored.
pub fn refresh_health_and_mana<S: State + ?Sized, C: Chain + ?Sized>(
    state: &mut S,
    chain: &C,
    id: DragonId,
) -> Result<bool> {
    let Some(mut dragon) = load_dragon(state, id)? else {
        debug!(dragon = %id, "health refresh skipped; dragon not indexed");
        return Ok(false);
    };
    dragon.health = chain
        .health_and_mana(id)
        .with_context(|| format!("health and mana of dragon {id}"))?;
    save_dragon(state, dragon)?;
    Ok(true)
}

/// Writes the dragon's base skills under the snapshot key.
pub fn record_base_skills<S: State + ?Sized, C: Chain + ?Sized>(
    state: &mut S,
    chain: &C,
    id: DragonId,
    snapshot: SnapshotId,
) -> Result<()> {
    let skills = chain
        .skills(id)
        .with_context(|| format!("skills of dragon {id}"))?;
    state.insert(Key::Skills(snapshot), Value::Skills(skills))
}

/// Writes the dragon's special attack and special defense under the snapshot key.
pub fn record_special_skills<S: State + ?Sized, C: Chain + ?Sized>(
    state: &mut S,
    chain: &C,
    id: DragonId,
    snapshot: SnapshotId,
) -> Result<()> {
    let attack = chain
        .special_attack(id)
        .with_context(|| format!("special attack of dragon {id}"))?;
    let defense = chain
        .special_defense(id)
        .with_context(|| format!("special defense of dragon {id}"))?;
    state.insert(Key::SpecialAttack(snapshot), Value::SpecialAttack(attack))?;
    state.insert(Key::SpecialDefense(snapshot), Value::SpecialDefense(defense))
}
