use anyhow::{Context as _, Result};
use tracing::debug;
use wyvern_types::{
    dragon::DragonBattleSnapshot,
    execution::{Key, Value},
    BattleId, DragonId, SnapshotId,
};

use crate::{
    chain::Chain,
    helpers::{record_base_skills, record_special_skills},
    state::{load_snapshot, State},
};

/// Captures a combatant's live chain attributes as of this battle.
///
/// Loads (or starts) the snapshot keyed `"{dragon}-{battle}"`, writes the skill records that
/// hang off the same key, then saves the snapshot with every sub-record reference pointing
/// at its own id. Any buffs already on an existing snapshot are kept.
pub fn take_dragon_snapshot<S: State + ?Sized, C: Chain + ?Sized>(
    state: &mut S,
    chain: &C,
    dragon: DragonId,
    battle: BattleId,
) -> Result<SnapshotId> {
    let id = SnapshotId::new(dragon, battle);
    let profile = chain
        .profile(dragon)
        .with_context(|| format!("profile of dragon {dragon}"))?;
    let strength = chain
        .strength(dragon)
        .with_context(|| format!("strength of dragon {dragon}"))?;
    let mut snapshot = load_snapshot(state, id)?.unwrap_or_else(|| DragonBattleSnapshot::new(id));

    record_base_skills(state, chain, dragon, id)?;
    record_special_skills(state, chain, dragon, id)?;

    snapshot.level = profile.level;
    snapshot.coolness = profile.coolness;
    snapshot.strength = strength;
    snapshot.link_sub_records();
    state.insert(Key::Snapshot(id), Value::Snapshot(snapshot))?;

    debug!(snapshot = %id, "took dragon snapshot");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chain::{ChainDragon, StaticChain},
        state::Memory,
    };
    use wyvern_types::dragon::DragonProfile;

    fn chain() -> StaticChain {
        StaticChain::new().with_dragon(
            DragonId(7),
            ChainDragon {
                profile: DragonProfile {
                    level: 12,
                    coolness: 300,
                    ..Default::default()
                },
                strength: 4_000,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_snapshot_links_every_sub_record_to_itself() {
        let mut state = Memory::default();
        let id = take_dragon_snapshot(&mut state, &chain(), DragonId(7), BattleId(42)).unwrap();
        assert_eq!(id.to_string(), "7-42");

        let snapshot = load_snapshot(&state, id).unwrap().unwrap();
        assert_eq!(snapshot.level, 12);
        assert_eq!(snapshot.coolness, 300);
        assert_eq!(snapshot.strength, 4_000);
        assert_eq!(snapshot.buffs, None);
        for reference in [
            snapshot.health_and_mana,
            snapshot.skills,
            snapshot.tactics,
            snapshot.special_attack,
            snapshot.special_defense,
        ] {
            assert_eq!(reference, id);
        }
        // snapshot, skills, special attack, special defense
        assert_eq!(state.len(), 4);
    }

    #[test]
    fn test_snapshot_keeps_existing_buffs() {
        let mut state = Memory::default();
        let id = SnapshotId::new(DragonId(7), BattleId(42));
        let mut existing = DragonBattleSnapshot::new(id);
        existing.buffs = Some(vec![3, 1]);
        existing.level = 1;
        state
            .insert(Key::Snapshot(id), Value::Snapshot(existing))
            .unwrap();

        take_dragon_snapshot(&mut state, &chain(), DragonId(7), BattleId(42)).unwrap();
        let snapshot = load_snapshot(&state, id).unwrap().unwrap();
        assert_eq!(snapshot.buffs, Some(vec![3, 1]));
        assert_eq!(snapshot.level, 12);
    }

    #[test]
    fn test_snapshot_fails_without_writes_when_chain_misses_dragon() {
        let mut state = Memory::default();
        let err = take_dragon_snapshot(&mut state, &chain(), DragonId(9), BattleId(42)).unwrap_err();
        assert!(format!("{err:#}").contains("profile of dragon 9"));
        assert!(state.is_empty());
    }
}
