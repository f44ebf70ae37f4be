use anyhow::{Context as _, Result};
use tracing::{debug, warn};
use wyvern_types::{
    dragon::{BattleHealthAndMana, GladiatorBattleStatus, MAX_BUFFS},
    execution::{Event, EventRecord},
    BattleId, GladiatorBattleId,
};

use crate::{chain::Chain, state::State};

mod handlers;


/// Why an event left the store untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Detail event for a battle that was never projected.
    UnknownBattle(BattleId),
    /// Lifecycle event for a tournament that was never created.
    UnknownGladiatorBattle(GladiatorBattleId),
    /// Lifecycle event that would move a tournament backwards or out of a final status.
    InvalidTransition {
        id: GladiatorBattleId,
        from: GladiatorBattleStatus,
        to: GladiatorBattleStatus,
    },
}

/// Outcome of projecting one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Applied {
    Projected,
    Skipped(SkipReason),
}

impl Applied {
    pub fn is_projected(&self) -> bool {
        matches!(self, Self::Projected)
    }
}

/// Folds battle and tournament events into the entity store.
///
/// Every write goes straight to the store. A handler that fails part way through returns
/// the error and leaves the writes it already made in place.
pub struct Projector<'a, S: State, C: Chain> {
    state: &'a mut S,
    chain: &'a C,
}

impl<'a, S: State, C: Chain> Projector<'a, S, C> {
    pub fn new(state: &'a mut S, chain: &'a C) -> Self {
        Self { state, chain }
    }

    pub fn apply(&mut self, record: &EventRecord) -> Result<Applied> {
        let EventRecord {
            block,
            log_index,
            transaction,
            event,
        } = record;
        debug!(
            block = block.number,
            log_index,
            event = event.name(),
            "projecting event"
        );

        let applied = match event {
            Event::BattleEnded {
                winner_id,
                looser_id,
                attacker_id,
                battle_id,
                seed,
                date,
                is_gladiator,
                gladiator_battle_id,
            } => self.handle_battle_ended(
                block,
                transaction,
                handlers::BattleEnded {
                    winner: *winner_id,
                    looser: *looser_id,
                    attacker: *attacker_id,
                    battle: *battle_id,
                    seed: seed.clone(),
                    date: *date,
                    gladiator_battle: is_gladiator.then_some(*gladiator_battle_id),
                },
            ),
            Event::BattleHealthAndMana {
                battle_id,
                attacker_init_health,
                attacker_init_mana,
                attacker_max_health,
                attacker_max_mana,
                opponent_init_health,
                opponent_init_mana,
                opponent_max_health,
                opponent_max_mana,
            } => self.handle_battle_health_and_mana(
                *battle_id,
                BattleHealthAndMana {
                    init_health: *attacker_init_health,
                    init_mana: *attacker_init_mana,
                    max_health: *attacker_max_health,
                    max_mana: *attacker_max_mana,
                },
                BattleHealthAndMana {
                    init_health: *opponent_init_health,
                    init_mana: *opponent_init_mana,
                    max_health: *opponent_max_health,
                    max_mana: *opponent_max_mana,
                },
            ),
            Event::BattleTacticsAndBuffs {
                battle_id,
                attacker_melee_chance,
                attacker_attack_chance,
                attacker_buffs,
                opponent_melee_chance,
                opponent_attack_chance,
                opponent_buffs,
            } => self.handle_battle_tactics_and_buffs(
                *battle_id,
                handlers::Tactics {
                    melee: *attacker_melee_chance,
                    attack: *attacker_attack_chance,
                    buffs: attacker_buffs,
                },
                handlers::Tactics {
                    melee: *opponent_melee_chance,
                    attack: *opponent_attack_chance,
                    buffs: opponent_buffs,
                },
            ),
            Event::GladiatorBattleCreated {
                id,
                dragon_id,
                bet,
                is_gold,
            } => self.handle_gladiator_battle_created(*id, *dragon_id, *bet, *is_gold),
            Event::GladiatorBattleOpponentSelected { id, dragon_id } => {
                self.handle_gladiator_battle_opponent_selected(*id, *dragon_id)
            }
            Event::GladiatorBattleCancelled { id } => {
                self.handle_gladiator_battle_closed(*id, GladiatorBattleStatus::Cancelled)
            }
            Event::GladiatorBattleEnded { id } => {
                self.handle_gladiator_battle_closed(*id, GladiatorBattleStatus::Conducted)
            }
        };

        applied.with_context(|| {
            format!(
                "{} at block {} log {}",
                event.name(),
                block.number,
                log_index
            )
        })
    }

    /// Projects records in order, stopping at the first failure.
    pub fn apply_all<'r>(
        &mut self,
        records: impl IntoIterator<Item = &'r EventRecord>,
    ) -> Result<Vec<Applied>> {
        records.into_iter().map(|record| self.apply(record)).collect()
    }
}

/// Buff lists come straight from the chain; anything past the stored maximum is dropped.
fn cap_buffs(mut buffs: Vec<u32>, context: &dyn std::fmt::Display) -> Vec<u32> {
    if buffs.len() > MAX_BUFFS {
        warn!(
            %context,
            len = buffs.len(),
            max = MAX_BUFFS,
            "truncating buffs"
        );
        buffs.truncate(MAX_BUFFS);
    }
    buffs
}
