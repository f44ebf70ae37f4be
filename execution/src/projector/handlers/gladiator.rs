use super::*;

use tracing::info;
use wyvern_types::{
    dragon::{Currency, GladiatorBattle},
    execution::{Key, Value},
};

use crate::state::{load_dragon, load_gladiator_battle, save_dragon};

impl<'a, S: State, C: Chain> Projector<'a, S, C> {
    /// Points a stored dragon at a tournament, or clears the link.
    fn link_dragon(&mut self, id: DragonId, gladiator_battle: Option<GladiatorBattleId>) -> Result<()> {
        match load_dragon(self.state, id)? {
            Some(mut dragon) => {
                dragon.gladiator_battle = gladiator_battle;
                save_dragon(self.state, dragon)
            }
            None => {
                debug!(dragon = %id, "tournament dragon not indexed");
                Ok(())
            }
        }
    }

    /// Clears a dragon's link only while it still points at `id`.
    fn release_dragon(&mut self, dragon: DragonId, id: GladiatorBattleId) -> Result<()> {
        match load_dragon(self.state, dragon)? {
            Some(stored) if stored.gladiator_battle == Some(id) => self.link_dragon(dragon, None),
            _ => Ok(()),
        }
    }

    /// Returns the skip reason when `to` is not reachable from the stored status.
    fn check_transition(battle: &GladiatorBattle, to: GladiatorBattleStatus) -> Option<SkipReason> {
        if battle.status.can_advance_to(to) {
            return None;
        }
        warn!(
            gladiator_battle = %battle.id,
            from = ?battle.status,
            to = ?to,
            terminal = battle.status.is_terminal(),
            "rejected tournament transition"
        );
        Some(SkipReason::InvalidTransition {
            id: battle.id,
            from: battle.status,
            to,
        })
    }

    pub(in crate::projector) fn handle_gladiator_battle_created(
        &mut self,
        id: GladiatorBattleId,
        creator: DragonId,
        bet: u128,
        is_gold: bool,
    ) -> Result<Applied> {
        if let Some(existing) = load_gladiator_battle(self.state, id)? {
            if let Some(reason) = Self::check_transition(&existing, GladiatorBattleStatus::Created) {
                return Ok(Applied::Skipped(reason));
            }
        }

        let battle = GladiatorBattle::new(id, creator, bet, Currency::from_is_gold(is_gold));
        info!(gladiator_battle = %id, %creator, bet, currency = ?battle.currency, "tournament created");
        self.state
            .insert(Key::GladiatorBattle(id), Value::GladiatorBattle(battle))?;
        self.link_dragon(creator, Some(id))?;

        Ok(Applied::Projected)
    }

    pub(in crate::projector) fn handle_gladiator_battle_opponent_selected(
        &mut self,
        id: GladiatorBattleId,
        opponent: DragonId,
    ) -> Result<Applied> {
        let Some(mut battle) = load_gladiator_battle(self.state, id)? else {
            debug!(gladiator_battle = %id, "opponent selected for unknown tournament");
            return Ok(Applied::Skipped(SkipReason::UnknownGladiatorBattle(id)));
        };
        if let Some(reason) = Self::check_transition(&battle, GladiatorBattleStatus::OpponentSelected)
        {
            return Ok(Applied::Skipped(reason));
        }

        battle.status = GladiatorBattleStatus::OpponentSelected;
        let replaced = battle
            .opponent_dragon
            .replace(opponent)
            .filter(|previous| *previous != opponent);
        info!(gladiator_battle = %id, %opponent, ?replaced, "tournament opponent selected");
        self.state
            .insert(Key::GladiatorBattle(id), Value::GladiatorBattle(battle))?;
        if let Some(previous) = replaced {
            self.release_dragon(previous, id)?;
        }
        self.link_dragon(opponent, Some(id))?;

        Ok(Applied::Projected)
    }

    /// Moves a tournament into a final status and releases its dragons.
    pub(in crate::projector) fn handle_gladiator_battle_closed(
        &mut self,
        id: GladiatorBattleId,
        status: GladiatorBattleStatus,
    ) -> Result<Applied> {
        let Some(mut battle) = load_gladiator_battle(self.state, id)? else {
            debug!(gladiator_battle = %id, ?status, "close of unknown tournament");
            return Ok(Applied::Skipped(SkipReason::UnknownGladiatorBattle(id)));
        };
        if let Some(reason) = Self::check_transition(&battle, status) {
            return Ok(Applied::Skipped(reason));
        }

        battle.status = status;
        let participants: Vec<DragonId> = battle.participants().collect();
        info!(gladiator_battle = %id, ?status, "tournament closed");
        self.state
            .insert(Key::GladiatorBattle(id), Value::GladiatorBattle(battle))?;
        for dragon in participants {
            self.link_dragon(dragon, None)?;
        }

        Ok(Applied::Projected)
    }
}
