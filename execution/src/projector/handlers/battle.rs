use super::*;

use anyhow::Context as _;
use tracing::info;
use wyvern_types::{
    dragon::{Battle, DragonTactics},
    execution::{BlockContext, Key, TransactionContext, Value},
};

use crate::{
    helpers::{record_ether_spent, refresh_health_and_mana},
    snapshot::take_dragon_snapshot,
    state::{load_battle, load_dragon, load_snapshot, save_dragon},
    stats::{record_outcome, Outcome},
};

impl<'a, S: State, C: Chain> Projector<'a, S, C> {
    pub(in crate::projector) fn handle_battle_ended(
        &mut self,
        block: &BlockContext,
        transaction: &TransactionContext,
        ended: BattleEnded,
    ) -> Result<Applied> {
        let BattleEnded {
            winner,
            looser,
            attacker,
            battle: battle_id,
            seed,
            date,
            gladiator_battle,
        } = ended;

        let winner_dragon = load_dragon(self.state, winner)?;
        let looser_dragon = load_dragon(self.state, looser)?;
        let defender = if attacker == winner { looser } else { winner };

        // Both snapshots are taken even when the dragons are not indexed
        let winner_snapshot = take_dragon_snapshot(self.state, self.chain, winner, battle_id)?;
        let looser_snapshot = take_dragon_snapshot(self.state, self.chain, looser, battle_id)?;
        let (attacker_snapshot, defender_snapshot) =
            role_snapshots(attacker, winner, looser, winner_snapshot, looser_snapshot);

        let mut battle = Battle {
            id: battle_id,
            seed,
            winner_dragon: winner,
            looser_dragon: looser,
            attacker_dragon: attacker,
            defender_dragon: defender,
            winner_user: None,
            looser_user: None,
            date,
            winner_dragon_snapshot: winner_snapshot,
            looser_dragon_snapshot: looser_snapshot,
            attacker_dragon_snapshot: attacker_snapshot,
            defender_dragon_snapshot: defender_snapshot,
            gladiator_battle,
        };

        if let Some(mut dragon) = winner_dragon {
            let profile = self
                .chain
                .profile(winner)
                .with_context(|| format!("profile of winner {winner}"))?;
            let buffs = self
                .chain
                .buffs(winner)
                .with_context(|| format!("buffs of winner {winner}"))?;

            battle.winner_user = dragon.owner;
            if winner == attacker {
                record_ether_spent(&mut dragon, transaction);
            }
            dragon.apply_profile(&profile);
            dragon.buffs = cap_buffs(buffs, &winner);
            dragon.last_battle_date = Some(block.timestamp);
            save_dragon(self.state, dragon.clone())?;

            refresh_health_and_mana(self.state, self.chain, winner)?;
            record_outcome(self.state, &dragon, Outcome::Win)?;
        } else {
            debug!(dragon = %winner, battle = %battle_id, "winner not indexed");
        }

        // Only the winner's progression is refreshed; the looser keeps its stored profile
        if let Some(mut dragon) = looser_dragon {
            let buffs = self
                .chain
                .buffs(looser)
                .with_context(|| format!("buffs of looser {looser}"))?;

            battle.looser_user = dragon.owner;
            if looser == attacker {
                record_ether_spent(&mut dragon, transaction);
            }
            dragon.buffs = cap_buffs(buffs, &looser);
            dragon.last_battle_date = Some(block.timestamp);
            save_dragon(self.state, dragon.clone())?;

            refresh_health_and_mana(self.state, self.chain, looser)?;
            record_outcome(self.state, &dragon, Outcome::Defeat)?;
        } else {
            debug!(dragon = %looser, battle = %battle_id, "looser not indexed");
        }

        info!(
            battle = %battle_id,
            %winner,
            %looser,
            %attacker,
            gladiator = ?battle.gladiator_battle,
            "battle projected"
        );
        self.state
            .insert(Key::Battle(battle_id), Value::Battle(battle))?;

        Ok(Applied::Projected)
    }

    pub(in crate::projector) fn handle_battle_health_and_mana(
        &mut self,
        battle_id: BattleId,
        attacker: BattleHealthAndMana,
        opponent: BattleHealthAndMana,
    ) -> Result<Applied> {
        let Some(battle) = load_battle(self.state, battle_id)? else {
            debug!(battle = %battle_id, "health and mana for unknown battle");
            return Ok(Applied::Skipped(SkipReason::UnknownBattle(battle_id)));
        };

        self.state.insert(
            Key::HealthAndMana(battle.attacker_dragon_snapshot),
            Value::HealthAndMana(attacker),
        )?;
        self.state.insert(
            Key::HealthAndMana(battle.defender_dragon_snapshot),
            Value::HealthAndMana(opponent),
        )?;

        Ok(Applied::Projected)
    }

    pub(in crate::projector) fn handle_battle_tactics_and_buffs(
        &mut self,
        battle_id: BattleId,
        attacker: Tactics<'_>,
        opponent: Tactics<'_>,
    ) -> Result<Applied> {
        let Some(battle) = load_battle(self.state, battle_id)? else {
            debug!(battle = %battle_id, "tactics and buffs for unknown battle");
            return Ok(Applied::Skipped(SkipReason::UnknownBattle(battle_id)));
        };

        for (snapshot_id, tactics) in [
            (battle.attacker_dragon_snapshot, attacker),
            (battle.defender_dragon_snapshot, opponent),
        ] {
            self.state.insert(
                Key::Tactics(snapshot_id),
                Value::Tactics(DragonTactics {
                    melee: tactics.melee,
                    attack: tactics.attack,
                }),
            )?;

            match load_snapshot(self.state, snapshot_id)? {
                Some(mut snapshot) => {
                    snapshot.buffs = Some(cap_buffs(tactics.buffs.to_vec(), &snapshot_id));
                    self.state
                        .insert(Key::Snapshot(snapshot_id), Value::Snapshot(snapshot))?;
                }
                None => debug!(snapshot = %snapshot_id, "no snapshot to attach buffs to"),
            }
        }

        Ok(Applied::Projected)
    }
}
