use super::*;

use wyvern_types::{DragonId, SnapshotId};

mod battle;
mod gladiator;

/// Decoded `BattleEnded` fields. `gladiator_battle` is set only for tournament battles.
pub(super) struct BattleEnded {
    pub winner: DragonId,
    pub looser: DragonId,
    pub attacker: DragonId,
    pub battle: BattleId,
    pub seed: String,
    pub date: u64,
    pub gladiator_battle: Option<GladiatorBattleId>,
}

/// One combatant's half of a `BattleTacticsAndBuffs` event.
pub(super) struct Tactics<'e> {
    pub melee: u8,
    pub attack: u8,
    pub buffs: &'e [u32],
}

/// Snapshot ids of the two combatants, keyed by role.
fn role_snapshots(
    attacker: DragonId,
    winner: DragonId,
    looser: DragonId,
    winner_snapshot: SnapshotId,
    looser_snapshot: SnapshotId,
) -> (SnapshotId, SnapshotId) {
    let attacker_snapshot = if attacker == winner {
        winner_snapshot
    } else {
        looser_snapshot
    };
    let defender_snapshot = if attacker == looser {
        winner_snapshot
    } else {
        looser_snapshot
    };
    (attacker_snapshot, defender_snapshot)
}
