//! Win/defeat aggregates per dragon and per owning user.

use anyhow::Result;
use tracing::debug;
use wyvern_types::{
    dragon::{BattlesStat, Dragon},
    execution::{Key, Value},
};

use crate::state::{load_dragon_stat, load_user_stat, State};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Defeat,
}

impl Outcome {
    fn bump(self, stat: &mut BattlesStat) {
        match self {
            Self::Win => stat.wins = stat.wins.saturating_add(1),
            Self::Defeat => stat.defeats = stat.defeats.saturating_add(1),
        }
    }
}

/// Which aggregates [`record_outcome`] incremented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Recorded {
    pub dragon: bool,
    pub user: bool,
}

/// Increments the dragon's and its owner's counters for one battle outcome.
///
/// Aggregates are created elsewhere; a missing record is left missing. Not idempotent: a
/// redelivered event counts again.
pub fn record_outcome<S: State + ?Sized>(
    state: &mut S,
    dragon: &Dragon,
    outcome: Outcome,
) -> Result<Recorded> {
    let mut recorded = Recorded::default();

    match load_dragon_stat(state, dragon.id)? {
        Some(mut stat) => {
            outcome.bump(&mut stat);
            state.insert(
                Key::DragonBattlesStat(dragon.id),
                Value::DragonBattlesStat(stat),
            )?;
            recorded.dragon = true;
        }
        None => debug!(dragon = %dragon.id, "no dragon battles stat; not counted"),
    }

    if let Some(owner) = dragon.owner {
        match load_user_stat(state, owner)? {
            Some(mut stat) => {
                outcome.bump(&mut stat);
                state.insert(Key::UserBattlesStat(owner), Value::UserBattlesStat(stat))?;
                recorded.user = true;
            }
            None => debug!(user = %owner, "no user battles stat; not counted"),
        }
    }

    Ok(recorded)
}
