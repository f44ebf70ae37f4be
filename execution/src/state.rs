use anyhow::{Context as _, Result};
use wyvern_types::{
    dragon::{Battle, BattlesStat, Dragon, DragonBattleSnapshot, GladiatorBattle},
    execution::{Key, Value},
    Address, BattleId, DragonId, GladiatorBattleId, SnapshotId,
};

#[cfg(any(test, feature = "mocks"))]
use std::collections::HashMap;

/// Keyed entity store with last-write-wins semantics.
///
/// There are no cross-key transactions: every `insert` is durable on its own and is only
/// observed by a later `get`.
pub trait State {
    fn get(&self, key: &Key) -> Result<Option<Value>>;
    fn insert(&mut self, key: Key, value: Value) -> Result<()>;
    fn delete(&mut self, key: &Key) -> Result<()>;
}

impl<S: State + ?Sized> State for &mut S {
    fn get(&self, key: &Key) -> Result<Option<Value>> {
        (**self).get(key)
    }

    fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        (**self).insert(key, value)
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        (**self).delete(key)
    }
}

#[cfg(any(test, feature = "mocks"))]
#[derive(Clone, Debug, Default)]
pub struct Memory {
    state: HashMap<Key, Value>,
}

#[cfg(any(test, feature = "mocks"))]
impl Memory {
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Records of one kind (see [`Key::kind`]).
    pub fn count_kind(&self, kind: &str) -> usize {
        self.state.keys().filter(|key| key.kind() == kind).count()
    }
}

#[cfg(any(test, feature = "mocks"))]
impl State for Memory {
    fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self.state.get(key).cloned())
    }

    fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.state.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        self.state.remove(key);
        Ok(())
    }
}

pub fn load_dragon<S: State + ?Sized>(state: &S, id: DragonId) -> Result<Option<Dragon>> {
    Ok(match state.get(&Key::Dragon(id))? {
        Some(Value::Dragon(dragon)) => Some(dragon),
        _ => None,
    })
}

pub fn load_battle<S: State + ?Sized>(state: &S, id: BattleId) -> Result<Option<Battle>> {
    Ok(match state.get(&Key::Battle(id))? {
        Some(Value::Battle(battle)) => Some(battle),
        _ => None,
    })
}

pub fn load_snapshot<S: State + ?Sized>(
    state: &S,
    id: SnapshotId,
) -> Result<Option<DragonBattleSnapshot>> {
    Ok(match state.get(&Key::Snapshot(id))? {
        Some(Value::Snapshot(snapshot)) => Some(snapshot),
        _ => None,
    })
}

pub fn load_gladiator_battle<S: State + ?Sized>(
    state: &S,
    id: GladiatorBattleId,
) -> Result<Option<GladiatorBattle>> {
    Ok(match state.get(&Key::GladiatorBattle(id))? {
        Some(Value::GladiatorBattle(battle)) => Some(battle),
        _ => None,
    })
}

pub fn load_dragon_stat<S: State + ?Sized>(state: &S, id: DragonId) -> Result<Option<BattlesStat>> {
    Ok(match state.get(&Key::DragonBattlesStat(id))? {
        Some(Value::DragonBattlesStat(stat)) => Some(stat),
        _ => None,
    })
}

pub fn load_user_stat<S: State + ?Sized>(state: &S, user: Address) -> Result<Option<BattlesStat>> {
    Ok(match state.get(&Key::UserBattlesStat(user))? {
        Some(Value::UserBattlesStat(stat)) => Some(stat),
        _ => None,
    })
}

/// Stores a dragon after checking its record invariants. A dragon that breaks them is not written.
pub(crate) fn save_dragon<S: State + ?Sized>(state: &mut S, dragon: Dragon) -> Result<()> {
    dragon
        .validate_invariants()
        .with_context(|| format!("dragon {} not saved", dragon.id))?;
    state.insert(Key::Dragon(dragon.id), Value::Dragon(dragon))
}
