//! Common types shared by the wyvern projector and indexer.

pub mod dragon;
pub mod execution;

pub use dragon::{Address, BattleId, DragonId, GladiatorBattleId, SnapshotId};
pub use execution::{BlockContext, Event, EventRecord, Key, TransactionContext, Value};
