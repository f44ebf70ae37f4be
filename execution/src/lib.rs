//! Wyvern projection engine.
//!
//! Folds decoded battle and gladiator-tournament events into a keyed entity store. The
//! primary entrypoint is [`Projector`].
//!
//! ## Ordering and atomicity
//! - Events must be applied one at a time, in log order.
//! - Every write lands in the [`State`] immediately. A handler that fails part way keeps
//!   the writes it already made; there is no rollback.
//! - Win/defeat counters are not idempotent. Redelivery protection belongs to whoever
//!   delivers the events (the indexer keeps a cursor).
//!
//! ## Minimal projection (example)
//! ```rust,ignore
//! # #[cfg(feature = "mocks")]
//! # {
//! use wyvern_execution::{mocks, Memory, Projector};
//!
//! let mut state = Memory::default();
//! let chain = mocks::create_chain(&[7, 9]);
//! let record = mocks::create_record(1, 0, mocks::battle_ended(42, 7, 9, 7));
//! let applied = Projector::new(&mut state, &chain).apply(&record)?;
//! assert!(applied.is_projected());
//! # }
//! ```

pub mod chain;
pub mod helpers;
pub mod snapshot;
pub mod stats;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

mod projector;
mod state;

pub use chain::{Chain, ChainDragon, StaticChain};
pub use projector::{Applied, Projector, SkipReason};
pub use state::{
    load_battle, load_dragon, load_dragon_stat, load_gladiator_battle, load_snapshot,
    load_user_stat, State,
};

#[cfg(any(test, feature = "mocks"))]
pub use state::Memory;
