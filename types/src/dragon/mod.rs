//! Dragon battle domain types.
//!
//! Defines the projected entities (dragons, battles, snapshots, gladiator matches, battle
//! statistics), their typed ids and canonical binary encodings.

mod battle;
mod codec;
mod constants;
mod entity;
mod gladiator;
mod ids;

pub use battle::*;
pub use codec::{
    buffs_encode_size, read_buffs, read_string, string_encode_size, write_buffs, write_string,
};
pub use constants::*;
pub use entity::*;
pub use gladiator::*;
pub use ids::*;
