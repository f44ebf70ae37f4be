//! Fixtures for exercising the projector without a chain or a database.

use crate::{
    chain::{ChainDragon, StaticChain},
    state::State,
};
use wyvern_types::{
    dragon::{BattlesStat, Dragon, DragonHealth, DragonProfile, DragonSkills},
    execution::{BlockContext, Event, EventRecord, Key, TransactionContext, Value},
    Address, BattleId, DragonId, GladiatorBattleId,
};

/// Timestamp of block `n` in generated records.
pub fn block_timestamp(number: u64) -> u64 {
    1_700_000_000 + number * 12
}

/// Deterministic chain attributes derived from the dragon id.
pub fn chain_dragon(id: DragonId) -> ChainDragon {
    let seed = id.0 as u32;
    ChainDragon {
        profile: DragonProfile {
            generation: 1,
            level: (seed % 50) as u8 + 1,
            experience: seed * 100,
            dna_points: seed * 3,
            is_breeding_allowed: seed % 2 == 0,
            coolness: seed * 7,
        },
        strength: 1_000 + seed,
        buffs: vec![seed % 5, 0, 1],
        health: DragonHealth {
            health: 50,
            mana: 20,
            max_health: 100 + seed,
            max_mana: 40,
        },
        skills: DragonSkills {
            attack: seed,
            defense: seed + 1,
            stamina: seed + 2,
            speed: seed + 3,
            intelligence: seed + 4,
        },
        ..Default::default()
    }
}

/// Chain view that knows every listed dragon.
pub fn create_chain(ids: &[u64]) -> StaticChain {
    ids.iter().fold(StaticChain::new(), |chain, id| {
        chain.with_dragon(DragonId(*id), chain_dragon(DragonId(*id)))
    })
}

pub fn create_address(seed: u8) -> Address {
    Address([seed; 20])
}

/// Stores a dragon owned by `owner` along with empty dragon (and user) stat records.
pub fn seed_dragon<S: State>(state: &mut S, id: u64, owner: Option<Address>) -> Dragon {
    let dragon = Dragon::new(DragonId(id), owner);
    state
        .insert(Key::Dragon(dragon.id), Value::Dragon(dragon.clone()))
        .expect("seed dragon");
    state
        .insert(
            Key::DragonBattlesStat(dragon.id),
            Value::DragonBattlesStat(BattlesStat::default()),
        )
        .expect("seed dragon stat");
    if let Some(owner) = owner {
        state
            .insert(
                Key::UserBattlesStat(owner),
                Value::UserBattlesStat(BattlesStat::default()),
            )
            .expect("seed user stat");
    }
    dragon
}

pub fn create_record(block: u64, log_index: u32, event: Event) -> EventRecord {
    EventRecord {
        block: BlockContext {
            number: block,
            timestamp: block_timestamp(block),
        },
        log_index,
        transaction: TransactionContext {
            hash: format!("0x{block:064x}"),
            from: create_address(0xee),
            value: 1_000,
            gas_price: 2,
            gas_used: 50,
        },
        event,
    }
}

pub fn battle_ended(battle: u64, winner: u64, looser: u64, attacker: u64) -> Event {
    Event::BattleEnded {
        winner_id: DragonId(winner),
        looser_id: DragonId(looser),
        attacker_id: DragonId(attacker),
        battle_id: BattleId(battle),
        seed: 0xdead_beef_u64.to_string(),
        date: block_timestamp(battle),
        is_gladiator: false,
        gladiator_battle_id: GladiatorBattleId(0),
    }
}
