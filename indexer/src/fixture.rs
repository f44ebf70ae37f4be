use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use wyvern_execution::{load_dragon, load_dragon_stat, load_user_stat, Chain, StaticChain, State};
use wyvern_types::{
    dragon::{BattlesStat, Dragon, DragonHealth, DragonProfile, DragonSkills, DragonSpecialSkill},
    execution::{Key, Value},
    Address, DragonId,
};

/// Dragon that exists before the first projected event.
#[derive(Clone, Debug, Deserialize)]
pub struct GenesisDragon {
    pub id: DragonId,
    #[serde(default)]
    pub owner: Option<Address>,
    /// Create an empty win/defeat record for the dragon (and its owner).
    #[serde(default = "default_true")]
    pub stats: bool,
}

fn default_true() -> bool {
    true
}

/// Static chain attributes plus the records the projector expects to find already stored.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChainFixture {
    pub dragons: StaticChain,
    pub genesis: Vec<GenesisDragon>,
}

impl ChainFixture {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read chain fixture {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse chain fixture {}", path.display()))
    }

    /// Writes genesis records that are not stored yet and returns how many were written.
    pub fn seed_genesis<S: State>(&self, state: &mut S) -> Result<usize> {
        let mut written = 0;
        for genesis in &self.genesis {
            if load_dragon(state, genesis.id)?.is_none() {
                state.insert(
                    Key::Dragon(genesis.id),
                    Value::Dragon(Dragon::new(genesis.id, genesis.owner)),
                )?;
                written += 1;
            }
            if !genesis.stats {
                continue;
            }
            if load_dragon_stat(state, genesis.id)?.is_none() {
                state.insert(
                    Key::DragonBattlesStat(genesis.id),
                    Value::DragonBattlesStat(BattlesStat::default()),
                )?;
                written += 1;
            }
            if let Some(owner) = genesis.owner {
                if load_user_stat(state, owner)?.is_none() {
                    state.insert(
                        Key::UserBattlesStat(owner),
                        Value::UserBattlesStat(BattlesStat::default()),
                    )?;
                    written += 1;
                }
            }
        }
        if written > 0 {
            info!(written, "seeded genesis records");
        }
        Ok(written)
    }
}

impl Chain for ChainFixture {
    fn profile(&self, dragon: DragonId) -> Result<DragonProfile> {
        self.dragons.profile(dragon)
    }

    fn strength(&self, dragon: DragonId) -> Result<u32> {
        self.dragons.strength(dragon)
    }

    fn buffs(&self, dragon: DragonId) -> Result<Vec<u32>> {
        self.dragons.buffs(dragon)
    }

    fn health_and_mana(&self, dragon: DragonId) -> Result<DragonHealth> {
        self.dragons.health_and_mana(dragon)
    }

    fn skills(&self, dragon: DragonId) -> Result<DragonSkills> {
        self.dragons.skills(dragon)
    }

    fn special_attack(&self, dragon: DragonId) -> Result<DragonSpecialSkill> {
        self.dragons.special_attack(dragon)
    }

    fn special_defense(&self, dragon: DragonId) -> Result<DragonSpecialSkill> {
        self.dragons.special_defense(dragon)
    }
}
