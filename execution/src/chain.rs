//! Read access to live on-chain dragon attributes.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wyvern_types::{
    dragon::{DragonHealth, DragonProfile, DragonSkills, DragonSpecialSkill},
    DragonId,
};

/// Synchronous accessor for a dragon's current on-chain attributes.
///
/// Values are read when an event is projected, not as of the block that emitted it.
pub trait Chain {
    fn profile(&self, dragon: DragonId) -> Result<DragonProfile>;
    fn strength(&self, dragon: DragonId) -> Result<u32>;
    fn buffs(&self, dragon: DragonId) -> Result<Vec<u32>>;
    fn health_and_mana(&self, dragon: DragonId) -> Result<DragonHealth>;
    fn skills(&self, dragon: DragonId) -> Result<DragonSkills>;
    fn special_attack(&self, dragon: DragonId) -> Result<DragonSpecialSkill>;
    fn special_defense(&self, dragon: DragonId) -> Result<DragonSpecialSkill>;
}

/// Every attribute the projector reads for one dragon.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainDragon {
    pub profile: DragonProfile,
    pub strength: u32,
    pub buffs: Vec<u32>,
    pub health: DragonHealth,
    pub skills: DragonSkills,
    pub special_attack: DragonSpecialSkill,
    pub special_defense: DragonSpecialSkill,
}

/// Chain view backed by a fixed table of attributes. Unknown dragons are an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticChain {
    dragons: BTreeMap<DragonId, ChainDragon>,
}

impl StaticChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dragon(mut self, id: DragonId, dragon: ChainDragon) -> Self {
        self.dragons.insert(id, dragon);
        self
    }

    pub fn insert(&mut self, id: DragonId, dragon: ChainDragon) -> Option<ChainDragon> {
        self.dragons.insert(id, dragon)
    }

    pub fn get_mut(&mut self, id: DragonId) -> Option<&mut ChainDragon> {
        self.dragons.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.dragons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dragons.is_empty()
    }

    fn dragon(&self, id: DragonId) -> Result<&ChainDragon> {
        self.dragons
            .get(&id)
            .ok_or_else(|| anyhow!("dragon {id} not found on chain"))
    }
}

impl Chain for StaticChain {
    fn profile(&self, dragon: DragonId) -> Result<DragonProfile> {
        Ok(self.dragon(dragon)?.profile)
    }

    fn strength(&self, dragon: DragonId) -> Result<u32> {
        Ok(self.dragon(dragon)?.strength)
    }

    fn buffs(&self, dragon: DragonId) -> Result<Vec<u32>> {
        Ok(self.dragon(dragon)?.buffs.clone())
    }

    fn health_and_mana(&self, dragon: DragonId) -> Result<DragonHealth> {
        Ok(self.dragon(dragon)?.health)
    }

    fn skills(&self, dragon: DragonId) -> Result<DragonSkills> {
        Ok(self.dragon(dragon)?.skills)
    }

    fn special_attack(&self, dragon: DragonId) -> Result<DragonSpecialSkill> {
        Ok(self.dragon(dragon)?.special_attack)
    }

    fn special_defense(&self, dragon: DragonId) -> Result<DragonSpecialSkill> {
        Ok(self.dragon(dragon)?.special_defense)
    }
}
