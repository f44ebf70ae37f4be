use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};

use super::{
    buffs_encode_size, read_buffs, write_buffs, Address, DragonId, GladiatorBattleId, MAX_BUFFS,
};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum DragonInvariantError {
    #[error("too many buffs (len={len}, max={max})")]
    TooManyBuffs { len: usize, max: usize },
    #[error("health above max (health={health}, max={max})")]
    HealthAboveMax { health: u32, max: u32 },
    #[error("mana above max (mana={mana}, max={max})")]
    ManaAboveMax { mana: u32, max: u32 },
}

/// Live health/mana of a dragon as reported by the chain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragonHealth {
    pub health: u32,
    pub mana: u32,
    pub max_health: u32,
    pub max_mana: u32,
}

impl Write for DragonHealth {
    fn write(&self, writer: &mut impl BufMut) {
        self.health.write(writer);
        self.mana.write(writer);
        self.max_health.write(writer);
        self.max_mana.write(writer);
    }
}

impl Read for DragonHealth {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            health: u32::read(reader)?,
            mana: u32::read(reader)?,
            max_health: u32::read(reader)?,
            max_mana: u32::read(reader)?,
        })
    }
}

impl FixedSize for DragonHealth {
    const SIZE: usize = 4 * u32::SIZE;
}

/// Profile fields read from the chain for a dragon.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragonProfile {
    pub generation: u16,
    pub level: u8,
    pub experience: u32,
    pub dna_points: u32,
    pub is_breeding_allowed: bool,
    pub coolness: u32,
}

/// Projected state of a dragon token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Dragon {
    pub id: DragonId,
    pub owner: Option<Address>,
    pub level: u8,
    pub experience: u32,
    pub dna_points: u32,
    pub is_breeding_allowed: bool,
    pub buffs: Vec<u32>,
    pub last_battle_date: Option<u64>,
    pub gladiator_battle: Option<GladiatorBattleId>,
    /// Wei spent on battles this dragon initiated.
    pub ether_spent: u128,
    pub health: DragonHealth,
}

impl Dragon {
    pub fn new(id: DragonId, owner: Option<Address>) -> Self {
        Self {
            id,
            owner,
            ..Default::default()
        }
    }

    pub fn validate_invariants(&self) -> Result<(), DragonInvariantError> {
        if self.buffs.len() > MAX_BUFFS {
            return Err(DragonInvariantError::TooManyBuffs {
                len: self.buffs.len(),
                max: MAX_BUFFS,
            });
        }
        if self.health.health > self.health.max_health {
            return Err(DragonInvariantError::HealthAboveMax {
                health: self.health.health,
                max: self.health.max_health,
            });
        }
        if self.health.mana > self.health.max_mana {
            return Err(DragonInvariantError::ManaAboveMax {
                mana: self.health.mana,
                max: self.health.max_mana,
            });
        }
        Ok(())
    }

    /// Overwrites the progression fields from a fresh chain profile.
    pub fn apply_profile(&mut self, profile: &DragonProfile) {
        self.level = profile.level;
        self.experience = profile.experience;
        self.dna_points = profile.dna_points;
        self.is_breeding_allowed = profile.is_breeding_allowed;
    }
}

impl Write for Dragon {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.owner.write(writer);
        self.level.write(writer);
        self.experience.write(writer);
        self.dna_points.write(writer);
        self.is_breeding_allowed.write(writer);
        write_buffs(&self.buffs, writer);
        self.last_battle_date.write(writer);
        self.gladiator_battle.write(writer);
        self.ether_spent.write(writer);
        self.health.write(writer);
    }
}

impl Read for Dragon {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: DragonId::read(reader)?,
            owner: Option::<Address>::read(reader)?,
            level: u8::read(reader)?,
            experience: u32::read(reader)?,
            dna_points: u32::read(reader)?,
            is_breeding_allowed: bool::read(reader)?,
            buffs: read_buffs(reader)?,
            last_battle_date: Option::<u64>::read(reader)?,
            gladiator_battle: Option::<GladiatorBattleId>::read(reader)?,
            ether_spent: u128::read(reader)?,
            health: DragonHealth::read(reader)?,
        })
    }
}

impl EncodeSize for Dragon {
    fn encode_size(&self) -> usize {
        self.id.encode_size()
            + self.owner.encode_size()
            + self.level.encode_size()
            + self.experience.encode_size()
            + self.dna_points.encode_size()
            + self.is_breeding_allowed.encode_size()
            + buffs_encode_size(&self.buffs)
            + self.last_battle_date.encode_size()
            + self.gladiator_battle.encode_size()
            + self.ether_spent.encode_size()
            + self.health.encode_size()
    }
}

/// Win/defeat counters. Shared shape of the per-dragon and per-user aggregates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattlesStat {
    pub wins: u32,
    pub defeats: u32,
}

impl Write for BattlesStat {
    fn write(&self, writer: &mut impl BufMut) {
        self.wins.write(writer);
        self.defeats.write(writer);
    }
}

impl Read for BattlesStat {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            wins: u32::read(reader)?,
            defeats: u32::read(reader)?,
        })
    }
}

impl FixedSize for BattlesStat {
    const SIZE: usize = 2 * u32::SIZE;
}

/// Base skills captured for a combatant at battle time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragonSkills {
    pub attack: u32,
    pub defense: u32,
    pub stamina: u32,
    pub speed: u32,
    pub intelligence: u32,
}

impl Write for DragonSkills {
    fn write(&self, writer: &mut impl BufMut) {
        self.attack.write(writer);
        self.defense.write(writer);
        self.stamina.write(writer);
        self.speed.write(writer);
        self.intelligence.write(writer);
    }
}

impl Read for DragonSkills {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            attack: u32::read(reader)?,
            defense: u32::read(reader)?,
            stamina: u32::read(reader)?,
            speed: u32::read(reader)?,
            intelligence: u32::read(reader)?,
        })
    }
}

impl FixedSize for DragonSkills {
    const SIZE: usize = 5 * u32::SIZE;
}

/// Special attack or special defense of a combatant at battle time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragonSpecialSkill {
    pub class: u8,
    pub cost: u32,
    pub factor: u32,
    pub chance: u8,
}

impl Write for DragonSpecialSkill {
    fn write(&self, writer: &mut impl BufMut) {
        self.class.write(writer);
        self.cost.write(writer);
        self.factor.write(writer);
        self.chance.write(writer);
    }
}

impl Read for DragonSpecialSkill {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            class: u8::read(reader)?,
            cost: u32::read(reader)?,
            factor: u32::read(reader)?,
            chance: u8::read(reader)?,
        })
    }
}

impl FixedSize for DragonSpecialSkill {
    const SIZE: usize = u8::SIZE + 2 * u32::SIZE + u8::SIZE;
}
