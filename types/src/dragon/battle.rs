use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use serde::Serialize;

use super::{
    buffs_encode_size, read_buffs, read_string, string_encode_size, write_buffs, write_string,
    Address, BattleId, DragonId, GladiatorBattleId, SnapshotId, MAX_SEED_LENGTH,
};

/// Historical record of one concluded battle.
///
/// Winner/looser and attacker/defender are two labelings of the same two combatants, so
/// the attacker and defender snapshots always alias the winner and looser snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Battle {
    pub id: BattleId,
    pub seed: String,
    pub winner_dragon: DragonId,
    pub looser_dragon: DragonId,
    pub attacker_dragon: DragonId,
    pub defender_dragon: DragonId,
    pub winner_user: Option<Address>,
    pub looser_user: Option<Address>,
    pub date: u64,
    pub winner_dragon_snapshot: SnapshotId,
    pub looser_dragon_snapshot: SnapshotId,
    pub attacker_dragon_snapshot: SnapshotId,
    pub defender_dragon_snapshot: SnapshotId,
    pub gladiator_battle: Option<GladiatorBattleId>,
}

impl Write for Battle {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        write_string(&self.seed, writer);
        self.winner_dragon.write(writer);
        self.looser_dragon.write(writer);
        self.attacker_dragon.write(writer);
        self.defender_dragon.write(writer);
        self.winner_user.write(writer);
        self.looser_user.write(writer);
        self.date.write(writer);
        self.winner_dragon_snapshot.write(writer);
        self.looser_dragon_snapshot.write(writer);
        self.attacker_dragon_snapshot.write(writer);
        self.defender_dragon_snapshot.write(writer);
        self.gladiator_battle.write(writer);
    }
}

impl Read for Battle {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: BattleId::read(reader)?,
            seed: read_string(reader, MAX_SEED_LENGTH)?,
            winner_dragon: DragonId::read(reader)?,
            looser_dragon: DragonId::read(reader)?,
            attacker_dragon: DragonId::read(reader)?,
            defender_dragon: DragonId::read(reader)?,
            winner_user: Option::<Address>::read(reader)?,
            looser_user: Option::<Address>::read(reader)?,
            date: u64::read(reader)?,
            winner_dragon_snapshot: SnapshotId::read(reader)?,
            looser_dragon_snapshot: SnapshotId::read(reader)?,
            attacker_dragon_snapshot: SnapshotId::read(reader)?,
            defender_dragon_snapshot: SnapshotId::read(reader)?,
            gladiator_battle: Option::<GladiatorBattleId>::read(reader)?,
        })
    }
}

impl EncodeSize for Battle {
    fn encode_size(&self) -> usize {
        BattleId::SIZE
            + string_encode_size(&self.seed)
            + 4 * DragonId::SIZE
            + self.winner_user.encode_size()
            + self.looser_user.encode_size()
            + u64::SIZE
            + 4 * SnapshotId::SIZE
            + self.gladiator_battle.encode_size()
    }
}

/// A combatant's attributes at the moment a battle concluded.
///
/// The sub-record references all point at the snapshot's own id: the health/mana,
/// skills, tactics and special skill records are stored under the same key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DragonBattleSnapshot {
    pub id: SnapshotId,
    pub level: u8,
    pub coolness: u32,
    pub strength: u32,
    /// Filled by the tactics/buffs detail event.
    pub buffs: Option<Vec<u32>>,
    pub health_and_mana: SnapshotId,
    pub skills: SnapshotId,
    pub tactics: SnapshotId,
    pub special_attack: SnapshotId,
    pub special_defense: SnapshotId,
}

impl DragonBattleSnapshot {
    pub fn new(id: SnapshotId) -> Self {
        Self {
            id,
            level: 0,
            coolness: 0,
            strength: 0,
            buffs: None,
            health_and_mana: id,
            skills: id,
            tactics: id,
            special_attack: id,
            special_defense: id,
        }
    }

    /// Points every sub-record reference at this snapshot's key.
    pub fn link_sub_records(&mut self) {
        self.health_and_mana = self.id;
        self.skills = self.id;
        self.tactics = self.id;
        self.special_attack = self.id;
        self.special_defense = self.id;
    }
}

impl Write for DragonBattleSnapshot {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.level.write(writer);
        self.coolness.write(writer);
        self.strength.write(writer);
        match &self.buffs {
            Some(buffs) => {
                true.write(writer);
                write_buffs(buffs, writer);
            }
            None => false.write(writer),
        }
        self.health_and_mana.write(writer);
        self.skills.write(writer);
        self.tactics.write(writer);
        self.special_attack.write(writer);
        self.special_defense.write(writer);
    }
}

impl Read for DragonBattleSnapshot {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let id = SnapshotId::read(reader)?;
        let level = u8::read(reader)?;
        let coolness = u32::read(reader)?;
        let strength = u32::read(reader)?;
        let buffs = if bool::read(reader)? {
            Some(read_buffs(reader)?)
        } else {
            None
        };
        Ok(Self {
            id,
            level,
            coolness,
            strength,
            buffs,
            health_and_mana: SnapshotId::read(reader)?,
            skills: SnapshotId::read(reader)?,
            tactics: SnapshotId::read(reader)?,
            special_attack: SnapshotId::read(reader)?,
            special_defense: SnapshotId::read(reader)?,
        })
    }
}

impl EncodeSize for DragonBattleSnapshot {
    fn encode_size(&self) -> usize {
        SnapshotId::SIZE
            + u8::SIZE
            + 2 * u32::SIZE
            + u8::SIZE
            + self.buffs.as_deref().map(buffs_encode_size).unwrap_or(0)
            + 5 * SnapshotId::SIZE
    }
}

/// Initial and maximum health/mana of a combatant, reported after the battle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BattleHealthAndMana {
    pub init_health: u32,
    pub init_mana: u32,
    pub max_health: u32,
    pub max_mana: u32,
}

impl Write for BattleHealthAndMana {
    fn write(&self, writer: &mut impl BufMut) {
        self.init_health.write(writer);
        self.init_mana.write(writer);
        self.max_health.write(writer);
        self.max_mana.write(writer);
    }
}

impl Read for BattleHealthAndMana {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            init_health: u32::read(reader)?,
            init_mana: u32::read(reader)?,
            max_health: u32::read(reader)?,
            max_mana: u32::read(reader)?,
        })
    }
}

impl FixedSize for BattleHealthAndMana {
    const SIZE: usize = 4 * u32::SIZE;
}

/// Melee and attack chances a combatant fought with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DragonTactics {
    pub melee: u8,
    pub attack: u8,
}

impl Write for DragonTactics {
    fn write(&self, writer: &mut impl BufMut) {
        self.melee.write(writer);
        self.attack.write(writer);
    }
}

impl Read for DragonTactics {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            melee: u8::read(reader)?,
            attack: u8::read(reader)?,
        })
    }
}

impl FixedSize for DragonTactics {
    const SIZE: usize = 2 * u8::SIZE;
}
