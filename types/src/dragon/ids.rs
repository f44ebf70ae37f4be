use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};
use commonware_utils::{from_hex, hex};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ParseIdError {
    #[error("invalid integer id: {0:?}")]
    Integer(String),
    #[error("invalid snapshot id (expected <dragon>-<battle>): {0:?}")]
    Snapshot(String),
    #[error("invalid address (expected 20 hex bytes): {0:?}")]
    Address(String),
}

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self)
                    .map_err(|_| ParseIdError::Integer(s.to_string()))
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl Write for $name {
            fn write(&self, writer: &mut impl BufMut) {
                self.0.write(writer);
            }
        }

        impl Read for $name {
            type Cfg = ();

            fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
                Ok(Self(u64::read(reader)?))
            }
        }

        impl FixedSize for $name {
            const SIZE: usize = u64::SIZE;
        }
    };
}

integer_id!(
    /// Token id of a dragon.
    DragonId
);
integer_id!(
    /// Id of a concluded battle, unique per event source.
    BattleId
);
integer_id!(
    /// Id of a gladiator tournament match.
    GladiatorBattleId
);

/// Owner account of a dragon (20-byte chain address).
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const LEN: usize = 20;
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = from_hex(&digits.to_ascii_lowercase())
            .ok_or_else(|| ParseIdError::Address(s.to_string()))?;
        let raw: [u8; 20] = bytes
            .try_into()
            .map_err(|_| ParseIdError::Address(s.to_string()))?;
        Ok(Self(raw))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Write for Address {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.0);
    }
}

impl Read for Address {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        if reader.remaining() < Self::LEN {
            return Err(Error::EndOfBuffer);
        }
        let mut raw = [0u8; 20];
        reader.copy_to_slice(&mut raw);
        Ok(Self(raw))
    }
}

impl FixedSize for Address {
    const SIZE: usize = Address::LEN;
}

/// Key of a combatant's per-battle snapshot and of every sub-record hanging off it.
///
/// Rendered as `"{dragon}-{battle}"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId {
    pub dragon: DragonId,
    pub battle: BattleId,
}

impl SnapshotId {
    pub fn new(dragon: DragonId, battle: BattleId) -> Self {
        Self { dragon, battle }
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.dragon, self.battle)
    }
}

impl FromStr for SnapshotId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (dragon, battle) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| ParseIdError::Snapshot(s.to_string()))?;
        let dragon = dragon
            .parse::<u64>()
            .map_err(|_| ParseIdError::Snapshot(s.to_string()))?;
        let battle = battle
            .parse::<u64>()
            .map_err(|_| ParseIdError::Snapshot(s.to_string()))?;
        Ok(Self::new(DragonId(dragon), BattleId(battle)))
    }
}

impl Serialize for SnapshotId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SnapshotId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Write for SnapshotId {
    fn write(&self, writer: &mut impl BufMut) {
        self.dragon.write(writer);
        self.battle.write(writer);
    }
}

impl Read for SnapshotId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            dragon: DragonId::read(reader)?,
            battle: BattleId::read(reader)?,
        })
    }
}

impl FixedSize for SnapshotId {
    const SIZE: usize = DragonId::SIZE + BattleId::SIZE;
}
