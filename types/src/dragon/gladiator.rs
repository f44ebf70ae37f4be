use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use serde::{Deserialize, Serialize};

use super::{DragonId, GladiatorBattleId, MAX_APPLICANTS};

/// Lifecycle of a gladiator tournament match.
///
/// Created -> OpponentSelected -> {Cancelled | Conducted}. A match may also be cancelled
/// before an opponent is chosen. Cancelled and Conducted are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GladiatorBattleStatus {
    Created = 0,
    OpponentSelected = 1,
    Cancelled = 2,
    Conducted = 3,
}

impl GladiatorBattleStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Conducted)
    }

    /// Whether a match in `self` may move to `next`.
    ///
    /// Re-applying the current status is accepted so redelivered events stay harmless.
    pub fn can_advance_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Self::Created, Self::OpponentSelected)
                | (Self::Created, Self::Cancelled)
                | (Self::OpponentSelected, Self::Cancelled)
                | (Self::OpponentSelected, Self::Conducted)
        )
    }
}

impl Write for GladiatorBattleStatus {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for GladiatorBattleStatus {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        match value {
            0 => Ok(Self::Created),
            1 => Ok(Self::OpponentSelected),
            2 => Ok(Self::Cancelled),
            3 => Ok(Self::Conducted),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for GladiatorBattleStatus {
    const SIZE: usize = 1;
}

/// Currency a gladiator bet is placed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Currency {
    Gold = 0,
    Ether = 1,
}

impl Currency {
    pub fn from_is_gold(is_gold: bool) -> Self {
        if is_gold {
            Self::Gold
        } else {
            Self::Ether
        }
    }
}

impl Write for Currency {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for Currency {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        match value {
            0 => Ok(Self::Gold),
            1 => Ok(Self::Ether),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for Currency {
    const SIZE: usize = 1;
}

/// Wager-backed match-making record. Resolves into a [`super::Battle`] when conducted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GladiatorBattle {
    pub id: GladiatorBattleId,
    pub status: GladiatorBattleStatus,
    pub bet: u128,
    pub currency: Currency,
    pub creator_dragon: DragonId,
    pub opponent_dragon: Option<DragonId>,
    pub applicants_dragon: Vec<DragonId>,
}

impl GladiatorBattle {
    pub fn new(id: GladiatorBattleId, creator: DragonId, bet: u128, currency: Currency) -> Self {
        Self {
            id,
            status: GladiatorBattleStatus::Created,
            bet,
            currency,
            creator_dragon: creator,
            opponent_dragon: None,
            applicants_dragon: Vec::new(),
        }
    }

    /// Dragons holding a back-reference to this match.
    pub fn participants(&self) -> impl Iterator<Item = DragonId> + '_ {
        std::iter::once(self.creator_dragon).chain(self.opponent_dragon)
    }
}

impl Write for GladiatorBattle {
    fn write(&self, writer: &mut impl BufMut) {
        self.id.write(writer);
        self.status.write(writer);
        self.bet.write(writer);
        self.currency.write(writer);
        self.creator_dragon.write(writer);
        self.opponent_dragon.write(writer);
        self.applicants_dragon.write(writer);
    }
}

impl Read for GladiatorBattle {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            id: GladiatorBattleId::read(reader)?,
            status: GladiatorBattleStatus::read(reader)?,
            bet: u128::read(reader)?,
            currency: Currency::read(reader)?,
            creator_dragon: DragonId::read(reader)?,
            opponent_dragon: Option::<DragonId>::read(reader)?,
            applicants_dragon: Vec::<DragonId>::read_range(reader, 0..=MAX_APPLICANTS)?,
        })
    }
}

impl EncodeSize for GladiatorBattle {
    fn encode_size(&self) -> usize {
        GladiatorBattleId::SIZE
            + GladiatorBattleStatus::SIZE
            + u128::SIZE
            + Currency::SIZE
            + DragonId::SIZE
            + self.opponent_dragon.encode_size()
            + self.applicants_dragon.encode_size()
    }
}
