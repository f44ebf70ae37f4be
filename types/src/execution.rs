//! Store keys/values and the chain events folded into them.

use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};

use crate::dragon::{
    Address, Battle, BattleHealthAndMana, BattleId, BattlesStat, Dragon, DragonBattleSnapshot,
    DragonId, DragonSkills, DragonSpecialSkill, DragonTactics, GladiatorBattle,
    GladiatorBattleId, SnapshotId,
};

/// Key of a record in the entity store. One variant per entity kind.
#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Debug)]
pub enum Key {
    Dragon(DragonId),
    DragonBattlesStat(DragonId),
    UserBattlesStat(Address),
    Battle(BattleId),

    // Per-combatant snapshot and its sub-records (tags 4-9), all keyed by snapshot id
    Snapshot(SnapshotId),
    HealthAndMana(SnapshotId),
    Tactics(SnapshotId),
    Skills(SnapshotId),
    SpecialAttack(SnapshotId),
    SpecialDefense(SnapshotId),

    GladiatorBattle(GladiatorBattleId),
}

impl Key {
    /// Entity kind name, stable across releases (used as a storage column).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dragon(_) => "dragon",
            Self::DragonBattlesStat(_) => "dragon_battles_stat",
            Self::UserBattlesStat(_) => "user_battles_stat",
            Self::Battle(_) => "battle",
            Self::Snapshot(_) => "dragon_battle_snapshot",
            Self::HealthAndMana(_) => "battle_health_and_mana",
            Self::Tactics(_) => "dragon_tactics",
            Self::Skills(_) => "dragon_skills",
            Self::SpecialAttack(_) => "dragon_special_attack",
            Self::SpecialDefense(_) => "dragon_special_defense",
            Self::GladiatorBattle(_) => "gladiator_battle",
        }
    }
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Dragon(id) => {
                0u8.write(writer);
                id.write(writer);
            }
            Self::DragonBattlesStat(id) => {
                1u8.write(writer);
                id.write(writer);
            }
            Self::UserBattlesStat(address) => {
                2u8.write(writer);
                address.write(writer);
            }
            Self::Battle(id) => {
                3u8.write(writer);
                id.write(writer);
            }
            Self::Snapshot(id) => {
                4u8.write(writer);
                id.write(writer);
            }
            Self::HealthAndMana(id) => {
                5u8.write(writer);
                id.write(writer);
            }
            Self::Tactics(id) => {
                6u8.write(writer);
                id.write(writer);
            }
            Self::Skills(id) => {
                7u8.write(writer);
                id.write(writer);
            }
            Self::SpecialAttack(id) => {
                8u8.write(writer);
                id.write(writer);
            }
            Self::SpecialDefense(id) => {
                9u8.write(writer);
                id.write(writer);
            }
            Self::GladiatorBattle(id) => {
                10u8.write(writer);
                id.write(writer);
            }
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = match u8::read(reader)? {
            0 => Self::Dragon(DragonId::read(reader)?),
            1 => Self::DragonBattlesStat(DragonId::read(reader)?),
            2 => Self::UserBattlesStat(Address::read(reader)?),
            3 => Self::Battle(BattleId::read(reader)?),
            4 => Self::Snapshot(SnapshotId::read(reader)?),
            5 => Self::HealthAndMana(SnapshotId::read(reader)?),
            6 => Self::Tactics(SnapshotId::read(reader)?),
            7 => Self::Skills(SnapshotId::read(reader)?),
            8 => Self::SpecialAttack(SnapshotId::read(reader)?),
            9 => Self::SpecialDefense(SnapshotId::read(reader)?),
            10 => Self::GladiatorBattle(GladiatorBattleId::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(key)
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Dragon(_) | Self::DragonBattlesStat(_) => DragonId::SIZE,
                Self::UserBattlesStat(_) => Address::SIZE,
                Self::Battle(_) => BattleId::SIZE,
                Self::Snapshot(_)
                | Self::HealthAndMana(_)
                | Self::Tactics(_)
                | Self::Skills(_)
                | Self::SpecialAttack(_)
                | Self::SpecialDefense(_) => SnapshotId::SIZE,
                Self::GladiatorBattle(_) => GladiatorBattleId::SIZE,
            }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum Value {
    Dragon(Dragon),
    DragonBattlesStat(BattlesStat),
    UserBattlesStat(BattlesStat),
    Battle(Battle),

    Snapshot(DragonBattleSnapshot),
    HealthAndMana(BattleHealthAndMana),
    Tactics(DragonTactics),
    Skills(DragonSkills),
    SpecialAttack(DragonSpecialSkill),
    SpecialDefense(DragonSpecialSkill),

    GladiatorBattle(GladiatorBattle),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Dragon(dragon) => {
                0u8.write(writer);
                dragon.write(writer);
            }
            Self::DragonBattlesStat(stat) => {
                1u8.write(writer);
                stat.write(writer);
            }
            Self::UserBattlesStat(stat) => {
                2u8.write(writer);
                stat.write(writer);
            }
            Self::Battle(battle) => {
                3u8.write(writer);
                battle.write(writer);
            }
            Self::Snapshot(snapshot) => {
                4u8.write(writer);
                snapshot.write(writer);
            }
            Self::HealthAndMana(record) => {
                5u8.write(writer);
                record.write(writer);
            }
            Self::Tactics(tactics) => {
                6u8.write(writer);
                tactics.write(writer);
            }
            Self::Skills(skills) => {
                7u8.write(writer);
                skills.write(writer);
            }
            Self::SpecialAttack(skill) => {
                8u8.write(writer);
                skill.write(writer);
            }
            Self::SpecialDefense(skill) => {
                9u8.write(writer);
                skill.write(writer);
            }
            Self::GladiatorBattle(battle) => {
                10u8.write(writer);
                battle.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = match u8::read(reader)? {
            0 => Self::Dragon(Dragon::read(reader)?),
            1 => Self::DragonBattlesStat(BattlesStat::read(reader)?),
            2 => Self::UserBattlesStat(BattlesStat::read(reader)?),
            3 => Self::Battle(Battle::read(reader)?),
            4 => Self::Snapshot(DragonBattleSnapshot::read(reader)?),
            5 => Self::HealthAndMana(BattleHealthAndMana::read(reader)?),
            6 => Self::Tactics(DragonTactics::read(reader)?),
            7 => Self::Skills(DragonSkills::read(reader)?),
            8 => Self::SpecialAttack(DragonSpecialSkill::read(reader)?),
            9 => Self::SpecialDefense(DragonSpecialSkill::read(reader)?),
            10 => Self::GladiatorBattle(GladiatorBattle::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(value)
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Dragon(dragon) => dragon.encode_size(),
                Self::DragonBattlesStat(stat) | Self::UserBattlesStat(stat) => stat.encode_size(),
                Self::Battle(battle) => battle.encode_size(),
                Self::Snapshot(snapshot) => snapshot.encode_size(),
                Self::HealthAndMana(record) => record.encode_size(),
                Self::Tactics(tactics) => tactics.encode_size(),
                Self::Skills(skills) => skills.encode_size(),
                Self::SpecialAttack(skill) | Self::SpecialDefense(skill) => skill.encode_size(),
                Self::GladiatorBattle(battle) => battle.encode_size(),
            }
    }
}

/// Block the event was emitted in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub number: u64,
    /// Block timestamp in seconds.
    pub timestamp: u64,
}

/// Transaction that emitted the event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionContext {
    pub hash: String,
    pub from: Address,
    /// Wei attached to the call.
    pub value: u128,
    pub gas_price: u128,
    pub gas_used: u64,
}

impl TransactionContext {
    /// Total wei the sender paid: attached value plus gas.
    pub fn total_cost(&self) -> u128 {
        self.gas_price
            .saturating_mul(self.gas_used as u128)
            .saturating_add(self.value)
    }
}

/// Amounts above `u64::MAX` do not survive serde's buffering of tagged enums as JSON
/// numbers, so they travel as decimal strings. Small integers are still accepted.
mod serde_u128_decimal {
    use serde::{de, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(U128Visitor)
    }

    struct U128Visitor;

    impl de::Visitor<'_> for U128Visitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a decimal string or unsigned integer")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u128, E> {
            Ok(value as u128)
        }

        fn visit_u128<E: de::Error>(self, value: u128) -> Result<u128, E> {
            Ok(value)
        }

        fn visit_f64<E: de::Error>(self, _: f64) -> Result<u128, E> {
            Err(E::custom("amounts above u64::MAX must be decimal strings"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u128, E> {
            value
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid decimal amount: {value}")))
        }
    }
}

/// Seeds are kept as exact decimal text. Accepts a digit string or a small integer.
mod serde_seed_decimal {
    use crate::dragon::MAX_SEED_LENGTH;
    use serde::{de, Deserializer};
    use std::fmt;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SeedVisitor)
    }

    struct SeedVisitor;

    impl de::Visitor<'_> for SeedVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "a decimal string of at most {MAX_SEED_LENGTH} digits")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_u128<E: de::Error>(self, value: u128) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_f64<E: de::Error>(self, _: f64) -> Result<String, E> {
            Err(E::custom("seeds above u64::MAX must be decimal strings"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
            let digits = value.trim();
            if digits.is_empty()
                || digits.len() > MAX_SEED_LENGTH
                || !digits.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(E::custom(format!("invalid seed: {value}")));
            }
            Ok(digits.to_string())
        }
    }
}

/// Decoded battle/tournament events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Event {
    BattleEnded {
        winner_id: DragonId,
        looser_id: DragonId,
        attacker_id: DragonId,
        battle_id: BattleId,
        /// Randomness the battle was resolved with, as decimal text (up to 256 bits).
        #[serde(deserialize_with = "serde_seed_decimal::deserialize")]
        seed: String,
        date: u64,
        is_gladiator: bool,
        gladiator_battle_id: GladiatorBattleId,
    },
    BattleHealthAndMana {
        battle_id: BattleId,
        attacker_init_health: u32,
        attacker_init_mana: u32,
        attacker_max_health: u32,
        attacker_max_mana: u32,
        opponent_init_health: u32,
        opponent_init_mana: u32,
        opponent_max_health: u32,
        opponent_max_mana: u32,
    },
    BattleTacticsAndBuffs {
        battle_id: BattleId,
        attacker_melee_chance: u8,
        attacker_attack_chance: u8,
        attacker_buffs: Vec<u32>,
        opponent_melee_chance: u8,
        opponent_attack_chance: u8,
        opponent_buffs: Vec<u32>,
    },
    GladiatorBattleCreated {
        id: GladiatorBattleId,
        dragon_id: DragonId,
        /// Wei or gold units. Written as a decimal string so it survives JSON tooling.
        #[serde(with = "serde_u128_decimal")]
        bet: u128,
        is_gold: bool,
    },
    GladiatorBattleOpponentSelected {
        id: GladiatorBattleId,
        dragon_id: DragonId,
    },
    GladiatorBattleCancelled {
        id: GladiatorBattleId,
    },
    GladiatorBattleEnded {
        id: GladiatorBattleId,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BattleEnded { .. } => "BattleEnded",
            Self::BattleHealthAndMana { .. } => "BattleHealthAndMana",
            Self::BattleTacticsAndBuffs { .. } => "BattleTacticsAndBuffs",
            Self::GladiatorBattleCreated { .. } => "GladiatorBattleCreated",
            Self::GladiatorBattleOpponentSelected { .. } => "GladiatorBattleOpponentSelected",
            Self::GladiatorBattleCancelled { .. } => "GladiatorBattleCancelled",
            Self::GladiatorBattleEnded { .. } => "GladiatorBattleEnded",
        }
    }
}

/// An event together with where it was emitted. The unit of delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub block: BlockContext,
    pub log_index: u32,
    #[serde(default)]
    pub transaction: TransactionContext,
    pub event: Event,
}

impl EventRecord {
    /// Position in the log: block number, then index within the block.
    pub fn position(&self) -> (u64, u32) {
        (self.block.number, self.log_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};

    #[test]
    fn test_key_encoding_is_tagged_per_kind() {
        let snapshot = SnapshotId::new(DragonId(7), BattleId(42));
        let keys = [
            Key::Snapshot(snapshot),
            Key::HealthAndMana(snapshot),
            Key::Tactics(snapshot),
        ];
        let encoded: Vec<_> = keys.iter().map(|key| key.encode().to_vec()).collect();
        assert_ne!(encoded[0], encoded[1]);
        assert_ne!(encoded[1], encoded[2]);
        for (key, bytes) in keys.iter().zip(&encoded) {
            assert_eq!(bytes.len(), key.encode_size());
            assert_eq!(Key::decode(bytes.as_slice()).unwrap(), *key);
        }
    }

    #[test]
    fn test_key_rejects_unknown_tag() {
        let bytes = [200u8, 0, 0, 0, 0, 0, 0, 0, 1];
        assert!(matches!(
            Key::decode(bytes.as_slice()),
            Err(Error::InvalidEnum(200))
        ));
    }

    #[test]
    fn test_value_roundtrip_for_user_stat() {
        let value = Value::UserBattlesStat(BattlesStat {
            wins: 3,
            defeats: 1,
        });
        let decoded = Value::decode(value.encode()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_event_record_from_json() {
        let raw = r#"{
            "block": { "number": 10, "timestamp": 1700000000 },
            "log_index": 2,
            "transaction": {
                "hash": "0xabc",
                "from": "0x0101010101010101010101010101010101010101",
                "value": 5000,
                "gas_price": 2,
                "gas_used": 100
            },
            "event": {
                "kind": "BattleEnded",
                "winner_id": 7,
                "looser_id": 9,
                "attacker_id": 7,
                "battle_id": 42,
                "seed": 123456789,
                "date": 1700000000,
                "is_gladiator": false,
                "gladiator_battle_id": 0
            }
        }"#;
        let record: EventRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.position(), (10, 2));
        assert_eq!(record.transaction.total_cost(), 5_200);
        assert_eq!(record.event.name(), "BattleEnded");
        match record.event {
            Event::BattleEnded {
                winner_id,
                battle_id,
                ..
            } => {
                assert_eq!(winner_id, DragonId(7));
                assert_eq!(battle_id, BattleId(42));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_event_carries_amounts_and_seeds_beyond_u64() {
        let raw = r#"{
            "block": { "number": 3, "timestamp": 1700000036 },
            "log_index": 0,
            "transaction": {
                "hash": "0xabc",
                "from": "0x0101010101010101010101010101010101010101",
                "value": 20000000000000000000,
                "gas_price": 1,
                "gas_used": 1
            },
            "event": {
                "kind": "GladiatorBattleCreated",
                "id": 5,
                "dragon_id": 3,
                "bet": "20000000000000000000",
                "is_gold": false
            }
        }"#;
        let record: EventRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.transaction.value, 20_000_000_000_000_000_000);
        assert_eq!(
            record.event,
            Event::GladiatorBattleCreated {
                id: GladiatorBattleId(5),
                dragon_id: DragonId(3),
                bet: 20_000_000_000_000_000_000,
                is_gold: false,
            }
        );

        // Written records read back unchanged
        let line = serde_json::to_string(&record).unwrap();
        assert_eq!(serde_json::from_str::<EventRecord>(&line).unwrap(), record);

        let seed = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        let event = Event::BattleEnded {
            winner_id: DragonId(7),
            looser_id: DragonId(9),
            attacker_id: DragonId(7),
            battle_id: BattleId(42),
            seed: seed.to_string(),
            date: 1,
            is_gladiator: false,
            gladiator_battle_id: GladiatorBattleId(0),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(serde_json::from_str::<Event>(&json).unwrap(), event);
    }

    #[test]
    fn test_event_rejects_lossy_or_malformed_numbers() {
        let bet_as_number = r#"{"kind":"GladiatorBattleCreated","id":5,"dragon_id":3,"bet":20000000000000000000,"is_gold":true}"#;
        assert!(serde_json::from_str::<Event>(bet_as_number).is_err());

        for seed in [r#""12a""#, r#""""#, r#""-5""#] {
            let raw = format!(
                r#"{{"kind":"BattleEnded","winner_id":7,"looser_id":9,"attacker_id":7,"battle_id":42,"seed":{seed},"date":1,"is_gladiator":false,"gladiator_battle_id":0}}"#
            );
            assert!(serde_json::from_str::<Event>(&raw).is_err(), "{seed}");
        }
    }

    #[test]
    fn test_event_record_transaction_defaults_when_absent() {
        let raw = r#"{
            "block": { "number": 1, "timestamp": 2 },
            "log_index": 0,
            "event": { "kind": "GladiatorBattleCancelled", "id": 5 }
        }"#;
        let record: EventRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.transaction, TransactionContext::default());
        assert_eq!(
            record.event,
            Event::GladiatorBattleCancelled {
                id: GladiatorBattleId(5)
            }
        );
    }
}
