use anyhow::{Context, Result};
use commonware_codec::{DecodeExt, Encode};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use wyvern_execution::State;
use wyvern_types::execution::{Key, Value};

/// Position of the last event applied to the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Cursor {
    pub block: u64,
    pub log_index: u32,
}

impl Cursor {
    pub fn new(block: u64, log_index: u32) -> Self {
        Self { block, log_index }
    }
}

impl From<(u64, u32)> for Cursor {
    fn from((block, log_index): (u64, u32)) -> Self {
        Self::new(block, log_index)
    }
}

/// SQLite-backed entity store. Keys and values are stored codec-encoded.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("open entity store at {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory entity store")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn cursor(&self) -> Result<Option<Cursor>> {
        self.conn
            .query_row(
                "SELECT block, log_index FROM cursor WHERE id = 0",
                [],
                |row| Ok(Cursor::new(row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("query cursor")
    }

    pub fn set_cursor(&mut self, cursor: Cursor) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO cursor (id, block, log_index) VALUES (0, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET block = excluded.block, log_index = excluded.log_index",
                params![cursor.block, cursor.log_index],
            )
            .context("update cursor")?;
        Ok(())
    }

    /// Number of stored records per entity kind.
    pub fn counts(&self) -> Result<Vec<(String, u64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM entities GROUP BY kind ORDER BY kind")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("count entities")
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA synchronous=NORMAL;
         CREATE TABLE IF NOT EXISTS entities (
             key BLOB PRIMARY KEY,
             kind TEXT NOT NULL,
             value BLOB NOT NULL
         );
         CREATE INDEX IF NOT EXISTS entities_kind ON entities(kind);
         CREATE TABLE IF NOT EXISTS cursor (
             id INTEGER PRIMARY KEY CHECK (id = 0),
             block INTEGER NOT NULL,
             log_index INTEGER NOT NULL
         );",
    )
    .context("init entity store schema")?;
    Ok(())
}

impl State for SqliteStore {
    fn get(&self, key: &Key) -> Result<Option<Value>> {
        let raw: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT value FROM entities WHERE key = ?1",
                params![&key.encode()[..]],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("load {}", key.kind()))?;
        raw.map(|bytes| {
            Value::decode(bytes.as_slice()).with_context(|| format!("decode {}", key.kind()))
        })
        .transpose()
    }

    fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO entities (key, kind, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![&key.encode()[..], key.kind(), &value.encode()[..]],
            )
            .with_context(|| format!("store {}", key.kind()))?;
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM entities WHERE key = ?1",
                params![&key.encode()[..]],
            )
            .with_context(|| format!("delete {}", key.kind()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wyvern_execution::load_dragon;
    use wyvern_types::{
        dragon::{BattlesStat, Dragon},
        DragonId,
    };

    #[test]
    fn test_insert_get_delete() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let key = Key::Dragon(DragonId(7));
        assert_eq!(store.get(&key).unwrap(), None);

        let mut dragon = Dragon::new(DragonId(7), None);
        store
            .insert(key, Value::Dragon(dragon.clone()))
            .unwrap();
        dragon.level = 4;
        store
            .insert(key, Value::Dragon(dragon.clone()))
            .unwrap();
        assert_eq!(load_dragon(&store, DragonId(7)).unwrap(), Some(dragon));

        store.delete(&key).unwrap();
        assert_eq!(store.get(&key).unwrap(), None);
    }

    #[test]
    fn test_counts_by_kind() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        for id in 1..=3 {
            store
                .insert(
                    Key::DragonBattlesStat(DragonId(id)),
                    Value::DragonBattlesStat(BattlesStat::default()),
                )
                .unwrap();
        }
        store
            .insert(
                Key::Dragon(DragonId(1)),
                Value::Dragon(Dragon::new(DragonId(1), None)),
            )
            .unwrap();
        assert_eq!(
            store.counts().unwrap(),
            vec![
                ("dragon".to_string(), 1),
                ("dragon_battles_stat".to_string(), 3)
            ]
        );
    }

    #[test]
    fn test_cursor_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wyvern.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            assert_eq!(store.cursor().unwrap(), None);
            store.set_cursor(Cursor::new(10, 2)).unwrap();
            store.set_cursor(Cursor::new(11, 0)).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.cursor().unwrap(), Some(Cursor::new(11, 0)));
    }

    #[test]
    fn test_cursor_orders_by_block_then_log_index() {
        assert!(Cursor::new(1, 9) < Cursor::new(2, 0));
        assert!(Cursor::new(2, 0) < Cursor::new(2, 1));
    }
}
