use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::BufRead;
use tracing::{debug, info};
use wyvern_execution::{Applied, Chain, Projector};
use wyvern_types::execution::EventRecord;

use crate::store::{Cursor, SqliteStore};

/// What one ingestion run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    /// Events that changed the store.
    pub applied: u64,
    /// Events the projector skipped (unknown battle or tournament, rejected transition).
    pub skipped: u64,
    /// Events at or before the stored cursor.
    pub already_indexed: u64,
}

impl IngestStats {
    pub fn processed(&self) -> u64 {
        self.applied + self.skipped
    }
}

/// Projects a JSON-lines event log into the store.
///
/// Records must be in strictly increasing `(block, log_index)` order. Records at or before
/// the stored cursor were applied by an earlier run and are passed over. The cursor moves
/// after every projected record, so a failed run resumes after the last good one. Stops
/// after `limit` newly processed records when set.
pub fn ingest_log<R: BufRead, C: Chain>(
    reader: R,
    store: &mut SqliteStore,
    chain: &C,
    limit: Option<usize>,
) -> Result<IngestStats> {
    let start = store.cursor()?;
    let mut previous: Option<Cursor> = None;
    let mut stats = IngestStats::default();

    for (index, line) in reader.lines().enumerate() {
        let line_number = index + 1;
        if limit.is_some_and(|limit| stats.processed() >= limit as u64) {
            info!(limit = ?limit, "event limit reached");
            break;
        }

        let line = line.with_context(|| format!("read event log line {line_number}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: EventRecord = serde_json::from_str(&line)
            .with_context(|| format!("parse event log line {line_number}"))?;
        let position = Cursor::from(record.position());

        if let Some(previous) = previous {
            if position <= previous {
                bail!(
                    "event log out of order at line {line_number}: {position:?} does not follow {previous:?}"
                );
            }
        }
        previous = Some(position);

        if start.is_some_and(|start| position <= start) {
            stats.already_indexed += 1;
            continue;
        }

        let applied = Projector::new(store, chain)
            .apply(&record)
            .with_context(|| format!("project event log line {line_number}"))?;
        match applied {
            Applied::Projected => stats.applied += 1,
            Applied::Skipped(reason) => {
                debug!(?reason, line = line_number, "event skipped");
                stats.skipped += 1;
            }
        }
        store.set_cursor(position)?;
    }

    info!(
        applied = stats.applied,
        skipped = stats.skipped,
        already_indexed = stats.already_indexed,
        "ingested event log"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor as ReadCursor;
    use wyvern_execution::{
        load_battle, load_dragon, load_dragon_stat, load_gladiator_battle, mocks, State,
    };
    use wyvern_types::{
        dragon::BattlesStat,
        execution::{Event, Key},
        BattleId, DragonId, GladiatorBattleId,
    };

    fn log(records: &[EventRecord]) -> String {
        records
            .iter()
            .map(|record| serde_json::to_string(record).unwrap())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn battle_log() -> String {
        log(&[
            mocks::create_record(1, 0, mocks::battle_ended(42, 7, 9, 7)),
            mocks::create_record(
                1,
                1,
                Event::GladiatorBattleCancelled {
                    id: GladiatorBattleId(5),
                },
            ),
            mocks::create_record(2, 0, mocks::battle_ended(43, 9, 7, 7)),
        ])
    }

    #[test]
    fn test_ingest_applies_and_counts() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let chain = mocks::create_chain(&[7, 9]);
        mocks::seed_dragon(&mut store, 7, None);

        let stats = ingest_log(ReadCursor::new(battle_log()), &mut store, &chain, None).unwrap();
        assert_eq!(
            stats,
            IngestStats {
                applied: 2,
                skipped: 1,
                already_indexed: 0
            }
        );
        assert_eq!(store.cursor().unwrap(), Some(Cursor::new(2, 0)));
        assert!(load_battle(&store, BattleId(43)).unwrap().is_some());
        assert_eq!(
            load_dragon_stat(&store, DragonId(7)).unwrap(),
            Some(BattlesStat {
                wins: 1,
                defeats: 1
            })
        );
    }

    #[test]
    fn test_restart_applies_nothing_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wyvern.db");
        let chain = mocks::create_chain(&[7, 9]);
        {
            let mut store = SqliteStore::open(&path).unwrap();
            mocks::seed_dragon(&mut store, 7, None);
            ingest_log(ReadCursor::new(battle_log()), &mut store, &chain, None).unwrap();
        }

        let mut store = SqliteStore::open(&path).unwrap();
        let stats = ingest_log(ReadCursor::new(battle_log()), &mut store, &chain, None).unwrap();
        assert_eq!(stats.processed(), 0);
        assert_eq!(stats.already_indexed, 3);
        assert_eq!(
            load_dragon_stat(&store, DragonId(7)).unwrap(),
            Some(BattlesStat {
                wins: 1,
                defeats: 1
            })
        );
    }

    #[test]
    fn test_limit_resumes_on_next_run() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let chain = mocks::create_chain(&[7, 9]);

        let first = ingest_log(ReadCursor::new(battle_log()), &mut store, &chain, Some(1)).unwrap();
        assert_eq!(first.processed(), 1);
        assert!(load_battle(&store, BattleId(43)).unwrap().is_none());

        let second = ingest_log(ReadCursor::new(battle_log()), &mut store, &chain, None).unwrap();
        assert_eq!(second.already_indexed, 1);
        assert_eq!(second.processed(), 2);
        assert!(load_battle(&store, BattleId(43)).unwrap().is_some());
    }

    #[test]
    fn test_wei_scale_values_and_full_width_seeds() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let chain = mocks::create_chain(&[7, 9]);
        mocks::seed_dragon(&mut store, 7, None);
        let seed = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        let raw = format!(
            r#"{{"block":{{"number":1,"timestamp":1700000012}},"log_index":0,"transaction":{{"hash":"0x01","from":"0x0101010101010101010101010101010101010101","value":20000000000000000000,"gas_price":1,"gas_used":21000}},"event":{{"kind":"BattleEnded","winner_id":7,"looser_id":9,"attacker_id":7,"battle_id":42,"seed":"{seed}","date":1700000012,"is_gladiator":false,"gladiator_battle_id":0}}}}
{{"block":{{"number":2,"timestamp":1700000024}},"log_index":0,"event":{{"kind":"GladiatorBattleCreated","id":5,"dragon_id":7,"bet":"25000000000000000000","is_gold":false}}}}"#
        );

        let stats = ingest_log(ReadCursor::new(raw), &mut store, &chain, None).unwrap();
        assert_eq!(stats.applied, 2);
        assert_eq!(load_battle(&store, BattleId(42)).unwrap().unwrap().seed, seed);
        assert_eq!(
            load_dragon(&store, DragonId(7)).unwrap().unwrap().ether_spent,
            20_000_000_000_000_021_000
        );
        assert_eq!(
            load_gladiator_battle(&store, GladiatorBattleId(5))
                .unwrap()
                .unwrap()
                .bet,
            25_000_000_000_000_000_000
        );
    }

    #[test]
    fn test_rejects_out_of_order_records() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let chain = mocks::create_chain(&[7, 9]);
        let raw = log(&[
            mocks::create_record(2, 0, mocks::battle_ended(42, 7, 9, 7)),
            mocks::create_record(1, 5, mocks::battle_ended(43, 7, 9, 7)),
        ]);

        let err = ingest_log(ReadCursor::new(raw), &mut store, &chain, None).unwrap_err();
        assert!(err.to_string().contains("out of order at line 2"));
        assert_eq!(store.cursor().unwrap(), Some(Cursor::new(2, 0)));
        assert!(load_battle(&store, BattleId(43)).unwrap().is_none());
    }

    #[test]
    fn test_rejects_repeated_position() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let chain = mocks::create_chain(&[7, 9]);
        let record = mocks::create_record(1, 0, mocks::battle_ended(42, 7, 9, 7));
        let raw = log(&[record.clone(), record]);

        assert!(ingest_log(ReadCursor::new(raw), &mut store, &chain, None).is_err());
    }

    #[test]
    fn test_blank_lines_ignored_and_bad_json_reported() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let chain = mocks::create_chain(&[7, 9]);
        let raw = format!(
            "\n{}\n\n   \n{{not json}}\n",
            serde_json::to_string(&mocks::create_record(1, 0, mocks::battle_ended(42, 7, 9, 7)))
                .unwrap()
        );

        let err = ingest_log(ReadCursor::new(raw), &mut store, &chain, None).unwrap_err();
        assert!(err.to_string().contains("line 5"));
        assert!(store.get(&Key::Battle(BattleId(42))).unwrap().is_some());
    }

    #[test]
    fn test_projection_failure_keeps_cursor_at_last_good_record() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        // Dragon 10 is unknown to the chain
        let chain = mocks::create_chain(&[7, 9]);
        let raw = log(&[
            mocks::create_record(1, 0, mocks::battle_ended(42, 7, 9, 7)),
            mocks::create_record(2, 0, mocks::battle_ended(43, 7, 10, 7)),
        ]);

        let err = ingest_log(ReadCursor::new(raw), &mut store, &chain, None).unwrap_err();
        assert!(format!("{err:#}").contains("project event log line 2"));
        assert_eq!(store.cursor().unwrap(), Some(Cursor::new(1, 0)));
    }
}
