use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use wyvern_execution::Chain;

mod api;
pub use api::Api;

mod fixture;
pub use fixture::{ChainFixture, GenesisDragon};

mod ingest;
pub use ingest::{ingest_log, IngestStats};

mod store;
pub use store::{Cursor, SqliteStore};

#[derive(Clone, Debug, Serialize)]
pub struct IndexerConfig {
    pub db_path: PathBuf,
    pub events_path: Option<PathBuf>,
    pub chain_path: Option<PathBuf>,
    pub host: IpAddr,
    pub port: u16,
    pub serve: bool,
    /// Stop ingestion after this many newly processed events.
    pub max_events: Option<usize>,
}

#[derive(Default)]
pub struct IndexerMetrics {
    applied: AtomicU64,
    skipped: AtomicU64,
    already_indexed: AtomicU64,
    runs: AtomicU64,
    failed_runs: AtomicU64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct IndexerMetricsSnapshot {
    pub applied: u64,
    pub skipped: u64,
    pub already_indexed: u64,
    pub runs: u64,
    pub failed_runs: u64,
}

impl IndexerMetrics {
    pub fn snapshot(&self) -> IndexerMetricsSnapshot {
        IndexerMetricsSnapshot {
            applied: self.applied.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            already_indexed: self.already_indexed.load(Ordering::Relaxed),
            runs: self.runs.load(Ordering::Relaxed),
            failed_runs: self.failed_runs.load(Ordering::Relaxed),
        }
    }

    fn record_run(&self, stats: &IngestStats) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.applied.fetch_add(stats.applied, Ordering::Relaxed);
        self.skipped.fetch_add(stats.skipped, Ordering::Relaxed);
        self.already_indexed
            .fetch_add(stats.already_indexed, Ordering::Relaxed);
    }

    fn inc_failed_run(&self) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.failed_runs.fetch_add(1, Ordering::Relaxed);
    }
}

/// Ingestion counters plus what the store currently holds.
#[derive(Clone, Debug, Serialize)]
pub struct IndexerStats {
    pub metrics: IndexerMetricsSnapshot,
    pub cursor: Option<Cursor>,
    pub entities: Vec<EntityCount>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EntityCount {
    pub kind: String,
    pub count: u64,
}

/// Owns the entity store. Ingestion and API reads take turns on it.
pub struct Indexer {
    pub config: IndexerConfig,
    store: Mutex<SqliteStore>,
    metrics: IndexerMetrics,
}

impl Indexer {
    pub fn open(config: IndexerConfig) -> Result<Self> {
        let store = SqliteStore::open(&config.db_path)?;
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: IndexerConfig, store: SqliteStore) -> Self {
        Self {
            config,
            store: Mutex::new(store),
            metrics: IndexerMetrics::default(),
        }
    }

    pub(crate) fn store(&self) -> Result<MutexGuard<'_, SqliteStore>> {
        self.store
            .lock()
            .map_err(|_| anyhow!("entity store lock poisoned"))
    }

    /// Seeds genesis records from the fixture, then ingests the event log at `path`.
    pub fn ingest_file(&self, path: &Path, fixture: &ChainFixture) -> Result<IngestStats> {
        let file = File::open(path).with_context(|| format!("open event log {}", path.display()))?;
        {
            let mut store = self.store()?;
            fixture.seed_genesis(&mut *store)?;
        }
        self.ingest(BufReader::new(file), fixture)
    }

    pub fn ingest<R: std::io::BufRead, C: Chain>(&self, reader: R, chain: &C) -> Result<IngestStats> {
        let mut store = self.store()?;
        match ingest_log(reader, &mut store, chain, self.config.max_events) {
            Ok(stats) => {
                self.metrics.record_run(&stats);
                Ok(stats)
            }
            Err(err) => {
                self.metrics.inc_failed_run();
                Err(err)
            }
        }
    }

    pub fn metrics_snapshot(&self) -> IndexerMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn stats(&self) -> Result<IndexerStats> {
        let store = self.store()?;
        let entities = store
            .counts()?
            .into_iter()
            .map(|(kind, count)| EntityCount { kind, count })
            .collect();
        Ok(IndexerStats {
            metrics: self.metrics.snapshot(),
            cursor: store.cursor()?,
            entities,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::net::Ipv4Addr;

    pub fn config(db_path: PathBuf) -> IndexerConfig {
        IndexerConfig {
            db_path,
            events_path: None,
            chain_path: None,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            serve: false,
            max_events: None,
        }
    }

    pub fn in_memory() -> Indexer {
        Indexer::with_store(
            config(PathBuf::from(":memory:")),
            SqliteStore::open_in_memory().expect("open store"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor as ReadCursor;
    use wyvern_execution::mocks;
    use wyvern_types::execution::Event;
    use wyvern_types::GladiatorBattleId;

    #[test]
    fn test_ingest_file_seeds_genesis_and_tracks_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let events = dir.path().join("events.jsonl");
        let records = [
            mocks::create_record(1, 0, mocks::battle_ended(42, 7, 9, 7)),
            mocks::create_record(
                2,
                0,
                Event::GladiatorBattleEnded {
                    id: GladiatorBattleId(1),
                },
            ),
        ];
        let raw = records
            .iter()
            .map(|record| serde_json::to_string(record).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        std::fs::write(&events, raw).unwrap();

        let fixture = ChainFixture {
            dragons: mocks::create_chain(&[7, 9]),
            genesis: vec![GenesisDragon {
                id: wyvern_types::DragonId(7),
                owner: Some(mocks::create_address(1)),
                stats: true,
            }],
        };
        let indexer = Indexer::open(test_support::config(dir.path().join("wyvern.db"))).unwrap();
        let stats = indexer.ingest_file(&events, &fixture).unwrap();
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.skipped, 1);

        let snapshot = indexer.metrics_snapshot();
        assert_eq!(snapshot.runs, 1);
        assert_eq!(snapshot.applied, 1);
        assert_eq!(snapshot.failed_runs, 0);

        let stats = indexer.stats().unwrap();
        assert_eq!(stats.cursor, Some(Cursor::new(2, 0)));
        let battles = stats
            .entities
            .iter()
            .find(|entry| entry.kind == "battle")
            .map(|entry| entry.count);
        assert_eq!(battles, Some(1));
    }

    #[test]
    fn test_failed_run_is_counted() {
        let indexer = test_support::in_memory();
        let chain = mocks::create_chain(&[]);
        assert!(indexer
            .ingest(ReadCursor::new("not json"), &chain)
            .is_err());
        let snapshot = indexer.metrics_snapshot();
        assert_eq!(snapshot.runs, 1);
        assert_eq!(snapshot.failed_runs, 1);
    }
}
