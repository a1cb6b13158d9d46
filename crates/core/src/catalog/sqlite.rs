//! SQLite-backed catalog implementation.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::{
    CatalogStats, CatalogStore, Channel, NewChannel, ReportOutcome, ReputationPolicy, Sample,
    SampleUpsert, UpsertOutcome, DEFAULT_REPUTATION,
};
use crate::storage::{parse_timestamp, to_timestamp, StoreError};

const ID_CHUNK: usize = 500;

const SAMPLE_COLUMNS: &str = "external_id, title, channel, channel_id, thumbnail_url, genre, era, \
     duration_seconds, quality_score, date_added, updated_at";

/// SQLite-backed catalog.
pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
}

impl SqliteCatalogStore {
    /// Create a new SQLite catalog, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite catalog (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            -- Reputation ledger (one row per upstream channel)
            CREATE TABLE IF NOT EXISTS channels (
                channel_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                reputation REAL NOT NULL DEFAULT 0.5
                    CHECK (reputation >= 0.0 AND reputation <= 1.0),
                skip_count INTEGER NOT NULL DEFAULT 0 CHECK (skip_count >= 0),
                sample_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Promoted samples
            CREATE TABLE IF NOT EXISTS samples (
                external_id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                channel TEXT NOT NULL,
                channel_id TEXT,
                thumbnail_url TEXT,
                genre TEXT,
                era TEXT,
                duration_seconds INTEGER,
                quality_score INTEGER,
                date_added TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_samples_channel ON samples(channel_id);
            CREATE INDEX IF NOT EXISTS idx_samples_date_added ON samples(date_added);

            -- Feedback reports
            CREATE TABLE IF NOT EXISTS sample_reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id TEXT NOT NULL,
                channel_id TEXT,
                reason TEXT NOT NULL,
                penalty REAL,
                created_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("catalog lock poisoned".to_string()))
    }

    fn load_channel(conn: &Connection, channel_id: &str) -> Result<Option<Channel>, StoreError> {
        let channel = conn
            .query_row(
                "SELECT channel_id, name, reputation, skip_count, sample_count, created_at, updated_at
                 FROM channels WHERE channel_id = ?",
                params![channel_id],
                |row| {
                    let created_at: String = row.get(5)?;
                    let updated_at: String = row.get(6)?;
                    Ok(Channel {
                        channel_id: row.get(0)?,
                        name: row.get(1)?,
                        reputation: row.get(2)?,
                        skip_count: row.get(3)?,
                        sample_count: row.get(4)?,
                        created_at: parse_timestamp(&created_at),
                        updated_at: parse_timestamp(&updated_at),
                    })
                },
            )
            .optional()?;
        Ok(channel)
    }

    fn row_to_sample(row: &rusqlite::Row) -> rusqlite::Result<Sample> {
        let date_added: String = row.get(9)?;
        let updated_at: String = row.get(10)?;
        Ok(Sample {
            external_id: row.get(0)?,
            title: row.get(1)?,
            channel: row.get(2)?,
            channel_id: row.get(3)?,
            thumbnail_url: row.get(4)?,
            genre: row.get(5)?,
            era: row.get(6)?,
            duration_seconds: row.get(7)?,
            quality_score: row.get(8)?,
            date_added: parse_timestamp(&date_added),
            updated_at: parse_timestamp(&updated_at),
        })
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn get_channel(&self, channel_id: &str) -> Result<Option<Channel>, StoreError> {
        let conn = self.conn()?;
        Self::load_channel(&conn, channel_id)
    }

    fn insert_channel(&self, channel: &NewChannel) -> Result<Channel, StoreError> {
        let conn = self.conn()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO channels (channel_id, name, reputation, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                channel.channel_id,
                channel.name,
                DEFAULT_REPUTATION,
                to_timestamp(now),
                to_timestamp(now),
            ],
        )?;

        Ok(Channel {
            channel_id: channel.channel_id.clone(),
            name: channel.name.clone(),
            reputation: DEFAULT_REPUTATION,
            skip_count: 0,
            sample_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    fn existing_sample_ids(&self, ids: &[String]) -> Result<HashSet<String>, StoreError> {
        let conn = self.conn()?;
        let mut found = HashSet::new();

        for chunk in ids.chunks(ID_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!(
                "SELECT external_id FROM samples WHERE external_id IN ({})",
                placeholders
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                row.get::<_, String>(0)
            })?;
            for row in rows {
                found.insert(row?);
            }
        }

        Ok(found)
    }

    fn get_sample(&self, external_id: &str) -> Result<Option<Sample>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM samples WHERE external_id = ?", SAMPLE_COLUMNS);
        let sample = conn
            .query_row(&sql, params![external_id], Self::row_to_sample)
            .optional()?;
        Ok(sample)
    }

    fn list_samples(&self, limit: u32) -> Result<Vec<Sample>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM samples ORDER BY date_added DESC, rowid DESC LIMIT ?",
            SAMPLE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit], Self::row_to_sample)?;

        let mut samples = Vec::new();
        for row in rows {
            samples.push(row?);
        }
        Ok(samples)
    }

    fn upsert_sample(&self, sample: &SampleUpsert) -> Result<UpsertOutcome, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = to_timestamp(Utc::now());

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO samples
             (external_id, title, channel, channel_id, thumbnail_url, genre, era,
              duration_seconds, quality_score, date_added, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                sample.external_id,
                sample.title,
                sample.channel,
                sample.channel_id,
                sample.thumbnail_url,
                sample.genre,
                sample.era,
                sample.duration_seconds,
                sample.quality_score,
                now,
                now,
            ],
        )?;

        let outcome = if inserted > 0 {
            if let Some(channel_id) = &sample.channel_id {
                tx.execute(
                    "UPDATE channels SET sample_count = sample_count + 1, updated_at = ?
                     WHERE channel_id = ?",
                    params![now, channel_id],
                )?;
            }
            UpsertOutcome::Created
        } else {
            tx.execute(
                "UPDATE samples SET
                    title = ?, channel = ?, channel_id = ?, thumbnail_url = ?, genre = ?,
                    era = ?, duration_seconds = ?, quality_score = ?, updated_at = ?
                 WHERE external_id = ?",
                params![
                    sample.title,
                    sample.channel,
                    sample.channel_id,
                    sample.thumbnail_url,
                    sample.genre,
                    sample.era,
                    sample.duration_seconds,
                    sample.quality_score,
                    now,
                    sample.external_id,
                ],
            )?;
            UpsertOutcome::Updated
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn apply_report(
        &self,
        external_id: &str,
        reason: &str,
        policy: &ReputationPolicy,
    ) -> Result<ReportOutcome, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = to_timestamp(Utc::now());

        let channel_id: Option<String> = tx
            .query_row(
                "SELECT channel_id FROM samples WHERE external_id = ?",
                params![external_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("sample {}", external_id)))?;

        let channel = match &channel_id {
            Some(id) => Self::load_channel(&tx, id)?,
            None => None,
        };

        let outcome = match channel {
            Some(channel) => {
                let penalty = policy.penalty(channel.sample_count);
                let reputation = policy.apply(channel.reputation, channel.sample_count);
                let skip_count = channel.skip_count + 1;

                tx.execute(
                    "UPDATE channels SET reputation = ?, skip_count = ?, updated_at = ?
                     WHERE channel_id = ?",
                    params![reputation, skip_count, now, channel.channel_id],
                )?;
                tx.execute(
                    "INSERT INTO sample_reports (external_id, channel_id, reason, penalty, created_at)
                     VALUES (?, ?, ?, ?, ?)",
                    params![external_id, channel.channel_id, reason, penalty, now],
                )?;

                ReportOutcome::Penalized {
                    channel_id: channel.channel_id,
                    penalty,
                    reputation,
                    skip_count,
                }
            }
            None => {
                tx.execute(
                    "INSERT INTO sample_reports (external_id, channel_id, reason, penalty, created_at)
                     VALUES (?, ?, ?, NULL, ?)",
                    params![external_id, channel_id, reason, now],
                )?;
                ReportOutcome::ChannelUnknown {
                    external_id: external_id.to_string(),
                }
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn stats(&self) -> Result<CatalogStats, StoreError> {
        let conn = self.conn()?;

        let samples: i64 = conn.query_row("SELECT COUNT(*) FROM samples", [], |row| row.get(0))?;
        let (channels, average_reputation): (i64, Option<f64>) = conn.query_row(
            "SELECT COUNT(*), AVG(reputation) FROM channels",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let reports: i64 =
            conn.query_row("SELECT COUNT(*) FROM sample_reports", [], |row| row.get(0))?;

        Ok(CatalogStats {
            samples: samples as u64,
            channels: channels as u64,
            reports: reports as u64,
            average_reputation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn channel(id: &str) -> NewChannel {
        NewChannel {
            channel_id: id.to_string(),
            name: format!("Channel {}", id),
        }
    }

    fn sample(id: &str, channel_id: Option<&str>) -> SampleUpsert {
        SampleUpsert {
            external_id: id.to_string(),
            title: format!("Title {}", id),
            channel: "Crate Shop".to_string(),
            channel_id: channel_id.map(String::from),
            thumbnail_url: Some("http://img/1.jpg".to_string()),
            genre: Some("funk".to_string()),
            era: Some("1970s".to_string()),
            duration_seconds: Some(180),
            quality_score: Some(80),
        }
    }

    #[test]
    fn test_insert_channel_twice_is_duplicate() {
        let catalog = SqliteCatalogStore::in_memory().unwrap();
        catalog.insert_channel(&channel("UC1")).unwrap();

        let result = catalog.insert_channel(&channel("UC1"));
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
    }

    #[test]
    fn test_get_or_create_channel_is_idempotent() {
        let catalog = SqliteCatalogStore::in_memory().unwrap();

        let first = catalog.get_or_create_channel(&channel("UC1")).unwrap();
        let second = catalog.get_or_create_channel(&channel("UC1")).unwrap();

        assert_eq!(first.channel_id, second.channel_id);
        assert_eq!(second.reputation, DEFAULT_REPUTATION);
        assert_eq!(catalog.stats().unwrap().channels, 1);
    }

    #[test]
    fn test_upsert_sample_created_then_updated() {
        let catalog = SqliteCatalogStore::in_memory().unwrap();
        catalog.get_or_create_channel(&channel("UC1")).unwrap();

        let first = catalog.upsert_sample(&sample("AAAAAAAAAAA", Some("UC1"))).unwrap();
        let mut changed = sample("AAAAAAAAAAA", Some("UC1"));
        changed.title = "Retitled".to_string();
        let second = catalog.upsert_sample(&changed).unwrap();

        assert_eq!(first, UpsertOutcome::Created);
        assert_eq!(second, UpsertOutcome::Updated);

        let stored = catalog.get_sample("AAAAAAAAAAA").unwrap().unwrap();
        assert_eq!(stored.title, "Retitled");
        // Only the creation counts toward the channel.
        assert_eq!(catalog.get_channel("UC1").unwrap().unwrap().sample_count, 1);
        assert_eq!(catalog.stats().unwrap().samples, 1);
    }

    #[test]
    fn test_report_penalizes_channel() {
        let catalog = SqliteCatalogStore::in_memory().unwrap();
        catalog.get_or_create_channel(&channel("UC1")).unwrap();
        catalog.upsert_sample(&sample("AAAAAAAAAAA", Some("UC1"))).unwrap();

        let outcome = catalog
            .apply_report("AAAAAAAAAAA", "not a sample", &ReputationPolicy::default())
            .unwrap();

        match outcome {
            ReportOutcome::Penalized {
                reputation,
                skip_count,
                penalty,
                ..
            } => {
                // sample_count = 1 -> 0.05 / 1.1
                assert!((penalty - 0.05 / 1.1).abs() < 1e-9);
                assert!((reputation - (0.5 - 0.05 / 1.1)).abs() < 1e-9);
                assert_eq!(skip_count, 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let stored = catalog.get_channel("UC1").unwrap().unwrap();
        assert_eq!(stored.skip_count, 1);
        assert_eq!(catalog.stats().unwrap().reports, 1);
    }

    #[test]
    fn test_report_without_channel() {
        let catalog = SqliteCatalogStore::in_memory().unwrap();
        catalog.upsert_sample(&sample("AAAAAAAAAAA", None)).unwrap();

        let outcome = catalog
            .apply_report("AAAAAAAAAAA", "broken", &ReputationPolicy::default())
            .unwrap();
        assert!(matches!(outcome, ReportOutcome::ChannelUnknown { .. }));
    }

    #[test]
    fn test_report_unknown_sample() {
        let catalog = SqliteCatalogStore::in_memory().unwrap();
        let result = catalog.apply_report("ZZZZZZZZZZZ", "x", &ReputationPolicy::default());
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_reputation_never_negative() {
        let catalog = SqliteCatalogStore::in_memory().unwrap();
        catalog.get_or_create_channel(&channel("UC1")).unwrap();
        catalog.upsert_sample(&sample("AAAAAAAAAAA", Some("UC1"))).unwrap();
        let harsh = ReputationPolicy {
            base_penalty: 1.0,
            damping_factor: 0.0,
        };

        for _ in 0..3 {
            catalog.apply_report("AAAAAAAAAAA", "bad", &harsh).unwrap();
        }

        let stored = catalog.get_channel("UC1").unwrap().unwrap();
        assert_eq!(stored.reputation, 0.0);
        assert_eq!(stored.skip_count, 3);
    }

    #[test]
    fn test_existing_sample_ids_and_listing() {
        let dir = tempdir().unwrap();
        let catalog = SqliteCatalogStore::new(&dir.path().join("catalog.db")).unwrap();
        catalog.upsert_sample(&sample("AAAAAAAAAAA", None)).unwrap();
        catalog.upsert_sample(&sample("BBBBBBBBBBB", None)).unwrap();

        let existing = catalog
            .existing_sample_ids(&["AAAAAAAAAAA".to_string(), "CCCCCCCCCCC".to_string()])
            .unwrap();
        assert_eq!(existing.len(), 1);

        let listed = catalog.list_samples(1).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].external_id, "BBBBBBBBBBB");
    }
}
