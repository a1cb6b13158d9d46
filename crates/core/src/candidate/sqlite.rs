//! SQLite-backed candidate store.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection};

use super::{
    Candidate, CandidateMetadata, CandidateSource, CandidateStats, CandidateStore, NewCandidate,
};
use crate::storage::{parse_optional_timestamp, parse_timestamp, to_timestamp, StoreError};

/// Stay well under SQLite's bound-parameter limit.
const ID_CHUNK: usize = 500;

const COLUMNS: &str = "external_id, title, channel_title, channel_id, thumbnail_url, description, \
     tags, duration_seconds, source, source_ref, enriched_at, quality_score, processed_at, created_at";

/// SQLite-backed candidate store.
pub struct SqliteCandidateStore {
    conn: Mutex<Connection>,
}

impl SqliteCandidateStore {
    /// Open (or create) the store at `path`.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
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
            CREATE TABLE IF NOT EXISTS candidates (
                external_id TEXT PRIMARY KEY,
                title TEXT,
                channel_title TEXT,
                channel_id TEXT,
                thumbnail_url TEXT,
                description TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                duration_seconds INTEGER,
                source TEXT NOT NULL,
                source_ref TEXT,
                enriched_at TEXT,
                quality_score INTEGER CHECK (quality_score BETWEEN 0 AND 100),
                processed_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_candidates_enriched ON candidates(enriched_at);
            CREATE INDEX IF NOT EXISTS idx_candidates_pending
                ON candidates(processed_at, quality_score);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("candidate store lock poisoned".to_string()))
    }

    fn row_to_candidate(row: &rusqlite::Row) -> rusqlite::Result<Candidate> {
        let tags_json: String = row.get(6)?;
        let source_str: String = row.get(8)?;
        let source = source_str.parse::<CandidateSource>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, e.into())
        })?;
        let created_at: String = row.get(13)?;

        Ok(Candidate {
            external_id: row.get(0)?,
            title: row.get(1)?,
            channel_title: row.get(2)?,
            channel_id: row.get(3)?,
            thumbnail_url: row.get(4)?,
            description: row.get(5)?,
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            duration_seconds: row.get(7)?,
            source,
            source_ref: row.get(9)?,
            enriched_at: parse_optional_timestamp(row.get(10)?),
            quality_score: row.get(11)?,
            processed_at: parse_optional_timestamp(row.get(12)?),
            created_at: parse_timestamp(&created_at),
        })
    }

    fn query_candidates(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Candidate>, StoreError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM candidates WHERE {}", COLUMNS, filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params, Self::row_to_candidate)?;

        let mut candidates = Vec::new();
        for row in rows {
            candidates.push(row?);
        }
        Ok(candidates)
    }
}

impl CandidateStore for SqliteCandidateStore {
    fn existing_external_ids(&self, ids: &[String]) -> Result<HashSet<String>, StoreError> {
        let conn = self.conn()?;
        let mut found = HashSet::new();

        for chunk in ids.chunks(ID_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!(
                "SELECT external_id FROM candidates WHERE external_id IN ({})",
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

    fn insert_many(&self, candidates: &[NewCandidate]) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = to_timestamp(Utc::now());
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO candidates
                 (external_id, title, channel_title, channel_id, thumbnail_url, description,
                  source, source_ref, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for c in candidates {
                inserted += stmt.execute(params![
                    c.external_id,
                    c.title,
                    c.channel_title,
                    c.channel_id,
                    c.thumbnail_url,
                    c.description,
                    c.source.as_str(),
                    c.source_ref,
                    now,
                ])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn get(&self, external_id: &str) -> Result<Option<Candidate>, StoreError> {
        Ok(self
            .query_candidates("external_id = ?", params![external_id])?
            .into_iter()
            .next())
    }

    fn list_unenriched(&self, limit: u32) -> Result<Vec<Candidate>, StoreError> {
        self.query_candidates(
            "enriched_at IS NULL ORDER BY rowid LIMIT ?",
            params![limit],
        )
    }

    fn mark_enriched(
        &self,
        external_id: &str,
        metadata: &CandidateMetadata,
    ) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let tags = serde_json::to_string(&metadata.tags)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let updated = conn.execute(
            "UPDATE candidates SET
                title = ?, channel_title = ?, channel_id = ?, thumbnail_url = ?,
                description = ?, tags = ?, duration_seconds = ?, enriched_at = ?
             WHERE external_id = ? AND enriched_at IS NULL",
            params![
                metadata.title,
                metadata.channel_title,
                metadata.channel_id,
                metadata.thumbnail_url,
                metadata.description,
                tags,
                metadata.duration_seconds,
                to_timestamp(Utc::now()),
                external_id,
            ],
        )?;

        Ok(updated > 0)
    }

    fn list_unscored(&self, limit: u32) -> Result<Vec<Candidate>, StoreError> {
        self.query_candidates(
            "enriched_at IS NOT NULL AND processed_at IS NULL AND quality_score IS NULL
             ORDER BY rowid LIMIT ?",
            params![limit],
        )
    }

    fn list_scored_unprocessed(&self, limit: u32) -> Result<Vec<Candidate>, StoreError> {
        self.query_candidates(
            "enriched_at IS NOT NULL AND processed_at IS NULL AND quality_score IS NOT NULL
             ORDER BY rowid LIMIT ?",
            params![limit],
        )
    }

    fn set_score(&self, external_id: &str, score: u8) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE candidates SET quality_score = ?
             WHERE external_id = ? AND processed_at IS NULL",
            params![score.min(100), external_id],
        )?;
        Ok(updated > 0)
    }

    fn list_promotable(&self, min_score: u8, limit: u32) -> Result<Vec<Candidate>, StoreError> {
        self.query_candidates(
            "processed_at IS NULL AND quality_score >= ?
               AND title IS NOT NULL AND channel_id IS NOT NULL AND thumbnail_url IS NOT NULL
             ORDER BY quality_score DESC, rowid LIMIT ?",
            params![min_score, limit],
        )
    }

    fn mark_processed(&self, external_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE candidates SET processed_at = ?
             WHERE external_id = ? AND processed_at IS NULL",
            params![to_timestamp(Utc::now()), external_id],
        )?;
        Ok(updated > 0)
    }

    fn stats(&self) -> Result<CandidateStats, StoreError> {
        let conn = self.conn()?;
        let stats = conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN enriched_at IS NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN enriched_at IS NOT NULL AND quality_score IS NULL
                                   AND processed_at IS NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN quality_score IS NOT NULL
                                   AND processed_at IS NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN processed_at IS NOT NULL THEN 1 ELSE 0 END), 0)
             FROM candidates",
            [],
            |row| {
                Ok(CandidateStats {
                    total: row.get::<_, i64>(0)? as u64,
                    new: row.get::<_, i64>(1)? as u64,
                    enriched: row.get::<_, i64>(2)? as u64,
                    scored: row.get::<_, i64>(3)? as u64,
                    promoted: row.get::<_, i64>(4)? as u64,
                })
            },
        )?;
        Ok(stats)
    }
}
