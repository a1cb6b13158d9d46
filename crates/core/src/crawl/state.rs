//! Persisted crawl resume cursor.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::storage::{parse_timestamp, to_timestamp, StoreError};

/// Where a crawl stopped: the query index and the cursor of the next page
/// to fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlState {
    pub crawl_name: String,
    pub stage_index: u32,
    /// Cursor of the next page; `None` means the first page of the stage.
    pub page_cursor: Option<String>,
    /// Pages fetched since the crawl started.
    pub pages_fetched: u32,
    /// Consecutive pages without a new match in the current stage.
    pub zero_match_pages: u32,
    pub updated_at: DateTime<Utc>,
}

impl CrawlState {
    pub fn new(crawl_name: &str) -> Self {
        Self {
            crawl_name: crawl_name.to_string(),
            stage_index: 0,
            page_cursor: None,
            pages_fetched: 0,
            zero_match_pages: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Trait for crawl-state storage.
pub trait CrawlStateStore: Send + Sync {
    fn load(&self, crawl_name: &str) -> Result<Option<CrawlState>, StoreError>;

    fn save(&self, state: &CrawlState) -> Result<(), StoreError>;

    /// Remove saved state. Returns false if there was none.
    fn clear(&self, crawl_name: &str) -> Result<bool, StoreError>;
}

/// SQLite-backed crawl-state store.
pub struct SqliteCrawlStateStore {
    conn: Mutex<Connection>,
}

impl SqliteCrawlStateStore {
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

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
            CREATE TABLE IF NOT EXISTS crawl_state (
                crawl_name TEXT PRIMARY KEY,
                stage_index INTEGER NOT NULL,
                page_cursor TEXT,
                pages_fetched INTEGER NOT NULL DEFAULT 0,
                zero_match_pages INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("crawl state lock poisoned".to_string()))
    }
}

impl CrawlStateStore for SqliteCrawlStateStore {
    fn load(&self, crawl_name: &str) -> Result<Option<CrawlState>, StoreError> {
        let conn = self.conn()?;
        let state = conn
            .query_row(
                "SELECT crawl_name, stage_index, page_cursor, pages_fetched, zero_match_pages,
                        updated_at
                 FROM crawl_state WHERE crawl_name = ?",
                params![crawl_name],
                |row| {
                    let updated_at: String = row.get(5)?;
                    Ok(CrawlState {
                        crawl_name: row.get(0)?,
                        stage_index: row.get(1)?,
                        page_cursor: row.get(2)?,
                        pages_fetched: row.get(3)?,
                        zero_match_pages: row.get(4)?,
                        updated_at: parse_timestamp(&updated_at),
                    })
                },
            )
            .optional()?;
        Ok(state)
    }

    fn save(&self, state: &CrawlState) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO crawl_state
                (crawl_name, stage_index, page_cursor, pages_fetched, zero_match_pages, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(crawl_name) DO UPDATE SET
                stage_index = excluded.stage_index,
                page_cursor = excluded.page_cursor,
                pages_fetched = excluded.pages_fetched,
                zero_match_pages = excluded.zero_match_pages,
                updated_at = excluded.updated_at",
            params![
                state.crawl_name,
                state.stage_index,
                state.page_cursor,
                state.pages_fetched,
                state.zero_match_pages,
                to_timestamp(state.updated_at),
            ],
        )?;
        Ok(())
    }

    fn clear(&self, crawl_name: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM crawl_state WHERE crawl_name = ?",
            params![crawl_name],
        )?;
        Ok(deleted > 0)
    }
}
