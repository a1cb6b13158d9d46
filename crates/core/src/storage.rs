//! Shared storage plumbing for the SQLite-backed stores.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

/// Errors from candidate, catalog and crawl-state stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique constraint rejected the write (another writer got there first).
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if is_unique_violation(&e) {
            StoreError::Duplicate(e.to_string())
        } else {
            StoreError::Database(e.to_string())
        }
    }
}

/// Whether a rusqlite error is a UNIQUE / PRIMARY KEY constraint violation.
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => matches!(
            err.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        ),
        _ => false,
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
pub(crate) fn to_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn parse_optional_timestamp(s: Option<String>) -> Option<DateTime<Utc>> {
    s.as_deref().map(parse_timestamp)
}

/// Fetch a record, creating it when absent.
///
/// If `create` loses a race and reports [`StoreError::Duplicate`], the
/// record written by the other party is fetched and returned instead.
pub fn get_or_create<T, G, C>(get: G, create: C) -> Result<T, StoreError>
where
    G: Fn() -> Result<Option<T>, StoreError>,
    C: FnOnce() -> Result<T, StoreError>,
{
    if let Some(existing) = get()? {
        return Ok(existing);
    }

    match create() {
        Ok(created) => Ok(created),
        Err(StoreError::Duplicate(detail)) => get()?.ok_or_else(|| {
            StoreError::Database(format!(
                "record vanished after duplicate-key conflict: {}",
                detail
            ))
        }),
        Err(e) => Err(e),
    }
}
