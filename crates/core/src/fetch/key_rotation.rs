//! Process-local key exhaustion tracking.

use std::future::Future;
use std::sync::Mutex;

use serde::Serialize;
use tracing::warn;

use super::FetchError;
use crate::metrics::API_KEYS_EXHAUSTED;

/// Snapshot of key availability (never exposes the keys themselves).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyStatus {
    pub total: usize,
    pub exhausted: usize,
    pub available: usize,
}

/// Ordered API keys plus the set of keys exhausted for the current period.
///
/// Exhaustion is only ever added, never cleared: a fresh state comes from a
/// process restart (or, in tests, a new instance).
#[derive(Debug)]
pub struct KeyRotationState {
    keys: Vec<String>,
    exhausted: Mutex<Vec<bool>>,
}

impl KeyRotationState {
    pub fn new(keys: Vec<String>) -> Self {
        let exhausted = vec![false; keys.len()];
        Self {
            keys,
            exhausted: Mutex::new(exhausted),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// First key (in configuration order) not yet exhausted.
    pub fn current(&self) -> Option<(usize, String)> {
        let exhausted = self.exhausted.lock().unwrap_or_else(|e| e.into_inner());
        exhausted
            .iter()
            .position(|spent| !spent)
            .map(|index| (index, self.keys[index].clone()))
    }

    /// Park a key until restart. Returns false if it was already parked.
    pub fn mark_exhausted(&self, index: usize) -> bool {
        let mut exhausted = self.exhausted.lock().unwrap_or_else(|e| e.into_inner());
        match exhausted.get_mut(index) {
            Some(spent) if !*spent => {
                *spent = true;
                API_KEYS_EXHAUSTED.inc();
                let remaining = exhausted.iter().filter(|s| !**s).count();
                warn!(
                    "API key #{} exhausted its quota ({} key(s) remaining)",
                    index + 1,
                    remaining
                );
                true
            }
            _ => false,
        }
    }

    pub fn status(&self) -> KeyStatus {
        let exhausted = self.exhausted.lock().unwrap_or_else(|e| e.into_inner());
        let spent = exhausted.iter().filter(|s| **s).count();
        KeyStatus {
            total: self.keys.len(),
            exhausted: spent,
            available: self.keys.len() - spent,
        }
    }

    /// Run `attempt` with successive keys until it stops reporting
    /// [`FetchError::KeyQuotaExhausted`].
    ///
    /// Each key is tried at most once per call. When no untried key is
    /// left the call fails with [`FetchError::QuotaExceeded`].
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, FetchError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        if self.keys.is_empty() {
            return Err(FetchError::NotConfigured(
                "no API keys configured".to_string(),
            ));
        }

        loop {
            let (index, key) = self.current().ok_or(FetchError::QuotaExceeded)?;
            match attempt(key).await {
                Err(FetchError::KeyQuotaExhausted) => {
                    self.mark_exhausted(index);
                }
                other => return other,
            }
        }
    }
}
