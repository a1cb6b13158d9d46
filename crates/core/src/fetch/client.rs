//! HTTP client wrapper that spends quota across rotating keys.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use super::{ApiOperation, FetchError, KeyRotationState, KeyStatus};
use crate::metrics::{API_QUOTA_UNITS, API_REQUESTS, API_REQUEST_DURATION};

/// Reason strings the API uses when a key's quota is spent.
const QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded"];

/// Whether a response body carries a quota-exhaustion reason.
pub fn is_quota_signal(status: StatusCode, body: &str) -> bool {
    status == StatusCode::FORBIDDEN && QUOTA_REASONS.iter().any(|r| body.contains(r))
}

/// Shared HTTP client that attaches a key to each request and rotates keys
/// when the API reports quota exhaustion.
pub struct QuotaAwareClient {
    client: Client,
    keys: Arc<KeyRotationState>,
    units_spent: AtomicU64,
}

impl QuotaAwareClient {
    pub fn new(keys: Vec<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, Arc::new(KeyRotationState::new(keys))))
    }

    pub fn with_client(client: Client, keys: Arc<KeyRotationState>) -> Self {
        Self {
            client,
            keys,
            units_spent: AtomicU64::new(0),
        }
    }

    pub fn key_status(&self) -> KeyStatus {
        self.keys.status()
    }

    /// Quota units spent by this client since construction.
    pub fn units_spent(&self) -> u64 {
        self.units_spent.load(Ordering::Relaxed)
    }

    /// Send a request built by `build` with the current key, rotating keys
    /// until one is accepted.
    ///
    /// `build` receives the shared client and the key to use and must
    /// return a fresh request each time it is called.
    ///
    /// Returns the successful response. Non-quota failures are classified
    /// and returned without rotating.
    pub async fn fetch_with_key_rotation<B>(
        &self,
        operation: ApiOperation,
        build: B,
    ) -> Result<Response, FetchError>
    where
        B: Fn(&Client, &str) -> RequestBuilder,
    {
        let op = operation.as_str();
        self.keys
            .run(|key| {
                let request = build(&self.client, &key);
                async move {
                    let start = Instant::now();
                    let result = request.send().await;
                    API_REQUEST_DURATION
                        .with_label_values(&[op])
                        .observe(start.elapsed().as_secs_f64());

                    let response = match result {
                        Ok(response) => response,
                        Err(e) => {
                            API_REQUESTS.with_label_values(&[op, "error"]).inc();
                            return Err(FetchError::Http(e));
                        }
                    };

                    let status = response.status();
                    if status.is_success() {
                        self.spend(operation);
                        API_REQUESTS.with_label_values(&[op, "success"]).inc();
                        return Ok(response);
                    }

                    let body = response.text().await.unwrap_or_default();
                    if is_quota_signal(status, &body) {
                        debug!("{} rejected: key quota exhausted", op);
                        API_REQUESTS.with_label_values(&[op, "quota"]).inc();
                        return Err(FetchError::KeyQuotaExhausted);
                    }

                    self.spend(operation);
                    API_REQUESTS.with_label_values(&[op, "error"]).inc();
                    if status == StatusCode::NOT_FOUND {
                        return Err(FetchError::NotFound(format!("{} returned 404", op)));
                    }
                    Err(FetchError::Api {
                        status: status.as_u16(),
                        message: body,
                    })
                }
            })
            .await
    }

    fn spend(&self, operation: ApiOperation) {
        let cost = operation.unit_cost();
        self.units_spent.fetch_add(cost, Ordering::Relaxed);
        API_QUOTA_UNITS
            .with_label_values(&[operation.as_str()])
            .inc_by(cost);
    }
}
