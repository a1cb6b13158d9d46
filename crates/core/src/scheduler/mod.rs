//! Background batch scheduler.
//!
//! Periodically ingests the configured default containers and runs one
//! enrich/score/process batch. Disabled by default: without it, stages run
//! only when the HTTP API triggers them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::pipeline::{Pipeline, PipelineError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between batches.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Ingest the default containers before each batch.
    #[serde(default = "default_ingest")]
    pub ingest_defaults: bool,
}

fn default_interval() -> u64 {
    900
}

fn default_ingest() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval(),
            ingest_defaults: default_ingest(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub ticks: u64,
}

/// Runs the pipeline on a fixed interval until stopped.
pub struct BatchScheduler {
    config: SchedulerConfig,
    pipeline: Arc<Pipeline>,
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    shutdown_tx: broadcast::Sender<()>,
}

impl BatchScheduler {
    pub fn new(config: SchedulerConfig, pipeline: Arc<Pipeline>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            pipeline,
            running: Arc::new(AtomicBool::new(false)),
            ticks: Arc::new(AtomicU64::new(0)),
            shutdown_tx,
        }
    }

    /// Spawn the scheduling loop. The first batch runs after one interval.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return;
        }

        let running = Arc::clone(&self.running);
        let ticks = Arc::clone(&self.ticks);
        let pipeline = Arc::clone(&self.pipeline);
        let config = self.config.clone();
        let interval = Duration::from_secs(config.interval_secs.max(1));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Scheduler started (every {}s)", interval.as_secs());
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Scheduler received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Err(e) = Self::tick(&pipeline, &config).await {
                            warn!("Scheduled batch failed: {}", e);
                        }
                        ticks.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            info!("Scheduler stopped");
        });
    }

    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("Stopping scheduler");
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.is_running(),
            ticks: self.ticks.load(Ordering::Relaxed),
        }
    }

    /// One scheduled run. Ingest quota exhaustion skips straight to the
    /// batch, which spends no search quota.
    async fn tick(pipeline: &Pipeline, config: &SchedulerConfig) -> Result<(), PipelineError> {
        if config.ingest_defaults {
            match pipeline.ingest_defaults(None).await {
                Ok(report) => info!(
                    "Scheduled ingest: added={}, skipped={}",
                    report.added, report.skipped
                ),
                Err(PipelineError::QuotaExceeded) => {
                    warn!("Scheduled ingest stopped on quota")
                }
                Err(e) => return Err(e),
            }
        }
        pipeline.run_batch(pipeline.default_limits()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::SqliteCandidateStore;
    use crate::catalog::{CatalogStore, SqliteCatalogStore};
    use crate::pipeline::{IngestionConfig, PipelineConfig};
    use crate::testing::{fixtures, FixedScorer, MockMediaApi};

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.interval_secs, 900);
        assert!(config.ingest_defaults);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_runs_batches_until_stopped() {
        let api = Arc::new(MockMediaApi::new());
        api.add_container("PL1", vec![vec!["AAAAAAAAAAA"]]).await;
        api.add_details(fixtures::item_details("AAAAAAAAAAA", "Funk 45", "UC1"))
            .await;
        let catalog = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let pipeline = Arc::new(
            Pipeline::new(
                Arc::new(SqliteCandidateStore::in_memory().unwrap()),
                catalog.clone(),
                api,
                Arc::new(FixedScorer::new(90)),
            )
            .with_config(PipelineConfig {
                batch_delay_ms: 0,
                ..Default::default()
            })
            .with_ingestion(IngestionConfig {
                default_containers: vec!["PL1".to_string()],
                page_delay_ms: 0,
                ..Default::default()
            }),
        );

        let scheduler = BatchScheduler::new(
            SchedulerConfig {
                enabled: true,
                interval_secs: 60,
                ingest_defaults: true,
            },
            pipeline,
        );
        scheduler.start();
        assert!(scheduler.is_running());

        for _ in 0..200 {
            if scheduler.status().ticks > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        assert!(scheduler.status().ticks >= 1);
        assert_eq!(catalog.stats().unwrap().samples, 1);

        scheduler.stop();
        assert!(!scheduler.is_running());
    }
}
