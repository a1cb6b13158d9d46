//! End-to-end pipeline scenario over file-backed stores.
//!
//! Ingest a playlist, re-ingest it, enrich, score with fixed scores and
//! promote above the threshold; then feed a report back.

use std::sync::Arc;

use tempfile::TempDir;

use cratedigger_core::{
    candidate::{CandidateStage, CandidateStore, SqliteCandidateStore},
    catalog::{CatalogStore, ReportOutcome, SqliteCatalogStore},
    fetch::ApiOperation,
    pipeline::{IngestTarget, IngestionConfig, Pipeline, PipelineConfig},
    testing::{fixtures, FixedScorer, MockMediaApi},
    HeuristicScorer, Scorer,
};

struct Harness {
    api: Arc<MockMediaApi>,
    candidates: Arc<SqliteCandidateStore>,
    catalog: Arc<SqliteCatalogStore>,
    _dir: TempDir,
}

impl Harness {
    async fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let candidates = Arc::new(
            SqliteCandidateStore::new(&dir.path().join("candidates.db"))
                .expect("Failed to create candidate store"),
        );
        let catalog = Arc::new(
            SqliteCatalogStore::new(&dir.path().join("catalog.db"))
                .expect("Failed to create catalog store"),
        );

        let api = Arc::new(MockMediaApi::new());
        api.add_container("PLcrate", vec![vec!["AAAAAAAAAAA", "BBBBBBBBBBB", "CCCCCCCCCCC"]])
            .await;
        api.add_details(fixtures::item_details("AAAAAAAAAAA", "Funk break", "UCone"))
            .await;
        api.add_details(fixtures::item_details("BBBBBBBBBBB", "Vlog", "UCtwo"))
            .await;
        api.add_details(fixtures::item_details("CCCCCCCCCCC", "Soul 45", "UCone"))
            .await;

        Self {
            api,
            candidates,
            catalog,
            _dir: dir,
        }
    }

    fn pipeline(&self, scorer: Arc<dyn Scorer>) -> Pipeline {
        Pipeline::new(
            self.candidates.clone(),
            self.catalog.clone(),
            self.api.clone(),
            scorer,
        )
        .with_config(PipelineConfig {
            batch_delay_ms: 0,
            ..Default::default()
        })
        .with_ingestion(IngestionConfig {
            page_delay_ms: 0,
            ..Default::default()
        })
    }
}

fn playlist() -> IngestTarget {
    IngestTarget::Playlist("PLcrate".to_string())
}

#[tokio::test]
async fn test_full_scenario() {
    let h = Harness::new().await;
    let scorer = FixedScorer::new(0)
        .with_score("AAAAAAAAAAA", 80)
        .with_score("BBBBBBBBBBB", 40)
        .with_score("CCCCCCCCCCC", 90);
    let pipeline = h.pipeline(Arc::new(scorer));

    let first = pipeline.ingest(&playlist(), None).await.unwrap();
    assert_eq!(first.added, 3);
    assert_eq!(first.skipped, 0);

    let second = pipeline.ingest(&playlist(), None).await.unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.skipped, 3);

    let enriched = pipeline.enrich(10).await.unwrap();
    assert_eq!(enriched.enriched, 3);
    assert_eq!(h.api.calls_for(ApiOperation::ItemDetails).await, 1);

    let scored = pipeline.score(10).unwrap();
    assert_eq!(scored.scored, 3);

    let processed = pipeline.process(10, 55).unwrap();
    assert_eq!(processed.promoted, 2);
    assert_eq!(processed.failed, 0);

    let a = h.catalog.get_sample("AAAAAAAAAAA").unwrap().unwrap();
    assert_eq!(a.quality_score, Some(80));
    assert!(h.catalog.get_sample("BBBBBBBBBBB").unwrap().is_none());
    assert!(h.catalog.get_sample("CCCCCCCCCCC").unwrap().is_some());

    let b = h.candidates.get("BBBBBBBBBBB").unwrap().unwrap();
    assert_eq!(b.stage(), CandidateStage::Scored);

    let channel = h.catalog.get_channel("UCone").unwrap().unwrap();
    assert_eq!(channel.sample_count, 2);

    // Promoted items are now known to the catalog and never re-staged.
    let third = pipeline.ingest(&playlist(), None).await.unwrap();
    assert_eq!(third.added, 0);

    let stats = h.candidates.stats().unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.promoted, 2);
}

#[tokio::test]
async fn test_report_lowers_channel_reputation() {
    let h = Harness::new().await;
    let pipeline = h.pipeline(Arc::new(FixedScorer::new(90)));

    pipeline.ingest(&playlist(), None).await.unwrap();
    pipeline.run_batch(pipeline.default_limits()).await.unwrap();
    assert_eq!(h.catalog.stats().unwrap().samples, 3);

    let before = h.catalog.get_channel("UCone").unwrap().unwrap().reputation;
    let outcome = pipeline.report("AAAAAAAAAAA", "not a sample").unwrap();
    let after = match outcome {
        ReportOutcome::Penalized {
            reputation,
            skip_count,
            ..
        } => {
            assert_eq!(skip_count, 1);
            reputation
        }
        other => panic!("unexpected outcome: {:?}", other),
    };
    assert!(after < before);
    assert_eq!(h.catalog.stats().unwrap().reports, 1);
}

#[tokio::test]
async fn test_heuristic_scorer_promotes_genre_matches() {
    let h = Harness::new().await;
    h.api
        .add_details({
            let mut d = fixtures::item_details("AAAAAAAAAAA", "Rare funk breakbeat 1972", "UCone");
            d.tags = vec!["funk".to_string(), "vinyl".to_string()];
            d
        })
        .await;
    let pipeline = h.pipeline(Arc::new(HeuristicScorer::new()));

    pipeline.ingest(&playlist(), None).await.unwrap();
    let report = pipeline.run_batch(pipeline.default_limits()).await.unwrap();

    assert_eq!(report.enriched, 3);
    assert_eq!(report.scored, 3);
    let sample = h.catalog.get_sample("AAAAAAAAAAA").unwrap().unwrap();
    assert_eq!(sample.genre.as_deref(), Some("funk"));
    assert_eq!(sample.era.as_deref(), Some("1970s"));
    assert!(h.catalog.get_sample("BBBBBBBBBBB").unwrap().is_none());
}
