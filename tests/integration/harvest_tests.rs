//! End-to-end harvest runs against a mock site

use crate::common::*;
use async_trait::async_trait;
use kin_harvest::record::DetailRecord;
use kin_harvest::storage::{PersistenceSink, SqliteSink, StorageError, StorageResult};
use kin_harvest::{run_once, Coordinator, ItemOutcome};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::{MockServer, ResponseTemplate};

fn open_sink(config: &kin_harvest::Config) -> SqliteSink {
    SqliteSink::new(Path::new(&config.output.database_path)).expect("Failed to open DB")
}

#[tokio::test]
async fn test_full_harvest_into_sqlite() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_site(
        &server,
        &[Question::new(1, "핀다 대출 후기"), Question::new(2, "핀다 앱")],
    )
    .await;

    let config = test_config(&server, &dir);
    let sink = open_sink(&config);
    let summary = run_once(config, Arc::new(sink.clone())).await.unwrap();

    assert_eq!(summary.listed, 2);
    assert_eq!(summary.persisted, 2);
    assert_eq!(summary.failed(), 0);

    let stored = sink.get(&detail_url(&server, 1)).unwrap().unwrap();
    assert_eq!(stored.record.title, "핀다 대출 후기");
    assert_eq!(stored.record.listed_date, "2024.09.01.");
    assert_eq!(stored.record.view_count, 12);
    assert_eq!(stored.record.created_at, "2024.09.01.");
    assert_eq!(stored.record.description, "질문 본문입니다.");
    assert_eq!(stored.record.tags, vec!["#핀다", "#대출"]);
    assert!(!stored.proceed);
    assert_eq!(stored.is_related, None);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_site(
        &server,
        &[Question::new(1, "a"), Question::new(2, "b"), Question::new(3, "c")],
    )
    .await;

    let config = test_config(&server, &dir);
    let sink = open_sink(&config);
    let listing = listing_url(&server);
    let coordinator = Coordinator::new(config, Arc::new(sink.clone())).unwrap();

    let first = coordinator.run_once(&listing).await.unwrap();
    assert_eq!(first.persisted, 3);
    let before = sink.all_records().unwrap();

    let second = coordinator.run_once(&listing).await.unwrap();
    assert_eq!(second.listed, 3);
    assert_eq!(second.duplicates, 3);
    assert_eq!(second.fetched, 0);
    assert_eq!(second.persisted, 0);

    assert_eq!(sink.count_records().unwrap(), 3);
    assert_eq!(sink.all_records().unwrap(), before);
}

#[tokio::test]
async fn test_one_failing_detail_does_not_block_the_cohort() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut questions: Vec<Question> = vec![
        Question::new(1, "one"),
        Question::new(2, "two"),
        Question::new(4, "four"),
        Question::new(5, "five"),
    ];
    mount_details(&server, &questions).await;

    // docId=3 is listed but its detail page always fails
    questions.insert(2, Question::new(3, "three"));
    mount_listing(&server, listing_page(&questions)).await;
    mount_detail(&server, 3, ResponseTemplate::new(503)).await;

    let config = test_config(&server, &dir);
    let sink = open_sink(&config);
    let summary = Coordinator::new(config, Arc::new(sink.clone()))
        .unwrap()
        .with_retry_policy(fast_retries())
        .run_once(&listing_url(&server))
        .await
        .unwrap();

    assert_eq!(summary.listed, 5);
    assert_eq!(summary.persisted, 4);
    assert_eq!(summary.detail_failed, 1);
    assert!(matches!(
        summary.outcome_for(&detail_url(&server, 3)),
        Some(ItemOutcome::DetailFailed { .. })
    ));

    assert_eq!(sink.count_records().unwrap(), 4);
    assert!(!sink.contains(&detail_url(&server, 3)).unwrap());

    // Exactly three attempts against the failing page
    let attempts = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.query() == Some("docId=3"))
        .count();
    assert_eq!(attempts, 3);
}

#[tokio::test]
async fn test_incomplete_detail_is_never_stored() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut missing = Question::new(2, "no body");
    missing.description = None;
    let mut views = Question::new(1, "views");
    views.views = "조회수 1,234";
    mount_site(&server, &[views, missing]).await;

    let config = test_config(&server, &dir);
    let sink = open_sink(&config);
    let summary = run_once(config, Arc::new(sink.clone())).await.unwrap();

    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.detail_failed, 1);
    assert_eq!(
        sink.get(&detail_url(&server, 1)).unwrap().unwrap().record.view_count,
        1234
    );
    assert!(sink.get(&detail_url(&server, 2)).unwrap().is_none());
}

#[tokio::test]
async fn test_not_found_detail_is_tried_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_details(&server, &[Question::new(1, "kept")]).await;
    mount_listing(
        &server,
        listing_page(&[Question::new(1, "kept"), Question::new(9, "gone")]),
    )
    .await;
    mount_detail(&server, 9, ResponseTemplate::new(404)).await;

    let config = test_config(&server, &dir);
    let sink = open_sink(&config);
    let summary = run_once(config, Arc::new(sink)).await.unwrap();

    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.detail_failed, 1);

    let attempts = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.query() == Some("docId=9"))
        .count();
    assert_eq!(attempts, 1);
}

/// Rejects writes for one URL, delegates everything else
struct RejectOne {
    inner: SqliteSink,
    reject: String,
}

#[async_trait]
impl PersistenceSink for RejectOne {
    async fn exists(&self, url: &str) -> StorageResult<bool> {
        self.inner.exists(url).await
    }

    async fn upsert(&self, record: &DetailRecord) -> StorageResult<()> {
        if record.url == self.reject {
            return Err(StorageError::Rejected("simulated write failure".to_string()));
        }
        self.inner.upsert(record).await
    }
}

#[tokio::test]
async fn test_persist_failure_does_not_roll_back_siblings() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_site(
        &server,
        &[Question::new(1, "a"), Question::new(2, "b"), Question::new(3, "c")],
    )
    .await;

    let config = test_config(&server, &dir);
    let inner = open_sink(&config);
    let sink = RejectOne {
        inner: inner.clone(),
        reject: detail_url(&server, 2),
    };
    let summary = run_once(config, Arc::new(sink)).await.unwrap();

    assert_eq!(summary.persisted, 2);
    assert_eq!(summary.persist_failed, 1);
    assert!(inner.contains(&detail_url(&server, 1)).unwrap());
    assert!(!inner.contains(&detail_url(&server, 2)).unwrap());
    assert!(inner.contains(&detail_url(&server, 3)).unwrap());
}

#[tokio::test]
async fn test_listing_never_ready_yields_empty_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(&server, "<html><body>loading</body></html>".to_string()).await;

    let config = test_config(&server, &dir);
    let sink = open_sink(&config);
    let summary = run_once(config, Arc::new(sink.clone())).await.unwrap();

    assert_eq!(summary.listed, 0);
    assert_eq!(sink.count_records().unwrap(), 0);
}

#[tokio::test]
async fn test_runs_are_recorded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_site(&server, &[Question::new(1, "a"), Question::new(2, "b")]).await;

    let config = test_config(&server, &dir);
    let sink = open_sink(&config);
    let listing = listing_url(&server);
    let coordinator = Coordinator::new(config, Arc::new(sink.clone()))
        .unwrap()
        .with_config_hash("abc123");

    coordinator.run_once(&listing).await.unwrap();
    coordinator.run_once(&listing).await.unwrap();

    let runs = sink.latest_runs(5).unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].duplicates, 2);
    assert_eq!(runs[1].persisted, 2);
    assert_eq!(runs[1].config_hash, "abc123");
    assert!(runs.iter().all(|r| r.finished_at.is_some()));
}
