//! Persistence properties that hold across sink instances

use chrono::Utc;
use kin_harvest::config::load_config_with_hash;
use kin_harvest::record::DetailRecord;
use kin_harvest::storage::{MemorySink, PersistenceSink, SqliteSink};
use std::io::Write;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};

fn record(url: &str, views: u64) -> DetailRecord {
    DetailRecord {
        title: "핀다 대출 후기".to_string(),
        url: url.to_string(),
        listed_date: "2024.09.01.".to_string(),
        author: "writer".to_string(),
        view_count: views,
        created_at: "2024.09.01.".to_string(),
        description: "본문".to_string(),
        tags: vec!["#핀다".to_string()],
        scraped_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_two_connections_racing_on_one_url_store_one_row() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("race.db");
    let a = SqliteSink::new(&db_path).unwrap();
    let b = SqliteSink::new(&db_path).unwrap();
    let url = "https://kin.naver.com/qna/detail.naver?docId=1";

    let mut handles = Vec::new();
    for i in 0..8u64 {
        let sink = if i % 2 == 0 { a.clone() } else { b.clone() };
        let record = record(url, i);
        handles.push(tokio::spawn(async move { sink.upsert(&record).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(a.count_records().unwrap(), 1);
    assert!(b.exists(url).await.unwrap());
}

#[tokio::test]
async fn test_stored_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("reopen.db");
    let url = "https://kin.naver.com/qna/detail.naver?docId=7";

    {
        let sink = SqliteSink::new(&db_path).unwrap();
        sink.upsert(&record(url, 1234)).await.unwrap();
    }

    let sink = SqliteSink::new(&db_path).unwrap();
    let stored = sink.get(url).unwrap().unwrap();
    assert_eq!(stored.record.view_count, 1234);
    assert_eq!(stored.record.tags, vec!["#핀다"]);
}

#[tokio::test]
async fn test_lookup_with_partial_key_misses() {
    let sinks: Vec<Arc<dyn PersistenceSink>> = vec![
        Arc::new(MemorySink::new()),
        Arc::new(SqliteSink::new_in_memory().unwrap()),
    ];
    let url = "https://kin.naver.com/qna/detail.naver?d1id=4&docId=1";

    for sink in sinks {
        sink.upsert(&record(url, 1)).await.unwrap();
        assert!(sink.exists(url).await.unwrap());
        assert!(!sink
            .exists("https://kin.naver.com/qna/detail.naver")
            .await
            .unwrap());
        assert!(!sink
            .exists("https://kin.naver.com/qna/detail.naver?docId=1")
            .await
            .unwrap());
    }
}

#[test]
fn test_config_hash_changes_with_content() {
    let write = |content: &str| {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    };
    let base = r#"
[listing]
url = "https://kin.naver.com/search/list.naver?query=x"

[output]
database-path = "./naver_kin.db"
"#;
    let a = write(base);
    let b = write(&format!("{}\n[fetch]\nmax-retries = 5\n", base));

    let (config_a, hash_a) = load_config_with_hash(a.path()).unwrap();
    let (config_b, hash_b) = load_config_with_hash(b.path()).unwrap();

    assert_eq!(config_a.fetch.max_retries, 3);
    assert_eq!(config_b.fetch.max_retries, 5);
    assert_ne!(hash_a, hash_b);
    assert_eq!(hash_a.len(), 64);
}
