//! Integration tests for the bulk download engine.
//!
//! The engine always upgrades attachment URLs to https, so most tests drive
//! it through a recording [`Fetcher`] that writes to disk without touching
//! the network. Tests that need the real client wrap it in a fetcher that
//! talks plain HTTP to a mock server.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use catalog_mirror::catalog::{load_records, parse_records};
use catalog_mirror::download::{
    DownloadEngine, DownloadError, Fetcher, HttpClient, RetryPolicy, SizePolicy,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fetcher that records every URL and writes a small body, or fails with a
/// scripted HTTP status for selected URLs.
#[derive(Default)]
struct RecordingFetcher {
    calls: Mutex<Vec<String>>,
    failures: HashMap<String, u16>,
}

impl RecordingFetcher {
    fn failing(failures: &[(&str, u16)]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failures: failures
                .iter()
                .map(|(url, status)| ((*url).to_string(), *status))
                .collect(),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for RecordingFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(status) = self.failures.get(url) {
            return Err(DownloadError::http_status(url, *status));
        }
        let body = format!("body of {url}");
        tokio::fs::write(destination, &body)
            .await
            .map_err(|e| DownloadError::io(destination, e))?;
        Ok(body.len() as u64)
    }
}

/// Real HTTP fetcher for a plain-HTTP mock server: undoes the https upgrade
/// the engine applies to every attachment URL.
struct PlainHttpFetcher {
    inner: HttpClient,
}

#[async_trait]
impl Fetcher for PlainHttpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        let plain = url.replacen("https://", "http://", 1);
        self.inner.fetch(&plain, destination).await
    }
}

fn engine(fetcher: Arc<dyn Fetcher>) -> DownloadEngine {
    DownloadEngine::new(
        fetcher,
        RetryPolicy::new(3, Duration::ZERO, Duration::ZERO),
        SizePolicy::default(),
    )
}

#[tokio::test]
async fn test_end_to_end_single_attachment() {
    let records = parse_records(
        r#"[{"referenceType": "Publication", "referenceId": 42,
             "linkedResources": [{"resourceType": "Digital Document", "fileName": "doc.pdf",
                                  "fileSize": 500, "url": "http://h/doc.pdf"}]}]"#,
    )
    .unwrap();
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let fetcher = Arc::new(RecordingFetcher::default());

    let stats = engine(fetcher.clone()).run(&records, temp_dir.path()).await;

    assert_eq!(fetcher.calls(), vec!["https://h/doc.pdf".to_string()]);
    assert_eq!(stats.downloaded(), 1);
    assert_eq!(stats.total(), 1);
    let path = temp_dir.path().join("Publication").join("42").join("doc.pdf");
    assert!(path.exists(), "expected {}", path.display());
}

#[tokio::test]
async fn test_second_run_makes_no_requests() {
    let records = parse_records(
        r#"[{"referenceType": "Published Report", "referenceId": "A-7",
             "linkedResources": [
                {"resourceType": "Digital Document", "fileName": "one.pdf", "fileSize": 10, "url": "https://h/one.pdf"},
                {"resourceType": "Digital Document", "fileName": "two.pdf", "fileSize": 10, "url": "https://h/two.pdf"}
             ]}]"#,
    )
    .unwrap();
    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let first = Arc::new(RecordingFetcher::default());
    let stats = engine(first.clone()).run(&records, temp_dir.path()).await;
    assert_eq!(first.calls().len(), 2);
    assert_eq!(stats.downloaded(), 2);
    assert!(
        temp_dir
            .path()
            .join("Published_Report/A-7/two.pdf")
            .exists()
    );

    let second = Arc::new(RecordingFetcher::default());
    let stats = engine(second.clone()).run(&records, temp_dir.path()).await;
    assert!(second.calls().is_empty());
    assert_eq!(stats.skipped(), 2);
    assert_eq!(stats.downloaded(), 0);
}

#[tokio::test]
async fn test_oversize_and_web_service_make_no_requests() {
    let records = parse_records(
        r#"[{"referenceType": "Dataset", "referenceId": 9,
             "linkedResources": [
                {"resourceType": "Digital Data", "fileName": "huge.zip", "fileSize": 2147483648000, "url": "https://h/huge.zip"},
                {"resourceType": "Web Service", "fileName": "svc", "fileSize": 1, "url": "https://h/svc"}
             ]}]"#,
    )
    .unwrap();
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let fetcher = Arc::new(RecordingFetcher::default());

    let stats = engine(fetcher.clone()).run(&records, temp_dir.path()).await;

    assert!(fetcher.calls().is_empty());
    assert_eq!(stats.skipped(), 2);
    assert!(!temp_dir.path().join("Dataset/9/huge.zip").exists());
    assert!(!temp_dir.path().join("Dataset/9/svc").exists());
}

#[tokio::test]
async fn test_exactly_one_gib_is_fetched() {
    let records = parse_records(
        r#"[{"referenceType": "Dataset", "referenceId": 1,
             "linkedResources": [{"resourceType": "Digital Data", "fileName": "edge.bin",
                                  "fileSize": 1073741824, "url": "https://h/edge.bin"}]}]"#,
    )
    .unwrap();
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let fetcher = Arc::new(RecordingFetcher::default());

    let stats = engine(fetcher.clone()).run(&records, temp_dir.path()).await;

    assert_eq!(fetcher.calls().len(), 1);
    assert_eq!(stats.downloaded(), 1);
}

#[tokio::test]
async fn test_failures_do_not_stop_the_run() {
    let records = parse_records(
        r#"[
            {"referenceType": "Publication", "referenceId": 1,
             "linkedResources": [
                {"resourceType": "Digital Document", "fileName": "broken.pdf", "url": "https://h/broken.pdf"},
                {"resourceType": "Digital Document", "fileName": "locked.pdf", "url": "https://h/locked.pdf"},
                {"resourceType": "Digital Document", "fileName": "fine.pdf", "url": "https://h/fine.pdf"}
             ]},
            {"referenceType": "Publication", "referenceId": 2,
             "linkedResources": [
                {"resourceType": "Digital Document", "fileName": "later.pdf", "url": "https://h/later.pdf"}
             ]}
        ]"#,
    )
    .unwrap();
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let fetcher = Arc::new(RecordingFetcher::failing(&[
        ("https://h/broken.pdf", 500),
        ("https://h/locked.pdf", 403),
    ]));

    let stats = engine(fetcher.clone()).run(&records, temp_dir.path()).await;

    assert_eq!(
        fetcher.calls(),
        vec![
            "https://h/broken.pdf",
            "https://h/broken.pdf",
            "https://h/broken.pdf",
            "https://h/locked.pdf",
            "https://h/fine.pdf",
            "https://h/later.pdf",
        ]
    );
    assert_eq!(stats.failed(), 1);
    assert_eq!(stats.forbidden(), 1);
    assert_eq!(stats.downloaded(), 2);
    assert_eq!(stats.retried(), 2);
    assert!(temp_dir.path().join("Publication/2/later.pdf").exists());
}

#[tokio::test]
async fn test_incomplete_records_and_attachments_are_skipped() {
    let records = parse_records(
        r#"[
            {"referenceId": 5, "linkedResources": [
                {"resourceType": "Digital Document", "fileName": "orphan.pdf", "url": "https://h/orphan.pdf"}
            ]},
            {"referenceType": "Publication", "referenceId": 6, "linkedResources": [
                {"resourceType": "Digital Document", "url": "https://h/nameless"},
                {"resourceType": "Digital Document", "fileName": "nourl.pdf"},
                {"resourceType": "Digital Document", "fileName": "ok.pdf", "url": "https://h/ok.pdf"}
            ]},
            {"referenceType": "Publication", "referenceId": 7, "linkedResources": null}
        ]"#,
    )
    .unwrap();
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let fetcher = Arc::new(RecordingFetcher::default());

    let stats = engine(fetcher.clone()).run(&records, temp_dir.path()).await;

    assert_eq!(fetcher.calls(), vec!["https://h/ok.pdf".to_string()]);
    assert_eq!(stats.skipped(), 3);
    assert_eq!(stats.downloaded(), 1);
}

#[tokio::test]
async fn test_hostile_file_name_stays_inside_record_directory() {
    let records = parse_records(
        r#"[{"referenceType": "Publication", "referenceId": 3,
             "linkedResources": [{"resourceType": "Digital Document", "fileName": "../../escape.pdf",
                                  "url": "https://h/escape.pdf"}]}]"#,
    )
    .unwrap();
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let base = temp_dir.path().join("mirror");
    let fetcher = Arc::new(RecordingFetcher::default());

    let stats = engine(fetcher.clone()).run(&records, &base).await;

    assert_eq!(stats.downloaded(), 1);
    assert!(!temp_dir.path().join("escape.pdf").exists());
    let record_dir = base.join("Publication").join("3");
    let entries: Vec<_> = std::fs::read_dir(&record_dir)
        .expect("record dir")
        .map(|e| e.expect("entry").path())
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].parent(), Some(record_dir.as_path()));
}

#[tokio::test]
async fn test_engine_runs_from_record_file() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let input = temp_dir.path().join("output.json");
    std::fs::write(
        &input,
        r#"[{"referenceType": "Publication", "referenceId": 11, "linkedResources": [
              {"resourceType": "Digital Document", "fileName": "a.pdf", "fileSize": "12", "url": "http://h/a.pdf"}]},
            "not a record"]"#,
    )
    .expect("write input");

    let records = load_records(&input).await.expect("records should load");
    assert_eq!(records.len(), 1);

    let fetcher = Arc::new(RecordingFetcher::default());
    let stats = engine(fetcher.clone())
        .run(&records, &temp_dir.path().join("data"))
        .await;

    assert_eq!(stats.downloaded(), 1);
    assert!(temp_dir.path().join("data/Publication/11/a.pdf").exists());
}

#[tokio::test]
async fn test_attachment_named_like_a_staging_file_survives_its_sibling() {
    let mock_server = MockServer::start().await;
    for (route, body) in [("/a.pdf.part", "first attachment"), ("/a.pdf", "second attachment")] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&mock_server)
            .await;
    }
    let uri = mock_server.uri();
    let records = parse_records(&format!(
        r#"[{{"referenceType": "Publication", "referenceId": 8, "linkedResources": [
              {{"resourceType": "Digital Document", "fileName": "a.pdf.part", "url": "{uri}/a.pdf.part"}},
              {{"resourceType": "Digital Document", "fileName": "a.pdf", "url": "{uri}/a.pdf"}}
            ]}}]"#
    ))
    .unwrap();
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let fetcher = Arc::new(PlainHttpFetcher {
        inner: HttpClient::new(),
    });

    let stats = engine(fetcher).run(&records, temp_dir.path()).await;

    assert_eq!(stats.downloaded(), 2);
    let record_dir = temp_dir.path().join("Publication/8");
    assert_eq!(
        std::fs::read_to_string(record_dir.join("a.pdf.part")).expect("a.pdf.part"),
        "first attachment"
    );
    assert_eq!(
        std::fs::read_to_string(record_dir.join("a.pdf")).expect("a.pdf"),
        "second attachment"
    );
    assert_eq!(std::fs::read_dir(&record_dir).expect("record dir").count(), 2);
}

#[tokio::test]
async fn test_unreadable_destination_is_failed_not_fetched() {
    // A name longer than any filesystem segment limit makes the existence
    // check itself error out.
    let long_name = format!("{}.pdf", "x".repeat(300));
    let records = parse_records(&format!(
        r#"[{{"referenceType": "Publication", "referenceId": 4, "linkedResources": [
              {{"resourceType": "Digital Document", "fileName": "{long_name}", "url": "https://h/long.pdf"}},
              {{"resourceType": "Digital Document", "fileName": "short.pdf", "url": "https://h/short.pdf"}}
            ]}}]"#
    ))
    .unwrap();
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let fetcher = Arc::new(RecordingFetcher::default());

    let stats = engine(fetcher.clone()).run(&records, temp_dir.path()).await;

    assert_eq!(fetcher.calls(), vec!["https://h/short.pdf".to_string()]);
    assert_eq!(stats.failed(), 1);
    assert_eq!(stats.downloaded(), 1);
}
