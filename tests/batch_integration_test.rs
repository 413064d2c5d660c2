use crpt_api::app::batch::send_batch;
use crpt_api::core::receipt_log::ReceiptEntry;
use crpt_api::utils::error::ErrorSeverity;
use crpt_api::{CrptApi, CrptError, Document, HttpDocumentSender, RateLimiter};
use httpmock::prelude::*;
use std::time::Duration;
use tempfile::TempDir;

fn api_for(url: String, request_limit: usize) -> CrptApi {
    let sender = HttpDocumentSender::new(url, Duration::from_secs(5)).unwrap();
    let limiter = RateLimiter::new(request_limit, Duration::from_millis(200)).unwrap();
    CrptApi::with_sender(sender, limiter)
}

#[tokio::test]
async fn test_batch_writes_receipts() {
    let temp_dir = TempDir::new().unwrap();
    let receipts_path = temp_dir.path().join("receipts.jsonl");

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/create");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"value": "ok"}));
    });

    let api = api_for(server.url("/create"), 5);
    let summary = send_batch(&api, &Document::sample(), 8, Some(receipts_path.clone()))
        .await
        .unwrap();

    api_mock.assert_hits(8);
    assert_eq!(summary.sent, 8);
    assert_eq!(summary.failed, 0);
    assert!(summary.is_success());
    assert!(summary.worst_error().is_none());
    assert_eq!(summary.receipts_path.as_deref(), Some(receipts_path.as_path()));

    let content = std::fs::read_to_string(&receipts_path).unwrap();
    let entries: Vec<ReceiptEntry> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(entries.len(), 8);
    assert!(entries.iter().all(|e| e.status == Some(200) && e.error.is_none()));
    assert_eq!(entries[7].index, 7);
    assert_eq!(entries[0].body.as_ref().unwrap()["value"], "ok");
}

#[tokio::test]
async fn test_batch_collects_failures() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/create");
        then.status(500);
    });

    let api = api_for(server.url("/create"), 10);
    let summary = send_batch(&api, &Document::sample(), 3, None).await.unwrap();

    api_mock.assert_hits(3);
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.failed, 3);
    assert!(summary.receipts_path.is_none());

    let worst = summary.worst_error().unwrap();
    assert_eq!(worst.severity(), ErrorSeverity::Medium);
}

#[tokio::test]
async fn test_batch_rejects_invalid_document_before_sending() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).path("/create");
        then.status(200);
    });

    let mut document = Document::sample();
    document.owner_inn = "12".to_string();

    let api = api_for(server.url("/create"), 10);
    let err = send_batch(&api, &document, 2, None).await.unwrap_err();

    assert!(matches!(err, CrptError::ValidationError { .. }));
    api_mock.assert_hits(0);
}

#[tokio::test]
async fn test_receipts_are_written_while_batch_runs() {
    let temp_dir = TempDir::new().unwrap();
    let receipts_path = temp_dir.path().join("receipts.jsonl");

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/create");
        then.status(200);
    });

    let sender = HttpDocumentSender::new(server.url("/create"), Duration::from_secs(5)).unwrap();
    let limiter = RateLimiter::new(1, Duration::from_millis(500)).unwrap();
    let api = CrptApi::with_sender(sender, limiter);
    let document = Document::sample();

    let (summary, lines_mid_run) = tokio::join!(
        send_batch(&api, &document, 4, Some(receipts_path.clone())),
        async {
            tokio::time::sleep(Duration::from_millis(1_200)).await;
            std::fs::read_to_string(&receipts_path)
                .map(|content| content.lines().count())
                .unwrap_or(0)
        }
    );

    // The first two windows have closed by now.
    assert!(lines_mid_run >= 2, "only {} receipts on disk mid-run", lines_mid_run);

    let summary = summary.unwrap();
    assert_eq!(summary.sent, 4);
    let content = std::fs::read_to_string(&receipts_path).unwrap();
    assert_eq!(content.lines().count(), 4);
}
