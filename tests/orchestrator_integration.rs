//! Integration tests for the orchestrator: result accounting, idempotent
//! re-runs and the error log written from a run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use doihive_core::fetch::{FetchOrchestrator, FetchTask, NoopObserver, TracingObserver};
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::fixtures::{PDF_BODY, download_page, fast_settings, task};
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return socket_skip_return();
        };
        mock_server
    }};
}

#[tokio::test]
async fn test_mixed_run_counts_and_error_log() {
    let mock_server = require_mock_server!();
    let out = TempDir::new().unwrap();
    let logs = TempDir::new().unwrap();

    // 10.1234/have is already on disk.
    std::fs::write(out.path().join("10.1234_have.pdf"), PDF_BODY).unwrap();

    Mock::given(method("GET"))
        .and(path("/10.1234/good"))
        .respond_with(ResponseTemplate::new(200).set_body_string(download_page("/f/good.pdf")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/f/good.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PDF_BODY.to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/10.1234/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/10.1234/have"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let base = mock_server.uri();
    let tasks = vec![
        task(&base, "10.1234/have"),
        task(&base, "10.1234/good"),
        task(&base, "10.1234/broken"),
    ];
    let orchestrator =
        FetchOrchestrator::build(fast_settings(out.path()), 3, Arc::new(TracingObserver)).unwrap();
    let summary = orchestrator.run(tasks).await.unwrap();

    assert_eq!(summary.total(), 3);
    assert_eq!(summary.success_count(), 1);
    assert_eq!(summary.skip_count(), 1);
    assert_eq!(summary.failed_count(), 1);
    assert_eq!(summary.errors().len(), 1);
    assert_eq!(summary.total_bytes(), PDF_BODY.len() as u64);

    let record = &summary.errors().records()[0];
    assert_eq!(record.identifier, "10.1234/broken");
    assert_eq!(record.message, "page request failed: HTTP 500 (retried 3 times)");
    assert_eq!(record.kind(), "page request failed");

    let log_path = summary
        .errors()
        .write_json(logs.path(), summary.started_at())
        .unwrap()
        .unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(log_path).unwrap()).unwrap();
    assert_eq!(value["summary"]["total_errors"], 1);
    assert_eq!(value["errors"].as_array().unwrap().len(), 1);
    assert_eq!(value["errors"][0]["doi"], "10.1234/broken");
    assert_eq!(value["errors"][0]["url"], format!("{base}/10.1234/broken"));
}

#[tokio::test]
async fn test_every_task_yields_exactly_one_result() {
    let mock_server = require_mock_server!();
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path_regex(r"^/10\.5555/even\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(download_page("/f/doc.pdf")))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/10\.5555/odd\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>article not found</p>"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/f/doc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PDF_BODY.to_vec()))
        .mount(&mock_server)
        .await;

    let base = mock_server.uri();
    let tasks: Vec<FetchTask> = (0..10)
        .map(|i| {
            let kind = if i % 2 == 0 { "even" } else { "odd" };
            task(&base, &format!("10.5555/{kind}{i}"))
        })
        .collect();

    let orchestrator =
        FetchOrchestrator::build(fast_settings(out.path()), 4, Arc::new(NoopObserver)).unwrap();
    let summary = orchestrator.run(tasks).await.unwrap();

    assert_eq!(summary.total(), 10);
    assert_eq!(summary.completed(), 10);
    assert_eq!(summary.success_count(), 5);
    assert_eq!(summary.failed_count(), 5);
    assert_eq!(
        summary.success_count() + summary.skip_count() + summary.failed_count(),
        summary.total()
    );
    let groups = summary.errors().groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].kind, "no artifact URL found on page");
    assert_eq!(groups[0].count, 5);
}

#[tokio::test]
async fn test_second_run_is_all_skips_without_requests() {
    let mock_server = require_mock_server!();
    let out = TempDir::new().unwrap();
    let base = mock_server.uri();
    let dois = ["10.1234/one", "10.1234/two", "10.1234/three"];

    for doi in dois {
        let name = doi.rsplit('/').next().unwrap();
        Mock::given(method("GET"))
            .and(path(format!("/{doi}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(download_page(&format!("/f/{name}.pdf"))),
            )
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path_regex(r"^/f/\w+\.pdf$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PDF_BODY.to_vec()))
        .mount(&mock_server)
        .await;

    let orchestrator =
        FetchOrchestrator::build(fast_settings(out.path()), 2, Arc::new(NoopObserver)).unwrap();
    let first = orchestrator
        .run(dois.iter().map(|d| task(&base, d)).collect())
        .await
        .unwrap();
    assert_eq!(first.success_count(), 3);

    let requests_after_first = mock_server.received_requests().await.unwrap().len();
    assert_eq!(requests_after_first, 6);

    let second = orchestrator
        .run(dois.iter().map(|d| task(&base, d)).collect())
        .await
        .unwrap();
    assert_eq!(second.skip_count(), 3);
    assert_eq!(second.total_bytes(), 0);
    assert_eq!(
        mock_server.received_requests().await.unwrap().len(),
        requests_after_first
    );
}

#[tokio::test]
async fn test_successful_run_writes_no_error_files() {
    let mock_server = require_mock_server!();
    let out = TempDir::new().unwrap();
    let logs = TempDir::new().unwrap();
    let error_dir = logs.path().join("errors");

    Mock::given(method("GET"))
        .and(path("/10.1234/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(download_page("/f/abc.pdf")))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/f/abc.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(PDF_BODY.to_vec()))
        .mount(&mock_server)
        .await;

    let orchestrator =
        FetchOrchestrator::build(fast_settings(out.path()), 1, Arc::new(NoopObserver)).unwrap();
    let summary = orchestrator
        .run(vec![task(&mock_server.uri(), "10.1234/abc")])
        .await
        .unwrap();

    assert!(summary.errors().is_empty());
    assert!(
        summary
            .errors()
            .write_json(&error_dir, summary.started_at())
            .unwrap()
            .is_none()
    );
    assert!(
        summary
            .errors()
            .write_retry_list(&error_dir, summary.started_at())
            .unwrap()
            .is_none()
    );
    assert!(!error_dir.exists());
}

#[tokio::test]
async fn test_run_with_all_files_present_needs_no_network() {
    let out = TempDir::new().unwrap();
    std::fs::write(out.path().join("10.1234_x.pdf"), PDF_BODY).unwrap();

    let orchestrator =
        FetchOrchestrator::build(fast_settings(out.path()), 1, Arc::new(NoopObserver)).unwrap();
    // Port 9 (discard) is never contacted for an existing file.
    let summary = orchestrator
        .run(vec![task("http://127.0.0.1:9", "10.1234/x")])
        .await
        .unwrap();
    assert_eq!(summary.skip_count(), 1);
    assert_eq!(summary.statistics().success, 0);
}

/// Runs `tasks` page-only tasks against a mirror answering every page after
/// `delay`, returning the wall-clock time at `workers` concurrency.
async fn timed_run(base: &str, workers: usize, tasks: usize) -> Duration {
    let out = TempDir::new().unwrap();
    let orchestrator =
        FetchOrchestrator::build(fast_settings(out.path()), workers, Arc::new(NoopObserver))
            .unwrap();
    let tasks: Vec<FetchTask> = (0..tasks)
        .map(|i| task(base, &format!("10.7777/slow{i}")))
        .collect();
    let started = Instant::now();
    let summary = orchestrator.run(tasks).await.unwrap();
    assert_eq!(summary.completed(), summary.total());
    started.elapsed()
}

#[tokio::test]
async fn test_worker_count_bounds_tasks_in_flight() {
    let mock_server = require_mock_server!();
    let delay = Duration::from_millis(200);
    // No artifact link: each task is exactly one delayed page request.
    Mock::given(method("GET"))
        .and(path_regex(r"^/10\.7777/slow\d+$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<p>nothing</p>")
                .set_delay(delay),
        )
        .mount(&mock_server)
        .await;
    let base = mock_server.uri();

    // 8 tasks at W=2 need at least 4 sequential waves.
    let two = timed_run(&base, 2, 8).await;
    assert!(two >= delay * 4, "W=2 finished in {two:?}");

    // 8 tasks at W=1 need 8 waves.
    let one = timed_run(&base, 1, 8).await;
    assert!(one >= delay * 8, "W=1 finished in {one:?}");

    // 8 tasks at W=8 run as one wave.
    let eight = timed_run(&base, 8, 8).await;
    assert!(eight < delay * 4, "W=8 took {eight:?}");
    assert!(eight < two && two < one);
}
