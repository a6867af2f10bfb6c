mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{executor_with, vars, Recorder, ScriptedStreamProvider, Step};
use reqflow_exec::{ExecuteOptions, Progress, Selection};

const DOC: &str = "\
###
# @name feed
WS ws://mock/feed

{\"subscribe\": \"{{topic}}\"}
";

fn options(progress: Option<Progress>) -> ExecuteOptions {
    ExecuteOptions {
        variables: vars(&[("topic", serde_json::json!("prices"))]),
        environments: Vec::new(),
        progress,
    }
}

#[tokio::test]
async fn messages_merge_into_one_response_with_first_error_winning() {
    let recorder = Arc::new(Recorder::default());
    let script = vec![
        Step::Meta("open", 101),
        Step::Data(101, "1"),
        Step::Data(101, "2"),
        Step::Error(1011),
        Step::Close,
    ];
    let provider = ScriptedStreamProvider::new(recorder.clone(), script, None);
    let executor = executor_with(vec![Arc::new(provider)]);
    let file = executor.load_str(DOC, None).unwrap();

    let report = executor.execute(&file, "feed", &options(None)).await.unwrap();
    let response = report.response.unwrap();
    assert_eq!(response.status_code, 1011);
    assert_eq!(response.body_value(), serde_json::json!([1, 2]));
    assert_eq!(recorder.sent.lock().clone(), vec![r#"{"subscribe": "prices"}"#]);
    assert_eq!(recorder.disconnects(), 1);
}

#[tokio::test]
async fn without_errors_the_last_data_message_shapes_the_response() {
    let recorder = Arc::new(Recorder::default());
    let script = vec![Step::Data(101, "1"), Step::Data(102, "2"), Step::Meta("close", 1000), Step::Close];
    let provider = ScriptedStreamProvider::new(recorder.clone(), script, None);
    let executor = executor_with(vec![Arc::new(provider)]);
    let file = executor.load_str(DOC, None).unwrap();

    let report = executor.execute(&file, "feed", &options(None)).await.unwrap();
    assert!(report.succeeded);
    assert_eq!(report.response.unwrap().status_code, 102);
}

#[tokio::test]
async fn stream_end_racing_cancellation_disconnects_once() {
    let recorder = Arc::new(Recorder::default());
    let progress = Progress::new();
    let script = vec![Step::Data(101, "1"), Step::Close, Step::Cancel];
    let provider = ScriptedStreamProvider::new(recorder.clone(), script, Some(progress.clone()));
    let executor = executor_with(vec![Arc::new(provider)]);
    let file = executor.load_str(DOC, None).unwrap();

    let report = executor.execute(&file, "feed", &options(Some(progress))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(recorder.disconnects(), 1);
    assert!(report.error.is_none());
    assert!(file.region_by_name("feed").unwrap().response().is_some());
}

#[tokio::test]
async fn cancelling_an_open_stream_before_any_message_cancels_the_region() {
    let recorder = Arc::new(Recorder::default());
    let progress = Progress::new();
    let script = vec![Step::Cancel, Step::Sleep(Duration::from_secs(5)), Step::Data(101, "late")];
    let provider = ScriptedStreamProvider::new(recorder.clone(), script, Some(progress.clone()));
    let executor = executor_with(vec![Arc::new(provider)]);
    let file = executor.load_str(DOC, None).unwrap();

    let report = executor.execute(&file, "feed", &options(Some(progress))).await.unwrap();
    assert!(report.cancelled);
    assert!(!report.has_failures());
    assert!(report.response.is_none());
    assert_eq!(recorder.disconnects(), 1);
}

#[tokio::test]
async fn cancelled_batches_stop_before_the_next_region() {
    let recorder = Arc::new(Recorder::default());
    let progress = Progress::new();
    progress.cancel();
    let provider = ScriptedStreamProvider::new(recorder.clone(), vec![Step::Close], None);
    let executor = executor_with(vec![Arc::new(provider)]);
    let file = executor.load_str(DOC, None).unwrap();

    let batch = executor
        .execute_all(&file, &Selection::All, &options(Some(progress)))
        .await
        .unwrap();
    assert!(batch.cancelled);
    assert!(batch.reports.is_empty());
    assert!(recorder.urls().is_empty());
}
