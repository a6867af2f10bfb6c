mod common;

use std::sync::Arc;

use serde_json::json;

use common::{executor_with, vars, MockHttpProvider, Recorder};
use reqflow_core::{HttpResponse, Protocol, TestResultStatus};
use reqflow_exec::{ExecuteOptions, ExecutionState, Selection};

fn echo() -> (Arc<Recorder>, reqflow_exec::Executor) {
    let recorder = Arc::new(Recorder::default());
    let executor = executor_with(vec![Arc::new(MockHttpProvider::echo(recorder.clone()))]);
    (recorder, executor)
}

#[tokio::test]
async fn counted_loop_runs_three_clones_with_index() {
    let doc = "\
###
# @name items
# @loop for 3
GET http://mock/items/{{$index}}
";
    let (recorder, executor) = echo();
    let file = executor.load_str(doc, None).unwrap();
    let report = executor.execute(&file, "items", &ExecuteOptions::default()).await.unwrap();

    assert!(report.succeeded);
    assert_eq!(
        recorder.urls(),
        vec!["http://mock/items/0", "http://mock/items/1", "http://mock/items/2"]
    );
    assert_eq!(report.response.unwrap().body_value()["url"], "http://mock/items/2");
    assert_eq!(file.region_by_name("items").unwrap().status(), ExecutionState::Completed);
}

#[tokio::test]
async fn for_of_iterates_arrays_and_skips_everything_else() {
    let doc = "\
###
# @name each
# @loop for item of list
GET http://mock/{{item}}
";
    let (recorder, executor) = echo();
    let file = executor.load_str(doc, None).unwrap();

    let options = ExecuteOptions {
        variables: vars(&[("list", json!(["a", "b"]))]),
        ..ExecuteOptions::default()
    };
    executor.execute(&file, "each", &options).await.unwrap();
    assert_eq!(recorder.urls(), vec!["http://mock/a", "http://mock/b"]);

    let options = ExecuteOptions {
        variables: vars(&[("list", json!("not an array"))]),
        ..ExecuteOptions::default()
    };
    let report = executor.execute(&file, "each", &options).await.unwrap();
    assert!(report.succeeded);
    assert_eq!(recorder.urls().len(), 2);
}

#[tokio::test]
async fn while_loop_stops_when_condition_turns_false() {
    let doc = "\
###
# @name poll
# @loop while {{$index}} < 2
GET http://mock/poll/{{$index}}
";
    let (recorder, executor) = echo();
    let file = executor.load_str(doc, None).unwrap();
    executor.execute(&file, "poll", &ExecuteOptions::default()).await.unwrap();
    assert_eq!(recorder.urls(), vec!["http://mock/poll/0", "http://mock/poll/1"]);
}

#[tokio::test]
async fn disabled_regions_are_skipped_not_failed() {
    let doc = "\
###
# @name off
# @disabled
GET http://mock/off

###
# @name maybe
# @disabled {{flag}} == true
GET http://mock/maybe
";
    let (recorder, executor) = echo();
    let file = executor.load_str(doc, None).unwrap();

    let off = executor.execute(&file, "off", &ExecuteOptions::default()).await.unwrap();
    assert!(off.skipped);
    assert!(!off.has_failures());
    assert_eq!(off.test_results[0].status, TestResultStatus::Skipped);

    let on = ExecuteOptions {
        variables: vars(&[("flag", json!(true))]),
        ..ExecuteOptions::default()
    };
    let maybe = executor.execute(&file, "maybe", &on).await.unwrap();
    assert!(maybe.skipped);
    assert!(recorder.urls().is_empty());

    let off_flag = ExecuteOptions {
        variables: vars(&[("flag", json!(false))]),
        ..ExecuteOptions::default()
    };
    let maybe = executor.execute(&file, "maybe", &off_flag).await.unwrap();
    assert!(maybe.succeeded);
    assert_eq!(recorder.urls(), vec!["http://mock/maybe"]);
}

#[tokio::test]
async fn assertions_record_success_and_failure() {
    let doc = "\
###
# @name item
GET http://mock/item
?? status == 200
?? body $.id == 7
?? body $.id == 8
?? header content-type contains json
";
    let recorder = Arc::new(Recorder::default());
    let provider = MockHttpProvider::new(recorder, |_| {
        let mut response = HttpResponse::new(Protocol::Http, 200).with_body(r#"{"id":7}"#);
        response.headers.push(("Content-Type".into(), "application/json".into()));
        response
    });
    let executor = executor_with(vec![Arc::new(provider)]);
    let file = executor.load_str(doc, None).unwrap();

    let report = executor.execute(&file, "item", &ExecuteOptions::default()).await.unwrap();
    let statuses: Vec<TestResultStatus> = report.test_results.iter().map(|t| t.status).collect();
    assert_eq!(
        statuses,
        vec![
            TestResultStatus::Success,
            TestResultStatus::Success,
            TestResultStatus::Failed,
            TestResultStatus::Success,
        ]
    );
    assert!(!report.succeeded);
    assert!(report.has_failures());
}

#[tokio::test]
async fn missing_protocol_client_is_an_error_result() {
    let doc = "\
###
# @name events
MQTT mqtt://broker/topic
";
    let (_, executor) = echo();
    let file = executor.load_str(doc, None).unwrap();
    let report = executor.execute(&file, "events", &ExecuteOptions::default()).await.unwrap();
    assert!(report.error.unwrap().contains("MQTT"));
    assert_eq!(report.test_results[0].status, TestResultStatus::Error);
}

#[tokio::test]
async fn batch_isolates_errors_and_shares_variables() {
    let doc = "\
###
# @name broken
# @ref missing
GET http://mock/broken

###
# @name login
POST http://mock/login

###
# @name next
GET http://mock/next?u={{login.url}}
";
    let (recorder, executor) = echo();
    let file = executor.load_str(doc, None).unwrap();
    let batch = executor
        .execute_all(&file, &Selection::All, &ExecuteOptions::default())
        .await
        .unwrap();

    assert_eq!(batch.reports.len(), 3);
    assert!(batch.reports[0].error.is_some());
    assert!(batch.reports[1].succeeded && batch.reports[2].succeeded);
    assert_eq!(batch.failed_count(), 1);
    assert_eq!(
        recorder.urls(),
        vec!["http://mock/login", "http://mock/next?u=http://mock/login"]
    );
}

#[tokio::test]
async fn bail_skips_regions_after_a_failure() {
    let doc = "\
###
# @name first
GET http://mock/first
?? status == 500

###
# @name second
GET http://mock/second
";
    let recorder = Arc::new(Recorder::default());
    let executor = executor_with(vec![Arc::new(MockHttpProvider::echo(recorder.clone()))]).with_bail();
    let file = executor.load_str(doc, None).unwrap();
    let batch = executor
        .execute_all(&file, &Selection::All, &ExecuteOptions::default())
        .await
        .unwrap();

    assert!(batch.reports[0].has_failures());
    assert!(batch.reports[1].skipped);
    assert_eq!(recorder.urls(), vec!["http://mock/first"]);
    assert!(!batch.succeeded());
}

#[tokio::test]
async fn bail_sees_failures_from_any_loop_iteration() {
    let doc = "\
###
# @name items
# @loop for 2
GET http://mock/items/{{$index}}
?? {{$index}} == 1

###
# @name after
GET http://mock/after
";
    let (recorder, executor) = echo();
    let executor = executor.with_bail();
    let file = executor.load_str(doc, None).unwrap();
    let batch = executor
        .execute_all(&file, &Selection::All, &ExecuteOptions::default())
        .await
        .unwrap();

    let statuses: Vec<_> = batch.reports[0].test_results.iter().map(|t| t.status).collect();
    assert_eq!(statuses, vec![TestResultStatus::Failed, TestResultStatus::Success]);
    assert!(batch.reports[1].skipped);
    assert_eq!(recorder.urls(), vec!["http://mock/items/0", "http://mock/items/1"]);
}

#[tokio::test]
async fn unknown_selection_is_rejected_up_front() {
    let (_, executor) = echo();
    let file = executor.load_str("GET http://mock/x\n", None).unwrap();
    let err = executor
        .execute_all(&file, &Selection::Names(vec!["nope".into()]), &ExecuteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, reqflow_exec::ExecutionError::RegionNotFound(_)));
}
