//! HTTP client against a mock test-execution service.

use std::time::Duration;

use ostf_testing::adapter::testrun;
use ostf_testrun::{run_testset_with_timeout, AdapterClient, RunTimeout, TestRunError, TestRunId};
use rstest::rstest;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn server_with_latest(listing: Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/testruns/last/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_listings_are_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/testsets/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "fuel_sanity", "name": "Sanity tests"},
            {"id": "fuel_smoke", "name": "Smoke tests"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tests/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "fuel_sanity.test_a", "name": "A", "testset": "fuel_sanity"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/testruns/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([testrun(3, "fuel_sanity", "finished", &[])])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = AdapterClient::new(&server.uri()).unwrap();

    let testsets = client.testsets("1").await.unwrap();
    assert_eq!(testsets.len(), 2);
    assert_eq!(testsets[1].name, "Smoke tests");

    let tests = client.tests("1").await.unwrap();
    assert_eq!(tests[0].testset, "fuel_sanity");

    let runs = client.testruns().await.unwrap();
    assert_eq!(runs[0].id, TestRunId::Number(3));
}

#[tokio::test]
async fn test_non_success_status_names_method_url_and_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/testsets/1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = AdapterClient::new(&server.uri()).unwrap();
    let err = client.testsets("1").await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(
        err.to_string(),
        format!(
            "GET \"{}/testsets/1\" responded with \"500\" status code",
            server.uri()
        )
    );
}

#[rstest]
#[case(false, json!([{"testset": "sanity", "tests": ["sanity.a"], "metadata": {"cluster_id": "1"}}]))]
#[case(true, json!({"objects": [{"testset": "sanity", "tests": ["sanity.a"], "metadata": {"cluster_id": "1"}}]}))]
#[tokio::test]
async fn test_start_testrun_tests_body(#[case] use_objects: bool, #[case] expected: Value) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/testruns"))
        .and(header("content-type", "application/json"))
        .and(body_json(expected))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = AdapterClient::new(&server.uri()).unwrap();
    let response = client
        .start_testrun_tests("sanity", &["sanity.a".to_string()], "1", use_objects)
        .await
        .unwrap();
    assert_eq!(response, json!([{"id": 1}]));
}

#[tokio::test]
async fn test_start_multiple_testruns() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/testruns"))
        .and(body_json(json!([
            {"testset": "sanity", "tests": [], "metadata": {"cluster_id": "2"}},
            {"testset": "smoke", "tests": [], "metadata": {"cluster_id": "2"}}
        ])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = AdapterClient::new(&server.uri()).unwrap();
    let response = client
        .start_multiple_testruns(&["sanity".to_string(), "smoke".to_string()], "2", false)
        .await
        .unwrap();
    assert_eq!(response, Value::Null);
}

#[tokio::test]
async fn test_stop_and_restart_target_latest_run() {
    let server = server_with_latest(json!([
        testrun(6, "smoke", "finished", &[]),
        testrun(7, "sanity", "running", &[])
    ]))
    .await;
    Mock::given(method("PUT"))
        .and(path("/testruns"))
        .and(body_json(json!([{"id": 7, "status": "stopped"}])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/testruns"))
        .and(body_json(json!({"objects": [
            {"id": "7", "tests": ["sanity.a"], "status": "restarted"}
        ]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = AdapterClient::new(&server.uri()).unwrap();
    client.stop_testrun_last("sanity", "1", false).await.unwrap();
    client
        .restart_tests_last("sanity", &["sanity.a".to_string()], "1", true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stop_unknown_testset_sends_nothing() {
    let server = server_with_latest(json!([testrun(6, "smoke", "finished", &[])])).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = AdapterClient::new(&server.uri()).unwrap();
    let err = client
        .stop_testrun_last("sanity", "1", false)
        .await
        .unwrap_err();
    assert!(matches!(err, TestRunError::TestsetNotFound { .. }));
}

#[tokio::test]
async fn test_run_with_timeout_over_http() {
    let server = server_with_latest(json!([testrun(
        8,
        "sanity",
        "finished",
        &[("sanity.a", "success", 0.3)]
    )]))
    .await;
    Mock::given(method("POST"))
        .and(path("/testruns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 8}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = AdapterClient::new(&server.uri()).unwrap();
    let settings = RunTimeout::new(Duration::from_secs(5)).with_polling(Duration::from_millis(10));

    let runs = run_testset_with_timeout(&client, "sanity", "1", settings, None)
        .await
        .unwrap();
    assert!(runs[0].is_finished());
    assert_eq!(runs[0].tests[0].taken, Some(0.3));
}
