//! HTTP client for the test-execution service.

use async_trait::async_trait;
use ostf_poll::HTTP_REQUEST_TIMEOUT;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::error::TestRunError;
use crate::model::{find_run, Test, TestRun, TestRunId, Testset};

/// Client for the test-execution service.
#[derive(Debug, Clone)]
pub struct AdapterClient {
    client: reqwest::Client,
    base_url: String,
}

impl AdapterClient {
    /// Create a client for the service rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, TestRunError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the JSON body, `Null` when empty.
    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, TestRunError> {
        debug!(method = %method, url = %url, "Adapter request");

        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.body(body.to_string());
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            error!(method = %method, url = %url, status = %status, "Adapter request failed");
            return Err(TestRunError::Remote {
                method: method.as_str().to_uppercase(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TestRunError> {
        let value = self.request(Method::GET, &self.url(path), None).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn post_runs(&self, items: Vec<Value>, use_objects: bool) -> Result<Value, TestRunError> {
        let body = wrap(items, use_objects);
        self.request(Method::POST, &self.url("/testruns"), Some(&body))
            .await
    }

    async fn put_runs(&self, items: Vec<Value>, use_objects: bool) -> Result<Value, TestRunError> {
        let body = wrap(items, use_objects);
        self.request(Method::PUT, &self.url("/testruns"), Some(&body))
            .await
    }

    pub async fn testsets(&self, cluster_id: &str) -> Result<Vec<Testset>, TestRunError> {
        self.get(&format!("/testsets/{cluster_id}")).await
    }

    pub async fn tests(&self, cluster_id: &str) -> Result<Vec<Test>, TestRunError> {
        self.get(&format!("/tests/{cluster_id}")).await
    }

    pub async fn testruns(&self) -> Result<Vec<TestRun>, TestRunError> {
        self.get("/testruns/").await
    }

    /// Latest run of every testset for a cluster.
    pub async fn testruns_last(&self, cluster_id: &str) -> Result<Vec<TestRun>, TestRunError> {
        self.get(&format!("/testruns/last/{cluster_id}")).await
    }

    /// Latest runs as the raw response body.
    pub async fn testruns_last_raw(&self, cluster_id: &str) -> Result<Value, TestRunError> {
        self.request(
            Method::GET,
            &self.url(&format!("/testruns/last/{cluster_id}")),
            None,
        )
        .await
    }

    /// Start a whole testset.
    pub async fn start_testrun(
        &self,
        testset: &str,
        cluster_id: &str,
        use_objects: bool,
    ) -> Result<Value, TestRunError> {
        self.start_testrun_tests(testset, &[], cluster_id, use_objects)
            .await
    }

    /// Start selected tests of a testset; an empty list runs all of them.
    pub async fn start_testrun_tests(
        &self,
        testset: &str,
        tests: &[String],
        cluster_id: &str,
        use_objects: bool,
    ) -> Result<Value, TestRunError> {
        self.post_runs(vec![run_item(testset, tests, cluster_id)], use_objects)
            .await
    }

    pub async fn start_multiple_testruns(
        &self,
        testsets: &[String],
        cluster_id: &str,
        use_objects: bool,
    ) -> Result<Value, TestRunError> {
        let items = testsets
            .iter()
            .map(|testset| run_item(testset, &[], cluster_id))
            .collect();
        self.post_runs(items, use_objects).await
    }

    pub async fn stop_testrun(
        &self,
        testrun_id: &TestRunId,
        use_objects: bool,
    ) -> Result<Value, TestRunError> {
        self.put_runs(
            vec![json!({"id": testrun_id, "status": "stopped"})],
            use_objects,
        )
        .await
    }

    /// Stop the latest run of `testset` on a cluster.
    pub async fn stop_testrun_last(
        &self,
        testset: &str,
        cluster_id: &str,
        use_objects: bool,
    ) -> Result<Value, TestRunError> {
        let id = self.last_run_id(testset, cluster_id).await?;
        self.stop_testrun(&id, use_objects).await
    }

    pub async fn restart_tests(
        &self,
        tests: &[String],
        testrun_id: &TestRunId,
        use_objects: bool,
    ) -> Result<Value, TestRunError> {
        self.put_runs(
            vec![json!({
                "id": testrun_id.to_string(),
                "tests": tests,
                "status": "restarted",
            })],
            use_objects,
        )
        .await
    }

    /// Restart tests of the latest run of `testset` on a cluster.
    pub async fn restart_tests_last(
        &self,
        testset: &str,
        tests: &[String],
        cluster_id: &str,
        use_objects: bool,
    ) -> Result<Value, TestRunError> {
        let id = self.last_run_id(testset, cluster_id).await?;
        self.restart_tests(tests, &id, use_objects).await
    }

    async fn last_run_id(&self, testset: &str, cluster_id: &str) -> Result<TestRunId, TestRunError> {
        let runs = self.testruns_last(cluster_id).await?;
        find_run(&runs, testset)
            .map(|run| run.id.clone())
            .ok_or_else(|| TestRunError::testset_not_found(testset, cluster_id))
    }
}

fn run_item(testset: &str, tests: &[String], cluster_id: &str) -> Value {
    json!({
        "testset": testset,
        "tests": tests,
        "metadata": {"cluster_id": cluster_id},
    })
}

/// Array body, or `{"objects": [...]}` when `use_objects` is set.
pub fn wrap(items: Vec<Value>, use_objects: bool) -> Value {
    if use_objects {
        json!({ "objects": items })
    } else {
        Value::Array(items)
    }
}

/// The calls the run poller makes.
#[async_trait]
pub trait TestRunService: Send + Sync {
    async fn submit_run(
        &self,
        testset: &str,
        tests: &[String],
        cluster_id: &str,
    ) -> Result<Value, TestRunError>;

    async fn submit_restart(
        &self,
        testset: &str,
        tests: &[String],
        cluster_id: &str,
    ) -> Result<Value, TestRunError>;

    async fn stop_latest(&self, testset: &str, cluster_id: &str) -> Result<Value, TestRunError>;

    async fn latest_runs(&self, cluster_id: &str) -> Result<Value, TestRunError>;
}

#[async_trait]
impl TestRunService for AdapterClient {
    async fn submit_run(
        &self,
        testset: &str,
        tests: &[String],
        cluster_id: &str,
    ) -> Result<Value, TestRunError> {
        self.start_testrun_tests(testset, tests, cluster_id, false)
            .await
    }

    async fn submit_restart(
        &self,
        testset: &str,
        tests: &[String],
        cluster_id: &str,
    ) -> Result<Value, TestRunError> {
        self.restart_tests_last(testset, tests, cluster_id, false)
            .await
    }

    async fn stop_latest(&self, testset: &str, cluster_id: &str) -> Result<Value, TestRunError> {
        self.stop_testrun_last(testset, cluster_id, false).await
    }

    async fn latest_runs(&self, cluster_id: &str) -> Result<Value, TestRunError> {
        self.testruns_last_raw(cluster_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = AdapterClient::new("http://127.0.0.1:8777/v1/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8777/v1");
        assert_eq!(client.url("/testruns"), "http://127.0.0.1:8777/v1/testruns");
    }

    #[test]
    fn test_wrap() {
        let items = vec![json!({"id": 1})];
        assert_eq!(wrap(items.clone(), false), json!([{"id": 1}]));
        assert_eq!(wrap(items, true), json!({"objects": [{"id": 1}]}));
    }

    #[test]
    fn test_run_item_sends_cluster_as_string() {
        assert_eq!(
            run_item("sanity", &["sanity.a".to_string()], "3"),
            json!({
                "testset": "sanity",
                "tests": ["sanity.a"],
                "metadata": {"cluster_id": "3"},
            })
        );
    }
}
