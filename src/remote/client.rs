//! Deployment Manager REST client.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, header};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{RemoteError, Result, StratosphereError};

use super::api::DeploymentApi;
use super::types::{Deployment, DeploymentRequest, ManifestRecord, Operation};

/// Deployment Manager v2 API root.
pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/deploymentmanager/v2";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries of a read after a transient failure.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries in milliseconds, scaled by the attempt.
const RETRY_DELAY_MS: u64 = 1000;

/// Wait used when a 429 carries no `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Deployment Manager API client.
#[derive(Debug, Clone)]
pub struct DeploymentManagerClient {
    /// HTTP client.
    client: Client,
    /// `<api>/projects/<project>/global`.
    base_url: String,
    /// Bearer token.
    access_token: String,
}

impl DeploymentManagerClient {
    /// Creates a client for `project` against the public API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(project: &str, access_token: &str) -> Result<Self> {
        Self::with_options(DEFAULT_API_URL, project, access_token, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom API root and timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_options(api_url: &str, project: &str, access_token: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RemoteError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("{}/projects/{project}/global", api_url.trim_end_matches('/')),
            access_token: access_token.to_string(),
        })
    }

    /// The project-scoped base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Executes a request. Reads are retried on transient failures; mutating
    /// calls are sent once, since the server may have accepted a request
    /// whose response was lost.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let retries = if method == Method::GET { MAX_RETRIES } else { 0 };
        let mut attempt = 0;

        loop {
            match self.execute_once::<T>(method.clone(), path, body.as_ref()).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < retries => {
                    attempt += 1;
                    let delay = e.retry_delay_secs().map_or_else(
                        || Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt)),
                        Duration::from_secs,
                    );
                    debug!(
                        "Retry attempt {attempt} of {retries} for {method} {path} in {}s: {e}",
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Executes a single request.
    async fn execute_once<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let url = format!("{}/{path}", self.base_url);
        trace!("{method} {url}");

        let mut request = self
            .client
            .request(method, &url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.access_token));
        if let Some(body) = body {
            trace!("Request body: {body}");
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound {
                resource: path.to_string(),
            }
            .into());
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

            return Err(RemoteError::RateLimited {
                retry_after_secs: retry_after,
            }
            .into());
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::AuthenticationFailed {
                message: format!("{status}: {body}"),
            }
            .into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::api_error(status.as_u16(), body).into());
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::invalid_response(format!("Failed to parse response: {e}")).into())
    }
}

fn to_body(request: &DeploymentRequest) -> Result<serde_json::Value> {
    serde_json::to_value(request)
        .map_err(|e| StratosphereError::internal(format!("Failed to encode request: {e}")))
}

#[async_trait]
impl DeploymentApi for DeploymentManagerClient {
    async fn get_deployment(&self, name: &str) -> Result<Option<Deployment>> {
        match self.execute(Method::GET, &format!("deployments/{name}"), None).await {
            Ok(deployment) => Ok(Some(deployment)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_manifest(&self, deployment: &str, manifest: &str) -> Result<ManifestRecord> {
        self.execute(
            Method::GET,
            &format!("deployments/{deployment}/manifests/{manifest}"),
            None,
        )
        .await
    }

    async fn create_deployment(&self, request: &DeploymentRequest) -> Result<Operation> {
        self.execute(Method::POST, "deployments", Some(to_body(request)?)).await
    }

    async fn update_deployment(&self, name: &str, request: &DeploymentRequest) -> Result<Operation> {
        self.execute(Method::PUT, &format!("deployments/{name}"), Some(to_body(request)?))
            .await
    }

    async fn delete_deployment(&self, name: &str) -> Result<Operation> {
        self.execute(Method::DELETE, &format!("deployments/{name}"), None).await
    }

    async fn get_operation(&self, name: &str) -> Result<Operation> {
        self.execute(Method::GET, &format!("operations/{name}"), None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::OperationStatus;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BASE: &str = "/projects/my-project/global";

    fn client(server: &MockServer) -> DeploymentManagerClient {
        DeploymentManagerClient::with_options(&server.uri(), "my-project", "token-123", 5).unwrap()
    }

    #[test]
    fn test_base_url() {
        let client = DeploymentManagerClient::new("my-project", "t").unwrap();
        assert_eq!(
            client.base_url(),
            "https://www.googleapis.com/deploymentmanager/v2/projects/my-project/global"
        );
    }

    #[tokio::test]
    async fn test_missing_deployment_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{BASE}/deployments/dev-networks")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let deployment = client(&server).get_deployment("dev-networks").await.unwrap();
        assert!(deployment.is_none());
    }

    #[tokio::test]
    async fn test_get_deployment_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{BASE}/deployments/dev-networks")))
            .and(header("authorization", "Bearer token-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "dev-networks",
                "fingerprint": "abc=",
                "manifest": "https://example/manifests/manifest-1"
            })))
            .mount(&server)
            .await;

        let deployment = client(&server).get_deployment("dev-networks").await.unwrap().unwrap();
        assert_eq!(deployment.fingerprint.as_deref(), Some("abc="));
        assert_eq!(deployment.manifest_name(), Some("manifest-1"));
    }

    #[tokio::test]
    async fn test_create_posts_manifest_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{BASE}/deployments")))
            .and(body_partial_json(json!({
                "name": "dev-networks",
                "target": {"config": {"content": "resources: []\n"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operation-1",
                "status": "PENDING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = DeploymentRequest::new("dev-networks", "project: my-project, name: dev-networks", "resources: []\n");
        let operation = client(&server).create_deployment(&request).await.unwrap();
        assert_eq!(operation.name, "operation-1");
        assert_eq!(operation.status, OperationStatus::Pending);
    }

    #[tokio::test]
    async fn test_get_manifest_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{BASE}/deployments/dev-networks/manifests/manifest-1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "manifest-1",
                "config": {"content": "resources: []\n"}
            })))
            .mount(&server)
            .await;

        let record = client(&server).get_manifest("dev-networks", "manifest-1").await.unwrap();
        assert_eq!(record.content(), Some("resources: []\n"));
    }

    #[tokio::test]
    async fn test_forbidden_is_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{BASE}/operations/operation-1")))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let err = client(&server).get_operation("operation-1").await.unwrap_err();
        assert!(matches!(err, StratosphereError::Remote(RemoteError::AuthenticationFailed { .. })));
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{BASE}/deployments/dev-networks")))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).delete_deployment("dev-networks").await.unwrap_err();
        assert!(matches!(
            err,
            StratosphereError::Remote(RemoteError::ApiRequestFailed { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_timed_out_create_is_sent_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{BASE}/deployments")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "operation-1", "status": "PENDING"}))
                    .set_delay(Duration::from_millis(1500)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = DeploymentManagerClient::with_options(&server.uri(), "my-project", "token-123", 1).unwrap();
        let request = DeploymentRequest::new("dev-networks", "d", "resources: []\n");
        let err = client.create_deployment(&request).await.unwrap_err();
        assert!(matches!(err, StratosphereError::Remote(RemoteError::NetworkError { .. })));
    }

    #[tokio::test]
    async fn test_rate_limited_create_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{BASE}/deployments")))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .expect(1)
            .mount(&server)
            .await;

        let request = DeploymentRequest::new("dev-networks", "d", "resources: []\n");
        let err = client(&server).create_deployment(&request).await.unwrap_err();
        assert_eq!(err.retry_delay_secs(), Some(0));
    }

    #[tokio::test]
    async fn test_rate_limited_read_waits_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{BASE}/operations/operation-1")))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{BASE}/operations/operation-1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operation-1",
                "status": "DONE"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let operation = client(&server).get_operation("operation-1").await.unwrap();
        assert!(operation.is_done());
    }

    #[tokio::test]
    async fn test_read_is_retried_three_times() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{BASE}/operations/operation-1")))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .expect(u64::from(MAX_RETRIES) + 1)
            .mount(&server)
            .await;

        let err = client(&server).get_operation("operation-1").await.unwrap_err();
        assert!(matches!(err, StratosphereError::Remote(RemoteError::RateLimited { .. })));
    }
}
