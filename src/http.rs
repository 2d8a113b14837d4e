//! HTTP client for the Gemini API
//!
//! Every request runs through the call guard: the retry wrapper is
//! outermost, and each attempt reserves budget before it is sent, so a
//! retried request is accounted the same as a fresh one.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client as ReqwestClient, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;

use crate::budget::BudgetTracker;
use crate::error::{Error, Result};
use crate::retry::{self, RetryPolicy};
use crate::types::{ApiErrorBody, HttpOptions};

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// HTTP client for making requests to the Gemini API
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: ReqwestClient,

    /// Base URL for API requests
    base_url: String,

    /// API key for authentication, sent as a query parameter
    api_key: String,

    /// API version
    api_version: String,

    /// Budget tracker shared across clones, so every user of this key draws
    /// on one window
    budget: Option<Arc<BudgetTracker>>,

    /// Retry behavior for failed requests
    retry: RetryPolicy,
}

#[cfg(test)]
impl HttpClient {
    /// Set the base URL (for testing only)
    pub fn set_base_url(&mut self, url: String) {
        self.base_url = url;
    }
}

impl HttpClient {
    /// Create a new HTTP client with an API key and default options
    pub fn new(api_key: String) -> Self {
        Self::with_options(api_key, HttpOptions::default())
    }

    /// Create a new HTTP client with an API key and custom options
    pub fn with_options(api_key: String, options: HttpOptions) -> Self {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key,
            api_version: options.api_version,
            budget: options
                .budget
                .map(|budget| Arc::new(BudgetTracker::new(budget))),
            retry: options.retry,
        }
    }

    /// The budget tracker guarding this client, if budgeting is enabled.
    pub fn budget_tracker(&self) -> Option<&Arc<BudgetTracker>> {
        self.budget.as_ref()
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        let url = format!("{}/{}/{}", self.base_url, self.api_version, path);
        Url::parse(&url).map_err(|e| Error::InvalidRequest(format!("invalid URL: {}", e)))
    }

    /// POST a JSON body, accounting `estimated_tokens` against the budget.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        estimated_tokens: u64,
    ) -> Result<T> {
        let url = self.build_url(path)?;
        debug!(path, estimated_tokens, "sending POST request");

        retry::execute(&self.retry, || {
            let request = self
                .client
                .post(url.clone())
                .query(&[("key", self.api_key.as_str())])
                .json(body);
            let budget = self.budget.clone();
            async move {
                if let Some(budget) = &budget {
                    budget.reserve(estimated_tokens).await;
                }
                send(request).await
            }
        })
        .await
    }
}

/// Send one prepared request and decode the response.
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = request.send().await.map_err(Error::Http)?;
    let status = response.status();
    let body = response.text().await.map_err(Error::Http)?;

    if status.is_success() {
        serde_json::from_str(&body).map_err(|e| {
            error!("failed to parse response: {}", e);
            Error::UnexpectedResponse(format!("failed to parse response: {}", e))
        })
    } else {
        error!("API error: {} - {}", status, body);
        Err(error_from_response(status, &body))
    }
}

/// Map a failure response to a typed error, pulling the message out of the
/// Gemini error envelope when the body carries one.
fn error_from_response(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(message),
        StatusCode::BAD_REQUEST => Error::InvalidRequest(message),
        _ => Error::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::CallBudget;
    use mockito::Server;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct TestResponse {
        message: String,
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            multiplier: 2.0,
            max_delay: Duration::from_millis(10),
            quota_delay: Duration::from_millis(2),
            jitter: 0.0,
        }
    }

    #[tokio::test]
    async fn post_request_success() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v1beta/test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{\"message\": \"success\"}")
            .match_query(mockito::Matcher::Any)
            .expect(1)
            .create_async()
            .await;

        let mut client = HttpClient::new("test-key".to_string());
        client.set_base_url(server.url());

        let body = serde_json::json!({"test": "data"});
        let response: TestResponse = client.post("test", &body, 1).await.unwrap();
        assert_eq!(response.message, "success");

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn transient_rate_limit_retries_until_exhausted() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v1beta/test")
            .with_status(429)
            .with_body("{\"error\": {\"code\": 429, \"message\": \"rate limit exceeded\", \"status\": \"RESOURCE_EXHAUSTED\"}}")
            .match_query(mockito::Matcher::Any)
            .expect(2)
            .create_async()
            .await;

        let options = HttpOptions {
            retry: fast_retry(2),
            ..HttpOptions::default()
        };
        let mut client = HttpClient::with_options("test-key".to_string(), options);
        client.set_base_url(server.url());

        let body = serde_json::json!({});
        let result: Result<TestResponse> = client.post("test", &body, 1).await;
        assert!(matches!(
            result,
            Err(Error::TransientExhausted { attempts: 2, .. })
        ));

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn quota_message_exhausts_as_quota_error() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v1beta/test")
            .with_status(429)
            .with_body("{\"error\": {\"code\": 429, \"message\": \"Resource has been exhausted (e.g. check quota)\", \"status\": \"RESOURCE_EXHAUSTED\"}}")
            .match_query(mockito::Matcher::Any)
            .expect(3)
            .create_async()
            .await;

        let options = HttpOptions {
            retry: fast_retry(3),
            ..HttpOptions::default()
        };
        let mut client = HttpClient::with_options("test-key".to_string(), options);
        client.set_base_url(server.url());

        let body = serde_json::json!({});
        let result: Result<TestResponse> = client.post("test", &body, 1).await;
        assert!(matches!(
            result,
            Err(Error::QuotaExhausted { attempts: 3, .. })
        ));

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v1beta/test")
            .with_status(401)
            .with_body("{\"error\": {\"code\": 401, \"message\": \"API key not valid\", \"status\": \"UNAUTHENTICATED\"}}")
            .match_query(mockito::Matcher::Any)
            .expect(1)
            .create_async()
            .await;

        let options = HttpOptions {
            retry: fast_retry(3),
            ..HttpOptions::default()
        };
        let mut client = HttpClient::with_options("test-key".to_string(), options);
        client.set_base_url(server.url());

        let body = serde_json::json!({});
        let result: Result<TestResponse> = client.post("test", &body, 1).await;
        assert!(matches!(result, Err(Error::Auth(_))));

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn every_attempt_is_charged_to_the_budget() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v1beta/test")
            .with_status(429)
            .with_body("{\"error\": {\"code\": 429, \"message\": \"rate limit exceeded\", \"status\": \"RESOURCE_EXHAUSTED\"}}")
            .match_query(mockito::Matcher::Any)
            .expect(2)
            .create_async()
            .await;

        let options = HttpOptions {
            budget: Some(CallBudget {
                requests_per_minute: 100,
                tokens_per_minute: 1_000_000,
            }),
            retry: fast_retry(2),
            ..HttpOptions::default()
        };
        let mut client = HttpClient::with_options("test-key".to_string(), options);
        client.set_base_url(server.url());

        let body = serde_json::json!({});
        let result: Result<TestResponse> = client.post("test", &body, 10).await;
        assert!(result.is_err());

        let tracker = client.budget_tracker().unwrap();
        assert_eq!(tracker.usage().await, (2, 20));

        mock_server.assert_async().await;
    }
}
