//! Client entry point for the warden crate

use crate::budget::CallBudget;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::models::ModelsService;
use crate::types::HttpOptions;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Client for the Gemini API
///
/// Entry point for the embedding and generation services, carrying the call
/// guard configuration. Construct one instance at process bootstrap and
/// share it (it is cheap to clone; clones share one budget window).
#[derive(Clone)]
pub struct Client {
    http_client: HttpClient,
}

impl Client {
    /// Create a client with an API key and default options: no client-side
    /// budgeting, default retry policy.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(api_key.into()),
        }
    }

    /// Create a client with custom options.
    pub fn with_options(api_key: impl Into<String>, options: HttpOptions) -> Self {
        Self {
            http_client: HttpClient::with_options(api_key.into(), options),
        }
    }

    /// Create a client with client-side budgeting tuned for Gemini free-tier
    /// limits.
    pub fn with_api_key_rate_limited(api_key: impl Into<String>) -> Self {
        Self::with_options(api_key, HttpOptions::gemini_rate_limited())
    }

    /// Build a client from the environment.
    ///
    /// `GEMINI_API_KEY` is required. `GEMINI_REQUESTS_PER_MINUTE`,
    /// `GEMINI_TOKENS_PER_MINUTE` and `GEMINI_MAX_ATTEMPTS` override the
    /// free-tier defaults when set.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            Error::Auth(format!("{} environment variable must be set", API_KEY_ENV))
        })?;

        let mut options = HttpOptions::gemini_rate_limited();
        if let Some(budget) = options.budget.as_mut() {
            if let Some(rpm) = env_parse("GEMINI_REQUESTS_PER_MINUTE")? {
                budget.requests_per_minute = rpm;
            }
            if let Some(tpm) = env_parse("GEMINI_TOKENS_PER_MINUTE")? {
                budget.tokens_per_minute = tpm;
            }
        }
        if let Some(max_attempts) = env_parse("GEMINI_MAX_ATTEMPTS")? {
            options.retry.max_attempts = max_attempts;
        }

        Ok(Self::with_options(api_key, options))
    }

    /// Whether client-side budgeting is enabled.
    pub fn is_rate_limited(&self) -> bool {
        self.http_client.budget_tracker().is_some()
    }

    /// The budget currently guarding this client, if any.
    pub fn budget(&self) -> Option<CallBudget> {
        self.http_client
            .budget_tracker()
            .map(|tracker| tracker.budget())
    }

    /// Access the models service.
    pub fn models(&self) -> ModelsService {
        ModelsService::new(self.http_client.clone())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|_| {
            Error::InvalidRequest(format!("{} is not a valid value for {}", raw, name))
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_with_api_key() {
        let client = Client::with_api_key("test-api-key");
        assert!(!client.is_rate_limited());
    }

    #[test]
    fn test_client_creation_rate_limited() {
        let client = Client::with_api_key_rate_limited("test-api-key");
        assert!(client.is_rate_limited());
        let budget = client.budget().unwrap();
        assert_eq!(budget.requests_per_minute, 28);
    }
}
