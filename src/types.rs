//! Wire types for the Gemini API and client configuration

use serde::{Deserialize, Serialize};

use crate::budget::CallBudget;
use crate::retry::RetryPolicy;

/// Options controlling the HTTP client and its call guard.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// API version path segment
    pub api_version: String,

    /// Per-minute budget enforced client side; `None` disables budgeting
    pub budget: Option<CallBudget>,

    /// Retry behavior for failed calls
    pub retry: RetryPolicy,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            api_version: "v1beta".to_string(),
            budget: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpOptions {
    /// Options tuned for Gemini free-tier limits: budgeting on with a safety
    /// margin below the published numbers, and extra retry headroom.
    pub fn gemini_rate_limited() -> Self {
        Self {
            budget: Some(CallBudget::gemini_free_tier()),
            retry: RetryPolicy {
                max_attempts: 5,
                ..RetryPolicy::default()
            },
            ..Self::default()
        }
    }
}

/// A piece of content sent to or returned by a model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    /// The role of the content (e.g. "user", "model")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// The parts that make up this content
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a new empty content
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the role for this content
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Add text to this content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part { text: text.into() });
        self
    }

    /// Total character count across all parts, used for token estimation.
    pub fn text_len(&self) -> usize {
        self.parts.iter().map(|part| part.text.len()).sum()
    }
}

/// A text part of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// The text of this part
    pub text: String,
}

/// Response from content generation.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    /// The generated candidates
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, empty if the model returned none.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

/// A single generation candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    /// The candidate content
    pub content: Content,
}

/// Response from embedding a single content.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedContentResponse {
    /// The generated embedding
    pub embedding: Embedding,
}

/// Response from embedding a batch of contents.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchEmbedContentsResponse {
    /// One embedding per requested content, in request order
    pub embeddings: Vec<Embedding>,
}

/// An embedding vector.
#[derive(Debug, Clone, Deserialize)]
pub struct Embedding {
    /// The embedding values
    pub values: Vec<f32>,
}

/// Error envelope returned by the API on failure.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub message: String,
}
