//! Models service for the warden crate
//!
//! Embedding and generation operations against Gemini models. Every call
//! runs through the call guard owned by the underlying HTTP client, with the
//! estimated token cost derived from the input text.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::budget::estimate_tokens_for_len;
use crate::error::Result;
use crate::http::HttpClient;
use crate::types::{
    BatchEmbedContentsResponse, Content, EmbedContentResponse, GenerateContentResponse,
};

/// Request for generating content
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    /// The contents to generate from
    contents: Vec<Content>,

    /// The system prompt
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemInstruction")]
    system_instruction: Option<Content>,
}

/// Request for embedding one content
#[derive(Debug, Serialize)]
struct EmbedContentRequest {
    /// The content to embed
    content: Content,
}

/// Request for embedding a batch of contents
#[derive(Debug, Serialize)]
struct BatchEmbedContentsRequest {
    requests: Vec<BatchEmbedEntry>,
}

#[derive(Debug, Serialize)]
struct BatchEmbedEntry {
    model: String,
    content: Content,
}

/// Service for interacting with Gemini models
#[derive(Clone)]
pub struct ModelsService {
    /// HTTP client for making API requests
    http_client: HttpClient,
}

impl ModelsService {
    /// Create a new models service
    pub(crate) fn new(http_client: HttpClient) -> Self {
        Self { http_client }
    }

    /// Generate an embedding for one text.
    #[instrument(skip(self, text), level = "debug")]
    pub async fn embed_content(
        &self,
        model: impl Into<String> + std::fmt::Debug,
        text: impl Into<String>,
    ) -> Result<EmbedContentResponse> {
        let model = model.into();
        let content = Content::new().with_text(text);
        let estimated = estimate_tokens_for_len(content.text_len());

        let request = EmbedContentRequest { content };
        let path = format!("models/{}:embedContent", model);

        debug!("generating embedding from model {}", model);
        self.http_client.post(&path, &request, estimated).await
    }

    /// Generate embeddings for a batch of texts in one call.
    ///
    /// The estimated token cost accounted against the budget is summed over
    /// the whole batch.
    #[instrument(skip(self, texts), level = "debug")]
    pub async fn batch_embed_contents(
        &self,
        model: impl Into<String> + std::fmt::Debug,
        texts: &[String],
    ) -> Result<BatchEmbedContentsResponse> {
        let model = model.into();
        let qualified = format!("models/{}", model);
        let requests: Vec<BatchEmbedEntry> = texts
            .iter()
            .map(|text| BatchEmbedEntry {
                model: qualified.clone(),
                content: Content::new().with_text(text),
            })
            .collect();
        let estimated = estimate_tokens_for_len(texts.iter().map(|text| text.len()).sum());

        let request = BatchEmbedContentsRequest { requests };
        let path = format!("models/{}:batchEmbedContents", model);

        debug!("generating {} embeddings from model {}", texts.len(), model);
        self.http_client.post(&path, &request, estimated).await
    }

    /// Generate content from a model.
    #[instrument(skip(self, system_instruction, contents), level = "debug")]
    pub async fn generate_content(
        &self,
        model: impl Into<String> + std::fmt::Debug,
        system_instruction: Option<Content>,
        contents: Vec<Content>,
    ) -> Result<GenerateContentResponse> {
        let model = model.into();
        let chars: usize = contents.iter().map(Content::text_len).sum::<usize>()
            + system_instruction
                .as_ref()
                .map(Content::text_len)
                .unwrap_or(0);
        let estimated = estimate_tokens_for_len(chars);

        let request = GenerateContentRequest {
            contents,
            system_instruction,
        };
        let path = format!("models/{}:generateContent", model);

        debug!("generating content from model {}", model);
        self.http_client.post(&path, &request, estimated).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use tokio_test::assert_ok;

    fn service(base_url: String) -> ModelsService {
        let mut http_client = HttpClient::new("test-key".to_string());
        http_client.set_base_url(base_url);
        ModelsService::new(http_client)
    }

    #[tokio::test]
    async fn test_embed_content() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v1beta/models/embedding-001:embedContent")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding": {"values": [0.1, 0.2, 0.3]}}"#)
            .expect(1)
            .create_async()
            .await;

        let models_service = service(server.url());
        let response = assert_ok!(
            models_service
                .embed_content("embedding-001", "Hello, world!")
                .await
        );

        assert_eq!(response.embedding.values, vec![0.1, 0.2, 0.3]);
        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_batch_embed_contents() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v1beta/models/embedding-001:batchEmbedContents")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embeddings": [{"values": [1.0, 2.0]}, {"values": [3.0, 4.0]}]}"#)
            .expect(1)
            .create_async()
            .await;

        let models_service = service(server.url());
        let texts = vec!["first".to_string(), "second".to_string()];
        let response = assert_ok!(
            models_service
                .batch_embed_contents("embedding-001", &texts)
                .await
        );

        assert_eq!(response.embeddings.len(), 2);
        assert_eq!(response.embeddings[0].values, vec![1.0, 2.0]);
        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_content() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{
                            "text": "Generated text"
                        }]
                    }
                }]
            }"#,
            )
            .expect(1)
            .create_async()
            .await;

        let models_service = service(server.url());
        let system = Content::new().with_text("You are a helpful assistant.");
        let content = Content::new().with_role("user").with_text("Hello, world!");
        let response = assert_ok!(
            models_service
                .generate_content("gemini-2.5-flash", Some(system), vec![content])
                .await
        );

        assert_eq!(response.text(), "Generated text");
        mock_server.assert_async().await;
    }
}
