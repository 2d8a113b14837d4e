//! Batched corpus embedding through the call guard

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::ModelsService;

/// Default number of texts per batch. Small batches give the budget tracker
/// frequent opportunities to throttle between calls; 10 to 20 is the
/// recommended range.
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Embed a corpus of texts in batches, returning one vector per input text
/// in order.
pub async fn embed_corpus(
    models: &ModelsService,
    model: &str,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let mut vectors = Vec::with_capacity(texts.len());

    for (index, batch) in texts.chunks(batch_size).enumerate() {
        debug!(batch = index, len = batch.len(), "embedding batch");
        let response = models.batch_embed_contents(model, batch).await?;
        if response.embeddings.len() != batch.len() {
            return Err(Error::UnexpectedResponse(format!(
                "requested {} embeddings, received {}",
                batch.len(),
                response.embeddings.len()
            )));
        }
        vectors.extend(
            response
                .embeddings
                .into_iter()
                .map(|embedding| embedding.values),
        );
    }

    info!(
        texts = texts.len(),
        vectors = vectors.len(),
        model,
        "embedded corpus"
    );
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpClient;
    use mockito::Server;

    fn service(base_url: String) -> ModelsService {
        let mut http_client = HttpClient::new("test-key".to_string());
        http_client.set_base_url(base_url);
        ModelsService::new(http_client)
    }

    #[tokio::test]
    async fn embeds_in_batches_preserving_order() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v1beta/models/embedding-001:batchEmbedContents")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embeddings": [{"values": [1.0, 2.0]}, {"values": [3.0, 4.0]}]}"#)
            .expect(2)
            .create_async()
            .await;

        let models = service(server.url());
        let texts: Vec<String> = (0..4).map(|i| format!("text {}", i)).collect();
        let vectors = embed_corpus(&models, "embedding-001", &texts, 2).await.unwrap();

        assert_eq!(vectors.len(), 4);
        assert_eq!(vectors[0], vec![1.0, 2.0]);
        assert_eq!(vectors[3], vec![3.0, 4.0]);
        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn rejects_mismatched_response_cardinality() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v1beta/models/embedding-001:batchEmbedContents")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embeddings": [{"values": [1.0]}]}"#)
            .expect(1)
            .create_async()
            .await;

        let models = service(server.url());
        let texts = vec!["one".to_string(), "two".to_string()];
        let result = embed_corpus(&models, "embedding-001", &texts, 2).await;

        assert!(matches!(result, Err(Error::UnexpectedResponse(_))));
        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn empty_corpus_yields_no_vectors() {
        let models = service("http://127.0.0.1:1".to_string());
        let vectors = embed_corpus(&models, "embedding-001", &[], 2).await.unwrap();
        assert!(vectors.is_empty());
    }
}
