//! # warden - a resilient Gemini API client
//!
//! This crate is a client-side resilience layer between application code and
//! the Gemini embedding/generation API. Every call runs through a call
//! guard with two cooperating components:
//!
//! - A **budget tracker** keeps a rolling 60-second account of request count
//!   and estimated token usage, and delays callers just long enough to stay
//!   within configured requests-per-minute and tokens-per-minute limits.
//! - A **retry wrapper** classifies failures into transient, quota-exhausted
//!   and fatal, retries the first with exponential backoff and the second
//!   with a much longer delay, and fails fast on the last.
//!
//! The guard is built for multi-threaded callers: clones of a [`Client`]
//! share one budget window, and waiting never blocks an OS thread.
//!
//! ## Example
//!
//! ```rust,no_run
//! use warden::{pipeline, Client};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Budgeting and retries tuned for Gemini free-tier limits
//!     let client = Client::with_api_key_rate_limited("your-api-key");
//!
//!     let texts: Vec<String> = vec!["first document".into(), "second document".into()];
//!     let vectors = pipeline::embed_corpus(
//!         &client.models(),
//!         "embedding-001",
//!         &texts,
//!         pipeline::DEFAULT_BATCH_SIZE,
//!     )
//!     .await?;
//!
//!     println!("embedded {} documents", vectors.len());
//!     Ok(())
//! }
//! ```

pub mod budget;
pub mod classify;
pub mod client;
pub mod error;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod retry;
pub mod types;

pub use budget::{estimate_tokens, BudgetTracker, CallBudget};
pub use classify::ErrorClass;
pub use client::Client;
pub use error::{Error, Result};
pub use models::ModelsService;
pub use retry::RetryPolicy;
pub use types::{Content, Embedding, HttpOptions};
