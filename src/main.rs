//! # warden CLI application
//!
//! Command-line front end for the guarded Gemini client:
//!
//! - `embed`: embed a text corpus in batches, with budget throttling between
//!   batches and progress reporting
//! - `generate`: one-shot content generation for a prompt
//!
//! The API key is read from `GEMINI_API_KEY`; per-minute budgets can be
//! overridden on the command line.

mod telemetry;

use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use warden::{Client, Content, HttpOptions, pipeline};

#[derive(Parser)]
#[command(author, version, about = "Client-side rate limiting and retry for the Gemini API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed one text per non-empty line of an input file
    Embed(EmbedArgs),

    /// Generate a response for a single prompt
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct EmbedArgs {
    /// File with one text per line
    #[arg(required = true)]
    input: PathBuf,

    /// Embedding model to use
    #[arg(short, long, default_value = "embedding-001")]
    model: String,

    /// Texts per API call (10-20 recommended)
    #[arg(short, long, default_value_t = pipeline::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Requests-per-minute budget
    #[arg(long)]
    rpm: Option<u32>,

    /// Tokens-per-minute budget
    #[arg(long)]
    tpm: Option<u64>,

    /// Write JSON vectors here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// The prompt to send
    #[arg(required = true)]
    prompt: String,

    /// Generation model to use
    #[arg(short, long, default_value = "gemini-2.5-flash")]
    model: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing_subscriber();

    let cli = Cli::parse();
    match cli.command {
        Commands::Embed(args) => embed(args).await,
        Commands::Generate(args) => generate(args).await,
    }
}

fn client_from_env(rpm: Option<u32>, tpm: Option<u64>) -> anyhow::Result<Client> {
    let api_key = std::env::var("GEMINI_API_KEY")
        .context("GEMINI_API_KEY environment variable must be set")?;

    let mut options = HttpOptions::gemini_rate_limited();
    if let Some(budget) = options.budget.as_mut() {
        if let Some(rpm) = rpm {
            budget.requests_per_minute = rpm;
        }
        if let Some(tpm) = tpm {
            budget.tokens_per_minute = tpm;
        }
    }

    Ok(Client::with_options(api_key, options))
}

async fn embed(args: EmbedArgs) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let texts: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if texts.is_empty() {
        return Err(anyhow!("no texts found in {}", args.input.display()));
    }

    let client = client_from_env(args.rpm, args.tpm)?;
    let models = client.models();
    let batch_size = args.batch_size.max(1);
    let batches = texts.len().div_ceil(batch_size);

    let progress = ProgressBar::new(batches as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} batches {msg}")?
            .progress_chars("#>-"),
    );

    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size) {
        let embedded = pipeline::embed_corpus(&models, &args.model, batch, batch.len()).await?;
        vectors.extend(embedded);
        progress.inc(1);
    }
    progress.finish_with_message("done");

    let json = serde_json::to_string(&vectors)?;
    match args.output {
        Some(path) => tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", json),
    }

    Ok(())
}

async fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let client = client_from_env(None, None)?;
    let content = Content::new().with_role("user").with_text(&args.prompt);
    let response = client
        .models()
        .generate_content(args.model.as_str(), None, vec![content])
        .await?;

    println!("{}", response.text());
    Ok(())
}
