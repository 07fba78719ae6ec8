//! Example: Validate one or more internet radio stream URLs
//!
//! Run with: cargo run -p pmoradiocheck --example validate_station -- <url> [<url>...]
//!
//! A single URL is validated with the default 8 s budget and printed as JSON.
//! Several URLs are validated as a batch with the 3 s per-station budget.

use pmoradiocheck::batch::DEFAULT_BATCH_CONCURRENCY;
use pmoradiocheck::{validate_batch, BatchSummary, StreamValidator, ValidationRequest};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (RUST_LOG=pmoradiocheck=debug for the probe details)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        eprintln!("usage: validate_station <url> [<url>...]");
        std::process::exit(2);
    }

    let validator = StreamValidator::new()?;

    if let [url] = urls.as_slice() {
        let result = validator.validate(ValidationRequest::new(url.as_str())).await;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let results = validate_batch(&validator, urls, DEFAULT_BATCH_CONCURRENCY).await;
    for result in &results {
        let mark = if result.success { "✅" } else { "❌" };
        println!(
            "{} [{}] {} ({} ms)",
            mark, result.status, result.url, result.test_duration
        );
        for error in &result.errors {
            println!("     error: {}", error);
        }
    }

    let summary = BatchSummary::from_results(&results);
    println!(
        "\n{} stations: {} valid, {} invalid, {} errors",
        summary.total, summary.valid, summary.invalid, summary.errors
    );

    Ok(())
}
