//! Validate-before-add for lists of stations
//!
//! Each station is validated with the short [`BATCH_TIMEOUT_MS`] budget so the
//! batch latency stays predictable. A failing station is just a result with
//! `success = false`; it never aborts the rest of the batch.

use crate::models::{ValidationRequest, ValidationResult, ValidationStatus, BATCH_TIMEOUT_MS};
use crate::probe::StreamProbe;
use crate::validator::StreamValidator;
use futures::stream::{self, StreamExt};
use serde::Serialize;

/// Validations run at the same time by default
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Validate `urls` with the batch timeout
///
/// Results come back in input order. `concurrency` is clamped to at least 1.
pub async fn validate_batch<P, I, S>(
    validator: &StreamValidator<P>,
    urls: I,
    concurrency: usize,
) -> Vec<ValidationResult>
where
    P: StreamProbe,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let requests = urls
        .into_iter()
        .map(ValidationRequest::for_batch)
        .collect();
    validate_requests(validator, requests, concurrency).await
}

/// Validate prepared requests, keeping their own timeouts
pub async fn validate_requests<P: StreamProbe>(
    validator: &StreamValidator<P>,
    requests: Vec<ValidationRequest>,
    concurrency: usize,
) -> Vec<ValidationResult> {
    tracing::debug!(
        stations = requests.len(),
        concurrency,
        default_timeout_ms = BATCH_TIMEOUT_MS,
        "Validating station batch"
    );

    stream::iter(requests)
        .map(|request| validator.validate(request))
        .buffered(concurrency.max(1))
        .collect()
        .await
}

/// Verdict counts over a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub errors: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            summary.total += 1;
            match result.status {
                ValidationStatus::Valid => summary.valid += 1,
                ValidationStatus::Invalid => summary.invalid += 1,
                ValidationStatus::Error => summary.errors += 1,
            }
            summary
        })
    }

    pub fn all_valid(&self) -> bool {
        self.valid == self.total
    }
}
