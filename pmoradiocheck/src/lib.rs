//! Internet radio stream validator for PMOMusic
//!
//! This crate decides, within a caller-supplied time budget, whether an
//! arbitrary HTTP(S) URL is a playable internet radio stream. Servers in the
//! wild are slow, ignore `Range`, reject `HEAD` or never close the body, so
//! every network step is individually bounded.
//!
//! # Pipeline
//!
//! - **HEAD probe**: status, redirects, `Content-Type` and ICY headers
//! - **Smart skip**: an audio content type or ICY headers on a successful
//!   HEAD are taken as proof of audio
//! - **Sample**: otherwise a ranged `GET` reads at most 8 KiB, with a 3 s
//!   read ceiling, and the bytes are sniffed for audio signatures
//! - **Verdict**: `valid`, `invalid` or `error`, plus errors, warnings and
//!   human-readable recommendations
//!
//! Validation never returns an error: every outcome, including bad input, is
//! a [`ValidationResult`].
//!
//! # Example
//!
//! ```no_run
//! use pmoradiocheck::{StreamValidator, ValidationRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let validator = StreamValidator::new()?;
//!
//!     let result = validator
//!         .validate(ValidationRequest::new("https://icecast.radiofrance.fr/fip-hifi.aac"))
//!         .await;
//!
//!     println!("{} -> {}", result.url, result.status);
//!     for line in &result.recommendations {
//!         println!("  {}", line);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Batches
//!
//! When validating a list of stations before adding them, use
//! [`batch::validate_batch`], which applies the shorter
//! [`BATCH_TIMEOUT_MS`] budget per station and bounds concurrency.

pub mod batch;
pub mod detect;
pub mod error;
pub mod headers;
pub mod models;
pub mod probe;
pub mod recommend;
pub mod validator;

// Re-exports
pub use batch::{validate_batch, BatchSummary};
pub use detect::detect_audio;
pub use error::{Error, ProbeError, ProbePhase, Result};
pub use headers::{extract_streaming_headers, is_audio_content_type, is_playlist_content_type};
pub use models::{
    AudioDetectionResult, HeaderSnapshot, StreamingHeaders, ValidationChecks, ValidationContext,
    ValidationRequest, ValidationResult, ValidationStatus, BATCH_TIMEOUT_MS, DEFAULT_TIMEOUT_MS,
    MAX_TIMEOUT_MS, MIN_TIMEOUT_MS,
};
pub use probe::{
    HttpProbe, ProbeBuilder, ProbeResponse, SampleStop, StreamProbe, StreamSample,
    FALLBACK_HEAD_TIMEOUT_MS, HEAD_TIMEOUT_RATIO, MIN_SAMPLE_TIMEOUT_MS, SAMPLE_BUFFER_SIZE,
    STREAM_READ_TIMEOUT_MS,
};
pub use recommend::{recommend, PartialResult};
pub use validator::{validate_radio_stream, StreamValidator, ValidatorBuilder};
