//! Data models for stream validation requests and results
//!
//! `ValidationRequest` is what callers send (it deserializes from the
//! tool-dispatch JSON `{url, timeout?, followRedirects?}`), and
//! `ValidationResult` is what they get back, serialized in camelCase so it
//! can be returned as-is.

use crate::error::{Error, Result};
use crate::probe::head_timeout_ms;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use url::Url;

/// Lowest accepted request timeout
pub const MIN_TIMEOUT_MS: u64 = 1000;

/// Highest accepted request timeout
pub const MAX_TIMEOUT_MS: u64 = 30_000;

/// Timeout used when the caller does not provide one
pub const DEFAULT_TIMEOUT_MS: u64 = 8000;

/// Per-station timeout for batch validation (validate-before-add)
pub const BATCH_TIMEOUT_MS: u64 = 3000;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_follow_redirects() -> bool {
    true
}

// ============================================================================
// Request / Context
// ============================================================================

/// A request to validate one radio stream URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    /// Stream URL, must be an absolute http(s) URL
    pub url: String,
    /// Overall time budget in milliseconds
    #[serde(default = "default_timeout_ms", alias = "timeout")]
    pub timeout_ms: u64,
    /// Whether HTTP redirects are followed
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
}

impl ValidationRequest {
    /// Create a request with the single-station defaults
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            follow_redirects: true,
        }
    }

    /// Create a request with the smaller batch timeout
    pub fn for_batch(url: impl Into<String>) -> Self {
        Self::new(url).with_timeout_ms(BATCH_TIMEOUT_MS)
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Check the request parameters and build the per-call context
    ///
    /// Fails on a non-absolute or non-http(s) URL and on a timeout outside
    /// `[MIN_TIMEOUT_MS, MAX_TIMEOUT_MS]`.
    pub fn into_context(self, start_time: Instant) -> Result<ValidationContext> {
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(Error::TimeoutOutOfRange(self.timeout_ms));
        }

        let url = Url::parse(self.url.trim())?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(Error::UnsupportedScheme(other.to_string())),
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(Error::InvalidUrl(url::ParseError::EmptyHost));
        }

        Ok(ValidationContext {
            url,
            start_time,
            timeout_ms: self.timeout_ms,
            follow_redirects: self.follow_redirects,
        })
    }
}

/// Immutable per-call state shared by the probe phases
#[derive(Debug, Clone)]
pub struct ValidationContext {
    pub url: Url,
    pub start_time: Instant,
    pub timeout_ms: u64,
    pub follow_redirects: bool,
}

impl ValidationContext {
    /// Time spent since the request started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Budget left before `timeout_ms` is exhausted (zero once exceeded)
    pub fn remaining(&self) -> Duration {
        Duration::from_millis(self.timeout_ms).saturating_sub(self.elapsed())
    }

    /// Deadline applied to the HEAD phase
    pub fn head_timeout(&self) -> Duration {
        Duration::from_millis(head_timeout_ms(self.timeout_ms))
    }
}

// ============================================================================
// Headers / Detection
// ============================================================================

/// Streaming-protocol headers (`icy-*`, `x-audiocast-*`), keyed by lower-cased name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamingHeaders(BTreeMap<String, String>);

impl StreamingHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Insert a header, lower-casing its name
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Add the headers of `other` that are not already present
    pub fn merge_missing(&mut self, other: &StreamingHeaders) {
        for (name, value) in &other.0 {
            self.0
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Station name (`icy-name`, or `x-audiocast-name`)
    pub fn station_name(&self) -> Option<&str> {
        self.non_blank("icy-name")
            .or_else(|| self.non_blank("x-audiocast-name"))
    }

    /// Bitrate in kbps as announced by the server (`icy-br`, or `x-audiocast-bitrate`)
    pub fn bitrate(&self) -> Option<&str> {
        self.non_blank("icy-br")
            .or_else(|| self.non_blank("x-audiocast-bitrate"))
    }

    pub fn genre(&self) -> Option<&str> {
        self.non_blank("icy-genre")
            .or_else(|| self.non_blank("x-audiocast-genre"))
    }

    /// Metadata interval in bytes (`icy-metaint`)
    pub fn metaint(&self) -> Option<u32> {
        self.get("icy-metaint")
            .and_then(|v| v.trim().parse().ok())
    }

    fn non_blank(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }
}

impl FromIterator<(String, String)> for StreamingHeaders {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// What a response told us through its headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSnapshot {
    pub streaming: StreamingHeaders,
    /// Raw `content-type` value, if the response carried one
    pub content_type: Option<String>,
}

/// Outcome of byte-level audio sniffing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDetectionResult {
    pub detected: bool,
    /// Short codec token (`mp3`, `aac`, `ogg`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

impl AudioDetectionResult {
    pub fn not_detected() -> Self {
        Self::default()
    }

    pub fn detected(format: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            detected: true,
            format: Some(format.into()),
            mime: Some(mime.into()),
        }
    }
}

// ============================================================================
// Result
// ============================================================================

/// Final verdict of a validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    /// Stream judged playable
    Valid,
    /// Reachable, but not an audio stream
    Invalid,
    /// Bad input, or nothing could be fetched at all
    Error,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Valid => f.write_str("valid"),
            ValidationStatus::Invalid => f.write_str("invalid"),
            ValidationStatus::Error => f.write_str("error"),
        }
    }
}

/// The individual checks the verdict is built from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationChecks {
    pub http_accessible: bool,
    pub has_audio_content_type: bool,
    pub has_streaming_headers: bool,
    pub audio_data_detected: bool,
}

impl ValidationChecks {
    /// Reachable, and at least one audio signal
    pub fn is_playable(&self) -> bool {
        self.http_accessible
            && (self.has_audio_content_type
                || self.audio_data_detected
                || self.has_streaming_headers)
    }
}

/// Structured outcome of one validation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub success: bool,
    pub url: String,
    /// Resolved URL, only when redirects changed it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    pub status: ValidationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub streaming_headers: StreamingHeaders,
    /// Present only when a byte sample was obtained and inspected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<AudioDetectionResult>,
    pub validation: ValidationChecks,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    /// Wall-clock milliseconds since the request started
    pub test_duration: u64,
}

impl ValidationResult {
    pub fn is_playable(&self) -> bool {
        self.success
    }

    pub fn is_valid(&self) -> bool {
        self.status == ValidationStatus::Valid
    }
}
