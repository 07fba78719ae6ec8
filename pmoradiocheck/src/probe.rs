//! Network probing of a candidate stream
//!
//! Two bounded operations are offered: a `HEAD` request and a ranged,
//! size-capped `GET` sample. Both carry their own deadline so a stalled
//! server can never hold a validation past its budget.
//!
//! The sample read has two independent ceilings:
//! - the GET deadline (`max(MIN_SAMPLE_TIMEOUT_MS, remaining budget)`)
//! - a read ceiling of `STREAM_READ_TIMEOUT_MS` from the start of the body read
//!
//! Many radio servers ignore `Range` and stream forever, so the body is read
//! chunk by chunk and the response is dropped (closing the connection) as
//! soon as `SAMPLE_BUFFER_SIZE` bytes are collected or a ceiling is hit.

use crate::error::{Error, ProbeError, ProbePhase, Result};
use crate::models::ValidationContext;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, ACCEPT, LOCATION, RANGE};
use reqwest::{redirect, Client};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Share of the request budget granted to the HEAD phase
pub const HEAD_TIMEOUT_RATIO: f64 = 0.6;

/// Upper bound of the HEAD deadline
pub const FALLBACK_HEAD_TIMEOUT_MS: u64 = 4000;

/// Lower bound of the sample GET deadline
pub const MIN_SAMPLE_TIMEOUT_MS: u64 = 2000;

/// Maximum number of bytes sampled from the stream
pub const SAMPLE_BUFFER_SIZE: usize = 8192;

/// Ceiling on the body read, measured from its start
pub const STREAM_READ_TIMEOUT_MS: u64 = 3000;

/// Redirect hops followed when redirects are enabled
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!(
    "pmoradiocheck/",
    env!("CARGO_PKG_VERSION"),
    " (+internet radio stream validator)"
);

const ACCEPT_AUDIO: &str = "audio/*";

/// HEAD deadline: `min(FALLBACK_HEAD_TIMEOUT_MS, floor(timeout_ms * HEAD_TIMEOUT_RATIO))`
pub fn head_timeout_ms(timeout_ms: u64) -> u64 {
    let scaled = (timeout_ms as f64 * HEAD_TIMEOUT_RATIO).floor() as u64;
    FALLBACK_HEAD_TIMEOUT_MS.min(scaled)
}

/// Sample GET deadline: never below `MIN_SAMPLE_TIMEOUT_MS`
pub fn sample_timeout_ms(remaining_ms: u64) -> u64 {
    MIN_SAMPLE_TIMEOUT_MS.max(remaining_ms)
}

/// Value of the `Range` header sent with the sample request
pub fn sample_range_header() -> String {
    format!("bytes=0-{}", SAMPLE_BUFFER_SIZE - 1)
}

// ============================================================================
// Probe outcomes
// ============================================================================

/// Status line and headers of a probe response
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    /// URL after redirects (equal to the request URL when none were followed)
    pub final_url: Url,
    pub headers: HeaderMap,
}

impl ProbeResponse {
    pub fn new(status: u16, final_url: Url, headers: HeaderMap) -> Self {
        Self {
            status,
            final_url,
            headers,
        }
    }

    fn from_response(response: &reqwest::Response) -> Self {
        Self {
            status: response.status().as_u16(),
            final_url: response.url().clone(),
            headers: response.headers().clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// `Location` header of a redirect that was not followed
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }
}

/// Why the sample read stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleStop {
    /// `SAMPLE_BUFFER_SIZE` bytes collected
    ByteLimit,
    /// Read ceiling or GET deadline reached
    ReadTimeout,
    /// Server closed the body
    EndOfStream,
    /// Body read failed after the status line was received
    ReadError(String),
}

impl fmt::Display for SampleStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleStop::ByteLimit => f.write_str("byte limit reached"),
            SampleStop::ReadTimeout => f.write_str("read timed out"),
            SampleStop::EndOfStream => f.write_str("end of stream"),
            SampleStop::ReadError(e) => write!(f, "read error: {}", e),
        }
    }
}

/// Bytes collected by the sample GET, with the response they came from
#[derive(Debug, Clone)]
pub struct StreamSample {
    pub response: ProbeResponse,
    /// At most `SAMPLE_BUFFER_SIZE` bytes, possibly empty
    pub bytes: Vec<u8>,
    pub stop: SampleStop,
}

// ============================================================================
// Probe trait
// ============================================================================

/// Network operations needed by the validator
///
/// [`HttpProbe`] is the real implementation; the trait lets callers plug in
/// another transport and lets tests script outcomes.
#[async_trait]
pub trait StreamProbe: Send + Sync {
    /// `HEAD` the context URL within `ctx.head_timeout()`
    async fn head(&self, ctx: &ValidationContext) -> std::result::Result<ProbeResponse, ProbeError>;

    /// Ranged `GET` reading at most `SAMPLE_BUFFER_SIZE` bytes
    ///
    /// Only HTTP 200 and 206 are accepted; any other status is an error.
    async fn sample(
        &self,
        ctx: &ValidationContext,
        remaining: Duration,
    ) -> std::result::Result<StreamSample, ProbeError>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

/// reqwest-backed [`StreamProbe`]
///
/// Holds two clients since redirect handling is a client-level setting in
/// reqwest: one follows redirects, the other returns 3xx responses as-is.
/// Clients are cheap to clone and share a connection pool, so one probe can
/// serve any number of concurrent validations.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    following: Client,
    direct: Client,
}

impl HttpProbe {
    /// Create a probe with default settings
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the probe
    pub fn builder() -> ProbeBuilder {
        ProbeBuilder::default()
    }

    fn client(&self, follow_redirects: bool) -> &Client {
        if follow_redirects {
            &self.following
        } else {
            &self.direct
        }
    }
}

#[async_trait]
impl StreamProbe for HttpProbe {
    async fn head(&self, ctx: &ValidationContext) -> std::result::Result<ProbeResponse, ProbeError> {
        let budget = ctx.head_timeout();
        let budget_ms = budget.as_millis() as u64;

        tracing::debug!(
            url = %ctx.url,
            timeout_ms = budget_ms,
            follow_redirects = ctx.follow_redirects,
            "HEAD probe"
        );

        let request = self
            .client(ctx.follow_redirects)
            .head(ctx.url.clone())
            .header(ACCEPT, ACCEPT_AUDIO)
            .send();

        let response = match tokio::time::timeout(budget, request).await {
            Err(_) => {
                return Err(ProbeError::Timeout {
                    phase: ProbePhase::Head,
                    after_ms: budget_ms,
                })
            }
            Ok(Err(e)) => return Err(ProbeError::from_reqwest(ProbePhase::Head, &e, budget_ms)),
            Ok(Ok(response)) => response,
        };

        let probe = ProbeResponse::from_response(&response);
        tracing::debug!(status = probe.status, final_url = %probe.final_url, "HEAD response");
        Ok(probe)
    }

    async fn sample(
        &self,
        ctx: &ValidationContext,
        remaining: Duration,
    ) -> std::result::Result<StreamSample, ProbeError> {
        let budget_ms = sample_timeout_ms(remaining.as_millis() as u64);
        let budget = Duration::from_millis(budget_ms);
        let request_deadline = tokio::time::Instant::now() + budget;

        tracing::debug!(url = %ctx.url, timeout_ms = budget_ms, "Sampling stream");

        let request = self
            .client(ctx.follow_redirects)
            .get(ctx.url.clone())
            .header(RANGE, sample_range_header())
            .header(ACCEPT, ACCEPT_AUDIO)
            .send();

        let response = match tokio::time::timeout_at(request_deadline, request).await {
            Err(_) => {
                return Err(ProbeError::Timeout {
                    phase: ProbePhase::Sample,
                    after_ms: budget_ms,
                })
            }
            Ok(Err(e)) => {
                return Err(ProbeError::from_reqwest(ProbePhase::Sample, &e, budget_ms))
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status().as_u16();
        if status != 200 && status != 206 {
            return Err(ProbeError::Status {
                phase: ProbePhase::Sample,
                status,
            });
        }

        let probe = ProbeResponse::from_response(&response);
        let read_deadline = request_deadline
            .min(tokio::time::Instant::now() + Duration::from_millis(STREAM_READ_TIMEOUT_MS));
        let (bytes, stop) =
            read_capped(response.bytes_stream(), SAMPLE_BUFFER_SIZE, read_deadline).await;

        tracing::debug!(status, bytes = bytes.len(), stop = %stop, "Sample read finished");

        if bytes.is_empty() {
            if let SampleStop::ReadError(message) = &stop {
                return Err(ProbeError::Read {
                    phase: ProbePhase::Sample,
                    message: message.clone(),
                });
            }
        }

        Ok(StreamSample {
            response: probe,
            bytes,
            stop,
        })
    }
}

/// Read chunks until `limit` bytes, end of body, an error, or `deadline`
///
/// The stream is consumed by value: returning drops it, which for a
/// reqwest body aborts the transfer and releases the connection.
pub(crate) async fn read_capped<S, B, E>(
    stream: S,
    limit: usize,
    deadline: tokio::time::Instant,
) -> (Vec<u8>, SampleStop)
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut buffer = Vec::with_capacity(limit);

    loop {
        match tokio::time::timeout_at(deadline, stream.next()).await {
            Err(_) => return (buffer, SampleStop::ReadTimeout),
            Ok(None) => return (buffer, SampleStop::EndOfStream),
            Ok(Some(Err(e))) => return (buffer, SampleStop::ReadError(e.to_string())),
            Ok(Some(Ok(chunk))) => {
                let chunk = chunk.as_ref();
                let room = limit - buffer.len();
                if chunk.len() >= room {
                    buffer.extend_from_slice(&chunk[..room]);
                    return (buffer, SampleStop::ByteLimit);
                }
                buffer.extend_from_slice(chunk);
            }
        }
    }
}

/// Builder for configuring an [`HttpProbe`]
#[derive(Debug)]
pub struct ProbeBuilder {
    user_agent: String,
    proxy: Option<String>,
    connect_timeout: Option<Duration>,
    max_redirects: usize,
}

impl Default for ProbeBuilder {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            connect_timeout: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl ProbeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set a proxy URL
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Bound the TCP/TLS connect phase independently of the probe deadlines
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Maximum redirect hops when redirects are followed
    pub fn max_redirects(mut self, hops: usize) -> Self {
        self.max_redirects = hops;
        self
    }

    /// Build the probe
    pub fn build(self) -> Result<HttpProbe> {
        let following = self
            .client_builder()?
            .redirect(redirect::Policy::limited(self.max_redirects))
            .build()?;
        let direct = self
            .client_builder()?
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(HttpProbe { following, direct })
    }

    fn client_builder(&self) -> Result<reqwest::ClientBuilder> {
        let mut builder = Client::builder().user_agent(&self.user_agent);

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        if let Some(proxy_url) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| Error::other(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(sizes: &[usize]) -> Vec<std::result::Result<Vec<u8>, String>> {
        sizes.iter().map(|&n| Ok(vec![0xAB; n])).collect()
    }

    fn far_deadline() -> tokio::time::Instant {
        tokio::time::Instant::now() + Duration::from_secs(5)
    }

    #[test]
    fn test_head_timeout() {
        assert_eq!(head_timeout_ms(1000), 600);
        assert_eq!(head_timeout_ms(3000), 1800);
        assert_eq!(head_timeout_ms(6666), 3999);
        assert_eq!(head_timeout_ms(8000), FALLBACK_HEAD_TIMEOUT_MS);
        assert_eq!(head_timeout_ms(30_000), FALLBACK_HEAD_TIMEOUT_MS);
    }

    #[test]
    fn test_sample_timeout_floor() {
        assert_eq!(sample_timeout_ms(0), MIN_SAMPLE_TIMEOUT_MS);
        assert_eq!(sample_timeout_ms(1500), MIN_SAMPLE_TIMEOUT_MS);
        assert_eq!(sample_timeout_ms(6000), 6000);
    }

    #[test]
    fn test_range_header() {
        assert_eq!(sample_range_header(), "bytes=0-8191");
    }

    #[test]
    fn test_builder_defaults() {
        let builder = ProbeBuilder::default();
        assert_eq!(builder.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(builder.max_redirects, DEFAULT_MAX_REDIRECTS);
        assert!(builder.proxy.is_none());
    }

    #[test]
    fn test_builder_rejects_bad_proxy() {
        let err = HttpProbe::builder().proxy("::not a proxy::").build().unwrap_err();
        assert!(err.to_string().contains("Invalid proxy"));
    }

    #[tokio::test]
    async fn test_read_capped_stops_at_limit() {
        let stream = futures::stream::iter(chunks(&[4096, 4096, 4096, 4096]));
        let (bytes, stop) = read_capped(stream, SAMPLE_BUFFER_SIZE, far_deadline()).await;
        assert_eq!(bytes.len(), SAMPLE_BUFFER_SIZE);
        assert_eq!(stop, SampleStop::ByteLimit);
    }

    #[tokio::test]
    async fn test_read_capped_truncates_oversized_chunk() {
        let stream = futures::stream::iter(chunks(&[100, 20_000]));
        let (bytes, stop) = read_capped(stream, SAMPLE_BUFFER_SIZE, far_deadline()).await;
        assert_eq!(bytes.len(), SAMPLE_BUFFER_SIZE);
        assert_eq!(stop, SampleStop::ByteLimit);
    }

    #[tokio::test]
    async fn test_read_capped_end_of_stream() {
        let stream = futures::stream::iter(chunks(&[10, 20]));
        let (bytes, stop) = read_capped(stream, SAMPLE_BUFFER_SIZE, far_deadline()).await;
        assert_eq!(bytes.len(), 30);
        assert_eq!(stop, SampleStop::EndOfStream);
    }

    #[tokio::test]
    async fn test_read_capped_keeps_bytes_before_error() {
        let items: Vec<std::result::Result<Vec<u8>, String>> =
            vec![Ok(vec![1, 2, 3]), Err("connection reset".to_string())];
        let (bytes, stop) =
            read_capped(futures::stream::iter(items), SAMPLE_BUFFER_SIZE, far_deadline()).await;
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(stop, SampleStop::ReadError("connection reset".into()));
    }

    #[tokio::test]
    async fn test_read_capped_times_out_on_stalled_body() {
        let stream = futures::stream::iter(chunks(&[512]))
            .chain(futures::stream::pending::<std::result::Result<Vec<u8>, String>>());
        let deadline = tokio::time::Instant::now() + Duration::from_millis(50);
        let (bytes, stop) = read_capped(stream, SAMPLE_BUFFER_SIZE, deadline).await;
        assert_eq!(bytes.len(), 512);
        assert_eq!(stop, SampleStop::ReadTimeout);
    }
}
