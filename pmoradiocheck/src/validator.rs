//! Stream validation pipeline
//!
//! A validation runs as a linear sequence:
//!
//! 1. Check the request (bad URL or timeout: `status = error`, no I/O)
//! 2. `HEAD` the URL. A failure here is only a warning, some servers
//!    reject `HEAD` but serve `GET`.
//! 3. If the HEAD answer already shows an audio content type or streaming
//!    headers, skip sampling ("smart skip") unless `always_sample` is set.
//! 4. Otherwise sample the first bytes with a ranged `GET` and sniff them.
//!    When HEAD produced no response and sampling fails too, the result is
//!    a hard error.
//! 5. Aggregate the checks into the verdict and attach recommendations.
//!
//! Each call owns its context and buffers; nothing is shared between calls.

use crate::detect::detect_audio;
use crate::error::{Error, ProbeError, Result};
use crate::headers::{is_audio_content_type, is_playlist_content_type, snapshot};
use crate::models::{
    AudioDetectionResult, StreamingHeaders, ValidationChecks, ValidationContext,
    ValidationRequest, ValidationResult, ValidationStatus,
};
use crate::probe::{HttpProbe, ProbeBuilder, ProbeResponse, StreamProbe, SAMPLE_BUFFER_SIZE};
use crate::recommend::{recommend, PartialResult};
use std::time::{Duration, Instant};

/// Validate one stream with a default [`StreamValidator`]
///
/// Convenience entry point for callers that do not keep a validator around.
/// Never fails: setup and input problems come back as `status = error`.
pub async fn validate_radio_stream(request: ValidationRequest) -> ValidationResult {
    let start = Instant::now();
    match StreamValidator::new() {
        Ok(validator) => validator.validate(request).await,
        Err(e) => error_result(request.url, e.to_string(), start),
    }
}

/// Runs the validation pipeline over a [`StreamProbe`]
#[derive(Debug, Clone)]
pub struct StreamValidator<P = HttpProbe> {
    probe: P,
    always_sample: bool,
}

impl StreamValidator<HttpProbe> {
    /// Create a validator over a default [`HttpProbe`]
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for configuring the validator
    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::default()
    }
}

impl<P: StreamProbe> StreamValidator<P> {
    /// Create a validator over a custom probe
    pub fn with_probe(probe: P) -> Self {
        Self {
            probe,
            always_sample: false,
        }
    }

    /// Always sample bytes, even when headers already look like audio
    pub fn always_sample(mut self, always: bool) -> Self {
        self.always_sample = always;
        self
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Validate `url` with the default timeout and redirect policy
    pub async fn validate_url(&self, url: &str) -> ValidationResult {
        self.validate(ValidationRequest::new(url)).await
    }

    /// Validate one stream
    pub async fn validate(&self, request: ValidationRequest) -> ValidationResult {
        let start = Instant::now();
        let url = request.url.clone();

        let ctx = match request.into_context(start) {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Rejected validation request");
                return error_result(url, invalid_parameters(&e), start);
            }
        };

        tracing::debug!(
            url = %ctx.url,
            timeout_ms = ctx.timeout_ms,
            follow_redirects = ctx.follow_redirects,
            "Validating stream"
        );

        let mut findings = Findings::new(url);

        let head = match self.probe.head(&ctx).await {
            Ok(response) => {
                findings.record_head(&ctx, &response);
                Some(response)
            }
            Err(e) => {
                tracing::warn!(url = %ctx.url, error = %e, "HEAD probe failed");
                findings.warnings.push(e.to_string());
                None
            }
        };

        if self.can_skip_sample(head.as_ref(), &findings) {
            tracing::debug!(
                url = %ctx.url,
                content_type = ?findings.content_type,
                streaming_headers = findings.streaming.len(),
                "Headers confirm audio, skipping sample"
            );
            findings.inferred_audio = true;
        } else {
            self.run_sample(&ctx, head.as_ref(), &mut findings).await;
        }

        let result = findings.finish(&ctx);
        tracing::info!(
            url = %result.url,
            status = %result.status,
            elapsed_ms = result.test_duration,
            "Stream validation finished"
        );
        result
    }

    fn can_skip_sample(&self, head: Option<&ProbeResponse>, findings: &Findings) -> bool {
        if self.always_sample {
            return false;
        }
        match head {
            Some(response) if response.is_success() => {
                findings.has_audio_content_type() || !findings.streaming.is_empty()
            }
            _ => false,
        }
    }

    async fn run_sample(
        &self,
        ctx: &ValidationContext,
        head: Option<&ProbeResponse>,
        findings: &mut Findings,
    ) {
        let head_ok = head.is_some_and(ProbeResponse::is_success);

        match self.probe.sample(ctx, ctx.remaining()).await {
            Ok(sample) => {
                findings.sample_ok = true;
                findings.merge_sample_headers(&sample.response, head_ok);
                if head.is_none() && sample.response.final_url != ctx.url {
                    findings.final_url = Some(sample.response.final_url.to_string());
                }

                let bytes = &sample.bytes[..sample.bytes.len().min(SAMPLE_BUFFER_SIZE)];
                if bytes.is_empty() {
                    findings
                        .warnings
                        .push(format!("Stream sample returned no data ({})", sample.stop));
                }

                let detection = detect_audio(bytes);
                if !detection.detected && !bytes.is_empty() {
                    findings.unrecognized_bytes = Some(bytes.len());
                }
                findings.audio_format = Some(detection);
            }
            Err(e) => {
                tracing::warn!(url = %ctx.url, error = %e, "Stream sample failed");
                if let ProbeError::Status { status, .. } = &e {
                    if !head_ok {
                        findings.http_status = Some(*status);
                    }
                }
                if head.is_none() {
                    findings.hard_error = true;
                    findings.errors.push(e.to_string());
                } else {
                    findings.warnings.push(e.to_string());
                }
            }
        }
    }
}

/// Builder for a [`StreamValidator`] over an [`HttpProbe`]
#[derive(Debug, Default)]
pub struct ValidatorBuilder {
    probe: ProbeBuilder,
    always_sample: bool,
}

impl ValidatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the transport configuration as a whole
    pub fn probe(mut self, probe: ProbeBuilder) -> Self {
        self.probe = probe;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.probe = self.probe.user_agent(user_agent);
        self
    }

    /// Set a proxy URL
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.probe = self.probe.proxy(proxy);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.probe = self.probe.connect_timeout(timeout);
        self
    }

    /// Always sample bytes, even when headers already look like audio
    pub fn always_sample(mut self, always: bool) -> Self {
        self.always_sample = always;
        self
    }

    /// Build the validator
    pub fn build(self) -> Result<StreamValidator<HttpProbe>> {
        Ok(StreamValidator::with_probe(self.probe.build()?).always_sample(self.always_sample))
    }
}

fn invalid_parameters(err: &Error) -> String {
    format!("Invalid parameters: {}", err)
}

/// Result for a call that never reached the network
fn error_result(url: String, message: String, start: Instant) -> ValidationResult {
    let streaming_headers = StreamingHeaders::new();
    let validation = ValidationChecks::default();
    let recommendations = recommend(&PartialResult {
        status: ValidationStatus::Error,
        http_status: None,
        validation,
        streaming_headers: &streaming_headers,
        audio_format: None,
    });

    ValidationResult {
        success: false,
        url,
        final_url: None,
        status: ValidationStatus::Error,
        http_status: None,
        content_type: None,
        streaming_headers,
        audio_format: None,
        validation,
        errors: vec![message],
        warnings: Vec::new(),
        recommendations,
        test_duration: start.elapsed().as_millis() as u64,
    }
}

/// Evidence gathered while a validation runs
#[derive(Debug)]
struct Findings {
    url: String,
    final_url: Option<String>,
    http_status: Option<u16>,
    content_type: Option<String>,
    streaming: StreamingHeaders,
    audio_format: Option<AudioDetectionResult>,
    /// Length of a non-empty sample with no known signature
    unrecognized_bytes: Option<usize>,
    head_ok: bool,
    sample_ok: bool,
    inferred_audio: bool,
    hard_error: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Findings {
    fn new(url: String) -> Self {
        Self {
            url,
            final_url: None,
            http_status: None,
            content_type: None,
            streaming: StreamingHeaders::new(),
            audio_format: None,
            unrecognized_bytes: None,
            head_ok: false,
            sample_ok: false,
            inferred_audio: false,
            hard_error: false,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn has_audio_content_type(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(is_audio_content_type)
    }

    fn record_head(&mut self, ctx: &ValidationContext, response: &ProbeResponse) {
        self.http_status = Some(response.status);
        self.head_ok = response.is_success();

        if response.final_url != ctx.url {
            self.final_url = Some(response.final_url.to_string());
        }

        let snap = snapshot(&response.headers);
        self.content_type = snap.content_type;
        self.streaming = snap.streaming;

        if response.is_redirect() && !ctx.follow_redirects {
            let target = response.location().unwrap_or("an unknown location");
            self.warnings.push(format!(
                "Redirect (HTTP {}) to {} was not followed",
                response.status, target
            ));
        } else if !self.head_ok {
            self.warnings
                .push(format!("HEAD request returned HTTP {}", response.status));
        }
    }

    /// Complement the HEAD evidence with the sample response headers
    fn merge_sample_headers(&mut self, response: &ProbeResponse, head_ok: bool) {
        let snap = snapshot(&response.headers);
        self.streaming.merge_missing(&snap.streaming);

        if let Some(sample_type) = snap.content_type {
            if !self.has_audio_content_type()
                && (self.content_type.is_none() || is_audio_content_type(&sample_type))
            {
                self.content_type = Some(sample_type);
            }
        }

        if !head_ok {
            self.http_status = Some(response.status);
        }
    }

    fn finish(mut self, ctx: &ValidationContext) -> ValidationResult {
        let detected = self
            .audio_format
            .as_ref()
            .is_some_and(|f| f.detected);

        let validation = ValidationChecks {
            http_accessible: self.head_ok || self.sample_ok,
            has_audio_content_type: self.has_audio_content_type(),
            has_streaming_headers: !self.streaming.is_empty(),
            audio_data_detected: detected || self.inferred_audio,
        };
        let success = validation.is_playable();

        if let Some(content_type) = self.content_type.as_deref() {
            if is_playlist_content_type(content_type) {
                self.warnings.push(format!(
                    "Content-Type {} is a playlist; players must resolve it to the actual stream",
                    content_type
                ));
            }
        }

        // Only an error when nothing else vouches for the stream
        if let Some(len) = self.unrecognized_bytes {
            let message = format!(
                "No known audio signature found in the first {} bytes of the stream",
                len
            );
            if success {
                self.warnings.push(message);
            } else {
                self.errors.push(message);
            }
        }

        if !success {
            self.explain_failure(&validation);
        }

        let status = if success {
            ValidationStatus::Valid
        } else if self.hard_error {
            ValidationStatus::Error
        } else {
            ValidationStatus::Invalid
        };

        let recommendations = recommend(&PartialResult {
            status,
            http_status: self.http_status,
            validation,
            streaming_headers: &self.streaming,
            audio_format: self.audio_format.as_ref(),
        });

        ValidationResult {
            success,
            url: self.url,
            final_url: self.final_url,
            status,
            http_status: self.http_status,
            content_type: self.content_type,
            streaming_headers: self.streaming,
            audio_format: self.audio_format,
            validation,
            errors: self.errors,
            warnings: self.warnings,
            recommendations,
            test_duration: ctx.elapsed().as_millis() as u64,
        }
    }

    fn explain_failure(&mut self, validation: &ValidationChecks) {
        if self.hard_error {
            return;
        }
        if let Some(status) = self.http_status.filter(|s| !(200..300).contains(s)) {
            self.errors.push(format!("Stream returned HTTP {}", status));
        }
        if !validation.has_audio_content_type {
            match self.content_type.as_deref() {
                Some(content_type) => self
                    .errors
                    .push(format!("Content-Type {} is not an audio type", content_type)),
                None if validation.http_accessible => self
                    .errors
                    .push("Response did not declare a Content-Type".to_string()),
                None => {}
            }
        }
        if !validation.http_accessible && self.errors.is_empty() {
            self.errors.push("Stream is not accessible".to_string());
        }
    }
}
