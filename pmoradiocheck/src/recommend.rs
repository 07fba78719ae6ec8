//! Operator-facing guidance derived from a validation outcome
//!
//! Pure function of the fields in [`PartialResult`]: no I/O, no clock, so
//! the same outcome always yields the same lines.

use crate::models::{AudioDetectionResult, StreamingHeaders, ValidationChecks, ValidationStatus};

/// Alternative station directory suggested when a stream fails
pub const ALTERNATIVE_DIRECTORY: &str = "radio-browser.info";

/// The subset of a validation outcome the recommendations are built from
#[derive(Debug, Clone, Copy)]
pub struct PartialResult<'a> {
    pub status: ValidationStatus,
    pub http_status: Option<u16>,
    pub validation: ValidationChecks,
    pub streaming_headers: &'a StreamingHeaders,
    pub audio_format: Option<&'a AudioDetectionResult>,
}

/// Build the ordered recommendation lines
pub fn recommend(partial: &PartialResult<'_>) -> Vec<String> {
    match partial.status {
        ValidationStatus::Valid => valid_lines(partial),
        ValidationStatus::Invalid => invalid_lines(partial),
        ValidationStatus::Error => vec![
            "The validation encountered an error before the stream could be checked".to_string(),
            "Check that the URL is correct and reachable, then retry".to_string(),
        ],
    }
}

fn valid_lines(partial: &PartialResult<'_>) -> Vec<String> {
    let mut lines = vec!["Stream is reachable and serves audio".to_string()];

    let headers = partial.streaming_headers;
    if let Some(name) = headers.station_name() {
        lines.push(format!("Station name: {}", name));
    }
    if let Some(bitrate) = headers.bitrate() {
        lines.push(format!("Bitrate: {} kbps", bitrate));
    }
    if let Some(genre) = headers.genre() {
        lines.push(format!("Genre: {}", genre));
    }
    if let Some(format) = partial.audio_format.and_then(|f| f.format.as_deref()) {
        lines.push(format!("Audio format: {}", format.to_uppercase()));
    }

    lines.push("Stream is ready to be added as a radio station".to_string());
    lines
}

fn invalid_lines(partial: &PartialResult<'_>) -> Vec<String> {
    let mut lines = vec!["Stream did not pass validation".to_string()];

    let checks = &partial.validation;
    if partial.http_status == Some(404) {
        lines.push(
            "The stream returned HTTP 404: the station may be offline or the stream has moved; \
             look for an updated URL"
                .to_string(),
        );
    } else if !checks.has_audio_content_type {
        lines.push(
            "The URL does not serve audio: make sure it points to the stream itself, \
             not the station's web page"
                .to_string(),
        );
    } else if !checks.audio_data_detected {
        lines.push(
            "No audio data could be read: the stream may be geo-restricted or require \
             authentication"
                .to_string(),
        );
    }

    lines.push(format!(
        "Try finding the station in an alternative directory such as {}",
        ALTERNATIVE_DIRECTORY
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> StreamingHeaders {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn partial<'a>(
        status: ValidationStatus,
        http_status: Option<u16>,
        validation: ValidationChecks,
        streaming_headers: &'a StreamingHeaders,
        audio_format: Option<&'a AudioDetectionResult>,
    ) -> PartialResult<'a> {
        PartialResult {
            status,
            http_status,
            validation,
            streaming_headers,
            audio_format,
        }
    }

    #[test]
    fn test_valid_with_metadata() {
        let hdrs = headers(&[("icy-name", "Test"), ("icy-br", "128"), ("icy-genre", "Jazz")]);
        let format = AudioDetectionResult::detected("mp3", "audio/mpeg");
        let lines = recommend(&partial(
            ValidationStatus::Valid,
            Some(200),
            ValidationChecks {
                http_accessible: true,
                has_audio_content_type: true,
                has_streaming_headers: true,
                audio_data_detected: true,
            },
            &hdrs,
            Some(&format),
        ));

        assert_eq!(
            lines,
            vec![
                "Stream is reachable and serves audio",
                "Station name: Test",
                "Bitrate: 128 kbps",
                "Genre: Jazz",
                "Audio format: MP3",
                "Stream is ready to be added as a radio station",
            ]
        );
    }

    #[test]
    fn test_valid_without_metadata() {
        let hdrs = StreamingHeaders::new();
        let lines = recommend(&partial(
            ValidationStatus::Valid,
            Some(200),
            ValidationChecks {
                http_accessible: true,
                has_audio_content_type: true,
                ..Default::default()
            },
            &hdrs,
            None,
        ));
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("ready"));
    }

    #[test]
    fn test_invalid_404() {
        let hdrs = StreamingHeaders::new();
        let lines = recommend(&partial(
            ValidationStatus::Invalid,
            Some(404),
            ValidationChecks::default(),
            &hdrs,
            None,
        ));
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("offline"));
        assert!(lines[1].contains("moved"));
        assert!(lines[2].contains(ALTERNATIVE_DIRECTORY));
    }

    #[test]
    fn test_invalid_not_audio() {
        let hdrs = StreamingHeaders::new();
        let lines = recommend(&partial(
            ValidationStatus::Invalid,
            Some(200),
            ValidationChecks {
                http_accessible: true,
                ..Default::default()
            },
            &hdrs,
            None,
        ));
        assert!(lines[1].contains("not the station's web page"));
    }

    #[test]
    fn test_invalid_no_audio_data() {
        let hdrs = StreamingHeaders::new();
        let lines = recommend(&partial(
            ValidationStatus::Invalid,
            Some(403),
            ValidationChecks {
                http_accessible: false,
                has_audio_content_type: true,
                ..Default::default()
            },
            &hdrs,
            None,
        ));
        assert!(lines[1].contains("geo-restricted"));
    }

    #[test]
    fn test_error_lines() {
        let hdrs = StreamingHeaders::new();
        let lines = recommend(&partial(
            ValidationStatus::Error,
            None,
            ValidationChecks::default(),
            &hdrs,
            None,
        ));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("error"));
        assert!(lines[1].contains("retry"));
    }

    #[test]
    fn test_recommendations_are_deterministic() {
        let hdrs = headers(&[("icy-name", "Same"), ("icy-br", "64")]);
        let format = AudioDetectionResult::detected("aac", "audio/aac");
        let input = partial(
            ValidationStatus::Valid,
            Some(206),
            ValidationChecks {
                http_accessible: true,
                audio_data_detected: true,
                ..Default::default()
            },
            &hdrs,
            Some(&format),
        );
        assert_eq!(recommend(&input), recommend(&input));
    }
}
