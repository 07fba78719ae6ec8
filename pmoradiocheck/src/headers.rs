//! Streaming header classification
//!
//! Extracts the ICY / Audiocast headers used by SHOUTcast and Icecast
//! servers, and judges whether a `Content-Type` denotes audio.

use crate::models::{HeaderSnapshot, StreamingHeaders};
use reqwest::header::{HeaderMap, CONTENT_TYPE};

/// Content types accepted as audio, matched as substrings of the
/// case-folded header value (parameters such as `;charset=` are ignored)
pub const AUDIO_CONTENT_TYPES: &[&str] = &[
    // MPEG audio
    "audio/mpeg",
    "audio/mp3",
    "audio/mpeg3",
    "audio/x-mpeg",
    "audio/x-mp3",
    // AAC / MP4 audio
    "audio/aac",
    "audio/aacp",
    "audio/x-aac",
    "audio/mp4",
    "audio/x-m4a",
    // Ogg family
    "audio/ogg",
    "audio/vorbis",
    "application/ogg",
    "audio/opus",
    // Lossless
    "audio/flac",
    "audio/x-flac",
    "audio/wav",
    "audio/x-wav",
    // Others
    "audio/x-ms-wma",
    "audio/webm",
    // Playlists
    "audio/x-mpegurl",
    "audio/mpegurl",
    "application/x-mpegurl",
    "application/vnd.apple.mpegurl",
    "audio/x-scpls",
    "audio/scpls",
];

/// Playlist subset of [`AUDIO_CONTENT_TYPES`]
pub const PLAYLIST_CONTENT_TYPES: &[&str] = &[
    "audio/x-mpegurl",
    "audio/mpegurl",
    "application/x-mpegurl",
    "application/vnd.apple.mpegurl",
    "audio/x-scpls",
    "audio/scpls",
];

/// Non `icy-*` headers kept in the snapshot
pub const AUDIOCAST_HEADERS: &[&str] = &[
    "x-audiocast-name",
    "x-audiocast-genre",
    "x-audiocast-bitrate",
];

const ICY_PREFIX: &str = "icy-";

/// Whether `content_type` denotes an audio stream or an audio playlist
pub fn is_audio_content_type(content_type: &str) -> bool {
    let folded = content_type.to_ascii_lowercase();
    AUDIO_CONTENT_TYPES.iter().any(|t| folded.contains(t))
}

/// Whether `content_type` denotes a playlist (m3u, pls, HLS) rather than a stream
pub fn is_playlist_content_type(content_type: &str) -> bool {
    let folded = content_type.to_ascii_lowercase();
    PLAYLIST_CONTENT_TYPES.iter().any(|t| folded.contains(t))
}

fn is_streaming_header(name: &str) -> bool {
    name.starts_with(ICY_PREFIX) || AUDIOCAST_HEADERS.contains(&name)
}

/// Keep only the streaming-protocol headers
///
/// Everything else is dropped so the result stays small and does not echo
/// cookies or server internals back to callers. Values that are not valid
/// visible ASCII are decoded lossily (some servers send Latin-1 names).
pub fn extract_streaming_headers(headers: &HeaderMap) -> StreamingHeaders {
    let mut streaming = StreamingHeaders::new();
    for (name, value) in headers {
        // HeaderName is already lower-case
        let name = name.as_str();
        if !is_streaming_header(name) {
            continue;
        }
        let value = match value.to_str() {
            Ok(v) => v.trim().to_string(),
            Err(_) => String::from_utf8_lossy(value.as_bytes()).trim().to_string(),
        };
        streaming.insert(name, value);
    }
    streaming
}

/// Raw `content-type` value, if present and readable
pub fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Streaming headers plus content type of one response
pub fn snapshot(headers: &HeaderMap) -> HeaderSnapshot {
    HeaderSnapshot {
        streaming: extract_streaming_headers(headers),
        content_type: content_type(headers),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    fn header_map(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_audio_content_types() {
        assert!(is_audio_content_type("audio/mpeg"));
        assert!(is_audio_content_type("Audio/MPEG; charset=binary"));
        assert!(is_audio_content_type("audio/aacp"));
        assert!(is_audio_content_type("application/ogg"));
        assert!(is_audio_content_type("application/vnd.apple.mpegurl"));
        assert!(is_audio_content_type("audio/x-scpls"));

        assert!(!is_audio_content_type("text/html; charset=utf-8"));
        assert!(!is_audio_content_type("application/octet-stream"));
        assert!(!is_audio_content_type("video/mp4"));
        assert!(!is_audio_content_type(""));
    }

    #[test]
    fn test_playlist_content_types() {
        assert!(is_playlist_content_type("audio/x-mpegurl"));
        assert!(is_playlist_content_type("application/vnd.apple.mpegurl"));
        assert!(is_playlist_content_type("audio/x-scpls"));
        assert!(!is_playlist_content_type("audio/mpeg"));
    }

    #[test]
    fn test_extract_keeps_only_streaming_headers() {
        let headers = header_map(&[
            ("icy-name", "Test Radio"),
            ("icy-br", "128"),
            ("icy-genre", "Jazz"),
            ("icy-metaint", "16000"),
            ("icy-pub", "1"),
            ("x-audiocast-name", "Test Radio"),
            ("x-audiocast-location", "Paris"),
            ("set-cookie", "session=secret"),
            ("server", "Icecast 2.4.4"),
            ("content-type", "audio/mpeg"),
        ]);

        let streaming = extract_streaming_headers(&headers);
        assert_eq!(streaming.len(), 6);
        assert_eq!(streaming.get("icy-name"), Some("Test Radio"));
        assert_eq!(streaming.get("icy-pub"), Some("1"));
        assert_eq!(streaming.get("x-audiocast-name"), Some("Test Radio"));
        assert!(!streaming.contains("x-audiocast-location"));
        assert!(!streaming.contains("set-cookie"));
        assert!(!streaming.contains("content-type"));
    }

    #[test]
    fn test_extract_lossy_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("icy-name"),
            HeaderValue::from_bytes(b"Caf\xe9 Radio").unwrap(),
        );
        let streaming = extract_streaming_headers(&headers);
        assert_eq!(streaming.get("icy-name"), Some("Caf\u{fffd} Radio"));
    }

    #[test]
    fn test_snapshot() {
        let snap = snapshot(&header_map(&[("content-type", " audio/aac "), ("icy-br", "64")]));
        assert_eq!(snap.content_type.as_deref(), Some("audio/aac"));
        assert_eq!(snap.streaming.bitrate(), Some("64"));

        let empty = snapshot(&HeaderMap::new());
        assert!(empty.content_type.is_none());
        assert!(empty.streaming.is_empty());
    }
}
