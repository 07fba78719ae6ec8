//! Audio signature detection on sampled stream bytes
//!
//! The general-purpose `infer` sniffer runs first; when it does not report an
//! `audio/*` type, a small table of frame-sync and container signatures is
//! checked at offset 0. Radio streams are cut at an arbitrary byte, so the
//! fallback only covers the formats whose first bytes are a frame header.

use crate::models::AudioDetectionResult;

/// Signatures checked at offset 0: (prefix, format, mime)
const SIGNATURES: &[(&[u8], &str, &str)] = &[
    (&[0xFF, 0xFB], "mp3", "audio/mpeg"),
    (&[0xFF, 0xF1], "aac", "audio/aac"),
    (&[0xFF, 0xF9], "aac", "audio/aac"),
    (b"OggS", "ogg", "audio/ogg"),
];

/// Classify a byte buffer as audio or not
///
/// Never fails: an empty or unrecognized buffer yields `detected = false`.
pub fn detect_audio(bytes: &[u8]) -> AudioDetectionResult {
    if bytes.is_empty() {
        return AudioDetectionResult::not_detected();
    }

    if let Some(kind) = infer::get(bytes) {
        if kind.mime_type().starts_with("audio/") {
            tracing::trace!(mime = kind.mime_type(), "Audio type sniffed");
            return AudioDetectionResult::detected(kind.extension(), kind.mime_type());
        }
    }

    match_signature(bytes).unwrap_or_default()
}

fn match_signature(bytes: &[u8]) -> Option<AudioDetectionResult> {
    SIGNATURES
        .iter()
        .find(|(prefix, _, _)| bytes.starts_with(prefix))
        .map(|(_, format, mime)| AudioDetectionResult::detected(*format, *mime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer() {
        let result = detect_audio(&[]);
        assert!(!result.detected);
        assert!(result.format.is_none());
        assert!(result.mime.is_none());
    }

    #[test]
    fn test_mp3_frame_sync() {
        let mut frame = vec![0xFF, 0xFB, 0x90, 0x64];
        frame.resize(417, 0);
        let result = detect_audio(&frame);
        assert!(result.detected);
        assert_eq!(result.format.as_deref(), Some("mp3"));
        assert_eq!(result.mime.as_deref(), Some("audio/mpeg"));
    }

    #[test]
    fn test_id3_tagged_mp3() {
        let mut data = b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec();
        data.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
        let result = detect_audio(&data);
        assert!(result.detected);
        assert_eq!(result.format.as_deref(), Some("mp3"));
    }

    #[test]
    fn test_adts_aac() {
        for second in [0xF1u8, 0xF9] {
            let data = [0xFF, second, 0x50, 0x80, 0x02, 0x1F, 0xFC];
            let result = detect_audio(&data);
            assert!(result.detected, "ADTS 0xFF 0x{second:02X}");
            assert_eq!(result.format.as_deref(), Some("aac"));
            assert_eq!(result.mime.as_deref(), Some("audio/aac"));
        }
    }

    #[test]
    fn test_ogg_page() {
        let mut data = b"OggS".to_vec();
        data.extend_from_slice(&[0x00, 0x02]);
        data.resize(64, 0);
        let result = detect_audio(&data);
        assert!(result.detected);
        assert_eq!(result.format.as_deref(), Some("ogg"));
    }

    #[test]
    fn test_signature_table_only_matches_at_start() {
        let data = [0x00, 0xFF, 0xFB, 0x90];
        assert!(!detect_audio(&data).detected);
    }

    #[test]
    fn test_html_is_not_audio() {
        let result = detect_audio(b"<!DOCTYPE html><html><head><title>Radio</title>");
        assert!(!result.detected);
    }

    #[test]
    fn test_non_audio_binary_is_not_audio() {
        // PNG header: sniffed as image/png, no fallback match
        let result = detect_audio(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0]);
        assert!(!result.detected);
    }
}
