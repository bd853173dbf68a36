//! Byte codec
//!
//! Converts raw uploads into the storage representation of each backend and
//! back into playable bytes:
//! - binary backend: the original bytes kept as an opaque blob with their
//!   MIME type alongside (`VideoPayload::Binary`, encoding is the identity).
//! - text backend: a self-describing `data:<mime>;base64,<bytes>` string.
//!
//! Decoding never touches capacity accounting; record sizes always refer to
//! the original file, not the encoded representation.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;

use crate::error_handling::types::StorageError;
use crate::storage::types::{PlayableHandle, RawFile, VideoPayload};

/// MIME type assumed when a data URL header carries no readable marker.
const FALLBACK_MIME: &str = "video/mp4";

/// Encodes a raw file as a `data:` URL string, the payload form of the
/// text backend.
pub fn encode_data_url(file: &RawFile) -> String {
    format!("data:{};base64,{}", file.mime_type, STANDARD.encode(&file.bytes))
}

/// Reconstructs a playable handle from a stored payload.
///
/// Binary payloads are borrowed as-is. Data URLs are split on the first `,`,
/// the header is checked for the `data:` scheme, and the bytes are
/// re-materialized from base64. Any corruption surfaces as
/// `MalformedPayload` so callers can tell corrupt data from a missing video.
pub fn decode(payload: &VideoPayload) -> Result<PlayableHandle<'_>, StorageError> {
    match payload {
        VideoPayload::Binary { mime_type, bytes } => Ok(PlayableHandle {
            mime_type: mime_type.clone(),
            bytes: Cow::Borrowed(bytes),
        }),
        VideoPayload::DataUrl(url) => {
            let (header, data) = url
                .split_once(',')
                .ok_or_else(|| StorageError::MalformedPayload("missing data separator".into()))?;
            if !header.starts_with("data:") {
                return Err(StorageError::MalformedPayload(
                    "missing data: scheme marker".into(),
                ));
            }
            let mime_type = extract_mime(header);
            let bytes = STANDARD
                .decode(data)
                .map_err(|e| StorageError::MalformedPayload(format!("invalid base64: {}", e)))?;
            Ok(PlayableHandle { mime_type, bytes: Cow::Owned(bytes) })
        }
    }
}

// The original player fell back to video/mp4 when the header had no usable
// marker; kept so payloads written by older builds stay playable.
fn extract_mime(header: &str) -> String {
    let re = Regex::new(r"data:([^;,]+)").unwrap();
    re.captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> RawFile {
        RawFile {
            name: "clip.webm".into(),
            mime_type: "video/webm".into(),
            bytes: vec![0x1a, 0x45, 0xdf, 0xa3, 0x00, 0xff],
        }
    }

    #[test]
    fn test_data_url_roundtrip() {
        let file = sample_file();
        let payload = VideoPayload::DataUrl(encode_data_url(&file));
        let handle = decode(&payload).unwrap();
        assert_eq!(handle.mime_type, "video/webm");
        assert_eq!(handle.bytes.as_ref(), file.bytes.as_slice());
    }

    #[test]
    fn test_binary_decode_borrows() {
        let file = sample_file();
        let payload =
            VideoPayload::Binary { mime_type: file.mime_type.clone(), bytes: file.bytes.clone() };
        let handle = decode(&payload).unwrap();
        assert_eq!(handle.mime_type, "video/webm");
        assert!(matches!(handle.bytes, Cow::Borrowed(_)));
        assert_eq!(handle.bytes.as_ref(), file.bytes.as_slice());
    }

    #[test]
    fn test_missing_separator_is_malformed() {
        let payload = VideoPayload::DataUrl("data:video/mp4;base64".into());
        match decode(&payload) {
            Err(StorageError::MalformedPayload(_)) => {}
            other => panic!("expected MalformedPayload, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_scheme_is_malformed() {
        let payload = VideoPayload::DataUrl("video/mp4;base64,AAAA".into());
        match decode(&payload) {
            Err(StorageError::MalformedPayload(_)) => {}
            other => panic!("expected MalformedPayload, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_base64_is_malformed() {
        let payload = VideoPayload::DataUrl("data:video/mp4;base64,!!notbase64!!".into());
        match decode(&payload) {
            Err(StorageError::MalformedPayload(_)) => {}
            other => panic!("expected MalformedPayload, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_mime_falls_back() {
        let encoded = STANDARD.encode(b"abc");
        let payload = VideoPayload::DataUrl(format!("data:;base64,{}", encoded));
        let handle = decode(&payload).unwrap();
        assert_eq!(handle.mime_type, "video/mp4");
        assert_eq!(handle.bytes.as_ref(), b"abc");
    }
}
