//! Size-adaptive framing for bytes crossing the remote store boundary.
//!
//! Values are serialized to JSON. Payloads larger than the compression
//! threshold are zstd-compressed and framed as `compressed:<bytes>`;
//! everything else is framed as `raw:<bytes>`. Decoding branches on the
//! marker. An unknown or truncated marker, or a payload that fails to
//! decompress or deserialize, is a [`MimirError::Decode`]: corrupt data
//! must stay distinguishable from a cache miss.
//!
//! ```rust
//! # use mimir::codec::Codec;
//! # use serde_json::json;
//! let codec = Codec::new(1024, 6);
//! let encoded = codec.encode(&json!({"label": "pos"})).unwrap();
//! assert!(encoded.bytes.starts_with(b"raw:"));
//! let back: serde_json::Value = codec.decode(&encoded.bytes).unwrap();
//! assert_eq!(back["label"], "pos");
//! ```

use std::time::{Duration, Instant};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{MimirError, Result};

/// Marker for uncompressed payloads.
pub const RAW_MARKER: &[u8] = b"raw:";
/// Marker for zstd-compressed payloads.
pub const COMPRESSED_MARKER: &[u8] = b"compressed:";

/// Default compression threshold in serialized bytes.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1024;
/// Default compression level (mid-range of 1–9).
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 6;

/// Framed bytes plus what happened while producing them.
#[derive(Debug, Clone)]
pub struct Encoded {
    /// Marker-prefixed bytes ready for the store.
    pub bytes: Vec<u8>,
    /// Whether the payload was compressed.
    pub compressed: bool,
    /// Serialized size before compression.
    pub original_size: usize,
    /// Payload size after compression (equal to `original_size` when raw).
    pub compressed_size: usize,
    /// Time spent compressing (zero when raw).
    pub compression_time: Duration,
}

/// Codec with a size threshold and zstd level.
#[derive(Debug, Clone)]
pub struct Codec {
    threshold: usize,
    level: i32,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_THRESHOLD, DEFAULT_COMPRESSION_LEVEL)
    }
}

impl Codec {
    pub fn new(threshold: usize, level: i32) -> Self {
        Self { threshold, level }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// Whether a serialized payload of `len` bytes gets compressed.
    ///
    /// Strictly greater than the threshold: a payload of exactly
    /// `threshold` bytes stays raw.
    pub fn should_compress(&self, len: usize) -> bool {
        len > self.threshold
    }

    /// Serialize without framing.
    pub fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| MimirError::Encode(e.to_string()))
    }

    /// Serialize and frame, choosing raw vs. compressed by size.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Encoded> {
        let payload = self.serialize(value)?;
        let compress = self.should_compress(payload.len());
        self.frame(payload, compress)
    }

    /// Frame an already-serialized payload.
    ///
    /// The caller decides whether to compress so metadata written into the
    /// payload can agree with the framing.
    pub fn frame(&self, payload: Vec<u8>, compress: bool) -> Result<Encoded> {
        let original_size = payload.len();
        if !compress {
            let mut bytes = Vec::with_capacity(RAW_MARKER.len() + payload.len());
            bytes.extend_from_slice(RAW_MARKER);
            bytes.extend_from_slice(&payload);
            return Ok(Encoded {
                bytes,
                compressed: false,
                original_size,
                compressed_size: original_size,
                compression_time: Duration::ZERO,
            });
        }

        let start = Instant::now();
        let compressed = zstd::encode_all(payload.as_slice(), self.level)
            .map_err(|e| MimirError::Encode(format!("compression failed: {e}")))?;
        let compression_time = start.elapsed();

        let mut bytes = Vec::with_capacity(COMPRESSED_MARKER.len() + compressed.len());
        bytes.extend_from_slice(COMPRESSED_MARKER);
        bytes.extend_from_slice(&compressed);
        Ok(Encoded {
            compressed_size: compressed.len(),
            bytes,
            compressed: true,
            original_size,
            compression_time,
        })
    }

    /// Strip the marker and return the serialized payload.
    pub fn unframe(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        if let Some(body) = bytes.strip_prefix(COMPRESSED_MARKER) {
            if body.is_empty() {
                return Err(MimirError::Decode("empty compressed payload".into()));
            }
            zstd::decode_all(body)
                .map_err(|e| MimirError::Decode(format!("decompression failed: {e}")))
        } else if let Some(body) = bytes.strip_prefix(RAW_MARKER) {
            Ok(body.to_vec())
        } else {
            let shown = &bytes[..bytes.len().min(COMPRESSED_MARKER.len())];
            Err(MimirError::Decode(format!(
                "unknown framing marker: {:?}",
                String::from_utf8_lossy(shown)
            )))
        }
    }

    /// Unframe and deserialize.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let payload = self.unframe(bytes)?;
        serde_json::from_slice(&payload)
            .map_err(|e| MimirError::Decode(format!("invalid payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn small_payload_is_raw() {
        let codec = Codec::default();
        let encoded = codec.encode(&json!({"a": 1})).unwrap();
        assert!(!encoded.compressed);
        assert!(encoded.bytes.starts_with(RAW_MARKER));
        assert_eq!(encoded.compression_time, Duration::ZERO);
    }

    #[test]
    fn large_payload_is_compressed() {
        let codec = Codec::new(64, 3);
        let value = json!({"text": "abc".repeat(200)});
        let encoded = codec.encode(&value).unwrap();
        assert!(encoded.compressed);
        assert!(encoded.bytes.starts_with(COMPRESSED_MARKER));
        assert!(encoded.compressed_size < encoded.original_size);
        let back: Value = codec.decode(&encoded.bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn unknown_marker_is_decode_error() {
        let codec = Codec::default();
        let err = codec.decode::<Value>(b"gzip:xyz").unwrap_err();
        assert!(matches!(err, MimirError::Decode(_)));
    }

    #[test]
    fn truncated_marker_is_decode_error() {
        let codec = Codec::default();
        assert!(matches!(
            codec.decode::<Value>(b"compr").unwrap_err(),
            MimirError::Decode(_)
        ));
        assert!(matches!(
            codec.decode::<Value>(b"").unwrap_err(),
            MimirError::Decode(_)
        ));
    }

    #[test]
    fn corrupt_compressed_body_is_decode_error() {
        let codec = Codec::default();
        let err = codec.decode::<Value>(b"compressed:not-zstd").unwrap_err();
        assert!(matches!(err, MimirError::Decode(_)));
    }

    #[test]
    fn truncated_compressed_body_is_decode_error() {
        let codec = Codec::new(16, 3);
        let encoded = codec.encode(&json!("x".repeat(500))).unwrap();
        let cut = &encoded.bytes[..encoded.bytes.len() - 4];
        assert!(matches!(
            codec.decode::<Value>(cut).unwrap_err(),
            MimirError::Decode(_)
        ));
    }
}
