//! Tests for [`Codec`] framing and the compression threshold.

use serde_json::{Value, json};

use mimir::codec::{COMPRESSED_MARKER, RAW_MARKER};
use mimir::{Codec, MimirError, StoredValue};

/// A JSON string whose serialized form is exactly `len` bytes.
fn payload_of_len(len: usize) -> Value {
    Value::String("a".repeat(len - 2))
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn round_trip_raw_and_compressed() {
    let codec = Codec::new(64, 6);
    for value in [
        json!(null),
        json!({"label": "pos", "score": 0.93}),
        json!({"summary": "long text ".repeat(100)}),
        json!([1, 2, 3, {"nested": ["a", "b"]}]),
    ] {
        let encoded = codec.encode(&value).unwrap();
        let decoded: Value = codec.decode(&encoded.bytes).unwrap();
        assert_eq!(decoded, value);
    }
}

#[test]
fn stored_value_round_trips_with_metadata() {
    let codec = Codec::default();
    let value = StoredValue::new(json!({"label": "neg"}), "sentiment", 12);
    let encoded = codec.encode(&value).unwrap();
    let decoded: StoredValue = codec.decode(&encoded.bytes).unwrap();
    assert_eq!(decoded, value);
}

// ============================================================================
// Threshold boundary
// ============================================================================

#[test]
fn one_byte_under_threshold_is_raw() {
    let codec = Codec::new(100, 6);
    let encoded = codec.encode(&payload_of_len(99)).unwrap();
    assert!(encoded.bytes.starts_with(RAW_MARKER));
    assert!(!encoded.compressed);
}

#[test]
fn exactly_threshold_is_raw() {
    let codec = Codec::new(100, 6);
    let encoded = codec.encode(&payload_of_len(100)).unwrap();
    assert!(encoded.bytes.starts_with(RAW_MARKER));
}

#[test]
fn one_byte_over_threshold_is_compressed() {
    let codec = Codec::new(100, 6);
    let encoded = codec.encode(&payload_of_len(101)).unwrap();
    assert!(encoded.bytes.starts_with(COMPRESSED_MARKER));
    assert!(encoded.compressed);
    assert_eq!(encoded.original_size, 101);
    assert_eq!(
        encoded.compressed_size,
        encoded.bytes.len() - COMPRESSED_MARKER.len()
    );
}

#[test]
fn compression_level_changes_output_not_content() {
    let value = json!({"text": "abcabcabc ".repeat(500)});
    let fast = Codec::new(10, 1).encode(&value).unwrap();
    let small = Codec::new(10, 9).encode(&value).unwrap();
    let a: Value = Codec::default().decode(&fast.bytes).unwrap();
    let b: Value = Codec::default().decode(&small.bytes).unwrap();
    assert_eq!(a, b);
}

// ============================================================================
// Corruption
// ============================================================================

#[test]
fn corrupt_inputs_are_decode_errors() {
    let codec = Codec::default();
    for bytes in [
        &b""[..],
        b"ra",
        b"compressed",
        b"compressed:",
        b"compressed:not zstd",
        b"raw:{not json",
        b"gzip:abc",
    ] {
        let err = codec.decode::<Value>(bytes).unwrap_err();
        assert!(
            matches!(err, MimirError::Decode(_)),
            "{:?} gave {err:?}",
            String::from_utf8_lossy(bytes)
        );
    }
}
