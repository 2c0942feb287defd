use std::time::Duration;

use mimir::{ConstraintViolation, MimirError, Result};

#[test]
fn test_error_display() {
    let err = MimirError::Decode("unknown framing marker".to_string());
    assert!(err.to_string().contains("unknown framing marker"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(MimirError::StoreUnavailable("down".into()))
    }
    assert!(returns_error().is_err());
}

#[test]
fn test_validation_display_lists_all() {
    let err = MimirError::Validation(vec![
        ConstraintViolation::new("compression_level", 0, "must be between 1 and 9"),
        ConstraintViolation::new("store_timeout_ms", 0, "must be greater than 0"),
    ]);
    let msg = err.to_string();
    assert!(msg.contains("compression_level = 0 (must be between 1 and 9)"));
    assert!(msg.contains("store_timeout_ms = 0"));
    assert_eq!(err.violations().len(), 2);
}

// ============================================================================
// Store error classification
// ============================================================================

#[test]
fn store_errors() {
    assert!(MimirError::StoreUnavailable("refused".into()).is_store_error());
    assert!(
        MimirError::StoreOperation {
            operation: "scan",
            message: "READONLY".into()
        }
        .is_store_error()
    );
    assert!(
        MimirError::Timeout {
            operation: "get",
            timeout: Duration::from_millis(20)
        }
        .is_store_error()
    );
}

#[test]
fn non_store_errors() {
    assert!(!MimirError::Decode("bad".into()).is_store_error());
    assert!(!MimirError::Encode("bad".into()).is_store_error());
    assert!(!MimirError::Configuration("bad".into()).is_store_error());
    assert!(!MimirError::Validation(vec![]).is_store_error());
    assert!(MimirError::Decode("bad".into()).violations().is_empty());
}
