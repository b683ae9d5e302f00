//! Error types for SupplyDNA.
//!
//! Every failure of the storage layer surfaces as one of these variants.
//! None of them is retried internally; retry policy belongs to the caller.

use thiserror::Error;

/// Result type alias using `SupplyDnaError`.
pub type Result<T> = std::result::Result<T, SupplyDnaError>;

/// Main error type for all SupplyDNA operations.
#[derive(Debug, Error)]
pub enum SupplyDnaError {
    // ═══════════════════════════════════════════════════════════════════════════
    // INPUT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Caller supplied empty or missing data. No network call was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Component record failed validation.
    #[error("Validation error: {0}")]
    ValidationError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // PUBLISH ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The upload endpoint explicitly declined the document.
    #[error("Upload rejected by {endpoint} (HTTP {status}): {message}")]
    UploadRejected {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// The upload endpoint accepted the request but returned no identifier.
    #[error("Upload to {endpoint} returned no IPFS hash")]
    UploadIncomplete { endpoint: String },

    /// No response was obtained from the remote endpoint.
    #[error("Transport failure talking to {endpoint}: {reason}")]
    TransportFailure { endpoint: String, reason: String },

    // ═══════════════════════════════════════════════════════════════════════════
    // RETRIEVAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Every configured gateway failed to produce the document.
    #[error("All {attempted} IPFS gateways failed for CID '{cid}'")]
    AllGatewaysFailed { cid: String, attempted: usize },

    /// Gateways answered, but with content that does not hash to the CID.
    #[error("Content for CID '{cid}' failed integrity check at {}", gateways.join(", "))]
    IntegrityMismatch { cid: String, gateways: Vec<String> },

    // ═══════════════════════════════════════════════════════════════════════════
    // PINNING ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The pinning provider refused or failed the pin request.
    #[error("Pinning failed: {0}")]
    PinningFailed(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONTROL & CONFIGURATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// The caller cancelled the operation.
    #[error("{operation} cancelled")]
    Cancelled { operation: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION & STORAGE
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SupplyDnaError {
    /// Returns true if a caller-level retry could reasonably succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SupplyDnaError::TransportFailure { .. } | SupplyDnaError::AllGatewaysFailed { .. }
        )
    }

    /// Returns true if the error was caused by the caller's input.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SupplyDnaError::InvalidInput(_) | SupplyDnaError::ValidationError(_)
        )
    }

    /// Returns true if the error came from the publish path.
    pub fn is_upload_error(&self) -> bool {
        matches!(
            self,
            SupplyDnaError::UploadRejected { .. }
                | SupplyDnaError::UploadIncomplete { .. }
                | SupplyDnaError::PinningFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_upload_rejected_display_carries_message() {
        let err = SupplyDnaError::UploadRejected {
            endpoint: "http://localhost:5001/upload".into(),
            status: 500,
            message: "disk full".into(),
        };
        let text = err.to_string();
        assert!(text.contains("disk full"));
        assert!(text.contains("500"));
    }

    #[test]
    fn test_gateway_errors_display() {
        let err = SupplyDnaError::AllGatewaysFailed {
            cid: "QmTest".into(),
            attempted: 4,
        };
        assert_eq!(err.to_string(), "All 4 IPFS gateways failed for CID 'QmTest'");

        let err = SupplyDnaError::IntegrityMismatch {
            cid: "QmTest".into(),
            gateways: vec!["https://a/ipfs/".into(), "https://b/ipfs/".into()],
        };
        assert!(err.to_string().ends_with("https://a/ipfs/, https://b/ipfs/"));
    }

    #[test_case(SupplyDnaError::TransportFailure { endpoint: "x".into(), reason: "refused".into() }, true ; "transport")]
    #[test_case(SupplyDnaError::AllGatewaysFailed { cid: "x".into(), attempted: 2 }, true ; "exhausted")]
    #[test_case(SupplyDnaError::InvalidInput("empty".into()), false ; "invalid input")]
    #[test_case(SupplyDnaError::UploadIncomplete { endpoint: "x".into() }, false ; "incomplete")]
    #[test_case(SupplyDnaError::Cancelled { operation: "retrieve".into() }, false ; "cancelled")]
    fn test_error_recoverability(err: SupplyDnaError, expected: bool) {
        assert_eq!(err.is_recoverable(), expected);
    }

    #[test]
    fn test_error_classification() {
        assert!(SupplyDnaError::InvalidInput("x".into()).is_input_error());
        assert!(SupplyDnaError::ValidationError("x".into()).is_input_error());
        assert!(!SupplyDnaError::ConfigError("x".into()).is_input_error());

        assert!(SupplyDnaError::PinningFailed("x".into()).is_upload_error());
        assert!(!SupplyDnaError::InvalidInput("x".into()).is_upload_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid");
        let result: Result<serde_json::Value> = json_result.map_err(SupplyDnaError::from);
        assert!(matches!(result, Err(SupplyDnaError::JsonError(_))));
    }
}
