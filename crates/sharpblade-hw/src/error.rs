//! Error types for the SharpBlade hardware library.

use crate::sdk::HResult;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Which part of the SDK a failed call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkErrorKind {
    /// General device call (start, render, gestures).
    Device,
    /// Dynamic key configuration call.
    DynamicKey,
}

impl std::fmt::Display for SdkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SdkErrorKind::Device => write!(f, "device"),
            SdkErrorKind::DynamicKey => write!(f, "dynamic key"),
        }
    }
}

/// Errors that can occur when interacting with the SDK.
#[derive(Error, Debug)]
pub enum Error {
    /// Native SDK call returned a failure code.
    #[error("SwitchBlade {kind} error: {message} ({code})")]
    Sdk {
        kind: SdkErrorKind,
        code: HResult,
        message: String,
    },

    /// The SDK session has been shut down.
    #[error("SwitchBlade SDK session has been shut down")]
    Disposed,

    /// Pixel buffer size does not match its declared or target dimensions.
    #[error("Pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    /// Dynamic key index out of range.
    #[error("Invalid dynamic key (must be 1-10): {0}")]
    InvalidDynamicKey(u8),

    /// Unknown gesture name or value.
    #[error("Invalid gesture: {0}")]
    InvalidGesture(String),

    /// Feature not available on this platform.
    #[error("{0} is only available on Windows")]
    Unsupported(&'static str),

    /// OS graphics call failed during capture.
    #[error("Capture failed: {0}")]
    Capture(String),

    /// No async runtime available to host a background task.
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(String),

    /// Filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Builds an SDK error for a failed device call.
    pub fn device(code: HResult, call: &str) -> Self {
        Error::Sdk {
            kind: SdkErrorKind::Device,
            code,
            message: format!("{} failed: {}", call, code.describe()),
        }
    }

    /// Builds an SDK error for a failed dynamic key call.
    pub fn dynamic_key(code: HResult, call: &str) -> Self {
        Error::Sdk {
            kind: SdkErrorKind::DynamicKey,
            code,
            message: format!("{} failed: {}", call, code.describe()),
        }
    }

    /// Returns the vendor status code if this error came from the SDK.
    pub fn code(&self) -> Option<HResult> {
        match self {
            Error::Sdk { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns true for failures scoped to dynamic key configuration.
    pub fn is_dynamic_key(&self) -> bool {
        matches!(
            self,
            Error::Sdk {
                kind: SdkErrorKind::DynamicKey,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_error_carries_code() {
        let err = Error::dynamic_key(HResult::INVALID_PARAMETER, "RzSBSetImageDynamicKey");
        assert!(err.is_dynamic_key());
        assert_eq!(err.code(), Some(HResult::INVALID_PARAMETER));

        let err = Error::device(HResult::NOT_STARTED, "RzSBRenderBuffer");
        assert!(!err.is_dynamic_key());
        assert!(err.to_string().contains("device"));
    }

    #[test]
    fn test_non_sdk_error_has_no_code() {
        assert_eq!(Error::Disposed.code(), None);
    }
}
