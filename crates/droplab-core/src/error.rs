//! Error types for drop generation
//!
//! Every pipeline stage reports failures through [`DropError`]. The pipeline
//! wraps these in a `PipelineError` that also names the failing stage.

use thiserror::Error;

use crate::decoder::DecodeError;

/// Errors that can occur while analyzing a track or generating a drop
#[derive(Error, Debug)]
pub enum DropError {
    /// Input could not be decoded (unsupported or corrupt container)
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Buffer is too short to estimate a tempo reliably
    #[error("Insufficient audio: {duration:.2}s provided, at least {minimum:.2}s required")]
    InsufficientAudio { duration: f64, minimum: f64 },

    /// No usable section boundaries were found
    #[error("Segmentation failed: {0}")]
    Segmentation(String),

    /// Requested style is not in the pattern registry
    #[error("Unknown style: '{0}'")]
    UnknownStyle(String),

    /// Requested groove is not in the pattern registry
    #[error("Unknown groove: '{0}'")]
    UnknownGroove(String),

    /// Selected segment cannot host the requested pattern
    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    /// Sample buffer layout is invalid
    #[error("Invalid sample buffer: {0}")]
    InvalidBuffer(String),

    /// The caller cancelled the request between stages
    #[error("Request cancelled")]
    Cancelled,
}

/// Result type for drop generation
pub type Result<T> = std::result::Result<T, DropError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DropError::InsufficientAudio {
            duration: 1.0,
            minimum: 2.0,
        };
        assert!(err.to_string().contains("1.00s"));
        assert!(err.to_string().contains("2.00s"));

        let err = DropError::UnknownGroove("Unknown".to_string());
        assert_eq!(err.to_string(), "Unknown groove: 'Unknown'");
    }

    #[test]
    fn test_decode_error_converts() {
        let err: DropError = DecodeError::UnsupportedMime("text/plain".into()).into();
        assert!(matches!(err, DropError::Decode(_)));
        assert!(err.to_string().contains("text/plain"));
    }
}
