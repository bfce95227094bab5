//! Decoder error types

use thiserror::Error;

/// Errors that can occur while decoding an uploaded track
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Declared MIME type is not WAV or MP3
    #[error("Unsupported MIME type: {0}")]
    UnsupportedMime(String),

    /// Container could not be recognized (corrupt or mislabeled input)
    #[error("Unrecognized or corrupt container: {0}")]
    Probe(String),

    /// Container holds no decodable audio track
    #[error("No audio track found")]
    NoTrack,

    /// Track does not declare a sample rate
    #[error("Unknown sample rate")]
    UnknownSampleRate,

    /// Codec support is missing for this track
    #[error("Codec unavailable: {0}")]
    Codec(String),

    /// Stream decoded to zero samples
    #[error("Decoded stream contains no samples")]
    Empty,
}
