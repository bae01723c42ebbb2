//! Error types for the storm engine and its sources
use thiserror::Error;

/// Errors raised while setting up analysis, sources or configuration.
///
/// The per-frame path never produces these; it degrades to "no data this
/// frame" instead.
#[derive(Error, Debug)]
pub enum StormError {
    /// Analyser settings the sampler cannot work with
    #[error("Invalid analyser settings: {0}")]
    InvalidAnalyser(String),

    /// Source parameters out of range (frame rate, empty track)
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// Config file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Config could not be serialized
    #[error("Config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV file could not be opened or decoded
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio device could not be opened
    #[error("Audio device error: {0}")]
    Device(String),
}

/// Result type for storm operations
pub type Result<T> = std::result::Result<T, StormError>;
