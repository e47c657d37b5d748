//! Error types for dropfix

use thiserror::Error;

/// Result type alias for dropfix operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dropfix
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Sidecar metadata could not be parsed or is inconsistent
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Field geometry error
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// A frame source could not supply the requested field
    #[error("Source error: {0}")]
    Source(String),

    /// Writing a corrected frame to the output failed
    #[error("Output write failed at frame {frame}: {source}")]
    Write {
        frame: usize,
        #[source]
        source: std::io::Error,
    },

    /// The run was aborted; frames already written stay valid
    #[error("Correction aborted after {frames_written} frames: {reason}")]
    Aborted { frames_written: usize, reason: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl Error {
    /// Create a metadata error
    pub fn metadata<S: Into<String>>(msg: S) -> Self {
        Error::Metadata(msg.into())
    }

    /// Create a geometry error
    pub fn geometry<S: Into<String>>(msg: S) -> Self {
        Error::Geometry(msg.into())
    }

    /// Create a source error
    pub fn source_err<S: Into<String>>(msg: S) -> Self {
        Error::Source(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Error::InvalidState(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Metadata(err.to_string())
    }
}
