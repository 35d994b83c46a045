//! Error types, grouped by the layer that produces them
//!
//! None of these end a tracking session: callers log them and carry on with
//! the next tick, request or message.

use thiserror::Error;

/// Camera image could not be turned into an encoded frame
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("source image has zero size ({width}x{height})")]
    EmptySource { width: u32, height: u32 },

    #[error("target aspect {0} is not a positive finite ratio")]
    InvalidAspect(f64),

    #[error("buffer holds {actual} bytes, layout needs {expected}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("row stride {bytes_per_row} is shorter than a {width}px row")]
    StrideTooSmall { bytes_per_row: usize, width: u32 },

    #[error("NV12 buffers need even dimensions, got {width}x{height}")]
    OddChromaGeometry { width: u32, height: u32 },

    #[error("jpeg encoding failed: {0}")]
    Codec(#[from] image::ImageError),
}

/// Request to the frame scheme that cannot be answered
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("request names no resource")]
    MissingResource,

    #[error("unsupported resource '{0}'")]
    Unsupported(String),

    #[error("metadata serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Inbound bridge message that is malformed or unknown
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),

    #[error("'{channel}' message is missing required field '{field}'")]
    MissingField {
        channel: &'static str,
        field: &'static str,
    },
}

/// Script evaluation could not be handed to the web runtime
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script evaluation failed: {0}")]
    Eval(String),

    #[error("reply serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Tracking subsystem refused a start/pause request
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("tracking subsystem is unavailable: {0}")]
    Unavailable(String),
}

/// Bridge configuration could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config validation error at '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}
