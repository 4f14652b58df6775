//! Error types for the FlightPath kernel.
//!
//! The math in this crate never fails: degenerate vectors fall back to a
//! substitute axis and out-of-range parameters are clamped. Only the
//! file-facing parts (configuration, replay tables) and body lookups
//! return these errors.

use crate::body::BodyId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by configuration loading, replay tables and scene lookups.
#[derive(Debug, Error)]
pub enum FlightPathError {
    /// File could not be opened, read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON configuration could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Replay table contained no usable rows
    #[error("No valid trajectory samples in {path}")]
    EmptyTable { path: PathBuf },

    /// Configuration values out of their allowed range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Body handle does not belong to this scene
    #[error("Unknown body: {0}")]
    UnknownBody(BodyId),
}

impl FlightPathError {
    /// Creates an I/O error tagged with the offending path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, FlightPathError>;
