// src/math/error.rs
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoronoiError {
    #[error("Invalid bounds: {message}")]
    InvalidBounds { message: String },

    #[error("Invalid site #{index} at ({x}, {y}): {message}")]
    InvalidSite {
        index: usize,
        x: f64,
        y: f64,
        message: String,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Interner Fehler: deutet auf einen Bug in Event-Reihenfolge oder Clipping hin.
    #[error("Internal invariant violated during '{step}': {message}")]
    InvariantViolation { step: String, message: String },
}

pub type VoronoiResult<T> = Result<T, VoronoiError>;
