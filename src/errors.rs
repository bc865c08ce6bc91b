//! Error types for Park Fetcher
//!
//! This module defines the error taxonomy of the fetch pipeline. Errors are split
//! by how far they propagate: configuration errors abort a run before any request
//! is made, transport errors are retried, data shape errors fail a single work unit,
//! and persistence errors surface after the run has been aggregated.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Configuration errors (fatal, raised before any fetch is issued)
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Start date after end date
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// No product configurations to fetch
    #[error("Product list is empty. At least one product configuration is required")]
    EmptyProductList,

    /// The configured source cannot fetch this kind of work unit
    #[error("Work unit {unit} is not supported by the {source_name} source")]
    UnsupportedWorkUnit { unit: String, source_name: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<String> },

    /// I/O error while reading or writing configuration
    #[error("Configuration I/O error")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Shorthand for an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Transport errors (retryable)
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Attempt exceeded its deadline
    #[error("Request timed out after {millis} ms")]
    Timeout { millis: u128 },

    /// Server returned a non-success status
    #[error("Server error: HTTP {status}")]
    Status { status: u16 },

    /// Invalid header or URL in the request payload
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Connection-level failure reported by a non-HTTP transport
    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Malformed or unexpected response shape (non-retryable)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataShapeError {
    /// Body is not valid JSON
    #[error("Response body is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    /// Required top-level field is missing
    #[error("Response is missing required field '{field}'")]
    MissingField { field: String },

    /// Field is present but has the wrong JSON type
    #[error("Field '{field}' has unexpected type, expected {expected}")]
    UnexpectedType { field: String, expected: String },
}

/// Output persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// I/O error writing output
    #[error("Output I/O error")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),

    /// CSV serialization error
    #[error("CSV serialization failed")]
    Csv(#[from] csv::Error),

    /// Background writer task failed
    #[error("Output writer task failed: {reason}")]
    Task { reason: String },
}

/// Aggregation lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// Merge or finalize attempted after the aggregate was frozen
    #[error("Aggregate has already been finalized")]
    AlreadyFinalized,
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Data shape error
    #[error(transparent)]
    DataShape(#[from] DataShapeError),

    /// Persistence error
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Aggregation error
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Transport(_))
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config",
            AppError::Transport(_) => "transport",
            AppError::DataShape(_) => "data_shape",
            AppError::Persistence(_) => "persistence",
            AppError::Aggregate(_) => "aggregate",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Transport result type alias
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Normalization result type alias
pub type ShapeResult<T> = std::result::Result<T, DataShapeError>;

/// Persistence result type alias
pub type PersistenceResult<T> = std::result::Result<T, PersistenceError>;
