//! Core error types for ctdp-core.
//!
//! None of these are fatal to the process. Validation errors are surfaced to
//! the caller without mutating any task; storage and configuration errors
//! only concern the files the library reads and writes.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for ctdp-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Task store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Task store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to read or write the store file
    #[error("Failed to access task store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file is not valid JSON or does not match the task schema
    #[error("Failed to parse task store at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Migration failed
    #[error("Task store migration to v{version} failed: {message}")]
    MigrationFailed { version: u32, message: String },

    /// The data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A task or precedent was submitted without a name
    #[error("{what} name is required")]
    EmptyName { what: &'static str },

    /// The precedent currently excuses a pause and cannot be removed
    #[error("Precedent '{name}' is excusing the current pause; resume first")]
    PrecedentInUse { name: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
