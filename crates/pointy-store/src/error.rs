//! # Store Error Types
//!
//! ## Error Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Error Propagation                           │
//! │                                                                  │
//! │  EngineError (pointy-core)  ──┐                                  │
//! │  serde_json::Error          ──┼──► StoreError ──► caller         │
//! │  std::io::Error             ──┘                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An `Engine` variant means the operation was rejected before anything
//! was written; the other variants mean persistence failed and the
//! optimistic local update was rolled back.

use thiserror::Error;

use pointy_core::EngineError;

/// Persistence layer errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The engine rejected the operation.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A document could not be serialized or deserialized.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing the backing file failed.
    #[error("I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is missing or invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The backend refused or failed an operation.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
