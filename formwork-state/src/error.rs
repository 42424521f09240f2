//! Error types for the form state store

use thiserror::Error;

/// Result type for form state operations
pub type Result<T> = std::result::Result<T, FormStateError>;

/// Errors raised by the store's collaborators.
///
/// Construction and the snapshot accessors never fail; only options loading,
/// binding resolution and listener registration can.
#[derive(Debug, Error)]
pub enum FormStateError {
    /// No template or rewriter registered under this name
    #[error("binding not registered: {name}")]
    UnknownBinding { name: String },

    /// Options document did not describe a key/value mapping
    #[error("invalid options: {message}")]
    InvalidOptions { message: String },

    /// Listener scope owned by the store itself
    #[error("subscription scope is reserved: {scope}")]
    ReservedScope { scope: String },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}
