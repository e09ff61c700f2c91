//! Error types for the channel module.

use thiserror::Error;

/// Errors that can occur during channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Transport-level error (node unreachable, attach rejected).
    #[error("transport error: {0}")]
    TransportError(String),

    /// Payload could not be encrypted.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Payload could not be decrypted (wrong or stale side key).
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// Entry was published in a different mode than requested.
    #[error("fetch mode does not match entry")]
    ModeMismatch,
}

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
