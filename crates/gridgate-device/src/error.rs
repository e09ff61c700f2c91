//! Error types for the device protocol crate.

use thiserror::Error;

/// Errors for device-side protocol operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A ledger operation failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] gridgate_ledger::LedgerError),

    /// A channel operation failed.
    #[error("channel error: {0}")]
    Channel(#[from] gridgate_channel::ChannelError),

    /// A cryptographic primitive failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] gridgate_core::CoreError),

    /// The client could not resolve its own address at startup.
    #[error("startup failed: {0}")]
    Startup(String),
}

/// Result type alias for device protocol operations.
pub type Result<T> = std::result::Result<T, DeviceError>;
