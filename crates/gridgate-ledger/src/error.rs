//! Error types for the ledger module.

use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Transport-level error (node unreachable, send rejected).
    #[error("transport error: {0}")]
    TransportError(String),

    /// Message could not be encoded or decoded.
    #[error("encoding error: {0}")]
    EncodingError(String),

    /// The device's own address could not be resolved.
    #[error("address resolution failed: {0}")]
    AddressResolution(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
