//! Error types for the core primitives.

use thiserror::Error;

/// Errors from the cryptographic primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    #[error("invalid side key code of length {0}")]
    InvalidSideKey(usize),

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("decryption error: {0}")]
    DecryptionError(String),
}
