//! # Gridgate Core
//!
//! Pure primitives for the gridgate device protocol: identifiers,
//! credentials, pairing challenges, side keys, and sealed envelopes.
//!
//! This crate contains no I/O. It is pure computation over
//! cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Address`] - A ledger inbox address
//! - [`ChannelRoot`] - The read/write cursor into the broadcast channel
//! - [`SideKey`] - Symmetric key gating restricted channel entries
//! - [`Challenge`] / [`SignedChallenge`] - Single-use pairing proof
//! - [`SealedEnvelope`] - Payload sealed to one recipient's X25519 key

pub mod crypto;
pub mod error;
pub mod sealed;
pub mod types;

pub use crypto::{
    Challenge, Ed25519PublicKey, Ed25519Signature, Keypair, SharedSecret, SideKey,
    SignedChallenge, CHALLENGE_WIDTH, CODE_ALPHABET,
};
pub use error::CoreError;
pub use sealed::{EncryptionNonce, SealedEnvelope, X25519PublicKey, X25519StaticSecret};
pub use types::{Address, ChannelRoot};
