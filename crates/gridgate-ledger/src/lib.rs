//! # Gridgate Ledger
//!
//! The ledger collaborator contract: one-shot pairing messages over
//! addressed inboxes.
//!
//! ## Overview
//!
//! The ledger is an append-only, address-addressed broadcast medium.
//! Pairing messages (claim, challenge, answer, result) and sealed
//! channel-key deliveries travel over it. It has no read cursor, so
//! consumers suppress duplicates by content digest.
//!
//! ## Message Flow
//!
//! ```text
//! Pairer                              Device
//!   |-------- ClaimDevice ------------>|
//!   |<------- Challenge ---------------|
//!   |-------- AnswerChallenge -------->|
//!   |<------- ClaimResult -------------|
//!   |<------- ChannelKeys -------------|   (after AUTHORIZED event)
//! ```

pub mod error;
pub mod messages;
pub mod transport;

pub use error::{LedgerError, Result};
pub use messages::{ClaimStatus, EncryptedChannelKeys, LedgerMessage, MessageDigest};
pub use transport::{memory::MemoryLedger, Ledger};
