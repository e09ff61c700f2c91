//! # Gridgate Device
//!
//! The device-side trust and authorization protocol for a smart-meter
//! gateway: pairing over the ledger, policy consumption from the
//! authenticated channel, and forward-secret side-key rotation.
//!
//! ## Overview
//!
//! The device owns three pieces of state: the outstanding pairing
//! challenges, the registry of currently authorized providers, and its
//! position on the paired policy channel. A single client task polls
//! the ledger inbox and the policy channel on independent timers and
//! mutates that state in response, so no locking is needed.
//!
//! ## Key Properties
//!
//! - **Single-use pairing**: every issued challenge is invalidated by
//!   its first answer, valid or not
//! - **Forward progress**: the channel cursor advances past malformed
//!   entries and failed handlers
//! - **Forward secrecy on revocation**: the rotated side key is sealed
//!   only to the providers that remain authorized, and the rotation
//!   notice is the last entry readable under the old key

pub mod challenge;
pub mod client;
pub mod config;
pub mod dedup;
pub mod error;
pub mod pairing;
pub mod registry;
pub mod rotation;

pub use challenge::SignedChallengeStore;
pub use client::{
    ChannelPosition, ChannelPoll, DeviceClient, DeviceIdentity, LedgerPoll,
    DSMR50_SAMPLE_INTERVAL, PAIRING_ADDRESS_INDEX,
};
pub use config::{DeviceConfig, MeterVersion};
pub use dedup::{MessageDeduplicator, DEFAULT_DEDUP_CAPACITY};
pub use error::{DeviceError, Result};
pub use pairing::{PairingCoordinator, REASON_INVALID_CHALLENGE};
pub use registry::{AuthorizedProviderRegistry, ProviderAuthorization};
pub use rotation::KeyRotationCoordinator;
