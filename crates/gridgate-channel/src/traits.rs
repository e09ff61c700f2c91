//! Channel client abstraction.
//!
//! A channel client publishes on its own restricted channel (gated by a
//! side key) and fetches entries from any channel by root. Fetch returns
//! raw payload bytes so the consumer can decode, log, and still advance
//! its cursor past a malformed entry.

use async_trait::async_trait;
use bytes::Bytes;

use gridgate_core::{ChannelRoot, SideKey};

use crate::error::ChannelError;
use crate::events::ChannelEvent;

/// Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// How to read an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
    /// Unencrypted entries (policy channels).
    Private,
    /// Side-key gated entries; fails on a stale key.
    Restricted(SideKey),
}

/// One fetched entry: the payload and the cursor after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    /// Root of the entry following this one.
    pub next_root: ChannelRoot,
    /// Decrypted (or plain) payload bytes; CBOR of a [`ChannelEvent`].
    pub bytes: Bytes,
}

/// The publisher's current position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    /// Side key gating publications at this epoch.
    pub side_key: SideKey,
    /// Root the next publication will land on.
    pub next_root: ChannelRoot,
}

/// The channel collaborator contract.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Channel: Send + Sync {
    /// Publish an event on this client's own channel, gated by the
    /// current side key.
    async fn publish(&self, event: &ChannelEvent) -> Result<()>;

    /// Fetch the entry at `root`, if one has been published.
    async fn fetch_next(&self, root: &ChannelRoot, mode: FetchMode) -> Result<Option<ChannelEntry>>;

    /// The publisher's current side key and next root.
    async fn current_state(&self) -> Result<ChannelState>;

    /// Switch publications to a new side key.
    ///
    /// Entries already published stay gated by the key they were
    /// published under.
    async fn rotate_side_key(&self, new_key: SideKey) -> Result<()>;
}
