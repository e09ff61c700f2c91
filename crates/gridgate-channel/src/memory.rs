//! In-memory channel implementation.
//!
//! A shared bus of entries keyed by root, with per-publisher cursors.
//! Restricted entries are really encrypted under the publisher's side
//! key, so stale-key exclusion is observable in tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use tokio::sync::RwLock;

use gridgate_core::{ChannelRoot, EncryptionNonce, SideKey};

use crate::error::ChannelError;
use crate::events::ChannelEvent;
use crate::traits::{Channel, ChannelEntry, ChannelState, FetchMode, Result};

/// Stored payload of one entry.
#[derive(Debug, Clone)]
enum StoredPayload {
    /// Plaintext CBOR.
    Private(Bytes),
    /// Side-key encrypted CBOR.
    Restricted {
        nonce: EncryptionNonce,
        ciphertext: Bytes,
    },
}

#[derive(Debug, Clone)]
struct StoredEntry {
    next_root: ChannelRoot,
    payload: StoredPayload,
}

/// Shared entry map for all publishers in a test network.
pub struct ChannelBus {
    entries: RwLock<HashMap<ChannelRoot, StoredEntry>>,
}

impl ChannelBus {
    /// Create a new empty bus.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Create a publisher of unencrypted entries (a policy channel).
    pub fn private_publisher(self: &Arc<Self>) -> MemoryChannel {
        MemoryChannel {
            bus: Arc::clone(self),
            state: RwLock::new(PublisherState {
                restricted: false,
                side_key: SideKey::generate(),
                next_root: ChannelRoot::random(),
            }),
        }
    }

    /// Create a publisher of side-key gated entries (a data channel).
    pub fn restricted_publisher(self: &Arc<Self>, side_key: SideKey) -> MemoryChannel {
        MemoryChannel {
            bus: Arc::clone(self),
            state: RwLock::new(PublisherState {
                restricted: true,
                side_key,
                next_root: ChannelRoot::random(),
            }),
        }
    }
}

struct PublisherState {
    restricted: bool,
    side_key: SideKey,
    next_root: ChannelRoot,
}

/// A channel client backed by a [`ChannelBus`].
pub struct MemoryChannel {
    bus: Arc<ChannelBus>,
    state: RwLock<PublisherState>,
}

impl MemoryChannel {
    /// Root the next publication will land on.
    pub async fn next_root(&self) -> ChannelRoot {
        self.state.read().await.next_root
    }

    /// Publish raw payload bytes without encoding.
    ///
    /// Test helper for exercising malformed-entry handling downstream.
    pub async fn publish_raw(&self, bytes: &[u8]) -> Result<ChannelRoot> {
        self.append(StoredPayloadKind::Raw(bytes.to_vec())).await
    }

    async fn append(&self, payload: StoredPayloadKind) -> Result<ChannelRoot> {
        let mut state = self.state.write().await;
        let root = state.next_root;
        let next_root = root.next();

        let stored = match payload {
            StoredPayloadKind::Raw(bytes) => StoredPayload::Private(Bytes::from(bytes)),
            StoredPayloadKind::Event(bytes) if state.restricted => {
                let nonce = EncryptionNonce::generate();
                let cipher = ChaCha20Poly1305::new_from_slice(&state.side_key.encryption_key())
                    .map_err(|e| ChannelError::EncryptionError(e.to_string()))?;
                let ciphertext = cipher
                    .encrypt(Nonce::from_slice(&nonce.0), bytes.as_slice())
                    .map_err(|e| ChannelError::EncryptionError(e.to_string()))?;
                StoredPayload::Restricted {
                    nonce,
                    ciphertext: Bytes::from(ciphertext),
                }
            }
            StoredPayloadKind::Event(bytes) => StoredPayload::Private(Bytes::from(bytes)),
        };

        let mut entries = self.bus.entries.write().await;
        entries.insert(root, StoredEntry { next_root, payload: stored });
        state.next_root = next_root;
        Ok(root)
    }
}

enum StoredPayloadKind {
    Event(Vec<u8>),
    Raw(Vec<u8>),
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn publish(&self, event: &ChannelEvent) -> Result<()> {
        self.append(StoredPayloadKind::Event(event.to_bytes())).await?;
        Ok(())
    }

    async fn fetch_next(&self, root: &ChannelRoot, mode: FetchMode) -> Result<Option<ChannelEntry>> {
        let entries = self.bus.entries.read().await;
        let Some(entry) = entries.get(root) else {
            return Ok(None);
        };

        let bytes = match (&entry.payload, &mode) {
            (StoredPayload::Private(bytes), FetchMode::Private) => bytes.clone(),
            (StoredPayload::Restricted { nonce, ciphertext }, FetchMode::Restricted(key)) => {
                let cipher = ChaCha20Poly1305::new_from_slice(&key.encryption_key())
                    .map_err(|e| ChannelError::DecryptionError(e.to_string()))?;
                let plaintext = cipher
                    .decrypt(Nonce::from_slice(&nonce.0), ciphertext.as_ref())
                    .map_err(|_| ChannelError::DecryptionError("side key rejected".into()))?;
                Bytes::from(plaintext)
            }
            _ => return Err(ChannelError::ModeMismatch),
        };

        Ok(Some(ChannelEntry {
            next_root: entry.next_root,
            bytes,
        }))
    }

    async fn current_state(&self) -> Result<ChannelState> {
        let state = self.state.read().await;
        Ok(ChannelState {
            side_key: state.side_key,
            next_root: state.next_root,
        })
    }

    async fn rotate_side_key(&self, new_key: SideKey) -> Result<()> {
        let mut state = self.state.write().await;
        state.side_key = new_key;
        Ok(())
    }
}
