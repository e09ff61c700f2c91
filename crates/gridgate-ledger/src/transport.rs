//! Ledger transport abstraction.
//!
//! The real deployment talks to a distributed ledger node; tests use the
//! in-memory implementation below.

use async_trait::async_trait;

use gridgate_core::{Address, Keypair};

use crate::error::LedgerError;
use crate::messages::LedgerMessage;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// The ledger collaborator contract.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Send a message to a destination address.
    async fn send(&self, from: &Keypair, to: &Address, message: LedgerMessage) -> Result<()>;

    /// Read the latest message at an address, if any.
    ///
    /// The ledger has no read cursor: repeated calls return the same
    /// message until a newer one arrives. Deduplication is the
    /// consumer's responsibility.
    async fn get_last_message(&self, address: &Address) -> Result<Option<LedgerMessage>>;

    /// Resolve an owned address for the given credential.
    async fn get_address(&self, owner: &Keypair, index: u64) -> Result<Address>;
}

/// A simple in-memory ledger for testing.
///
/// A shared bus of per-address inboxes.
pub mod memory {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory ledger implementation.
    pub struct MemoryLedger {
        inboxes: RwLock<HashMap<Address, Vec<Bytes>>>,
    }

    impl MemoryLedger {
        /// Create a new empty ledger shared between parties.
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                inboxes: RwLock::new(HashMap::new()),
            })
        }

        /// Number of messages ever sent to an address.
        pub async fn inbox_len(&self, address: &Address) -> usize {
            let inboxes = self.inboxes.read().await;
            inboxes.get(address).map(Vec::len).unwrap_or(0)
        }
    }

    #[async_trait]
    impl Ledger for Arc<MemoryLedger> {
        async fn send(&self, _from: &Keypair, to: &Address, message: LedgerMessage) -> Result<()> {
            let bytes = Bytes::from(message.to_bytes());
            let mut inboxes = self.inboxes.write().await;
            inboxes.entry(*to).or_default().push(bytes);
            Ok(())
        }

        async fn get_last_message(&self, address: &Address) -> Result<Option<LedgerMessage>> {
            let inboxes = self.inboxes.read().await;
            match inboxes.get(address).and_then(|inbox| inbox.last()) {
                Some(bytes) => {
                    let message = LedgerMessage::from_bytes(bytes)
                        .map_err(|e| LedgerError::EncodingError(e.to_string()))?;
                    Ok(Some(message))
                }
                None => Ok(None),
            }
        }

        async fn get_address(&self, owner: &Keypair, index: u64) -> Result<Address> {
            Ok(Address::derive(&owner.public_key(), index))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryLedger;
    use super::*;
    use crate::messages::ClaimStatus;

    #[tokio::test]
    async fn test_memory_ledger_send_and_read() {
        let ledger = MemoryLedger::new();
        let sender = Keypair::from_seed(&[0x01; 32]);
        let inbox = Address::from_bytes([0xaa; 32]);

        let msg = LedgerMessage::ClaimDevice {
            sender: Address::from_bytes([0xbb; 32]),
        };
        ledger.send(&sender, &inbox, msg.clone()).await.unwrap();

        let read = ledger.get_last_message(&inbox).await.unwrap();
        assert_eq!(read, Some(msg));
    }

    #[tokio::test]
    async fn test_memory_ledger_no_cursor() {
        let ledger = MemoryLedger::new();
        let sender = Keypair::from_seed(&[0x01; 32]);
        let inbox = Address::from_bytes([0xaa; 32]);

        let msg = LedgerMessage::ClaimResult {
            status: ClaimStatus::Ok,
            reason: None,
        };
        ledger.send(&sender, &inbox, msg.clone()).await.unwrap();

        // Repeated reads return the same message.
        assert_eq!(ledger.get_last_message(&inbox).await.unwrap(), Some(msg.clone()));
        assert_eq!(ledger.get_last_message(&inbox).await.unwrap(), Some(msg));
    }

    #[tokio::test]
    async fn test_memory_ledger_last_wins() {
        let ledger = MemoryLedger::new();
        let sender = Keypair::from_seed(&[0x01; 32]);
        let inbox = Address::from_bytes([0xaa; 32]);

        let first = LedgerMessage::ClaimDevice {
            sender: Address::from_bytes([0x01; 32]),
        };
        let second = LedgerMessage::ClaimDevice {
            sender: Address::from_bytes([0x02; 32]),
        };
        ledger.send(&sender, &inbox, first).await.unwrap();
        ledger.send(&sender, &inbox, second.clone()).await.unwrap();

        assert_eq!(ledger.get_last_message(&inbox).await.unwrap(), Some(second));
        assert_eq!(ledger.inbox_len(&inbox).await, 2);
    }

    #[tokio::test]
    async fn test_memory_ledger_empty_inbox() {
        let ledger = MemoryLedger::new();
        let inbox = Address::from_bytes([0xaa; 32]);
        assert_eq!(ledger.get_last_message(&inbox).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_address_stable() {
        let ledger = MemoryLedger::new();
        let owner = Keypair::from_seed(&[0x07; 32]);
        let a1 = ledger.get_address(&owner, 1).await.unwrap();
        let a2 = ledger.get_address(&owner, 1).await.unwrap();
        assert_eq!(a1, a2);
    }
}
