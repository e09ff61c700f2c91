//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a provider with sealing
//! keys, and a fully wired device rig with an in-memory ledger and
//! channel bus.

use std::sync::Arc;

use gridgate_channel::{Channel, ChannelBus, ChannelEvent, MemoryChannel, Policy, ServiceProvider};
use gridgate_core::{Address, ChannelRoot, Keypair, SharedSecret, SideKey, X25519StaticSecret};
use gridgate_device::{ChannelPoll, DeviceClient, DeviceConfig};
use gridgate_ledger::{ClaimStatus, Ledger, LedgerMessage, MemoryLedger};

/// The pairing secret all fixtures use.
pub const FIXTURE_SECRET: &str = "PEAR";

/// The side key fixture devices start out with.
pub const FIXTURE_SIDE_KEY: &str = "BANANA";

/// A service provider with sealing keys and an inbox address.
pub struct ProviderFixture {
    /// The provider's X25519 secret, for opening sealed credentials.
    pub x25519: X25519StaticSecret,
    /// The provider's ledger inbox address.
    pub address: Address,
}

impl ProviderFixture {
    /// Create a deterministic provider from a one-byte seed.
    pub fn new(seed: u8) -> Self {
        Self {
            x25519: X25519StaticSecret::from_bytes([seed; 32]),
            address: Address::from_bytes([seed; 32]),
        }
    }

    /// Build a policy naming this provider.
    pub fn policy(&self, device: &str, goal: &str) -> Policy {
        Policy {
            service_provider: ServiceProvider {
                address: self.address,
                public_key: self.x25519.public_key(),
            },
            action: "read P1 energy data".into(),
            device: device.into(),
            goal: goal.into(),
            conditions: vec![],
        }
    }

    /// An AUTHORIZED event granting this provider access.
    pub fn authorized(&self, device: &str, goal: &str) -> ChannelEvent {
        ChannelEvent::Authorized {
            timestamp: now_millis(),
            policy: self.policy(device, goal),
        }
    }

    /// An AUTHORIZATION_REVOKED event withdrawing this provider's
    /// access.
    pub fn revoked(&self, device: &str, goal: &str) -> ChannelEvent {
        ChannelEvent::AuthorizationRevoked {
            timestamp: now_millis(),
            policy: self.policy(device, goal),
        }
    }
}

/// A device client wired to an in-memory ledger and channel bus, with a
/// backend counterpart for driving the protocol.
pub struct DeviceRig {
    /// The shared ledger.
    pub ledger: Arc<MemoryLedger>,
    /// The shared channel bus.
    pub bus: Arc<ChannelBus>,
    /// The backend's ledger credential.
    pub backend_keypair: Keypair,
    /// The backend's inbox address.
    pub backend_address: Address,
    /// The backend's policy channel.
    pub policy_channel: MemoryChannel,
    /// The device under test.
    pub device: DeviceClient<Arc<MemoryLedger>, MemoryChannel>,
}

impl DeviceRig {
    /// Wire up a rig with deterministic credentials.
    pub async fn new() -> Self {
        let ledger = MemoryLedger::new();
        let bus = ChannelBus::new();
        let backend_keypair = Keypair::from_seed(&[0xb0; 32]);
        let backend_address = Address::derive(&backend_keypair.public_key(), 0);
        let side_key = SideKey::from_code(FIXTURE_SIDE_KEY).expect("fixture side key");

        let config = DeviceConfig::new([0xd0; 32], FIXTURE_SECRET, side_key);
        let device = DeviceClient::start(config, ledger.clone(), bus.restricted_publisher(side_key))
            .await
            .expect("device startup");

        Self {
            policy_channel: bus.private_publisher(),
            ledger,
            bus,
            backend_keypair,
            backend_address,
            device,
        }
    }

    /// Run the full pairing handshake, returning the policy root the
    /// device is now consuming.
    pub async fn pair(&mut self) -> ChannelRoot {
        self.ledger
            .send(
                &self.backend_keypair,
                &self.device.address(),
                LedgerMessage::ClaimDevice {
                    sender: self.backend_address,
                },
            )
            .await
            .expect("send claim");
        self.device.poll_ledger().await.expect("handle claim");

        let challenge = match self
            .ledger
            .get_last_message(&self.backend_address)
            .await
            .expect("read challenge")
        {
            Some(LedgerMessage::Challenge { challenge, .. }) => challenge,
            other => panic!("expected challenge, got {other:?}"),
        };

        let root = self.policy_channel.next_root().await;
        self.ledger
            .send(
                &self.backend_keypair,
                &self.device.address(),
                LedgerMessage::AnswerChallenge {
                    sender: self.backend_address,
                    root,
                    signed_challenge: challenge.sign(&SharedSecret::new(FIXTURE_SECRET)),
                },
            )
            .await
            .expect("send answer");
        self.device.poll_ledger().await.expect("handle answer");

        match self
            .ledger
            .get_last_message(&self.backend_address)
            .await
            .expect("read claim result")
        {
            Some(LedgerMessage::ClaimResult { status, .. }) => {
                assert_eq!(status, ClaimStatus::Ok, "pairing was refused")
            }
            other => panic!("expected claim result, got {other:?}"),
        }
        root
    }

    /// Publish a policy event and have the device consume it.
    pub async fn process(&mut self, event: &ChannelEvent) -> ChannelPoll {
        self.policy_channel.publish(event).await.expect("publish");
        self.device.poll_channel().await.expect("poll channel")
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rig_pairs() {
        let mut rig = DeviceRig::new().await;
        rig.pair().await;
        assert!(rig.device.is_paired());
    }

    #[tokio::test]
    async fn test_rig_processes_policy_events() {
        let mut rig = DeviceRig::new().await;
        rig.pair().await;

        let provider = ProviderFixture::new(0x11);
        rig.process(&provider.authorized("smart-meter-1", "insight"))
            .await;
        assert!(rig.device.registry().contains(&provider.address));

        rig.process(&provider.revoked("smart-meter-1", "insight"))
            .await;
        assert!(!rig.device.registry().contains(&provider.address));
    }

    #[tokio::test]
    async fn test_providers_have_unique_keys() {
        let a = ProviderFixture::new(1);
        let b = ProviderFixture::new(2);
        assert_ne!(a.x25519.public_key(), b.x25519.public_key());
        assert_ne!(a.address, b.address);
    }
}
