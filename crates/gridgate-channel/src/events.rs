//! Channel event types.
//!
//! Policy and data events published on the ordered authenticated
//! channel. A closed tagged union: handlers dispatch exhaustively, and
//! payloads that fail to decode are a protocol violation handled by the
//! consumer, never a transport failure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use gridgate_core::{Address, SealedEnvelope, X25519PublicKey};

/// A service provider as named in policy events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProvider {
    /// The provider's ledger inbox address.
    pub address: Address,
    /// The provider's X25519 public key, for sealing channel
    /// credentials to it.
    pub public_key: X25519PublicKey,
}

/// An access policy: which provider may read which device's data, and
/// to what end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// The actor being granted or losing access.
    pub service_provider: ServiceProvider,
    /// What the grant covers.
    pub action: String,
    /// The actee: the device whose data is shared.
    pub device: String,
    /// Stated purpose of the access.
    pub goal: String,
    /// Optional conditions on the grant.
    pub conditions: Vec<String>,
}

/// Events published on the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChannelEvent {
    /// A provider has been granted access.
    Authorized {
        /// When the policy was created (Unix milliseconds).
        timestamp: i64,
        /// The granted policy.
        policy: Policy,
    },

    /// A provider's access has been revoked.
    AuthorizationRevoked {
        /// When the revocation was issued.
        timestamp: i64,
        /// The policy being revoked.
        policy: Policy,
    },

    /// A device joined the household inventory.
    DeviceAdded {
        /// When the device was added.
        timestamp: i64,
        /// The device identifier.
        device: String,
    },

    /// A device left the household inventory.
    DeviceDeleted {
        /// When the device was removed.
        timestamp: i64,
        /// The device identifier.
        device: String,
    },

    /// A raw meter reading.
    Data {
        /// When the reading was taken.
        timestamp: i64,
        /// The raw meter telegram.
        raw: String,
    },

    /// A side-key rotation notice: the new side key, sealed once per
    /// remaining authorized provider, keyed by provider address.
    KeyRotation {
        /// When the rotation happened.
        timestamp: i64,
        /// Sealed new side key per remaining provider.
        keys: BTreeMap<Address, SealedEnvelope>,
    },
}

impl ChannelEvent {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelEvent::Authorized { .. } => "AUTHORIZED",
            ChannelEvent::AuthorizationRevoked { .. } => "AUTHORIZATION_REVOKED",
            ChannelEvent::DeviceAdded { .. } => "DEVICE_ADDED",
            ChannelEvent::DeviceDeleted { .. } => "DEVICE_DELETED",
            ChannelEvent::Data { .. } => "DATA",
            ChannelEvent::KeyRotation { .. } => "KEY_ROTATION",
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ciborium::de::Error<std::io::Error>> {
        ciborium::from_reader(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridgate_core::X25519StaticSecret;

    fn sample_policy() -> Policy {
        let secret = X25519StaticSecret::from_bytes([0x02; 32]);
        Policy {
            service_provider: ServiceProvider {
                address: Address::from_bytes([0x01; 32]),
                public_key: secret.public_key(),
            },
            action: "read P1 energy data".into(),
            device: "smart-meter-1".into(),
            goal: "insight in energy consumption".into(),
            conditions: vec![],
        }
    }

    #[test]
    fn test_event_roundtrip() {
        let event = ChannelEvent::Authorized {
            timestamp: 1_700_000_000_000,
            policy: sample_policy(),
        };
        let bytes = event.to_bytes();
        let recovered = ChannelEvent::from_bytes(&bytes).unwrap();
        assert_eq!(event, recovered);
    }

    #[test]
    fn test_key_rotation_roundtrip() {
        let secret = X25519StaticSecret::from_bytes([0x03; 32]);
        let sealed = SealedEnvelope::seal(b"NEWKEY", &secret.public_key()).unwrap();

        let mut keys = BTreeMap::new();
        keys.insert(Address::from_bytes([0x04; 32]), sealed);

        let event = ChannelEvent::KeyRotation {
            timestamp: 1_700_000_000_000,
            keys,
        };
        let recovered = ChannelEvent::from_bytes(&event.to_bytes()).unwrap();
        assert_eq!(event, recovered);
    }

    #[test]
    fn test_malformed_bytes_rejected() {
        assert!(ChannelEvent::from_bytes(b"not cbor at all").is_err());
    }
}
