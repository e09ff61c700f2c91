//! Ledger message types.
//!
//! One-shot pairing messages exchanged over addressed inboxes. The
//! ledger has no cursor: reading an inbox returns the latest message
//! again and again, so consumers deduplicate by content digest.

use serde::{Deserialize, Serialize};
use std::fmt;

use gridgate_core::{Address, Challenge, ChannelRoot, SealedEnvelope, SignedChallenge};

/// Content digest of a ledger message, used for idempotent-delivery
/// suppression.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageDigest(pub [u8; 32]);

impl fmt::Debug for MessageDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageDigest({})", &hex_prefix(&self.0))
    }
}

fn hex_prefix(bytes: &[u8; 32]) -> String {
    bytes[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Outcome of a pairing claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimStatus {
    /// Challenge validated, device is listening to the claimed root.
    Ok,
    /// Challenge rejected.
    Nok,
}

/// Channel credentials sealed to one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedChannelKeys {
    /// The channel root, sealed to the provider's public key.
    pub root: SealedEnvelope,
    /// The current side key, sealed to the provider's public key.
    pub side_key: SealedEnvelope,
}

/// Messages exchanged over the ledger.
///
/// A closed tagged union: anything the receiving role does not handle is
/// an exhaustive default arm, logged and dropped, never a crash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerMessage {
    /// A party wants to pair with the device.
    ClaimDevice {
        /// Where the device should send its challenge.
        sender: Address,
    },

    /// The device's unsigned challenge, to be signed with the shared
    /// secret and returned.
    Challenge {
        /// The device's inbox address.
        sender: Address,
        /// The challenge salt to sign.
        challenge: Challenge,
    },

    /// The pairer's response: the signed challenge plus the channel
    /// root the device should start consuming.
    AnswerChallenge {
        /// The pairer's inbox address.
        sender: Address,
        /// Root of the pairer's policy channel.
        root: ChannelRoot,
        /// The challenge, signed with the shared secret.
        signed_challenge: SignedChallenge,
    },

    /// The device's verdict on an answered challenge.
    ClaimResult {
        /// Whether pairing succeeded.
        status: ClaimStatus,
        /// Populated on rejection.
        reason: Option<String>,
    },

    /// The device's channel credentials, sealed to an authorized
    /// provider.
    ChannelKeys {
        /// The device's policy-channel cursor at send time.
        root: ChannelRoot,
        /// Sealed root and side key of the device's data channel.
        keys: EncryptedChannelKeys,
    },
}

impl LedgerMessage {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerMessage::ClaimDevice { .. } => "CLAIM_DEVICE",
            LedgerMessage::Challenge { .. } => "CHALLENGE",
            LedgerMessage::AnswerChallenge { .. } => "ANSWER_CHALLENGE",
            LedgerMessage::ClaimResult { .. } => "CLAIM_RESULT",
            LedgerMessage::ChannelKeys { .. } => "CHANNEL_KEYS",
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

    /// Content digest over the canonical CBOR encoding.
    pub fn digest(&self) -> MessageDigest {
        MessageDigest(*blake3::hash(&self.to_bytes()).as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roundtrip() {
        let msg = LedgerMessage::ClaimDevice {
            sender: Address::from_bytes([0x11; 32]),
        };
        let bytes = msg.to_bytes();
        let recovered = LedgerMessage::from_bytes(&bytes).unwrap();
        assert_eq!(msg, recovered);
    }

    #[test]
    fn test_digest_deterministic() {
        let msg = LedgerMessage::ClaimResult {
            status: ClaimStatus::Ok,
            reason: None,
        };
        assert_eq!(msg.digest(), msg.digest());
    }

    #[test]
    fn test_digest_distinguishes_content() {
        let ok = LedgerMessage::ClaimResult {
            status: ClaimStatus::Ok,
            reason: None,
        };
        let nok = LedgerMessage::ClaimResult {
            status: ClaimStatus::Nok,
            reason: Some("signed challenge invalid".into()),
        };
        assert_ne!(ok.digest(), nok.digest());
    }
}
