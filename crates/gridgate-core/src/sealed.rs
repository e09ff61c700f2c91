//! Asymmetric envelopes for handing channel credentials to providers.
//!
//! X25519 key agreement plus ChaCha20-Poly1305. The device only ever
//! seals; opening happens on the service-provider side (and in tests).

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::CoreError;

/// An X25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(pk: PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

/// An X25519 static secret, held by a service provider.
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(StaticSecret::from(bytes))
    }

    /// Create from seed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Derive the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey::from(PublicKey::from(&self.0))
    }
}

impl fmt::Debug for X25519StaticSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519StaticSecret({:?})", self.public_key())
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; 12];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

/// A payload sealed to one recipient's X25519 public key.
///
/// Fresh ephemeral key and nonce per seal, so sealing the same
/// plaintext to two recipients (or twice to the same one) yields
/// distinct ciphertexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEnvelope {
    /// Sender's ephemeral X25519 public key.
    pub ephemeral_public: X25519PublicKey,

    /// Nonce used for the symmetric layer.
    pub nonce: EncryptionNonce,

    /// The encrypted payload.
    pub ciphertext: Vec<u8>,
}

impl SealedEnvelope {
    /// Seal a plaintext to a recipient.
    pub fn seal(plaintext: &[u8], recipient: &X25519PublicKey) -> Result<Self, CoreError> {
        let ephemeral = EphemeralSecret::random_from_rng(rand::thread_rng());
        let ephemeral_public = X25519PublicKey::from(PublicKey::from(&ephemeral));

        let shared = ephemeral.diffie_hellman(&recipient.to_dalek());
        let wrap_key = derive_wrap_key(shared.as_bytes(), &ephemeral_public);

        let nonce = EncryptionNonce::generate();
        let cipher = ChaCha20Poly1305::new_from_slice(&wrap_key)
            .map_err(|e| CoreError::EncryptionError(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

        Ok(Self {
            ephemeral_public,
            nonce,
            ciphertext,
        })
    }

    /// Open the envelope with the recipient's secret key.
    pub fn open(&self, recipient: &X25519StaticSecret) -> Result<Vec<u8>, CoreError> {
        let shared = recipient.0.diffie_hellman(&self.ephemeral_public.to_dalek());
        let wrap_key = derive_wrap_key(shared.as_bytes(), &self.ephemeral_public);

        let cipher = ChaCha20Poly1305::new_from_slice(&wrap_key)
            .map_err(|e| CoreError::DecryptionError(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(&self.nonce.0), self.ciphertext.as_slice())
            .map_err(|e| CoreError::DecryptionError(e.to_string()))
    }
}

/// Derive the symmetric wrap key from the ECDH shared secret.
fn derive_wrap_key(shared: &[u8; 32], ephemeral_public: &X25519PublicKey) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key("gridgate-sealed-v0");
    hasher.update(shared);
    hasher.update(ephemeral_public.as_bytes());
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let recipient = X25519StaticSecret::generate();
        let envelope = SealedEnvelope::seal(b"side key material", &recipient.public_key()).unwrap();
        let opened = envelope.open(&recipient).unwrap();
        assert_eq!(opened, b"side key material");
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let recipient = X25519StaticSecret::generate();
        let stranger = X25519StaticSecret::generate();
        let envelope = SealedEnvelope::seal(b"secret", &recipient.public_key()).unwrap();
        assert!(envelope.open(&stranger).is_err());
    }

    #[test]
    fn test_distinct_ciphertexts_per_seal() {
        let recipient = X25519StaticSecret::generate();
        let e1 = SealedEnvelope::seal(b"same plaintext", &recipient.public_key()).unwrap();
        let e2 = SealedEnvelope::seal(b"same plaintext", &recipient.public_key()).unwrap();
        assert_ne!(e1.ciphertext, e2.ciphertext);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let recipient = X25519StaticSecret::generate();
        let mut envelope = SealedEnvelope::seal(b"secret", &recipient.public_key()).unwrap();
        envelope.ciphertext[0] ^= 0x01;
        assert!(envelope.open(&recipient).is_err());
    }
}
