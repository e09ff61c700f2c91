//! Outstanding pairing challenges.
//!
//! When the device issues a challenge it signs the salt itself with the
//! pre-provisioned shared secret and remembers the expected signature,
//! keyed by the claimant it was issued to. An answer is valid only if
//! it matches the remembered signature, and answering consumes the
//! challenge whether it matched or not, so a challenge can never be
//! retried or replayed.

use std::collections::HashMap;

use gridgate_core::{Address, Challenge, SharedSecret, SignedChallenge};

/// Expected signatures for challenges the device has issued and not yet
/// seen answered, one outstanding challenge per claimant.
#[derive(Debug, Default)]
pub struct SignedChallengeStore {
    outstanding: HashMap<Address, SignedChallenge>,
}

impl SignedChallengeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh challenge sized against the shared secret.
    ///
    /// The caller must [`record`](Self::record) the expected signature
    /// before sending the challenge out.
    pub fn issue(&self, secret: &SharedSecret) -> Challenge {
        Challenge::issue(secret.len())
    }

    /// Remembers the expected signature for a challenge issued to
    /// `claimant`. A re-claim replaces any earlier outstanding
    /// challenge for the same claimant.
    pub fn record(&mut self, claimant: Address, expected: SignedChallenge) {
        self.outstanding.insert(claimant, expected);
    }

    /// Returns true if `signed` matches the challenge outstanding for
    /// `claimant`.
    pub fn accept(&self, claimant: &Address, signed: &SignedChallenge) -> bool {
        self.outstanding.get(claimant) == Some(signed)
    }

    /// Invalidates the claimant's outstanding challenge; a no-op when
    /// none is outstanding. Called once per answer, valid or not.
    pub fn consume(&mut self, claimant: &Address) -> Option<SignedChallenge> {
        self.outstanding.remove(claimant)
    }

    /// Number of outstanding challenges.
    pub fn len(&self) -> usize {
        self.outstanding.len()
    }

    /// Returns true when no challenges are outstanding.
    pub fn is_empty(&self) -> bool {
        self.outstanding.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SharedSecret {
        SharedSecret::new("PEAR")
    }

    fn claimant(n: u8) -> Address {
        Address::from_bytes([n; 32])
    }

    #[test]
    fn recorded_signature_is_accepted() {
        let mut store = SignedChallengeStore::new();
        let expected = store.issue(&secret()).sign(&secret());
        store.record(claimant(1), expected);
        assert!(store.accept(&claimant(1), &expected));
    }

    #[test]
    fn unknown_claimant_is_rejected() {
        let store = SignedChallengeStore::new();
        let signed = Challenge::issue(4).sign(&secret());
        assert!(!store.accept(&claimant(1), &signed));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let mut store = SignedChallengeStore::new();
        let challenge = store.issue(&secret());
        store.record(claimant(1), challenge.sign(&secret()));
        assert!(!store.accept(&claimant(1), &challenge.sign(&SharedSecret::new("APPLE"))));
    }

    #[test]
    fn consume_is_single_use() {
        let mut store = SignedChallengeStore::new();
        let expected = store.issue(&secret()).sign(&secret());
        store.record(claimant(1), expected);
        assert!(store.consume(&claimant(1)).is_some());
        assert!(!store.accept(&claimant(1), &expected));
        assert!(store.consume(&claimant(1)).is_none());
    }

    #[test]
    fn reclaim_replaces_outstanding_challenge() {
        let mut store = SignedChallengeStore::new();
        let first = store.issue(&secret()).sign(&secret());
        let second = store.issue(&secret()).sign(&secret());
        store.record(claimant(1), first);
        store.record(claimant(1), second);
        assert_eq!(store.len(), 1);
        assert!(!store.accept(&claimant(1), &first));
        assert!(store.accept(&claimant(1), &second));
    }

    #[test]
    fn claimants_are_independent() {
        let mut store = SignedChallengeStore::new();
        let a = store.issue(&secret()).sign(&secret());
        let b = store.issue(&secret()).sign(&secret());
        store.record(claimant(1), a);
        store.record(claimant(2), b);
        store.consume(&claimant(1));
        assert!(store.accept(&claimant(2), &b));
    }
}
