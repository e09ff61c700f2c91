//! The device side of the pairing handshake.
//!
//! A claimant announces itself over the ledger, receives an unsigned
//! challenge, and must return it signed with the shared secret printed
//! on the device. A valid answer pairs the device to the claimant's
//! policy channel root.

use tracing::{info, warn};

use gridgate_core::{Address, ChannelRoot, SharedSecret, SignedChallenge};
use gridgate_ledger::{ClaimStatus, Ledger, LedgerMessage};

use crate::challenge::SignedChallengeStore;
use crate::client::DeviceIdentity;
use crate::error::Result;

/// Rejection reason sent back on a failed answer.
pub const REASON_INVALID_CHALLENGE: &str = "signed challenge invalid";

/// Drives the device's end of the pairing handshake.
#[derive(Debug)]
pub struct PairingCoordinator {
    secret: SharedSecret,
    challenges: SignedChallengeStore,
}

impl PairingCoordinator {
    /// Creates a coordinator bound to the device's shared secret.
    pub fn new(secret: SharedSecret) -> Self {
        Self {
            secret,
            challenges: SignedChallengeStore::new(),
        }
    }

    /// Handles a claim: issues a challenge, remembers the expected
    /// signature, and sends the unsigned salt to the claimant.
    pub async fn handle_claim<L: Ledger>(
        &mut self,
        ledger: &L,
        identity: &DeviceIdentity,
        claimant: &Address,
    ) -> Result<()> {
        let challenge = self.challenges.issue(&self.secret);
        self.challenges.record(*claimant, challenge.sign(&self.secret));
        info!(claimant = %claimant, "issuing pairing challenge");

        let message = LedgerMessage::Challenge {
            sender: identity.address,
            challenge,
        };
        ledger.send(&identity.keypair, claimant, message).await?;
        Ok(())
    }

    /// Handles an answered challenge.
    ///
    /// The outstanding challenge is invalidated whether the answer
    /// matched or not, so neither a failed attempt nor a successful one
    /// can be replayed. Returns the claimed channel root on success.
    pub async fn handle_answer<L: Ledger>(
        &mut self,
        ledger: &L,
        identity: &DeviceIdentity,
        claimant: &Address,
        root: ChannelRoot,
        signed: SignedChallenge,
    ) -> Result<Option<ChannelRoot>> {
        let valid = self.challenges.accept(claimant, &signed);
        self.challenges.consume(claimant);

        let (message, outcome) = if valid {
            info!(claimant = %claimant, %root, "pairing accepted");
            (
                LedgerMessage::ClaimResult {
                    status: ClaimStatus::Ok,
                    reason: None,
                },
                Some(root),
            )
        } else {
            warn!(claimant = %claimant, "pairing rejected: {}", REASON_INVALID_CHALLENGE);
            (
                LedgerMessage::ClaimResult {
                    status: ClaimStatus::Nok,
                    reason: Some(REASON_INVALID_CHALLENGE.into()),
                },
                None,
            )
        };
        ledger.send(&identity.keypair, claimant, message).await?;
        Ok(outcome)
    }

    /// Number of challenges awaiting an answer.
    pub fn outstanding(&self) -> usize {
        self.challenges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridgate_core::{Challenge, Keypair};
    use gridgate_ledger::MemoryLedger;
    use std::sync::Arc;

    fn identity(seed: u8) -> DeviceIdentity {
        let keypair = Keypair::from_seed(&[seed; 32]);
        let address = Address::derive(&keypair.public_key(), 0);
        DeviceIdentity { keypair, address }
    }

    async fn issued_challenge(
        ledger: &Arc<MemoryLedger>,
        coordinator: &mut PairingCoordinator,
        device: &DeviceIdentity,
        claimant: &Address,
    ) -> Challenge {
        coordinator
            .handle_claim(ledger, device, claimant)
            .await
            .unwrap();
        match ledger.get_last_message(claimant).await.unwrap() {
            Some(LedgerMessage::Challenge { challenge, .. }) => challenge,
            other => panic!("expected challenge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn valid_answer_pairs() {
        let ledger = MemoryLedger::new();
        let device = identity(1);
        let claimant = Address::from_bytes([0xaa; 32]);
        let secret = SharedSecret::new("PEAR");
        let mut coordinator = PairingCoordinator::new(secret.clone());

        let challenge = issued_challenge(&ledger, &mut coordinator, &device, &claimant).await;
        let root = ChannelRoot::random();
        let outcome = coordinator
            .handle_answer(&ledger, &device, &claimant, root, challenge.sign(&secret))
            .await
            .unwrap();
        assert_eq!(outcome, Some(root));

        match ledger.get_last_message(&claimant).await.unwrap() {
            Some(LedgerMessage::ClaimResult { status, reason }) => {
                assert_eq!(status, ClaimStatus::Ok);
                assert_eq!(reason, None);
            }
            other => panic!("expected claim result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let ledger = MemoryLedger::new();
        let device = identity(1);
        let claimant = Address::from_bytes([0xaa; 32]);
        let mut coordinator = PairingCoordinator::new(SharedSecret::new("PEAR"));

        let challenge = issued_challenge(&ledger, &mut coordinator, &device, &claimant).await;
        let outcome = coordinator
            .handle_answer(
                &ledger,
                &device,
                &claimant,
                ChannelRoot::random(),
                challenge.sign(&SharedSecret::new("APPLE")),
            )
            .await
            .unwrap();
        assert_eq!(outcome, None);

        match ledger.get_last_message(&claimant).await.unwrap() {
            Some(LedgerMessage::ClaimResult { status, reason }) => {
                assert_eq!(status, ClaimStatus::Nok);
                assert_eq!(reason.as_deref(), Some(REASON_INVALID_CHALLENGE));
            }
            other => panic!("expected claim result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn replayed_answer_is_rejected() {
        let ledger = MemoryLedger::new();
        let device = identity(1);
        let claimant = Address::from_bytes([0xaa; 32]);
        let secret = SharedSecret::new("PEAR");
        let mut coordinator = PairingCoordinator::new(secret.clone());

        let challenge = issued_challenge(&ledger, &mut coordinator, &device, &claimant).await;
        let signed = challenge.sign(&secret);

        let first = coordinator
            .handle_answer(&ledger, &device, &claimant, ChannelRoot::random(), signed)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = coordinator
            .handle_answer(&ledger, &device, &claimant, ChannelRoot::random(), signed)
            .await
            .unwrap();
        assert_eq!(second, None);
    }

    #[tokio::test]
    async fn failed_answer_burns_the_challenge() {
        let ledger = MemoryLedger::new();
        let device = identity(1);
        let claimant = Address::from_bytes([0xaa; 32]);
        let secret = SharedSecret::new("PEAR");
        let mut coordinator = PairingCoordinator::new(secret.clone());

        let challenge = issued_challenge(&ledger, &mut coordinator, &device, &claimant).await;
        let wrong = challenge.sign(&SharedSecret::new("APPLE"));
        coordinator
            .handle_answer(&ledger, &device, &claimant, ChannelRoot::random(), wrong)
            .await
            .unwrap();
        assert_eq!(coordinator.outstanding(), 0);

        // The correct signature no longer pairs either; the claimant
        // must start over with a fresh claim.
        let late = coordinator
            .handle_answer(
                &ledger,
                &device,
                &claimant,
                ChannelRoot::random(),
                challenge.sign(&secret),
            )
            .await
            .unwrap();
        assert_eq!(late, None);
    }

    #[tokio::test]
    async fn concurrent_claims_get_distinct_challenges() {
        let ledger = MemoryLedger::new();
        let device = identity(1);
        let a = Address::from_bytes([0xaa; 32]);
        let b = Address::from_bytes([0xbb; 32]);
        let secret = SharedSecret::new("PEAR");
        let mut coordinator = PairingCoordinator::new(secret.clone());

        let ca = issued_challenge(&ledger, &mut coordinator, &device, &a).await;
        let cb = issued_challenge(&ledger, &mut coordinator, &device, &b).await;
        assert_ne!(ca, cb);
        assert_eq!(coordinator.outstanding(), 2);

        coordinator
            .handle_answer(&ledger, &device, &a, ChannelRoot::random(), ca.sign(&secret))
            .await
            .unwrap();
        assert_eq!(coordinator.outstanding(), 1);
        let paired = coordinator
            .handle_answer(&ledger, &device, &b, ChannelRoot::random(), cb.sign(&secret))
            .await
            .unwrap();
        assert!(paired.is_some());
    }
}
