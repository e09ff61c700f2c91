//! The device client: one logical actor owning all protocol state.
//!
//! The client polls two collaborators on independent timers: the
//! ledger inbox for pairing traffic and the policy channel for grants,
//! revocations, and inventory changes. All state (registry, challenge
//! store, channel position) is owned by the client and touched only
//! from its own task, so there is no locking.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time;
use tracing::{debug, info, warn};

use gridgate_channel::{Channel, ChannelEvent, FetchMode};
use gridgate_core::{Address, ChannelRoot, Keypair, SealedEnvelope, SharedSecret, SideKey};
use gridgate_ledger::{EncryptedChannelKeys, Ledger, LedgerMessage};

use crate::config::{DeviceConfig, MeterVersion};
use crate::dedup::MessageDeduplicator;
use crate::error::{DeviceError, Result};
use crate::pairing::PairingCoordinator;
use crate::registry::{AuthorizedProviderRegistry, ProviderAuthorization};
use crate::rotation::KeyRotationCoordinator;

/// Index of the device's pairing inbox under its credential.
pub const PAIRING_ADDRESS_INDEX: u64 = 0;

/// One DSMR 5.0 reading in this many is published.
pub const DSMR50_SAMPLE_INTERVAL: u32 = 10;

/// The device's ledger credential and resolved inbox address.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    /// Signing credential for ledger sends.
    pub keypair: Keypair,
    /// The inbox claimants and the backend write to.
    pub address: Address,
}

/// Where the client stands on the policy channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPosition {
    /// Cursor into the paired policy channel; `None` until paired.
    pub current_root: Option<ChannelRoot>,
    /// Side key the device's own data channel currently publishes
    /// under.
    pub side_key: SideKey,
}

/// Outcome of one ledger poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerPoll {
    /// Nothing in the inbox.
    Empty,
    /// The latest message was already handled.
    Duplicate,
    /// A message was dispatched to its handler.
    Handled(&'static str),
    /// A message of an unexpected kind was logged and dropped.
    Ignored(&'static str),
}

/// Outcome of one channel poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPoll {
    /// The device is not paired, there is nothing to consume.
    NotPaired,
    /// No entry at the current cursor yet.
    Empty,
    /// An entry was consumed and the cursor advanced. `handled` is
    /// false when the entry was malformed or its handler failed.
    Advanced {
        /// Whether the entry was decoded and handled cleanly.
        handled: bool,
    },
}

/// The device-side protocol client.
pub struct DeviceClient<L: Ledger, C: Channel> {
    identity: DeviceIdentity,
    config: DeviceConfig,
    ledger: L,
    channel: C,
    pairing: PairingCoordinator,
    rotation: KeyRotationCoordinator,
    registry: AuthorizedProviderRegistry,
    dedup: MessageDeduplicator,
    position: ChannelPosition,
    sample_counter: u32,
}

impl<L: Ledger, C: Channel> DeviceClient<L, C> {
    /// Builds a client and resolves its inbox address.
    ///
    /// Address resolution is the only fatal startup error; everything
    /// after this point is retried on the next poll.
    pub async fn start(config: DeviceConfig, ledger: L, channel: C) -> Result<Self> {
        let keypair = Keypair::from_seed(&config.seed);
        let address = ledger
            .get_address(&keypair, PAIRING_ADDRESS_INDEX)
            .await
            .map_err(|e| DeviceError::Startup(format!("cannot resolve inbox address: {e}")))?;
        info!(%address, "device client started");

        let secret = SharedSecret::new(config.shared_secret.clone());
        let position = ChannelPosition {
            current_root: None,
            side_key: config.initial_side_key,
        };
        let dedup = MessageDeduplicator::new(config.dedup_capacity);

        Ok(Self {
            identity: DeviceIdentity { keypair, address },
            pairing: PairingCoordinator::new(secret),
            rotation: KeyRotationCoordinator,
            registry: AuthorizedProviderRegistry::new(),
            dedup,
            position,
            sample_counter: 0,
            config,
            ledger,
            channel,
        })
    }

    /// The device's inbox address.
    pub fn address(&self) -> Address {
        self.identity.address
    }

    /// The current policy-channel position.
    pub fn position(&self) -> &ChannelPosition {
        &self.position
    }

    /// Whether the device has completed pairing.
    pub fn is_paired(&self) -> bool {
        self.position.current_root.is_some()
    }

    /// The current authorization registry.
    pub fn registry(&self) -> &AuthorizedProviderRegistry {
        &self.registry
    }

    /// The device's own data channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Runs the client forever: two timers, one logical thread.
    ///
    /// A slow poll delays the next tick of its own timer rather than
    /// overlapping it. Poll errors are logged and the loop keeps going.
    pub async fn run(mut self) {
        let mut ledger_tick = time::interval(self.config.ledger_poll_interval);
        let mut channel_tick = time::interval(self.config.channel_poll_interval);
        loop {
            tokio::select! {
                _ = ledger_tick.tick() => {
                    if let Err(e) = self.poll_ledger().await {
                        warn!(error = %e, "ledger poll failed");
                    }
                }
                _ = channel_tick.tick() => {
                    if let Err(e) = self.poll_channel().await {
                        warn!(error = %e, "channel poll failed");
                    }
                }
            }
        }
    }

    /// Polls the ledger inbox once and dispatches the latest message.
    pub async fn poll_ledger(&mut self) -> Result<LedgerPoll> {
        let Some(message) = self.ledger.get_last_message(&self.identity.address).await? else {
            return Ok(LedgerPoll::Empty);
        };

        let digest = message.digest();
        if self.dedup.seen(&digest) {
            return Ok(LedgerPoll::Duplicate);
        }
        self.dedup.mark(digest);
        debug!(kind = message.kind(), "ledger message received");

        match message {
            LedgerMessage::ClaimDevice { sender } => {
                self.pairing
                    .handle_claim(&self.ledger, &self.identity, &sender)
                    .await?;
                Ok(LedgerPoll::Handled("CLAIM_DEVICE"))
            }
            LedgerMessage::AnswerChallenge {
                sender,
                root,
                signed_challenge,
            } => {
                let paired = self
                    .pairing
                    .handle_answer(&self.ledger, &self.identity, &sender, root, signed_challenge)
                    .await?;
                if let Some(root) = paired {
                    info!(%root, "paired, consuming policy channel");
                    self.position.current_root = Some(root);
                }
                Ok(LedgerPoll::Handled("ANSWER_CHALLENGE"))
            }
            other => {
                warn!(kind = other.kind(), "unexpected ledger message, dropping");
                Ok(LedgerPoll::Ignored(other.kind()))
            }
        }
    }

    /// Polls the policy channel once.
    ///
    /// The cursor advances past every fetched entry, including ones
    /// that fail to decode or whose handler fails, so one bad event can
    /// never wedge the channel.
    pub async fn poll_channel(&mut self) -> Result<ChannelPoll> {
        let Some(root) = self.position.current_root else {
            debug!("not paired, skipping channel poll");
            return Ok(ChannelPoll::NotPaired);
        };

        let Some(entry) = self
            .channel
            .fetch_next(&root, FetchMode::Private)
            .await?
        else {
            return Ok(ChannelPoll::Empty);
        };

        let handled = match ChannelEvent::from_bytes(&entry.bytes) {
            Ok(event) => self.dispatch_event(event, root).await,
            Err(e) => {
                warn!(error = %e, %root, "undecodable channel entry, skipping");
                false
            }
        };

        self.position.current_root = Some(entry.next_root);
        Ok(ChannelPoll::Advanced { handled })
    }

    async fn dispatch_event(&mut self, event: ChannelEvent, at_root: ChannelRoot) -> bool {
        debug!(kind = event.kind(), "channel event received");
        match event {
            ChannelEvent::Authorized { policy, .. } => {
                let authorization = ProviderAuthorization::from(&policy);
                info!(provider = %authorization.address, goal = %authorization.goal,
                      "provider authorized");
                self.registry.add(authorization.clone());
                if let Err(e) = self.send_channel_keys(&authorization, at_root).await {
                    warn!(provider = %authorization.address, error = %e,
                          "failed to deliver channel keys");
                    return false;
                }
                true
            }
            ChannelEvent::AuthorizationRevoked { policy, .. } => {
                let address = policy.service_provider.address;
                info!(provider = %address, "provider revoked");
                self.registry.remove(&address);
                match self
                    .rotation
                    .rotate(&self.channel, &self.registry.list())
                    .await
                {
                    Ok(new_key) => {
                        self.position.side_key = new_key;
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, "side key rotation failed, old key stays in effect");
                        false
                    }
                }
            }
            ChannelEvent::DeviceAdded { device, .. }
            | ChannelEvent::DeviceDeleted { device, .. } => {
                info!(%device, "device inventory changed, clearing authorizations");
                self.registry.clear();
                true
            }
            other => {
                debug!(kind = other.kind(), "ignoring channel event");
                true
            }
        }
    }

    /// Seals the data channel's current credentials to a provider and
    /// delivers them over the ledger.
    async fn send_channel_keys(
        &self,
        provider: &ProviderAuthorization,
        at_root: ChannelRoot,
    ) -> Result<()> {
        let state = self.channel.current_state().await?;
        let keys = EncryptedChannelKeys {
            root: SealedEnvelope::seal(state.next_root.as_bytes(), &provider.public_key)?,
            side_key: SealedEnvelope::seal(state.side_key.as_bytes(), &provider.public_key)?,
        };
        let message = LedgerMessage::ChannelKeys {
            root: at_root,
            keys,
        };
        self.ledger
            .send(&self.identity.keypair, &provider.address, message)
            .await?;
        info!(provider = %provider.address, "channel keys delivered");
        Ok(())
    }

    /// Publishes a meter reading on the data channel.
    ///
    /// DSMR 5.0 meters emit one telegram per second; only one in
    /// [`DSMR50_SAMPLE_INTERVAL`] is published. With
    /// `duplicate_sampled_publish` set, every telegram goes out and
    /// the sampled one goes out twice, matching the legacy client.
    /// Returns whether the reading went out.
    pub async fn publish_reading(&mut self, raw: impl Into<String>) -> Result<bool> {
        let mut publishes = 1;
        if self.config.meter_version == MeterVersion::Dsmr50 {
            let sampled = self.sample_counter == 0;
            self.sample_counter = (self.sample_counter + 1) % DSMR50_SAMPLE_INTERVAL;
            if self.config.duplicate_sampled_publish {
                if sampled {
                    publishes = 2;
                }
            } else if !sampled {
                return Ok(false);
            }
        }

        let event = ChannelEvent::Data {
            timestamp: unix_millis(),
            raw: raw.into(),
        };
        for _ in 0..publishes {
            self.channel.publish(&event).await?;
        }
        debug!("meter reading published");
        Ok(true)
    }
}

/// Current Unix time in milliseconds.
pub(crate) fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
