//! Side-key rotation on revocation.
//!
//! Revoking a provider must cut off its read access going forward. The
//! coordinator generates a fresh side key, seals it once per remaining
//! authorized provider, and publishes the rotation notice as the LAST
//! entry under the old key. Revoked parties can still read history up
//! to and including the notice, but nothing after it.

use std::collections::BTreeMap;

use tracing::info;

use gridgate_channel::{Channel, ChannelEvent};
use gridgate_core::{SealedEnvelope, SideKey};

use crate::client::unix_millis;
use crate::error::Result;
use crate::registry::ProviderAuthorization;

/// Performs side-key rotations on the device's data channel.
#[derive(Debug, Default)]
pub struct KeyRotationCoordinator;

impl KeyRotationCoordinator {
    /// Rotates the channel's side key.
    ///
    /// Publishes the sealed new key under the OLD side key, then
    /// switches the channel over. On any failure the old key stays in
    /// effect, so the caller may retry; the new key is returned only
    /// once the channel has committed to it.
    pub async fn rotate<C: Channel>(
        &self,
        channel: &C,
        remaining: &[ProviderAuthorization],
    ) -> Result<SideKey> {
        let new_key = SideKey::generate();

        let mut keys = BTreeMap::new();
        for provider in remaining {
            let sealed = SealedEnvelope::seal(new_key.as_bytes(), &provider.public_key)?;
            keys.insert(provider.address, sealed);
        }

        let notice = ChannelEvent::KeyRotation {
            timestamp: unix_millis(),
            keys,
        };
        channel.publish(&notice).await?;
        channel.rotate_side_key(new_key).await?;

        info!(recipients = remaining.len(), "side key rotated");
        Ok(new_key)
    }
}
