//! Device client configuration.
//!
//! Provisioning secrets and tuning knobs, loadable from the
//! environment for deployments on the meter hardware.

use std::time::Duration;

use anyhow::{bail, Context};

use gridgate_core::SideKey;

use crate::dedup::DEFAULT_DEDUP_CAPACITY;

/// DSMR version of the attached meter. DSMR 5.0 meters emit a telegram
/// every second; older versions every ten seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterVersion {
    /// DSMR 2.2.
    Dsmr22,
    /// DSMR 4.0.
    Dsmr40,
    /// DSMR 4.2.
    Dsmr42,
    /// DSMR 5.0: one telegram per second, readings are sampled down.
    Dsmr50,
}

impl MeterVersion {
    /// Parses the version string reported in deployment config.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "2.2" => Some(Self::Dsmr22),
            "4.0" => Some(Self::Dsmr40),
            "4.2" => Some(Self::Dsmr42),
            "5.0" => Some(Self::Dsmr50),
            _ => None,
        }
    }
}

/// Configuration for a [`DeviceClient`](crate::DeviceClient).
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// The 32-byte seed of the device's ledger credential.
    pub seed: [u8; 32],
    /// The pairing secret printed on the device.
    pub shared_secret: String,
    /// Side key the data channel starts out with.
    pub initial_side_key: SideKey,
    /// How often the ledger inbox is polled.
    pub ledger_poll_interval: Duration,
    /// How often the policy channel is polled.
    pub channel_poll_interval: Duration,
    /// DSMR version of the attached meter.
    pub meter_version: MeterVersion,
    /// Legacy DSMR 5.0 behavior: publish every telegram and the
    /// sampled one twice, instead of the sampled one only. Off by
    /// default.
    pub duplicate_sampled_publish: bool,
    /// How many ledger message digests to retain for deduplication.
    pub dedup_capacity: usize,
}

impl DeviceConfig {
    /// Creates a configuration with default tuning.
    pub fn new(seed: [u8; 32], shared_secret: impl Into<String>, initial_side_key: SideKey) -> Self {
        Self {
            seed,
            shared_secret: shared_secret.into(),
            initial_side_key,
            ledger_poll_interval: Duration::from_millis(5000),
            channel_poll_interval: Duration::from_millis(5000),
            meter_version: MeterVersion::Dsmr42,
            duplicate_sampled_publish: false,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
        }
    }

    /// Loads configuration from `GRIDGATE_*` environment variables.
    ///
    /// `GRIDGATE_SEED` (hex, 64 chars) is required. Optional:
    /// `GRIDGATE_SHARED_SECRET`, `GRIDGATE_SIDE_KEY`,
    /// `GRIDGATE_POLL_INTERVAL_MS`, `GRIDGATE_METER_VERSION`,
    /// `GRIDGATE_DUPLICATE_SAMPLED_PUBLISH`.
    pub fn from_env() -> anyhow::Result<Self> {
        let seed_hex =
            std::env::var("GRIDGATE_SEED").context("GRIDGATE_SEED is required (hex, 64 chars)")?;
        let seed_bytes = hex::decode(seed_hex.trim()).context("GRIDGATE_SEED is not valid hex")?;
        let seed: [u8; 32] = seed_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("GRIDGATE_SEED must decode to 32 bytes"))?;

        let shared_secret =
            std::env::var("GRIDGATE_SHARED_SECRET").unwrap_or_else(|_| "PEAR".into());

        let side_key_code = std::env::var("GRIDGATE_SIDE_KEY").unwrap_or_else(|_| "BANANA".into());
        let initial_side_key =
            SideKey::from_code(&side_key_code).context("GRIDGATE_SIDE_KEY is not a valid code")?;

        let mut config = Self::new(seed, shared_secret, initial_side_key);

        if let Ok(ms) = std::env::var("GRIDGATE_POLL_INTERVAL_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .context("GRIDGATE_POLL_INTERVAL_MS is not a number")?;
            config.ledger_poll_interval = Duration::from_millis(ms);
            config.channel_poll_interval = Duration::from_millis(ms);
        }

        if let Ok(version) = std::env::var("GRIDGATE_METER_VERSION") {
            config.meter_version = match MeterVersion::parse(&version) {
                Some(v) => v,
                None => bail!("GRIDGATE_METER_VERSION {version:?} is not one of 2.2, 4.0, 4.2, 5.0"),
            };
        }

        if let Ok(flag) = std::env::var("GRIDGATE_DUPLICATE_SAMPLED_PUBLISH") {
            config.duplicate_sampled_publish = matches!(flag.trim(), "1" | "true" | "yes");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = DeviceConfig::new([0x01; 32], "PEAR", SideKey::from_code("BANANA").unwrap());
        assert_eq!(config.meter_version, MeterVersion::Dsmr42);
        assert!(!config.duplicate_sampled_publish);
        assert_eq!(config.dedup_capacity, DEFAULT_DEDUP_CAPACITY);
        assert_eq!(config.ledger_poll_interval, Duration::from_millis(5000));
    }

    #[test]
    fn meter_version_parses() {
        assert_eq!(MeterVersion::parse("5.0"), Some(MeterVersion::Dsmr50));
        assert_eq!(MeterVersion::parse(" 4.2 "), Some(MeterVersion::Dsmr42));
        assert_eq!(MeterVersion::parse("3.0"), None);
    }
}
