//! # Gridgate Testkit
//!
//! Testing utilities for the gridgate device protocol.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a fully wired [`DeviceRig`](fixtures::DeviceRig)
//!   with an in-memory ledger and channel bus, plus provider fixtures
//!   with sealing keys
//! - **Generators**: proptest strategies for addresses, side keys,
//!   policies, and registry scripts
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use gridgate_testkit::fixtures::{DeviceRig, ProviderFixture};
//!
//! let mut rig = DeviceRig::new().await;
//! rig.pair().await;
//! let provider = ProviderFixture::new(0x11);
//! rig.process(&provider.authorized("smart-meter-1", "insight")).await;
//! assert!(rig.device.registry().contains(&provider.address));
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use gridgate_testkit::generators::{apply_script, registry_script};
//!
//! proptest! {
//!     #[test]
//!     fn registry_never_holds_revoked_providers(script in registry_script(32)) {
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{DeviceRig, ProviderFixture, FIXTURE_SECRET, FIXTURE_SIDE_KEY};
pub use generators::{apply_script, events_for_script, registry_script, RegistryOp};
