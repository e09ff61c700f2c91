//! # Gridgate Channel
//!
//! The authenticated-channel collaborator contract: ordered policy and
//! data events with a rolling cursor (root) and a symmetric side key
//! gating read access.
//!
//! ## Overview
//!
//! The channel is an ordered, append-only broadcast log. The backend
//! publishes policy events (grants, revocations, device inventory
//! changes) that the device consumes in order; the device publishes
//! meter data and key-rotation notices on its own restricted channel.
//!
//! ## Key Properties
//!
//! - **Forward-only**: fetching an entry yields the next root; cursors
//!   never move backwards
//! - **Raw payloads**: fetch returns bytes, so a malformed entry can be
//!   logged and skipped without losing the cursor
//! - **Epoch-gated reads**: restricted entries stay gated by the side
//!   key they were published under

pub mod error;
pub mod events;
pub mod memory;
pub mod traits;

pub use error::{ChannelError, Result};
pub use events::{ChannelEvent, Policy, ServiceProvider};
pub use memory::{ChannelBus, MemoryChannel};
pub use traits::{Channel, ChannelEntry, ChannelState, FetchMode};
