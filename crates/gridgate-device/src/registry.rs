//! The device's view of who may currently read its data.
//!
//! Derived entirely from the policy channel: grants add, revocations
//! remove, inventory changes clear. Iteration order is stable by
//! provider address so rotation notices are deterministic.

use std::collections::BTreeMap;

use gridgate_channel::Policy;
use gridgate_core::{Address, X25519PublicKey};

/// One authorized service provider, as extracted from a granted policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAuthorization {
    /// The provider's ledger inbox address.
    pub address: Address,
    /// Key to seal channel credentials to.
    pub public_key: X25519PublicKey,
    /// The device the grant covers.
    pub device: String,
    /// Stated purpose of the access.
    pub goal: String,
}

impl From<&Policy> for ProviderAuthorization {
    fn from(policy: &Policy) -> Self {
        Self {
            address: policy.service_provider.address,
            public_key: policy.service_provider.public_key,
            device: policy.device.clone(),
            goal: policy.goal.clone(),
        }
    }
}

/// Registry of currently authorized providers, keyed by address.
#[derive(Debug, Default)]
pub struct AuthorizedProviderRegistry {
    providers: BTreeMap<Address, ProviderAuthorization>,
}

impl AuthorizedProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the authorization for a provider.
    pub fn add(&mut self, authorization: ProviderAuthorization) {
        self.providers
            .insert(authorization.address, authorization);
    }

    /// Removes a provider; a no-op when it was never authorized.
    pub fn remove(&mut self, address: &Address) -> Option<ProviderAuthorization> {
        self.providers.remove(address)
    }

    /// Drops all authorizations.
    pub fn clear(&mut self) {
        self.providers.clear();
    }

    /// Returns true if the provider is currently authorized.
    pub fn contains(&self, address: &Address) -> bool {
        self.providers.contains_key(address)
    }

    /// Snapshot of all authorizations in address order.
    pub fn list(&self) -> Vec<ProviderAuthorization> {
        self.providers.values().cloned().collect()
    }

    /// Number of authorized providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true when nobody is authorized.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridgate_core::X25519StaticSecret;

    fn authorization(address_byte: u8, goal: &str) -> ProviderAuthorization {
        let secret = X25519StaticSecret::from_bytes([address_byte; 32]);
        ProviderAuthorization {
            address: Address::from_bytes([address_byte; 32]),
            public_key: secret.public_key(),
            device: "smart-meter-1".into(),
            goal: goal.into(),
        }
    }

    #[test]
    fn add_then_contains() {
        let mut registry = AuthorizedProviderRegistry::new();
        let auth = authorization(1, "insight");
        registry.add(auth.clone());
        assert!(registry.contains(&auth.address));
        assert_eq!(registry.list(), vec![auth]);
    }

    #[test]
    fn add_same_address_replaces() {
        let mut registry = AuthorizedProviderRegistry::new();
        registry.add(authorization(1, "insight"));
        registry.add(authorization(1, "billing"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list()[0].goal, "billing");
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut registry = AuthorizedProviderRegistry::new();
        registry.add(authorization(1, "insight"));
        assert!(registry.remove(&Address::from_bytes([9; 32])).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clear_empties_registry() {
        let mut registry = AuthorizedProviderRegistry::new();
        registry.add(authorization(1, "insight"));
        registry.add(authorization(2, "billing"));
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn list_is_address_ordered() {
        let mut registry = AuthorizedProviderRegistry::new();
        registry.add(authorization(3, "c"));
        registry.add(authorization(1, "a"));
        registry.add(authorization(2, "b"));
        let addresses: Vec<_> = registry.list().into_iter().map(|a| a.address).collect();
        let mut sorted = addresses.clone();
        sorted.sort();
        assert_eq!(addresses, sorted);
    }
}
