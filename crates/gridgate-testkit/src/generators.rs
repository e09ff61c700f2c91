//! Proptest generators for property-based testing.

use proptest::prelude::*;

use gridgate_channel::{ChannelEvent, Policy, ServiceProvider};
use gridgate_core::{
    Address, ChannelRoot, Keypair, SharedSecret, SideKey, X25519StaticSecret, CODE_ALPHABET,
};
use gridgate_device::{AuthorizedProviderRegistry, ProviderAuthorization};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 32]>().prop_map(Address::from_bytes)
}

/// Generate a random channel root.
pub fn channel_root() -> impl Strategy<Value = ChannelRoot> {
    any::<[u8; 32]>().prop_map(ChannelRoot::from_bytes)
}

/// Generate a code over the bounded alphabet, as used for side keys
/// and pairing secrets.
pub fn code(max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(0usize..CODE_ALPHABET.len(), 1..=max_len).prop_map(|indices| {
        indices
            .into_iter()
            .map(|i| CODE_ALPHABET[i] as char)
            .collect()
    })
}

/// Generate a random side key.
pub fn side_key() -> impl Strategy<Value = SideKey> {
    code(32).prop_map(|c| SideKey::from_code(&c).expect("code is in alphabet"))
}

/// Generate a pairing secret.
pub fn shared_secret() -> impl Strategy<Value = SharedSecret> {
    code(12).prop_map(SharedSecret::new)
}

/// Generate a policy for a provider derived from a one-byte seed.
pub fn policy() -> impl Strategy<Value = Policy> {
    (any::<u8>(), "[a-z][a-z0-9-]{0,15}", "[a-z ]{1,24}").prop_map(|(seed, device, goal)| {
        let x25519 = X25519StaticSecret::from_bytes([seed; 32]);
        Policy {
            service_provider: ServiceProvider {
                address: Address::from_bytes([seed; 32]),
                public_key: x25519.public_key(),
            },
            action: "read P1 energy data".into(),
            device,
            goal,
            conditions: vec![],
        }
    })
}

/// One step in a registry script.
#[derive(Debug, Clone)]
pub enum RegistryOp {
    /// Grant access to the provider with this seed.
    Authorize(u8, String),
    /// Withdraw access from the provider with this seed.
    Revoke(u8),
    /// Inventory change: drop everything.
    Clear,
}

/// Generate a script of registry operations.
pub fn registry_script(max_len: usize) -> impl Strategy<Value = Vec<RegistryOp>> {
    prop::collection::vec(
        prop_oneof![
            4 => (any::<u8>(), "[a-z ]{1,16}").prop_map(|(s, g)| RegistryOp::Authorize(s, g)),
            4 => any::<u8>().prop_map(RegistryOp::Revoke),
            1 => Just(RegistryOp::Clear),
        ],
        0..=max_len,
    )
}

/// Build the authorization a script step grants.
pub fn authorization_for(seed: u8, goal: &str) -> ProviderAuthorization {
    let x25519 = X25519StaticSecret::from_bytes([seed; 32]);
    ProviderAuthorization {
        address: Address::from_bytes([seed; 32]),
        public_key: x25519.public_key(),
        device: "smart-meter-1".into(),
        goal: goal.into(),
    }
}

/// Apply a script to a registry.
pub fn apply_script(registry: &mut AuthorizedProviderRegistry, script: &[RegistryOp]) {
    for op in script {
        match op {
            RegistryOp::Authorize(seed, goal) => registry.add(authorization_for(*seed, goal)),
            RegistryOp::Revoke(seed) => {
                registry.remove(&Address::from_bytes([*seed; 32]));
            }
            RegistryOp::Clear => registry.clear(),
        }
    }
}

/// Turn a script into the channel events a backend would publish.
pub fn events_for_script(script: &[RegistryOp]) -> Vec<ChannelEvent> {
    script
        .iter()
        .map(|op| match op {
            RegistryOp::Authorize(seed, goal) => {
                let x25519 = X25519StaticSecret::from_bytes([*seed; 32]);
                ChannelEvent::Authorized {
                    timestamp: 0,
                    policy: Policy {
                        service_provider: ServiceProvider {
                            address: Address::from_bytes([*seed; 32]),
                            public_key: x25519.public_key(),
                        },
                        action: "read P1 energy data".into(),
                        device: "smart-meter-1".into(),
                        goal: goal.clone(),
                        conditions: vec![],
                    },
                }
            }
            RegistryOp::Revoke(seed) => {
                let x25519 = X25519StaticSecret::from_bytes([*seed; 32]);
                ChannelEvent::AuthorizationRevoked {
                    timestamp: 0,
                    policy: Policy {
                        service_provider: ServiceProvider {
                            address: Address::from_bytes([*seed; 32]),
                            public_key: x25519.public_key(),
                        },
                        action: "read P1 energy data".into(),
                        device: "smart-meter-1".into(),
                        goal: "revoked".into(),
                        conditions: vec![],
                    },
                }
            }
            RegistryOp::Clear => ChannelEvent::DeviceAdded {
                timestamp: 0,
                device: "smart-meter-2".into(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    proptest! {
        /// The registry converges to exactly the providers a naive
        /// replay of the script leaves authorized.
        #[test]
        fn test_registry_matches_script_replay(script in registry_script(32)) {
            let mut registry = AuthorizedProviderRegistry::new();
            apply_script(&mut registry, &script);

            let mut model: BTreeMap<Address, String> = BTreeMap::new();
            for op in &script {
                match op {
                    RegistryOp::Authorize(seed, goal) => {
                        model.insert(Address::from_bytes([*seed; 32]), goal.clone());
                    }
                    RegistryOp::Revoke(seed) => {
                        model.remove(&Address::from_bytes([*seed; 32]));
                    }
                    RegistryOp::Clear => model.clear(),
                }
            }

            prop_assert_eq!(registry.len(), model.len());
            for auth in registry.list() {
                prop_assert_eq!(model.get(&auth.address), Some(&auth.goal));
            }
        }

        /// Every script step maps to one event, and the policy events
        /// name the provider the step targets.
        #[test]
        fn test_script_events_name_their_providers(script in registry_script(16)) {
            let events = events_for_script(&script);
            prop_assert_eq!(events.len(), script.len());
            for (op, event) in script.iter().zip(&events) {
                match (op, event) {
                    (RegistryOp::Authorize(seed, _), ChannelEvent::Authorized { policy, .. })
                    | (RegistryOp::Revoke(seed), ChannelEvent::AuthorizationRevoked { policy, .. }) => {
                        prop_assert_eq!(
                            policy.service_provider.address,
                            Address::from_bytes([*seed; 32])
                        );
                        prop_assert!(policy.conditions.is_empty());
                    }
                    (RegistryOp::Clear, ChannelEvent::DeviceAdded { .. }) => {}
                    (op, event) => prop_assert!(false, "op {:?} produced {:?}", op, event),
                }
            }
        }

        #[test]
        fn test_side_key_codes_roundtrip(key in side_key()) {
            let bytes = *key.as_bytes();
            prop_assert_eq!(SideKey::from_bytes(bytes), key);
        }

        #[test]
        fn test_distinct_secrets_sign_differently(
            s1 in shared_secret(),
            s2 in shared_secret(),
        ) {
            prop_assume!(s1 != s2);
            let challenge = gridgate_core::Challenge::issue(s1.len());
            prop_assert_ne!(challenge.sign(&s1), challenge.sign(&s2));
        }
    }
}
