//! Property tests for the cache serialization contract and key derivation.

use customer_registry::stores::envelope;
use customer_registry::{Customer, RegistryConfig};
use proptest::prelude::*;

proptest! {
    /// Any customer survives the envelope, and the payload always carries
    /// the schema tag.
    #[test]
    fn envelope_preserves_any_customer(
        id in any::<i64>(),
        name in ".*",
        email in ".*",
    ) {
        let customer = Customer { id, name, email };
        let payload = envelope::encode(&customer).unwrap();

        prop_assert!(payload.contains(envelope::SCHEMA));
        let decoded = envelope::decode("k", &payload).unwrap();
        prop_assert_eq!(decoded, customer);
    }

    /// Arbitrary non-envelope payloads never decode into a customer.
    #[test]
    fn envelope_rejects_untagged_payloads(payload in "[^s]*") {
        // Anything without a "schema" field must be rejected
        prop_assert!(envelope::decode("k", &payload).is_err());
    }

    /// The cache key is a pure function of prefix and id, and distinct ids
    /// never collide under the default prefix.
    #[test]
    fn cache_keys_are_injective(a in any::<i64>(), b in any::<i64>()) {
        let config = RegistryConfig::default();
        let key_a = config.cache_key(a);
        let key_b = config.cache_key(b);

        prop_assert!(key_a.starts_with("customers::"));
        prop_assert_eq!(a == b, key_a == key_b);
    }
}
