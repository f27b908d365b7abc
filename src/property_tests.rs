//! Property-Based Tests
//!
//! Uses proptest to check key derivation, page normalization, content hashing
//! and store round trips over generated inputs.

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{Backend, MemoryStore, Ttl};
use crate::manager::Manager;
use crate::pagination::{content_hash, derive_key, Filters, PaginationParams, MAX_PAGE_SIZE};

// == Strategies ==
fn resource_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,12}"
}

fn filters_strategy() -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..6)
        .prop_map(|map| map.into_iter().collect())
}

fn to_filters(pairs: &[(String, i64)]) -> Filters {
    pairs
        .iter()
        .map(|(name, value)| (name.clone(), serde_json::json!(value)))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Inserting filters in any order yields the same key
    #[test]
    fn prop_derive_key_ignores_filter_order(
        resource in resource_strategy(),
        pairs in filters_strategy(),
        page in 1i64..50,
        size in 1i64..MAX_PAGE_SIZE,
    ) {
        let params = PaginationParams::new(page, size);
        let forward = to_filters(&pairs);
        let mut reversed_pairs = pairs.clone();
        reversed_pairs.reverse();
        let reversed = to_filters(&reversed_pairs);

        prop_assert_eq!(
            derive_key(&resource, &forward, params),
            derive_key(&resource, &reversed, params)
        );
    }

    // Different pages of the same query never collide
    #[test]
    fn prop_derive_key_distinguishes_pages(
        resource in resource_strategy(),
        pairs in filters_strategy(),
        page in 1i64..50,
        size in 1i64..MAX_PAGE_SIZE,
    ) {
        let filters = to_filters(&pairs);
        let a = derive_key(&resource, &filters, PaginationParams::new(page, size));
        let b = derive_key(&resource, &filters, PaginationParams::new(page + 1, size));
        prop_assert_ne!(a, b);
    }

    // Every derived key starts with the prefix invalidation deletes by
    #[test]
    fn prop_derive_key_is_under_resource_prefix(
        resource in resource_strategy(),
        pairs in filters_strategy(),
        page in any::<i64>(),
        size in any::<i64>(),
    ) {
        let key = derive_key(&resource, &to_filters(&pairs), PaginationParams::new(page, size));
        let prefix = format!("{}:", resource);
        prop_assert!(key.starts_with(&prefix));
    }

    // Normalization is idempotent and lands in range
    #[test]
    fn prop_normalize_idempotent_and_clamped(page in any::<i64>(), size in any::<i64>()) {
        let once = PaginationParams::new(page, size).normalize();
        prop_assert_eq!(once, once.normalize());
        prop_assert!(once.page >= 1);
        prop_assert!(once.page_size >= 1 && once.page_size <= MAX_PAGE_SIZE);
    }

    // The hash depends on the data alone
    #[test]
    fn prop_content_hash_is_deterministic(data in prop::collection::vec(any::<i32>(), 0..40)) {
        let first = content_hash(&data).unwrap();
        let second = content_hash(&data.clone()).unwrap();
        prop_assert_eq!(first.len(), 64);
        prop_assert_eq!(first, second);
    }

    // A stored value reads back unchanged
    #[test]
    fn prop_memory_round_trip(key in "[a-zA-Z0-9_:]{1,32}", value in prop::collection::vec(any::<u8>(), 0..128)) {
        let store = MemoryStore::new(Duration::from_secs(60));
        let read = tokio_test::block_on(async {
            store.set(&key, value.clone(), Ttl::Default).await.unwrap();
            store.get(&key).await.unwrap()
        });
        prop_assert_eq!(read, Some(value));
    }

    // Typed values survive the manager's encode/decode
    #[test]
    fn prop_manager_typed_round_trip(key in "[a-z]{1,16}", id in any::<i64>(), name in "[A-Za-z ]{0,24}") {
        let manager = Manager::with_backend(
            Arc::new(MemoryStore::new(Duration::from_secs(60))),
            Duration::from_secs(60),
        );
        let value = (id, name);
        let read: Option<(i64, String)> = tokio_test::block_on(async {
            manager.set(&key, &value, Duration::ZERO).await.unwrap();
            manager.get(&key).await.unwrap()
        });
        prop_assert_eq!(read, Some(value));
    }
}
