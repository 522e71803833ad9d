//! Property-Based Tests for the Governor
//!
//! - **Disclosure parsing**: well-formed pair lists always parse, capacity is
//!   the disclosed count minus headroom, arbitrary input never panics
//! - **Window counters**: admitted units never exceed capacity, rejected hits
//!   leave the count unchanged, reverting restores the previous count
//!
//! ```bash
//! cargo test --lib governor::proptests
//! ```

use proptest::prelude::*;

use crate::governor::quota::{parse_limit_list, DisclosedLimit, QuotaParseError};
use crate::governor::{QuotaDescriptor, ScopeKey, WindowCounterStore};

fn arb_pair() -> impl Strategy<Value = (u32, u64)> {
    (0u32..100_000, 1u64..86_400)
}

#[derive(Debug, Clone)]
enum Op {
    Hit(u32),
    Decrement(u32),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1u32..4).prop_map(Op::Hit),
        1 => (1u32..4).prop_map(Op::Decrement),
    ]
}

proptest! {
    #[test]
    fn prop_pair_lists_parse(pairs in prop::collection::vec(arb_pair(), 1..5)) {
        let header = pairs
            .iter()
            .map(|(count, window)| format!("{}:{}", count, window))
            .collect::<Vec<_>>()
            .join(",");

        let limits = parse_limit_list(&header).unwrap();
        prop_assert_eq!(limits.len(), pairs.len());
        for (limit, (count, window)) in limits.iter().zip(&pairs) {
            prop_assert_eq!(limit.count, *count);
            prop_assert_eq!(limit.window_secs, *window);
        }
    }

    #[test]
    fn prop_headroom_is_subtracted((count, window) in arb_pair(), headroom in 0u32..5) {
        let limit = DisclosedLimit { count, window_secs: window };
        match limit.into_descriptor(headroom) {
            Ok(descriptor) => {
                prop_assert!(count > headroom);
                prop_assert_eq!(descriptor.capacity(), count - headroom);
                prop_assert_eq!(descriptor.window_secs(), window);
            }
            Err(e) => {
                prop_assert!(count <= headroom);
                prop_assert_eq!(e, QuotaParseError::NoCapacity { count, headroom });
            }
        }
    }

    #[test]
    fn prop_arbitrary_headers_never_panic(value in ".{0,40}") {
        let _ = parse_limit_list(&value);
    }

    #[test]
    fn prop_admitted_never_exceeds_capacity(
        capacity in 1u32..20,
        ops in prop::collection::vec(arb_op(), 1..60),
    ) {
        let store = WindowCounterStore::new();
        let key = ScopeKey::new(["ASIA", "route_short"]);
        // long window, so the test never crosses a boundary
        let descriptor = QuotaDescriptor::new(capacity, 3_600).unwrap();
        let mut expected = 0u32;

        for op in ops {
            match op {
                Op::Hit(cost) => {
                    let hit = store.hit(&key, &descriptor, cost);
                    prop_assert_eq!(hit.allowed, expected + cost <= capacity);
                    if hit.allowed {
                        expected += cost;
                    }
                    prop_assert_eq!(hit.count, expected);
                }
                Op::Decrement(cost) => {
                    store.decrement(&key, cost);
                    expected = expected.saturating_sub(cost);
                }
            }
            prop_assert!(expected <= capacity);
            prop_assert_eq!(store.window_stats(&key, &descriptor).count, expected);
        }
    }

    #[test]
    fn prop_revert_restores_count(capacity in 1u32..20, before in 0u32..20, cost in 1u32..4) {
        let store = WindowCounterStore::new();
        let key = ScopeKey::new(["KR", "get_master_league"]);
        let descriptor = QuotaDescriptor::new(capacity, 3_600).unwrap();

        for _ in 0..before {
            store.hit(&key, &descriptor, 1);
        }
        let count_before = store.window_stats(&key, &descriptor).count;

        let hit = store.hit(&key, &descriptor, cost);
        if hit.allowed {
            store.revert(&key, &hit, cost);
        }
        prop_assert_eq!(store.window_stats(&key, &descriptor).count, count_before);
    }
}
