//! Property-based tests for behavior ordering.
//!
//! For any set of behaviors with arbitrary categories and orders, the chain
//! that wraps a request must be: globals, then the request kind's own
//! behaviors, each group sorted by order with ties in registration order.

#![allow(clippy::unwrap_used)]

use cqrs_mediator_core::behavior::behavior_fn;
use cqrs_mediator_core::{BehaviorCategory, Mediator, command, handler_fn, query};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

struct Store(u8);
command!(Store => u8);

struct Load;
query!(Load => u8);

// =============================================================================
// STRATEGIES
// =============================================================================

fn category_strategy() -> impl Strategy<Value = BehaviorCategory> {
    prop_oneof![
        Just(BehaviorCategory::Global),
        Just(BehaviorCategory::Command),
        Just(BehaviorCategory::Query),
    ]
}

fn registrations_strategy() -> impl Strategy<Value = Vec<(BehaviorCategory, i32)>> {
    prop::collection::vec((category_strategy(), -3_i32..=3), 0..12)
}

/// Indices of the registrations that should wrap a request of `specific`,
/// outermost first.
fn expected_chain(registrations: &[(BehaviorCategory, i32)], specific: BehaviorCategory) -> Vec<usize> {
    let group = |category: BehaviorCategory| {
        let mut members: Vec<(i32, usize)> = registrations
            .iter()
            .enumerate()
            .filter(|(_, (c, _))| *c == category)
            .map(|(index, (_, order))| (*order, index))
            .collect();
        // stable sort keeps registration order among equal orders
        members.sort_by_key(|(order, _)| *order);
        members.into_iter().map(|(_, index)| index)
    };
    group(BehaviorCategory::Global).chain(group(specific)).collect()
}

proptest! {
    #[test]
    fn prop_chain_order_matches_declaration(registrations in registrations_strategy()) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = Mediator::builder()
            .handler(handler_fn(|s: &Store| Ok(s.0)))
            .handler(handler_fn(|_: &Load| Ok(0)));

        for (index, (category, order)) in registrations.iter().copied().enumerate() {
            let log = Arc::clone(&log);
            builder = builder.behavior_with_order(
                category,
                order,
                behavior_fn(move |_, next| {
                    log.lock().unwrap().push(index);
                    next.run()
                }),
            );
        }
        let mediator = builder.build().unwrap();

        prop_assert_eq!(mediator.dispatch(Store(4)).unwrap(), 4);
        let seen = std::mem::take(&mut *log.lock().unwrap());
        prop_assert_eq!(seen, expected_chain(&registrations, BehaviorCategory::Command));

        prop_assert_eq!(mediator.send(Load).unwrap(), 0);
        let seen = std::mem::take(&mut *log.lock().unwrap());
        prop_assert_eq!(seen, expected_chain(&registrations, BehaviorCategory::Query));
    }

    #[test]
    fn prop_wrapping_nests_symmetrically(depth in 0_usize..10) {
        let mut builder = Mediator::builder().handler(handler_fn(|s: &Store| Ok(s.0)));
        for _ in 0..depth {
            builder = builder.behavior(
                BehaviorCategory::Global,
                behavior_fn(|_, next| Ok(next.run()?.map(|v: u8| v.wrapping_add(1)))),
            );
        }
        let mediator = builder.build().unwrap();

        let expected = u8::try_from(depth).unwrap();
        prop_assert_eq!(mediator.dispatch(Store(0)).unwrap(), expected);
    }
}
