//! Tests for the test doubles and the dispatch harness
//!
//! These double as executable examples of the mediator's pipeline rules.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use cqrs_mediator_core::{
    BehaviorCategory, HandlerManifest, Mediator, MediatorError, RequestKind, command,
    contextual_fn, handler_fn, query,
};
use cqrs_mediator_testing::assertions::{assert_application_error, assert_handler_not_found};
use cqrs_mediator_testing::{
    CountingHooks, DispatchTest, RecordingBehavior, RecordingMiddleware, Reject, ShortCircuit,
    Trace, init_test_tracing,
};

// ============================================================================
// Fixtures
// ============================================================================

struct Rename {
    id: u32,
    name: String,
}
command!(Rename => String);

struct Lookup(u32);
query!(Lookup => Option<String>);

#[derive(Debug, thiserror::Error)]
#[error("name `{0}` is taken")]
struct NameTaken(String);

fn catalog() -> HandlerManifest {
    HandlerManifest::new()
        .with(handler_fn(|r: &Rename| {
            if r.name == "admin" {
                return Err(NameTaken(r.name.clone()).into());
            }
            Ok(format!("{}={}", r.id, r.name))
        }))
        .with(handler_fn(|l: &Lookup| Ok((l.0 == 1).then(|| "first".to_string()))))
}

fn rename(name: &str) -> Rename {
    Rename {
        id: 1,
        name: name.to_string(),
    }
}

// ============================================================================
// Harness
// ============================================================================

#[test]
fn test_harness_command_output() {
    init_test_tracing();

    DispatchTest::new()
        .given_manifest(catalog())
        .when_command(rename("ada"))
        .then_output(|out| assert_eq!(out, "1=ada"))
        .run();
}

#[test]
fn test_harness_query_output() {
    DispatchTest::new()
        .given_manifest(catalog())
        .when_query(Lookup(2))
        .then_output(|out| assert!(out.is_none()))
        .run();
}

#[test]
fn test_harness_domain_error() {
    DispatchTest::new()
        .given_manifest(catalog())
        .when_command(rename("admin"))
        .then_error(|err| {
            let taken = assert_application_error::<NameTaken>(err);
            assert_eq!(taken.0, "admin");
        })
        .run();
}

#[test]
fn test_harness_missing_handler() {
    DispatchTest::new()
        .when_query(Lookup(1))
        .then_error(|err| assert_handler_not_found(err, "Lookup"))
        .run();
}

#[test]
#[should_panic(expected = "Expected dispatch to succeed")]
fn test_harness_reports_unexpected_failure() {
    DispatchTest::new()
        .when_query(Lookup(1))
        .then_output(|_| {})
        .run();
}

#[test]
#[should_panic(expected = "Mediator must build")]
fn test_harness_reports_build_failure() {
    DispatchTest::new()
        .given_manifest(catalog())
        .given_behavior(BehaviorCategory::Global, ShortCircuit::new(0_u8))
        .given_middleware(RecordingMiddleware::new("m", &Trace::new()))
        .when_query(Lookup(1))
        .run();
}

struct Actor(&'static str);

#[test]
fn test_harness_command_with_context() {
    let trace = Trace::new();

    DispatchTest::new()
        .given_manifest(catalog())
        .given_contextual_handler(contextual_fn(|r: &Rename, actor: &Actor| {
            Ok(format!("{} by {}", r.name, actor.0))
        }))
        .given_behavior(BehaviorCategory::Command, RecordingBehavior::new("audit", &trace))
        .when_command_with(rename("ada"), Actor("root"))
        .then_output(|out| assert_eq!(out, "ada by root"))
        .run();

    assert_eq!(trace.entries(), vec!["audit:before", "audit:after"]);
}

#[test]
fn test_harness_query_with_context_falls_back() {
    DispatchTest::new()
        .given_manifest(catalog())
        .when_query_with(Lookup(1), Actor("root"))
        .then_output(|out| assert_eq!(out.as_deref(), Some("first")))
        .run();
}

// ============================================================================
// Doubles
// ============================================================================

#[test]
fn test_recording_behaviors_nest() {
    let trace = Trace::new();

    DispatchTest::new()
        .given_manifest(catalog())
        .given_behavior(BehaviorCategory::Command, RecordingBehavior::new("C", &trace))
        .given_behavior(BehaviorCategory::Global, RecordingBehavior::new("A", &trace))
        .given_behavior(BehaviorCategory::Global, RecordingBehavior::new("B", &trace))
        .given_behavior(BehaviorCategory::Query, RecordingBehavior::new("Q", &trace))
        .when_command(rename("ada"))
        .run();

    assert_eq!(
        trace.entries(),
        vec!["A:before", "B:before", "C:before", "C:after", "B:after", "A:after"]
    );
}

#[test]
fn test_order_overrides_registration_sequence() {
    let trace = Trace::new();

    DispatchTest::new()
        .given_manifest(catalog())
        .given_behavior_with_order(BehaviorCategory::Global, 10, RecordingBehavior::new("late", &trace))
        .given_behavior_with_order(BehaviorCategory::Global, -10, RecordingBehavior::new("early", &trace))
        .when_query(Lookup(1))
        .then_output(|out| assert_eq!(out.as_deref(), Some("first")))
        .run();

    assert_eq!(
        trace.entries(),
        vec!["early:before", "late:before", "late:after", "early:after"]
    );
}

#[test]
fn test_recording_middleware_filters() {
    let trace = Trace::new();
    let mediator = Mediator::builder()
        .manifest(catalog())
        .middleware(RecordingMiddleware::new("all", &trace))
        .middleware(RecordingMiddleware::new("queries", &trace).only(RequestKind::Query))
        .middleware(RecordingMiddleware::new("rename", &trace).only_for::<Rename>())
        .build()
        .unwrap();

    mediator.send(Lookup(1)).unwrap();
    assert_eq!(
        trace.take(),
        vec!["all:before", "queries:before", "queries:after", "all:after"]
    );

    mediator.dispatch(rename("bo")).unwrap();
    assert_eq!(
        trace.take(),
        vec!["all:before", "rename:before", "rename:after", "all:after"]
    );
}

#[test]
fn test_short_circuit_skips_inner_behaviors() {
    let trace = Trace::new();

    DispatchTest::new()
        .given_manifest(catalog())
        .given_behavior(BehaviorCategory::Global, RecordingBehavior::new("outer", &trace))
        .given_behavior(BehaviorCategory::Command, ShortCircuit::new(String::from("stub")))
        .given_behavior_with_order(BehaviorCategory::Command, 1, RecordingBehavior::new("inner", &trace))
        .when_command(rename("ada"))
        .then_output(|out| assert_eq!(out, "stub"))
        .run();

    assert_eq!(trace.entries(), vec!["outer:before", "outer:after"]);
}

#[test]
fn test_wrongly_typed_short_circuit_is_outcome_mismatch() {
    DispatchTest::new()
        .given_manifest(catalog())
        .given_behavior(BehaviorCategory::Command, ShortCircuit::new(42_u32))
        .when_command(rename("ada"))
        .then_error(|err| {
            assert!(matches!(err, MediatorError::OutcomeMismatch { .. }), "{err}");
        })
        .run();
}

#[test]
fn test_reject_and_counting_hooks() {
    let hooks = CountingHooks::new();
    let mediator = Mediator::builder()
        .manifest(catalog())
        .behavior(BehaviorCategory::Query, Reject::new("queries are closed"))
        .hooks(hooks.clone())
        .build()
        .unwrap();

    let err = mediator.send(Lookup(1)).unwrap_err();
    assert_eq!(err.to_string(), "queries are closed");
    assert_eq!(mediator.dispatch(rename("ada")).unwrap(), "1=ada");

    assert_eq!(hooks.before_count(), 2);
    assert_eq!(hooks.after_count(), 1);
    assert_eq!(hooks.error_count(), 1);
}
