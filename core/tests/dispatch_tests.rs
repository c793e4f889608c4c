//! Integration tests for dispatch through the public API
//!
//! Covers handler resolution, behavior and middleware ordering, hooks, and
//! application errors crossing the mediator unchanged.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use cqrs_mediator_core::behavior::behavior_fn;
use cqrs_mediator_core::hooks::MediatorHooks;
use cqrs_mediator_core::middleware::middleware_fn;
use cqrs_mediator_core::{
    BehaviorCategory, BehaviorChain, ContextualHandler, Handler, HandlerManifest, HandlerRegistry,
    HandlerResult, Mediator, MediatorError, MiddlewareChain, Outcome, RequestRef, command,
    handler_fn, query,
};
use std::any::Any;
use std::sync::{Arc, Mutex};

// ============================================================================
// Fixtures
// ============================================================================

struct Greet(String);
command!(Greet => String);

struct Withdraw {
    amount: u64,
}
command!(Withdraw => u64);

struct Balance;
query!(Balance => u64);

#[derive(Debug, thiserror::Error)]
#[error("insufficient funds: requested {requested}, available {available}")]
struct InsufficientFunds {
    requested: u64,
    available: u64,
}

struct Account {
    balance: Mutex<u64>,
}

struct WithdrawHandler(Arc<Account>);

impl Handler for WithdrawHandler {
    type Request = Withdraw;

    fn handle(&self, request: &Withdraw) -> HandlerResult<u64> {
        let mut balance = self.0.balance.lock().unwrap();
        if request.amount > *balance {
            return Err(InsufficientFunds {
                requested: request.amount,
                available: *balance,
            }
            .into());
        }
        *balance -= request.amount;
        Ok(*balance)
    }
}

struct BalanceHandler(Arc<Account>);

impl Handler for BalanceHandler {
    type Request = Balance;

    fn handle(&self, _: &Balance) -> HandlerResult<u64> {
        Ok(*self.0.balance.lock().unwrap())
    }
}

fn bank(opening: u64) -> HandlerManifest {
    let account = Arc::new(Account {
        balance: Mutex::new(opening),
    });
    HandlerManifest::new()
        .with(WithdrawHandler(Arc::clone(&account)))
        .with(BalanceHandler(account))
}

type Log = Arc<Mutex<Vec<String>>>;

fn trace(log: &Log, label: &'static str) -> impl cqrs_mediator_core::Behavior {
    let log = Arc::clone(log);
    behavior_fn(move |_, next| {
        log.lock().unwrap().push(format!("{label}>"));
        let outcome = next.run();
        log.lock().unwrap().push(format!("<{label}"));
        outcome
    })
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_greet_then_unregister() {
    let registry = HandlerRegistry::new();
    registry
        .register(handler_fn(|g: &Greet| Ok(format!("hi {}", g.0))))
        .unwrap();
    let mediator = Mediator::new(registry.clone());

    assert_eq!(mediator.dispatch(Greet("sam".into())).unwrap(), "hi sam");

    assert!(registry.unregister::<Greet>());
    let err = mediator.dispatch(Greet("sam".into())).unwrap_err();
    assert!(err.is_handler_not_found());
    assert!(err.to_string().contains("Greet"));
}

#[test]
fn test_lookup_returns_registered_handler_until_unregistered() {
    let registry = HandlerRegistry::new();
    let handler = Arc::new(handler_fn(|_: &Balance| Ok(5)));
    registry.register_shared(Arc::clone(&handler)).unwrap();

    for _ in 0..3 {
        let bound = registry.lookup::<Balance>().unwrap();
        assert_eq!(bound.handle(&Balance).unwrap(), 5);
    }

    registry.unregister::<Balance>();
    assert!(registry.lookup::<Balance>().is_none());
    // only the caller's reference is left
    assert_eq!(Arc::strong_count(&handler), 1);
}

#[test]
fn test_send_unregistered_query() {
    let mediator = Mediator::new(HandlerRegistry::new());
    match mediator.send(Balance) {
        Err(MediatorError::HandlerNotFound { request, kind }) => {
            assert!(request.ends_with("Balance"));
            assert_eq!(kind.as_str(), "query");
        }
        other => panic!("expected HandlerNotFound, got {other:?}"),
    }
}

#[test]
fn test_handlers_registered_after_build_are_visible() {
    let mediator = Mediator::builder().build().unwrap();
    assert!(mediator.send(Balance).is_err());

    mediator
        .registry()
        .register(handler_fn(|_: &Balance| Ok(11)))
        .unwrap();
    assert_eq!(mediator.send(Balance).unwrap(), 11);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_domain_error_reaches_caller_unchanged() {
    let mediator = Mediator::builder().manifest(bank(30)).build().unwrap();

    assert_eq!(mediator.dispatch(Withdraw { amount: 10 }).unwrap(), 20);

    let err = mediator.dispatch(Withdraw { amount: 50 }).unwrap_err();
    let domain = err.downcast_ref::<InsufficientFunds>().expect("domain error");
    assert_eq!(domain.requested, 50);
    assert_eq!(domain.available, 20);
    assert_eq!(
        err.to_string(),
        "insufficient funds: requested 50, available 20"
    );

    assert_eq!(mediator.send(Balance).unwrap(), 20);
}

#[test]
fn test_anyhow_errors_from_handlers() {
    let mediator = Mediator::builder()
        .handler(handler_fn(|g: &Greet| {
            if g.0.is_empty() {
                return Err(anyhow::anyhow!("name must not be empty").into());
            }
            Ok(g.0.clone())
        }))
        .build()
        .unwrap();

    let err = mediator.dispatch(Greet(String::new())).unwrap_err();
    assert_eq!(err.to_string(), "name must not be empty");
}

#[test]
fn test_behavior_error_is_not_rewrapped() {
    let mediator = Mediator::builder()
        .manifest(bank(1))
        .behavior(
            BehaviorCategory::Command,
            behavior_fn(|request, next| {
                if request.downcast_ref::<Withdraw>().is_some_and(|w| w.amount == 0) {
                    return Err(MediatorError::invalid_argument("zero withdrawal"));
                }
                next.run()
            }),
        )
        .build()
        .unwrap();

    let err = mediator.dispatch(Withdraw { amount: 0 }).unwrap_err();
    assert_eq!(err.to_string(), "Invalid argument: zero withdrawal");
    assert!(mediator.send(Balance).is_ok());
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_global_behaviors_wrap_command_behaviors() {
    let log = Log::default();
    let mediator = Mediator::builder()
        .manifest(bank(100))
        .behavior(BehaviorCategory::Command, trace(&log, "C"))
        .behavior(BehaviorCategory::Global, trace(&log, "A"))
        .behavior(BehaviorCategory::Global, trace(&log, "B"))
        .build()
        .unwrap();

    mediator.dispatch(Withdraw { amount: 1 }).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec!["A>", "B>", "C>", "<C", "<B", "<A"]
    );

    log.lock().unwrap().clear();
    mediator.send(Balance).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["A>", "B>", "<B", "<A"]);
}

#[test]
fn test_composed_string_reflects_fold_direction() {
    let mediator = Mediator::builder()
        .handler(handler_fn(|_: &Greet| Ok("X".to_string())))
        .behavior(
            BehaviorCategory::Global,
            behavior_fn(|_, next| {
                let inner = next.run()?.downcast::<String>().unwrap();
                Ok(Outcome::new(format!("[G]{inner}[/G]")))
            }),
        )
        .behavior(
            BehaviorCategory::Command,
            behavior_fn(|_, next| {
                let inner = next.run()?.downcast::<String>().unwrap();
                Ok(Outcome::new(format!("[C]{inner}[/C]")))
            }),
        )
        .build()
        .unwrap();

    assert_eq!(
        mediator.dispatch(Greet(String::new())).unwrap(),
        "[G][C]X[/C][/G]"
    );
}

#[test]
fn test_removed_behavior_skipped_on_next_dispatch() {
    let log = Log::default();
    let chain = BehaviorChain::new();
    let audit = chain.add(BehaviorCategory::Global, trace(&log, "audit"));
    let mediator = Mediator::builder()
        .manifest(bank(5))
        .pipeline(chain.clone())
        .build()
        .unwrap();

    mediator.send(Balance).unwrap();
    assert!(chain.remove(audit));
    mediator.send(Balance).unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["audit>", "<audit"]);
}

#[test]
fn test_short_circuit_returns_without_handler() {
    let calls = Arc::new(Mutex::new(0_u32));
    let counter = Arc::clone(&calls);
    let mediator = Mediator::builder()
        .handler(handler_fn(move |_: &Balance| {
            *counter.lock().unwrap() += 1;
            Ok(1)
        }))
        .behavior(
            BehaviorCategory::Query,
            behavior_fn(|_, _next| Ok(Outcome::new(99_u64))),
        )
        .build()
        .unwrap();

    assert_eq!(mediator.send(Balance).unwrap(), 99);
    assert_eq!(*calls.lock().unwrap(), 0);
}

// ============================================================================
// Middleware
// ============================================================================

#[test]
fn test_middleware_excluded_only_where_not_applicable() {
    let log = Log::default();
    let chain = MiddlewareChain::new();
    let seen = Arc::clone(&log);
    chain.add(middleware_fn(
        |request| request.is::<Withdraw>(),
        move |request, next| {
            seen.lock().unwrap().push(request.request_type().short_name().to_string());
            next.run()
        },
    ));

    let registry = HandlerRegistry::new();
    registry.register_manifest(bank(10)).unwrap();
    let mediator = Mediator::with_pipeline(registry, chain);

    mediator.send(Balance).unwrap();
    mediator.dispatch(Withdraw { amount: 3 }).unwrap();
    mediator.send(Balance).unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["Withdraw"]);
}

#[test]
fn test_middleware_order_is_respected() {
    let log = Log::default();
    let tag = |label: &'static str| {
        let log = Arc::clone(&log);
        middleware_fn(
            |_| true,
            move |_, next| {
                log.lock().unwrap().push(label.to_string());
                next.run()
            },
        )
    };

    let mediator = Mediator::builder()
        .manifest(bank(1))
        .middleware_with_order(20, tag("metrics"))
        .middleware_with_order(-10, tag("auth"))
        .middleware(tag("logging"))
        .build()
        .unwrap();

    mediator.send(Balance).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["auth", "logging", "metrics"]);
}

// ============================================================================
// Contextual dispatch
// ============================================================================

struct Teller {
    name: &'static str,
    limit: u64,
}

#[derive(Debug, thiserror::Error)]
#[error("{teller} may not pay out {amount}")]
struct OverLimit {
    teller: &'static str,
    amount: u64,
}

struct SupervisedWithdraw(Arc<Account>);

impl ContextualHandler for SupervisedWithdraw {
    type Request = Withdraw;
    type Context = Teller;

    fn handle(&self, request: &Withdraw, teller: &Teller) -> HandlerResult<u64> {
        if request.amount > teller.limit {
            return Err(OverLimit {
                teller: teller.name,
                amount: request.amount,
            }
            .into());
        }
        let mut balance = self.0.balance.lock().unwrap();
        *balance = balance.saturating_sub(request.amount);
        Ok(*balance)
    }
}

#[test]
fn test_context_reaches_contextual_handler_through_behaviors() {
    let account = Arc::new(Account {
        balance: Mutex::new(100),
    });
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mediator = {
        let seen = Arc::clone(&seen);
        Mediator::builder()
            .handler(BalanceHandler(Arc::clone(&account)))
            .contextual_handler(SupervisedWithdraw(Arc::clone(&account)))
            .behavior(
                BehaviorCategory::Global,
                behavior_fn(move |request, next| {
                    seen.lock().unwrap().push(request.kind().to_string());
                    next.run()
                }),
            )
            .build()
            .unwrap()
    };
    let teller = Teller {
        name: "kim",
        limit: 50,
    };

    assert_eq!(mediator.dispatch_with(Withdraw { amount: 30 }, &teller).unwrap(), 70);

    let err = mediator
        .dispatch_with(Withdraw { amount: 60 }, &teller)
        .unwrap_err();
    let over = err.downcast_ref::<OverLimit>().unwrap();
    assert_eq!((over.teller, over.amount), ("kim", 60));

    // the plain balance query ignores the teller
    assert_eq!(mediator.send_with(Balance, &teller).unwrap(), 70);
    assert!(mediator.dispatch(Withdraw { amount: 1 }).unwrap_err().is_handler_not_found());

    // lookup fails before the chain runs, so the last dispatch is not seen
    assert_eq!(*seen.lock().unwrap(), vec!["command", "command", "query"]);
}

// ============================================================================
// Hooks
// ============================================================================

#[derive(Default)]
struct Lifecycle {
    events: Mutex<Vec<String>>,
}

#[derive(Clone, Default)]
struct LifecycleHooks(Arc<Lifecycle>);

impl MediatorHooks for LifecycleHooks {
    fn before(&self, request: RequestRef<'_>) {
        self.0
            .events
            .lock()
            .unwrap()
            .push(format!("before:{}", request.kind()));
    }

    fn after(&self, _: RequestRef<'_>, output: &dyn Any) {
        let balance = output.downcast_ref::<u64>().copied();
        self.0.events.lock().unwrap().push(format!("after:{balance:?}"));
    }

    fn on_error(&self, _: RequestRef<'_>, error: &MediatorError) {
        let kind = if error.downcast_ref::<InsufficientFunds>().is_some() {
            "funds"
        } else {
            "other"
        };
        self.0.events.lock().unwrap().push(format!("error:{kind}"));
    }
}

#[test]
fn test_hooks_observe_without_changing_outcome() {
    let hooks = LifecycleHooks::default();
    let mediator = Mediator::builder()
        .manifest(bank(10))
        .hooks(hooks.clone())
        .build()
        .unwrap();

    assert_eq!(mediator.dispatch(Withdraw { amount: 4 }).unwrap(), 6);
    assert!(mediator.dispatch(Withdraw { amount: 40 }).is_err());
    assert!(mediator.dispatch(Greet("x".into())).is_err());

    assert_eq!(
        *hooks.0.events.lock().unwrap(),
        vec![
            "before:command",
            "after:Some(6)",
            "before:command",
            "error:funds",
            "before:command",
            "error:other",
        ]
    );
}
