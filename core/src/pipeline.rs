//! Behavior and middleware pipelines
//!
//! This module provides the two composition styles and the sum type the
//! mediator holds:
//! - **[`BehaviorChain`]**: global behaviors, then command- or query-specific ones
//! - **[`MiddlewareChain`]**: one ordered list, filtered per request by `applies`
//! - **[`Pipeline`]**: no pipeline, a behavior chain, or a middleware chain
//!
//! Both chains keep their entries sorted by `order` (lower runs outer), ties
//! broken by registration order. The active list is snapshotted under a single
//! read lock at the start of each dispatch and the lock is released before
//! anything in the chain runs, so registrations made meanwhile apply from the
//! next dispatch on.

use crate::behavior::{Behavior, BehaviorCategory, DEFAULT_ORDER};
use crate::composition::{ActiveChain, Link, Outcome, Terminal, run_chain};
use crate::error::Result;
use crate::middleware::Middleware;
use crate::request::{RequestKind, RequestRef};
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Identifies a registered behavior or middleware so it can be removed later.
///
/// Ids are unique across every chain in the process, so an id handed to the
/// wrong chain matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BehaviorId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl BehaviorId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

struct Entry<T: ?Sized> {
    id: BehaviorId,
    order: i32,
    item: Arc<T>,
}

impl<T: ?Sized> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            order: self.order,
            item: Arc::clone(&self.item),
        }
    }
}

/// Insert after every entry with an order `<=` the new one, which keeps ties
/// in registration order.
fn insert_ordered<T: ?Sized>(list: &mut Vec<Entry<T>>, entry: Entry<T>) {
    let position = list.partition_point(|existing| existing.order <= entry.order);
    list.insert(position, entry);
}

fn remove_by_id<T: ?Sized>(list: &mut Vec<Entry<T>>, id: BehaviorId) -> bool {
    let before = list.len();
    list.retain(|entry| entry.id != id);
    list.len() != before
}

#[derive(Default)]
struct BehaviorLists {
    global: Vec<Entry<dyn Behavior>>,
    command: Vec<Entry<dyn Behavior>>,
    query: Vec<Entry<dyn Behavior>>,
}

impl BehaviorLists {
    fn list_mut(&mut self, category: BehaviorCategory) -> &mut Vec<Entry<dyn Behavior>> {
        match category {
            BehaviorCategory::Global => &mut self.global,
            BehaviorCategory::Command => &mut self.command,
            BehaviorCategory::Query => &mut self.query,
        }
    }

    fn list(&self, category: BehaviorCategory) -> &[Entry<dyn Behavior>] {
        match category {
            BehaviorCategory::Global => &self.global,
            BehaviorCategory::Command => &self.command,
            BehaviorCategory::Query => &self.query,
        }
    }
}

/// Categorised behavior pipeline
///
/// For a command the active list is every global behavior followed by every
/// command behavior; for a query, globals followed by query behaviors. The
/// first active behavior is the outermost wrapper.
///
/// Cloning yields a handle to the same behavior lists.
///
/// ## Example
///
/// ```
/// use cqrs_mediator_core::behavior::{behavior_fn, BehaviorCategory};
/// use cqrs_mediator_core::pipeline::BehaviorChain;
///
/// let chain = BehaviorChain::new();
/// let id = chain.add(BehaviorCategory::Global, behavior_fn(|_, next| next.run()));
/// assert_eq!(chain.len(), 1);
/// assert!(chain.remove(id));
/// assert!(chain.is_empty());
/// ```
#[derive(Clone, Default)]
pub struct BehaviorChain {
    lists: Arc<RwLock<BehaviorLists>>,
}

impl BehaviorChain {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a behavior with [`DEFAULT_ORDER`]
    pub fn add<B: Behavior>(&self, category: BehaviorCategory, behavior: B) -> BehaviorId {
        self.add_shared(category, DEFAULT_ORDER, Arc::new(behavior))
    }

    /// Register a behavior with an explicit order (lower runs outer)
    pub fn add_with_order<B: Behavior>(&self, category: BehaviorCategory, order: i32, behavior: B) -> BehaviorId {
        self.add_shared(category, order, Arc::new(behavior))
    }

    /// Register a shared behavior with an explicit order
    pub fn add_shared(&self, category: BehaviorCategory, order: i32, behavior: Arc<dyn Behavior>) -> BehaviorId {
        let name = behavior.name();
        let id = BehaviorId::next();
        let mut lists = self.write();
        insert_ordered(
            lists.list_mut(category),
            Entry {
                id,
                order,
                item: behavior,
            },
        );
        drop(lists);

        tracing::debug!(behavior = name, ?category, order, "Registered behavior");
        id
    }

    /// Remove a behavior; returns `false` if the id is unknown
    pub fn remove(&self, id: BehaviorId) -> bool {
        let mut lists = self.write();
        remove_by_id(&mut lists.global, id)
            || remove_by_id(&mut lists.command, id)
            || remove_by_id(&mut lists.query, id)
    }

    /// Names of the behaviors in `category`, in execution order
    #[must_use]
    pub fn names(&self, category: BehaviorCategory) -> Vec<&'static str> {
        self.read()
            .list(category)
            .iter()
            .map(|entry| entry.item.name())
            .collect()
    }

    /// Total number of registered behaviors
    #[must_use]
    pub fn len(&self) -> usize {
        let lists = self.read();
        lists.global.len() + lists.command.len() + lists.query.len()
    }

    /// `true` when no behavior is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every behavior
    pub fn clear(&self) {
        let mut lists = self.write();
        lists.global.clear();
        lists.command.clear();
        lists.query.clear();
    }

    /// Run `request` through the active behaviors and then `terminal`
    ///
    /// # Errors
    ///
    /// Propagates the first error raised by a behavior or by `terminal`.
    pub fn execute(&self, request: RequestRef<'_>, terminal: &Terminal<'_>) -> Result<Outcome> {
        let links = self.active(request.kind());
        run_chain(request, &links, terminal)
    }

    fn active(&self, kind: RequestKind) -> ActiveChain {
        let lists = self.read();
        let specific = lists.list(BehaviorCategory::for_kind(kind));
        let mut links = SmallVec::with_capacity(lists.global.len() + specific.len());
        links.extend(
            lists
                .global
                .iter()
                .chain(specific)
                .map(|entry| Link::Behavior(Arc::clone(&entry.item))),
        );
        links
    }

    fn read(&self) -> RwLockReadGuard<'_, BehaviorLists> {
        self.lists.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BehaviorLists> {
        self.lists.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for BehaviorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorChain")
            .field("global", &self.names(BehaviorCategory::Global))
            .field("command", &self.names(BehaviorCategory::Command))
            .field("query", &self.names(BehaviorCategory::Query))
            .finish()
    }
}

#[derive(Default)]
struct MiddlewareList {
    entries: Vec<Entry<dyn Middleware>>,
}

/// Ordered middleware pipeline filtered per request
///
/// Every dispatch snapshots the ordered list, releases the lock, then keeps
/// only the middleware whose [`Middleware::applies`] returns `true`,
/// preserving relative order.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    list: Arc<RwLock<MiddlewareList>>,
}

impl MiddlewareChain {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register middleware with [`DEFAULT_ORDER`]
    pub fn add<M: Middleware>(&self, middleware: M) -> BehaviorId {
        self.add_shared(DEFAULT_ORDER, Arc::new(middleware))
    }

    /// Register middleware with an explicit order (lower runs outer)
    pub fn add_with_order<M: Middleware>(&self, order: i32, middleware: M) -> BehaviorId {
        self.add_shared(order, Arc::new(middleware))
    }

    /// Register shared middleware with an explicit order
    pub fn add_shared(&self, order: i32, middleware: Arc<dyn Middleware>) -> BehaviorId {
        let name = middleware.name();
        let id = BehaviorId::next();
        let mut list = self.write();
        insert_ordered(
            &mut list.entries,
            Entry {
                id,
                order,
                item: middleware,
            },
        );
        drop(list);

        tracing::debug!(middleware = name, order, "Registered middleware");
        id
    }

    /// Remove middleware; returns `false` if the id is unknown
    pub fn remove(&self, id: BehaviorId) -> bool {
        remove_by_id(&mut self.write().entries, id)
    }

    /// Names of all registered middleware, in execution order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.read()
            .entries
            .iter()
            .map(|entry| entry.item.name())
            .collect()
    }

    /// Number of registered middleware
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// `true` when no middleware is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all middleware
    pub fn clear(&self) {
        self.write().entries.clear();
    }

    /// Run `request` through the applicable middleware and then `terminal`
    ///
    /// # Errors
    ///
    /// Propagates the first error raised by a middleware or by `terminal`.
    pub fn execute(&self, request: RequestRef<'_>, terminal: &Terminal<'_>) -> Result<Outcome> {
        let links = self.active(&request);
        run_chain(request, &links, terminal)
    }

    fn active(&self, request: &RequestRef<'_>) -> ActiveChain {
        let snapshot: SmallVec<[Arc<dyn Middleware>; 8]> = self
            .read()
            .entries
            .iter()
            .map(|entry| Arc::clone(&entry.item))
            .collect();

        snapshot
            .into_iter()
            .filter(|middleware| middleware.applies(request))
            .map(Link::Middleware)
            .collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, MiddlewareList> {
        self.list.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MiddlewareList> {
        self.list.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("middleware", &self.names())
            .finish()
    }
}

/// How the mediator executes a resolved handler.
#[derive(Clone, Debug, Default)]
pub enum Pipeline {
    /// Call the handler directly
    #[default]
    Direct,
    /// Wrap the handler in categorised behaviors
    Behaviors(BehaviorChain),
    /// Wrap the handler in applicable middleware
    Middleware(MiddlewareChain),
}

impl Pipeline {
    /// Run `request` through this pipeline and then `terminal`
    ///
    /// # Errors
    ///
    /// Propagates the first error raised inside the pipeline or by `terminal`.
    pub fn execute(&self, request: RequestRef<'_>, terminal: &Terminal<'_>) -> Result<Outcome> {
        match self {
            Self::Direct => terminal(),
            Self::Behaviors(chain) => chain.execute(request, terminal),
            Self::Middleware(chain) => chain.execute(request, terminal),
        }
    }

    /// Active links for one dispatch; empty for [`Pipeline::Direct`].
    pub(crate) fn active(&self, request: &RequestRef<'_>) -> ActiveChain {
        match self {
            Self::Direct => ActiveChain::new(),
            Self::Behaviors(chain) => chain.active(request.kind()),
            Self::Middleware(chain) => chain.active(request),
        }
    }
}

impl From<BehaviorChain> for Pipeline {
    fn from(chain: BehaviorChain) -> Self {
        Self::Behaviors(chain)
    }
}

impl From<MiddlewareChain> for Pipeline {
    fn from(chain: MiddlewareChain) -> Self {
        Self::Middleware(chain)
    }
}
