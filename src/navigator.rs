//! The navigation stack controller.
//!
//! A `Navigator` owns the live ordered sequence of parsed routes and keeps
//! it mirrored 1:1 onto the display surface. Every mutation resolves its
//! request completely before the stack is touched, retires dropped entries
//! through the instance cache, and emits exactly one `NavigationEvent` once
//! the invariant is restored.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{CacheStats, ViewCache};
use crate::data::DataRegistry;
use crate::error::NavigationError;
use crate::request::{RouteItem, RouteRequest, ViewTarget};
use crate::route::{ParsedRoute, RouteDefinition, RouteTable, ViewHandle};
use crate::surface::DisplaySurface;

/// Default retention budget of the instance cache.
pub const DEFAULT_CACHE_BUDGET: u32 = 100;

/// Emitted after each mutating operation, once the stack invariant is
/// restored. Subscribers are invoked synchronously, in subscription order.
/// Serializable so hosts can forward events onto an application event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationEvent {
    /// The stack was fully replaced by `navigate_to_route`.
    Navigated,

    /// `count` entries were appended starting at `index`.
    Pushed { index: usize, count: usize },

    /// `count` entries were removed from `index` to the end.
    Popped { index: usize, count: usize },

    /// Entries at positions >= `index` were replaced by `count` new ones.
    ReplacedFrom { index: usize, count: usize },
}

/// Shared predicate state for a watched route.
///
/// The owning navigator recomputes the value after every mutation, before
/// the corresponding event is emitted; dropping the handle retires the
/// watch.
#[derive(Debug, Clone)]
pub struct WatchedRoute {
    active: Rc<Cell<bool>>,
}

impl WatchedRoute {
    /// Whether the watched route is currently active on the stack.
    pub fn is_active(&self) -> bool {
        self.active.get()
    }
}

struct WatchEntry {
    candidates: Vec<(String, Option<u32>)>,
    state: Weak<Cell<bool>>,
}

/// A resolved stack entry plus where it came from, so a failed request can
/// be rolled back without losing cached instances.
struct Resolved {
    route: ParsedRoute,
    from_cache: bool,
}

/// Builder for a `Navigator`.
///
/// Route definitions are registered here, in order, before navigation
/// begins; `build` consumes the builder, so the definition table is
/// immutable for the navigator's lifetime.
pub struct NavigatorBuilder {
    table: RouteTable,
    cache_budget: u32,
    initial_route: Option<RouteRequest>,
}

impl NavigatorBuilder {
    pub fn new() -> Self {
        Self {
            table: RouteTable::new(),
            cache_budget: DEFAULT_CACHE_BUDGET,
            initial_route: None,
        }
    }

    /// Register a route definition. Order is significant: lookups return the
    /// first match.
    pub fn route(mut self, definition: RouteDefinition) -> Self {
        self.table.register(definition);
        self
    }

    /// Set the instance cache's total cost budget.
    pub fn cache_budget(mut self, budget: u32) -> Self {
        self.cache_budget = budget;
        self
    }

    /// Route to install when the navigator is built. Without one, the first
    /// `navigate_to_route` call initializes the navigator instead.
    pub fn initial_route(mut self, route: impl Into<RouteRequest>) -> Self {
        self.initial_route = Some(route.into());
        self
    }

    /// Build the navigator, performing the initial navigation if an initial
    /// route was supplied.
    pub fn build(self, surface: Box<dyn DisplaySurface>) -> Result<Navigator, NavigationError> {
        let NavigatorBuilder {
            table,
            cache_budget,
            initial_route,
        } = self;

        let mut navigator = Navigator {
            table,
            registry: RefCell::new(DataRegistry::new()),
            cache: ViewCache::new(cache_budget),
            surface,
            stack: Vec::new(),
            initialized: false,
            subscribers: Vec::new(),
            watches: Vec::new(),
        };

        log::info!(
            "Navigator built with {} route definitions (cache budget {})",
            navigator.table.len(),
            cache_budget
        );

        if let Some(request) = initial_route {
            navigator.replace_stack(request)?;
        }
        Ok(navigator)
    }
}

impl Default for NavigatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the live navigation stack and coordinates the route table, data
/// registry, instance cache and display surface.
pub struct Navigator {
    table: RouteTable,
    registry: RefCell<DataRegistry>,
    cache: ViewCache,
    surface: Box<dyn DisplaySurface>,
    stack: Vec<ParsedRoute>,
    initialized: bool,
    subscribers: Vec<Box<dyn FnMut(&NavigationEvent)>>,
    watches: Vec<WatchEntry>,
}

impl Navigator {
    pub fn builder() -> NavigatorBuilder {
        NavigatorBuilder::new()
    }

    /// Replace the whole stack with the given route.
    ///
    /// Current entries matching the incoming items position-for-position by
    /// `(name, data id)` are kept, identity preserved; the rest resolve
    /// through the cache or their factory. Dropped entries retire per their
    /// cache flag. Also the operation that initializes a navigator built
    /// without an initial route.
    pub fn navigate_to_route(
        &mut self,
        route: impl Into<RouteRequest>,
    ) -> Result<(), NavigationError> {
        self.replace_stack(route.into())
    }

    /// Append the given route to the end of the stack.
    ///
    /// On an uninitialized navigator this is equivalent to
    /// `navigate_to_route`.
    pub fn push_route(&mut self, route: impl Into<RouteRequest>) -> Result<(), NavigationError> {
        let request = route.into();
        if !self.initialized {
            return self.replace_stack(request);
        }
        if request.is_empty() {
            return Err(NavigationError::MalformedRequest(
                "a push request needs at least one item".into(),
            ));
        }

        let resolved = self.resolve_request(&request)?;
        let index = self.stack.len();
        let count = resolved.len();
        self.stack.extend(resolved.into_iter().map(|entry| entry.route));

        self.finish_mutation(NavigationEvent::Pushed { index, count });
        Ok(())
    }

    /// Replace the entries at positions >= `index` with the given route.
    ///
    /// `index == len` is a plain append. The replaced entries retire per
    /// their cache flag.
    pub fn push_from_here(
        &mut self,
        index: usize,
        route: impl Into<RouteRequest>,
    ) -> Result<(), NavigationError> {
        self.ensure_initialized()?;
        let len = self.stack.len();
        if index > len {
            return Err(NavigationError::IndexOutOfRange { index, len });
        }
        let request = route.into();
        if request.is_empty() {
            return Err(NavigationError::MalformedRequest(
                "a push request needs at least one item".into(),
            ));
        }

        let resolved = self.resolve_request(&request)?;
        let dropped: Vec<ParsedRoute> = self.stack.drain(index..).collect();
        let count = resolved.len();
        self.stack.extend(resolved.into_iter().map(|entry| entry.route));

        let active = self.active_data_ids();
        for route in dropped {
            self.retire(route, &active);
        }

        self.finish_mutation(NavigationEvent::ReplacedFrom { index, count });
        Ok(())
    }

    /// Remove the last entry. Popping the root is an error.
    pub fn pop_route(&mut self) -> Result<(), NavigationError> {
        self.ensure_initialized()?;
        if self.stack.len() <= 1 {
            return Err(NavigationError::EmptyStackOperation);
        }

        let Some(dropped) = self.stack.pop() else {
            return Err(NavigationError::EmptyStackOperation);
        };
        let index = self.stack.len();
        let active = self.active_data_ids();
        self.retire(dropped, &active);

        self.finish_mutation(NavigationEvent::Popped { index, count: 1 });
        Ok(())
    }

    /// Remove the entries at positions >= `index`.
    ///
    /// `index == 0` would empty the stack and is rejected; `index == len`
    /// removes nothing and emits nothing.
    pub fn pop_from_here(&mut self, index: usize) -> Result<(), NavigationError> {
        self.ensure_initialized()?;
        let len = self.stack.len();
        if index == 0 {
            return Err(NavigationError::EmptyStackOperation);
        }
        if index > len {
            return Err(NavigationError::IndexOutOfRange { index, len });
        }
        if index == len {
            return Ok(());
        }

        let dropped: Vec<ParsedRoute> = self.stack.drain(index..).collect();
        let count = dropped.len();
        let active = self.active_data_ids();
        for route in dropped {
            self.retire(route, &active);
        }

        self.finish_mutation(NavigationEvent::Popped { index, count });
        Ok(())
    }

    /// Whether the given route matches the stack starting at the root.
    ///
    /// True only if every candidate item matches the stack entry at the same
    /// position by `(name, data id)`. A request longer than the stack, or any
    /// mismatch, is false; matching never starts at a non-zero offset.
    pub fn route_active(&self, route: impl Into<RouteRequest>) -> Result<bool, NavigationError> {
        self.ensure_initialized()?;
        let request = route.into();
        if request.is_empty() {
            return Err(NavigationError::MalformedRequest(
                "an active-route check needs at least one item".into(),
            ));
        }
        let candidates = self.intern_candidates(&request);
        Ok(self.candidates_active(&candidates))
    }

    /// Focus the display surface on the first entry matching `target`.
    ///
    /// The stack and the cache are untouched.
    pub fn bring_to_view(&mut self, target: impl Into<ViewTarget>) -> Result<(), NavigationError> {
        self.ensure_initialized()?;
        let index = match target.into() {
            ViewTarget::Index(index) => {
                let len = self.stack.len();
                if index >= len {
                    return Err(NavigationError::IndexOutOfRange { index, len });
                }
                index
            }
            ViewTarget::Name(name) => self
                .stack
                .iter()
                .position(|route| route.name == name)
                .ok_or(NavigationError::NoMatchingEntry)?,
            ViewTarget::NameAndData { name, data } => {
                let data_id = self.registry.borrow_mut().intern(&data);
                self.stack
                    .iter()
                    .position(|route| route.matches(&name, Some(data_id)))
                    .ok_or(NavigationError::NoMatchingEntry)?
            }
        };

        self.surface.focus_index(index);
        Ok(())
    }

    /// Serialize the stack back into the request shape, order preserved.
    pub fn current_routes(&self) -> Result<RouteRequest, NavigationError> {
        self.ensure_initialized()?;
        let registry = self.registry.borrow();
        Ok(self
            .stack
            .iter()
            .map(|route| {
                match route.data_id.and_then(|id| registry.value_of(id)) {
                    Some(data) => RouteItem::with_data(route.name.clone(), data.clone()),
                    None => RouteItem::Name(route.name.clone()),
                }
            })
            .collect())
    }

    /// Register a predicate over the given route, recomputed after every
    /// mutation. May be registered before initialization; the watch reports
    /// inactive until the initial route is installed.
    pub fn watch_route(
        &mut self,
        route: impl Into<RouteRequest>,
    ) -> Result<WatchedRoute, NavigationError> {
        let request = route.into();
        if request.is_empty() {
            return Err(NavigationError::MalformedRequest(
                "a watched route needs at least one item".into(),
            ));
        }
        let candidates = self.intern_candidates(&request);
        let state = Rc::new(Cell::new(
            self.initialized && self.candidates_active(&candidates),
        ));
        self.watches.push(WatchEntry {
            candidates,
            state: Rc::downgrade(&state),
        });
        Ok(WatchedRoute { active: state })
    }

    /// Register a navigation-event observer, invoked synchronously after
    /// each mutation.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&NavigationEvent) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of entries on the stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The view handle at a stack position.
    pub fn view_at(&self, index: usize) -> Option<&ViewHandle> {
        self.stack.get(index).map(|route| &route.view)
    }

    /// Index the display surface currently reports as focused.
    pub fn focused_index(&self) -> Result<usize, NavigationError> {
        self.ensure_initialized()?;
        Ok(self.surface.current_index())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cached instance; used on full teardown.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub(crate) fn ensure_initialized(&self) -> Result<(), NavigationError> {
        if self.initialized {
            Ok(())
        } else {
            Err(NavigationError::Uninitialized)
        }
    }

    pub(crate) fn index_of_view(&self, view: &ViewHandle) -> Option<usize> {
        self.stack.iter().position(|route| route.view.ptr_eq(view))
    }

    pub(crate) fn data_at(&self, index: usize) -> Option<Value> {
        let route = self.stack.get(index)?;
        let registry = self.registry.borrow();
        route
            .data_id
            .and_then(|id| registry.value_of(id).cloned())
    }

    fn replace_stack(&mut self, request: RouteRequest) -> Result<(), NavigationError> {
        if request.is_empty() {
            return Err(NavigationError::MalformedRequest(
                "a replace request needs at least one item".into(),
            ));
        }

        enum Slot {
            Reuse(usize),
            Fresh(Resolved),
        }

        // Resolve everything before touching the stack, so a failure leaves
        // the previous stack installed.
        let mut plan: Vec<Slot> = Vec::with_capacity(request.len());
        for (position, item) in request.items().iter().enumerate() {
            let data_id = self.intern_item_data(item);
            let reusable = self
                .stack
                .get(position)
                .is_some_and(|current| current.matches(item.name(), data_id));
            if reusable {
                plan.push(Slot::Reuse(position));
                continue;
            }

            match self.resolve(item.name(), data_id) {
                Ok(resolved) => plan.push(Slot::Fresh(resolved)),
                Err(error) => {
                    let recovered = plan
                        .into_iter()
                        .filter_map(|slot| match slot {
                            Slot::Fresh(resolved) => Some(resolved),
                            Slot::Reuse(_) => None,
                        })
                        .collect();
                    self.rollback(recovered);
                    return Err(error);
                }
            }
        }

        let mut old: Vec<Option<ParsedRoute>> = std::mem::take(&mut self.stack)
            .into_iter()
            .map(Some)
            .collect();
        let mut next = Vec::with_capacity(plan.len());
        for slot in plan {
            match slot {
                // Each position is planned at most once, at its own index.
                Slot::Reuse(position) => {
                    next.push(old[position].take().expect("stack entry reused twice"))
                }
                Slot::Fresh(resolved) => next.push(resolved.route),
            }
        }
        self.stack = next;
        self.initialized = true;

        let active = self.active_data_ids();
        for dropped in old.into_iter().flatten() {
            self.retire(dropped, &active);
        }

        self.finish_mutation(NavigationEvent::Navigated);
        Ok(())
    }

    /// Look up the definition and produce a stack entry, reusing a cached
    /// instance when one exists.
    fn resolve(&mut self, name: &str, data_id: Option<u32>) -> Result<Resolved, NavigationError> {
        let definition = self
            .table
            .lookup(name)
            .ok_or_else(|| NavigationError::RouteNotFound(name.to_string()))?;

        if let Some(route) = self.cache.try_take(name, data_id) {
            return Ok(Resolved {
                route,
                from_cache: true,
            });
        }

        let data = data_id.and_then(|id| self.registry.borrow().value_of(id).cloned());
        let view = definition.construct(data.as_ref())?;
        log::info!("Created view for route '{name}'");
        Ok(Resolved {
            route: ParsedRoute {
                name: name.to_string(),
                data_id,
                cacheable: definition.is_cacheable(),
                cost: definition.cost_weight(),
                view,
            },
            from_cache: false,
        })
    }

    /// Resolve every item of a request, rolling back on the first failure:
    /// cache-taken instances go back to the cache, fresh ones are dropped.
    fn resolve_request(&mut self, request: &RouteRequest) -> Result<Vec<Resolved>, NavigationError> {
        let mut resolved = Vec::with_capacity(request.len());
        for item in request.items() {
            let data_id = self.intern_item_data(item);
            match self.resolve(item.name(), data_id) {
                Ok(entry) => resolved.push(entry),
                Err(error) => {
                    self.rollback(resolved);
                    return Err(error);
                }
            }
        }
        Ok(resolved)
    }

    fn rollback(&mut self, resolved: Vec<Resolved>) {
        let active = self.active_data_ids();
        for entry in resolved {
            if entry.from_cache {
                self.cache.offer(entry.route, &active);
            }
            // Freshly constructed handles are dropped here, unused.
        }
    }

    fn retire(&mut self, route: ParsedRoute, active: &HashSet<u32>) {
        if route.cacheable {
            self.cache.offer(route, active);
        } else {
            log::debug!("Destroying view for non-cacheable route '{}'", route.name);
        }
    }

    fn intern_item_data(&self, item: &RouteItem) -> Option<u32> {
        item.data().map(|data| self.registry.borrow_mut().intern(data))
    }

    fn intern_candidates(&self, request: &RouteRequest) -> Vec<(String, Option<u32>)> {
        request
            .items()
            .iter()
            .map(|item| (item.name().to_string(), self.intern_item_data(item)))
            .collect()
    }

    fn candidates_active(&self, candidates: &[(String, Option<u32>)]) -> bool {
        if candidates.is_empty() || candidates.len() > self.stack.len() {
            return false;
        }
        candidates
            .iter()
            .enumerate()
            .all(|(position, (name, data_id))| self.stack[position].matches(name, *data_id))
    }

    fn active_data_ids(&self) -> HashSet<u32> {
        self.stack.iter().filter_map(|route| route.data_id).collect()
    }

    fn finish_mutation(&mut self, event: NavigationEvent) {
        self.sync_surface();
        self.recompute_watches();
        self.emit(event);
    }

    fn sync_surface(&mut self) {
        let views: Vec<ViewHandle> = self.stack.iter().map(|route| route.view.clone()).collect();
        self.surface.set_views(&views);
    }

    fn recompute_watches(&mut self) {
        self.watches.retain(|watch| watch.state.strong_count() > 0);
        for watch in &self.watches {
            if let Some(state) = watch.state.upgrade() {
                state.set(self.candidates_active(&watch.candidates));
            }
        }
    }

    fn emit(&mut self, event: NavigationEvent) {
        for subscriber in &mut self.subscribers {
            subscriber(&event);
        }
    }
}
