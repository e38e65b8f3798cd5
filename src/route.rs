//! Route definitions, the ordered definition table, and stack entries.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use anyhow::Result;
use serde_json::Value;

use crate::error::NavigationError;

/// Shared, type-erased handle to a view instance.
///
/// The engine treats view contents as opaque: it creates handles through
/// route factories, hands them to the display surface, and drops them when
/// an entry is retired without being cached. Consumers downcast to their
/// concrete view type. Identity (`ptr_eq`) is the equality the engine uses
/// for views; the handle is `Rc`-based because the engine runs on one
/// logical UI thread.
#[derive(Clone)]
pub struct ViewHandle(Rc<dyn Any>);

impl ViewHandle {
    pub fn new<T: Any>(view: T) -> Self {
        ViewHandle(Rc::new(view))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    /// Whether two handles refer to the same view instance.
    pub fn ptr_eq(&self, other: &ViewHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ViewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewHandle({:p})", Rc::as_ptr(&self.0))
    }
}

/// Trait for creating view instances (factory pattern for lazy
/// instantiation).
///
/// Construction is synchronous and may run arbitrary setup code; failures
/// propagate to the navigation call site and never leave a partially-applied
/// stack. Implemented for free by closures of the same shape.
pub trait ViewFactory {
    /// Create a view instance, receiving the request's associated data.
    fn create(&self, data: Option<&Value>) -> Result<ViewHandle>;
}

impl<F> ViewFactory for F
where
    F: Fn(Option<&Value>) -> Result<ViewHandle>,
{
    fn create(&self, data: Option<&Value>) -> Result<ViewHandle> {
        self(data)
    }
}

/// A named template for producing views, with caching policy and cost.
pub struct RouteDefinition {
    name: String,
    factory: Box<dyn ViewFactory>,
    cacheable: bool,
    cost: u32,
}

impl RouteDefinition {
    /// A definition with caching disabled and cost 1.
    ///
    /// The closure-friendly constructor; use `with_factory` to supply a
    /// `ViewFactory` implementation instead.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Option<&Value>) -> Result<ViewHandle> + 'static,
    {
        Self::with_factory(name, factory)
    }

    pub fn with_factory(name: impl Into<String>, factory: impl ViewFactory + 'static) -> Self {
        Self {
            name: name.into(),
            factory: Box::new(factory),
            cacheable: false,
            cost: 1,
        }
    }

    /// Whether retired instances of this route may be kept in the instance
    /// cache for reuse.
    pub fn cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    /// How expensive instances of this route are to retain, weighed against
    /// the cache budget. Values below 1 are clamped to 1.
    pub fn cost(mut self, cost: u32) -> Self {
        self.cost = cost.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    pub fn cost_weight(&self) -> u32 {
        self.cost
    }

    pub(crate) fn construct(&self, data: Option<&Value>) -> Result<ViewHandle, NavigationError> {
        self.factory
            .create(data)
            .map_err(|source| NavigationError::ViewConstructionFailed {
                route: self.name.clone(),
                source,
            })
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("name", &self.name)
            .field("cacheable", &self.cacheable)
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

/// Static, ordered collection of route definitions.
///
/// Populated once through `NavigatorBuilder` before navigation begins; the
/// builder is consumed by `build`, so no mutating access exists afterward.
#[derive(Debug, Default)]
pub(crate) struct RouteTable {
    routes: Vec<RouteDefinition>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Append a definition. Later duplicates of a name are shadowed for
    /// lookup but still stored.
    pub fn register(&mut self, definition: RouteDefinition) {
        log::debug!(
            "Registered route '{}' (cacheable: {}, cost: {})",
            definition.name(),
            definition.is_cacheable(),
            definition.cost_weight()
        );
        self.routes.push(definition);
    }

    /// First definition with the given name, in registration order.
    pub fn lookup(&self, name: &str) -> Option<&RouteDefinition> {
        self.routes.iter().find(|route| route.name() == name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }
}

/// A concrete navigation-stack entry: a route name bound to optional
/// associated data and a realized view handle.
///
/// Exclusively owned by either the live stack or the instance cache;
/// ownership moves through the cache's `try_take`/`offer` operations.
#[derive(Debug)]
pub(crate) struct ParsedRoute {
    pub name: String,
    pub data_id: Option<u32>,
    pub cacheable: bool,
    pub cost: u32,
    pub view: ViewHandle,
}

impl ParsedRoute {
    pub fn matches(&self, name: &str, data_id: Option<u32>) -> bool {
        self.name == name && self.data_id == data_id
    }
}
