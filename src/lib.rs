//! Route-based navigation stack engine for column-style UIs.
//!
//! A [`Navigator`] manages an ordered stack of named routes, each backed by
//! a lazily-instantiated view object, and mirrors that stack onto an
//! external [`DisplaySurface`]. Retired cacheable instances are kept in a
//! cost-bounded cache and reused by `(name, data)` identity on the way back.
//!
//! ```no_run
//! use pagestack::{Navigator, RouteDefinition, RouteItem, ViewHandle};
//!
//! # struct Surface;
//! # impl pagestack::DisplaySurface for Surface {
//! #     fn set_views(&mut self, _views: &[ViewHandle]) {}
//! #     fn focus_index(&mut self, _index: usize) {}
//! #     fn current_index(&self) -> usize { 0 }
//! # }
//! # fn main() -> Result<(), pagestack::NavigationError> {
//! let mut navigator = Navigator::builder()
//!     .route(RouteDefinition::new("home", |_data| Ok(ViewHandle::new("home view"))).cacheable(true))
//!     .route(RouteDefinition::new("login", |_data| Ok(ViewHandle::new("login view"))))
//!     .initial_route("home")
//!     .build(Box::new(Surface))?;
//!
//! navigator.push_route(RouteItem::with_data("login", "alice"))?;
//! assert!(navigator.route_active("home")?);
//! navigator.pop_route()?;
//! # Ok(())
//! # }
//! ```

pub mod attachment;
pub mod cache;
pub mod data;
pub mod error;
pub mod navigator;
pub mod request;
pub mod route;
pub mod surface;

#[cfg(test)]
mod test_navigation;

pub use attachment::Attachment;
pub use cache::CacheStats;
pub use error::NavigationError;
pub use navigator::{
    DEFAULT_CACHE_BUDGET, NavigationEvent, Navigator, NavigatorBuilder, WatchedRoute,
};
pub use request::{RouteItem, RouteRequest, ViewTarget};
pub use route::{RouteDefinition, ViewFactory, ViewHandle};
pub use surface::DisplaySurface;
