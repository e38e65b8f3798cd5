//! Stack-position context for views embedded in the stack.

use serde_json::Value;

use crate::error::NavigationError;
use crate::navigator::{Navigator, WatchedRoute};
use crate::request::{RouteRequest, ViewTarget};
use crate::route::ViewHandle;

/// Context handle tying a view instance to its navigation-stack entry.
///
/// Obtained from `Navigator::attachment_for` and passed into child
/// components explicitly. The entry is re-resolved by view identity on
/// every use, so a stale attachment fails with `ViewNotAttached` instead of
/// acting on the wrong position.
#[derive(Debug, Clone)]
pub struct Attachment {
    view: ViewHandle,
}

impl Navigator {
    /// Resolve the stack entry a view instance belongs to.
    pub fn attachment_for(&self, view: &ViewHandle) -> Result<Attachment, NavigationError> {
        self.ensure_initialized()?;
        if self.index_of_view(view).is_none() {
            return Err(NavigationError::ViewNotAttached);
        }
        Ok(Attachment { view: view.clone() })
    }
}

impl Attachment {
    pub fn view(&self) -> &ViewHandle {
        &self.view
    }

    /// Current stack index of this attachment's entry.
    pub fn index(&self, navigator: &Navigator) -> Result<usize, NavigationError> {
        navigator
            .index_of_view(&self.view)
            .ok_or(NavigationError::ViewNotAttached)
    }

    /// Associated data of this attachment's entry, if any.
    pub fn data(&self, navigator: &Navigator) -> Result<Option<Value>, NavigationError> {
        let index = self.index(navigator)?;
        Ok(navigator.data_at(index))
    }

    /// Whether this attachment's entry is the surface's focused view.
    pub fn is_current(&self, navigator: &Navigator) -> Result<bool, NavigationError> {
        let index = self.index(navigator)?;
        Ok(navigator.focused_index()? == index)
    }

    /// Replace the routes after this entry with the given route. The entry
    /// itself survives.
    pub fn push_from_here(
        &self,
        navigator: &mut Navigator,
        route: impl Into<RouteRequest>,
    ) -> Result<(), NavigationError> {
        let index = self.index(navigator)?;
        navigator.push_from_here(index + 1, route)
    }

    /// Pop the routes after this entry. The entry itself survives.
    pub fn pop_from_here(&self, navigator: &mut Navigator) -> Result<(), NavigationError> {
        let index = self.index(navigator)?;
        navigator.pop_from_here(index + 1)
    }

    pub fn navigate_to_route(
        &self,
        navigator: &mut Navigator,
        route: impl Into<RouteRequest>,
    ) -> Result<(), NavigationError> {
        navigator.navigate_to_route(route)
    }

    pub fn push_route(
        &self,
        navigator: &mut Navigator,
        route: impl Into<RouteRequest>,
    ) -> Result<(), NavigationError> {
        navigator.push_route(route)
    }

    pub fn pop_route(&self, navigator: &mut Navigator) -> Result<(), NavigationError> {
        navigator.pop_route()
    }

    pub fn route_active(
        &self,
        navigator: &Navigator,
        route: impl Into<RouteRequest>,
    ) -> Result<bool, NavigationError> {
        navigator.route_active(route)
    }

    pub fn bring_to_view(
        &self,
        navigator: &mut Navigator,
        target: impl Into<ViewTarget>,
    ) -> Result<(), NavigationError> {
        navigator.bring_to_view(target)
    }

    pub fn watch_route(
        &self,
        navigator: &mut Navigator,
        route: impl Into<RouteRequest>,
    ) -> Result<WatchedRoute, NavigationError> {
        navigator.watch_route(route)
    }
}
