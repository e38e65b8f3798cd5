use thiserror::Error;

/// Errors surfaced by navigation operations.
///
/// The engine never leaves the stack in a partially-applied state: when an
/// operation fails, the previous stack and the display surface contents are
/// unchanged.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// The referenced name is not in the route definition table.
    #[error("no route named '{0}' is registered")]
    RouteNotFound(String),

    /// A request item is neither a name nor a `{route, data}` pair, or the
    /// request is empty where at least one item is required.
    #[error("malformed route request: {0}")]
    MalformedRequest(String),

    /// The operation would leave the navigation stack without a root entry.
    #[error("operation would leave the navigation stack empty")]
    EmptyStackOperation,

    /// The navigator has no initial route installed yet.
    #[error("navigation is not initialized; install an initial route first")]
    Uninitialized,

    /// An index-anchored operation pointed past the end of the stack.
    #[error("index {index} is out of range for a stack of {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    /// A `bring_to_view` target matched no stack entry.
    #[error("no stack entry matches the requested target")]
    NoMatchingEntry,

    /// A route's view factory returned an error.
    #[error("constructing a view for route '{route}' failed")]
    ViewConstructionFailed {
        route: String,
        #[source]
        source: anyhow::Error,
    },

    /// The given view handle does not belong to any entry on the stack.
    #[error("view is not attached to the navigation stack")]
    ViewNotAttached,
}
