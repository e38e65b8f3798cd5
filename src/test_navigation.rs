// Scenario tests for the navigation stack controller

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{Value, json};

use crate::surface::DisplaySurface;
use crate::{
    NavigationError, NavigationEvent, Navigator, NavigatorBuilder, RouteDefinition, RouteItem,
    ViewHandle, ViewTarget,
};

/// Display surface double recording what the navigator pushes to it.
#[derive(Clone, Default)]
struct RecordingSurface {
    views: Rc<RefCell<Vec<ViewHandle>>>,
    focused: Rc<Cell<usize>>,
}

impl DisplaySurface for RecordingSurface {
    fn set_views(&mut self, views: &[ViewHandle]) {
        *self.views.borrow_mut() = views.to_vec();
    }

    fn focus_index(&mut self, index: usize) {
        self.focused.set(index);
    }

    fn current_index(&self) -> usize {
        self.focused.get()
    }
}

/// Flips its flag when the owning view is dropped.
struct DropFlag(Rc<Cell<bool>>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.set(true);
    }
}

fn counting_route(name: &str, counter: &Rc<Cell<usize>>) -> RouteDefinition {
    let counter = counter.clone();
    RouteDefinition::new(name, move |data: Option<&Value>| {
        counter.set(counter.get() + 1);
        Ok(ViewHandle::new(data.cloned()))
    })
}

fn plain_route(name: &str) -> RouteDefinition {
    RouteDefinition::new(name, |data: Option<&Value>| Ok(ViewHandle::new(data.cloned())))
}

fn builder_with(names: &[&str]) -> NavigatorBuilder {
    let mut builder = Navigator::builder();
    for name in names {
        builder = builder.route(plain_route(name).cacheable(true));
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_login_scenario() {
        let surface = RecordingSurface::default();
        let dropped = Rc::new(Cell::new(false));
        let flag = dropped.clone();

        let mut navigator = Navigator::builder()
            .route(plain_route("home").cacheable(true).cost(1))
            .route(RouteDefinition::new("login", move |_data| {
                Ok(ViewHandle::new(DropFlag(flag.clone())))
            }))
            .build(Box::new(surface.clone()))
            .unwrap();

        navigator.navigate_to_route(["home", "login"]).unwrap();
        assert!(navigator.route_active("home").unwrap());
        assert!(!navigator.route_active("login").unwrap());

        navigator.pop_route().unwrap();
        assert_eq!(navigator.current_routes().unwrap(), ["home"].into());

        // login is not cacheable: once the surface was resynced, its view
        // handle is gone.
        assert_eq!(navigator.cache_stats().entries, 0);
        assert!(dropped.get());
        assert_eq!(surface.views.borrow().len(), 1);
    }

    #[test]
    fn test_route_active_is_anchored_at_the_root() {
        let mut navigator = builder_with(&["a", "b", "c"])
            .initial_route(["a", "b"])
            .build(Box::new(RecordingSurface::default()))
            .unwrap();

        assert!(navigator.route_active("a").unwrap());
        assert!(navigator.route_active(["a", "b"]).unwrap());
        assert!(!navigator.route_active("b").unwrap());
        assert!(!navigator.route_active(["a", "b", "c"]).unwrap());

        navigator.navigate_to_route(["b", "a"]).unwrap();
        assert!(!navigator.route_active(["a", "b"]).unwrap());
        assert!(navigator.route_active(["b", "a"]).unwrap());
    }

    #[test]
    fn test_route_active_distinguishes_data() {
        let mut navigator = builder_with(&["page"])
            .build(Box::new(RecordingSurface::default()))
            .unwrap();
        navigator
            .navigate_to_route(RouteItem::with_data("page", "red"))
            .unwrap();

        assert!(navigator
            .route_active(RouteItem::with_data("page", "red"))
            .unwrap());
        assert!(!navigator
            .route_active(RouteItem::with_data("page", "blue"))
            .unwrap());
        assert!(!navigator.route_active("page").unwrap());
    }

    #[test]
    fn test_push_from_here_truncates_at_the_index() {
        let mut navigator = builder_with(&["a", "b", "c", "x"])
            .initial_route(["a", "b", "c"])
            .build(Box::new(RecordingSurface::default()))
            .unwrap();

        navigator.push_from_here(0, "x").unwrap();
        assert_eq!(navigator.depth(), 1);
        assert_eq!(navigator.current_routes().unwrap(), ["x"].into());

        // All three dropped entries were cacheable.
        assert_eq!(navigator.cache_stats().entries, 3);
    }

    #[test]
    fn test_push_from_here_at_the_end_appends() {
        let mut navigator = builder_with(&["a", "b"])
            .initial_route("a")
            .build(Box::new(RecordingSurface::default()))
            .unwrap();

        navigator.push_from_here(1, "b").unwrap();
        assert_eq!(navigator.current_routes().unwrap(), ["a", "b"].into());

        let result = navigator.push_from_here(5, "b");
        assert!(matches!(
            result,
            Err(NavigationError::IndexOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_cache_round_trip_preserves_view_identity() {
        let constructions = Rc::new(Cell::new(0));
        let mut navigator = Navigator::builder()
            .route(counting_route("home", &constructions).cacheable(true))
            .route(plain_route("other"))
            .initial_route("home")
            .build(Box::new(RecordingSurface::default()))
            .unwrap();

        let original = navigator.view_at(0).unwrap().clone();
        navigator.navigate_to_route("other").unwrap();
        navigator.navigate_to_route("home").unwrap();

        assert!(navigator.view_at(0).unwrap().ptr_eq(&original));
        assert_eq!(constructions.get(), 1);
    }

    #[test]
    fn test_differing_data_constructs_a_fresh_view() {
        let constructions = Rc::new(Cell::new(0));
        let mut navigator = Navigator::builder()
            .route(counting_route("page", &constructions).cacheable(true))
            .route(plain_route("other"))
            .initial_route(RouteItem::with_data("page", 1))
            .build(Box::new(RecordingSurface::default()))
            .unwrap();

        let original = navigator.view_at(0).unwrap().clone();
        navigator.navigate_to_route("other").unwrap();
        navigator
            .navigate_to_route(RouteItem::with_data("page", 2))
            .unwrap();

        assert!(!navigator.view_at(0).unwrap().ptr_eq(&original));
        assert_eq!(constructions.get(), 2);
    }

    #[test]
    fn test_replace_reuses_a_matching_prefix() {
        let constructions = Rc::new(Cell::new(0));
        let mut navigator = Navigator::builder()
            .route(counting_route("home", &constructions))
            .route(plain_route("a"))
            .route(plain_route("b"))
            .initial_route(["home", "a"])
            .build(Box::new(RecordingSurface::default()))
            .unwrap();

        let root = navigator.view_at(0).unwrap().clone();
        navigator.navigate_to_route(["home", "b"]).unwrap();

        assert!(navigator.view_at(0).unwrap().ptr_eq(&root));
        assert_eq!(constructions.get(), 1);
        assert_eq!(navigator.current_routes().unwrap(), ["home", "b"].into());
    }

    #[test]
    fn test_failed_resolution_leaves_the_stack_unchanged() {
        let surface = RecordingSurface::default();
        let mut navigator = Navigator::builder()
            .route(plain_route("home").cacheable(true))
            .route(plain_route("spare").cacheable(true))
            .route(RouteDefinition::new("boom", |_data| {
                anyhow::bail!("factory failure")
            }))
            .initial_route("home")
            .build(Box::new(surface.clone()))
            .unwrap();

        // Park a cacheable instance so the rollback path has something to
        // restore.
        navigator.push_route("spare").unwrap();
        navigator.pop_route().unwrap();
        assert_eq!(navigator.cache_stats().entries, 1);

        let result = navigator.push_route(["spare", "boom"]);
        assert!(matches!(
            result,
            Err(NavigationError::ViewConstructionFailed { ref route, .. }) if route == "boom"
        ));

        assert_eq!(navigator.current_routes().unwrap(), ["home"].into());
        assert_eq!(surface.views.borrow().len(), 1);
        // The cache-taken instance went back.
        assert_eq!(navigator.cache_stats().entries, 1);
    }

    #[test]
    fn test_unknown_route_name_is_an_error() {
        let mut navigator = builder_with(&["home"])
            .initial_route("home")
            .build(Box::new(RecordingSurface::default()))
            .unwrap();

        let result = navigator.push_route("nowhere");
        assert!(matches!(
            result,
            Err(NavigationError::RouteNotFound(ref name)) if name == "nowhere"
        ));
        assert_eq!(navigator.depth(), 1);
    }

    #[test]
    fn test_operations_before_initialization_are_rejected() {
        let mut navigator = builder_with(&["home"])
            .build(Box::new(RecordingSurface::default()))
            .unwrap();
        assert!(!navigator.is_initialized());

        assert!(matches!(
            navigator.pop_route(),
            Err(NavigationError::Uninitialized)
        ));
        assert!(matches!(
            navigator.route_active("home"),
            Err(NavigationError::Uninitialized)
        ));
        assert!(matches!(
            navigator.current_routes(),
            Err(NavigationError::Uninitialized)
        ));

        // Pushing onto an empty stack is a full navigation.
        navigator.push_route("home").unwrap();
        assert!(navigator.is_initialized());
        assert_eq!(navigator.depth(), 1);
    }

    #[test]
    fn test_empty_requests_are_malformed() {
        let mut navigator = builder_with(&["home"])
            .initial_route("home")
            .build(Box::new(RecordingSurface::default()))
            .unwrap();

        let empty: Vec<RouteItem> = Vec::new();
        assert!(matches!(
            navigator.navigate_to_route(empty.clone()),
            Err(NavigationError::MalformedRequest(_))
        ));
        assert!(matches!(
            navigator.route_active(empty),
            Err(NavigationError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_pop_guards() {
        let mut navigator = builder_with(&["a", "b", "c"])
            .initial_route(["a", "b", "c"])
            .build(Box::new(RecordingSurface::default()))
            .unwrap();

        assert!(matches!(
            navigator.pop_from_here(0),
            Err(NavigationError::EmptyStackOperation)
        ));
        assert!(matches!(
            navigator.pop_from_here(4),
            Err(NavigationError::IndexOutOfRange { index: 4, len: 3 })
        ));

        // Nothing after the last entry: fine, nothing happens.
        navigator.pop_from_here(3).unwrap();
        assert_eq!(navigator.depth(), 3);

        navigator.pop_from_here(1).unwrap();
        assert_eq!(navigator.current_routes().unwrap(), ["a"].into());

        assert!(matches!(
            navigator.pop_route(),
            Err(NavigationError::EmptyStackOperation)
        ));
    }

    #[test]
    fn test_one_ordered_event_per_mutation() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut navigator = builder_with(&["a", "b", "c"])
            .initial_route("a")
            .build(Box::new(RecordingSurface::default()))
            .unwrap();

        let sink = events.clone();
        navigator.subscribe(move |event| sink.borrow_mut().push(*event));

        navigator.push_route(["b", "c"]).unwrap();
        navigator.pop_route().unwrap();
        navigator.push_from_here(1, "c").unwrap();
        navigator.navigate_to_route("a").unwrap();

        assert_eq!(
            *events.borrow(),
            vec![
                NavigationEvent::Pushed { index: 1, count: 2 },
                NavigationEvent::Popped { index: 2, count: 1 },
                NavigationEvent::ReplacedFrom { index: 1, count: 1 },
                NavigationEvent::Navigated,
            ]
        );
    }

    #[test]
    fn test_watched_route_tracks_mutations() {
        let mut navigator = builder_with(&["home", "settings"])
            .initial_route("home")
            .build(Box::new(RecordingSurface::default()))
            .unwrap();

        let watch = navigator.watch_route(["home", "settings"]).unwrap();
        assert!(!watch.is_active());

        navigator.push_route("settings").unwrap();
        assert!(watch.is_active());

        navigator.pop_route().unwrap();
        assert!(!watch.is_active());
    }

    #[test]
    fn test_bring_to_view_targets() {
        let surface = RecordingSurface::default();
        let mut navigator = builder_with(&["home", "browse", "page"])
            .build(Box::new(surface.clone()))
            .unwrap();
        navigator
            .navigate_to_route(vec![
                RouteItem::Name("home".into()),
                RouteItem::Name("browse".into()),
                RouteItem::with_data("page", "red"),
                RouteItem::with_data("page", "blue"),
            ])
            .unwrap();

        navigator.bring_to_view(1).unwrap();
        assert_eq!(surface.focused.get(), 1);

        navigator.bring_to_view("page").unwrap();
        assert_eq!(surface.focused.get(), 2);

        navigator
            .bring_to_view(ViewTarget::with_data("page", "blue"))
            .unwrap();
        assert_eq!(surface.focused.get(), 3);

        assert!(matches!(
            navigator.bring_to_view("missing"),
            Err(NavigationError::NoMatchingEntry)
        ));
        assert!(matches!(
            navigator.bring_to_view(9),
            Err(NavigationError::IndexOutOfRange { index: 9, len: 4 })
        ));

        // Focusing never mutates the stack.
        assert_eq!(navigator.depth(), 4);
    }

    #[test]
    fn test_attachment_context() {
        let surface = RecordingSurface::default();
        let mut navigator = builder_with(&["home", "user", "x"])
            .build(Box::new(surface.clone()))
            .unwrap();
        navigator
            .navigate_to_route(vec![
                RouteItem::Name("home".into()),
                RouteItem::with_data("user", json!({ "id": 7 })),
            ])
            .unwrap();

        let view = navigator.view_at(1).unwrap().clone();
        let attachment = navigator.attachment_for(&view).unwrap();
        assert_eq!(attachment.index(&navigator).unwrap(), 1);
        assert_eq!(
            attachment.data(&navigator).unwrap(),
            Some(json!({ "id": 7 }))
        );

        assert!(!attachment.is_current(&navigator).unwrap());
        navigator.bring_to_view(1).unwrap();
        assert!(attachment.is_current(&navigator).unwrap());

        // Scoped push anchors after the attachment's own entry.
        let root = navigator.view_at(0).unwrap().clone();
        let root_attachment = navigator.attachment_for(&root).unwrap();
        root_attachment.push_from_here(&mut navigator, "x").unwrap();
        assert_eq!(navigator.current_routes().unwrap(), ["home", "x"].into());

        // The user entry is gone from the stack; its attachment is stale.
        assert!(matches!(
            attachment.index(&navigator),
            Err(NavigationError::ViewNotAttached)
        ));

        let detached = ViewHandle::new("never attached");
        assert!(matches!(
            navigator.attachment_for(&detached),
            Err(NavigationError::ViewNotAttached)
        ));
    }

    #[test]
    fn test_attachment_pop_from_here_keeps_the_entry() {
        let mut navigator = builder_with(&["a", "b", "c"])
            .initial_route(["a", "b", "c"])
            .build(Box::new(RecordingSurface::default()))
            .unwrap();

        let middle = navigator.view_at(1).unwrap().clone();
        let attachment = navigator.attachment_for(&middle).unwrap();
        attachment.pop_from_here(&mut navigator).unwrap();

        assert_eq!(navigator.current_routes().unwrap(), ["a", "b"].into());
        assert_eq!(attachment.index(&navigator).unwrap(), 1);
    }

    #[test]
    fn test_current_routes_round_trip() {
        let items = vec![
            RouteItem::Name("home".into()),
            RouteItem::with_data("user", json!({ "name": "alice" })),
            RouteItem::with_data("page", 3),
        ];

        let mut first = builder_with(&["home", "user", "page"])
            .build(Box::new(RecordingSurface::default()))
            .unwrap();
        first.navigate_to_route(items.clone()).unwrap();
        let serialized = first.current_routes().unwrap();

        let mut second = builder_with(&["home", "user", "page"])
            .build(Box::new(RecordingSurface::default()))
            .unwrap();
        second.navigate_to_route(serialized.clone()).unwrap();

        assert_eq!(second.current_routes().unwrap(), serialized);
        assert_eq!(serialized, items.into());
    }
}
