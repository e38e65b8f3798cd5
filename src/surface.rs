//! Seam to the external rendering surface.

use crate::route::ViewHandle;

/// The component that visually renders the ordered stack of views.
///
/// The navigator puppets exactly one surface: after every mutation it pushes
/// the full ordered view-handle sequence, and `bring_to_view` asks the
/// surface to focus a given index. The surface owns scrolling, layout and
/// transitions; the navigator only guarantees that the sequence it pushed
/// last mirrors the live stack 1:1, in order.
pub trait DisplaySurface {
    /// Replace the displayed view sequence.
    fn set_views(&mut self, views: &[ViewHandle]);

    /// Shift focus/scroll to the view at `index`.
    fn focus_index(&mut self, index: usize);

    /// Index of the currently focused view.
    fn current_index(&self) -> usize;
}
