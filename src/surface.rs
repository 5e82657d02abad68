//! Display surfaces and the observation primitives built on them
//!
//! The engine never owns a surface. It only holds [`ViewHandle`]s, which the
//! UI layer creates and destroys, and asks the [`SurfaceHost`] whether a handle
//! is still attached before passing it downstream.

use std::sync::Arc;

/// Opaque reference to an on-screen display surface
///
/// Equality is identity of the host-assigned id. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewHandle(Arc<str>);

impl ViewHandle {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ViewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Area in square pixels, never negative
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// A visibility or size observer
///
/// Observers only register interest. Their batches come back through the
/// coordinator's `handle_intersections` and `handle_resize` entry points.
pub trait SurfaceObserver: Send {
    fn observe(&mut self, view: &ViewHandle);
    fn unobserve(&mut self, view: &ViewHandle);
    /// Stop delivering entries for every view
    fn disconnect(&mut self);
}

/// Host environment owning the surface tree
pub trait SurfaceHost: Send + Sync {
    /// Whether `view` is still attached to the surface tree
    fn contains(&self, view: &ViewHandle) -> bool;

    /// Create a visibility observer scoped to `root` (`None` = whole viewport)
    fn visibility_observer(&self, root: Option<&ViewHandle>) -> Box<dyn SurfaceObserver>;

    fn size_observer(&self) -> Box<dyn SurfaceObserver>;
}

/// One visibility transition delivered by a visibility observer
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionEntry {
    pub view: ViewHandle,
    pub is_intersecting: bool,
}

impl IntersectionEntry {
    pub fn new(view: ViewHandle, is_intersecting: bool) -> Self {
        Self {
            view,
            is_intersecting,
        }
    }
}

/// One content-size change delivered by a size observer
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeEntry {
    pub view: ViewHandle,
    pub size: Size,
}

impl ResizeEntry {
    pub fn new(view: ViewHandle, width: f64, height: f64) -> Self {
        Self {
            view,
            size: Size::new(width, height),
        }
    }
}
