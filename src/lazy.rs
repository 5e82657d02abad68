//! Lazy loading
//!
//! Lazily bound views are not played until their visibility observer reports
//! them on screen. This module only converts observer batches into
//! [`VisibilityChange`] callbacks; the coordinator decides what to play.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::stream::StreamKey;
use crate::surface::{IntersectionEntry, SurfaceHost, SurfaceObserver, ViewHandle};

/// A visibility transition of a tracked view
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityChange {
    pub key: StreamKey,
    pub is_visible: bool,
    pub target: ViewHandle,
}

/// Callback invoked once per visibility transition
pub type VisibilityCallback = Box<dyn Fn(VisibilityChange) + Send + Sync>;

#[derive(Debug, Clone)]
struct VisibilityRecord {
    key: StreamKey,
    is_intersecting: bool,
}

/// Turns surface visibility transitions into [`VisibilityChange`] callbacks
///
/// Knows nothing about playback. The callback is the only way visibility
/// reaches the rest of the system.
pub struct LazyLoadManager {
    host: Arc<dyn SurfaceHost>,
    observer: Option<Box<dyn SurfaceObserver>>,
    root: Option<ViewHandle>,
    records: HashMap<ViewHandle, VisibilityRecord>,
    on_visibility_change: VisibilityCallback,
}

impl LazyLoadManager {
    /// Create a manager; the observer is created on first use
    pub fn new(host: Arc<dyn SurfaceHost>, on_visibility_change: VisibilityCallback) -> Self {
        Self {
            host,
            observer: None,
            root: None,
            records: HashMap::new(),
            on_visibility_change,
        }
    }

    /// Re-create the visibility observer scoped to `root`
    ///
    /// The previous observer is disconnected and all tracking state dropped.
    pub fn init_observer(&mut self, root: Option<ViewHandle>) {
        self.dispose();
        self.observer = Some(self.host.visibility_observer(root.as_ref()));
        tracing::debug!(root = ?root.as_ref().map(ViewHandle::id), "Visibility observer created");
        self.root = root;
    }

    /// Start tracking `view` for `key`, initially not visible
    pub fn observe(&mut self, key: &StreamKey, view: &ViewHandle) {
        if self.observer.is_none() {
            self.init_observer(self.root.clone());
        }

        if let Some(record) = self.records.get_mut(view) {
            if &record.key == key {
                return;
            }
            tracing::debug!(view = %view, from = %record.key, to = %key, "View re-keyed");
            record.key = key.clone();
            record.is_intersecting = false;
            return;
        }

        self.records.insert(
            view.clone(),
            VisibilityRecord {
                key: key.clone(),
                is_intersecting: false,
            },
        );
        if let Some(observer) = self.observer.as_mut() {
            observer.observe(view);
        }
    }

    /// Stop tracking `view`
    ///
    /// Returns `false` if the view was not tracked.
    pub fn unobserve(&mut self, view: &ViewHandle) -> bool {
        if self.records.remove(view).is_none() {
            return false;
        }
        if let Some(observer) = self.observer.as_mut() {
            observer.unobserve(view);
        }
        true
    }

    /// Check if `view` is tracked and on screen
    pub fn is_visible(&self, view: &ViewHandle) -> bool {
        self.records.get(view).is_some_and(|r| r.is_intersecting)
    }

    /// Check if any tracked view of `key` is on screen
    pub fn has_visible_view(&self, key: &StreamKey) -> bool {
        self.records
            .values()
            .any(|r| &r.key == key && r.is_intersecting)
    }

    /// All tracked views with their stream keys
    pub fn observed_views(&self) -> Vec<(StreamKey, ViewHandle)> {
        self.records
            .iter()
            .map(|(view, r)| (r.key.clone(), view.clone()))
            .collect()
    }

    /// Apply a batch from the visibility observer
    ///
    /// Fires the callback once for each entry that changes a tracked view's
    /// state. A panicking callback is logged and the batch continues.
    pub fn handle_intersections(&mut self, entries: &[IntersectionEntry]) {
        for entry in entries {
            let Some(record) = self.records.get_mut(&entry.view) else {
                continue;
            };
            if record.is_intersecting == entry.is_intersecting {
                continue;
            }
            record.is_intersecting = entry.is_intersecting;

            let change = VisibilityChange {
                key: record.key.clone(),
                is_visible: entry.is_intersecting,
                target: entry.view.clone(),
            };

            tracing::debug!(
                stream = %change.key,
                view = %change.target,
                visible = change.is_visible,
                "Visibility changed"
            );

            let callback = &self.on_visibility_change;
            if catch_unwind(AssertUnwindSafe(|| callback(change))).is_err() {
                tracing::error!(view = %entry.view, "Visibility callback panicked");
            }
        }
    }

    /// Disconnect the observer and drop all tracking state
    ///
    /// Safe to call more than once.
    pub fn destroy(&mut self) {
        self.dispose();
        self.root = None;
    }

    fn dispose(&mut self) {
        if let Some(mut observer) = self.observer.take() {
            observer.disconnect();
        }
        self.records.clear();
    }
}

impl Drop for LazyLoadManager {
    fn drop(&mut self) {
        self.dispose();
    }
}
