//! Adaptive quality decisions
//!
//! Tracks the on-screen size of every bound view and decides, per stream,
//! whether it deserves one of the bounded high-quality slots. Never calls the
//! engine; decisions leave through the injected [`QualityCallback`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::stream::{Quality, StreamKey};
use crate::surface::{ResizeEntry, Size, SurfaceHost, SurfaceObserver, ViewHandle};

use super::config::QualityConfig;
use super::slots::{Admission, HighQualityPool};

/// Why a stream's quality changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityChangeReason {
    /// Its views (or the viewport) were resized, or a slot was freed
    Resized,
    /// A larger stream took its high-quality slot
    Evicted,
}

/// A quality decision for a stream
#[derive(Debug, Clone, PartialEq)]
pub struct QualityChange {
    pub key: StreamKey,
    pub new_quality: Quality,
    pub reason: QualityChangeReason,
}

/// Callback receiving quality decisions
pub type QualityCallback = Box<dyn Fn(QualityChange) + Send + Sync>;

#[derive(Debug, Clone)]
struct SizeRecord {
    key: StreamKey,
    size: Size,
}

/// Decides which streams get the high-quality tier
pub struct VideoQualityManager {
    config: QualityConfig,
    host: Arc<dyn SurfaceHost>,
    observer: Option<Box<dyn SurfaceObserver>>,
    local_subject_id: Option<String>,
    sizes: HashMap<ViewHandle, SizeRecord>,
    pool: HighQualityPool,
    viewport_area: f64,
    pending_resize: HashMap<ViewHandle, Size>,
    pending_viewport: Option<Size>,
    on_quality_change: QualityCallback,
}

impl VideoQualityManager {
    /// Create a manager; the size observer is created on first use
    pub fn new(
        config: QualityConfig,
        host: Arc<dyn SurfaceHost>,
        on_quality_change: QualityCallback,
    ) -> Self {
        Self {
            pool: HighQualityPool::new(config.high_quality_capacity),
            viewport_area: config.initial_viewport.area(),
            config,
            host,
            observer: None,
            local_subject_id: None,
            sizes: HashMap::new(),
            pending_resize: HashMap::new(),
            pending_viewport: None,
            on_quality_change,
        }
    }

    /// Set the subject whose own streams are never worth high definition
    pub fn set_local_subject(&mut self, subject_id: Option<String>) {
        if let Some(ref id) = subject_id {
            for key in self.pool.holders() {
                if &key.subject_id == id {
                    self.pool.release(&key);
                }
            }
        }
        self.local_subject_id = subject_id;
    }

    /// Whether quality for `key` is fixed regardless of size
    pub fn is_quality_invariant(&self, key: &StreamKey) -> bool {
        key.is_screen() || self.local_subject_id.as_deref() == Some(key.subject_id.as_str())
    }

    /// Start tracking the size of `view`
    pub fn observe(&mut self, key: &StreamKey, view: &ViewHandle) {
        if let Some(record) = self.sizes.get_mut(view) {
            record.key = key.clone();
            return;
        }

        self.sizes.insert(
            view.clone(),
            SizeRecord {
                key: key.clone(),
                size: Size::default(),
            },
        );

        let host = &self.host;
        self.observer
            .get_or_insert_with(|| host.size_observer())
            .observe(view);
    }

    /// Stop tracking the size of `view`
    pub fn unobserve(&mut self, view: &ViewHandle) -> bool {
        self.pending_resize.remove(view);
        if self.sizes.remove(view).is_none() {
            return false;
        }
        if let Some(observer) = self.observer.as_mut() {
            observer.unobserve(view);
        }
        true
    }

    /// Queue a batch from the size observer
    ///
    /// Returns `true` if this batch opened a new debounce window, i.e. the
    /// caller should schedule [`flush_pending`](Self::flush_pending).
    pub fn record_resize(&mut self, entries: &[ResizeEntry]) -> bool {
        let was_idle = self.pending_resize.is_empty();
        for entry in entries {
            if self.sizes.contains_key(&entry.view) {
                self.pending_resize.insert(entry.view.clone(), entry.size);
            }
        }
        was_idle && !self.pending_resize.is_empty()
    }

    /// Queue a viewport resize
    ///
    /// Returns `true` if the caller should schedule a flush.
    pub fn record_viewport_resize(&mut self, size: Size) -> bool {
        self.pending_viewport.replace(size).is_none()
    }

    /// Apply queued resizes and re-evaluate affected streams
    ///
    /// `playing` maps each playing stream to the views it renders into; other
    /// streams keep their size records but are not re-evaluated. A change is
    /// reported through the callback for every stream whose quality flips.
    pub fn flush_pending(&mut self, playing: &HashMap<StreamKey, Vec<ViewHandle>>) {
        let mut affected = BTreeSet::new();

        if let Some(size) = self.pending_viewport.take() {
            self.viewport_area = size.area();
            tracing::debug!(width = size.width, height = size.height, "Viewport area refreshed");
            affected.extend(self.sizes.values().map(|r| r.key.clone()));
        }

        for (view, size) in std::mem::take(&mut self.pending_resize) {
            if let Some(record) = self.sizes.get_mut(&view) {
                record.size = size;
                affected.insert(record.key.clone());
            }
        }

        for key in affected {
            let Some(views) = playing.get(&key) else {
                continue;
            };
            if self.is_quality_invariant(&key) {
                continue;
            }

            let before = if self.pool.holds(&key) { Quality::Hd } else { Quality::Ld };
            let after = self.calculate_optimal_quality(&key, Some(views.as_slice()));
            if before != after {
                self.notify(key, after, QualityChangeReason::Resized);
            }
        }
    }

    /// Offer free slots to playing streams that hold none
    ///
    /// Larger candidates are offered first; stops once the pool is full.
    pub fn rebalance(&mut self, playing: &HashMap<StreamKey, Vec<ViewHandle>>) {
        let mut candidates: Vec<(&StreamKey, &Vec<ViewHandle>, f64)> = playing
            .iter()
            .filter(|(key, _)| !self.is_quality_invariant(key) && !self.pool.holds(key))
            .filter_map(|(key, views)| {
                let area = self.largest_area(key, Some(views.as_slice()))?;
                Some((key, views, area))
            })
            .collect();
        candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

        for (key, views, _) in candidates {
            if self.pool.is_full() {
                break;
            }
            if self.calculate_optimal_quality(key, Some(views.as_slice())) == Quality::Hd {
                self.notify(key.clone(), Quality::Hd, QualityChangeReason::Resized);
            }
        }
    }

    pub fn viewport_area(&self) -> f64 {
        self.viewport_area
    }

    /// Decide the quality `key` should play at right now
    ///
    /// Considers `views` if given, otherwise every size-tracked view of `key`.
    /// Granting may evict a smaller stream, which is reported through the
    /// callback. A slot holder that no longer qualifies loses its slot.
    pub fn calculate_optimal_quality(
        &mut self,
        key: &StreamKey,
        views: Option<&[ViewHandle]>,
    ) -> Quality {
        if key.is_screen() {
            return Quality::Hd;
        }
        if self.is_quality_invariant(key) {
            self.pool.release(key);
            return Quality::Ld;
        }

        let max_area = self.largest_area(key, views).unwrap_or(0.0);
        if max_area <= self.config.promote_area() {
            if self.pool.release(key) {
                tracing::debug!(stream = %key, area = max_area, "High-quality slot released");
            }
            return Quality::Ld;
        }

        let area_ratio = max_area / self.viewport_area.max(1.0);

        match self.pool.admit(key, area_ratio) {
            Admission::Granted => Quality::Hd,
            Admission::Evicted(victim) => {
                tracing::info!(
                    stream = %key,
                    evicted = %victim,
                    area_ratio = area_ratio,
                    "High-quality slot reassigned"
                );
                self.notify(victim, Quality::Ld, QualityChangeReason::Evicted);
                Quality::Hd
            }
            Admission::Denied => {
                tracing::debug!(stream = %key, area_ratio = area_ratio, "High-quality pool full");
                Quality::Ld
            }
        }
    }

    fn largest_area(&self, key: &StreamKey, views: Option<&[ViewHandle]>) -> Option<f64> {
        let area = |r: &SizeRecord| r.size.area();
        let areas: Vec<f64> = match views {
            Some(views) => views
                .iter()
                .map(|v| self.sizes.get(v).map_or(0.0, area))
                .collect(),
            None => self
                .sizes
                .values()
                .filter(|r| &r.key == key)
                .map(area)
                .collect(),
        };
        areas.into_iter().reduce(f64::max)
    }

    /// Free the slot held by `key`, e.g. when it stops playing
    pub fn release(&mut self, key: &StreamKey) -> bool {
        self.pool.release(key)
    }

    /// Streams currently holding a high-quality slot
    pub fn high_quality_streams(&self) -> Vec<StreamKey> {
        self.pool.holders()
    }

    fn notify(&self, key: StreamKey, new_quality: Quality, reason: QualityChangeReason) {
        tracing::debug!(stream = %key, quality = ?new_quality, reason = ?reason, "Quality change");
        (self.on_quality_change)(QualityChange {
            key,
            new_quality,
            reason,
        });
    }

    /// Disconnect the size observer and clear every table
    ///
    /// Safe to call more than once.
    pub fn destroy(&mut self) {
        if let Some(mut observer) = self.observer.take() {
            observer.disconnect();
        }
        self.sizes.clear();
        self.pool.clear();
        self.pending_resize.clear();
        self.pending_viewport = None;
    }
}

impl Drop for VideoQualityManager {
    fn drop(&mut self) {
        self.destroy();
    }
}
