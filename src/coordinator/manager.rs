//! Stream view coordinator
//!
//! Owns the stream table, lazy loading, quality policy and player, and wires
//! their callbacks together behind the bind/unbind/update/configure API.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::{Error, Operation, Result};
use crate::lazy::{LazyLoadManager, VisibilityChange};
use crate::player::{MediaEngine, StreamPlayer};
use crate::quality::{QualityChange, VideoQualityManager};
use crate::stream::{Quality, StreamInfo, StreamInfoManager, StreamInfoUpdate, StreamKey};
use crate::surface::{IntersectionEntry, ResizeEntry, Size, SurfaceHost, ViewHandle};

use super::config::CoordinatorConfig;
use super::{BindRequest, StreamConfigRequest};

/// Leaf callback output, handled after the triggering leaf call returns
#[derive(Debug)]
enum Notification {
    Visibility(VisibilityChange),
    Quality(QualityChange),
}

type NotificationQueue = Arc<Mutex<VecDeque<Notification>>>;

struct Inner<E: MediaEngine> {
    config: CoordinatorConfig,
    host: Arc<dyn SurfaceHost>,
    streams: Mutex<StreamInfoManager>,
    lazy: Mutex<LazyLoadManager>,
    quality: Mutex<VideoQualityManager>,
    player: StreamPlayer<E>,
    notifications: NotificationQueue,
    /// Latest start claim per stream; a failing start only rolls back its own
    claims: Mutex<HashMap<StreamKey, u64>>,
    flush_tasks: Mutex<Vec<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

/// Decides which streams to decode, at what quality, for which views
///
/// Cheap to clone; clones share state. Leaf locks are only held for
/// bookkeeping and never across an engine call.
pub struct StreamViewCoordinator<E: MediaEngine> {
    inner: Arc<Inner<E>>,
}

impl<E: MediaEngine> Clone for StreamViewCoordinator<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: MediaEngine> StreamViewCoordinator<E> {
    /// Create a coordinator over `engine` and `host`
    pub fn new(engine: E, host: Arc<dyn SurfaceHost>, config: CoordinatorConfig) -> Self {
        let notifications: NotificationQueue = Arc::new(Mutex::new(VecDeque::new()));

        let queue = Arc::clone(&notifications);
        let lazy = LazyLoadManager::new(
            Arc::clone(&host),
            Box::new(move |change| queue.lock().push_back(Notification::Visibility(change))),
        );

        let queue = Arc::clone(&notifications);
        let mut quality = VideoQualityManager::new(
            config.quality.clone(),
            Arc::clone(&host),
            Box::new(move |change| queue.lock().push_back(Notification::Quality(change))),
        );
        quality.set_local_subject(config.local_subject_id.clone());

        let player = StreamPlayer::new(engine);
        player.set_local_subject(config.local_subject_id.clone());

        Self {
            inner: Arc::new(Inner {
                config,
                host,
                streams: Mutex::new(StreamInfoManager::new()),
                lazy: Mutex::new(lazy),
                quality: Mutex::new(quality),
                player,
                notifications,
                claims: Mutex::new(HashMap::new()),
                flush_tasks: Mutex::new(Vec::new()),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    pub fn engine(&self) -> &E {
        self.inner.player.engine()
    }

    pub fn is_local(&self, subject_id: &str) -> bool {
        self.inner.player.is_local(subject_id)
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.inner.destroyed.load(Ordering::Acquire) {
            return Err(Error::Destroyed);
        }
        Ok(())
    }

    /// Bind a view to a stream, or re-route an already bound one
    ///
    /// Eager views (lazy loading off, or the local subject) start playback
    /// right away; lazy views wait for their first visibility report. A view
    /// switched from eager to lazy counts as hidden until reported.
    pub async fn bind_view(&self, request: BindRequest) -> Result<()> {
        self.ensure_alive()?;
        let BindRequest { ref key, ref view, lazy_load } = request;
        if !self.inner.host.contains(view) {
            return Err(Error::ViewNotFound(view.clone()));
        }
        let lazy =
            lazy_load.unwrap_or(self.inner.config.lazy_load) && !self.is_local(&key.subject_id);

        let was_eager = self
            .inner
            .streams
            .lock()
            .add_view(key, view, None, Some(self.inner.config.default_fill_mode))
            .binding(view)
            .is_some_and(|binding| binding.eager);
        self.inner.quality.lock().observe(key, view);

        tracing::debug!(stream = %key, view = %view, lazy = lazy, "Binding view");

        let result = match (lazy, was_eager) {
            (true, false) => {
                self.inner.lazy.lock().observe(key, view);
                Ok(())
            }
            (true, true) => {
                self.inner.lazy.lock().observe(key, view);
                self.inner.streams.lock().set_view_eager(key, view, false);
                self.refresh(key).await
            }
            (false, _) => {
                self.inner.lazy.lock().unobserve(view);
                self.inner.streams.lock().set_view_eager(key, view, true);
                self.refresh(key).await
            }
        };

        self.drain_notifications().await;
        result
    }

    /// Move a view between lazy and eager tracking
    ///
    /// Same as [`bind_view`](Self::bind_view), which binds unknown views and
    /// re-routes known ones.
    pub async fn update_view(&self, request: BindRequest) -> Result<()> {
        self.bind_view(request).await
    }

    /// Unbind a view from a stream
    ///
    /// Stops playback once no visible view remains. Unbinding a view that is
    /// not bound is a no-op.
    pub async fn unbind_view(&self, key: &StreamKey, view: &ViewHandle) -> Result<()> {
        self.ensure_alive()?;

        // (was playing at quality, entry still exists)
        let outcome = {
            let mut streams = self.inner.streams.lock();
            let Some(info) = streams.get_stream_info(key).filter(|i| i.has_view(view)) else {
                tracing::debug!(stream = %key, view = %view, "View not bound, nothing to unbind");
                return Ok(());
            };
            let playing = info.is_playing.then_some(info.quality);
            (playing, streams.remove_view(key, view).is_some())
        };

        self.inner.lazy.lock().unobserve(view);
        self.inner.quality.lock().unobserve(view);

        let result = match outcome {
            (Some(quality), false) => self.stop_engine(key, quality).await,
            (None, false) => {
                self.release_slot(key);
                Ok(())
            }
            (_, true) => self.refresh(key).await,
        };

        self.drain_notifications().await;
        result
    }

    /// Forward render parameters for a stream
    pub async fn set_stream_config(&self, request: StreamConfigRequest) -> Result<()> {
        self.ensure_alive()?;

        let StreamConfigRequest { key, render_params } = request;
        let quality = self
            .inner
            .streams
            .lock()
            .update_stream_info(&key, StreamInfoUpdate::fill_mode(render_params.fill_mode))
            .map_or(Quality::Ld, |info| info.quality);

        self.inner
            .player
            .set_render_params(&key, quality, render_params)
            .await
            .map_err(|e| Error::engine(Operation::SetRenderParams, &key, quality, e))
    }

    /// Apply the engine's has-video signal for a stream
    ///
    /// `false` stops playback at once and blocks further starts but keeps the
    /// views bound; `true` re-attempts playback for bound, visible views.
    pub async fn handle_video_available(&self, key: &StreamKey, has_video: bool) -> Result<()> {
        self.ensure_alive()?;

        let result = if has_video {
            let known = self
                .inner
                .streams
                .lock()
                .update_stream_info(key, StreamInfoUpdate::has_video(true))
                .is_some();
            if known {
                self.refresh(key).await
            } else {
                Ok(())
            }
        } else {
            let playing = {
                let mut streams = self.inner.streams.lock();
                let playing = streams
                    .get_stream_info(key)
                    .and_then(|info| info.is_playing.then_some(info.quality));
                let update = StreamInfoUpdate {
                    has_video: Some(false),
                    ..StreamInfoUpdate::stopped()
                };
                streams.update_stream_info(key, update);
                playing
            };
            tracing::info!(stream = %key, "Stream has no video");

            match playing {
                Some(quality) => self.stop_engine(key, quality).await,
                None => {
                    self.release_slot(key);
                    Ok(())
                }
            }
        };

        self.drain_notifications().await;
        result
    }

    /// Deliver a batch from the visibility observer
    ///
    /// Engine failures triggered here are logged, not returned.
    pub async fn handle_intersections(&self, entries: Vec<IntersectionEntry>) {
        if self.ensure_alive().is_err() {
            return;
        }
        self.inner.lazy.lock().handle_intersections(&entries);
        self.drain_notifications().await;
    }

    /// Deliver a batch from the size observer
    ///
    /// Re-evaluation is debounced; see [`flush_resize`](Self::flush_resize).
    pub fn handle_resize(&self, entries: Vec<ResizeEntry>) {
        if self.ensure_alive().is_ok() && self.inner.quality.lock().record_resize(&entries) {
            self.schedule_flush(self.inner.config.quality.resize_debounce);
        }
    }

    /// Deliver a viewport resize
    pub fn handle_viewport_resize(&self, size: Size) {
        if self.ensure_alive().is_ok() && self.inner.quality.lock().record_viewport_resize(size) {
            self.schedule_flush(self.inner.config.quality.viewport_debounce);
        }
    }

    fn schedule_flush(&self, delay: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, resize flush must be driven by the host");
            return;
        };

        let weak: Weak<Inner<E>> = Arc::downgrade(&self.inner);
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                StreamViewCoordinator { inner }.flush_resize().await;
            }
        });

        let mut tasks = self.inner.flush_tasks.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    /// Apply pending resizes now and re-evaluate quality of playing streams
    pub async fn flush_resize(&self) {
        if self.ensure_alive().is_err() {
            return;
        }
        let playing = self.playing_views();
        self.inner.quality.lock().flush_pending(&playing);
        self.drain_notifications().await;
    }

    fn playing_views(&self) -> HashMap<StreamKey, Vec<ViewHandle>> {
        let streams = self.inner.streams.lock();
        streams
            .get_playing_streams()
            .into_iter()
            .map(|info| {
                let views = streams.valid_visible_views(&info.key, &*self.inner.host);
                (info.key.clone(), views)
            })
            .collect()
    }

    /// Free the slot held by `key` and offer it to a playing stream without one
    fn release_slot(&self, key: &StreamKey) {
        if self.inner.quality.lock().release(key) {
            let playing = self.playing_views();
            self.inner.quality.lock().rebalance(&playing);
        }
    }

    /// Re-scope visibility tracking to `root`
    ///
    /// Lazily tracked views are re-observed and count as hidden until the new
    /// observer reports them.
    pub async fn set_lazy_root(&self, root: Option<ViewHandle>) {
        if self.ensure_alive().is_err() {
            return;
        }

        let tracked = {
            let mut lazy = self.inner.lazy.lock();
            let tracked = lazy.observed_views();
            lazy.init_observer(root);
            for (key, view) in &tracked {
                lazy.observe(key, view);
            }
            tracked
        };

        let affected: BTreeSet<StreamKey> = {
            let mut streams = self.inner.streams.lock();
            tracked
                .into_iter()
                .filter(|(key, view)| streams.set_view_visibility(key, view, false))
                .map(|(key, _)| key)
                .collect()
        };

        for key in affected {
            if let Err(e) = self.refresh(&key).await {
                tracing::error!(stream = %key, error = %e, "Failed to refresh stream after re-scoping");
            }
        }
        self.drain_notifications().await;
    }

    /// Switch to a new session with `local_subject_id`
    ///
    /// Stops every stream and clears all tracking state, then re-creates the
    /// observers on next use.
    pub async fn on_session_changed(&self, local_subject_id: Option<String>) -> Result<()> {
        self.ensure_alive()?;
        tracing::info!(local = ?local_subject_id, "Session changed");

        self.teardown().await;

        self.inner.player.set_local_subject(local_subject_id.clone());
        self.inner.quality.lock().set_local_subject(local_subject_id);
        Ok(())
    }

    /// Stop every stream and release all resources
    ///
    /// Later calls on this coordinator (or its clones) fail with
    /// [`Error::Destroyed`]. Safe to call more than once.
    pub async fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("Destroying stream view coordinator");
        self.teardown().await;
    }

    async fn teardown(&self) {
        for task in self.inner.flush_tasks.lock().drain(..) {
            task.abort();
        }

        let streams = self.inner.streams.lock().clear();
        self.inner.lazy.lock().destroy();
        self.inner.quality.lock().destroy();
        self.inner.notifications.lock().clear();
        self.inner.claims.lock().clear();

        for info in streams.into_iter().filter(|i| i.is_playing) {
            if let Err(e) = self.inner.player.stop_play_video(&info.key, info.quality).await {
                tracing::error!(stream = %info.key, error = %e, "Failed to stop stream during teardown");
            }
        }
    }

    /// Snapshot of the entry for `key`
    pub fn stream_info(&self, key: &StreamKey) -> Option<StreamInfo> {
        self.inner.streams.lock().get_stream_info(key).cloned()
    }

    /// Keys with an active decode pipeline
    pub fn playing_streams(&self) -> Vec<StreamKey> {
        let streams = self.inner.streams.lock();
        let mut keys: Vec<_> = streams
            .get_playing_streams()
            .into_iter()
            .map(|info| info.key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of streams with at least one bound view
    pub fn stream_count(&self) -> usize {
        self.inner.streams.lock().get_all_streams().len()
    }

    /// Keys holding a high-quality slot
    pub fn high_quality_streams(&self) -> Vec<StreamKey> {
        self.inner.quality.lock().high_quality_streams()
    }

    /// Bring playback of `key` in line with its visible views
    async fn refresh(&self, key: &StreamKey) -> Result<()> {
        let state = {
            let streams = self.inner.streams.lock();
            streams.get_stream_info(key).map(|info| {
                let views = streams.valid_visible_views(key, &*self.inner.host);
                (views, info.is_playing, info.has_video, info.quality)
            })
        };
        let Some((views, playing, has_video, quality)) = state else {
            return Ok(());
        };

        match (views.is_empty(), playing) {
            (true, true) => self.stop(key).await,
            (true, false) => Ok(()),
            (false, true) => {
                self.inner
                    .player
                    .update_video_view(key, quality, &views)
                    .await
                    .map_err(|e| Error::engine(Operation::UpdateViews, key, quality, e))?;
                let quality = self
                    .inner
                    .quality
                    .lock()
                    .calculate_optimal_quality(key, Some(views.as_slice()));
                self.apply_quality(key, quality).await
            }
            (false, false) if !has_video => {
                tracing::debug!(stream = %key, "Stream has no video, deferring start");
                Ok(())
            }
            (false, false) => self.start(key, &views).await,
        }
    }

    async fn start(&self, key: &StreamKey, views: &[ViewHandle]) -> Result<()> {
        // Claim the stream before suspending so a racing start backs off
        let claim = {
            let mut streams = self.inner.streams.lock();
            let idle = streams
                .get_stream_info(key)
                .is_some_and(|info| !info.is_playing && info.has_video);
            if !idle {
                return Ok(());
            }
            streams.update_stream_info(key, StreamInfoUpdate::playing(true));
            let mut claims = self.inner.claims.lock();
            let generation = claims.entry(key.clone()).or_insert(0);
            *generation += 1;
            *generation
        };

        let quality = self.inner.quality.lock().calculate_optimal_quality(key, Some(views));
        self.inner
            .streams
            .lock()
            .update_stream_info(key, StreamInfoUpdate::quality(quality));

        match self.inner.player.start_play_video(key, quality, views).await {
            Ok(()) => {
                if !self.inner.streams.lock().is_stream_playing(key) {
                    tracing::debug!(stream = %key, "Stream stopped while starting, discarding start");
                }
                Ok(())
            }
            Err(e) => {
                let current = {
                    let mut streams = self.inner.streams.lock();
                    let current = self.inner.claims.lock().get(key) == Some(&claim)
                        && streams.is_stream_playing(key);
                    if current {
                        streams.update_stream_info(key, StreamInfoUpdate::stopped());
                    }
                    current
                };
                if current {
                    self.release_slot(key);
                } else {
                    tracing::debug!(stream = %key, "Stale start failed, keeping newer state");
                }
                Err(Error::engine(Operation::Start, key, quality, e))
            }
        }
    }

    async fn stop(&self, key: &StreamKey) -> Result<()> {
        // Flip before suspending so a racing stop does not stop twice
        let quality = {
            let mut streams = self.inner.streams.lock();
            let Some(quality) = streams
                .get_stream_info(key)
                .and_then(|info| info.is_playing.then_some(info.quality))
            else {
                return Ok(());
            };
            streams.update_stream_info(key, StreamInfoUpdate::stopped());
            quality
        };

        self.stop_engine(key, quality).await
    }

    async fn stop_engine(&self, key: &StreamKey, quality: Quality) -> Result<()> {
        self.release_slot(key);
        self.inner
            .player
            .stop_play_video(key, quality)
            .await
            .map_err(|e| Error::engine(Operation::Stop, key, quality, e))
    }

    async fn apply_quality(&self, key: &StreamKey, new_quality: Quality) -> Result<()> {
        let views = {
            let mut streams = self.inner.streams.lock();
            let Some(info) = streams.get_stream_info(key).filter(|i| i.quality != new_quality) else {
                return Ok(());
            };
            let playing = info.is_playing;
            let views = streams.valid_visible_views(key, &*self.inner.host);
            streams.update_stream_info(key, StreamInfoUpdate::quality(new_quality));
            if !playing {
                return Ok(());
            }
            views
        };

        tracing::info!(stream = %key, quality = ?new_quality, "Switching stream quality");

        self.inner
            .player
            .update_video_quality(key, new_quality, &views)
            .await
            .map_err(|e| Error::engine(Operation::UpdateQuality, key, new_quality, e))
    }

    /// Handle queued leaf callbacks until none remain
    ///
    /// Failures here have no caller to return to, so they are logged.
    async fn drain_notifications(&self) {
        loop {
            let next = self.inner.notifications.lock().pop_front();
            let (key, result) = match next {
                None => break,
                Some(Notification::Visibility(change)) => {
                    let changed = self.inner.streams.lock().set_view_visibility(
                        &change.key,
                        &change.target,
                        change.is_visible,
                    );
                    let result = if changed { self.refresh(&change.key).await } else { Ok(()) };
                    (change.key, result)
                }
                Some(Notification::Quality(change)) => {
                    tracing::debug!(stream = %change.key, reason = ?change.reason, "Applying quality change");
                    let result = self.apply_quality(&change.key, change.new_quality).await;
                    (change.key, result)
                }
            };
            if let Err(e) = result {
                tracing::error!(stream = %key, error = %e, "Playback change failed");
            }
        }
    }
}
