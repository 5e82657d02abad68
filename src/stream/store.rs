//! Stream table implementation
//!
//! Authoritative record of which views want which stream and the stream's
//! current playback state. Purely in-memory; never talks to the engine.

use std::collections::HashMap;

use crate::surface::{SurfaceHost, ViewHandle};

use super::{FillMode, Quality, StreamKey};

/// A view bound to a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewBinding {
    pub view: ViewHandle,
    pub is_visible: bool,
    /// Played regardless of visibility (lazy loading disabled or local subject)
    pub eager: bool,
}

/// Playback state for a single stream key
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub key: StreamKey,

    /// Bound views, in bind order
    pub views: Vec<ViewBinding>,

    /// Whether the engine has an active decode pipeline for this key
    pub is_playing: bool,

    pub quality: Quality,
    pub fill_mode: FillMode,

    /// Last has-video signal from the engine
    pub has_video: bool,
}

impl StreamInfo {
    pub fn has_view(&self, view: &ViewHandle) -> bool {
        self.binding(view).is_some()
    }

    pub fn binding(&self, view: &ViewHandle) -> Option<&ViewBinding> {
        self.views.iter().find(|b| &b.view == view)
    }

    /// Views currently on screen, in bind order
    pub fn visible_views(&self) -> Vec<ViewHandle> {
        self.views
            .iter()
            .filter(|b| b.is_visible)
            .map(|b| b.view.clone())
            .collect()
    }
}

/// Partial update merged into an existing [`StreamInfo`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamInfoUpdate {
    pub is_playing: Option<bool>,
    pub quality: Option<Quality>,
    pub fill_mode: Option<FillMode>,
    pub has_video: Option<bool>,
}

impl StreamInfoUpdate {
    pub fn playing(is_playing: bool) -> Self {
        Self {
            is_playing: Some(is_playing),
            ..Default::default()
        }
    }

    /// Not playing, and back to the low tier
    pub fn stopped() -> Self {
        Self {
            is_playing: Some(false),
            quality: Some(Quality::Ld),
            ..Default::default()
        }
    }

    pub fn quality(quality: Quality) -> Self {
        Self {
            quality: Some(quality),
            ..Default::default()
        }
    }

    pub fn fill_mode(fill_mode: FillMode) -> Self {
        Self {
            fill_mode: Some(fill_mode),
            ..Default::default()
        }
    }

    pub fn has_video(has_video: bool) -> Self {
        Self {
            has_video: Some(has_video),
            ..Default::default()
        }
    }

    fn apply(self, info: &mut StreamInfo) {
        if let Some(is_playing) = self.is_playing {
            info.is_playing = is_playing;
        }
        if let Some(quality) = self.quality {
            info.quality = quality;
        }
        if let Some(fill_mode) = self.fill_mode {
            info.fill_mode = fill_mode;
        }
        if let Some(has_video) = self.has_video {
            info.has_video = has_video;
        }
    }
}

/// Table of all streams with at least one bound view
#[derive(Debug, Default)]
pub struct StreamInfoManager {
    streams: HashMap<StreamKey, StreamInfo>,
}

impl StreamInfoManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `view` to `key`
    ///
    /// Creates the stream entry if absent. Binding an already bound view is a
    /// no-op. `quality` and `fill_mode` only apply to a newly created entry.
    pub fn add_view(
        &mut self,
        key: &StreamKey,
        view: &ViewHandle,
        quality: Option<Quality>,
        fill_mode: Option<FillMode>,
    ) -> &StreamInfo {
        let info = self.streams.entry(key.clone()).or_insert_with(|| {
            tracing::debug!(stream = %key, "Stream entry created");
            StreamInfo {
                key: key.clone(),
                views: Vec::new(),
                is_playing: false,
                quality: quality.unwrap_or_default(),
                fill_mode: fill_mode.unwrap_or_default(),
                has_video: true,
            }
        });

        if !info.has_view(view) {
            info.views.push(ViewBinding {
                view: view.clone(),
                is_visible: false,
                eager: false,
            });
            tracing::debug!(stream = %key, view = %view, views = info.views.len(), "View bound");
        }

        info
    }

    /// Unbind `view` from `key`
    ///
    /// Returns the remaining entry, or `None` once the last view is gone (the
    /// entry is deleted) or if the key is unknown.
    pub fn remove_view(&mut self, key: &StreamKey, view: &ViewHandle) -> Option<&StreamInfo> {
        let info = self.streams.get_mut(key)?;
        info.views.retain(|b| &b.view != view);

        if info.views.is_empty() {
            self.streams.remove(key);
            tracing::debug!(stream = %key, view = %view, "Last view unbound, stream entry removed");
            return None;
        }

        tracing::debug!(stream = %key, view = %view, views = info.views.len(), "View unbound");
        self.streams.get(key)
    }

    /// Merge `update` into the entry for `key`
    pub fn update_stream_info(
        &mut self,
        key: &StreamKey,
        update: StreamInfoUpdate,
    ) -> Option<&StreamInfo> {
        let info = self.streams.get_mut(key)?;
        update.apply(info);
        Some(&*info)
    }

    fn binding_mut(&mut self, key: &StreamKey, view: &ViewHandle) -> Option<&mut ViewBinding> {
        self.streams
            .get_mut(key)?
            .views
            .iter_mut()
            .find(|b| &b.view == view)
    }

    /// Set the visibility flag of a bound view
    ///
    /// Returns `true` if the flag changed.
    pub fn set_view_visibility(&mut self, key: &StreamKey, view: &ViewHandle, visible: bool) -> bool {
        match self.binding_mut(key, view) {
            Some(binding) if binding.is_visible != visible => {
                binding.is_visible = visible;
                true
            }
            _ => false,
        }
    }

    /// Mark a bound view as eager (always played) or lazy
    ///
    /// Eager views count as visible. Turning a view lazy clears its visibility
    /// until the next visibility report.
    pub fn set_view_eager(&mut self, key: &StreamKey, view: &ViewHandle, eager: bool) {
        if let Some(binding) = self.binding_mut(key, view) {
            binding.eager = eager;
            binding.is_visible = eager;
        }
    }

    pub fn get_stream_info(&self, key: &StreamKey) -> Option<&StreamInfo> {
        self.streams.get(key)
    }

    pub fn is_stream_playing(&self, key: &StreamKey) -> bool {
        self.streams.get(key).is_some_and(|i| i.is_playing)
    }

    pub fn get_playing_streams(&self) -> Vec<&StreamInfo> {
        self.streams.values().filter(|i| i.is_playing).collect()
    }

    pub fn get_all_streams(&self) -> Vec<&StreamInfo> {
        self.streams.values().collect()
    }

    /// Visible views of `key` that are still attached to the host
    ///
    /// Detached handles are dropped here so they never reach the engine.
    pub fn valid_visible_views(&self, key: &StreamKey, host: &dyn SurfaceHost) -> Vec<ViewHandle> {
        let Some(info) = self.streams.get(key) else {
            return Vec::new();
        };

        let (valid, stale): (Vec<_>, Vec<_>) = info
            .visible_views()
            .into_iter()
            .partition(|v| host.contains(v));

        for view in &stale {
            tracing::warn!(stream = %key, view = %view, "Skipping detached view");
        }

        valid
    }

    /// Remove every entry, returning them
    pub fn clear(&mut self) -> Vec<StreamInfo> {
        self.streams.drain().map(|(_, info)| info).collect()
    }
}
