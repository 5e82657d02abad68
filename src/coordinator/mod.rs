//! Stream view coordination
//!
//! The public entry point. Binding a view registers it everywhere it needs to
//! be tracked; visibility and size reports flow back through the leaf
//! managers and end up as start, stop and quality calls on the player.
//!
//! ```text
//! bind_view ──► StreamInfoManager ──► LazyLoadManager ──(visible)──┐
//!                      │                                           ▼
//!                      └──► VideoQualityManager ──(quality)──► refresh ──► StreamPlayer
//! ```

pub mod config;
pub mod manager;

pub use config::CoordinatorConfig;
pub use manager::StreamViewCoordinator;

use crate::stream::{RenderParams, StreamKey};
use crate::surface::ViewHandle;

/// Bind (or re-route) a view to a stream
#[derive(Debug, Clone, PartialEq)]
pub struct BindRequest {
    /// Stream to render
    pub key: StreamKey,
    /// Surface to render into
    pub view: ViewHandle,
    /// Override the configured lazy-loading default
    pub lazy_load: Option<bool>,
}

impl BindRequest {
    pub fn new(key: StreamKey, view: ViewHandle) -> Self {
        Self {
            key,
            view,
            lazy_load: None,
        }
    }

    /// Play only while visible (`true`) or immediately (`false`)
    pub fn lazy_load(mut self, enabled: bool) -> Self {
        self.lazy_load = Some(enabled);
        self
    }
}

/// Render configuration for a stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamConfigRequest {
    pub key: StreamKey,
    pub render_params: RenderParams,
}

impl StreamConfigRequest {
    pub fn new(key: StreamKey, render_params: RenderParams) -> Self {
        Self { key, render_params }
    }
}
