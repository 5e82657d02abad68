//! Media engine boundary
//!
//! The host implements [`MediaEngine`] on top of its real-time SDK. Every
//! method may suspend and may fail; failures surface as [`EngineError`].

use std::future::Future;

use thiserror::Error;

use crate::stream::{Quality, RenderParams, StreamKind};
use crate::surface::ViewHandle;

/// Engine-level stream tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamTier {
    /// High-definition camera layer
    CameraHigh,
    /// Low-definition camera layer
    CameraLow,
    /// Dedicated screen-share layer
    Screen,
}

impl StreamTier {
    /// Resolve the tier for a stream kind at a quality
    ///
    /// Screen share always uses the screen tier.
    pub fn resolve(kind: StreamKind, quality: Quality) -> Self {
        match (kind, quality) {
            (StreamKind::Screen, _) => StreamTier::Screen,
            (StreamKind::Camera, Quality::Hd) => StreamTier::CameraHigh,
            (StreamKind::Camera, Quality::Ld) => StreamTier::CameraLow,
        }
    }
}

/// Error returned by the media engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A surface passed to the engine does not exist
    #[error("surface not found: {0}")]
    SurfaceNotFound(ViewHandle),

    /// The engine rejected the call
    #[error("engine rejected call (code {code}): {message}")]
    Rejected { code: i32, message: String },

    /// The engine is not initialized or already torn down
    #[error("engine unavailable")]
    Unavailable,
}

impl EngineError {
    pub fn rejected(code: i32, message: impl Into<String>) -> Self {
        EngineError::Rejected {
            code,
            message: message.into(),
        }
    }
}

/// Calls the coordinator needs from the real-time engine
///
/// Implementations may write these as `async fn`; the returned futures must be
/// `Send` so the coordinator can drive them from spawned debounce tasks.
pub trait MediaEngine: Send + Sync + 'static {
    /// Bind `surfaces` to a remote stream and start decoding it at `tier`
    fn start_decode(
        &self,
        subject_id: &str,
        tier: StreamTier,
        surfaces: &[ViewHandle],
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Stop decoding a remote stream
    fn stop_decode(
        &self,
        subject_id: &str,
        tier: StreamTier,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Rebind an already decoding remote stream to `surfaces`
    fn update_remote_surfaces(
        &self,
        subject_id: &str,
        tier: StreamTier,
        surfaces: &[ViewHandle],
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Bind the local camera preview to `surfaces` (empty clears it)
    fn bind_local_surfaces(
        &self,
        surfaces: &[ViewHandle],
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Apply render parameters to a remote stream
    fn set_render_params(
        &self,
        subject_id: &str,
        tier: StreamTier,
        params: RenderParams,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Apply render parameters to the local preview
    fn set_local_render_params(
        &self,
        params: RenderParams,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_resolution() {
        assert_eq!(
            StreamTier::resolve(StreamKind::Camera, Quality::Hd),
            StreamTier::CameraHigh
        );
        assert_eq!(
            StreamTier::resolve(StreamKind::Camera, Quality::Ld),
            StreamTier::CameraLow
        );
        assert_eq!(
            StreamTier::resolve(StreamKind::Screen, Quality::Ld),
            StreamTier::Screen
        );
        assert_eq!(
            StreamTier::resolve(StreamKind::Screen, Quality::Hd),
            StreamTier::Screen
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            EngineError::rejected(-1301, "decoder busy").to_string(),
            "engine rejected call (code -1301): decoder busy"
        );
        assert_eq!(
            EngineError::SurfaceNotFound(ViewHandle::new("tile-9")).to_string(),
            "surface not found: tile-9"
        );
    }
}
