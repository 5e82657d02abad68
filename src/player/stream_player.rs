//! Stream player
//!
//! The only component that talks to the [`MediaEngine`]. Chooses the local or
//! remote path by subject identity and the engine tier by kind and quality.

use parking_lot::RwLock;

use crate::stream::{Quality, RenderParams, StreamKey, StreamKind};
use crate::surface::ViewHandle;

use super::engine::{EngineError, MediaEngine, StreamTier};

/// Drives the media engine for individual streams
///
/// Engine failures are logged with their context and returned unchanged.
pub struct StreamPlayer<E: MediaEngine> {
    engine: E,
    local_subject_id: RwLock<Option<String>>,
}

impl<E: MediaEngine> StreamPlayer<E> {
    /// Create a player over `engine`
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            local_subject_id: RwLock::new(None),
        }
    }

    /// Get the underlying engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Set the subject whose camera uses the local preview path
    pub fn set_local_subject(&self, subject_id: Option<String>) {
        *self.local_subject_id.write() = subject_id;
    }

    /// Check if `subject_id` is the local subject
    pub fn is_local(&self, subject_id: &str) -> bool {
        self.local_subject_id.read().as_deref() == Some(subject_id)
    }

    /// Local camera goes through the preview path; everything else, including
    /// the local screen share, is decoded as a remote stream.
    fn is_local_camera(&self, key: &StreamKey) -> bool {
        key.kind == StreamKind::Camera && self.is_local(&key.subject_id)
    }

    /// Start rendering `key` into `views` at `quality`
    pub async fn start_play_video(
        &self,
        key: &StreamKey,
        quality: Quality,
        views: &[ViewHandle],
    ) -> Result<(), EngineError> {
        if views.is_empty() {
            tracing::warn!(stream = %key, "No views to play into, skipping start");
            return Ok(());
        }

        let tier = StreamTier::resolve(key.kind, quality);
        let result = if self.is_local_camera(key) {
            self.engine.bind_local_surfaces(views).await
        } else {
            self.engine.start_decode(&key.subject_id, tier, views).await
        };

        match &result {
            Ok(()) => tracing::info!(stream = %key, tier = ?tier, views = views.len(), "Video started"),
            Err(e) => tracing::error!(stream = %key, quality = ?quality, error = %e, "Failed to start video"),
        }
        result
    }

    /// Stop rendering `key`
    pub async fn stop_play_video(&self, key: &StreamKey, quality: Quality) -> Result<(), EngineError> {
        let tier = StreamTier::resolve(key.kind, quality);
        let result = if self.is_local_camera(key) {
            self.engine.bind_local_surfaces(&[]).await
        } else {
            self.engine.stop_decode(&key.subject_id, tier).await
        };

        match &result {
            Ok(()) => tracing::info!(stream = %key, quality = ?quality, "Video stopped"),
            Err(e) => tracing::error!(stream = %key, quality = ?quality, error = %e, "Failed to stop video"),
        }
        result
    }

    /// Rebind a playing stream to a new view list without restarting decode
    pub async fn update_video_view(
        &self,
        key: &StreamKey,
        quality: Quality,
        views: &[ViewHandle],
    ) -> Result<(), EngineError> {
        if views.is_empty() {
            tracing::warn!(stream = %key, "Empty view list, skipping view update");
            return Ok(());
        }

        let tier = StreamTier::resolve(key.kind, quality);
        let result = if self.is_local_camera(key) {
            self.engine.bind_local_surfaces(views).await
        } else {
            self.engine
                .update_remote_surfaces(&key.subject_id, tier, views)
                .await
        };

        result.map_err(|e| {
            tracing::error!(stream = %key, quality = ?quality, error = %e, "Failed to update video views");
            e
        })
    }

    /// Switch a playing remote camera to `quality`
    ///
    /// No-op for the local subject and for screen share.
    pub async fn update_video_quality(
        &self,
        key: &StreamKey,
        quality: Quality,
        views: &[ViewHandle],
    ) -> Result<(), EngineError> {
        if key.is_screen() || self.is_local(&key.subject_id) {
            tracing::debug!(stream = %key, "Quality fixed for this stream, skipping update");
            return Ok(());
        }
        if views.is_empty() {
            tracing::warn!(stream = %key, "Empty view list, skipping quality update");
            return Ok(());
        }

        let tier = StreamTier::resolve(key.kind, quality);
        let result = self.engine.start_decode(&key.subject_id, tier, views).await;
        match &result {
            Ok(()) => tracing::info!(stream = %key, quality = ?quality, "Video quality switched"),
            Err(e) => tracing::error!(stream = %key, quality = ?quality, error = %e, "Failed to switch video quality"),
        }
        result
    }

    /// Apply render parameters to `key`
    pub async fn set_render_params(
        &self,
        key: &StreamKey,
        quality: Quality,
        params: RenderParams,
    ) -> Result<(), EngineError> {
        let result = if self.is_local_camera(key) {
            self.engine.set_local_render_params(params).await
        } else {
            let tier = StreamTier::resolve(key.kind, quality);
            self.engine
                .set_render_params(&key.subject_id, tier, params)
                .await
        };

        result.map_err(|e| {
            tracing::error!(stream = %key, params = ?params, error = %e, "Failed to set render params");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EngineCall, RecordingEngine};

    fn views(ids: &[&str]) -> Vec<ViewHandle> {
        ids.iter().map(|id| ViewHandle::new(*id)).collect()
    }

    fn player() -> StreamPlayer<RecordingEngine> {
        let player = StreamPlayer::new(RecordingEngine::new());
        player.set_local_subject(Some("me".into()));
        player
    }

    #[tokio::test]
    async fn test_remote_camera_start_and_stop() {
        let player = player();
        let key = StreamKey::camera("alice");

        player
            .start_play_video(&key, Quality::Hd, &views(&["a"]))
            .await
            .unwrap();
        player.stop_play_video(&key, Quality::Hd).await.unwrap();

        assert_eq!(
            player.engine().calls(),
            vec![
                EngineCall::StartDecode("alice".into(), StreamTier::CameraHigh, views(&["a"])),
                EngineCall::StopDecode("alice".into(), StreamTier::CameraHigh),
            ]
        );
    }

    #[tokio::test]
    async fn test_local_camera_uses_preview_path() {
        let player = player();
        let key = StreamKey::camera("me");

        player
            .start_play_video(&key, Quality::Ld, &views(&["self"]))
            .await
            .unwrap();
        player.stop_play_video(&key, Quality::Ld).await.unwrap();

        assert_eq!(
            player.engine().calls(),
            vec![
                EngineCall::BindLocal(views(&["self"])),
                EngineCall::BindLocal(vec![]),
            ]
        );
    }

    #[tokio::test]
    async fn test_local_screen_share_decoded_as_remote() {
        let player = player();
        let key = StreamKey::screen("me");

        player
            .start_play_video(&key, Quality::Ld, &views(&["share"]))
            .await
            .unwrap();

        assert_eq!(
            player.engine().calls(),
            vec![EngineCall::StartDecode("me".into(), StreamTier::Screen, views(&["share"]))]
        );
    }

    #[tokio::test]
    async fn test_empty_view_list_is_noop() {
        let player = player();
        let key = StreamKey::camera("alice");

        tokio_test::assert_ok!(player.start_play_video(&key, Quality::Hd, &[]).await);
        tokio_test::assert_ok!(player.update_video_view(&key, Quality::Hd, &[]).await);

        assert!(player.engine().calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_view_rebinds_without_restart() {
        let player = player();

        player
            .update_video_view(&StreamKey::camera("alice"), Quality::Ld, &views(&["a", "b"]))
            .await
            .unwrap();
        player
            .update_video_view(&StreamKey::camera("me"), Quality::Ld, &views(&["self"]))
            .await
            .unwrap();

        assert_eq!(
            player.engine().calls(),
            vec![
                EngineCall::UpdateRemote("alice".into(), StreamTier::CameraLow, views(&["a", "b"])),
                EngineCall::BindLocal(views(&["self"])),
            ]
        );
    }

    #[tokio::test]
    async fn test_quality_update_skips_local_and_screen() {
        let player = player();

        player
            .update_video_quality(&StreamKey::camera("me"), Quality::Hd, &views(&["self"]))
            .await
            .unwrap();
        player
            .update_video_quality(&StreamKey::screen("alice"), Quality::Hd, &views(&["s"]))
            .await
            .unwrap();
        assert!(player.engine().calls().is_empty());

        player
            .update_video_quality(&StreamKey::camera("alice"), Quality::Hd, &views(&["a"]))
            .await
            .unwrap();
        assert_eq!(
            player.engine().calls(),
            vec![EngineCall::StartDecode("alice".into(), StreamTier::CameraHigh, views(&["a"]))]
        );
    }

    #[tokio::test]
    async fn test_render_params_path() {
        let player = player();
        let params = RenderParams::default().mirrored(true);

        player
            .set_render_params(&StreamKey::camera("me"), Quality::Ld, params)
            .await
            .unwrap();
        player
            .set_render_params(&StreamKey::screen("alice"), Quality::Ld, params)
            .await
            .unwrap();

        assert_eq!(
            player.engine().calls(),
            vec![
                EngineCall::LocalRenderParams(params),
                EngineCall::RenderParams("alice".into(), StreamTier::Screen, params),
            ]
        );
    }

    #[tokio::test]
    async fn test_engine_errors_propagate_unchanged() {
        let player = player();
        let key = StreamKey::camera("alice");
        player.engine().fail_next(EngineError::rejected(-3, "no decoder"));

        let err = tokio_test::assert_err!(player.start_play_video(&key, Quality::Ld, &views(&["a"])).await);
        assert_eq!(err, EngineError::rejected(-3, "no decoder"));

        player.engine().fail_next(EngineError::Unavailable);
        let err = tokio_test::assert_err!(player.stop_play_video(&key, Quality::Ld).await);
        assert_eq!(err, EngineError::Unavailable);
    }
}
