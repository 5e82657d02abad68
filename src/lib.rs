//! View binding and adaptive-quality policy for multi-party video playback
//!
//! Many on-screen tiles come and go, each bound to a logical stream
//! (a subject's camera or screen share). This crate decides which streams
//! to actually decode, at what quality, and when to start or stop decoding.
//!
//! # Components
//!
//! ```text
//!                    StreamViewCoordinator
//!        ┌─────────────┬───────┴───────┬──────────────┐
//!        ▼             ▼               ▼              ▼
//!  StreamInfoManager  LazyLoadManager  VideoQualityManager  StreamPlayer
//!  (who wants what)   (visibility)     (HD slot pool)       (MediaEngine)
//! ```
//!
//! The host application supplies two seams: a [`MediaEngine`] that performs
//! the real decode calls, and a [`SurfaceHost`] that knows which surfaces exist
//! and creates visibility/size observers for them.

pub mod coordinator;
pub mod error;
pub mod lazy;
pub mod player;
pub mod quality;
pub mod stream;
pub mod surface;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{BindRequest, CoordinatorConfig, StreamConfigRequest, StreamViewCoordinator};
pub use error::{Error, Result};
pub use lazy::{LazyLoadManager, VisibilityChange};
pub use player::{EngineError, MediaEngine, StreamPlayer, StreamTier};
pub use quality::{QualityChange, QualityChangeReason, QualityConfig, VideoQualityManager};
pub use stream::{
    FillMode, Quality, RenderParams, Rotation, StreamInfo, StreamInfoManager, StreamKey,
    StreamKind,
};
pub use surface::{
    IntersectionEntry, ResizeEntry, Size, SurfaceHost, SurfaceObserver, ViewHandle,
};
