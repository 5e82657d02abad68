//! Stream identity and the stream table
//!
//! An entry exists exactly as long as at least one view is bound to its key.

pub mod store;

pub use store::{StreamInfo, StreamInfoManager, StreamInfoUpdate, ViewBinding};

/// Kind of video a subject can publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamKind {
    Camera,
    Screen,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Camera => f.write_str("camera"),
            StreamKind::Screen => f.write_str("screen"),
        }
    }
}

/// Unique identifier for a logical stream (subject + kind)
///
/// All views bound to the same key share one decode pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamKey {
    pub subject_id: String,
    pub kind: StreamKind,
}

impl StreamKey {
    pub fn new(subject_id: impl Into<String>, kind: StreamKind) -> Self {
        Self {
            subject_id: subject_id.into(),
            kind,
        }
    }

    pub fn camera(subject_id: impl Into<String>) -> Self {
        Self::new(subject_id, StreamKind::Camera)
    }

    pub fn screen(subject_id: impl Into<String>) -> Self {
        Self::new(subject_id, StreamKind::Screen)
    }

    pub fn is_screen(&self) -> bool {
        self.kind == StreamKind::Screen
    }
}

impl std::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.subject_id, self.kind)
    }
}

/// Decode quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    Hd,
    #[default]
    Ld,
}

/// How video is fitted into its surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    /// Crop to fill the surface
    #[default]
    Fill,
    /// Letterbox to fit the surface
    Fit,
}

/// Clockwise rotation applied at render time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

/// Per-stream render configuration forwarded to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderParams {
    pub fill_mode: FillMode,
    pub mirror: bool,
    pub rotation: Rotation,
}

impl RenderParams {
    pub fn with_fill_mode(mut self, fill_mode: FillMode) -> Self {
        self.fill_mode = fill_mode;
        self
    }

    pub fn mirrored(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn rotated(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }
}
