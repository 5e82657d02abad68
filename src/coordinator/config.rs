//! Coordinator configuration

use crate::quality::QualityConfig;
use crate::stream::FillMode;

/// Configuration for [`StreamViewCoordinator`](super::StreamViewCoordinator)
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Quality policy
    pub quality: QualityConfig,

    /// Defer playback until a view is visible, unless a bind says otherwise
    pub lazy_load: bool,

    /// Fill mode of newly created streams
    pub default_fill_mode: FillMode,

    /// Subject whose own streams are played eagerly and never in HD
    pub local_subject_id: Option<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            quality: QualityConfig::default(),
            lazy_load: true,
            default_fill_mode: FillMode::Fill,
            local_subject_id: None,
        }
    }
}

impl CoordinatorConfig {
    /// Set the quality policy
    pub fn quality(mut self, quality: QualityConfig) -> Self {
        self.quality = quality;
        self
    }

    /// Set the default lazy-loading behavior
    pub fn lazy_load(mut self, enabled: bool) -> Self {
        self.lazy_load = enabled;
        self
    }

    /// Set the fill mode of newly created streams
    pub fn default_fill_mode(mut self, fill_mode: FillMode) -> Self {
        self.default_fill_mode = fill_mode;
        self
    }

    /// Set the local subject
    pub fn local_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.local_subject_id = Some(subject_id.into());
        self
    }
}
