//! Quality policy configuration

use std::time::Duration;

use crate::surface::Size;

/// Configuration for [`VideoQualityManager`](super::VideoQualityManager)
#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// Maximum streams holding a high-quality slot
    pub high_quality_capacity: usize,

    /// Size whose area is the raw HD threshold
    pub hd_threshold: Size,

    /// Dead-zone factor; HD needs `area > threshold * factor`
    pub hysteresis_factor: f64,

    /// Delay before a batch of view resizes is evaluated
    pub resize_debounce: Duration,

    /// Delay before a viewport resize refreshes the cached viewport area
    pub viewport_debounce: Duration,

    /// Viewport assumed until the host reports one
    pub initial_viewport: Size,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            high_quality_capacity: 6,
            hd_threshold: Size::new(480.0, 270.0),
            hysteresis_factor: 1.15,
            resize_debounce: Duration::from_millis(300),
            viewport_debounce: Duration::from_millis(300),
            initial_viewport: Size::new(1920.0, 1080.0),
        }
    }
}

impl QualityConfig {
    /// Set the high-quality slot capacity (at least 1)
    pub fn high_quality_capacity(mut self, capacity: usize) -> Self {
        self.high_quality_capacity = capacity.max(1);
        self
    }

    pub fn hd_threshold(mut self, width: f64, height: f64) -> Self {
        self.hd_threshold = Size::new(width, height);
        self
    }

    /// Set the hysteresis factor (at least 1.0)
    pub fn hysteresis_factor(mut self, factor: f64) -> Self {
        self.hysteresis_factor = if factor.is_finite() { factor.max(1.0) } else { 1.0 };
        self
    }

    pub fn resize_debounce(mut self, delay: Duration) -> Self {
        self.resize_debounce = delay;
        self
    }

    pub fn viewport_debounce(mut self, delay: Duration) -> Self {
        self.viewport_debounce = delay;
        self
    }

    pub fn initial_viewport(mut self, width: f64, height: f64) -> Self {
        self.initial_viewport = Size::new(width, height);
        self
    }

    /// Area a stream must exceed to play in HD
    pub fn promote_area(&self) -> f64 {
        self.hd_threshold.area() * self.hysteresis_factor
    }
}
