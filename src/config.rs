//! Engine configuration

use serde::{Deserialize, Serialize};

use crate::transform::ZoomBounds;

fn default_workers() -> usize {
    2
}
fn default_cache_capacity() -> usize {
    64
}
fn default_buffer_pages() -> usize {
    2
}
fn default_scroll_throttle_ms() -> u64 {
    100
}
fn default_resize_debounce_ms() -> u64 {
    150
}
fn default_min_scale() -> f32 {
    0.1
}
fn default_max_scale() -> f32 {
    8.0
}
fn default_zoom_step() -> f32 {
    1.25
}
fn default_estimated_page_width() -> f32 {
    612.0
}
fn default_estimated_page_height() -> f32 {
    792.0
}
fn default_page_gap() -> f32 {
    16.0
}
fn default_start_page() -> usize {
    1
}
fn default_zoom_percent() -> f32 {
    100.0
}

/// Display parameters applied when a document opens
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InitialView {
    #[serde(default = "default_start_page")]
    pub page: usize,

    #[serde(default = "default_zoom_percent")]
    pub zoom_percent: f32,

    /// Quarter-turn rotation in degrees; invalid values fall back to 0
    #[serde(default)]
    pub rotation_degrees: u16,
}

impl Default for InitialView {
    fn default() -> Self {
        Self {
            page: default_start_page(),
            zoom_percent: default_zoom_percent(),
            rotation_degrees: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Render worker threads per document session
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// LRU cap of the render cache, in pages
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Pages kept rendered on each side of the visible range
    #[serde(default = "default_buffer_pages")]
    pub buffer_pages: usize,

    /// Minimum interval between scroll-driven window recomputations
    #[serde(default = "default_scroll_throttle_ms")]
    pub scroll_throttle_ms: u64,

    /// Quiet period before a resize is acted on
    #[serde(default = "default_resize_debounce_ms")]
    pub resize_debounce_ms: u64,

    #[serde(default = "default_min_scale")]
    pub min_scale: f32,

    #[serde(default = "default_max_scale")]
    pub max_scale: f32,

    /// Multiplier applied per zoom step
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f32,

    /// Placeholder page size until the document reports real dimensions
    /// (US Letter in points)
    #[serde(default = "default_estimated_page_width")]
    pub estimated_page_width: f32,

    #[serde(default = "default_estimated_page_height")]
    pub estimated_page_height: f32,

    /// Vertical gap between consecutive pages, in pixels
    #[serde(default = "default_page_gap")]
    pub page_gap: f32,

    #[serde(default)]
    pub initial: InitialView,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            cache_capacity: default_cache_capacity(),
            buffer_pages: default_buffer_pages(),
            scroll_throttle_ms: default_scroll_throttle_ms(),
            resize_debounce_ms: default_resize_debounce_ms(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            zoom_step: default_zoom_step(),
            estimated_page_width: default_estimated_page_width(),
            estimated_page_height: default_estimated_page_height(),
            page_gap: default_page_gap(),
            initial: InitialView::default(),
        }
    }
}

impl ViewerConfig {
    #[must_use]
    pub fn zoom_bounds(&self) -> ZoomBounds {
        ZoomBounds {
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            step: self.zoom_step,
        }
    }
}
