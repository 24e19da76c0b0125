//! Core types shared across the rendering engine

use std::sync::Arc;

use crate::transform::Rotation;

/// Raw rendered page image.
///
/// Contains RGB pixel data (3 bytes per pixel) at the dimensions the
/// rasterizer produced. Bitmaps are handed out behind `Arc` so the cache,
/// the page states and the compositor can share one copy.
#[derive(Clone)]
pub struct Bitmap {
    /// Raw RGB pixel data (3 bytes per pixel: R, G, B)
    pub pixels: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Native (unscaled, unrotated) page dimensions in document units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Dimensions after applying a rotation: 90/270 swap width and height.
    #[must_use]
    pub fn oriented(self, rotation: Rotation) -> Self {
        if rotation.is_sideways() {
            Self::new(self.height, self.width)
        } else {
            self
        }
    }
}

/// Width and height of the host viewport in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Extent {
    pub width: f32,
    pub height: f32,
}

impl Extent {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Monotonic counter invalidating stale asynchronous render results.
///
/// Bumped on every transform mutation and on document replacement; a
/// completed render whose generation no longer matches is discarded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u64);

impl Generation {
    pub fn bump(&mut self) {
        self.0 += 1;
    }
}

/// Render lifecycle of a single page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderPhase {
    /// Nothing requested yet; a sized placeholder is shown
    #[default]
    Placeholder,
    /// A render task is in flight
    Pending,
    /// A bitmap matching the current transform is available
    Rendered,
    /// The last render attempt failed; retried on next window entry
    Failed,
}

/// Per-page render state. Created lazily when a page first enters the
/// visible window, dropped wholesale on any global transform change.
#[derive(Clone, Debug)]
pub struct PageState {
    /// Page number (1-based)
    pub page: usize,
    pub phase: RenderPhase,
    /// Scale the bitmap was rendered at, if any
    pub rendered_scale: Option<f32>,
    /// Rotation the bitmap was rendered at, if any
    pub rendered_rotation: Option<Rotation>,
    pub bitmap: Option<Arc<Bitmap>>,
}

impl PageState {
    #[must_use]
    pub fn placeholder(page: usize) -> Self {
        Self {
            page,
            phase: RenderPhase::Placeholder,
            rendered_scale: None,
            rendered_rotation: None,
            bitmap: None,
        }
    }
}

/// Load lifecycle of the document itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Ready,
    Failed,
}
