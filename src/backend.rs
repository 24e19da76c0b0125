//! Decode backend seam
//!
//! The engine never talks to a document decoder directly; it goes through
//! `DocumentBackend`/`PageProvider` so the rendering core stays independent
//! of the binary format. The `pdf` feature supplies a MuPDF implementation.

use crate::error::LoadError;
use crate::request::RenderFault;
use crate::transform::Rotation;
use crate::types::{Bitmap, PageSize};

#[cfg(feature = "pdf")]
pub mod pdf;

/// An open document handle, owned by the thread that opened it.
///
/// Render workers and the open thread each call `DocumentBackend::open`
/// themselves and keep the provider thread-local, so decoders that are
/// neither `Send` nor `Sync` work unmodified.
pub trait PageProvider {
    /// Number of pages in the document. Always >= 1 for a successful open.
    fn page_count(&self) -> usize;

    /// Document title metadata, when the format carries one.
    fn title(&self) -> Option<String> {
        None
    }

    /// Native page dimensions in document units. `page` is 1-based.
    fn page_size(&self, page: usize) -> Result<PageSize, RenderFault>;

    /// Rasterize one page to an RGB bitmap of exactly the given pixel
    /// dimensions, with the rotation already applied. `page` is 1-based.
    fn render(
        &self,
        page: usize,
        pixel_width: u32,
        pixel_height: u32,
        rotation: Rotation,
    ) -> Result<Bitmap, RenderFault>;
}

/// Factory for `PageProvider`s. One backend serves every document the
/// viewer opens; workers call `open` again to get their own handle.
pub trait DocumentBackend: Send + Sync + 'static {
    /// Open the document behind an opaque locator.
    ///
    /// `progress` receives values in [0, 1]; implementations should report
    /// monotonically, but the caller enforces monotonicity anyway.
    fn open(
        &self,
        locator: &str,
        progress: &mut dyn FnMut(f32),
    ) -> Result<Box<dyn PageProvider>, LoadError>;
}
