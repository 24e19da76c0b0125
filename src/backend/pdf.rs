//! MuPDF-backed document backend

use std::path::Path;

use mupdf::{Colorspace, Document, Matrix, Pixmap};

use crate::backend::{DocumentBackend, PageProvider};
use crate::error::LoadError;
use crate::request::RenderFault;
use crate::transform::Rotation;
use crate::types::{Bitmap, PageSize};

fn decode_err(e: mupdf::error::Error) -> RenderFault {
    RenderFault::Decode(e.to_string())
}

/// Opens PDF (and other MuPDF-supported) documents from filesystem paths.
pub struct MupdfBackend;

impl DocumentBackend for MupdfBackend {
    fn open(
        &self,
        locator: &str,
        progress: &mut dyn FnMut(f32),
    ) -> Result<Box<dyn PageProvider>, LoadError> {
        progress(0.0);
        if !Path::new(locator).exists() {
            return Err(LoadError::Network(format!("cannot reach {locator}")));
        }

        let doc = Document::open(locator).map_err(|e| LoadError::Corrupt(e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| LoadError::Corrupt(e.to_string()))? as usize;
        if page_count == 0 {
            return Err(LoadError::Unsupported(format!(
                "{locator} contains no renderable pages"
            )));
        }

        progress(1.0);
        Ok(Box::new(MupdfProvider { doc, page_count }))
    }
}

struct MupdfProvider {
    doc: Document,
    page_count: usize,
}

impl MupdfProvider {
    fn bounds(&self, page: usize) -> Result<(f32, f32), RenderFault> {
        let page = self.doc.load_page(page as i32 - 1).map_err(decode_err)?;
        let bounds = page.bounds().map_err(decode_err)?;
        Ok((bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
    }
}

impl PageProvider for MupdfProvider {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn title(&self) -> Option<String> {
        self.doc
            .metadata(mupdf::MetadataName::Title)
            .ok()
            .filter(|t| !t.is_empty())
    }

    fn page_size(&self, page: usize) -> Result<PageSize, RenderFault> {
        let (width, height) = self.bounds(page)?;
        Ok(PageSize::new(width, height))
    }

    fn render(
        &self,
        page_num: usize,
        pixel_width: u32,
        pixel_height: u32,
        rotation: Rotation,
    ) -> Result<Bitmap, RenderFault> {
        let page = self.doc.load_page(page_num as i32 - 1).map_err(decode_err)?;
        let bounds = page.bounds().map_err(decode_err)?;
        let native_width = (bounds.x1 - bounds.x0).max(1.0);
        let native_height = (bounds.y1 - bounds.y0).max(1.0);

        // The requested pixel extent is already rotated; map it back to
        // the native axes for the scale factors.
        let (sx, sy) = if rotation.is_sideways() {
            (
                pixel_height as f32 / native_width,
                pixel_width as f32 / native_height,
            )
        } else {
            (
                pixel_width as f32 / native_width,
                pixel_height as f32 / native_height,
            )
        };

        let mut ctm = Matrix::new_scale(sx, sy);
        ctm.rotate(f32::from(rotation.degrees()));

        let rgb = Colorspace::device_rgb();
        let pixmap = page
            .to_pixmap(&ctm, &rgb, false, false)
            .map_err(decode_err)?;

        let pixels = pixmap_to_rgb(&pixmap)?;
        Ok(Bitmap {
            pixels,
            width: pixmap.width(),
            height: pixmap.height(),
        })
    }
}

/// Flatten a pixmap into tightly packed RGB rows, dropping alpha and any
/// stride padding.
fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, RenderFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(RenderFault::generic(format!(
            "unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err(RenderFault::generic("pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(out)
}
