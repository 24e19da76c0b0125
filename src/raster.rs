//! Page rasterization workers
//!
//! Workers run in dedicated threads, each with its own backend handle, and
//! pull from one shared request queue. Every fault is converted to a
//! response; nothing escapes a worker uncaught.

use std::sync::Arc;

use flume::{Receiver, Sender};
use log::{debug, error};

use crate::backend::{DocumentBackend, PageProvider};
use crate::request::{RenderFault, RenderParams, RenderRequest, RenderResponse};
use crate::transform::Rotation;
use crate::types::{Bitmap, PageSize};

/// Largest pixel dimension a render is allowed to reach; magnification is
/// reduced to fit so a deep zoom on a large page cannot exhaust memory.
pub const MAX_RENDER_DIMENSION: f32 = 16_384.0;

/// Pre-computed pixel dimensions for one rasterization
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterSpec {
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl RasterSpec {
    /// Compute output dimensions from the page's native size, the user
    /// scale, and the rotation (90/270 swap the axes).
    #[must_use]
    pub fn compute(native: PageSize, scale: f32, rotation: Rotation) -> Self {
        let oriented = native.oriented(rotation);
        let mut out_width = oriented.width * scale;
        let mut out_height = oriented.height * scale;

        let max_dim = out_width.max(out_height);
        if max_dim > MAX_RENDER_DIMENSION {
            let reduction = MAX_RENDER_DIMENSION / max_dim;
            out_width *= reduction;
            out_height *= reduction;
        }

        Self {
            pixel_width: (out_width.round() as u32).max(1),
            pixel_height: (out_height.round() as u32).max(1),
        }
    }
}

/// Spawn `count` worker threads for one document session. Each worker
/// opens its own handle from the locator; open progress of workers is not
/// reported (the document-level open already was).
pub fn spawn_workers(
    backend: &Arc<dyn DocumentBackend>,
    locator: &str,
    count: usize,
    requests: &Receiver<RenderRequest>,
    responses: &Sender<RenderResponse>,
) {
    for _ in 0..count.max(1) {
        let backend = Arc::clone(backend);
        let locator = locator.to_string();
        let rx = requests.clone();
        let tx = responses.clone();

        std::thread::spawn(move || {
            let mut sink = |_progress: f32| {};
            match backend.open(&locator, &mut sink) {
                Ok(provider) => render_worker(provider.as_ref(), &rx, &tx),
                Err(e) => {
                    error!("render worker failed to open {locator}: {e}");
                    let _ = tx.send(RenderResponse::WorkerLost {
                        detail: e.to_string(),
                    });
                }
            }
        });
    }
}

/// Main worker loop. Exits on `Shutdown` or when the request channel
/// disconnects (the session was dropped).
pub fn render_worker(
    provider: &dyn PageProvider,
    requests: &Receiver<RenderRequest>,
    responses: &Sender<RenderResponse>,
) {
    for request in requests.iter() {
        match request {
            RenderRequest::Page { id, page, params } => {
                match render_page(provider, page, &params) {
                    Ok(bitmap) => {
                        let _ = responses.send(RenderResponse::Page {
                            id,
                            page,
                            generation: params.generation,
                            bitmap: Arc::new(bitmap),
                        });
                    }
                    Err(fault) => {
                        debug!("render of page {page} failed: {fault}");
                        let _ = responses.send(RenderResponse::Error {
                            id,
                            page,
                            generation: Some(params.generation),
                            fault,
                        });
                    }
                }
            }

            RenderRequest::Export {
                id,
                page,
                kind,
                rotation,
            } => match render_export(provider, page, rotation) {
                Ok(bitmap) => {
                    let _ = responses.send(RenderResponse::Export {
                        id,
                        page,
                        kind,
                        bitmap: Arc::new(bitmap),
                    });
                }
                Err(fault) => {
                    let _ = responses.send(RenderResponse::Error {
                        id,
                        page,
                        generation: None,
                        fault,
                    });
                }
            },

            RenderRequest::Shutdown => break,
        }
    }
}

fn check_page(provider: &dyn PageProvider, page: usize) -> Result<(), RenderFault> {
    let page_count = provider.page_count();
    if page == 0 || page > page_count {
        return Err(RenderFault::PageOutOfRange { page, page_count });
    }
    Ok(())
}

/// Render a single page for display.
fn render_page(
    provider: &dyn PageProvider,
    page: usize,
    params: &RenderParams,
) -> Result<Bitmap, RenderFault> {
    check_page(provider, page)?;
    let native = provider.page_size(page)?;
    let spec = RasterSpec::compute(native, params.scale, params.rotation);
    provider.render(page, spec.pixel_width, spec.pixel_height, params.rotation)
}

/// Render a single page at document-native scale for export.
fn render_export(
    provider: &dyn PageProvider,
    page: usize,
    rotation: Rotation,
) -> Result<Bitmap, RenderFault> {
    check_page(provider, page)?;
    let native = provider.page_size(page)?;
    let spec = RasterSpec::compute(native, 1.0, rotation);
    provider.render(page, spec.pixel_width, spec.pixel_height, rotation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_spec_scales_native_size() {
        let spec = RasterSpec::compute(PageSize::new(600.0, 800.0), 1.5, Rotation::Deg0);
        assert_eq!(spec.pixel_width, 900);
        assert_eq!(spec.pixel_height, 1200);
    }

    #[test]
    fn raster_spec_swaps_axes_when_sideways() {
        let spec = RasterSpec::compute(PageSize::new(600.0, 800.0), 1.0, Rotation::Deg270);
        assert_eq!(spec.pixel_width, 800);
        assert_eq!(spec.pixel_height, 600);
    }

    #[test]
    fn raster_spec_clamps_extreme_magnification() {
        let spec = RasterSpec::compute(PageSize::new(600.0, 800.0), 1000.0, Rotation::Deg0);
        assert!(spec.pixel_height as f32 <= MAX_RENDER_DIMENSION);
        assert!(spec.pixel_width >= 1);
        // Aspect ratio survives the clamp.
        let ratio = spec.pixel_width as f32 / spec.pixel_height as f32;
        assert!((ratio - 0.75).abs() < 0.01);
    }

    #[test]
    fn raster_spec_never_produces_zero_dimension() {
        let spec = RasterSpec::compute(PageSize::new(0.3, 0.3), 0.1, Rotation::Deg0);
        assert_eq!(spec.pixel_width, 1);
        assert_eq!(spec.pixel_height, 1);
    }
}
