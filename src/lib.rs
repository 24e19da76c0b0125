//! Virtualized page-rendering engine for paginated document viewers.
//!
//! Opens a document through a pluggable decode backend, computes the page
//! window worth rendering from the scroll position, rasterizes only those
//! pages on a worker pool, and caches results tagged with the transform
//! that produced them. A generation counter keeps everything consistent
//! while the viewport scrolls, resizes, zooms and rotates mid-render.

pub mod backend;
pub mod cache;
pub mod compositor;
pub mod config;
pub mod error;
pub mod raster;
pub mod request;
pub mod source;
pub mod state;
pub mod transform;
pub mod types;
pub mod viewer;
pub mod window;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use backend::{DocumentBackend, PageProvider};
pub use cache::RenderCache;
pub use compositor::{Compositor, PageSlot};
pub use config::{InitialView, ViewerConfig};
pub use error::{LoadError, LoadErrorKind, PageRenderError, ViewerError};
pub use request::{ExportKind, RenderFault};
pub use source::DocumentInfo;
pub use transform::{FitMode, GlobalTransform, Rotation, ZoomBounds};
pub use types::{Bitmap, Extent, Generation, LoadState, PageSize, PageState, RenderPhase};
pub use viewer::{DocumentViewer, ViewerEvent};
pub use window::ViewportWindow;
