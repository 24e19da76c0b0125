//! Render request and response types exchanged with worker threads

use std::sync::Arc;

use crate::transform::Rotation;
use crate::types::{Bitmap, Generation};

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Parameters for rendering a page on screen
#[derive(Clone, Copy, Debug)]
pub struct RenderParams {
    /// User-visible scale factor
    pub scale: f32,
    /// Quarter-turn rotation
    pub rotation: Rotation,
    /// Transform generation this request belongs to
    pub generation: Generation,
}

/// What a fixed-resolution export is for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportKind {
    Download,
    Print,
}

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    /// Render a page for display
    Page {
        id: RequestId,
        page: usize,
        params: RenderParams,
    },

    /// Render a page at document-native scale for download/print.
    /// Results bypass the on-screen cache.
    Export {
        id: RequestId,
        page: usize,
        kind: ExportKind,
        rotation: Rotation,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Errors from render workers
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderFault {
    #[error("page {page} out of range 1..={page_count}")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("{detail}")]
    Generic { detail: String },
}

impl RenderFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Response from render workers
#[derive(Debug)]
pub enum RenderResponse {
    /// Rendered page bitmap for display
    Page {
        id: RequestId,
        page: usize,
        generation: Generation,
        bitmap: Arc<Bitmap>,
    },

    /// Fixed-resolution export result
    Export {
        id: RequestId,
        page: usize,
        kind: ExportKind,
        bitmap: Arc<Bitmap>,
    },

    /// A display render failed; scoped to one page
    Error {
        id: RequestId,
        page: usize,
        generation: Option<Generation>,
        fault: RenderFault,
    },

    /// The worker could not open its own document handle and exited
    WorkerLost { detail: String },
}
