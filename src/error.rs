//! Error taxonomy: fatal document-level failures vs page-scoped faults

use crate::request::RenderFault;

/// Fatal failure opening a document. Ends the whole viewer session;
/// recovery is an explicit retry that re-opens from scratch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error("network error fetching document: {0}")]
    Network(String),

    #[error("document is corrupt: {0}")]
    Corrupt(String),

    #[error("unsupported document format: {0}")]
    Unsupported(String),
}

impl LoadError {
    #[must_use]
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            Self::Network(_) => LoadErrorKind::Network,
            Self::Corrupt(_) => LoadErrorKind::Corrupt,
            Self::Unsupported(_) => LoadErrorKind::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadErrorKind {
    Network,
    Corrupt,
    Unsupported,
}

/// Failure rendering one page. Scoped to that page only; the document
/// stays usable and the page is retried on its next window entry.
#[derive(Debug, Clone, thiserror::Error)]
#[error("page {page}: {fault}")]
pub struct PageRenderError {
    /// Page number (1-based)
    pub page: usize,
    #[source]
    pub fault: RenderFault,
}

/// Any error the engine surfaces through its event stream.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    PageRender(#[from] PageRenderError),
}
