//! Asynchronous document opening
//!
//! One open runs at a time per source; each open gets a fresh epoch, and
//! a completion carrying a superseded epoch is discarded without touching
//! the now-current document. Progress is forced monotone and ends at 1.0.

use std::sync::Arc;

use flume::{Receiver, Sender};
use log::{debug, info, warn};

use crate::backend::DocumentBackend;
use crate::error::LoadError;
use crate::types::{LoadState, PageSize};

/// Document metadata reported once an open succeeds
#[derive(Clone, Debug)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub title: Option<String>,
    /// Native size of the first page, used for layout estimates
    pub first_page: PageSize,
}

/// What the open thread reports back
#[derive(Debug)]
enum OpenMessage {
    Progress(f32),
    Ready(DocumentInfo),
    Failed(LoadError),
}

/// Progress or terminal outcome of the current open, stale ones filtered
#[derive(Debug)]
pub enum SourceEvent {
    Progress(f32),
    Ready(DocumentInfo),
    Failed(LoadError),
}

/// Manages the open/teardown lifecycle of the current document handle.
pub struct DocumentSource {
    backend: Arc<dyn DocumentBackend>,
    epoch: u64,
    rx: Option<Receiver<(u64, OpenMessage)>>,
    load_state: LoadState,
    progress: f32,
}

impl DocumentSource {
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            epoch: 0,
            rx: None,
            load_state: LoadState::Unloaded,
            progress: 0.0,
        }
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn DocumentBackend> {
        &self.backend
    }

    #[must_use]
    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    #[must_use]
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Start opening a new document, superseding any open still pending.
    /// The previous handle (if any) was already released by the caller
    /// tearing down its render session.
    pub fn begin_open(&mut self, locator: &str) {
        self.epoch += 1;
        self.load_state = LoadState::Loading;
        self.progress = 0.0;

        let (tx, rx): (Sender<(u64, OpenMessage)>, _) = flume::unbounded();
        self.rx = Some(rx);

        let backend = Arc::clone(&self.backend);
        let locator = locator.to_string();
        let epoch = self.epoch;
        info!("opening document {locator} (epoch {epoch})");

        std::thread::spawn(move || {
            let progress_tx = tx.clone();
            let mut report = move |p: f32| {
                let _ = progress_tx.send((epoch, OpenMessage::Progress(p)));
            };

            match backend.open(&locator, &mut report) {
                Ok(provider) => {
                    let page_count = provider.page_count();
                    if page_count == 0 {
                        let _ = tx.send((
                            epoch,
                            OpenMessage::Failed(LoadError::Corrupt(
                                "document has no pages".to_string(),
                            )),
                        ));
                        return;
                    }
                    let first_page = match provider.page_size(1) {
                        Ok(size) => size,
                        Err(e) => {
                            let _ = tx
                                .send((epoch, OpenMessage::Failed(LoadError::Corrupt(e.to_string()))));
                            return;
                        }
                    };
                    let info = DocumentInfo {
                        page_count,
                        title: provider.title(),
                        first_page,
                    };
                    let _ = tx.send((epoch, OpenMessage::Ready(info)));
                }
                Err(e) => {
                    let _ = tx.send((epoch, OpenMessage::Failed(e)));
                }
            }
        });
    }

    /// Drain completed open work. Messages from superseded epochs are
    /// dropped; progress regressions are dropped; `Ready` forces 1.0.
    pub fn poll(&mut self) -> Vec<SourceEvent> {
        let Some(rx) = self.rx.clone() else {
            return vec![];
        };

        let mut events = vec![];
        while let Ok((epoch, message)) = rx.try_recv() {
            if epoch != self.epoch {
                debug!("discarding superseded open result (epoch {epoch})");
                continue;
            }
            match message {
                OpenMessage::Progress(p) => {
                    let p = p.clamp(0.0, 1.0);
                    if p > self.progress {
                        self.progress = p;
                        events.push(SourceEvent::Progress(p));
                    }
                }
                OpenMessage::Ready(info) => {
                    self.load_state = LoadState::Ready;
                    if self.progress < 1.0 {
                        self.progress = 1.0;
                        events.push(SourceEvent::Progress(1.0));
                    }
                    info!(
                        "document ready: {} pages{}",
                        info.page_count,
                        info.title.as_deref().map_or(String::new(), |t| format!(" ({t})"))
                    );
                    events.push(SourceEvent::Ready(info));
                }
                OpenMessage::Failed(e) => {
                    warn!("document open failed: {e}");
                    self.load_state = LoadState::Failed;
                    events.push(SourceEvent::Failed(e));
                }
            }
        }
        events
    }
}
