//! Engine facade
//!
//! `DocumentViewer` wires the source, worker pool, cache, windower and
//! compositor together behind a small command/event surface. All engine
//! state is mutated on the caller's thread; workers only ever talk back
//! through channels, and every completion is checked against the request
//! id and generation before it is allowed to land.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use flume::{Receiver, Sender};
use log::{debug, error, warn};

use crate::backend::DocumentBackend;
use crate::cache::RenderCache;
use crate::compositor::{Compositor, PageSlot};
use crate::config::ViewerConfig;
use crate::error::{PageRenderError, ViewerError};
use crate::raster::spawn_workers;
use crate::request::{ExportKind, RenderParams, RenderRequest, RenderResponse, RequestId};
use crate::source::{DocumentSource, SourceEvent};
use crate::state::{Command, Effect, ViewerState};
use crate::transform::{GlobalTransform, Rotation};
use crate::types::{Bitmap, Extent, Generation, LoadState, PageSize, PageState, RenderPhase};
use crate::window::{compute_window, Debounce, Throttle, ViewportWindow};

/// Notifications for the surrounding navigation UI
#[derive(Clone, Debug)]
pub enum ViewerEvent {
    /// The document opened; page count is known
    TotalPages(usize),
    /// Open progress in [0, 1], monotone, ends at 1.0
    LoadProgress(f32),
    /// The window/scroll settled on this page (1-based)
    PageVisible(usize),
    /// A page bitmap matching the current transform arrived
    PageRendered(usize),
    /// A fixed-resolution export finished for one page
    ExportReady {
        kind: ExportKind,
        page: usize,
        bitmap: Arc<Bitmap>,
    },
    Error(ViewerError),
}

/// Channels plus worker pool for one open document. Dropping the session
/// shuts the workers down and orphans anything still in flight.
struct RenderSession {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    workers: usize,
}

impl RenderSession {
    fn spawn(backend: &Arc<dyn DocumentBackend>, locator: &str, workers: usize) -> Self {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();
        spawn_workers(backend, locator, workers, &request_rx, &response_tx);
        Self {
            request_tx,
            response_rx,
            workers: workers.max(1),
        }
    }

    fn shutdown(&self) {
        for _ in 0..self.workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Virtualized page-rendering engine for one document at a time.
pub struct DocumentViewer {
    config: ViewerConfig,
    source: DocumentSource,
    state: ViewerState,
    cache: RenderCache,
    compositor: Compositor,
    /// Lazily created per-page states for the current window
    pages: HashMap<usize, PageState>,
    window: ViewportWindow,
    session: Option<RenderSession>,
    locator: Option<String>,
    title: Option<String>,
    scroll_throttle: Throttle<f32>,
    resize_debounce: Debounce<Extent>,
    /// page -> latest outstanding request for it (at most one in flight)
    pending: HashMap<usize, (RequestId, Generation)>,
    /// Pages whose last render failed; retried on next window entry
    failed: HashSet<usize>,
    next_request_id: u64,
    announced_page: Option<usize>,
    settle_pending: bool,
}

impl DocumentViewer {
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentBackend>, config: ViewerConfig) -> Self {
        let state = ViewerState::new(config.zoom_bounds());
        let cache = RenderCache::new(config.cache_capacity);
        let compositor = Compositor::new(config.page_gap);
        let scroll_throttle = Throttle::new(Duration::from_millis(config.scroll_throttle_ms));
        let resize_debounce = Debounce::new(Duration::from_millis(config.resize_debounce_ms));

        Self {
            config,
            source: DocumentSource::new(backend),
            state,
            cache,
            compositor,
            pages: HashMap::new(),
            window: ViewportWindow { first: 1, last: 0 },
            session: None,
            locator: None,
            title: None,
            scroll_throttle,
            resize_debounce,
            pending: HashMap::new(),
            failed: HashSet::new(),
            next_request_id: 1,
            announced_page: None,
            settle_pending: false,
        }
    }

    /// Open the document behind a locator, tearing down whatever was open
    /// before. Safe to call at any time, including mid-load.
    pub fn open(&mut self, locator: &str) {
        // Teardown first: the old worker pool is shut down and its
        // channels dropped, so nothing from the old document can surface.
        self.session = None;
        self.cache.invalidate_all();
        self.pages.clear();
        self.pending.clear();
        self.failed.clear();
        self.window = ViewportWindow { first: 1, last: 0 };
        self.compositor.reset(0, 1.0, 1.0);
        self.announced_page = None;
        self.settle_pending = false;
        self.title = None;

        let initial = self.config.initial;
        let rotation = Rotation::from_degrees(initial.rotation_degrees).unwrap_or_default();
        self.state.reset_for_open(initial.zoom_percent / 100.0, rotation);

        self.locator = Some(locator.to_string());
        self.source.begin_open(locator);
    }

    /// Re-open the current document from scratch after a fatal load error.
    pub fn retry(&mut self) {
        if let Some(locator) = self.locator.clone() {
            self.open(&locator);
        }
    }

    // Transform / navigation operations.

    pub fn zoom_in(&mut self) {
        self.apply(Command::ZoomIn);
    }

    pub fn zoom_out(&mut self) {
        self.apply(Command::ZoomOut);
    }

    pub fn set_zoom_percent(&mut self, percent: f32) {
        self.apply(Command::SetZoomPercent(percent));
    }

    pub fn rotate_left(&mut self) {
        self.apply(Command::RotateLeft);
    }

    pub fn rotate_right(&mut self) {
        self.apply(Command::RotateRight);
    }

    pub fn fit_to_width(&mut self) {
        self.apply(Command::FitToWidth);
    }

    pub fn fit_to_height(&mut self) {
        self.apply(Command::FitToHeight);
    }

    pub fn toggle_fit_mode(&mut self) {
        self.apply(Command::ToggleFitMode);
    }

    /// Jump to a page (1-based, clamped). Navigation drives scroll, never
    /// the reverse: the offset is set to the page top and the window
    /// recomputed from it.
    pub fn goto_page(&mut self, page: usize) {
        self.apply(Command::GotoPage(page));
    }

    /// Scroll position report from the host surface. Throttled; the
    /// window is always recomputed from the latest offset.
    pub fn handle_scroll(&mut self, offset: f32, now: Instant) {
        self.settle_pending = true;
        if let Some(offset) = self.scroll_throttle.submit(offset, now) {
            self.apply(Command::SetScroll(offset));
        }
    }

    /// Container resize from the host surface. Debounced.
    pub fn handle_resize(&mut self, viewport: Extent, now: Instant) {
        self.settle_pending = true;
        self.resize_debounce.submit(viewport, now);
    }

    /// Queue a document-native-resolution render of every page for
    /// download. Results bypass the on-screen cache.
    pub fn request_download(&mut self) {
        self.request_export(ExportKind::Download);
    }

    /// Queue a document-native-resolution render of every page for print.
    pub fn request_print(&mut self) {
        self.request_export(ExportKind::Print);
    }

    fn request_export(&mut self, kind: ExportKind) {
        if self.state.page_count == 0 {
            warn!("export requested before document is ready");
            return;
        }
        let rotation = self.state.transform.rotation;
        for page in 1..=self.state.page_count {
            let id = self.next_id();
            self.send_request(RenderRequest::Export {
                id,
                page,
                kind,
                rotation,
            });
        }
    }

    /// Advance the engine: flush throttle/debounce trailing edges, drain
    /// open and render completions, and emit events. Call this from the
    /// host event loop.
    pub fn tick(&mut self, now: Instant) -> Vec<ViewerEvent> {
        let mut events = vec![];

        if let Some(offset) = self.scroll_throttle.flush(now) {
            self.apply(Command::SetScroll(offset));
        }
        if let Some(viewport) = self.resize_debounce.flush(now) {
            self.apply(Command::SetViewport(viewport));
        }

        for event in self.source.poll() {
            match event {
                SourceEvent::Progress(p) => events.push(ViewerEvent::LoadProgress(p)),
                SourceEvent::Ready(info) => self.on_document_ready(info, &mut events),
                SourceEvent::Failed(e) => events.push(ViewerEvent::Error(ViewerError::Load(e))),
            }
        }

        let responses: Vec<RenderResponse> = match &self.session {
            Some(session) => session.response_rx.try_iter().collect(),
            None => vec![],
        };
        for response in responses {
            self.handle_response(response, &mut events);
        }

        if self.settle_pending
            && self.scroll_throttle.is_idle()
            && self.resize_debounce.is_idle()
            && self.source.load_state() == LoadState::Ready
        {
            self.settle_pending = false;
            let current = self.compositor.page_at_offset(self.state.scroll_offset);
            self.state.current_page = current;
            if self.announced_page != Some(current) {
                self.announced_page = Some(current);
                events.push(ViewerEvent::PageVisible(current));
            }
        }

        events
    }

    // Read-side accessors.

    /// Render descriptor for every page 1..=page_count: bitmap when the
    /// current transform's render is available, sized placeholder
    /// otherwise. The host layer diffs this list.
    #[must_use]
    pub fn layout(&self) -> Vec<PageSlot> {
        (1..=self.state.page_count)
            .map(|page| self.compositor.slot(page, self.pages.get(&page)))
            .collect()
    }

    #[must_use]
    pub fn page_state(&self, page: usize) -> Option<&PageState> {
        self.pages.get(&page)
    }

    #[must_use]
    pub fn is_page_cached(&self, page: usize) -> bool {
        self.cache
            .contains(page, &self.state.transform, self.state.generation)
    }

    #[must_use]
    pub fn window(&self) -> ViewportWindow {
        self.window
    }

    #[must_use]
    pub fn transform(&self) -> GlobalTransform {
        self.state.transform
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.state.generation
    }

    #[must_use]
    pub fn scroll_offset(&self) -> f32 {
        self.state.scroll_offset
    }

    #[must_use]
    pub fn total_height(&self) -> f32 {
        self.compositor.total_height()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.state.page_count
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.state.current_page
    }

    #[must_use]
    pub fn load_state(&self) -> LoadState {
        self.source.load_state()
    }

    /// Title metadata of the open document, when the format carries one.
    #[must_use]
    pub fn document_title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn load_progress(&self) -> f32 {
        self.source.progress()
    }

    // Internals.

    fn apply(&mut self, cmd: Command) {
        let effects = self.state.apply(cmd);
        self.execute(&effects);
    }

    fn execute(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::InvalidateAll => {
                    debug!(
                        "invalidating cache (generation {:?})",
                        self.state.generation
                    );
                    self.cache.invalidate_all();
                    self.pages.clear();
                    self.failed.clear();
                    self.relayout_estimates();
                }

                Effect::RecomputeWindow => self.recompute_window(),

                Effect::RenderWindow => self.render_window(),

                Effect::ScrollToPage(page) => {
                    self.state.scroll_offset = self.compositor.page_top(*page);
                    self.scroll_throttle.cancel();
                    self.settle_pending = true;
                }
            }
        }
    }

    /// Re-seed the compositor with estimated extents for the current
    /// transform. Measured extents are discarded along with the bitmaps
    /// they came from.
    fn relayout_estimates(&mut self) {
        let native = self.state.native_size.unwrap_or_else(|| {
            PageSize::new(
                self.config.estimated_page_width,
                self.config.estimated_page_height,
            )
        });
        let estimate = self.state.transform.apply_to(native);
        self.compositor
            .reset(self.state.page_count, estimate.width, estimate.height);
    }

    fn recompute_window(&mut self) {
        let window = compute_window(
            &self.compositor,
            self.state.scroll_offset,
            self.state.viewport.height,
            self.config.buffer_pages,
        );
        if window != self.window {
            debug!("window -> [{}, {}]", window.first, window.last);
        }
        // Failed pages leaving the window re-arm their retry; page states
        // outside the window are dropped (their bitmaps stay cached).
        self.failed.retain(|page| window.contains(*page));
        self.pages.retain(|page, _| window.contains(*page));
        self.window = window;
    }

    fn render_window(&mut self) {
        if self.session.is_none() || self.state.page_count == 0 {
            return;
        }
        let transform = self.state.transform;
        let generation = self.state.generation;

        for page in self.window.pages() {
            if let Some(bitmap) = self.cache.get(page, &transform, generation) {
                let entry = self
                    .pages
                    .entry(page)
                    .or_insert_with(|| PageState::placeholder(page));
                entry.phase = RenderPhase::Rendered;
                entry.rendered_scale = Some(transform.scale);
                entry.rendered_rotation = Some(transform.rotation);
                entry.bitmap = Some(bitmap);
                continue;
            }

            // One outstanding request per page: skip when a request for
            // the current generation is already in flight; a stale-
            // generation request gets superseded instead.
            if matches!(self.pending.get(&page), Some((_, g)) if *g == generation) {
                continue;
            }
            if self.failed.contains(&page) {
                continue;
            }

            let id = self.next_id();
            self.send_request(RenderRequest::Page {
                id,
                page,
                params: RenderParams {
                    scale: transform.scale,
                    rotation: transform.rotation,
                    generation,
                },
            });
            self.pending.insert(page, (id, generation));
            let entry = self
                .pages
                .entry(page)
                .or_insert_with(|| PageState::placeholder(page));
            entry.phase = RenderPhase::Pending;
        }
    }

    fn on_document_ready(&mut self, info: crate::source::DocumentInfo, events: &mut Vec<ViewerEvent>) {
        let _ = self.state.apply(Command::SetPageCount(info.page_count));
        self.state.native_size = Some(info.first_page);
        self.title = info.title;
        self.relayout_estimates();

        let locator = self
            .locator
            .clone()
            .unwrap_or_default();
        self.session = Some(RenderSession::spawn(
            self.source.backend(),
            &locator,
            self.config.workers,
        ));

        events.push(ViewerEvent::TotalPages(info.page_count));

        let start = self.config.initial.page;
        if start > 1 {
            self.apply(Command::GotoPage(start));
        } else {
            self.execute(&[Effect::RecomputeWindow, Effect::RenderWindow]);
            self.settle_pending = true;
        }
    }

    fn handle_response(&mut self, response: RenderResponse, events: &mut Vec<ViewerEvent>) {
        match response {
            RenderResponse::Page {
                id,
                page,
                generation,
                bitmap,
            } => {
                match self.pending.get(&page) {
                    Some((latest, _)) if *latest == id => {
                        self.pending.remove(&page);
                    }
                    _ => {
                        debug!("dropping superseded render of page {page}");
                        return;
                    }
                }
                if generation != self.state.generation {
                    debug!("dropping stale render of page {page} ({generation:?})");
                    return;
                }

                // Keep the scroll anchored: a page above the viewport
                // growing past its estimate must not push content around.
                let anchor = self.compositor.page_at_offset(self.state.scroll_offset);
                let delta = self.compositor.set_page_extent(
                    page,
                    bitmap.width as f32,
                    bitmap.height as f32,
                );
                if page < anchor && delta != 0.0 {
                    self.state.scroll_offset = (self.state.scroll_offset + delta).max(0.0);
                }

                self.cache.put(
                    page,
                    Arc::clone(&bitmap),
                    self.state.transform.scale,
                    self.state.transform.rotation,
                    generation,
                );

                if self.window.contains(page) {
                    let entry = self
                        .pages
                        .entry(page)
                        .or_insert_with(|| PageState::placeholder(page));
                    entry.phase = RenderPhase::Rendered;
                    entry.rendered_scale = Some(self.state.transform.scale);
                    entry.rendered_rotation = Some(self.state.transform.rotation);
                    entry.bitmap = Some(bitmap);
                }
                events.push(ViewerEvent::PageRendered(page));
            }

            RenderResponse::Export {
                id: _,
                page,
                kind,
                bitmap,
            } => {
                events.push(ViewerEvent::ExportReady { kind, page, bitmap });
            }

            RenderResponse::Error {
                id,
                page,
                generation,
                fault,
            } => {
                if let Some(generation) = generation {
                    if matches!(self.pending.get(&page), Some((latest, _)) if *latest == id) {
                        self.pending.remove(&page);
                    }
                    if generation != self.state.generation {
                        debug!("dropping stale render failure of page {page}");
                        return;
                    }
                    self.failed.insert(page);
                    if let Some(entry) = self.pages.get_mut(&page) {
                        entry.phase = RenderPhase::Failed;
                    }
                }
                events.push(ViewerEvent::Error(ViewerError::PageRender(
                    PageRenderError { page, fault },
                )));
            }

            RenderResponse::WorkerLost { detail } => {
                error!("render worker lost: {detail}");
            }
        }
    }

    fn send_request(&mut self, request: RenderRequest) {
        if let Some(session) = &self.session {
            let _ = session.request_tx.send(request);
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}
