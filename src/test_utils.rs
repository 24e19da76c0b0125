//! Deterministic fakes and pumping helpers for engine tests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::backend::{DocumentBackend, PageProvider};
use crate::error::LoadError;
use crate::request::RenderFault;
use crate::transform::Rotation;
use crate::types::{Bitmap, PageSize};
use crate::viewer::{DocumentViewer, ViewerEvent};

/// Blocks fake renders until permits are released, letting tests hold
/// results in flight across a transform or document change.
pub struct RenderGate {
    permits: Mutex<u64>,
    cond: Condvar,
}

impl RenderGate {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            permits: Mutex::new(0),
            cond: Condvar::new(),
        })
    }

    /// Allow `n` renders to proceed.
    pub fn release(&self, n: u64) {
        let mut permits = self
            .permits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *permits += n;
        self.cond.notify_all();
    }

    /// Stop gating entirely.
    pub fn open_wide(&self) {
        self.release(u64::MAX / 2);
    }

    fn acquire(&self) {
        let mut permits = self
            .permits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        while *permits == 0 {
            permits = self
                .cond
                .wait(permits)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
        *permits -= 1;
    }
}

#[derive(Clone, Copy, Debug)]
struct DocSpec {
    pages: usize,
    page_size: PageSize,
    tag: u8,
}

struct Shared {
    docs: Mutex<HashMap<String, DocSpec>>,
    failing_opens: Mutex<HashMap<String, LoadError>>,
    failing_pages: Mutex<HashSet<usize>>,
    renders: Mutex<HashMap<usize, usize>>,
    gate: Mutex<Option<Arc<RenderGate>>>,
}

/// In-memory document backend with per-locator documents, failure
/// injection and render accounting. Rendered bitmaps carry the document
/// tag and page number in their first pixel for provenance checks.
pub struct FakeBackend {
    shared: Arc<Shared>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            shared: Arc::new(Shared {
                docs: Mutex::new(HashMap::new()),
                failing_opens: Mutex::new(HashMap::new()),
                failing_pages: Mutex::new(HashSet::new()),
                renders: Mutex::new(HashMap::new()),
                gate: Mutex::new(None),
            }),
        })
    }

    /// Register a document reachable at `locator`.
    pub fn add_document(&self, locator: &str, pages: usize, page_size: PageSize, tag: u8) {
        self.shared
            .docs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(
                locator.to_string(),
                DocSpec {
                    pages,
                    page_size,
                    tag,
                },
            );
    }

    /// Make `open(locator)` fail with the given error.
    pub fn fail_open(&self, locator: &str, error: LoadError) {
        self.shared
            .failing_opens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(locator.to_string(), error);
    }

    /// Make renders of one page fail until cleared.
    pub fn fail_page(&self, page: usize) {
        self.shared
            .failing_pages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(page);
    }

    pub fn clear_open_failures(&self) {
        self.shared
            .failing_opens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    pub fn clear_page_failures(&self) {
        self.shared
            .failing_pages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
    }

    /// Gate all subsequent renders behind explicit permits.
    pub fn gate_renders(&self) -> Arc<RenderGate> {
        let gate = RenderGate::new();
        *self
            .shared
            .gate
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Arc::clone(&gate));
        gate
    }

    /// How many times any provider rendered this page (display + export).
    #[must_use]
    pub fn renders_of(&self, page: usize) -> usize {
        self.shared
            .renders
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&page)
            .copied()
            .unwrap_or(0)
    }
}

impl DocumentBackend for FakeBackend {
    fn open(
        &self,
        locator: &str,
        progress: &mut dyn FnMut(f32),
    ) -> Result<Box<dyn PageProvider>, LoadError> {
        progress(0.3);
        let failure = self
            .shared
            .failing_opens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(locator)
            .cloned();
        if let Some(error) = failure {
            return Err(error);
        }

        let spec = self
            .shared
            .docs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(locator)
            .copied()
            .ok_or_else(|| LoadError::Network(format!("unreachable locator: {locator}")))?;

        progress(0.8);
        Ok(Box::new(FakeProvider {
            spec,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct FakeProvider {
    spec: DocSpec,
    shared: Arc<Shared>,
}

impl PageProvider for FakeProvider {
    fn page_count(&self) -> usize {
        self.spec.pages
    }

    fn title(&self) -> Option<String> {
        Some(format!("fake document #{}", self.spec.tag))
    }

    fn page_size(&self, _page: usize) -> Result<PageSize, RenderFault> {
        Ok(self.spec.page_size)
    }

    fn render(
        &self,
        page: usize,
        pixel_width: u32,
        pixel_height: u32,
        _rotation: Rotation,
    ) -> Result<Bitmap, RenderFault> {
        let gate = self
            .shared
            .gate
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        if let Some(gate) = gate {
            gate.acquire();
        }

        *self
            .shared
            .renders
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(page)
            .or_insert(0) += 1;

        let failing = self
            .shared
            .failing_pages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(&page);
        if failing {
            return Err(RenderFault::generic(format!(
                "injected failure on page {page}"
            )));
        }

        let mut pixels = vec![0u8; (pixel_width * pixel_height * 3) as usize];
        pixels[0] = self.spec.tag;
        pixels[1] = page as u8;
        Ok(Bitmap {
            pixels,
            width: pixel_width,
            height: pixel_height,
        })
    }
}

/// Document tag stamped into a fake bitmap.
#[must_use]
pub fn bitmap_tag(bitmap: &Bitmap) -> u8 {
    bitmap.pixels[0]
}

/// Page number stamped into a fake bitmap.
#[must_use]
pub fn bitmap_page(bitmap: &Bitmap) -> u8 {
    bitmap.pixels[1]
}

/// Tick the viewer until an event matching `pred` shows up, returning
/// everything seen so far (the match included). Panics on timeout.
pub fn pump_until(
    viewer: &mut DocumentViewer,
    timeout: Duration,
    mut pred: impl FnMut(&ViewerEvent) -> bool,
) -> Vec<ViewerEvent> {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    loop {
        let now = Instant::now();
        let events = viewer.tick(now);
        let hit = events.iter().any(&mut pred);
        seen.extend(events);
        if hit {
            return seen;
        }
        assert!(now < deadline, "timed out waiting for event; saw {seen:?}");
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Tick the viewer for a fixed duration, collecting every event.
pub fn pump_for(viewer: &mut DocumentViewer, duration: Duration) -> Vec<ViewerEvent> {
    let deadline = Instant::now() + duration;
    let mut seen = Vec::new();
    loop {
        let now = Instant::now();
        seen.extend(viewer.tick(now));
        if now >= deadline {
            return seen;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
}
