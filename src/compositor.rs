//! Declarative page layout
//!
//! The compositor keeps a `page -> slot` descriptor for every page of the
//! document: a placeholder sized from the best current estimate, or the
//! rendered bitmap. Host rendering layers diff the descriptor list instead
//! of mutating a scene directly. All offsets are in on-screen pixels.

use std::sync::Arc;

use crate::types::{Bitmap, PageState, RenderPhase};

/// What to show for one page right now
#[derive(Clone, Debug)]
pub enum PageSlot {
    /// Nothing rendered yet (or render failed): reserve this much space
    /// so the total scroll height stays stable.
    Placeholder { width: f32, height: f32 },
    /// Rendered bitmap matching the current transform
    Bitmap(Arc<Bitmap>),
}

#[derive(Clone, Copy, Debug)]
struct PageExtent {
    width: f32,
    height: f32,
}

/// Vertical layout of all pages of one document.
pub struct Compositor {
    /// Per-page on-screen extents, index 0 = page 1. Estimates until a
    /// real render reports actual dimensions.
    extents: Vec<PageExtent>,
    /// Vertical gap between consecutive pages
    gap: f32,
}

impl Compositor {
    #[must_use]
    pub fn new(gap: f32) -> Self {
        Self {
            extents: Vec::new(),
            gap,
        }
    }

    /// Reset layout for a (re)opened or re-transformed document: every
    /// page gets the same estimated extent.
    pub fn reset(&mut self, page_count: usize, est_width: f32, est_height: f32) {
        self.extents.clear();
        self.extents.resize(
            page_count,
            PageExtent {
                width: est_width.max(1.0),
                height: est_height.max(1.0),
            },
        );
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.extents.len()
    }

    /// Top edge of a page (1-based). Clamped to the last page.
    #[must_use]
    pub fn page_top(&self, page: usize) -> f32 {
        let page = page.clamp(1, self.extents.len().max(1));
        self.extents
            .iter()
            .take(page - 1)
            .map(|e| e.height + self.gap)
            .sum()
    }

    /// Height of the whole document including inter-page gaps.
    #[must_use]
    pub fn total_height(&self) -> f32 {
        let heights: f32 = self.extents.iter().map(|e| e.height).sum();
        let gaps = self.gap * self.extents.len().saturating_sub(1) as f32;
        heights + gaps
    }

    /// Page (1-based) containing the given vertical offset. Offsets in a
    /// gap map to the page above; out-of-range offsets clamp.
    #[must_use]
    pub fn page_at_offset(&self, offset: f32) -> usize {
        if self.extents.is_empty() {
            return 1;
        }
        let mut top = 0.0f32;
        for (idx, extent) in self.extents.iter().enumerate() {
            let next_top = top + extent.height + self.gap;
            if offset < next_top {
                return idx + 1;
            }
            top = next_top;
        }
        self.extents.len()
    }

    /// Record the actual extent of a rendered page. Returns the height
    /// delta so the caller can keep the scroll position anchored when a
    /// page above the viewport grows or shrinks.
    pub fn set_page_extent(&mut self, page: usize, width: f32, height: f32) -> f32 {
        let Some(extent) = self.extents.get_mut(page.wrapping_sub(1)) else {
            return 0.0;
        };
        let delta = height - extent.height;
        extent.width = width.max(1.0);
        extent.height = height.max(1.0);
        delta
    }

    /// Extent currently reserved for a page.
    #[must_use]
    pub fn page_extent(&self, page: usize) -> (f32, f32) {
        self.extents
            .get(page.wrapping_sub(1))
            .map_or((1.0, 1.0), |e| (e.width, e.height))
    }

    /// Descriptor for one page given its render state (if any).
    #[must_use]
    pub fn slot(&self, page: usize, state: Option<&PageState>) -> PageSlot {
        if let Some(state) = state {
            if state.phase == RenderPhase::Rendered {
                if let Some(bitmap) = &state.bitmap {
                    return PageSlot::Bitmap(Arc::clone(bitmap));
                }
            }
        }
        let (width, height) = self.page_extent(page);
        PageSlot::Placeholder { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compositor(pages: usize, height: f32) -> Compositor {
        let mut c = Compositor::new(0.0);
        c.reset(pages, 600.0, height);
        c
    }

    #[test]
    fn placeholder_layout_keeps_total_height_stable() {
        let c = compositor(50, 800.0);
        assert_eq!(c.total_height(), 50.0 * 800.0);
        assert_eq!(c.page_top(25), 24.0 * 800.0);
    }

    #[test]
    fn gap_counts_between_pages_only() {
        let mut c = Compositor::new(10.0);
        c.reset(3, 600.0, 800.0);
        assert_eq!(c.total_height(), 3.0 * 800.0 + 2.0 * 10.0);
        assert_eq!(c.page_top(2), 810.0);
    }

    #[test]
    fn page_at_offset_walks_heights() {
        let c = compositor(50, 800.0);
        assert_eq!(c.page_at_offset(0.0), 1);
        assert_eq!(c.page_at_offset(799.0), 1);
        assert_eq!(c.page_at_offset(800.0), 2);
        assert_eq!(c.page_at_offset(24.0 * 800.0), 25);
        assert_eq!(c.page_at_offset(1.0e9), 50);
    }

    #[test]
    fn offsets_in_gaps_map_to_page_above() {
        let mut c = Compositor::new(10.0);
        c.reset(3, 600.0, 800.0);
        assert_eq!(c.page_at_offset(805.0), 1);
        assert_eq!(c.page_at_offset(810.0), 2);
    }

    #[test]
    fn set_page_extent_reports_height_delta() {
        let mut c = compositor(3, 800.0);
        let delta = c.set_page_extent(1, 620.0, 850.0);
        assert_eq!(delta, 50.0);
        // Pages below shift; their tops reflect the measured height.
        assert_eq!(c.page_top(2), 850.0);
    }

    #[test]
    fn same_size_bitmap_does_not_move_layout() {
        let mut c = compositor(3, 800.0);
        let delta = c.set_page_extent(2, 600.0, 800.0);
        assert_eq!(delta, 0.0);
        assert_eq!(c.page_top(3), 1600.0);
    }

    #[test]
    fn slot_prefers_rendered_bitmap() {
        let c = compositor(3, 800.0);
        let mut state = PageState::placeholder(1);
        assert!(matches!(
            c.slot(1, Some(&state)),
            PageSlot::Placeholder { .. }
        ));

        state.phase = RenderPhase::Rendered;
        state.bitmap = Some(Arc::new(Bitmap {
            pixels: vec![0; 3],
            width: 1,
            height: 1,
        }));
        assert!(matches!(c.slot(1, Some(&state)), PageSlot::Bitmap(_)));
    }

    #[test]
    fn pending_page_still_shows_placeholder() {
        let c = compositor(3, 800.0);
        let mut state = PageState::placeholder(2);
        state.phase = RenderPhase::Pending;
        let PageSlot::Placeholder { width, height } = c.slot(2, Some(&state)) else {
            panic!("expected placeholder");
        };
        assert_eq!((width, height), (600.0, 800.0));
    }
}
