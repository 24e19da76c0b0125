//! Viewport windowing
//!
//! Maps the scroll offset and container geometry to the contiguous page
//! range that must stay rendered, padded by a buffer to hide rasterization
//! latency during ordinary scrolling. Scroll recomputation is throttled
//! and resize recomputation debounced; both always act on the latest
//! value, never a queued stale one.

use std::time::{Duration, Instant};

use crate::compositor::Compositor;

/// Contiguous 1-based page range treated as active for rendering
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportWindow {
    pub first: usize,
    pub last: usize,
}

impl ViewportWindow {
    #[must_use]
    pub const fn contains(&self, page: usize) -> bool {
        page >= self.first && page <= self.last
    }

    pub fn pages(&self) -> impl Iterator<Item = usize> + use<> {
        self.first..=self.last
    }
}

/// Compute the window for the current scroll position, clipped to
/// `[1, page_count]`. A page is visible when any part of it overlaps
/// `[scroll_offset, scroll_offset + container_height)`.
#[must_use]
pub fn compute_window(
    layout: &Compositor,
    scroll_offset: f32,
    container_height: f32,
    buffer: usize,
) -> ViewportWindow {
    let page_count = layout.page_count();
    if page_count == 0 {
        return ViewportWindow { first: 1, last: 0 };
    }

    let scroll_offset = scroll_offset.max(0.0);
    let scroll_end = scroll_offset + container_height.max(0.0);

    let mut first = layout.page_at_offset(scroll_offset);
    let mut last = first;
    // Extend downward while pages still start above the viewport bottom.
    while last < page_count && layout.page_top(last + 1) < scroll_end {
        last += 1;
    }
    // The offset page itself may sit entirely below the viewport when the
    // offset landed in a gap; page_at_offset already resolved that upward.
    first = first.saturating_sub(buffer).max(1);
    last = (last + buffer).min(page_count);

    ViewportWindow { first, last }
}

/// Rate limiter that fires immediately when idle and otherwise keeps only
/// the latest submitted value for the trailing edge.
#[derive(Debug)]
pub struct Throttle<T> {
    interval: Duration,
    last_fire: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fire: None,
            pending: None,
        }
    }

    /// Submit a value. Returns it right away when the interval has
    /// elapsed (leading edge); otherwise stores it, replacing any value
    /// waiting for the trailing edge.
    pub fn submit(&mut self, value: T, now: Instant) -> Option<T> {
        let ready = self
            .last_fire
            .is_none_or(|last| now.duration_since(last) >= self.interval);
        if ready {
            self.last_fire = Some(now);
            self.pending = None;
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// Release the pending value once the interval has elapsed.
    pub fn flush(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_none() {
            return None;
        }
        let ready = self
            .last_fire
            .is_none_or(|last| now.duration_since(last) >= self.interval);
        if ready {
            self.last_fire = Some(now);
            self.pending.take()
        } else {
            None
        }
    }

    /// True when nothing is waiting for the trailing edge.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }

    /// Drop any pending value without firing it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Delays action until submissions have gone quiet for a full interval.
#[derive(Debug)]
pub struct Debounce<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounce<T> {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Submit a value, restarting the quiet period.
    pub fn submit(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Release the latest value once the quiet period has elapsed.
    pub fn flush(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, submitted)) if now.duration_since(*submitted) >= self.quiet => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_none()
    }
}
