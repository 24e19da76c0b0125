//! Viewer state machine
//!
//! All transform and navigation operations reduce to a `Command` applied
//! to `ViewerState`, returning the `Effect`s the engine must execute in
//! order. Any scale or rotation change bumps the generation and yields
//! `InvalidateAll` before anything re-renders, so a stale in-flight task
//! can never land.

use crate::transform::{fit_scale, FitMode, GlobalTransform, ZoomBounds};
use crate::types::{Extent, Generation, PageSize};

/// Mutable view state for one open document
#[derive(Clone, Debug)]
pub struct ViewerState {
    /// Shared transform, written only through `apply`
    pub transform: GlobalTransform,
    pub fit_mode: FitMode,
    /// Bumped on every transform mutation and document replacement
    pub generation: Generation,
    /// Vertical scroll offset in on-screen pixels, owned by the host
    /// surface; navigation writes it, scrolling reports it
    pub scroll_offset: f32,
    /// Host container dimensions in pixels
    pub viewport: Extent,
    /// Total page count; 0 until the document is ready
    pub page_count: usize,
    /// Page currently at the top of the viewport (1-based)
    pub current_page: usize,
    /// Native size of a representative page, once known
    pub native_size: Option<PageSize>,
    pub zoom: ZoomBounds,
}

impl ViewerState {
    #[must_use]
    pub fn new(zoom: ZoomBounds) -> Self {
        Self {
            transform: GlobalTransform::default(),
            fit_mode: FitMode::Custom,
            generation: Generation::default(),
            scroll_offset: 0.0,
            viewport: Extent::default(),
            page_count: 0,
            current_page: 1,
            native_size: None,
            zoom,
        }
    }

    /// Apply a command and return the effects to execute, in order.
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::ZoomIn => self.set_scale(self.transform.scale * self.zoom.step, FitMode::Custom),
            Command::ZoomOut => {
                self.set_scale(self.transform.scale / self.zoom.step, FitMode::Custom)
            }
            Command::SetZoomPercent(percent) => {
                self.set_scale(percent / 100.0, FitMode::Custom)
            }

            Command::RotateRight => self.set_rotation(self.transform.rotation.clockwise()),
            Command::RotateLeft => self.set_rotation(self.transform.rotation.counter_clockwise()),

            Command::FitToWidth => self.enter_fit(FitMode::Width),
            Command::FitToHeight => self.enter_fit(FitMode::Height),
            Command::ToggleFitMode => {
                let next = self.fit_mode.toggled();
                if next == FitMode::Custom {
                    self.fit_mode = FitMode::Custom;
                    vec![]
                } else {
                    self.enter_fit(next)
                }
            }

            Command::GotoPage(page) => {
                if self.page_count == 0 {
                    return vec![];
                }
                let target = page.clamp(1, self.page_count);
                self.current_page = target;
                vec![
                    Effect::ScrollToPage(target),
                    Effect::RecomputeWindow,
                    Effect::RenderWindow,
                ]
            }

            Command::SetScroll(offset) => {
                self.scroll_offset = offset.max(0.0);
                vec![Effect::RecomputeWindow, Effect::RenderWindow]
            }

            Command::SetViewport(viewport) => {
                if self.viewport == viewport {
                    return vec![];
                }
                self.viewport = viewport;
                // An active fit mode re-derives its scale from the new
                // container; that is a transform mutation like any other.
                if self.fit_mode != FitMode::Custom {
                    if let Some(native) = self.native_size {
                        let scale = fit_scale(
                            self.fit_mode,
                            native,
                            self.transform.rotation,
                            self.viewport,
                            &self.zoom,
                        );
                        let effects = self.commit_scale(scale);
                        if !effects.is_empty() {
                            return effects;
                        }
                        // Derived scale unchanged; the window still moved.
                    }
                }
                vec![Effect::RecomputeWindow, Effect::RenderWindow]
            }

            Command::SetPageCount(count) => {
                self.page_count = count;
                if count > 0 && self.current_page > count {
                    self.current_page = count;
                }
                vec![]
            }
        }
    }

    fn set_scale(&mut self, raw: f32, mode: FitMode) -> Vec<Effect> {
        self.fit_mode = mode;
        self.commit_scale(self.zoom.clamp(raw))
    }

    fn commit_scale(&mut self, clamped: f32) -> Vec<Effect> {
        if (self.transform.scale - clamped).abs() <= f32::EPSILON {
            return vec![];
        }
        self.transform.scale = clamped;
        self.generation.bump();
        vec![
            Effect::InvalidateAll,
            Effect::RecomputeWindow,
            Effect::RenderWindow,
        ]
    }

    fn set_rotation(&mut self, rotation: crate::transform::Rotation) -> Vec<Effect> {
        self.transform.rotation = rotation;
        self.generation.bump();
        let mut effects = vec![Effect::InvalidateAll];
        // Rotating a non-square page under a fit mode changes the fitting
        // axis length, so the derived scale moves too.
        if self.fit_mode != FitMode::Custom {
            if let Some(native) = self.native_size {
                self.transform.scale = fit_scale(
                    self.fit_mode,
                    native,
                    rotation,
                    self.viewport,
                    &self.zoom,
                );
            }
        }
        effects.push(Effect::RecomputeWindow);
        effects.push(Effect::RenderWindow);
        effects
    }

    fn enter_fit(&mut self, mode: FitMode) -> Vec<Effect> {
        self.fit_mode = mode;
        let Some(native) = self.native_size else {
            return vec![];
        };
        let scale = fit_scale(mode, native, self.transform.rotation, self.viewport, &self.zoom);
        self.commit_scale(scale)
    }

    /// Reset for a freshly opened document. The generation is bumped so
    /// anything still in flight for the previous document is stale.
    pub fn reset_for_open(&mut self, scale: f32, rotation: crate::transform::Rotation) {
        self.transform = GlobalTransform {
            scale: self.zoom.clamp(scale),
            rotation,
        };
        self.fit_mode = FitMode::Custom;
        self.generation.bump();
        self.scroll_offset = 0.0;
        self.page_count = 0;
        self.current_page = 1;
        self.native_size = None;
    }
}

/// Operations on the view
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    ZoomIn,
    ZoomOut,
    SetZoomPercent(f32),
    RotateLeft,
    RotateRight,
    FitToWidth,
    FitToHeight,
    ToggleFitMode,
    /// Jump to a page (1-based, clamped). Moves scroll only; never
    /// touches scale or rotation.
    GotoPage(usize),
    /// Throttled scroll position update from the host surface
    SetScroll(f32),
    /// Debounced container resize
    SetViewport(Extent),
    SetPageCount(usize),
}

/// Effects produced by state changes, executed by the engine in order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Clear the render cache and all page states; the generation was
    /// already bumped, so in-flight results will be dropped on arrival
    InvalidateAll,
    /// Recompute the visible window at the current scroll offset
    RecomputeWindow,
    /// Issue render tasks for every uncovered page in the window
    RenderWindow,
    /// Align the target page's top with the viewport top
    ScrollToPage(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Rotation;

    fn ready_state() -> ViewerState {
        let mut state = ViewerState::new(ZoomBounds::default());
        state.page_count = 100;
        state.native_size = Some(PageSize::new(600.0, 800.0));
        state.viewport = Extent::new(900.0, 800.0);
        state
    }

    #[test]
    fn zoom_in_bumps_generation_and_invalidates() {
        let mut state = ready_state();
        let generation = state.generation;

        let effects = state.apply(Command::ZoomIn);
        assert_eq!(
            effects,
            vec![
                Effect::InvalidateAll,
                Effect::RecomputeWindow,
                Effect::RenderWindow
            ]
        );
        assert!(state.generation > generation);
        assert!(state.transform.scale > 1.0);
    }

    #[test]
    fn zoom_at_max_is_a_no_op() {
        let mut state = ready_state();
        state.transform.scale = state.zoom.max_scale;
        let effects = state.apply(Command::ZoomIn);
        assert!(effects.is_empty());
        assert_eq!(state.transform.scale, state.zoom.max_scale);
    }

    #[test]
    fn zoom_out_clamps_at_min() {
        let mut state = ready_state();
        state.transform.scale = state.zoom.min_scale;
        let effects = state.apply(Command::ZoomOut);
        assert!(effects.is_empty());
    }

    #[test]
    fn rotate_right_four_times_round_trips() {
        let mut state = ready_state();
        for _ in 0..4 {
            let effects = state.apply(Command::RotateRight);
            assert_eq!(effects[0], Effect::InvalidateAll);
        }
        assert_eq!(state.transform.rotation, Rotation::Deg0);
    }

    #[test]
    fn rotate_left_four_times_round_trips() {
        let mut state = ready_state();
        for _ in 0..4 {
            let _ = state.apply(Command::RotateLeft);
        }
        assert_eq!(state.transform.rotation, Rotation::Deg0);
    }

    #[test]
    fn goto_page_clamps_and_scrolls() {
        let mut state = ready_state();
        let effects = state.apply(Command::GotoPage(9999));
        assert_eq!(state.current_page, 100);
        assert_eq!(
            effects,
            vec![
                Effect::ScrollToPage(100),
                Effect::RecomputeWindow,
                Effect::RenderWindow
            ]
        );
    }

    #[test]
    fn goto_page_does_not_touch_transform() {
        let mut state = ready_state();
        let before = state.transform;
        let generation = state.generation;
        let _ = state.apply(Command::GotoPage(42));
        assert_eq!(state.transform, before);
        assert_eq!(state.generation, generation);
    }

    #[test]
    fn fit_to_width_derives_scale() {
        let mut state = ready_state();
        let effects = state.apply(Command::FitToWidth);
        assert_eq!(state.transform.scale, 1.5);
        assert_eq!(effects[0], Effect::InvalidateAll);
        assert_eq!(state.fit_mode, FitMode::Width);
    }

    #[test]
    fn resize_under_fit_mode_rescales() {
        let mut state = ready_state();
        let _ = state.apply(Command::FitToWidth);
        let effects = state.apply(Command::SetViewport(Extent::new(1200.0, 800.0)));
        assert_eq!(state.transform.scale, 2.0);
        assert_eq!(effects[0], Effect::InvalidateAll);
    }

    #[test]
    fn resize_without_fit_mode_only_rewindows() {
        let mut state = ready_state();
        let effects = state.apply(Command::SetViewport(Extent::new(1200.0, 700.0)));
        assert_eq!(effects, vec![Effect::RecomputeWindow, Effect::RenderWindow]);
    }

    #[test]
    fn unchanged_viewport_is_a_no_op() {
        let mut state = ready_state();
        let effects = state.apply(Command::SetViewport(state.viewport));
        assert!(effects.is_empty());
    }

    #[test]
    fn set_zoom_percent_maps_to_scale() {
        let mut state = ready_state();
        let _ = state.apply(Command::SetZoomPercent(150.0));
        assert_eq!(state.transform.scale, 1.5);
    }

    #[test]
    fn explicit_zoom_leaves_fit_mode() {
        let mut state = ready_state();
        let _ = state.apply(Command::FitToWidth);
        let _ = state.apply(Command::ZoomIn);
        assert_eq!(state.fit_mode, FitMode::Custom);
    }
}
