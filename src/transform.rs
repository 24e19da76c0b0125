//! Global view transform: zoom scale, quarter-turn rotation, fit modes

use crate::types::{Extent, PageSize};

/// Page rotation in 90-degree steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    #[must_use]
    pub const fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Parse a degree value; only exact quarter turns are valid.
    #[must_use]
    pub const fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// One step clockwise, wrapping mod 360.
    #[must_use]
    pub const fn clockwise(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg90,
            Self::Deg90 => Self::Deg180,
            Self::Deg180 => Self::Deg270,
            Self::Deg270 => Self::Deg0,
        }
    }

    /// One step counter-clockwise, wrapping mod 360.
    #[must_use]
    pub const fn counter_clockwise(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg270,
            Self::Deg90 => Self::Deg0,
            Self::Deg180 => Self::Deg90,
            Self::Deg270 => Self::Deg180,
        }
    }

    /// True for 90/270, where width and height swap.
    #[must_use]
    pub const fn is_sideways(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Zoom clamping bounds plus the per-step multiplier.
#[derive(Clone, Copy, Debug)]
pub struct ZoomBounds {
    pub min_scale: f32,
    pub max_scale: f32,
    pub step: f32,
}

impl Default for ZoomBounds {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 8.0,
            step: 1.25,
        }
    }
}

impl ZoomBounds {
    /// Clamp a scale into bounds, handling NaN/Inf.
    #[must_use]
    pub fn clamp(&self, scale: f32) -> f32 {
        if !scale.is_finite() {
            1.0
        } else {
            scale.clamp(self.min_scale, self.max_scale)
        }
    }
}

/// Zoom policy: explicit percentage, or scale derived from the container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FitMode {
    /// User-chosen scale
    #[default]
    Custom,
    /// Scale derived from container width / page width
    Width,
    /// Scale derived from container height / page height
    Height,
}

impl FitMode {
    /// Cycle Custom -> Width -> Height -> Custom.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Custom => Self::Width,
            Self::Width => Self::Height,
            Self::Height => Self::Custom,
        }
    }
}

/// The one view transform shared by every page of the open document.
/// Written only by the viewer's command handling; read everywhere else.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalTransform {
    pub scale: f32,
    pub rotation: Rotation,
}

impl Default for GlobalTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotation: Rotation::Deg0,
        }
    }
}

impl GlobalTransform {
    /// Native page size after rotation and scaling, i.e. the on-screen
    /// extent of the page.
    #[must_use]
    pub fn apply_to(&self, native: PageSize) -> PageSize {
        let oriented = native.oriented(self.rotation);
        PageSize::new(oriented.width * self.scale, oriented.height * self.scale)
    }
}

/// Scale that makes the (rotated) page fill the container along one axis.
#[must_use]
pub fn fit_scale(
    mode: FitMode,
    native: PageSize,
    rotation: Rotation,
    viewport: Extent,
    bounds: &ZoomBounds,
) -> f32 {
    let oriented = native.oriented(rotation);
    let raw = match mode {
        FitMode::Custom => 1.0,
        FitMode::Width => viewport.width / oriented.width.max(1.0),
        FitMode::Height => viewport.height / oriented.height.max(1.0),
    };
    bounds.clamp(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_full_turn_clockwise_round_trips() {
        let mut r = Rotation::Deg0;
        for _ in 0..4 {
            r = r.clockwise();
        }
        assert_eq!(r, Rotation::Deg0);
    }

    #[test]
    fn rotation_full_turn_counter_clockwise_round_trips() {
        let mut r = Rotation::Deg90;
        for _ in 0..4 {
            r = r.counter_clockwise();
        }
        assert_eq!(r, Rotation::Deg90);
    }

    #[test]
    fn from_degrees_rejects_non_quarter_turns() {
        assert_eq!(Rotation::from_degrees(90), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn clamp_handles_non_finite() {
        let bounds = ZoomBounds::default();
        assert_eq!(bounds.clamp(f32::NAN), 1.0);
        assert_eq!(bounds.clamp(f32::INFINITY), 1.0);
        assert_eq!(bounds.clamp(0.0), bounds.min_scale);
        assert_eq!(bounds.clamp(100.0), bounds.max_scale);
    }

    #[test]
    fn sideways_rotation_swaps_page_extent() {
        let t = GlobalTransform {
            scale: 2.0,
            rotation: Rotation::Deg90,
        };
        let size = t.apply_to(PageSize::new(100.0, 200.0));
        assert_eq!(size.width, 400.0);
        assert_eq!(size.height, 200.0);
    }

    #[test]
    fn fit_width_derives_scale_from_container() {
        let bounds = ZoomBounds::default();
        let scale = fit_scale(
            FitMode::Width,
            PageSize::new(500.0, 700.0),
            Rotation::Deg0,
            Extent::new(1000.0, 800.0),
            &bounds,
        );
        assert_eq!(scale, 2.0);
    }

    #[test]
    fn fit_height_uses_rotated_extent() {
        let bounds = ZoomBounds::default();
        let scale = fit_scale(
            FitMode::Height,
            PageSize::new(400.0, 800.0),
            Rotation::Deg90,
            Extent::new(1000.0, 800.0),
            &bounds,
        );
        // Sideways, the page's vertical extent is its native width.
        assert_eq!(scale, 2.0);
    }
}
