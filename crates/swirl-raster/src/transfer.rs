//! Colour transfer policies.
//!
//! Both shipped policies share the same contrast normalisation: per frame
//! the rasterizer measures the smallest and largest squared magnitude in
//! the grid, and each cell's brightness is
//! `level = ((|v|² - min) / (max - min))^(1/4)`, or 0 for a uniform grid.
//! The fourth root lifts faint structure out of the dark end of the range.

use std::fmt;

use swirl_core::Cell;

/// Per-frame magnitude range used for contrast normalisation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldStats {
    /// Smallest squared magnitude in the grid.
    pub min_sq: f32,
    /// Largest squared magnitude in the grid.
    pub max_sq: f32,
}

impl FieldStats {
    /// Measure a grid. Non-finite cells are ignored.
    pub fn measure(cells: &[Cell]) -> Self {
        let (min_sq, max_sq) = cells
            .iter()
            .map(|c| c.magnitude_squared())
            .filter(|m| m.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), m| {
                (lo.min(m), hi.max(m))
            });
        if min_sq > max_sq {
            Self {
                min_sq: 0.0,
                max_sq: 0.0,
            }
        } else {
            Self { min_sq, max_sq }
        }
    }

    /// Normalised brightness of `cell` in `[0, 1]`.
    pub fn level(&self, cell: Cell) -> f32 {
        let span = self.max_sq - self.min_sq;
        if !(span > 0.0) {
            return 0.0;
        }
        let t = (cell.magnitude_squared() - self.min_sq) / span;
        if t.is_finite() {
            t.clamp(0.0, 1.0).powf(0.25)
        } else {
            0.0
        }
    }
}

/// Maps one cell to an RGB triple. Must be pure: the same cell and stats
/// always give the same colour.
pub trait ColorTransfer: Send + Sync + fmt::Debug {
    /// Policy name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Colour of `cell` given the frame's `stats`.
    fn color(&self, cell: Cell, stats: &FieldStats) -> [u8; 3];
}

fn to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Direction as hue, magnitude as value (HSV with full saturation).
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectionHue;

impl DirectionHue {
    /// Hue in degrees, `[0, 360)`, of the direction `atan2(y, x)`.
    pub fn hue(cell: Cell) -> f32 {
        let deg = cell.angle().to_degrees();
        let hue = if deg < 0.0 { deg + 360.0 } else { deg };
        if hue >= 360.0 || !hue.is_finite() {
            0.0
        } else {
            hue
        }
    }
}

fn hsv_to_rgb(hue: f32, value: f32) -> [f32; 3] {
    let sector = hue / 60.0;
    let x = value * (1.0 - ((sector % 2.0) - 1.0).abs());
    match sector as u32 {
        0 => [value, x, 0.0],
        1 => [x, value, 0.0],
        2 => [0.0, value, x],
        3 => [0.0, x, value],
        4 => [x, 0.0, value],
        _ => [value, 0.0, x],
    }
}

impl ColorTransfer for DirectionHue {
    fn name(&self) -> &'static str {
        "direction_hue"
    }

    fn color(&self, cell: Cell, stats: &FieldStats) -> [u8; 3] {
        let [r, g, b] = hsv_to_rgb(Self::hue(cell), stats.level(cell));
        [to_byte(r), to_byte(g), to_byte(b)]
    }
}

/// Greyscale brightness from magnitude alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct Magnitude;

impl ColorTransfer for Magnitude {
    fn name(&self) -> &'static str {
        "magnitude"
    }

    fn color(&self, cell: Cell, stats: &FieldStats) -> [u8; 3] {
        let v = to_byte(stats.level(cell));
        [v, v, v]
    }
}
