//! The two-component vector stored in every FieldGrid cell.

use std::ops::{Add, Mul};

use bytemuck::{Pod, Zeroable};

/// One FieldGrid cell: a two-component flow vector.
///
/// `repr(C)` with two `f32`s, so a device buffer of `n` cells is exactly
/// `8 * n` bytes and can be viewed in place with [`bytemuck`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Cell {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component.
    pub y: f32,
}

impl Cell {
    /// The zero vector.
    pub const ZERO: Cell = Cell { x: 0.0, y: 0.0 };

    /// Size of one cell in device memory, in bytes.
    pub const BYTES: usize = std::mem::size_of::<Cell>();

    /// Construct a cell from its components.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean length.
    pub fn magnitude_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Euclidean length.
    pub fn magnitude(self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    /// Direction angle in radians, `atan2(y, x)`, in `(-π, π]`.
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Unit vector in the same direction, or zero when the length is zero
    /// or not finite.
    pub fn normalized_or_zero(self) -> Self {
        let len = self.magnitude();
        if len > 0.0 && len.is_finite() {
            Self::new(self.x / len, self.y / len)
        } else {
            Self::ZERO
        }
    }

    /// Whether both components are finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Cell {
    type Output = Cell;

    fn add(self, rhs: Cell) -> Cell {
        Cell::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Mul<f32> for Cell {
    type Output = Cell;

    fn mul(self, rhs: f32) -> Cell {
        Cell::new(self.x * rhs, self.y * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_is_two_packed_floats() {
        assert_eq!(Cell::BYTES, 8);
        let cells = [Cell::new(1.0, 2.0), Cell::new(3.0, 4.0)];
        let floats: &[f32] = bytemuck::cast_slice(&cells);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn normalize_zero_stays_zero() {
        assert_eq!(Cell::ZERO.normalized_or_zero(), Cell::ZERO);
        let inf = Cell::new(f32::INFINITY, 0.0);
        assert_eq!(inf.normalized_or_zero(), Cell::ZERO);
    }

    #[test]
    fn normalize_has_unit_length() {
        let n = Cell::new(3.0, 4.0).normalized_or_zero();
        assert!((n.magnitude() - 1.0).abs() < 1e-6);
        assert!((n.x - 0.6).abs() < 1e-6);
        assert!((n.y - 0.8).abs() < 1e-6);
    }

    #[test]
    fn angle_follows_atan2() {
        assert_eq!(Cell::new(1.0, 0.0).angle(), 0.0);
        let up = Cell::new(0.0, 1.0).angle();
        assert!((up - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
