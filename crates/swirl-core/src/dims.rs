//! Validated grid dimensions and periodic index arithmetic.

use crate::error::DimsError;

/// Width and height of a two-dimensional grid, both non-zero.
///
/// Cells are stored row-major: `index = y * width + x`. The cell count is
/// guaranteed to fit in a `u32` so device-side index arithmetic never
/// overflows, and the byte size of a vector grid fits in `usize`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridDims {
    width: u32,
    height: u32,
}

impl GridDims {
    /// Validate and construct grid dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self, DimsError> {
        if width == 0 || height == 0 {
            return Err(DimsError::Empty { width, height });
        }
        match (width as u64).checked_mul(height as u64) {
            Some(cells) if cells <= u32::MAX as u64 => Ok(Self { width, height }),
            _ => Err(DimsError::TooLarge { width, height }),
        }
    }

    /// Validate signed dimensions as received across the C ABI.
    pub fn from_signed(width: i64, height: i64) -> Result<Self, DimsError> {
        if width < 0 || height < 0 {
            return Err(DimsError::Negative { width, height });
        }
        let w = u32::try_from(width).map_err(|_| DimsError::TooLarge {
            width: u32::MAX,
            height: height.min(u32::MAX as i64) as u32,
        })?;
        let h = u32::try_from(height).map_err(|_| DimsError::TooLarge {
            width: w,
            height: u32::MAX,
        })?;
        Self::new(w, h)
    }

    /// Grid width in cells.
    pub fn width(self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    pub fn height(self) -> u32 {
        self.height
    }

    /// Total number of cells.
    pub fn cell_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Row-major index of an in-bounds coordinate, or `None`.
    pub fn index(self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Row-major index of an arbitrary coordinate wrapped onto the torus.
    pub fn wrapped_index(self, x: i64, y: i64) -> usize {
        let wx = x.rem_euclid(self.width as i64) as usize;
        let wy = y.rem_euclid(self.height as i64) as usize;
        wy * self.width as usize + wx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_dims_rejected() {
        assert!(matches!(GridDims::new(0, 4), Err(DimsError::Empty { .. })));
        assert!(matches!(GridDims::new(4, 0), Err(DimsError::Empty { .. })));
    }

    #[test]
    fn oversized_dims_rejected() {
        assert!(matches!(
            GridDims::new(u32::MAX, 2),
            Err(DimsError::TooLarge { .. })
        ));
    }

    #[test]
    fn negative_signed_dims_rejected() {
        assert!(matches!(
            GridDims::from_signed(-1, 4),
            Err(DimsError::Negative { .. })
        ));
        assert_eq!(GridDims::from_signed(64, 48).unwrap().cell_count(), 3072);
    }

    #[test]
    fn index_is_row_major() {
        let d = GridDims::new(4, 3).unwrap();
        assert_eq!(d.index(0, 0), Some(0));
        assert_eq!(d.index(3, 0), Some(3));
        assert_eq!(d.index(0, 1), Some(4));
        assert_eq!(d.index(3, 2), Some(11));
        assert_eq!(d.index(4, 0), None);
        assert_eq!(d.index(0, 3), None);
    }

    #[test]
    fn wrapped_index_is_periodic() {
        let d = GridDims::new(4, 3).unwrap();
        assert_eq!(d.wrapped_index(-1, 0), 3);
        assert_eq!(d.wrapped_index(0, -1), 8);
        assert_eq!(d.wrapped_index(4, 3), 0);
        assert_eq!(d.wrapped_index(-5, -4), d.wrapped_index(3, 2));
    }

    proptest! {
        #[test]
        fn wrapped_index_always_in_range(
            w in 1u32..64, h in 1u32..64,
            x in -1000i64..1000, y in -1000i64..1000,
        ) {
            let d = GridDims::new(w, h).unwrap();
            prop_assert!(d.wrapped_index(x, y) < d.cell_count());
        }
    }
}
