//! Validation errors for the core value types.

use thiserror::Error;

/// Grid dimensions rejected by [`GridDims::new`](crate::GridDims::new).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DimsError {
    /// Width or height is zero.
    #[error("grid dimensions must be positive, got {width}x{height}")]
    Empty {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// A negative value arrived through the C ABI.
    #[error("grid dimensions must not be negative, got {width}x{height}")]
    Negative {
        /// Requested width.
        width: i64,
        /// Requested height.
        height: i64,
    },
    /// The grid does not fit the addressable cell range.
    #[error("grid {width}x{height} exceeds the addressable cell count")]
    TooLarge {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// An output frame too large to render and encode.
    #[error(
        "frame {width}x{height} exceeds the frame limit \
         ({max_dimension} per axis, {max_pixels} pixels)"
    )]
    FrameTooLarge {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Per-axis limit.
        max_dimension: u32,
        /// Pixel-count limit.
        max_pixels: usize,
    },
}

/// A codec quality outside `[1, 100]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("quality {value} is outside the valid range [1, 100]")]
pub struct QualityError {
    /// The rejected value.
    pub value: i64,
}

/// A pixel buffer whose length disagrees with its dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PixelError {
    /// Width or height is zero.
    #[error("pixel buffer dimensions must be positive, got {width}x{height}")]
    Empty {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },
    /// Sample count is not `width * height * 3`.
    #[error("pixel buffer holds {actual} samples, expected {expected}")]
    LengthMismatch {
        /// `width * height * 3`.
        expected: usize,
        /// Length of the supplied data.
        actual: usize,
    },
}
