//! Rasterizer errors.

use swirl_core::{DimsError, PixelError, QualityError};
use thiserror::Error;

/// Failure to configure the camera or draw a frame.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RasterError {
    /// The field slice does not match the constants' grid size.
    #[error("field has {actual} cells, constants describe {expected}")]
    FieldSizeMismatch {
        /// `width * height` from the constants.
        expected: usize,
        /// Cells supplied.
        actual: usize,
    },
    /// Camera resolution is not a valid image size.
    #[error("invalid camera resolution: {0}")]
    InvalidCamera(#[from] DimsError),
    /// Quality outside the codec range.
    #[error(transparent)]
    Quality(#[from] QualityError),
    /// The output image could not be assembled.
    #[error(transparent)]
    Pixels(#[from] PixelError),
}
