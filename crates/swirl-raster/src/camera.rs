//! Output resolution and codec quality.

use swirl_core::{GridDims, PixelBuffer, Quality};

use crate::error::RasterError;

/// Output frame parameters, independent of the simulation resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Camera {
    resolution: GridDims,
    quality: Quality,
}

impl Camera {
    /// Validate a camera from raw ABI values. The resolution must also be
    /// a frame the codec can carry (see [`PixelBuffer::check_size`]).
    pub fn new(width: i64, height: i64, quality: i64) -> Result<Self, RasterError> {
        let resolution = GridDims::from_signed(width, height)?;
        Ok(Self {
            resolution: PixelBuffer::check_size(resolution)?,
            quality: Quality::new(quality)?,
        })
    }

    /// Camera with an already validated resolution and quality.
    pub fn with(resolution: GridDims, quality: Quality) -> Self {
        Self {
            resolution,
            quality,
        }
    }

    /// Output width in pixels.
    pub fn width(&self) -> u32 {
        self.resolution.width()
    }

    /// Output height in pixels.
    pub fn height(&self) -> u32 {
        self.resolution.height()
    }

    /// Output resolution.
    pub fn resolution(&self) -> GridDims {
        self.resolution
    }

    /// Quality handed to the encoder.
    pub fn quality(&self) -> Quality {
        self.quality
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swirl_core::DimsError;

    #[test]
    fn raw_values_are_validated() {
        let cam = Camera::new(320, 240, 90).unwrap();
        assert_eq!((cam.width(), cam.height(), cam.quality().get()), (320, 240, 90));
        assert!(matches!(Camera::new(0, 240, 90), Err(RasterError::InvalidCamera(_))));
        assert!(matches!(Camera::new(-1, 240, 90), Err(RasterError::InvalidCamera(_))));
        assert!(matches!(Camera::new(320, 240, 0), Err(RasterError::Quality(_))));
        assert!(matches!(Camera::new(320, 240, 101), Err(RasterError::Quality(_))));
    }

    #[test]
    fn oversized_frames_are_rejected() {
        assert!(Camera::new(65_535, 1, 75).is_ok());
        assert!(matches!(
            Camera::new(70_000, 1, 75),
            Err(RasterError::InvalidCamera(DimsError::FrameTooLarge { .. }))
        ));
        assert!(matches!(
            Camera::new(60_000, 60_000, 75),
            Err(RasterError::InvalidCamera(DimsError::FrameTooLarge { .. }))
        ));
    }
}
