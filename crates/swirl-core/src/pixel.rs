//! Host-resident RGB pixel buffers.

use crate::dims::GridDims;
use crate::error::{DimsError, PixelError};

/// A `width × height` image of packed 8-bit RGB samples, row-major.
///
/// Regenerated every tick by the rasterizer; nothing holds on to the
/// previous tick's buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Samples per pixel.
    pub const CHANNELS: usize = 3;

    /// Largest frame width or height. Baseline JPEG stores both in 16 bits.
    pub const MAX_DIMENSION: u32 = u16::MAX as u32;

    /// Largest frame in pixels (8192 × 8192).
    pub const MAX_PIXELS: usize = 1 << 26;

    /// Check that a frame of `dims` pixels can be rendered and encoded.
    pub fn check_size(dims: GridDims) -> Result<GridDims, DimsError> {
        let (width, height) = (dims.width(), dims.height());
        if width > Self::MAX_DIMENSION
            || height > Self::MAX_DIMENSION
            || dims.cell_count() > Self::MAX_PIXELS
        {
            return Err(DimsError::FrameTooLarge {
                width,
                height,
                max_dimension: Self::MAX_DIMENSION,
                max_pixels: Self::MAX_PIXELS,
            });
        }
        Ok(dims)
    }

    /// Wrap raw samples, checking `data.len() == width * height * 3`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PixelError> {
        if width == 0 || height == 0 {
            return Err(PixelError::Empty { width, height });
        }
        let expected = Self::sample_count(width, height);
        if data.len() != expected {
            return Err(PixelError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// An all-black buffer.
    pub fn black(width: u32, height: u32) -> Result<Self, PixelError> {
        Self::new(width, height, vec![0; Self::sample_count(width, height)])
    }

    fn sample_count(width: u32, height: u32) -> usize {
        width as usize * height as usize * Self::CHANNELS
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed RGB samples.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The RGB triple at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * Self::CHANNELS;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Give up the sample vector.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}
