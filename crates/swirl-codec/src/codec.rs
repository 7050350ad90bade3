//! The compressor boundary and the JPEG codec.

use std::fmt;

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use swirl_core::{PixelBuffer, Quality};

use crate::error::CodecError;

/// A quality-parameterised lossy compressor for packed RGB images.
pub trait ImageCodec: Send + fmt::Debug {
    /// Codec name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Compress `rgb` (`width * height * 3` samples, row-major) into `out`,
    /// growing it as needed. On error the contents of `out` are
    /// unspecified and must be discarded.
    fn compress(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
        quality: Quality,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError>;
}

/// Baseline JPEG via the `image` crate encoder.
#[derive(Clone, Copy, Debug, Default)]
pub struct JpegCodec;

impl JpegCodec {
    /// Largest width or height a JPEG frame header can carry.
    pub const MAX_DIMENSION: u32 = PixelBuffer::MAX_DIMENSION;
}

impl ImageCodec for JpegCodec {
    fn name(&self) -> &'static str {
        "jpeg"
    }

    fn compress(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
        quality: Quality,
        out: &mut Vec<u8>,
    ) -> Result<(), CodecError> {
        let expected = width as usize * height as usize * 3;
        if width == 0
            || height == 0
            || width > Self::MAX_DIMENSION
            || height > Self::MAX_DIMENSION
            || rgb.len() != expected
        {
            return Err(CodecError::Dimensions {
                codec: self.name(),
                width,
                height,
                samples: rgb.len(),
            });
        }
        JpegEncoder::new_with_quality(out, quality.get())
            .encode(rgb, width, height, ExtendedColorType::Rgb8)
            .map_err(|e| CodecError::Compression {
                codec: "jpeg",
                reason: e.to_string(),
            })
    }
}
