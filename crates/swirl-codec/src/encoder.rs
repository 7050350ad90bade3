//! The Frame Encoder.

use swirl_core::{PixelBuffer, Quality};

use crate::codec::ImageCodec;
use crate::error::CodecError;
use crate::frame::EncodedFrame;

/// Compresses rasterized frames and owns the most recent result.
///
/// The encoder releases its previous frame before producing the next one:
/// a reference returned by [`encode`](FrameEncoder::encode) is valid until
/// the next `encode` or [`release`](FrameEncoder::release).
#[derive(Debug)]
pub struct FrameEncoder {
    codec: Box<dyn ImageCodec>,
    current: Option<EncodedFrame>,
    frames_encoded: u64,
}

impl FrameEncoder {
    /// Encoder around `codec`, holding no frame.
    pub fn new(codec: Box<dyn ImageCodec>) -> Self {
        Self {
            codec,
            current: None,
            frames_encoded: 0,
        }
    }

    /// Compress `pixels` at `quality`, replacing the held frame.
    ///
    /// On failure no frame is held: a partial or corrupt frame is never
    /// returned.
    pub fn encode(
        &mut self,
        pixels: &PixelBuffer,
        quality: Quality,
    ) -> Result<&EncodedFrame, CodecError> {
        self.current = None;
        let mut out = Vec::new();
        self.codec.compress(
            pixels.as_bytes(),
            pixels.width(),
            pixels.height(),
            quality,
            &mut out,
        )?;
        if out.is_empty() {
            return Err(CodecError::EmptyOutput {
                codec: self.codec.name(),
            });
        }
        self.frames_encoded += 1;
        tracing::trace!(
            codec = self.codec.name(),
            bytes = out.len(),
            quality = quality.get(),
            "frame encoded"
        );
        Ok(self.current.insert(EncodedFrame::new(out)))
    }

    /// The frame produced by the last successful `encode`, if still held.
    pub fn current(&self) -> Option<&EncodedFrame> {
        self.current.as_ref()
    }

    /// Drop the held frame.
    pub fn release(&mut self) {
        self.current = None;
    }

    /// Frames successfully encoded so far.
    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }

    /// Name of the codec in use.
    pub fn codec_name(&self) -> &'static str {
        self.codec.name()
    }
}
