//! Frame encoding.
//!
//! [`FrameEncoder`] compresses each rasterized [`PixelBuffer`](swirl_core::PixelBuffer)
//! into an [`EncodedFrame`] it keeps ownership of. Encoding a new frame
//! releases the previous one first, so at most one frame is alive per
//! encoder. The compressor itself is an [`ImageCodec`]; [`JpegCodec`] is
//! the production codec.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod encoder;
pub mod error;
pub mod frame;

pub use codec::{ImageCodec, JpegCodec};
pub use encoder::FrameEncoder;
pub use error::CodecError;
pub use frame::EncodedFrame;
