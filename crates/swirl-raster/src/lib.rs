//! Rasterization of a FieldGrid into an RGB [`PixelBuffer`](swirl_core::PixelBuffer).
//!
//! The [`Rasterizer`] is a pure function of the field contents, the
//! simulation constants and its [`Camera`]: identical inputs always produce
//! identical pixels. How a cell becomes a colour is a pluggable
//! [`ColorTransfer`] policy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod camera;
pub mod error;
pub mod raster;
pub mod transfer;

pub use camera::Camera;
pub use error::RasterError;
pub use raster::{resample, Rasterizer};
pub use transfer::{ColorTransfer, DirectionHue, FieldStats, Magnitude};
