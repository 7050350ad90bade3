//! Core data model for the Swirl pipeline.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! values that flow between the simulation, rasterization and encoding
//! stages: field cells, grid dimensions, the tick-invariant simulation
//! constants, pixel buffers and the codec quality level.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cell;
pub mod constants;
pub mod dims;
pub mod error;
pub mod id;
pub mod pixel;
pub mod quality;
pub mod slots;

pub use cell::Cell;
pub use constants::SimulationConstants;
pub use dims::GridDims;
pub use error::{DimsError, PixelError, QualityError};
pub use id::TickId;
pub use pixel::PixelBuffer;
pub use quality::Quality;
pub use slots::{SlotKey, SlotTable};
