//! Swirl: a vector field simulation streamed as JPEG frames.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Swirl sub-crates. Each call to [`Pipeline::step`](engine::Pipeline::step)
//! advances the field one tick on the compute device, rasterizes it through
//! a camera, and returns the compressed frame.
//!
//! # Quick start
//!
//! ```rust
//! use swirl::prelude::*;
//!
//! let device = HostDevice::new(HostDeviceConfig {
//!     worker_threads: Some(2),
//!     memory_limit: 16 << 20,
//! })
//! .unwrap();
//! let mut pipeline = Pipeline::new(Box::new(device), PipelineConfig::default()).unwrap();
//! pipeline.initialize(16, 16).unwrap();
//! pipeline.inject(8, 8, Cell::new(1.0, 0.0)).unwrap();
//!
//! let frame = pipeline.step().unwrap();
//! assert_eq!(&frame.as_bytes()[..2], &[0xFF, 0xD8]);
//! assert_eq!(pipeline.tick(), TickId(1));
//!
//! pipeline.cleanup().unwrap();
//! assert_eq!(pipeline.state(), LifecycleState::Released);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `swirl-core` | Cells, grid dimensions, constants, pixels, quality |
//! | [`device`] | `swirl-device` | Compute-device boundary, host backend, sync strategies |
//! | [`sim`] | `swirl-sim` | Device state store, simulation engine, update rules |
//! | [`raster`] | `swirl-raster` | Camera, rasterizer, colour transfers |
//! | [`codec`] | `swirl-codec` | Frame encoder and JPEG codec |
//! | [`engine`] | `swirl-engine` | Pipeline façade, configuration, errors |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core data model (`swirl-core`).
pub use swirl_core as types;

/// Compute-device boundary (`swirl-device`).
///
/// Implement [`device::ComputeDevice`] to run the pipeline on another
/// backend; [`device::HostDevice`] is the built-in one.
pub use swirl_device as device;

/// Device state and simulation (`swirl-sim`).
///
/// [`sim::UpdateRule`] is the extension point for new field dynamics.
pub use swirl_sim as sim;

/// Rasterization (`swirl-raster`).
///
/// [`raster::ColorTransfer`] is the extension point for new colourings.
pub use swirl_raster as raster;

/// Frame compression (`swirl-codec`).
pub use swirl_codec as codec;

/// The pipeline façade (`swirl-engine`).
pub use swirl_engine as engine;

/// Common imports for typical Swirl usage.
///
/// ```rust
/// use swirl::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use swirl_core::{Cell, GridDims, PixelBuffer, Quality, SimulationConstants, TickId};

    // Device
    pub use swirl_device::{ComputeDevice, HostDevice, HostDeviceConfig, SyncMode};

    // Extension points
    pub use swirl_codec::{EncodedFrame, ImageCodec};
    pub use swirl_raster::ColorTransfer;
    pub use swirl_sim::UpdateRule;

    // Engine
    pub use swirl_engine::{
        InitialField, LifecycleState, Pipeline, PipelineConfig, PipelineError, RuleConfig,
        StepMetrics, TransferKind,
    };
}
