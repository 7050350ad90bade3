//! Device-resident simulation state and the per-tick advance.
//!
//! - [`DeviceStateStore`] owns the FieldGrid and the device copy of the
//!   [`SimulationConstants`](swirl_core::SimulationConstants), mirrored by a
//!   host copy.
//! - [`SimulationEngine`] advances the store by one tick through a
//!   ping-pong buffer, applying a pluggable [`UpdateRule`] on the device.
//! - [`MomentumTransfer`] and [`Diffusion`] are the shipped rules.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod engine;
pub mod error;
pub mod kernels;
pub mod rule;
pub mod seed;
pub mod store;

pub use engine::SimulationEngine;
pub use error::StoreError;
pub use rule::{Diffusion, MomentumTransfer, UpdateRule};
pub use seed::noise_field;
pub use store::DeviceStateStore;
