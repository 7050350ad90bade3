//! Compute-device boundary for the Swirl pipeline.
//!
//! The simulation treats the compute device as a black box offering
//! allocate/free/copy/launch primitives that each report a status. This
//! crate defines that boundary ([`ComputeDevice`], [`Kernel`]), the
//! production [`HostDevice`] backend (an asynchronous queue executing
//! kernels on a thread pool), and the two fault-detection disciplines
//! ([`StrictSync`], [`DeferredSync`]) applied by the [`Dispatcher`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod device;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod kernel;
pub mod memory;
pub mod sync;

pub use device::ComputeDevice;
pub use dispatch::Dispatcher;
pub use error::{DeviceError, DeviceFault};
pub use host::{HostDevice, HostDeviceConfig};
pub use kernel::Kernel;
pub use memory::{BufferId, DeviceMemory};
pub use sync::{DeferredSync, StrictSync, SyncMode, SyncStrategy};
