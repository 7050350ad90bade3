//! The unit of work a compute device executes.

use crate::error::DeviceError;
use crate::memory::{BufferId, DeviceMemory};

/// A device-side pass over one or more buffers.
///
/// A kernel names every buffer it touches in [`bindings`](Kernel::bindings)
/// so the device can reject a launch against freed memory before queueing
/// it. [`run`](Kernel::run) executes on the device's own thread; it may fan
/// out across the device's worker pool but must leave memory in a
/// consistent state when it returns, error or not.
pub trait Kernel: Send + Sync + 'static {
    /// Kernel name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Buffers read or written by this kernel.
    fn bindings(&self) -> Vec<BufferId>;

    /// Execute against device memory.
    fn run(&self, memory: &mut DeviceMemory) -> Result<(), DeviceError>;
}
