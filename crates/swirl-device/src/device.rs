//! The [`ComputeDevice`] trait: memory and launch primitives with a status
//! per call.

use crate::error::DeviceError;
use crate::kernel::Kernel;
use crate::memory::BufferId;

/// A compute device as seen by the pipeline.
///
/// Memory transfers (`upload`, `download`, `copy`) and `free` are ordered
/// after every previously launched kernel. `launch` only enqueues: it
/// reports launch errors immediately, while errors raised during execution
/// are recorded as a sticky fault that surfaces through
/// [`last_error`](ComputeDevice::last_error) once the failing kernel has
/// run, or through [`synchronize`](ComputeDevice::synchronize) at the
/// latest. After a fault is recorded, queued kernels are skipped until the
/// fault has been reported.
pub trait ComputeDevice: Send {
    /// Human-readable device name.
    fn name(&self) -> &str;

    /// Allocate a zero-initialised buffer of `bytes` bytes.
    fn alloc_zeroed(&mut self, bytes: usize) -> Result<BufferId, DeviceError>;

    /// Release a buffer. Freeing an unknown or already freed id is an error,
    /// never a double free.
    fn free(&mut self, buffer: BufferId) -> Result<(), DeviceError>;

    /// Copy host bytes into a buffer at `offset`.
    fn upload(&mut self, buffer: BufferId, offset: usize, data: &[u8]) -> Result<(), DeviceError>;

    /// Copy buffer bytes starting at `offset` into `out`.
    fn download(&mut self, buffer: BufferId, offset: usize, out: &mut [u8])
        -> Result<(), DeviceError>;

    /// Device-to-device copy between equally sized buffers.
    fn copy(&mut self, src: BufferId, dst: BufferId) -> Result<(), DeviceError>;

    /// Enqueue a kernel.
    fn launch(&mut self, kernel: Box<dyn Kernel>) -> Result<(), DeviceError>;

    /// Report and clear the execution fault recorded so far, without
    /// waiting for queued work.
    fn last_error(&mut self) -> Result<(), DeviceError>;

    /// Block until all queued work has completed, then report and clear any
    /// execution fault.
    fn synchronize(&mut self) -> Result<(), DeviceError>;
}
