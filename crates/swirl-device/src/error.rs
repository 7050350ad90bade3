//! Device status codes and call-site-annotated faults.

use std::panic::Location;

use thiserror::Error;

use crate::memory::BufferId;

/// Status of a single device call.
///
/// Every variant is unrecoverable for the pipeline that observes it: the
/// device holds the only copy of the simulation state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Allocation would exceed the device memory limit.
    #[error("out of device memory: requested {requested} bytes with {in_use} of {limit} in use")]
    OutOfMemory {
        /// Bytes requested.
        requested: usize,
        /// Bytes already allocated.
        in_use: usize,
        /// Device memory limit.
        limit: usize,
    },
    /// The buffer was never allocated or has been freed.
    #[error("invalid buffer {buffer}")]
    InvalidBuffer {
        /// The offending buffer.
        buffer: BufferId,
    },
    /// A transfer touches bytes outside the buffer.
    #[error("{len} bytes at offset {offset} exceed buffer {buffer} of {size} bytes")]
    OutOfBounds {
        /// The buffer accessed.
        buffer: BufferId,
        /// Start of the access.
        offset: usize,
        /// Length of the access.
        len: usize,
        /// Size of the buffer.
        size: usize,
    },
    /// A buffer was accessed while a kernel holds it as its output.
    #[error("buffer {buffer} is bound as a kernel output")]
    Aliased {
        /// The buffer accessed.
        buffer: BufferId,
    },
    /// A buffer's size is not a whole number of the requested element.
    #[error("buffer {buffer} of {size} bytes cannot be viewed as {elem}-byte elements")]
    TypeMismatch {
        /// The buffer viewed.
        buffer: BufferId,
        /// Size of the buffer.
        size: usize,
        /// Element size requested.
        elem: usize,
    },
    /// The kernel could not be enqueued.
    #[error("launch of kernel '{kernel}' failed: {reason}")]
    LaunchFailed {
        /// Kernel name.
        kernel: &'static str,
        /// Why the launch was refused.
        reason: String,
    },
    /// The kernel failed while executing.
    #[error("kernel '{kernel}' faulted: {reason}")]
    KernelFault {
        /// Kernel name.
        kernel: &'static str,
        /// Device diagnostic.
        reason: String,
    },
    /// The device could not be brought up.
    #[error("device initialization failed: {reason}")]
    InitFailed {
        /// Device diagnostic.
        reason: String,
    },
    /// The device queue is gone.
    #[error("device lost")]
    Lost,
}

/// A [`DeviceError`] annotated with the device call and the call site
/// that observed it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("device fault in {call} at {file}:{line}: {source}")]
pub struct DeviceFault {
    /// Device operation that reported the error.
    pub call: &'static str,
    /// Source file of the failing call site.
    pub file: &'static str,
    /// Source line of the failing call site.
    pub line: u32,
    /// The device's diagnostic.
    pub source: DeviceError,
}

impl DeviceFault {
    /// Attach a call name and location to a device error.
    pub fn new(call: &'static str, site: &'static Location<'static>, source: DeviceError) -> Self {
        Self {
            call,
            file: site.file(),
            line: site.line(),
            source,
        }
    }
}
