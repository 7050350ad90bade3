//! C-compatible status codes.
//!
//! [`SwirlStatus`] is a `repr(i32)` enum returned by every handle-surface
//! function and passed to the fatal handler by the three-operation
//! surface. `Ok` is zero, errors are negative, values are ABI-stable.

use swirl_engine::PipelineError;
use swirl_raster::RasterError;
use swirl_sim::StoreError;

/// C-compatible status code.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwirlStatus {
    /// Success.
    Ok = 0,
    /// Handle is invalid or was already destroyed.
    InvalidHandle = -1,
    /// An argument is null, out of range, or otherwise invalid.
    InvalidArgument = -2,
    /// Configuration validation error.
    ConfigError = -3,
    /// The compute device reported a fault (allocation, launch or
    /// execution).
    DeviceFault = -4,
    /// Frame compression failed.
    CodecFault = -5,
    /// Operation called out of lifecycle order.
    LifecycleViolation = -6,
    /// The pipeline faulted earlier; only cleanup is accepted.
    Faulted = -7,
    /// The grid cannot change size after initialization.
    ResizeUnsupported = -8,
    /// Internal error (e.g. poisoned mutex after a prior panic).
    InternalError = -20,
    /// A Rust panic was caught at the FFI boundary.
    Panicked = -128,
}

impl From<&PipelineError> for SwirlStatus {
    fn from(e: &PipelineError) -> Self {
        match e {
            PipelineError::Config(_) => SwirlStatus::ConfigError,
            PipelineError::Dims(_) => SwirlStatus::InvalidArgument,
            PipelineError::Device(_) => SwirlStatus::DeviceFault,
            PipelineError::Store(StoreError::ResizeUnsupported { .. }) => {
                SwirlStatus::ResizeUnsupported
            }
            PipelineError::Store(StoreError::Device(_)) => SwirlStatus::DeviceFault,
            PipelineError::Store(_) => SwirlStatus::InvalidArgument,
            PipelineError::Raster(RasterError::FieldSizeMismatch { .. }) => {
                SwirlStatus::InternalError
            }
            PipelineError::Raster(_) => SwirlStatus::InvalidArgument,
            PipelineError::Codec(_) => SwirlStatus::CodecFault,
            PipelineError::Lifecycle { .. } => SwirlStatus::LifecycleViolation,
            PipelineError::Faulted { .. } => SwirlStatus::Faulted,
        }
    }
}

impl From<Result<(), PipelineError>> for SwirlStatus {
    fn from(r: Result<(), PipelineError>) -> Self {
        match r {
            Ok(()) => SwirlStatus::Ok,
            Err(e) => SwirlStatus::from(&e),
        }
    }
}
