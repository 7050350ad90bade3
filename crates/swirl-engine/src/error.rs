//! Pipeline lifecycle states and errors.

use std::fmt;

use swirl_codec::CodecError;
use swirl_core::DimsError;
use swirl_device::DeviceFault;
use swirl_raster::RasterError;
use swirl_sim::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Observable lifecycle state of a [`Pipeline`](crate::Pipeline).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Constructed, nothing allocated on the device.
    Uninitialized,
    /// Device state allocated; `step` is valid.
    Ready,
    /// A device, raster or codec fault occurred. Only `cleanup` is valid.
    Faulted,
    /// Terminal. No call is valid.
    Released,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Faulted => "faulted",
            Self::Released => "released",
        };
        f.write_str(s)
    }
}

/// Failure of a [`Pipeline`](crate::Pipeline) operation.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum PipelineError {
    /// Configuration rejected before anything was allocated.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Requested grid dimensions are invalid.
    #[error(transparent)]
    Dims(#[from] DimsError),
    /// The device reported a fault. The pipeline is now faulted.
    #[error(transparent)]
    Device(DeviceFault),
    /// The state store rejected a request (bounds, resize, parameters).
    #[error(transparent)]
    Store(StoreError),
    /// Rasterization or camera configuration failed.
    #[error(transparent)]
    Raster(#[from] RasterError),
    /// Frame compression failed. The pipeline is now faulted.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The operation is not valid in the current lifecycle state.
    #[error("{op} is not valid while the pipeline is {state}")]
    Lifecycle {
        /// Rejected operation.
        op: &'static str,
        /// State at the time of the call.
        state: LifecycleState,
    },
    /// An earlier fault made the pipeline unusable.
    #[error("{op} rejected: the pipeline has faulted")]
    Faulted {
        /// Rejected operation.
        op: &'static str,
    },
}

impl From<DeviceFault> for PipelineError {
    fn from(fault: DeviceFault) -> Self {
        Self::Device(fault)
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Device(fault) => Self::Device(fault),
            other => Self::Store(other),
        }
    }
}

impl PipelineError {
    /// Whether this error leaves the pipeline without a trustworthy
    /// device state.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Device(_) | Self::Codec(_) | Self::Raster(RasterError::FieldSizeMismatch { .. })
        )
    }

    /// Whether this error reports a call made in the wrong lifecycle state.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Lifecycle { .. } | Self::Faulted { .. })
    }
}
