//! Fault-detection disciplines applied after each kernel dispatch.
//!
//! [`StrictSync`] drains the device after every dispatch so an execution
//! fault is attributed to the call that caused it. [`DeferredSync`] only
//! polls the launch status, letting the host run ahead of the device;
//! execution faults then surface at the next synchronization point,
//! typically the readback that precedes rasterization.

use std::fmt;

use crate::device::ComputeDevice;
use crate::error::DeviceError;

/// Which discipline a [`Dispatcher`](crate::Dispatcher) applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncMode {
    /// Synchronize after every dispatch.
    Strict,
    /// Check launch status only.
    Deferred,
}

impl SyncMode {
    /// The mode selected at build time: `Strict` with the `strict-sync`
    /// feature, `Deferred` otherwise.
    pub const fn build_default() -> Self {
        if cfg!(feature = "strict-sync") {
            Self::Strict
        } else {
            Self::Deferred
        }
    }

    /// The strategy object implementing this mode.
    pub fn strategy(self) -> Box<dyn SyncStrategy> {
        match self {
            Self::Strict => Box::new(StrictSync),
            Self::Deferred => Box::new(DeferredSync),
        }
    }
}

impl Default for SyncMode {
    fn default() -> Self {
        Self::build_default()
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Deferred => write!(f, "deferred"),
        }
    }
}

/// Post-dispatch check run by the [`Dispatcher`](crate::Dispatcher).
pub trait SyncStrategy: Send + Sync + fmt::Debug {
    /// The mode this strategy implements.
    fn mode(&self) -> SyncMode;

    /// Check the device after a kernel has been enqueued.
    fn after_dispatch(&self, device: &mut dyn ComputeDevice) -> Result<(), DeviceError>;
}

/// Synchronize after every dispatch.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrictSync;

impl SyncStrategy for StrictSync {
    fn mode(&self) -> SyncMode {
        SyncMode::Strict
    }

    fn after_dispatch(&self, device: &mut dyn ComputeDevice) -> Result<(), DeviceError> {
        device.last_error()?;
        device.synchronize()
    }
}

/// Poll the last error and return without waiting.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeferredSync;

impl SyncStrategy for DeferredSync {
    fn mode(&self) -> SyncMode {
        SyncMode::Deferred
    }

    fn after_dispatch(&self, device: &mut dyn ComputeDevice) -> Result<(), DeviceError> {
        device.last_error()
    }
}
