//! Errors from the state store and simulation engine.

use swirl_core::{DimsError, GridDims};
use swirl_device::DeviceFault;
use thiserror::Error;

/// Failure of a [`DeviceStateStore`](crate::DeviceStateStore) or
/// [`SimulationEngine`](crate::SimulationEngine) operation.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum StoreError {
    /// The device reported a fault. Unrecoverable for this store.
    #[error(transparent)]
    Device(#[from] DeviceFault),
    /// Requested dimensions are not a valid grid.
    #[error(transparent)]
    Dims(#[from] DimsError),
    /// A coordinate lies outside the grid.
    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        /// Requested column.
        x: u32,
        /// Requested row.
        y: u32,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },
    /// The FieldGrid cannot change size after initialization.
    #[error("cannot resize the {current_width}x{current_height} grid to {width}x{height}")]
    ResizeUnsupported {
        /// Allocated width.
        current_width: u32,
        /// Allocated height.
        current_height: u32,
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// A host field image has the wrong number of cells.
    #[error("field image has {actual} cells, grid holds {expected}")]
    LengthMismatch {
        /// Cells in the grid.
        expected: usize,
        /// Cells supplied.
        actual: usize,
    },
    /// Update-rule parameters are out of range.
    #[error("invalid rule parameters: {reason}")]
    InvalidParams {
        /// Which parameter was rejected.
        reason: String,
    },
}

impl StoreError {
    pub(crate) fn out_of_bounds(x: u32, y: u32, dims: GridDims) -> Self {
        Self::OutOfBounds {
            x,
            y,
            width: dims.width(),
            height: dims.height(),
        }
    }

    /// Whether the error came from the device and leaves the store unusable.
    pub fn is_device_fault(&self) -> bool {
        matches!(self, Self::Device(_))
    }
}
