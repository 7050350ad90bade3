//! The Device State Store: FieldGrid plus mirrored simulation constants.
//!
//! The store owns two device buffers, the FieldGrid (`width * height`
//! cells, zero-initialised) and the device copy of
//! [`SimulationConstants`], and keeps the host copy. Every mutation of the
//! host constants is uploaded before the call returns, so the device copy
//! is a byte-identical mirror whenever a kernel can observe it.
//!
//! [`release`](DeviceStateStore::release) consumes the store: releasing
//! twice, or using a released store, does not type-check.

use swirl_core::{Cell, GridDims, SimulationConstants};
use swirl_device::{BufferId, Dispatcher};

use crate::error::StoreError;
use crate::rule::UpdateRule;

/// Device-resident simulation state for one pipeline instance.
#[derive(Debug)]
pub struct DeviceStateStore {
    dims: GridDims,
    host: SimulationConstants,
    constants: BufferId,
    field: BufferId,
    released: bool,
}

impl DeviceStateStore {
    /// Allocate and zero the FieldGrid, configure the constants for `rule`
    /// and mirror them to the device.
    ///
    /// On failure every buffer allocated so far is freed again.
    pub fn initialize(
        dispatcher: &mut Dispatcher,
        dims: GridDims,
        rule: &dyn UpdateRule,
    ) -> Result<Self, StoreError> {
        let mut host = SimulationConstants::new(dims);
        rule.configure(&mut host)?;

        let constants = dispatcher.alloc_zeroed(SimulationConstants::BYTES)?;
        let field = match dispatcher.alloc_zeroed(dims.cell_count() * Cell::BYTES) {
            Ok(field) => field,
            Err(e) => {
                free_on_rollback(dispatcher, constants);
                return Err(e.into());
            }
        };
        if let Err(e) = dispatcher.upload(constants, 0, host.as_bytes()) {
            free_on_rollback(dispatcher, field);
            free_on_rollback(dispatcher, constants);
            return Err(e.into());
        }

        tracing::info!(
            width = dims.width(),
            height = dims.height(),
            rule = rule.name(),
            "device state store initialized"
        );
        Ok(Self {
            dims,
            host,
            constants,
            field,
            released: false,
        })
    }

    /// Grid dimensions.
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Host copy of the constants.
    pub fn constants(&self) -> &SimulationConstants {
        &self.host
    }

    /// Device buffer holding the constants.
    pub fn constants_buffer(&self) -> BufferId {
        self.constants
    }

    /// Device buffer holding the current FieldGrid.
    pub fn field_buffer(&self) -> BufferId {
        self.field
    }

    /// Rewrite the grid size in the host constants and mirror them.
    ///
    /// The FieldGrid is never reallocated: any size other than the one
    /// allocated is rejected with [`StoreError::ResizeUnsupported`] and
    /// leaves both copies untouched.
    pub fn update_constants(
        &mut self,
        dispatcher: &mut Dispatcher,
        width: u32,
        height: u32,
    ) -> Result<(), StoreError> {
        let requested = GridDims::new(width, height)?;
        if requested != self.dims {
            return Err(StoreError::ResizeUnsupported {
                current_width: self.dims.width(),
                current_height: self.dims.height(),
                width,
                height,
            });
        }
        let mut next = self.host;
        next.width = width;
        next.height = height;
        self.mirror(dispatcher, next)
    }

    fn mirror(
        &mut self,
        dispatcher: &mut Dispatcher,
        next: SimulationConstants,
    ) -> Result<(), StoreError> {
        dispatcher.upload(self.constants, 0, next.as_bytes())?;
        self.host = next;
        Ok(())
    }

    /// Whether the device copy of the constants matches the host copy byte
    /// for byte.
    pub fn verify_mirror(&self, dispatcher: &mut Dispatcher) -> Result<bool, StoreError> {
        let mut image = [0u8; SimulationConstants::BYTES];
        dispatcher.download(self.constants, 0, &mut image)?;
        Ok(image.as_slice() == self.host.as_bytes())
    }

    /// Host copy of the FieldGrid, ordered after all queued device work.
    pub fn read_field(&self, dispatcher: &mut Dispatcher) -> Result<Vec<Cell>, StoreError> {
        let mut cells = vec![Cell::ZERO; self.dims.cell_count()];
        dispatcher.download(self.field, 0, bytemuck::cast_slice_mut(&mut cells))?;
        Ok(cells)
    }

    /// Overwrite one FieldGrid cell.
    pub fn write_cell(
        &mut self,
        dispatcher: &mut Dispatcher,
        x: u32,
        y: u32,
        value: Cell,
    ) -> Result<(), StoreError> {
        let index = self
            .dims
            .index(x, y)
            .ok_or_else(|| StoreError::out_of_bounds(x, y, self.dims))?;
        dispatcher.upload(self.field, index * Cell::BYTES, bytemuck::bytes_of(&value))?;
        Ok(())
    }

    /// Overwrite the whole FieldGrid.
    pub fn write_field(
        &mut self,
        dispatcher: &mut Dispatcher,
        cells: &[Cell],
    ) -> Result<(), StoreError> {
        if cells.len() != self.dims.cell_count() {
            return Err(StoreError::LengthMismatch {
                expected: self.dims.cell_count(),
                actual: cells.len(),
            });
        }
        dispatcher.upload(self.field, 0, bytemuck::cast_slice(cells))?;
        Ok(())
    }

    /// Install `next` as the FieldGrid and return the previous buffer.
    pub(crate) fn swap_field(&mut self, next: BufferId) -> BufferId {
        std::mem::replace(&mut self.field, next)
    }

    /// Free the FieldGrid and the device constants, in reverse order of
    /// allocation.
    ///
    /// Both frees are attempted; the first failure is returned.
    pub fn release(mut self, dispatcher: &mut Dispatcher) -> Result<(), StoreError> {
        self.released = true;
        let field = dispatcher.free(self.field);
        let constants = dispatcher.free(self.constants);
        tracing::info!("device state store released");
        field?;
        constants?;
        Ok(())
    }
}

impl Drop for DeviceStateStore {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(
                field = %self.field,
                constants = %self.constants,
                "device state store dropped without release; device buffers leaked"
            );
        }
    }
}

/// Free a buffer while unwinding a failed setup. A second failure is
/// logged; the original error is the one reported.
#[track_caller]
pub(crate) fn free_on_rollback(dispatcher: &mut Dispatcher, buffer: BufferId) {
    if let Err(e) = dispatcher.free(buffer) {
        tracing::warn!(%buffer, error = %e, "free during rollback failed");
    }
}
