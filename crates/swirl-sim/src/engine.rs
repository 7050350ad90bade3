//! The Simulation Engine: one tick per [`step`](SimulationEngine::step).
//!
//! The engine owns the ping-pong back buffer and the forcing grid. A step
//! enqueues one [`AdvanceKernel`] from the current FieldGrid into the back
//! buffer and then swaps the two, so the store's FieldGrid always names
//! the buffer holding the newest complete state. Device ordering makes the
//! swap visible to every later device operation; the host never reads the
//! grid without going through the device queue.

use std::sync::Arc;

use swirl_core::{Cell, GridDims, TickId};
use swirl_device::{BufferId, DeviceFault, Dispatcher};

use crate::error::StoreError;
use crate::kernels::AdvanceKernel;
use crate::rule::UpdateRule;
use crate::store::{free_on_rollback, DeviceStateStore};

/// Per-tick advance of a [`DeviceStateStore`].
#[derive(Debug)]
pub struct SimulationEngine {
    rule: Arc<dyn UpdateRule>,
    dims: GridDims,
    back: BufferId,
    forcing: BufferId,
    tick: TickId,
    released: bool,
}

impl SimulationEngine {
    /// Allocate the back buffer and a zeroed forcing grid sized like the
    /// store's FieldGrid.
    pub fn new(
        dispatcher: &mut Dispatcher,
        store: &DeviceStateStore,
        rule: Arc<dyn UpdateRule>,
    ) -> Result<Self, StoreError> {
        let dims = store.dims();
        let bytes = dims.cell_count() * Cell::BYTES;
        let back = dispatcher.alloc_zeroed(bytes)?;
        let forcing = match dispatcher.alloc_zeroed(bytes) {
            Ok(buffer) => buffer,
            Err(e) => {
                free_on_rollback(dispatcher, back);
                return Err(e.into());
            }
        };
        tracing::debug!(rule = rule.name(), "simulation engine ready");
        Ok(Self {
            rule,
            dims,
            back,
            forcing,
            tick: TickId::default(),
            released: false,
        })
    }

    /// Advance the FieldGrid by one tick.
    ///
    /// Returns once the advance is enqueued (and, under strict
    /// synchronization, completed). Readers must go through a barrier or a
    /// device download, both of which are ordered after the advance.
    pub fn step(
        &mut self,
        dispatcher: &mut Dispatcher,
        store: &mut DeviceStateStore,
    ) -> Result<TickId, DeviceFault> {
        dispatcher.launch(Box::new(AdvanceKernel {
            rule: Arc::clone(&self.rule),
            constants: store.constants_buffer(),
            src: store.field_buffer(),
            forcing: self.forcing,
            dst: self.back,
        }))?;
        self.back = store.swap_field(self.back);
        self.tick = self.tick.next();
        tracing::trace!(tick = %self.tick, "simulation advanced");
        Ok(self.tick)
    }

    /// Ticks completed since construction.
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// The active update rule.
    pub fn rule(&self) -> &dyn UpdateRule {
        self.rule.as_ref()
    }

    /// Set one cell of the forcing grid.
    pub fn set_forcing(
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
        dispatcher.upload(self.forcing, index * Cell::BYTES, bytemuck::bytes_of(&value))?;
        Ok(())
    }

    /// Zero the forcing grid.
    pub fn clear_forcing(&mut self, dispatcher: &mut Dispatcher) -> Result<(), StoreError> {
        let zeros = vec![Cell::ZERO; self.dims.cell_count()];
        dispatcher.upload(self.forcing, 0, bytemuck::cast_slice(&zeros))?;
        Ok(())
    }

    /// Free the forcing grid and the back buffer.
    pub fn release(mut self, dispatcher: &mut Dispatcher) -> Result<(), StoreError> {
        self.released = true;
        let forcing = dispatcher.free(self.forcing);
        let back = dispatcher.free(self.back);
        tracing::debug!(ticks = self.tick.0, "simulation engine released");
        forcing?;
        back?;
        Ok(())
    }
}

impl Drop for SimulationEngine {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!(
                back = %self.back,
                forcing = %self.forcing,
                "simulation engine dropped without release; device buffers leaked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Diffusion, MomentumTransfer};
    use swirl_device::{HostDevice, HostDeviceConfig, SyncMode};

    fn dispatcher(mode: SyncMode) -> Dispatcher {
        let device = HostDevice::new(HostDeviceConfig {
            worker_threads: Some(2),
            memory_limit: 1 << 20,
        })
        .unwrap();
        Dispatcher::new(Box::new(device), mode)
    }

    #[test]
    fn step_advances_tick_and_swaps_field() {
        let mut d = dispatcher(SyncMode::Deferred);
        let dims = GridDims::new(8, 8).unwrap();
        let rule = Arc::new(Diffusion::new(0.25).unwrap());
        let mut store = DeviceStateStore::initialize(&mut d, dims, rule.as_ref()).unwrap();
        let mut engine = SimulationEngine::new(&mut d, &store, rule).unwrap();
        let before = store.field_buffer();
        assert_eq!(engine.step(&mut d, &mut store).unwrap(), TickId(1));
        assert_ne!(store.field_buffer(), before);
        engine.step(&mut d, &mut store).unwrap();
        assert_eq!(store.field_buffer(), before);
        assert_eq!(engine.tick(), TickId(2));
        engine.release(&mut d).unwrap();
        store.release(&mut d).unwrap();
    }

    #[test]
    fn forcing_feeds_the_next_tick() {
        let mut d = dispatcher(SyncMode::Strict);
        let dims = GridDims::new(4, 4).unwrap();
        let rule = Arc::new(Diffusion::new(0.1).unwrap());
        let mut store = DeviceStateStore::initialize(&mut d, dims, rule.as_ref()).unwrap();
        let mut engine = SimulationEngine::new(&mut d, &store, rule).unwrap();
        engine.set_forcing(&mut d, 2, 1, Cell::new(0.0, 1.0)).unwrap();
        engine.step(&mut d, &mut store).unwrap();
        assert_eq!(store.read_field(&mut d).unwrap()[6], Cell::new(0.0, 1.0));
        engine.clear_forcing(&mut d).unwrap();
        assert!(matches!(
            engine.set_forcing(&mut d, 0, 9, Cell::ZERO),
            Err(StoreError::OutOfBounds { .. })
        ));
        engine.release(&mut d).unwrap();
        store.release(&mut d).unwrap();
    }

    #[test]
    fn momentum_travels_with_the_flow() {
        let mut d = dispatcher(SyncMode::Deferred);
        let dims = GridDims::new(32, 32).unwrap();
        let rule = Arc::new(MomentumTransfer::new(4, -0.25).unwrap());
        let mut store = DeviceStateStore::initialize(&mut d, dims, rule.as_ref()).unwrap();
        let mut engine = SimulationEngine::new(&mut d, &store, rule).unwrap();
        store.write_cell(&mut d, 10, 16, Cell::new(1.0, 0.0)).unwrap();
        for _ in 0..3 {
            engine.step(&mut d, &mut store).unwrap();
        }
        d.barrier().unwrap();
        let field = store.read_field(&mut d).unwrap();
        let total: f32 = field.iter().map(|c| c.magnitude()).sum();
        assert!((total - 1.0).abs() < 1e-2, "total magnitude {total}");
        let centroid: f32 = field
            .iter()
            .enumerate()
            .map(|(i, c)| (i % 32) as f32 * c.magnitude())
            .sum::<f32>()
            / total;
        assert!(centroid > 10.0, "centroid {centroid}");
        engine.release(&mut d).unwrap();
        store.release(&mut d).unwrap();
    }
}
