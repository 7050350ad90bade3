//! Device kernels launched by the simulation engine.

use std::sync::Arc;

use rayon::prelude::*;
use swirl_core::{Cell, SimulationConstants};
use swirl_device::{BufferId, DeviceError, DeviceMemory, Kernel};

use crate::rule::UpdateRule;

/// One tick of an [`UpdateRule`]: reads `src` and `forcing`, writes `dst`.
///
/// `dst` is checked out for the whole pass, so no reader can observe a
/// partially advanced grid. Rows are distributed over the device's worker
/// pool.
pub struct AdvanceKernel {
    /// Rule evaluated per cell.
    pub rule: Arc<dyn UpdateRule>,
    /// Device copy of the simulation constants.
    pub constants: BufferId,
    /// Current FieldGrid.
    pub src: BufferId,
    /// Forcing grid.
    pub forcing: BufferId,
    /// Next FieldGrid.
    pub dst: BufferId,
}

impl AdvanceKernel {
    fn fault(reason: impl Into<String>) -> DeviceError {
        DeviceError::KernelFault {
            kernel: "advance",
            reason: reason.into(),
        }
    }
}

impl Kernel for AdvanceKernel {
    fn name(&self) -> &'static str {
        "advance"
    }

    fn bindings(&self) -> Vec<BufferId> {
        vec![self.constants, self.src, self.forcing, self.dst]
    }

    fn run(&self, memory: &mut DeviceMemory) -> Result<(), DeviceError> {
        let rule = self.rule.as_ref();
        memory.with_output(self.dst, |out, mem| {
            let constants = SimulationConstants::from_bytes(mem.bytes(self.constants)?)
                .ok_or_else(|| Self::fault("constants buffer has the wrong size"))?;
            let cells = constants.cell_count();
            let field = mem.view::<Cell>(self.src)?;
            let forcing = mem.view::<Cell>(self.forcing)?;
            let out: &mut [Cell] =
                bytemuck::try_cast_slice_mut(out).map_err(|_| DeviceError::TypeMismatch {
                    buffer: self.dst,
                    size: cells * Cell::BYTES,
                    elem: Cell::BYTES,
                })?;
            if cells == 0 || field.len() != cells || forcing.len() != cells || out.len() != cells {
                return Err(Self::fault(format!(
                    "grid {}x{} does not match bound buffers ({}, {}, {} cells)",
                    constants.width,
                    constants.height,
                    field.len(),
                    forcing.len(),
                    out.len()
                )));
            }
            out.par_chunks_mut(constants.width as usize)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, cell) in row.iter_mut().enumerate() {
                        *cell = rule.advance_cell(&constants, field, forcing, x as u32, y as u32);
                    }
                });
            Ok(())
        })
    }
}
