//! Tick-invariant simulation constants shared by host and device.

use bytemuck::{Pod, Zeroable};

use crate::dims::GridDims;
use crate::error::DimsError;

/// Constants read by every simulation kernel.
///
/// Exists twice per pipeline: a host copy owned by the state store and a
/// device copy the kernels read. The layout is `repr(C)`, padding-free and
/// a multiple of 16 bytes so the device copy is a plain byte image of the host copy.
/// Rule parameters a given update rule does not use are left at zero.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SimulationConstants {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Neighbourhood radius of the momentum-transfer rule.
    pub radius: u32,
    _pad0: u32,
    /// Normalisation applied to transferred magnitude.
    pub scaling_factor: f32,
    /// Angular spread coefficient of the momentum-transfer rule.
    pub dispersion: f32,
    /// Neighbour exchange rate of the diffusion rule.
    pub diffusion_rate: f32,
    _pad1: f32,
}

impl SimulationConstants {
    /// Size of the device copy in bytes.
    pub const BYTES: usize = std::mem::size_of::<SimulationConstants>();

    /// Constants for a grid with all rule parameters zeroed.
    pub fn new(dims: GridDims) -> Self {
        Self {
            width: dims.width(),
            height: dims.height(),
            ..Self::default()
        }
    }

    /// Grid dimensions described by these constants.
    pub fn dims(&self) -> Result<GridDims, DimsError> {
        GridDims::new(self.width, self.height)
    }

    /// Number of cells described by `width * height`.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Byte image of these constants, as uploaded to the device.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Decode constants from a device byte image.
    ///
    /// Returns `None` if `bytes` is not exactly [`Self::BYTES`] long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytemuck::try_pod_read_unaligned(bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_sixteen_byte_sized() {
        assert_eq!(SimulationConstants::BYTES, 32);
        assert_eq!(SimulationConstants::BYTES % 16, 0);
    }

    #[test]
    fn byte_image_decodes_to_same_constants() {
        let mut c = SimulationConstants::new(GridDims::new(64, 48).unwrap());
        c.radius = 9;
        c.scaling_factor = 0.125;
        c.dispersion = -0.25;
        let decoded = SimulationConstants::from_bytes(c.as_bytes()).unwrap();
        assert_eq!(decoded, c);
        assert_eq!(decoded.dims().unwrap().cell_count(), 64 * 48);
    }

    #[test]
    fn short_byte_image_is_rejected() {
        assert!(SimulationConstants::from_bytes(&[0u8; 12]).is_none());
    }
}
