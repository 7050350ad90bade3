//! The Rasterizer.

use rayon::prelude::*;
use swirl_core::{Cell, PixelBuffer, SimulationConstants};

use crate::camera::Camera;
use crate::error::RasterError;
use crate::transfer::{ColorTransfer, FieldStats};

/// Grid coordinate sampled by output coordinate `p` when `output` pixels
/// cover `grid` cells: `⌊p · grid / output⌋`.
///
/// Integer arithmetic keeps resampling exact; with `output == grid` this
/// is the identity.
pub fn resample(p: u32, output: u32, grid: u32) -> u32 {
    (p as u64 * grid as u64 / output.max(1) as u64) as u32
}

/// Turns a FieldGrid snapshot into an RGB frame at the camera resolution.
#[derive(Debug)]
pub struct Rasterizer {
    camera: Camera,
    transfer: Box<dyn ColorTransfer>,
}

impl Rasterizer {
    /// Rasterizer with the given camera and colour policy.
    pub fn new(camera: Camera, transfer: Box<dyn ColorTransfer>) -> Self {
        Self { camera, transfer }
    }

    /// Current camera.
    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Name of the colour policy.
    pub fn transfer_name(&self) -> &'static str {
        self.transfer.name()
    }

    /// Change output resolution and quality. On error the previous camera
    /// stays in effect.
    pub fn update_camera(&mut self, width: i64, height: i64, quality: i64) -> Result<(), RasterError> {
        self.camera = Camera::new(width, height, quality)?;
        tracing::debug!(width, height, quality, "camera updated");
        Ok(())
    }

    /// Install a validated camera.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Draw `cells` (row-major, `constants.width × constants.height`) into
    /// a fresh pixel buffer.
    pub fn draw(
        &self,
        cells: &[Cell],
        constants: &SimulationConstants,
    ) -> Result<PixelBuffer, RasterError> {
        let expected = constants.cell_count();
        if expected == 0 || cells.len() != expected {
            return Err(RasterError::FieldSizeMismatch {
                expected,
                actual: cells.len(),
            });
        }
        let (grid_w, grid_h) = (constants.width, constants.height);
        let (out_w, out_h) = (self.camera.width(), self.camera.height());
        let stats = FieldStats::measure(cells);
        let transfer = self.transfer.as_ref();

        let mut data = vec![0u8; out_w as usize * out_h as usize * PixelBuffer::CHANNELS];
        data.par_chunks_mut(out_w as usize * PixelBuffer::CHANNELS)
            .enumerate()
            .for_each(|(py, row)| {
                let gy = resample(py as u32, out_h, grid_h) as usize;
                let grid_row = &cells[gy * grid_w as usize..(gy + 1) * grid_w as usize];
                for (px, rgb) in row.chunks_exact_mut(PixelBuffer::CHANNELS).enumerate() {
                    let gx = resample(px as u32, out_w, grid_w) as usize;
                    rgb.copy_from_slice(&transfer.color(grid_row[gx], &stats));
                }
            });
        Ok(PixelBuffer::new(out_w, out_h, data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{DirectionHue, Magnitude};
    use proptest::prelude::*;
    use swirl_core::{GridDims, Quality};

    fn constants(w: u32, h: u32) -> SimulationConstants {
        SimulationConstants::new(GridDims::new(w, h).unwrap())
    }

    fn camera(w: u32, h: u32) -> Camera {
        Camera::with(GridDims::new(w, h).unwrap(), Quality::DEFAULT)
    }

    #[test]
    fn zero_field_draws_black() {
        let r = Rasterizer::new(camera(8, 6), Box::new(DirectionHue));
        let px = r.draw(&[Cell::ZERO; 48], &constants(8, 6)).unwrap();
        assert_eq!(px.as_bytes().len(), 8 * 6 * 3);
        assert!(px.as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let r = Rasterizer::new(camera(4, 4), Box::new(Magnitude));
        assert_eq!(
            r.draw(&[Cell::ZERO; 15], &constants(4, 4)),
            Err(RasterError::FieldSizeMismatch { expected: 16, actual: 15 })
        );
    }

    #[test]
    fn upscaling_replicates_cells() {
        let r = Rasterizer::new(camera(4, 2), Box::new(Magnitude));
        let cells = [Cell::ZERO, Cell::new(1.0, 0.0)];
        let px = r.draw(&cells, &constants(2, 1)).unwrap();
        assert_eq!(px.pixel(0, 0), Some([0, 0, 0]));
        assert_eq!(px.pixel(1, 1), Some([0, 0, 0]));
        assert_eq!(px.pixel(2, 0), Some([255, 255, 255]));
        assert_eq!(px.pixel(3, 1), Some([255, 255, 255]));
    }

    #[test]
    fn camera_update_is_atomic() {
        let mut r = Rasterizer::new(camera(4, 4), Box::new(Magnitude));
        r.update_camera(16, 9, 50).unwrap();
        assert_eq!((r.camera().width(), r.camera().height()), (16, 9));
        assert!(r.update_camera(16, 9, 0).is_err());
        assert_eq!(r.camera().quality().get(), 50);
    }

    proptest! {
        #[test]
        fn resample_stays_in_grid(out in 1u32..2048, grid in 1u32..2048, frac in 0.0f64..1.0) {
            let p = ((out as f64 * frac) as u32).min(out - 1);
            prop_assert!(resample(p, out, grid) < grid);
            let q = p.min(grid - 1);
            prop_assert_eq!(resample(q, grid, grid), q);
        }

        #[test]
        fn drawing_is_deterministic(
            values in proptest::collection::vec((-4.0f32..4.0, -4.0f32..4.0), 12),
            w in 1u32..24,
            h in 1u32..24,
        ) {
            let cells: Vec<Cell> = values.iter().map(|&(x, y)| Cell::new(x, y)).collect();
            let r = Rasterizer::new(camera(w, h), Box::new(DirectionHue));
            let a = r.draw(&cells, &constants(4, 3)).unwrap();
            let b = r.draw(&cells, &constants(4, 3)).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
