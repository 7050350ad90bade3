//! Reusable fields, pixel buffers and devices.

use std::f32::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use swirl_core::{Cell, GridDims, PixelBuffer};
use swirl_device::{HostDevice, HostDeviceConfig};

use crate::tracking::TrackingDevice;

/// A single counter-clockwise vortex centred on the grid, with speed
/// rising linearly towards the rim.
pub fn vortex_field(dims: GridDims) -> Vec<Cell> {
    let (w, h) = (dims.width() as f32, dims.height() as f32);
    let (cx, cy) = ((w - 1.0) / 2.0, (h - 1.0) / 2.0);
    let rim = cx.max(cy).max(1.0);
    (0..dims.height())
        .flat_map(|y| (0..dims.width()).map(move |x| (x as f32 - cx, y as f32 - cy)))
        .map(|(dx, dy)| Cell::new(-dy, dx) * (1.0 / rim))
        .collect()
}

/// One unit vector pointing along +x at `(x, y)`, zero elsewhere.
pub fn impulse_field(dims: GridDims, x: u32, y: u32) -> Vec<Cell> {
    let mut cells = vec![Cell::ZERO; dims.cell_count()];
    if let Some(i) = dims.index(x, y) {
        cells[i] = Cell::new(1.0, 0.0);
    }
    cells
}

/// Smooth colour gradient: red across, green down, blue cycling.
pub fn gradient_pixels(width: u32, height: u32) -> PixelBuffer {
    let data = (0..height)
        .flat_map(|y| {
            (0..width).flat_map(move |x| {
                let phase = (x + y) as f32 / (width + height) as f32;
                [
                    (x * 255 / width.max(1)) as u8,
                    (y * 255 / height.max(1)) as u8,
                    (128.0 + 127.0 * (phase * TAU).sin()) as u8,
                ]
            })
        })
        .collect();
    PixelBuffer::new(width, height, data).expect("gradient dimensions are consistent")
}

/// Deterministic RGB noise.
pub fn noise_pixels(width: u32, height: u32, seed: u64) -> PixelBuffer {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let data = (0..width as usize * height as usize * 3)
        .map(|_| rng.gen::<u8>())
        .collect();
    PixelBuffer::new(width, height, data).expect("noise dimensions are consistent")
}

/// A small host device: two workers, 64 MiB.
pub fn host_device() -> HostDevice {
    HostDevice::new(HostDeviceConfig {
        worker_threads: Some(2),
        memory_limit: 64 << 20,
    })
    .expect("host device starts")
}

/// A tracked [`host_device`].
pub fn tracked_host() -> TrackingDevice<HostDevice> {
    TrackingDevice::new(host_device())
}
