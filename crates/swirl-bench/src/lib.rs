//! Benchmark profiles for the Swirl pipeline.
//!
//! - [`reference_profile`]: 256x192 grid, the default momentum rule,
//!   deferred synchronization
//! - [`stress_profile`]: 1024x768 grid with the same pipeline
//! - [`ready_pipeline`]: a host-device pipeline initialized for a profile

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use swirl_core::GridDims;
use swirl_device::{HostDevice, HostDeviceConfig, SyncMode};
use swirl_engine::{InitialField, Pipeline, PipelineConfig};

/// A grid size plus the configuration to run it with.
#[derive(Clone, Debug)]
pub struct Profile {
    /// Simulation grid.
    pub dims: GridDims,
    /// Pipeline configuration.
    pub config: PipelineConfig,
}

fn profile(width: u32, height: u32, seed: u64) -> Profile {
    Profile {
        dims: GridDims::new(width, height).unwrap(),
        config: PipelineConfig {
            sync: SyncMode::Deferred,
            initial: InitialField::Noise {
                seed,
                amplitude: 1.0,
            },
            ..PipelineConfig::default()
        },
    }
}

/// Reference profile: 256x192 grid (~49K cells).
pub fn reference_profile(seed: u64) -> Profile {
    profile(256, 192, seed)
}

/// Stress profile: 1024x768 grid (~786K cells).
///
/// Same pipeline as [`reference_profile`] at 16x the cell count.
pub fn stress_profile(seed: u64) -> Profile {
    profile(1024, 768, seed)
}

/// A host-device pipeline initialized for `profile`.
pub fn ready_pipeline(profile: &Profile) -> Pipeline {
    let device = HostDevice::new(HostDeviceConfig::default()).unwrap();
    let mut pipeline = Pipeline::new(Box::new(device), profile.config.clone()).unwrap();
    pipeline
        .initialize(
            i64::from(profile.dims.width()),
            i64::from(profile.dims.height()),
        )
        .unwrap();
    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_are_valid() {
        reference_profile(1).config.validate().unwrap();
        stress_profile(1).config.validate().unwrap();
        assert_eq!(stress_profile(1).dims.cell_count(), 16 * reference_profile(1).dims.cell_count());
    }

    #[test]
    fn reference_pipeline_steps() {
        let mut p = ready_pipeline(&reference_profile(3));
        assert!(!p.step().unwrap().is_empty());
        p.cleanup().unwrap();
    }
}
