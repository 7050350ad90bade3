//! C-compatible enums and structs.
//!
//! Enums cross the boundary as plain `i32` and are matched against these
//! discriminants, so an out-of-range value from C is rejected rather than
//! becoming an invalid Rust enum.

use swirl_engine::{LifecycleState, StepMetrics};

/// Device fault-detection discipline for `swirl_config_set_sync`.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwirlSyncMode {
    /// Wait for the device after every dispatch.
    Strict = 0,
    /// Poll launch status only; execution faults surface at the next
    /// barrier.
    Deferred = 1,
}

/// Colour transfer for `swirl_config_set_transfer`.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwirlTransfer {
    /// Direction as hue, magnitude as brightness.
    DirectionHue = 0,
    /// Magnitude as grey level.
    Magnitude = 1,
}

/// Lifecycle state reported by `swirl_pipeline_state_get`.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwirlLifecycleState {
    /// Created, not yet initialized.
    Uninitialized = 0,
    /// Initialized; `step` is valid.
    Ready = 1,
    /// Faulted; only cleanup is valid.
    Faulted = 2,
    /// Cleaned up.
    Released = 3,
}

impl From<LifecycleState> for SwirlLifecycleState {
    fn from(s: LifecycleState) -> Self {
        match s {
            LifecycleState::Uninitialized => Self::Uninitialized,
            LifecycleState::Ready => Self::Ready,
            LifecycleState::Faulted => Self::Faulted,
            LifecycleState::Released => Self::Released,
        }
    }
}

/// C-compatible timing of the most recent successful step.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SwirlStepMetrics {
    /// Tick reached by the step.
    pub tick: u64,
    /// Simulation advance, in microseconds.
    pub simulate_us: u64,
    /// Readback and rasterization, in microseconds.
    pub rasterize_us: u64,
    /// Compression, in microseconds.
    pub encode_us: u64,
    /// Whole step, in microseconds.
    pub total_us: u64,
    /// Encoded frame size in bytes.
    /// Fixed-width `u64` for ABI portability (not `usize`).
    pub frame_bytes: u64,
}

impl SwirlStepMetrics {
    pub(crate) fn from_rust(m: &StepMetrics) -> Self {
        Self {
            tick: m.tick.0,
            simulate_us: m.simulate_us,
            rasterize_us: m.rasterize_us,
            encode_us: m.encode_us,
            total_us: m.total_us,
            frame_bytes: m.frame_bytes as u64,
        }
    }
}
