//! Per-step timing for the pipeline.

use swirl_core::TickId;

/// Timing and size of the most recent successful step.
///
/// Durations are wall-clock microseconds measured on the host. Under
/// deferred synchronization device time is attributed to whichever phase
/// first waits on the device, normally `simulate_us` (the barrier before
/// rasterization).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepMetrics {
    /// Tick reached by the step.
    pub tick: TickId,
    /// Enqueue plus completion of the simulation advance.
    pub simulate_us: u64,
    /// Field readback and rasterization.
    pub rasterize_us: u64,
    /// Frame compression.
    pub encode_us: u64,
    /// Whole step.
    pub total_us: u64,
    /// Size of the encoded frame in bytes.
    pub frame_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StepMetrics::default();
        assert_eq!(m.tick, TickId(0));
        assert_eq!(m.total_us, 0);
        assert_eq!(m.frame_bytes, 0);
    }
}
