//! The Pipeline façade.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --initialize--> Ready --step--> Ready
//!       |                         |  \
//!       |                  fault  |   `--cleanup--> Released
//!       `--failed initialize--> Faulted --cleanup--> Released
//! ```
//!
//! `step` is valid only in `Ready`. Any device, raster or codec fault moves
//! the pipeline to `Faulted`, where every call but `cleanup` is rejected.
//! `Released` is terminal. Calls in the wrong state return
//! [`PipelineError::Lifecycle`] (or [`PipelineError::Faulted`] once
//! faulted) and change nothing.
//!
//! # Ordering
//!
//! A step enqueues the simulation advance, then waits on a device barrier
//! before reading the FieldGrid back for rasterization. The barrier is
//! independent of the configured [`SyncMode`], so the rasterizer never sees
//! a grid the device has not finished writing.

use std::time::Instant;

use swirl_codec::{EncodedFrame, FrameEncoder, ImageCodec, JpegCodec};
use swirl_core::{Cell, GridDims, TickId};
use swirl_device::{ComputeDevice, Dispatcher, SyncMode};
use swirl_raster::{Camera, Rasterizer};
use swirl_sim::{noise_field, DeviceStateStore, SimulationEngine, StoreError};

use crate::config::{InitialField, PipelineConfig};
use crate::error::{LifecycleState, PipelineError};
use crate::metrics::StepMetrics;

struct Resources {
    store: DeviceStateStore,
    engine: SimulationEngine,
    rasterizer: Rasterizer,
}

impl Resources {
    fn acquire(
        dispatcher: &mut Dispatcher,
        config: &PipelineConfig,
        dims: GridDims,
    ) -> Result<Self, PipelineError> {
        let rule = config.rule.build()?;
        let camera = Camera::with(config.camera_dims(dims)?, config.quality);

        let mut store = DeviceStateStore::initialize(dispatcher, dims, rule.as_ref())?;
        let engine = match SimulationEngine::new(dispatcher, &store, rule) {
            Ok(engine) => engine,
            Err(e) => {
                warn_on_rollback("state store", store.release(dispatcher));
                return Err(e.into());
            }
        };
        if let InitialField::Noise { seed, amplitude } = config.initial {
            if let Err(e) = store.write_field(dispatcher, &noise_field(dims, seed, amplitude)) {
                warn_on_rollback("simulation engine", engine.release(dispatcher));
                warn_on_rollback("state store", store.release(dispatcher));
                return Err(e.into());
            }
        }
        Ok(Self {
            store,
            engine,
            rasterizer: Rasterizer::new(camera, config.transfer.build()),
        })
    }

    /// Release in reverse order of acquisition. Both releases are
    /// attempted; the first failure is returned.
    fn release(self, dispatcher: &mut Dispatcher) -> Result<(), PipelineError> {
        let engine = self.engine.release(dispatcher);
        let store = self.store.release(dispatcher);
        engine?;
        store?;
        Ok(())
    }

    fn tick(
        &mut self,
        dispatcher: &mut Dispatcher,
        encoder: &mut FrameEncoder,
    ) -> Result<StepMetrics, PipelineError> {
        let start = Instant::now();
        let tick = self.engine.step(dispatcher, &mut self.store)?;
        dispatcher.barrier()?;
        let simulated = Instant::now();

        let cells = self.store.read_field(dispatcher)?;
        let pixels = self.rasterizer.draw(&cells, self.store.constants())?;
        let rasterized = Instant::now();

        let frame_bytes = encoder
            .encode(&pixels, self.rasterizer.camera().quality())?
            .len();
        let encoded = Instant::now();

        Ok(StepMetrics {
            tick,
            simulate_us: micros(simulated - start),
            rasterize_us: micros(rasterized - simulated),
            encode_us: micros(encoded - rasterized),
            total_us: micros(encoded - start),
            frame_bytes,
        })
    }
}

fn warn_on_rollback(what: &'static str, result: Result<(), StoreError>) {
    if let Err(e) = result {
        tracing::warn!(what, error = %e, "release during rollback failed");
    }
}

fn micros(d: std::time::Duration) -> u64 {
    d.as_micros().try_into().unwrap_or(u64::MAX)
}

enum Stage {
    Uninitialized,
    Ready(Box<Resources>),
    Faulted(Option<Box<Resources>>),
    Released,
}

impl Stage {
    fn state(&self) -> LifecycleState {
        match self {
            Self::Uninitialized => LifecycleState::Uninitialized,
            Self::Ready(_) => LifecycleState::Ready,
            Self::Faulted(_) => LifecycleState::Faulted,
            Self::Released => LifecycleState::Released,
        }
    }
}

/// One simulate → rasterize → encode pipeline bound to one device.
///
/// # Example
///
/// ```ignore
/// let device = HostDevice::new(HostDeviceConfig::default())?;
/// let mut pipeline = Pipeline::new(Box::new(device), PipelineConfig::default())?;
/// pipeline.initialize(64, 48)?;
/// let frame = pipeline.step()?;
/// send(frame.as_bytes());
/// pipeline.cleanup()?;
/// ```
pub struct Pipeline {
    dispatcher: Dispatcher,
    config: PipelineConfig,
    encoder: FrameEncoder,
    stage: Stage,
    last_tick: TickId,
    last_metrics: StepMetrics,
}

// Pipelines move into the FFI handle table and across host threads.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Pipeline>();
    }
};

impl Pipeline {
    /// Validate `config` and bind a pipeline to `device`, encoding frames as
    /// JPEG. Nothing is allocated on the device until
    /// [`initialize`](Pipeline::initialize).
    pub fn new(device: Box<dyn ComputeDevice>, config: PipelineConfig) -> Result<Self, PipelineError> {
        Self::with_codec(device, Box::new(JpegCodec), config)
    }

    /// Like [`new`](Pipeline::new) with a caller-supplied codec.
    pub fn with_codec(
        device: Box<dyn ComputeDevice>,
        codec: Box<dyn ImageCodec>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            dispatcher: Dispatcher::new(device, config.sync),
            config,
            encoder: FrameEncoder::new(codec),
            stage: Stage::Uninitialized,
            last_tick: TickId::default(),
            last_metrics: StepMetrics::default(),
        })
    }

    fn lifecycle(&self, op: &'static str) -> PipelineError {
        match self.stage {
            Stage::Faulted(_) => PipelineError::Faulted { op },
            ref other => PipelineError::Lifecycle {
                op,
                state: other.state(),
            },
        }
    }

    /// Enter `Faulted`, keeping whatever was allocated for cleanup.
    fn fault(&mut self, op: &'static str, err: PipelineError) -> PipelineError {
        tracing::error!(op, error = %err, "pipeline faulted");
        self.encoder.release();
        self.stage = match std::mem::replace(&mut self.stage, Stage::Released) {
            Stage::Ready(r) => Stage::Faulted(Some(r)),
            Stage::Uninitialized => Stage::Faulted(None),
            other => other,
        };
        err
    }

    /// Fault on device, raster or codec errors; pass others through.
    fn observe(&mut self, op: &'static str, err: PipelineError) -> PipelineError {
        if err.is_fatal() {
            self.fault(op, err)
        } else {
            err
        }
    }

    /// Allocate the FieldGrid (`width × height`), mirror the constants and
    /// prepare rasterizer and encoder. Valid only once, from
    /// `Uninitialized`.
    ///
    /// Invalid dimensions are rejected without a state change. A device
    /// fault leaves the pipeline `Faulted` with nothing allocated.
    pub fn initialize(&mut self, width: i64, height: i64) -> Result<(), PipelineError> {
        if !matches!(self.stage, Stage::Uninitialized) {
            return Err(self.lifecycle("initialize"));
        }
        let dims = GridDims::from_signed(width, height)?;
        match Resources::acquire(&mut self.dispatcher, &self.config, dims) {
            Ok(resources) => {
                tracing::info!(
                    width = dims.width(),
                    height = dims.height(),
                    device = self.dispatcher.device_name(),
                    sync = %self.dispatcher.mode(),
                    quality = self.config.quality.get(),
                    transfer = resources.rasterizer.transfer_name(),
                    codec = self.encoder.codec_name(),
                    "pipeline initialized"
                );
                self.stage = Stage::Ready(Box::new(resources));
                Ok(())
            }
            Err(e) => Err(self.observe("initialize", e)),
        }
    }

    /// Run one tick: advance, rasterize, encode.
    ///
    /// The returned frame is owned by the pipeline and stays valid until
    /// the next `step` or `cleanup`; the previous frame is released first.
    pub fn step(&mut self) -> Result<&EncodedFrame, PipelineError> {
        let Stage::Ready(resources) = &mut self.stage else {
            return Err(self.lifecycle("step"));
        };
        match resources.tick(&mut self.dispatcher, &mut self.encoder) {
            Ok(metrics) => {
                tracing::debug!(
                    tick = %metrics.tick,
                    bytes = metrics.frame_bytes,
                    total_us = metrics.total_us,
                    "step complete"
                );
                self.last_tick = metrics.tick;
                self.last_metrics = metrics;
            }
            // Every step failure leaves the FieldGrid or frame untrustworthy.
            Err(e) => return Err(self.fault("step", e)),
        }
        self.encoder
            .current()
            .ok_or(PipelineError::Faulted { op: "step" })
    }

    /// Release every device and host resource, in reverse order of
    /// acquisition. Valid from `Ready` and `Faulted`; always ends in
    /// `Released`.
    ///
    /// From `Faulted` the release is best effort and release errors are
    /// only logged.
    pub fn cleanup(&mut self) -> Result<(), PipelineError> {
        let faulted = match self.stage {
            Stage::Ready(_) => false,
            Stage::Faulted(_) => true,
            _ => return Err(self.lifecycle("cleanup")),
        };
        self.encoder.release();
        let resources = match std::mem::replace(&mut self.stage, Stage::Released) {
            Stage::Ready(r) | Stage::Faulted(Some(r)) => Some(r),
            _ => None,
        };
        let mut result = match resources {
            Some(r) => (*r).release(&mut self.dispatcher),
            None => Ok(()),
        };
        if result.is_ok() {
            result = self.dispatcher.barrier().map_err(PipelineError::from);
        }
        tracing::info!(ticks = self.last_tick.0, "pipeline released");
        match result {
            Err(e) if faulted => {
                tracing::warn!(error = %e, "release after fault was incomplete");
                Ok(())
            }
            other => other,
        }
    }

    /// Change output resolution and quality for subsequent steps.
    ///
    /// Before initialization the values replace the configured camera.
    /// Invalid values are rejected and the previous camera stays in effect.
    pub fn update_camera(&mut self, width: i64, height: i64, quality: i64) -> Result<(), PipelineError> {
        match &mut self.stage {
            Stage::Ready(r) => {
                r.rasterizer.update_camera(width, height, quality)?;
                Ok(())
            }
            Stage::Uninitialized => {
                let camera = Camera::new(width, height, quality)?;
                self.config.camera = Some((camera.width(), camera.height()));
                self.config.quality = camera.quality();
                Ok(())
            }
            _ => Err(self.lifecycle("update_camera")),
        }
    }

    /// Rewrite the grid size in the simulation constants. The grid cannot
    /// be resized: only the allocated size is accepted.
    pub fn update_constants(&mut self, width: u32, height: u32) -> Result<(), PipelineError> {
        let Stage::Ready(r) = &mut self.stage else {
            return Err(self.lifecycle("update_constants"));
        };
        let result = r.store.update_constants(&mut self.dispatcher, width, height);
        result.map_err(|e| self.observe("update_constants", e.into()))
    }

    /// Set one cell of the forcing grid, applied on every following tick.
    pub fn stir(&mut self, x: u32, y: u32, force: Cell) -> Result<(), PipelineError> {
        let Stage::Ready(r) = &mut self.stage else {
            return Err(self.lifecycle("stir"));
        };
        let result = r.engine.set_forcing(&mut self.dispatcher, x, y, force);
        result.map_err(|e| self.observe("stir", e.into()))
    }

    /// Zero the forcing grid.
    pub fn clear_forcing(&mut self) -> Result<(), PipelineError> {
        let Stage::Ready(r) = &mut self.stage else {
            return Err(self.lifecycle("clear_forcing"));
        };
        let result = r.engine.clear_forcing(&mut self.dispatcher);
        result.map_err(|e| self.observe("clear_forcing", e.into()))
    }

    /// Overwrite one FieldGrid cell.
    pub fn inject(&mut self, x: u32, y: u32, value: Cell) -> Result<(), PipelineError> {
        let Stage::Ready(r) = &mut self.stage else {
            return Err(self.lifecycle("inject"));
        };
        let result = r.store.write_cell(&mut self.dispatcher, x, y, value);
        result.map_err(|e| self.observe("inject", e.into()))
    }

    /// Host copy of the current FieldGrid, taken after a device barrier.
    pub fn snapshot_field(&mut self) -> Result<Vec<Cell>, PipelineError> {
        let Stage::Ready(r) = &mut self.stage else {
            return Err(self.lifecycle("snapshot_field"));
        };
        let result = match self.dispatcher.barrier() {
            Ok(()) => r.store.read_field(&mut self.dispatcher).map_err(PipelineError::from),
            Err(fault) => Err(fault.into()),
        };
        result.map_err(|e| self.observe("snapshot_field", e))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.stage.state()
    }

    /// Ticks completed so far.
    pub fn tick(&self) -> TickId {
        match &self.stage {
            Stage::Ready(r) | Stage::Faulted(Some(r)) => r.engine.tick(),
            _ => self.last_tick,
        }
    }

    /// Grid dimensions, once initialized.
    pub fn dims(&self) -> Option<GridDims> {
        match &self.stage {
            Stage::Ready(r) | Stage::Faulted(Some(r)) => Some(r.store.dims()),
            _ => None,
        }
    }

    /// Active camera, once initialized.
    pub fn camera(&self) -> Option<Camera> {
        match &self.stage {
            Stage::Ready(r) => Some(r.rasterizer.camera()),
            _ => None,
        }
    }

    /// Metrics of the last successful step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// The frame returned by the last successful step, if still held.
    pub fn current_frame(&self) -> Option<&EncodedFrame> {
        self.encoder.current()
    }

    /// Active synchronization mode.
    pub fn sync_mode(&self) -> SyncMode {
        self.dispatcher.mode()
    }

    /// Configuration the pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if matches!(self.stage, Stage::Ready(_) | Stage::Faulted(Some(_))) {
            tracing::warn!(state = %self.state(), "pipeline dropped without cleanup; releasing");
            if let Err(e) = self.cleanup() {
                tracing::error!(error = %e, "cleanup on drop failed");
            }
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &self.state())
            .field("tick", &self.tick())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
