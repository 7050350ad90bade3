//! Config builder FFI: populate a pipeline configuration behind an opaque
//! handle.
//!
//! C callers build a config incrementally, then pass the handle to
//! `swirl_pipeline_create`, which consumes it. Setters validate eagerly so
//! the caller learns which value was wrong.

use std::sync::Mutex;

use swirl_core::{GridDims, PixelBuffer, Quality, SlotKey, SlotTable};
use swirl_device::{HostDeviceConfig, SyncMode};
use swirl_engine::{InitialField, PipelineConfig, RuleConfig, TransferKind};

use crate::status::SwirlStatus;
use crate::types::{SwirlSyncMode, SwirlTransfer};

/// Internal config builder accumulated by FFI calls.
#[derive(Clone, Debug, Default)]
pub(crate) struct ConfigBuilder {
    pub pipeline: PipelineConfig,
    pub device: HostDeviceConfig,
}

static CONFIGS: Mutex<SlotTable<ConfigBuilder>> = Mutex::new(SlotTable::new());

pub(crate) fn configs() -> &'static Mutex<SlotTable<ConfigBuilder>> {
    &CONFIGS
}

/// Apply `f` to the builder behind `handle`.
fn with_builder(handle: u64, f: impl FnOnce(&mut ConfigBuilder) -> SwirlStatus) -> i32 {
    let mut table = ffi_lock!(CONFIGS);
    match table.get_mut(SlotKey::from_raw(handle)) {
        Some(builder) => f(builder) as i32,
        None => SwirlStatus::InvalidHandle as i32,
    }
}

// ── FFI functions ───────────────────────────────────────────────

/// Create a config builder holding the defaults. Returns the handle via
/// `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn swirl_config_create(out: *mut u64) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return SwirlStatus::InvalidArgument as i32;
        }
        let handle = ffi_lock!(CONFIGS).insert(ConfigBuilder::default()).to_raw();
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = handle };
        SwirlStatus::Ok as i32
    })
}

/// Destroy a config builder that was never passed to
/// `swirl_pipeline_create`.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_config_destroy(handle: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(CONFIGS).remove(SlotKey::from_raw(handle)) {
            Some(_) => SwirlStatus::Ok as i32,
            None => SwirlStatus::InvalidHandle as i32,
        }
    })
}

/// Set the device synchronization mode (`SwirlSyncMode`).
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_config_set_sync(handle: u64, mode: i32) -> i32 {
    ffi_guard!({
        let sync = match mode {
            x if x == SwirlSyncMode::Strict as i32 => SyncMode::Strict,
            x if x == SwirlSyncMode::Deferred as i32 => SyncMode::Deferred,
            _ => return SwirlStatus::InvalidArgument as i32,
        };
        with_builder(handle, |b| {
            b.pipeline.sync = sync;
            SwirlStatus::Ok
        })
    })
}

/// Set the encoder quality, 1 to 100.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_config_set_quality(handle: u64, quality: i32) -> i32 {
    ffi_guard!({
        let Ok(quality) = Quality::try_from(quality) else {
            return SwirlStatus::InvalidArgument as i32;
        };
        with_builder(handle, |b| {
            b.pipeline.quality = quality;
            SwirlStatus::Ok
        })
    })
}

/// Set the output resolution. Both values must be positive.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_config_set_camera(handle: u64, width: i64, height: i64) -> i32 {
    ffi_guard!({
        let Ok(dims) = GridDims::from_signed(width, height).and_then(PixelBuffer::check_size) else {
            return SwirlStatus::InvalidArgument as i32;
        };
        with_builder(handle, |b| {
            b.pipeline.camera = Some((dims.width(), dims.height()));
            SwirlStatus::Ok
        })
    })
}

/// Select the momentum-transfer rule with `radius` (at least 2) and
/// `dispersion` (in `[-0.25, 0.25]`).
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_config_set_momentum_rule(handle: u64, radius: u32, dispersion: f32) -> i32 {
    ffi_guard!({
        set_rule(handle, RuleConfig::MomentumTransfer { radius, dispersion })
    })
}

/// Select the diffusion rule with `rate` in `(0, 0.25]`.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_config_set_diffusion_rule(handle: u64, rate: f32) -> i32 {
    ffi_guard!({ set_rule(handle, RuleConfig::Diffusion { rate }) })
}

fn set_rule(handle: u64, rule: RuleConfig) -> i32 {
    if rule.build().is_err() {
        return SwirlStatus::ConfigError as i32;
    }
    with_builder(handle, |b| {
        b.pipeline.rule = rule;
        SwirlStatus::Ok
    })
}

/// Select the colour transfer (`SwirlTransfer`).
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_config_set_transfer(handle: u64, transfer: i32) -> i32 {
    ffi_guard!({
        let kind = match transfer {
            x if x == SwirlTransfer::DirectionHue as i32 => TransferKind::DirectionHue,
            x if x == SwirlTransfer::Magnitude as i32 => TransferKind::Magnitude,
            _ => return SwirlStatus::InvalidArgument as i32,
        };
        with_builder(handle, |b| {
            b.pipeline.transfer = kind;
            SwirlStatus::Ok
        })
    })
}

/// Seed the FieldGrid with uniform noise of the given amplitude instead of
/// zeros. An amplitude of zero restores the zero field.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_config_set_noise(handle: u64, seed: u64, amplitude: f32) -> i32 {
    ffi_guard!({
        if !amplitude.is_finite() || amplitude < 0.0 {
            return SwirlStatus::InvalidArgument as i32;
        }
        with_builder(handle, |b| {
            b.pipeline.initial = if amplitude == 0.0 {
                InitialField::Zero
            } else {
                InitialField::Noise { seed, amplitude }
            };
            SwirlStatus::Ok
        })
    })
}

/// Size the host device: `worker_threads` (0 = one per core) and
/// `memory_limit` in bytes (0 = default).
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_config_set_device(handle: u64, worker_threads: u32, memory_limit: u64) -> i32 {
    ffi_guard!({
        let Ok(memory_limit) = usize::try_from(memory_limit) else {
            return SwirlStatus::InvalidArgument as i32;
        };
        with_builder(handle, |b| {
            b.device.worker_threads = (worker_threads > 0).then_some(worker_threads as usize);
            if memory_limit > 0 {
                b.device.memory_limit = memory_limit;
            }
            SwirlStatus::Ok
        })
    })
}
