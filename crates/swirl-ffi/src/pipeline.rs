//! Pipeline handle FFI: create, initialize, step, cleanup, destroy.
//!
//! Uses per-pipeline `Arc<Mutex<Pipeline>>` so the global `PIPELINES`
//! table lock is only held for handle lookup. Different pipelines can be
//! stepped concurrently from different host threads.

use std::sync::{Arc, Mutex};

use swirl_core::{Cell, SlotKey, SlotTable};
use swirl_device::HostDevice;
use swirl_engine::Pipeline;

use crate::config::configs;
use crate::status::SwirlStatus;
use crate::types::{SwirlLifecycleState, SwirlStepMetrics};

type PipelineArc = Arc<Mutex<Pipeline>>;

static PIPELINES: Mutex<SlotTable<PipelineArc>> = Mutex::new(SlotTable::new());

/// Clone the Arc for a pipeline handle, briefly locking the global table.
///
/// Returns `None` if the handle is invalid or the mutex is poisoned.
fn get_pipeline(handle: u64) -> Option<PipelineArc> {
    PIPELINES
        .lock()
        .ok()?
        .get(SlotKey::from_raw(handle))
        .cloned()
}

/// Create a pipeline from a config handle. Consumes the config.
///
/// On success, writes the pipeline handle to `out` and returns `SWIRL_OK`.
/// On failure the config is still consumed.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn swirl_pipeline_create(config_handle: u64, out: *mut u64) -> i32 {
    ffi_guard!({
        // Consume first so the config is gone on every return path.
        let builder = match ffi_lock!(configs()).remove(SlotKey::from_raw(config_handle)) {
            Some(b) => b,
            None => return SwirlStatus::InvalidHandle as i32,
        };
        if out.is_null() {
            return SwirlStatus::InvalidArgument as i32;
        }

        let device = match HostDevice::new(builder.device) {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(error = %e, "host device failed to start");
                return SwirlStatus::DeviceFault as i32;
            }
        };
        let pipeline = match Pipeline::new(Box::new(device), builder.pipeline) {
            Ok(p) => p,
            Err(e) => return SwirlStatus::from(&e) as i32,
        };

        let handle = ffi_lock!(PIPELINES)
            .insert(Arc::new(Mutex::new(pipeline)))
            .to_raw();
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = handle };
        SwirlStatus::Ok as i32
    })
}

/// Destroy a pipeline handle. A pipeline that was not cleaned up is
/// released first.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_pipeline_destroy(handle: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(PIPELINES).remove(SlotKey::from_raw(handle)) {
            Some(_) => SwirlStatus::Ok as i32,
            None => SwirlStatus::InvalidHandle as i32,
        }
    })
}

/// Run `f` on the pipeline behind `handle` with only that pipeline locked.
fn with_pipeline(handle: u64, f: impl FnOnce(&mut Pipeline) -> i32) -> i32 {
    let Some(arc) = get_pipeline(handle) else {
        return SwirlStatus::InvalidHandle as i32;
    };
    let mut pipeline = ffi_lock!(arc);
    f(&mut *pipeline)
}

/// Allocate device state for a `width × height` grid.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_pipeline_initialize(handle: u64, width: i64, height: i64) -> i32 {
    ffi_guard!({
        with_pipeline(handle, |p| {
            SwirlStatus::from(p.initialize(width, height)) as i32
        })
    })
}

/// Run one tick and expose the encoded frame.
///
/// `*out_ptr` / `*out_len` receive the frame. The bytes stay valid until
/// the next step, cleanup or destroy of this handle; copy them to keep
/// them. On failure `*out_ptr` is NULL and `*out_len` is 0.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn swirl_pipeline_step(
    handle: u64,
    out_ptr: *mut *const u8,
    out_len: *mut usize,
) -> i32 {
    ffi_guard!({
        if out_ptr.is_null() || out_len.is_null() {
            return SwirlStatus::InvalidArgument as i32;
        }
        // SAFETY: both pointers are non-null and valid per caller contract.
        unsafe {
            *out_ptr = std::ptr::null();
            *out_len = 0;
        }
        with_pipeline(handle, |p| match p.step() {
            Ok(frame) => {
                // SAFETY: as above. The frame is heap-allocated and owned by
                // the pipeline, so the pointer outlives the lock guard.
                unsafe {
                    *out_ptr = frame.as_ptr();
                    *out_len = frame.len();
                }
                SwirlStatus::Ok as i32
            }
            Err(e) => SwirlStatus::from(&e) as i32,
        })
    })
}

/// Change output resolution and quality for subsequent steps.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_pipeline_update_camera(
    handle: u64,
    width: i64,
    height: i64,
    quality: i64,
) -> i32 {
    ffi_guard!({
        with_pipeline(handle, |p| {
            SwirlStatus::from(p.update_camera(width, height, quality)) as i32
        })
    })
}

/// Apply a constant force `(fx, fy)` at cell `(x, y)` on every following
/// tick. A zero force removes it.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_pipeline_stir(handle: u64, x: u32, y: u32, fx: f32, fy: f32) -> i32 {
    ffi_guard!({
        let force = Cell::new(fx, fy);
        if !force.is_finite() {
            return SwirlStatus::InvalidArgument as i32;
        }
        with_pipeline(handle, |p| SwirlStatus::from(p.stir(x, y, force)) as i32)
    })
}

/// Overwrite FieldGrid cell `(x, y)` with `(vx, vy)`.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_pipeline_inject(handle: u64, x: u32, y: u32, vx: f32, vy: f32) -> i32 {
    ffi_guard!({
        let value = Cell::new(vx, vy);
        if !value.is_finite() {
            return SwirlStatus::InvalidArgument as i32;
        }
        with_pipeline(handle, |p| SwirlStatus::from(p.inject(x, y, value)) as i32)
    })
}

/// Write the number of completed ticks to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn swirl_pipeline_tick_get(handle: u64, out: *mut u64) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return SwirlStatus::InvalidArgument as i32;
        }
        with_pipeline(handle, |p| {
            // SAFETY: out is non-null and valid per caller contract.
            unsafe { *out = p.tick().0 };
            SwirlStatus::Ok as i32
        })
    })
}

/// Write the lifecycle state (`SwirlLifecycleState`) to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn swirl_pipeline_state_get(handle: u64, out: *mut i32) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return SwirlStatus::InvalidArgument as i32;
        }
        with_pipeline(handle, |p| {
            let state = SwirlLifecycleState::from(p.state()) as i32;
            // SAFETY: out is non-null and valid per caller contract.
            unsafe { *out = state };
            SwirlStatus::Ok as i32
        })
    })
}

/// Write the metrics of the last successful step to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn swirl_pipeline_metrics_get(handle: u64, out: *mut SwirlStepMetrics) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return SwirlStatus::InvalidArgument as i32;
        }
        with_pipeline(handle, |p| {
            let m = SwirlStepMetrics::from_rust(p.last_metrics());
            // SAFETY: out is non-null and valid per caller contract.
            unsafe { *out = m };
            SwirlStatus::Ok as i32
        })
    })
}

/// Release all device and host resources of the pipeline. The handle
/// stays valid for queries until destroyed.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_pipeline_cleanup(handle: u64) -> i32 {
    ffi_guard!({ with_pipeline(handle, |p| SwirlStatus::from(p.cleanup()) as i32) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{swirl_config_create, swirl_config_set_camera, swirl_config_set_device};

    fn small_pipeline() -> u64 {
        let mut cfg = 0u64;
        assert_eq!(swirl_config_create(&mut cfg), 0);
        assert_eq!(swirl_config_set_device(cfg, 2, 16 << 20), 0);
        let mut h = 0u64;
        assert_eq!(swirl_pipeline_create(cfg, &mut h), 0);
        h
    }

    fn state(h: u64) -> i32 {
        let mut s = -1;
        assert_eq!(swirl_pipeline_state_get(h, &mut s), 0);
        s
    }

    #[test]
    fn create_consumes_config() {
        let mut cfg = 0u64;
        swirl_config_create(&mut cfg);
        let mut h = 0u64;
        assert_eq!(swirl_pipeline_create(cfg, &mut h), 0);
        assert_eq!(
            swirl_pipeline_create(cfg, &mut h),
            SwirlStatus::InvalidHandle as i32
        );
        assert_eq!(swirl_pipeline_destroy(h), 0);
    }

    #[test]
    fn create_with_null_out_still_consumes_config() {
        let mut cfg = 0u64;
        swirl_config_create(&mut cfg);
        assert_eq!(
            swirl_pipeline_create(cfg, std::ptr::null_mut()),
            SwirlStatus::InvalidArgument as i32
        );
        assert_eq!(
            swirl_config_set_camera(cfg, 8, 8),
            SwirlStatus::InvalidHandle as i32
        );
    }

    #[test]
    fn full_lifecycle_through_handles() {
        let h = small_pipeline();
        assert_eq!(state(h), SwirlLifecycleState::Uninitialized as i32);
        assert_eq!(swirl_pipeline_initialize(h, 32, 24), 0);
        assert_eq!(state(h), SwirlLifecycleState::Ready as i32);

        let mut ptr: *const u8 = std::ptr::null();
        let mut len = 0usize;
        for _ in 0..3 {
            assert_eq!(swirl_pipeline_step(h, &mut ptr, &mut len), 0);
            assert!(!ptr.is_null());
            assert!(len > 0);
        }
        // SAFETY: ptr/len describe the live frame until the next step.
        #[allow(unsafe_code)]
        let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let mut tick = 0u64;
        assert_eq!(swirl_pipeline_tick_get(h, &mut tick), 0);
        assert_eq!(tick, 3);
        let mut m = SwirlStepMetrics::default();
        assert_eq!(swirl_pipeline_metrics_get(h, &mut m), 0);
        assert_eq!(m.tick, 3);
        assert_eq!(m.frame_bytes, len as u64);

        assert_eq!(swirl_pipeline_cleanup(h), 0);
        assert_eq!(state(h), SwirlLifecycleState::Released as i32);
        assert_eq!(
            swirl_pipeline_step(h, &mut ptr, &mut len),
            SwirlStatus::LifecycleViolation as i32
        );
        assert!(ptr.is_null());
        assert_eq!(len, 0);
        assert_eq!(swirl_pipeline_destroy(h), 0);
        assert_eq!(swirl_pipeline_destroy(h), SwirlStatus::InvalidHandle as i32);
        assert_eq!(swirl_pipeline_cleanup(h), SwirlStatus::InvalidHandle as i32);
    }

    #[test]
    fn step_before_initialize_is_a_lifecycle_violation() {
        let h = small_pipeline();
        let mut ptr: *const u8 = std::ptr::null();
        let mut len = 0usize;
        assert_eq!(
            swirl_pipeline_step(h, &mut ptr, &mut len),
            SwirlStatus::LifecycleViolation as i32
        );
        assert_eq!(
            swirl_pipeline_step(h, std::ptr::null_mut(), &mut len),
            SwirlStatus::InvalidArgument as i32
        );
        swirl_pipeline_destroy(h);
    }

    #[test]
    fn argument_errors_map_to_status_codes() {
        let h = small_pipeline();
        assert_eq!(
            swirl_pipeline_initialize(h, 0, 8),
            SwirlStatus::InvalidArgument as i32
        );
        assert_eq!(swirl_pipeline_initialize(h, 8, 8), 0);
        assert_eq!(
            swirl_pipeline_initialize(h, 8, 8),
            SwirlStatus::LifecycleViolation as i32
        );
        assert_eq!(
            swirl_pipeline_stir(h, 8, 0, 1.0, 0.0),
            SwirlStatus::InvalidArgument as i32
        );
        assert_eq!(
            swirl_pipeline_inject(h, 0, 0, f32::NAN, 0.0),
            SwirlStatus::InvalidArgument as i32
        );
        assert_eq!(swirl_pipeline_inject(h, 1, 1, 0.5, 0.5), 0);
        assert_eq!(
            swirl_pipeline_update_camera(h, 16, 16, 0),
            SwirlStatus::InvalidArgument as i32
        );
        assert_eq!(swirl_pipeline_update_camera(h, 16, 16, 90), 0);
        assert_eq!(swirl_pipeline_cleanup(h), 0);
        swirl_pipeline_destroy(h);
    }

    #[test]
    fn destroy_releases_an_initialized_pipeline() {
        let h = small_pipeline();
        assert_eq!(swirl_pipeline_initialize(h, 8, 8), 0);
        assert_eq!(swirl_pipeline_destroy(h), 0);
        let mut tick = 0u64;
        assert_eq!(
            swirl_pipeline_tick_get(h, &mut tick),
            SwirlStatus::InvalidHandle as i32
        );
    }
}
