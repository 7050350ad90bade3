//! The three-operation ABI: `init`, `step`, `cleanup`.
//!
//! A single process-wide pipeline backs these symbols. The slot remembers
//! that it was released, so a call after `cleanup` is detected as a
//! contract violation instead of silently starting over. Every violation
//! and every fault is routed to [`raise`](crate::fatal), which by default
//! terminates the process.

use std::ffi::c_ulong;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;

use swirl_device::{HostDevice, HostDeviceConfig};
use swirl_engine::{LifecycleState, Pipeline, PipelineConfig};

use crate::fatal::{raise, Fatal};
use crate::status::SwirlStatus;

enum Slot {
    Vacant,
    Live(Box<Pipeline>),
    Released,
}

static SLOT: Mutex<Slot> = Mutex::new(Slot::Vacant);

/// Run `body` against the slot and raise whatever it fails with.
///
/// The slot lock is released before the fatal handler runs.
fn with_slot<T>(op: &'static str, body: impl FnOnce(&mut Slot) -> Result<T, Fatal>) -> Option<T> {
    let outcome = catch_unwind(AssertUnwindSafe(|| match SLOT.lock() {
        Ok(mut slot) => body(&mut slot),
        Err(_) => Err(Fatal::new(
            SwirlStatus::InternalError,
            "pipeline slot poisoned by an earlier panic",
        )),
    }));
    let result = outcome.unwrap_or_else(|_| {
        Err(Fatal::new(SwirlStatus::Panicked, "panic caught at the C boundary"))
    });
    match result {
        Ok(value) => Some(value),
        Err(fatal) => {
            raise(op, fatal);
            None
        }
    }
}

fn violation(op: &str, state: &str) -> Fatal {
    Fatal::new(
        SwirlStatus::LifecycleViolation,
        format!("{op} called while the pipeline is {state}"),
    )
}

fn start(width: i64, height: i64) -> Result<Pipeline, (Fatal, Option<Pipeline>)> {
    let device = HostDevice::new(HostDeviceConfig::default()).map_err(|e| {
        let fatal = Fatal::new(SwirlStatus::DeviceFault, e.to_string());
        (fatal, None)
    })?;
    let mut pipeline =
        Pipeline::new(Box::new(device), PipelineConfig::default()).map_err(|e| (e.into(), None))?;
    match pipeline.initialize(width, height) {
        Ok(()) => Ok(pipeline),
        Err(e) => Err((e.into(), Some(pipeline))),
    }
}

/// Allocate the simulation for a `width × height` grid.
///
/// Must be called exactly once, before any `step`.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn init(width: i32, height: i32) {
    crate::log::install();
    with_slot("init", |slot| match slot {
        Slot::Vacant => match start(i64::from(width), i64::from(height)) {
            Ok(pipeline) => {
                *slot = Slot::Live(Box::new(pipeline));
                Ok(())
            }
            Err((fatal, pipeline)) => {
                // A faulted pipeline is kept so cleanup can release what
                // it holds; rejected arguments leave the slot vacant.
                if let Some(p) = pipeline.filter(|p| p.state() != LifecycleState::Uninitialized) {
                    *slot = Slot::Live(Box::new(p));
                }
                Err(fatal)
            }
        },
        Slot::Live(_) => Err(violation("init", "already initialized")),
        Slot::Released => Err(violation("init", "released")),
    });
}

/// Advance one tick and expose the encoded frame.
///
/// `*out_buffer` / `*out_size` receive the frame, valid until the next
/// `step` or `cleanup`. On failure they are set to NULL and 0.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn step(out_buffer: *mut *const u8, out_size: *mut c_ulong) {
    if out_buffer.is_null() || out_size.is_null() {
        raise(
            "step",
            Fatal::new(SwirlStatus::InvalidArgument, "output pointers must not be NULL"),
        );
        return;
    }
    // SAFETY: both pointers are non-null and valid per caller contract.
    unsafe {
        *out_buffer = std::ptr::null();
        *out_size = 0;
    }
    let frame = with_slot("step", |slot| match slot {
        Slot::Live(pipeline) => {
            let frame = pipeline.step()?;
            let len = c_ulong::try_from(frame.len()).map_err(|_| {
                Fatal::new(SwirlStatus::CodecFault, "frame larger than unsigned long")
            })?;
            Ok((frame.as_ptr(), len))
        }
        Slot::Vacant => Err(violation("step", "not initialized")),
        Slot::Released => Err(violation("step", "released")),
    });
    if let Some((ptr, len)) = frame {
        // SAFETY: as above. The frame is owned by the pipeline inside the
        // static slot and lives until the next step or cleanup.
        unsafe {
            *out_buffer = ptr;
            *out_size = len;
        }
    }
}

/// Release every resource. Must be called exactly once, after `init`.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn cleanup() {
    with_slot("cleanup", |slot| {
        match std::mem::replace(slot, Slot::Released) {
            Slot::Live(mut pipeline) => {
                pipeline.cleanup()?;
                Ok(())
            }
            Slot::Vacant => {
                *slot = Slot::Vacant;
                Err(violation("cleanup", "not initialized"))
            }
            Slot::Released => Err(violation("cleanup", "released")),
        }
    });
}
