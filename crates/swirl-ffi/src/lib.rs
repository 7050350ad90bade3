//! C ABI for the Swirl pipeline.
//!
//! Two surfaces are exported:
//!
//! - The three-operation surface `init` / `step` / `cleanup`, backed by a
//!   single process-wide pipeline. Contract violations and faults are
//!   fatal and routed to [`swirl_set_fatal_handler`](fatal::swirl_set_fatal_handler).
//! - A handle surface (`swirl_config_*`, `swirl_pipeline_*`) for hosts that
//!   run several pipelines or want status codes instead of termination.
//!
//! Every entry point catches panics and never unwinds into C. This is the
//! only crate in the workspace that contains `unsafe` code, confined to
//! writes through caller-provided out-pointers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

/// Run an FFI body, converting a panic into `SwirlStatus::Panicked`.
macro_rules! ffi_guard {
    ($body:block) => {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| -> i32 { $body })) {
            Ok(status) => status,
            Err(_) => {
                tracing::error!("panic caught at the C boundary");
                $crate::status::SwirlStatus::Panicked as i32
            }
        }
    };
}

/// Lock a mutex inside `ffi_guard!`, returning `InternalError` if poisoned.
macro_rules! ffi_lock {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return $crate::status::SwirlStatus::InternalError as i32,
        }
    };
}

pub mod config;
pub mod fatal;
pub mod legacy;
pub mod log;
pub mod pipeline;
pub mod status;
pub mod types;

pub use status::SwirlStatus;
pub use types::{SwirlLifecycleState, SwirlStepMetrics, SwirlSyncMode, SwirlTransfer};
