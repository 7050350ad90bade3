//! Fatal-condition routing for the three-operation surface.
//!
//! The three-operation ABI has no way to return an error, so device and
//! codec faults and out-of-order calls are fatal. By default a fatal
//! condition is logged and the process exits with status 1. A host (or a
//! test harness) can install a handler to intercept it instead; when the
//! handler returns, the failing call returns without producing output.

use std::ffi::{c_char, CString};
use std::sync::Mutex;

use crate::status::SwirlStatus;

/// Callback receiving the status code and a NUL-terminated diagnostic.
/// The message pointer is valid only for the duration of the call.
pub type SwirlFatalHandler = extern "C" fn(status: i32, message: *const c_char);

static HANDLER: Mutex<Option<SwirlFatalHandler>> = Mutex::new(None);

/// A fatal condition waiting to be raised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Fatal {
    pub status: SwirlStatus,
    pub message: String,
}

impl Fatal {
    pub fn new(status: SwirlStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<swirl_engine::PipelineError> for Fatal {
    fn from(e: swirl_engine::PipelineError) -> Self {
        Self::new(SwirlStatus::from(&e), e.to_string())
    }
}

/// Report a fatal condition from `op`.
///
/// Must not be called with any library lock held: the handler may call
/// back into the ABI.
pub(crate) fn raise(op: &'static str, fatal: Fatal) {
    tracing::error!(op, status = fatal.status as i32, "{}", fatal.message);
    let handler = HANDLER.lock().map(|h| *h).unwrap_or_else(|p| *p.into_inner());
    match handler {
        Some(handler) => {
            let text = format!("{op}: {}", fatal.message).replace('\0', " ");
            let c_text = CString::new(text).unwrap_or_default();
            handler(fatal.status as i32, c_text.as_ptr());
        }
        None => std::process::exit(1),
    }
}

/// Install `handler` for fatal conditions, or restore the default
/// (log and exit) with `NULL`.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_set_fatal_handler(handler: Option<SwirlFatalHandler>) -> i32 {
    ffi_guard!({
        *ffi_lock!(HANDLER) = handler;
        SwirlStatus::Ok as i32
    })
}
