//! Diagnostic logging for C hosts.
//!
//! The library only emits `tracing` events. A host that wants them on
//! stderr calls [`swirl_log_init`]; the filter comes from the `SWIRL_LOG`
//! environment variable (`RUST_LOG` syntax) and defaults to `info`.

use tracing_subscriber::EnvFilter;

use crate::status::SwirlStatus;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "SWIRL_LOG";

/// Install the stderr subscriber. Returns `false` if a global subscriber
/// was already set.
pub(crate) fn install() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Route Swirl diagnostics to stderr. Idempotent: later calls, or a host
/// that installed its own subscriber, leave the existing one in place.
#[allow(unsafe_code)]
#[no_mangle]
pub extern "C" fn swirl_log_init() -> i32 {
    ffi_guard!({
        if install() {
            tracing::debug!(filter_env = LOG_ENV, "logging initialized");
        }
        SwirlStatus::Ok as i32
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_init_is_idempotent() {
        assert_eq!(swirl_log_init(), SwirlStatus::Ok as i32);
        assert_eq!(swirl_log_init(), SwirlStatus::Ok as i32);
    }
}
