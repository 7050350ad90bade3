//! Integration test: the three-operation ABI end to end.
//!
//! `init`/`step`/`cleanup` share one process-wide pipeline, so the whole
//! sequence runs in a single test. A recording fatal handler replaces the
//! default process exit, which lets the test observe every contract
//! violation instead of dying on the first one.

use std::ffi::{c_char, c_ulong, CStr};
use std::sync::Mutex;

use swirl_ffi::fatal::swirl_set_fatal_handler;
use swirl_ffi::legacy::{cleanup, init, step};
use swirl_ffi::SwirlStatus;

static FATALS: Mutex<Vec<(i32, String)>> = Mutex::new(Vec::new());

extern "C" fn record(status: i32, message: *const c_char) {
    // SAFETY: the library passes a valid NUL-terminated string.
    #[allow(unsafe_code)]
    let text = unsafe { CStr::from_ptr(message) }
        .to_string_lossy()
        .into_owned();
    FATALS.lock().unwrap().push((status, text));
}

fn take_fatals() -> Vec<(i32, String)> {
    std::mem::take(&mut *FATALS.lock().unwrap())
}

fn step_frame() -> Option<Vec<u8>> {
    let mut ptr: *const u8 = std::ptr::null();
    let mut len: c_ulong = 0;
    step(&mut ptr, &mut len);
    if ptr.is_null() {
        assert_eq!(len, 0);
        return None;
    }
    // SAFETY: ptr/len describe the current frame until the next step.
    #[allow(unsafe_code)]
    let bytes = unsafe { std::slice::from_raw_parts(ptr, len as usize) };
    Some(bytes.to_vec())
}

#[test]
fn three_operation_lifecycle() {
    assert_eq!(swirl_set_fatal_handler(Some(record)), 0);
    let violation = SwirlStatus::LifecycleViolation as i32;

    // Step before init.
    assert!(step_frame().is_none());
    let fatals = take_fatals();
    assert_eq!(fatals.len(), 1);
    assert_eq!(fatals[0].0, violation);
    assert!(fatals[0].1.starts_with("step:"), "{}", fatals[0].1);

    // Cleanup before init.
    cleanup();
    assert_eq!(take_fatals()[0].0, violation);

    // Rejected dimensions leave the slot free for a valid init.
    init(0, 48);
    assert_eq!(take_fatals()[0].0, SwirlStatus::InvalidArgument as i32);
    init(64, 48);
    assert!(take_fatals().is_empty());

    // Ten frames, each a JPEG smaller than the raw 64x48 RGB payload.
    for _ in 0..10 {
        let frame = step_frame().expect("frame");
        assert!(frame.len() > 100 && frame.len() < 64 * 48 * 3, "{}", frame.len());
        assert_eq!(&frame[..2], &[0xFF, 0xD8]);
        assert_eq!(&frame[frame.len() - 2..], &[0xFF, 0xD9]);
    }
    assert!(take_fatals().is_empty());

    // Second init.
    init(64, 48);
    assert_eq!(take_fatals()[0].0, violation);
    assert!(step_frame().is_some());

    cleanup();
    assert!(take_fatals().is_empty());

    // Everything after cleanup is a violation.
    assert!(step_frame().is_none());
    cleanup();
    init(8, 8);
    let fatals = take_fatals();
    assert_eq!(fatals.len(), 3);
    assert!(fatals.iter().all(|(status, _)| *status == violation));

    // Null output pointers.
    step(std::ptr::null_mut(), std::ptr::null_mut());
    assert_eq!(take_fatals()[0].0, SwirlStatus::InvalidArgument as i32);

    assert_eq!(swirl_set_fatal_handler(None), 0);
}
