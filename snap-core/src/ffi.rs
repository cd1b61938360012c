//! C ABI for linking snap-core as a static library from iOS/Android hosts.
//! The host owns the radio link, passes every notification payload in, and polls for the photo.

use std::ffi::c_void;
use std::os::raw::c_int;
use std::slice;

use crate::chunk::Progress;
use crate::core::{Outcome, PhotoReceiver};
use crate::integrity::AssembledPhoto;
use crate::protocol::PROTOCOL_VERSION;

/// `snap_receiver_feed` result codes.
pub const SNAP_IGNORED: c_int = 0;
pub const SNAP_STARTED: c_int = 1;
pub const SNAP_PROGRESS: c_int = 2;
pub const SNAP_COMPLETED: c_int = 3;
pub const SNAP_FAILED: c_int = -2;
pub const SNAP_ERROR: c_int = -1;

/// Receiver plus the last outputs a C host can poll for.
struct FfiReceiver {
    receiver: PhotoReceiver,
    photo: Option<AssembledPhoto>,
    progress: f32,
}

/// Returns the current protocol version. Used so the staticlib exports a C symbol and is linkable.
#[no_mangle]
pub extern "C" fn snap_core_version() -> u8 {
    PROTOCOL_VERSION
}

/// Create a receiver with default options. Returns opaque handle.
#[no_mangle]
pub extern "C" fn snap_receiver_create() -> *mut c_void {
    let h = FfiReceiver {
        receiver: PhotoReceiver::new(),
        photo: None,
        progress: 0.0,
    };
    Box::into_raw(Box::new(h)) as *mut c_void
}

/// Destroy receiver. No-op if h is null.
#[no_mangle]
pub extern "C" fn snap_receiver_destroy(h: *mut c_void) {
    if h.is_null() {
        return;
    }
    let _ = unsafe { Box::from_raw(h as *mut FfiReceiver) };
}

/// Feed one link message. Returns one of the SNAP_* codes.
/// On SNAP_COMPLETED the photo is held until taken with `snap_receiver_take_photo`.
#[no_mangle]
pub extern "C" fn snap_receiver_feed(h: *mut c_void, msg: *const u8, msg_len: usize) -> c_int {
    if h.is_null() || (msg.is_null() && msg_len > 0) {
        return SNAP_ERROR;
    }
    let rx = unsafe { &mut *(h as *mut FfiReceiver) };
    let bytes: &[u8] = if msg_len == 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(msg, msg_len) }
    };
    match rx.receiver.on_message_received(bytes) {
        Outcome::Ignored(_) => SNAP_IGNORED,
        Outcome::Started { .. } => {
            rx.progress = 0.0;
            SNAP_STARTED
        }
        Outcome::Progress { progress, .. } => {
            rx.progress = match progress {
                Progress::Fraction(f) => f,
                Progress::Indeterminate => -1.0,
            };
            SNAP_PROGRESS
        }
        Outcome::Completed { photo, .. } => {
            rx.progress = 1.0;
            rx.photo = Some(photo);
            SNAP_COMPLETED
        }
        Outcome::Failed { .. } => {
            rx.progress = 0.0;
            SNAP_FAILED
        }
    }
}

/// Last reported progress: 0.0..=1.0 (may exceed 1.0 on overshoot), -1.0 if indeterminate.
#[no_mangle]
pub extern "C" fn snap_receiver_progress(h: *mut c_void) -> f32 {
    if h.is_null() {
        return 0.0;
    }
    let rx = unsafe { &*(h as *const FfiReceiver) };
    rx.progress
}

/// Length of the held photo, or 0 if none.
#[no_mangle]
pub extern "C" fn snap_receiver_photo_len(h: *mut c_void) -> usize {
    if h.is_null() {
        return 0;
    }
    let rx = unsafe { &*(h as *const FfiReceiver) };
    rx.photo.as_ref().map(AssembledPhoto::len).unwrap_or(0)
}

/// Copy the held photo into out_buf and release it. Returns bytes written,
/// 0 if no photo is held, -1 on error (null handle or buffer too small; photo stays held).
#[no_mangle]
pub extern "C" fn snap_receiver_take_photo(
    h: *mut c_void,
    out_buf: *mut u8,
    out_buf_len: usize,
) -> c_int {
    if h.is_null() {
        return -1;
    }
    let rx = unsafe { &mut *(h as *mut FfiReceiver) };
    let len = match &rx.photo {
        None => return 0,
        Some(p) => p.len(),
    };
    if out_buf.is_null() || out_buf_len < len || len > c_int::MAX as usize {
        return -1;
    }
    if let Some(photo) = rx.photo.take() {
        unsafe {
            out_buf.copy_from_nonoverlapping(photo.bytes().as_ptr(), len);
        }
    }
    len as c_int
}
