//! FFI bindings for the scorecard engine
//!
//! C-compatible entry points for dashboards and services written in other
//! languages. All functions take null-terminated C strings and return
//! allocated memory that must be freed with `scorecard_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::ScoringConfig;
use crate::encoder::ReportEncoder;
use crate::error::ScorecardError;
use crate::pipeline::{scorecards_from_json, Aggregator};
use crate::roster::merge_roster_json;
use crate::schema::EventBatchAdapter;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Caller owns the returned pointer
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a result across the boundary, recording the error on failure
fn into_c_result(result: Result<String, ScorecardError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Aggregate a `dora.events.v1` batch and return the encoded report.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `scorecard_free_string`.
/// - Returns NULL on error; call `scorecard_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn scorecard_aggregate_json(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    into_c_result(scorecards_from_json(json_str))
}

/// Merge per-repository contributor listings into one team roster.
///
/// # Safety
/// - `json` must be a valid null-terminated C string holding a JSON array.
/// - Returns a newly allocated string that must be freed with `scorecard_free_string`.
/// - Returns NULL on error; call `scorecard_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn scorecard_merge_roster_json(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    into_c_result(merge_roster_json(&json_str))
}

// ============================================================================
// Stateful Aggregator API
// ============================================================================

/// Opaque handle to an Aggregator
pub struct AggregatorHandle {
    aggregator: Aggregator,
    encoder: ReportEncoder,
}

/// Create an aggregator from a `ScoringConfig` JSON document.
///
/// # Safety
/// - `config_json` may be NULL for default settings, otherwise it must be a
///   valid null-terminated C string.
/// - Must be freed with `scorecard_aggregator_free`.
/// - Returns NULL on error; call `scorecard_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn scorecard_aggregator_new(
    config_json: *const c_char,
) -> *mut AggregatorHandle {
    clear_last_error();

    let aggregator = if config_json.is_null() {
        Ok(Aggregator::new())
    } else {
        match cstr_to_string(config_json) {
            Some(json) => ScoringConfig::from_json(&json).and_then(Aggregator::with_config),
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        }
    };

    match aggregator {
        Ok(aggregator) => Box::into_raw(Box::new(AggregatorHandle {
            aggregator,
            encoder: ReportEncoder::new(),
        })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an aggregator.
///
/// # Safety
/// - `aggregator` must be a valid pointer returned by `scorecard_aggregator_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn scorecard_aggregator_free(aggregator: *mut AggregatorHandle) {
    if !aggregator.is_null() {
        drop(Box::from_raw(aggregator));
    }
}

/// Aggregate a batch with a stateful aggregator and return the encoded report.
///
/// # Safety
/// - `aggregator` must be a valid pointer returned by `scorecard_aggregator_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `scorecard_free_string`.
/// - Returns NULL on error; call `scorecard_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn scorecard_aggregator_aggregate(
    aggregator: *mut AggregatorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if aggregator.is_null() {
        set_last_error("Null aggregator pointer");
        return ptr::null_mut();
    }
    let handle = &mut *aggregator;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    let result = EventBatchAdapter::parse_batch(&json_str).and_then(|batch| {
        let outcome = handle.aggregator.aggregate_batch(&batch);
        handle.encoder.encode_to_json(&outcome)
    });
    into_c_result(result)
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by scorecard functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a scorecard function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn scorecard_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next scorecard call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn scorecard_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn scorecard_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
