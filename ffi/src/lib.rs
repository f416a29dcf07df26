//! C-ABI wrapper around `ollama-bridge-core`.
//!
//! # Overview
//! Exposes the binding surface (init, generate, list models, is-initialized,
//! cleanup) through `extern "C"` functions so an embedding runtime with a C
//! FFI can drive the bridge without linking against Rust types.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - `bridge_generate` and `bridge_list_models` return one
//!   `FfiBridgeResult` envelope with `FfiDataTag` + `void* data`; failures
//!   carry a distinct `FfiErrorCode`, never an empty success.
//! - The C caller owns every returned pointer and releases it with the
//!   matching `bridge_free*` function.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use ollama_bridge_core::{BridgeConfig, BridgeContext, BridgeError};

use types::*;

/// Borrow a C string argument as UTF-8.
///
/// # Safety
/// `ptr` must be non-null and point to a NUL-terminated string.
unsafe fn str_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, BridgeError> {
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| BridgeError::InvalidArgument(format!("{name} is not valid UTF-8")))
}

// ---------------------------------------------------------------------------
// Handle lifecycle
// ---------------------------------------------------------------------------

/// Create a bridge handle.
///
/// `config_json` may be null, in which case defaults with
/// `OLLAMA_BRIDGE_*` environment overrides are used. Returns null if the
/// configuration is invalid or an internal panic occurs. The handle starts
/// uninitialized; call `bridge_init` before generating. Free it with
/// `bridge_free`.
#[unsafe(no_mangle)]
pub extern "C" fn bridge_new(config_json: *const c_char) -> *mut FfiBridge {
    catch_unwind(|| {
        let config = if config_json.is_null() {
            BridgeConfig::from_env()
        } else {
            unsafe { str_arg(config_json, "config_json") }.and_then(BridgeConfig::from_json)
        };
        match config {
            Ok(config) => Box::into_raw(Box::new(FfiBridge {
                config,
                context: None,
            })),
            Err(e) => {
                log::error!("bridge_new: {e}");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a handle created by `bridge_new`, cleaning up first if needed.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn bridge_free(bridge: *mut FfiBridge) {
    if !bridge.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(bridge) });
        }));
    }
}

/// Initialize the bridge, replacing any previous context.
///
/// Returns false if `bridge` is null or initialization fails.
#[unsafe(no_mangle)]
pub extern "C" fn bridge_init(bridge: *mut FfiBridge) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if bridge.is_null() {
            return false;
        }
        let bridge = unsafe { &mut *bridge };
        if let Some(previous) = bridge.context.take() {
            previous.cleanup();
        }
        match BridgeContext::init(&bridge.config) {
            Ok(context) => {
                bridge.context = Some(context);
                true
            }
            Err(e) => {
                log::error!("bridge_init: {e}");
                false
            }
        }
    }))
    .unwrap_or(false)
}

/// Whether `bridge_init` has succeeded since the last cleanup.
/// False for a null handle.
#[unsafe(no_mangle)]
pub extern "C" fn bridge_is_initialized(bridge: *const FfiBridge) -> bool {
    catch_unwind(AssertUnwindSafe(|| {
        if bridge.is_null() {
            return false;
        }
        let bridge = unsafe { &*bridge };
        bridge.context.as_ref().is_some_and(|c| c.is_initialized())
    }))
    .unwrap_or(false)
}

/// Release the context. The handle stays valid and may be initialized
/// again. Safe to call with null or on an uninitialized handle.
#[unsafe(no_mangle)]
pub extern "C" fn bridge_cleanup(bridge: *mut FfiBridge) {
    if bridge.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let bridge = unsafe { &mut *bridge };
        if let Some(context) = bridge.context.take() {
            context.cleanup();
        }
    }));
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Send `prompt` to `model` and return the buffered reply.
///
/// Returns a result with `data_tag = Generation` on success, including
/// non-200 replies (`http_status` carries the code). Transport failures
/// return no data and one of `Connection` (unreachable), `Timeout`, or
/// `GenerationFailed` (the exchange broke after connecting).
#[unsafe(no_mangle)]
pub extern "C" fn bridge_generate(
    bridge: *const FfiBridge,
    model: *const c_char,
    prompt: *const c_char,
) -> *mut FfiBridgeResult {
    catch_unwind(AssertUnwindSafe(|| {
        if bridge.is_null() {
            return FfiBridgeResult::null_arg("bridge");
        }
        if model.is_null() {
            return FfiBridgeResult::null_arg("model");
        }
        if prompt.is_null() {
            return FfiBridgeResult::null_arg("prompt");
        }
        let bridge = unsafe { &*bridge };
        let Some(context) = bridge.context.as_ref() else {
            return FfiBridgeResult::from_error(BridgeError::NotInitialized);
        };

        let outcome = unsafe { str_arg(model, "model") }
            .and_then(|model| Ok((model, unsafe { str_arg(prompt, "prompt") }?)))
            .and_then(|(model, prompt)| context.generate(model, prompt));
        match outcome {
            Ok(generation) => FfiBridgeResult::ok_generation(generation),
            Err(e) => {
                log::warn!("bridge_generate: {e}");
                FfiBridgeResult::from_error(e)
            }
        }
    }))
    .unwrap_or_else(|_| FfiBridgeResult::panic("panic in bridge_generate"))
}

/// List the models known to the bridge.
///
/// Returns a result with `data_tag = ModelList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn bridge_list_models(bridge: *const FfiBridge) -> *mut FfiBridgeResult {
    catch_unwind(AssertUnwindSafe(|| {
        if bridge.is_null() {
            return FfiBridgeResult::null_arg("bridge");
        }
        let bridge = unsafe { &*bridge };
        match bridge.context.as_ref() {
            Some(context) => FfiBridgeResult::ok_model_list(context.list_models()),
            None => FfiBridgeResult::from_error(BridgeError::NotInitialized),
        }
    }))
    .unwrap_or_else(|_| FfiBridgeResult::panic("panic in bridge_list_models"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiBridgeResult` returned by `bridge_generate` or
/// `bridge_list_models`. Safe to call with null. Uses `data_tag` to
/// determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn bridge_free_result(result: *mut FfiBridgeResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { std::ffi::CString::from_raw(result.error_message) });
        }
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::None => {}
            FfiDataTag::Generation => {
                let generation = unsafe { Box::from_raw(result.data as *mut FfiGeneration) };
                if !generation.content.is_null() {
                    let len = generation.size as usize + 1;
                    drop(unsafe {
                        Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                            generation.content as *mut u8,
                            len,
                        ))
                    });
                }
            }
            FfiDataTag::ModelList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiModelList) };
                if !list.items.is_null() && list.len > 0 {
                    let items = unsafe {
                        Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                            list.items,
                            list.len as usize,
                        ))
                    };
                    for model in items.iter() {
                        if !model.name.is_null() {
                            drop(unsafe { std::ffi::CString::from_raw(model.name) });
                        }
                    }
                }
            }
        }
    }));
}
