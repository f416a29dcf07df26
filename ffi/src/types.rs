//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible fields: `*mut c_char`
//! instead of `String`, raw pointer plus length instead of `Vec`, and enums
//! with explicit discriminants. Constructors live here to keep `lib.rs`
//! focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use ollama_bridge_core::{
    BridgeConfig, BridgeContext, BridgeError, GenerationResponse, Model, TransportError,
};

/// Opaque bridge handle. Holds the configuration and, between `bridge_init`
/// and `bridge_cleanup`, the live context.
pub struct FfiBridge {
    pub(crate) config: BridgeConfig,
    pub(crate) context: Option<BridgeContext>,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiBridgeResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    NullArg = 1,
    InvalidArgument = 2,
    NotInitialized = 3,
    /// The server could not be reached.
    Connection = 4,
    /// The request did not finish within the configured timeout.
    Timeout = 5,
    /// Connected, but sending or receiving the reply failed.
    GenerationFailed = 6,
    RequestTooLarge = 7,
    Allocation = 8,
    Config = 9,
    Panic = 10,
}

/// Tag that tells `bridge_free_result` what `FfiBridgeResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    Generation = 1,
    ModelList = 2,
}

/// A generation reply exposed to C.
///
/// `content` holds `size` bytes followed by a NUL terminator. The body may
/// itself contain NUL bytes, so read it by `size`.
#[repr(C)]
pub struct FfiGeneration {
    pub content: *mut c_char,
    pub size: u64,
    pub status_code: u16,
    pub time: f64,
}

/// A model descriptor exposed to C.
#[repr(C)]
pub struct FfiModel {
    pub name: *mut c_char,
    pub size: u64,
    pub loaded: bool,
}

/// A list of model descriptors exposed to C.
#[repr(C)]
pub struct FfiModelList {
    pub items: *mut FfiModel,
    pub len: u32,
}

/// Result envelope for `bridge_generate` and `bridge_list_models`.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the payload tagged by `data_tag`. On failure `error_message`
/// is a C string and `data` is null.
#[repr(C)]
pub struct FfiBridgeResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

/// Lossy C string: interior NULs become U+FFFD.
pub(crate) fn c_string(s: &str) -> *mut c_char {
    CString::new(s.replace('\0', "\u{FFFD}"))
        .unwrap_or_default()
        .into_raw()
}

impl FfiBridgeResult {
    fn boxed(
        error_code: FfiErrorCode,
        error_message: *mut c_char,
        http_status: u16,
        data_tag: FfiDataTag,
        data: *mut c_void,
    ) -> *mut Self {
        Box::into_raw(Box::new(FfiBridgeResult {
            error_code,
            error_message,
            http_status,
            data_tag,
            data,
        }))
    }

    /// Build a success result carrying an `FfiGeneration`.
    pub(crate) fn ok_generation(generation: GenerationResponse) -> *mut Self {
        let status_code = generation.status_code;
        let size = generation.size;
        let mut bytes = generation.content;
        bytes.push(0);
        let content = Box::into_raw(bytes.into_boxed_slice()) as *mut c_char;

        let ffi = Box::new(FfiGeneration {
            content,
            size,
            status_code,
            time: generation.time,
        });
        Self::boxed(
            FfiErrorCode::Ok,
            std::ptr::null_mut(),
            status_code,
            FfiDataTag::Generation,
            Box::into_raw(ffi) as *mut c_void,
        )
    }

    /// Build a success result carrying an `FfiModelList`.
    pub(crate) fn ok_model_list(models: &[Model]) -> *mut Self {
        let len = models.len() as u32;
        let items = if models.is_empty() {
            std::ptr::null_mut()
        } else {
            let boxed: Box<[FfiModel]> = models
                .iter()
                .map(|m| FfiModel {
                    name: c_string(&m.name),
                    size: m.size_bytes,
                    loaded: m.loaded,
                })
                .collect();
            Box::into_raw(boxed) as *mut FfiModel
        };

        let list = Box::new(FfiModelList { items, len });
        Self::boxed(
            FfiErrorCode::Ok,
            std::ptr::null_mut(),
            0,
            FfiDataTag::ModelList,
            Box::into_raw(list) as *mut c_void,
        )
    }

    /// Build an error result from a `BridgeError`.
    pub(crate) fn from_error(err: BridgeError) -> *mut Self {
        let code = match &err {
            BridgeError::InvalidArgument(_) | BridgeError::ArgumentTooLong { .. } => {
                FfiErrorCode::InvalidArgument
            }
            BridgeError::NotInitialized => FfiErrorCode::NotInitialized,
            BridgeError::RequestTooLarge(_) => FfiErrorCode::RequestTooLarge,
            BridgeError::Allocation(_) => FfiErrorCode::Allocation,
            BridgeError::Transport(e) => match e {
                TransportError::Connect { .. } => FfiErrorCode::Connection,
                TransportError::Timeout(_) => FfiErrorCode::Timeout,
                TransportError::Buffer(_) => FfiErrorCode::Allocation,
                TransportError::Send(_)
                | TransportError::Receive(_)
                | TransportError::Malformed(_)
                | TransportError::Backend(_) => FfiErrorCode::GenerationFailed,
            },
            BridgeError::Config(_) => FfiErrorCode::Config,
        };
        Self::error(code, &err.to_string())
    }

    pub(crate) fn error(code: FfiErrorCode, msg: &str) -> *mut Self {
        Self::boxed(
            code,
            c_string(msg),
            0,
            FfiDataTag::None,
            std::ptr::null_mut(),
        )
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::error(FfiErrorCode::NullArg, &format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::error(FfiErrorCode::Panic, msg)
    }
}
