//! HTTP transports that carry one chat request to the inference server.
//!
//! # Design
//! `Transport` is the seam between request assembly and I/O. Two real
//! backends implement it: `NativeTransport` over plain OS sockets and
//! `PortableTransport` over `ureq` (cargo feature `portable`). Both fill a
//! `ResponseBuffer` chunk by chunk and hand its storage to the returned
//! `HttpResponse`. `FakeTransport` (feature `test-util`) replays scripted
//! chunks through the same path.

mod native;
#[cfg(feature = "portable")]
mod portable;

#[cfg(any(test, feature = "test-util"))]
mod fake;

pub use native::NativeTransport;
#[cfg(feature = "portable")]
pub use portable::PortableTransport;

#[cfg(any(test, feature = "test-util"))]
pub use fake::FakeTransport;

use crate::config::{Backend, Endpoint};
use crate::error::TransportError;
use crate::http::HttpResponse;

/// Size of each read from the response body.
pub const CHUNK_SIZE: usize = 8192;

pub(crate) const USER_AGENT: &str = concat!("ollama-bridge/", env!("CARGO_PKG_VERSION"));

/// One blocking POST of a JSON body to a fixed endpoint.
pub trait Transport {
    /// Send `body` and buffer the whole response.
    ///
    /// Returns `Err` only when no response record could be formed; a
    /// non-200 status is returned as `Ok`.
    fn post(&self, body: &[u8]) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post(&self, body: &[u8]) -> Result<HttpResponse, TransportError> {
        (**self).post(body)
    }
}

/// Build the transport selected by `backend` for `endpoint`.
pub fn for_backend(backend: Backend, endpoint: Endpoint) -> Box<dyn Transport> {
    match backend {
        Backend::Native => Box::new(NativeTransport::new(endpoint)),
        #[cfg(feature = "portable")]
        Backend::Portable => Box::new(PortableTransport::new(endpoint)),
    }
}
