//! Client-side bridge to a local inference server.
//!
//! # Overview
//! Sends one chat prompt as a JSON `POST` to the server's chat endpoint and
//! returns the fully buffered reply. The body is treated as opaque bytes.
//!
//! # Design
//! - `ResponseBuffer` accumulates the body with doubling growth and hands
//!   its storage to `HttpResponse` by move.
//! - `payload` escapes the prompt and assembles the fixed-shape body under a
//!   size ceiling.
//! - `Transport` has two backends, native sockets and `ureq`, chosen by
//!   `BridgeConfig::backend`; the default follows the `portable` feature.
//! - `BridgeContext` replaces global state: construct it to initialize,
//!   consume it to clean up.
//! - Transport failure is an `Err`, never an empty response with status 0.

pub mod buffer;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod marshal;
pub mod payload;
pub mod registry;
pub mod transport;

pub use buffer::ResponseBuffer;
pub use client::ChatClient;
pub use config::{Backend, BridgeConfig, Endpoint};
pub use context::BridgeContext;
pub use error::{BridgeError, BufferError, PayloadError, TransportError};
pub use http::HttpResponse;
pub use marshal::GenerationResponse;
pub use registry::{Model, ModelRegistry};
pub use transport::{NativeTransport, Transport};

#[cfg(feature = "portable")]
pub use transport::PortableTransport;
