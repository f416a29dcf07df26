//! The response record produced by a transport.
//!
//! # Design
//! An `HttpResponse` is created once per request and never mutated. Its
//! content is the storage moved out of the `ResponseBuffer` that accumulated
//! the body, so building it does not copy. Any status the server sent,
//! including non-200, is carried as data; interpreting it is up to the
//! caller.

use std::borrow::Cow;
use std::time::Duration;

use crate::buffer::ResponseBuffer;

/// A complete response as received from the inference server.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    content: Vec<u8>,
    status_code: u16,
    elapsed: Duration,
}

impl HttpResponse {
    /// Take ownership of `buffer`'s storage as the response content.
    pub fn from_buffer(buffer: ResponseBuffer, status_code: u16, elapsed: Duration) -> Self {
        Self {
            content: buffer.into_bytes(),
            status_code,
            elapsed,
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// The content as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    pub fn response_size(&self) -> usize {
        self.content.len()
    }
}
