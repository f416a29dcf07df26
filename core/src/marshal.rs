//! Conversion of transport results into the record handed to bindings.
//!
//! # Design
//! The content is passed through byte for byte: no escaping, no UTF-8
//! validation. Bindings that need text call `text()`, which is lossy, or
//! read `content` directly.

use std::borrow::Cow;

use serde::Serialize;

use crate::http::HttpResponse;

/// Outcome of one `generate` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResponse {
    #[serde(serialize_with = "serialize_lossy")]
    pub content: Vec<u8>,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// Wall-clock seconds for the whole request.
    pub time: f64,
    /// Content length in bytes.
    pub size: u64,
}

impl GenerationResponse {
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

impl From<HttpResponse> for GenerationResponse {
    fn from(response: HttpResponse) -> Self {
        let status_code = response.status_code();
        let time = response.elapsed_seconds();
        let size = response.response_size() as u64;
        Self {
            content: response.into_content(),
            status_code,
            time,
            size,
        }
    }
}

fn serialize_lossy<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}
