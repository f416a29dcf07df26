//! Transport over the `ureq` HTTP client.
//!
//! # Design
//! One `ureq::Agent` is configured per transport: a global timeout, status
//! codes returned as data rather than `Err`, and no redirects. The body
//! reader's chunks go through `write_chunk`, the equivalent of a write
//! callback, into a `ResponseBuffer`. ureq does not report transfer timing,
//! so elapsed time is measured around the call.

use std::io::{self, Read};
use std::time::Instant;

use log::{debug, info};

use super::{Transport, CHUNK_SIZE, USER_AGENT};
use crate::buffer::ResponseBuffer;
use crate::config::Endpoint;
use crate::error::TransportError;
use crate::http::HttpResponse;

/// Blocking HTTP client backed by `ureq`.
pub struct PortableTransport {
    endpoint: Endpoint,
    agent: ureq::Agent,
}

impl PortableTransport {
    pub fn new(endpoint: Endpoint) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(endpoint.timeout()))
            .http_status_as_error(false)
            .max_redirects(0)
            .build()
            .new_agent();
        Self { endpoint, agent }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn map_error(&self, err: ureq::Error) -> TransportError {
        match err {
            ureq::Error::Timeout(_) => TransportError::Timeout(self.endpoint.timeout()),
            ureq::Error::Io(source) if is_connect_failure(&source) => TransportError::Connect {
                endpoint: self.endpoint.authority(),
                source,
            },
            ureq::Error::Io(source) => TransportError::Receive(source),
            ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => TransportError::Connect {
                endpoint: self.endpoint.authority(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, err.to_string()),
            },
            other => TransportError::Backend(other.to_string()),
        }
    }
}

impl Transport for PortableTransport {
    fn post(&self, body: &[u8]) -> Result<HttpResponse, TransportError> {
        let started = Instant::now();
        let url = self.endpoint.url();
        let mut buffer = ResponseBuffer::new()?;

        let mut response = self
            .agent
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .content_type("application/json")
            .send(body)
            .map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        debug!("portable: status {status} from {url}");

        let mut reader = response.body_mut().as_reader();
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    return Err(TransportError::Timeout(self.endpoint.timeout()))
                }
                Err(e) => return Err(TransportError::Receive(e)),
            };
            write_chunk(&mut buffer, &chunk[..n])?;
        }

        let elapsed = started.elapsed();
        info!(
            "portable: POST {url} -> {status} ({} bytes in {:.3}s)",
            buffer.len(),
            elapsed.as_secs_f64()
        );
        Ok(HttpResponse::from_buffer(buffer, status, elapsed))
    }
}

/// Append one delivered chunk to the response buffer.
fn write_chunk(buffer: &mut ResponseBuffer, chunk: &[u8]) -> Result<(), TransportError> {
    buffer.append(chunk)?;
    Ok(())
}

fn is_connect_failure(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::AddrNotAvailable
    )
}
