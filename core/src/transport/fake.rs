//! Scripted transport for tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Instant;

use super::Transport;
use crate::buffer::ResponseBuffer;
use crate::error::TransportError;
use crate::http::HttpResponse;

enum Scripted {
    Reply { status: u16, chunks: Vec<Vec<u8>> },
    Fail(TransportError),
}

/// Replays queued replies in order and records every posted body.
///
/// Reply chunks are appended to a `ResponseBuffer` one at a time, the same
/// way a real backend delivers them. An empty queue fails with
/// `TransportError::Backend`.
#[derive(Default)]
pub struct FakeTransport {
    script: RefCell<VecDeque<Scripted>>,
    posted: RefCell<Vec<Vec<u8>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply whose body arrives as `chunks`.
    pub fn reply<I, C>(self, status: u16, chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        let chunks = chunks.into_iter().map(|c| c.as_ref().to_vec()).collect();
        self.script
            .borrow_mut()
            .push_back(Scripted::Reply { status, chunks });
        self
    }

    /// Queue a failure.
    pub fn fail(self, err: TransportError) -> Self {
        self.script.borrow_mut().push_back(Scripted::Fail(err));
        self
    }

    /// Bodies received so far, oldest first.
    pub fn posted(&self) -> Vec<Vec<u8>> {
        self.posted.borrow().clone()
    }
}

impl Transport for FakeTransport {
    fn post(&self, body: &[u8]) -> Result<HttpResponse, TransportError> {
        let started = Instant::now();
        self.posted.borrow_mut().push(body.to_vec());

        let next = self.script.borrow_mut().pop_front();
        match next {
            Some(Scripted::Reply { status, chunks }) => {
                let mut buffer = ResponseBuffer::new()?;
                for chunk in &chunks {
                    buffer.append(chunk)?;
                }
                Ok(HttpResponse::from_buffer(buffer, status, started.elapsed()))
            }
            Some(Scripted::Fail(err)) => Err(err),
            None => Err(TransportError::Backend("no scripted reply left".to_string())),
        }
    }
}
