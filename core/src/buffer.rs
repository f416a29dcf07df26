//! Append-only byte accumulator for response bodies.
//!
//! # Design
//! Capacity starts at `INITIAL_CAPACITY` and doubles until an append fits
//! with one byte to spare, so the stored bytes are always followed by a NUL
//! terminator. Growth goes through `try_reserve_exact` so an allocation
//! failure comes back as `BufferError` instead of aborting the process.
//! `into_bytes` moves the storage out; the buffer cannot be used afterwards.

use crate::error::BufferError;

/// Capacity of a freshly created buffer.
pub const INITIAL_CAPACITY: usize = 4096;

/// Growable, NUL-terminated byte buffer.
#[derive(Debug)]
pub struct ResponseBuffer {
    // Holds the content followed by exactly one trailing 0 byte.
    data: Vec<u8>,
    capacity: usize,
}

impl ResponseBuffer {
    pub fn new() -> Result<Self, BufferError> {
        let mut data = Vec::new();
        data.try_reserve_exact(INITIAL_CAPACITY)
            .map_err(|_| BufferError::Allocation {
                requested: INITIAL_CAPACITY,
            })?;
        data.push(0);
        Ok(Self {
            data,
            capacity: INITIAL_CAPACITY,
        })
    }

    /// Append `bytes`, doubling capacity as many times as needed.
    ///
    /// On failure the content is unchanged.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        let size = self.len();
        let needed = size
            .checked_add(bytes.len())
            .ok_or(BufferError::Allocation { requested: usize::MAX })?;

        let mut capacity = self.capacity;
        while needed >= capacity {
            capacity = capacity
                .checked_mul(2)
                .ok_or(BufferError::Allocation { requested: usize::MAX })?;
        }

        if capacity != self.capacity {
            let additional = capacity - self.data.len();
            self.data
                .try_reserve_exact(additional)
                .map_err(|_| BufferError::Allocation { requested: capacity })?;
            self.capacity = capacity;
        }

        self.data.pop();
        self.data.extend_from_slice(bytes);
        self.data.push(0);
        Ok(())
    }

    /// Number of content bytes, excluding the terminator.
    pub fn len(&self) -> usize {
        self.data.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Content bytes without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    /// Content bytes including the trailing NUL.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.data
    }

    /// Move the content out of the buffer without copying it.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.data.pop();
        self.data
    }
}
