//! In-memory list of known models.
//!
//! The list is not discovered from the server; `with_placeholder_models`
//! seeds the three models the bridge ships with. Names are not required to
//! be unique. Growth doubles capacity, starting from `INITIAL_CAPACITY`.

use serde::{Deserialize, Serialize};

use crate::error::BufferError;

pub const INITIAL_CAPACITY: usize = 10;

/// A model descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    pub loaded: bool,
}

#[derive(Debug)]
pub struct ModelRegistry {
    models: Vec<Model>,
    /// Logical capacity; the allocator may hand back more.
    capacity: usize,
}

impl ModelRegistry {
    pub fn new() -> Result<Self, BufferError> {
        let mut models = Vec::new();
        models
            .try_reserve_exact(INITIAL_CAPACITY)
            .map_err(|_| BufferError::Allocation {
                requested: INITIAL_CAPACITY,
            })?;
        Ok(Self {
            models,
            capacity: INITIAL_CAPACITY,
        })
    }

    pub fn with_placeholder_models() -> Result<Self, BufferError> {
        let mut registry = Self::new()?;
        registry.add("deepseek-r1:1.5b", 1_500_000_000)?;
        registry.add("llama3.2:3b", 3_000_000_000)?;
        registry.add("qwen2.5:3b", 3_000_000_000)?;
        Ok(registry)
    }

    /// Append a model that is not yet loaded.
    pub fn add(&mut self, name: &str, size_bytes: u64) -> Result<(), BufferError> {
        if self.models.len() == self.capacity {
            let target = self
                .capacity
                .checked_mul(2)
                .ok_or(BufferError::Allocation { requested: usize::MAX })?;
            self.models
                .try_reserve_exact(target - self.models.len())
                .map_err(|_| BufferError::Allocation { requested: target })?;
            self.capacity = target;
        }
        self.models.push(Model {
            name: name.to_string(),
            size_bytes,
            loaded: false,
        });
        Ok(())
    }

    /// First model with `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Model> {
        self.models.iter()
    }

    pub fn as_slice(&self) -> &[Model] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
