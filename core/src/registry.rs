use std::collections::HashMap;

use crate::{chunk::ReplicaChunk, error::ReplicaError};

/// Constructor for one chunk type, invoked when an unknown incoming
/// ReplicaId must be auto-instantiated as a proxy
pub type ChunkFactory = Box<dyn Fn() -> Box<dyn ReplicaChunk> + Send>;

/// Explicit chunk-type name → factory map.
///
/// Replaces the original bus-style dynamic dispatch with a plain registry
/// owned by the manager, so independent replication domains can coexist.
#[derive(Default)]
pub struct ChunkFactoryRegistry {
    factories: HashMap<String, ChunkFactory>,
}

impl ChunkFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn ReplicaChunk> + Send + 'static,
    ) -> Result<(), ReplicaError> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(ReplicaError::DuplicateChunkType { name });
        }
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Construct and attach a fresh chunk of the named type
    pub fn create(&self, name: &str) -> Result<Box<dyn ReplicaChunk>, ReplicaError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ReplicaError::UnknownChunkType {
                name: name.to_string(),
            })?;
        let mut chunk = factory();
        chunk.attach();
        Ok(chunk)
    }
}
