//! Session discovery built on the replication core itself: each host
//! announces who it is by spawning one replica carrying a
//! [`NeighborhoodChunk`], and learns about the others through the proxies
//! that appear as announcements arrive.

use std::any::Any;

use crate::{
    chunk::{ChunkCore, ReplicaChunk},
    dataset::{AnyDataSet, DataSet},
    error::ReplicaError,
    registry::ChunkFactoryRegistry,
    types::{CapabilityFlags, Reliability},
};

/// Registry name for [`NeighborhoodChunk`]
pub const NEIGHBORHOOD_CHUNK_NAME: &str = "NeighborhoodChunk";

/// A member's advertisement: its capability bitmask, a stable identity and
/// a human-readable label. All three fields change rarely and must reach
/// every peer, so they are reliable.
pub struct NeighborhoodChunk {
    core: ChunkCore,
    pub capabilities: DataSet<CapabilityFlags>,
    pub persistent_name: DataSet<String>,
    pub display_name: DataSet<String>,
}

impl NeighborhoodChunk {
    pub fn new(
        capabilities: CapabilityFlags,
        persistent_name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<Self, ReplicaError> {
        Ok(Self {
            core: ChunkCore::new(NEIGHBORHOOD_CHUNK_NAME, 3, 0)?,
            capabilities: DataSet::new(capabilities, Reliability::Reliable),
            persistent_name: DataSet::new(persistent_name.into(), Reliability::Reliable),
            display_name: DataSet::new(display_name.into(), Reliability::Reliable),
        })
    }

    /// Register the factory that instantiates incoming advertisements as
    /// proxies
    pub fn register(registry: &mut ChunkFactoryRegistry) -> Result<(), ReplicaError> {
        registry.register(NEIGHBORHOOD_CHUNK_NAME, || {
            // limits are constants, so construction cannot fail here
            let chunk = NeighborhoodChunk::new(CapabilityFlags::NONE, "", "")
                .unwrap_or_else(|_| unreachable!());
            Box::new(chunk)
        })
    }
}

impl ReplicaChunk for NeighborhoodChunk {
    fn core(&self) -> &ChunkCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ChunkCore {
        &mut self.core
    }

    fn dataset_count(&self) -> u8 {
        3
    }

    fn dataset(&self, ordinal: u8) -> &dyn AnyDataSet {
        match ordinal {
            0 => &self.capabilities,
            1 => &self.persistent_name,
            _ => &self.display_name,
        }
    }

    fn dataset_mut(&mut self, ordinal: u8) -> &mut dyn AnyDataSet {
        match ordinal {
            0 => &mut self.capabilities,
            1 => &mut self.persistent_name,
            _ => &mut self.display_name,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
