use std::{
    collections::BTreeSet,
    sync::{Arc, RwLock},
};

use crate::{
    chunk::ReplicaChunk,
    constants::{MAX_CHUNKS_PER_REPLICA, REPLICA_ID_BLOCK_BITS, REPLICA_ID_BLOCK_COUNT, REPLICA_ID_BLOCK_SIZE},
    error::ReplicaError,
    types::{CapabilityFlags, PeerId, ReplicaId, ReplicaPriority, ReplicaRole},
};

/// Shared handle to a Replica.
///
/// The manager's replica table and application code share ownership; the
/// replica is destroyed when the last handle is released after the manager
/// has removed its table entry (the Rust mapping of the original intrusive
/// AddRef/Release contract).
pub type ReplicaRef = Arc<RwLock<Replica>>;

/// Authority-transfer handshake state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    None,
    /// Old-authority side: state is frozen (no further update sends) while
    /// waiting for the new authority's ack
    AwaitingAck {
        new_authority: PeerId,
        started_ms: u64,
        /// The full-state request has been shipped and not reported lost
        request_sent: bool,
    },
    /// The handshake failed or the authority vanished; the replica is kept
    /// alive with no authority until explicitly destroyed
    Orphaned,
}

/// A network-replicated object: an aggregate of up to 64 chunks with one
/// authority peer, a bandwidth priority, and a per-replica subscriber set.
pub struct Replica {
    id: ReplicaId,
    role: ReplicaRole,
    /// Authority peer; `PeerId::INVALID` while this host is the authority
    owner: PeerId,
    priority: ReplicaPriority,
    migratable: bool,
    capabilities: CapabilityFlags,
    chunks: Vec<Box<dyn ReplicaChunk>>,
    pub(crate) subscribers: BTreeSet<PeerId>,
    pub(crate) migration: MigrationState,
    /// Set when the authority has requested destruction; the manager
    /// propagates deletion notices before dropping the table entry
    pub(crate) doomed: bool,
}

impl Replica {
    pub fn new(priority: ReplicaPriority, migratable: bool, capabilities: CapabilityFlags) -> Self {
        Self {
            id: ReplicaId::INVALID,
            role: ReplicaRole::Primary,
            owner: PeerId::INVALID,
            priority,
            migratable,
            capabilities,
            chunks: Vec::new(),
            subscribers: BTreeSet::new(),
            migration: MigrationState::None,
            doomed: false,
        }
    }

    /// Attach a chunk. Chunks attach at construction time and live for the
    /// replica's lifetime; type names must be unique within one replica.
    pub fn add_chunk(&mut self, mut chunk: Box<dyn ReplicaChunk>) -> Result<(), ReplicaError> {
        if self.chunks.len() >= MAX_CHUNKS_PER_REPLICA {
            return Err(ReplicaError::LimitExceeded {
                what: "chunk",
                count: self.chunks.len() + 1,
                limit: MAX_CHUNKS_PER_REPLICA,
            });
        }
        let name = chunk.core().type_name().to_string();
        if self.chunk_index_by_name(&name).is_some() {
            return Err(ReplicaError::DuplicateChunkName { name });
        }
        chunk.attach();
        self.chunks.push(chunk);
        Ok(())
    }

    pub fn id(&self) -> ReplicaId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ReplicaId) {
        self.id = id;
    }

    pub fn role(&self) -> ReplicaRole {
        self.role
    }

    pub(crate) fn set_role(&mut self, role: ReplicaRole, owner: PeerId) {
        self.role = role;
        self.owner = owner;
    }

    /// The authority peer, `PeerId::INVALID` when this host is authoritative
    pub fn owner(&self) -> PeerId {
        self.owner
    }

    pub fn priority(&self) -> ReplicaPriority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: ReplicaPriority) {
        self.priority = priority;
    }

    /// Read-only capability bitmask used for discovery scenarios
    pub fn get_capabilities(&self) -> CapabilityFlags {
        self.capabilities
    }

    /// Whether ownership can transfer between peers without destroying the
    /// object: requires the replica flag and every chunk's consent
    pub fn is_migratable(&self) -> bool {
        self.migratable && self.chunks.iter().all(|chunk| chunk.is_replica_migratable())
    }

    pub fn migration_state(&self) -> MigrationState {
        self.migration
    }

    pub fn is_orphaned(&self) -> bool {
        self.migration == MigrationState::Orphaned
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk(&self, index: usize) -> Option<&dyn ReplicaChunk> {
        self.chunks.get(index).map(Box::as_ref)
    }

    pub fn chunk_mut(&mut self, index: usize) -> Option<&mut (dyn ReplicaChunk + 'static)> {
        self.chunks.get_mut(index).map(Box::as_mut)
    }

    pub fn chunk_index_by_name(&self, name: &str) -> Option<usize> {
        self.chunks
            .iter()
            .position(|chunk| chunk.core().type_name() == name)
    }

    /// Typed access to a concrete chunk
    pub fn chunk_as<C: ReplicaChunk + 'static>(&self, index: usize) -> Option<&C> {
        self.chunk(index)?.as_any().downcast_ref::<C>()
    }

    pub fn chunk_as_mut<C: ReplicaChunk + 'static>(&mut self, index: usize) -> Option<&mut C> {
        self.chunk_mut(index)?.as_any_mut().downcast_mut::<C>()
    }

    pub fn subscribers(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.subscribers.iter().copied()
    }
}

/// Block-partitioned ReplicaId allocation: each host owns a contiguous
/// block of 2^25 ids selected by its host index, so hosts allocate without
/// a central coordinator. A departed host's block becomes reclaimable by
/// the session layer.
#[derive(Debug)]
pub struct ReplicaIdAllocator {
    host_index: u8,
    next_offset: u32,
}

impl ReplicaIdAllocator {
    pub fn new(host_index: u8) -> Result<Self, ReplicaError> {
        if u32::from(host_index) >= REPLICA_ID_BLOCK_COUNT {
            return Err(ReplicaError::LimitExceeded {
                what: "host index",
                count: usize::from(host_index),
                limit: REPLICA_ID_BLOCK_COUNT as usize,
            });
        }
        // offset 0 in block 0 would collide with ReplicaId::INVALID, so
        // every block starts handing out ids at offset 1
        Ok(Self {
            host_index,
            next_offset: 1,
        })
    }

    pub fn allocate(&mut self) -> Result<ReplicaId, ReplicaError> {
        if self.next_offset >= REPLICA_ID_BLOCK_SIZE {
            return Err(ReplicaError::IdBlockExhausted {
                host_index: self.host_index,
            });
        }
        let id = (u32::from(self.host_index) << REPLICA_ID_BLOCK_BITS) | self.next_offset;
        self.next_offset += 1;
        Ok(ReplicaId(id))
    }

    /// Which host block an id belongs to
    pub fn host_of(id: ReplicaId) -> u8 {
        (id.0 >> REPLICA_ID_BLOCK_BITS) as u8
    }
}
