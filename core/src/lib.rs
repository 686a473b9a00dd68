//! # replink
//! A transport-agnostic object replication core: replicas composed of
//! chunks, chunks composed of individually dirty-tracked DataSets, and a
//! per-host manager that schedules serialized state to peers under a
//! priority-ranked byte budget, with authority migration and liveness
//! enforcement on top.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use replink_serde::{BitReader, BitWriter, Quantized, Serde, SerdeErr};

mod carrier;
mod chunk;
mod constants;
mod context;
mod dataset;
mod diff_mask;
mod dirty;
mod error;
mod events;
mod manager;
mod neighborhood;
mod peer;
mod registry;
mod replica;
mod rpc;
mod types;
mod wire;

pub use carrier::Carrier;
pub use chunk::{ChunkCore, ReplicaChunk};
pub use constants::{
    DEFAULT_BYTE_BUDGET_PER_TICK, DEFAULT_LIVENESS_MAX_SILENT_TICKS,
    DEFAULT_MIGRATION_TIMEOUT_MS, MAX_CHUNKS_PER_REPLICA, MAX_DATASETS_PER_CHUNK,
    MAX_RPCS_PER_CHUNK, REPLICA_ID_BLOCK_BITS, REPLICA_ID_BLOCK_COUNT, REPLICA_ID_BLOCK_SIZE,
};
pub use context::{
    MarshalContext, MarshalFlags, PrepareDataResult, ReplicaContext, TimeContext,
    UnmarshalContext,
};
pub use dataset::{AnyDataSet, DataSet};
pub use diff_mask::DiffMask;
pub use dirty::{DirtyChannel, DirtySender};
pub use error::ReplicaError;
pub use events::{DisconnectReason, ReplicaEvent};
pub use manager::{ReplicaManager, ReplicaManagerConfig};
pub use neighborhood::{NeighborhoodChunk, NEIGHBORHOOD_CHUNK_NAME};
pub use peer::{PeerReplicaStatus, ReplicaPeer};
pub use registry::{ChunkFactory, ChunkFactoryRegistry};
pub use replica::{MigrationState, Replica, ReplicaIdAllocator, ReplicaRef};
pub use rpc::QueuedRpc;
pub use types::{
    CapabilityFlags, PacketIndex, PeerId, Reliability, ReplicaId, ReplicaPriority, ReplicaRole,
};
pub use wire::{peek_packet_index, MessageType, PacketHeader};
