use replink_serde::SerdeErr;
use thiserror::Error;

use crate::types::{PeerId, ReplicaId};

/// Errors produced by the replication core.
///
/// Propagation policy: `Deserialization` is recovered locally (the message
/// is dropped and logged, the connection continues); `ProtocolMismatch`,
/// `MigrationTimeout` and `LivenessFailure` are surfaced to the application
/// and never silently swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicaError {
    /// Chunk field-order or declared-type mismatch between peers; fatal for
    /// that connection
    #[error("chunk '{chunk_type}' schema mismatch: local fingerprint {local:#06x}, remote {remote:#06x}")]
    ProtocolMismatch {
        chunk_type: String,
        local: u16,
        remote: u16,
    },

    /// Truncated or corrupt buffer; the message is dropped, the connection
    /// continues
    #[error("failed to decode replication payload: {0}")]
    Deserialization(#[from] SerdeErr),

    /// Migration handshake expired without an acknowledgement from the new
    /// authority
    #[error("migration of replica {replica:?} to peer {peer:?} timed out after {elapsed_ms}ms")]
    MigrationTimeout {
        replica: ReplicaId,
        peer: PeerId,
        elapsed_ms: u64,
    },

    /// Peer presumed disconnected after consecutive silent ticks
    #[error("peer {peer:?} acknowledged nothing for {silent_ticks} consecutive ticks")]
    LivenessFailure { peer: PeerId, silent_ticks: u8 },

    /// Payload carried data past the last message and forward compatibility
    /// was not negotiated
    #[error("payload from peer {peer:?} carries {trailing_bits} unexpected trailing bits")]
    TrailingData { peer: PeerId, trailing_bits: usize },

    /// No factory registered for an incoming chunk type name
    #[error("no chunk factory registered for type '{name}'")]
    UnknownChunkType { name: String },

    /// A factory was registered twice under the same name
    #[error("chunk factory '{name}' is already registered")]
    DuplicateChunkType { name: String },

    /// Replica is not known to this manager
    #[error("replica {replica:?} is not known to this manager")]
    UnknownReplica { replica: ReplicaId },

    /// Peer is not known to this manager
    #[error("peer {peer:?} is not known to this manager")]
    UnknownPeer { peer: PeerId },

    /// Operation requires local authority over the replica
    #[error("replica {replica:?} is not under local authority")]
    NotAuthority { replica: ReplicaId },

    /// Replica or one of its chunks refuses ownership transfer
    #[error("replica {replica:?} is not migratable")]
    NotMigratable { replica: ReplicaId },

    /// A second migration was requested while one is already in flight
    #[error("replica {replica:?} already has a migration handshake in flight")]
    MigrationPending { replica: ReplicaId },

    /// A replica must carry at least one chunk before it can be spawned
    #[error("replica has no chunks attached")]
    EmptyReplica,

    /// Declared structure exceeds a protocol limit
    #[error("{what} count {count} exceeds protocol limit {limit}")]
    LimitExceeded {
        what: &'static str,
        count: usize,
        limit: usize,
    },

    /// Two chunks with the same type name attached to one replica
    #[error("chunk type '{name}' attached twice to one replica")]
    DuplicateChunkName { name: String },

    /// This host's id block has no ids left
    #[error("replica id block for host {host_index} is exhausted")]
    IdBlockExhausted { host_index: u8 },

    /// A shared lock was poisoned by a panicking writer
    #[error("replication state lock was poisoned")]
    LockPoisoned,
}
