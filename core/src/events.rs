use crate::types::{PeerId, ReplicaId};

/// Why a peer was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The application removed the peer explicitly
    Requested,
    /// Transport-level liveness failure: nothing acknowledged for the
    /// configured number of consecutive ticks
    Liveness,
}

/// Notifications surfaced to the application, drained once per frame via
/// [`ReplicaManager::drain_events`].
///
/// [`ReplicaManager::drain_events`]: crate::manager::ReplicaManager::drain_events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaEvent {
    /// A remote replica was auto-instantiated locally as a proxy
    ProxyCreated {
        replica: ReplicaId,
        authority: PeerId,
    },
    /// A replica was retired, either by its authority's deletion notice or
    /// by its authoring peer disconnecting
    ReplicaDestroyed { replica: ReplicaId },
    /// A migration handshake failed; the replica is kept alive with no
    /// authority until explicitly destroyed
    ReplicaOrphaned {
        replica: ReplicaId,
        last_authority: PeerId,
    },
    /// Authority transfer completed
    MigrationCompleted {
        replica: ReplicaId,
        new_authority: PeerId,
    },
    /// Local authority over a replica was accepted from a remote peer
    AuthorityAcquired { replica: ReplicaId },
    /// A peer is gone; every replica it authored has been retired and it
    /// has been stripped from all subscriber lists
    PeerDisconnected {
        peer: PeerId,
        reason: DisconnectReason,
    },
    /// Chunk schema fingerprints disagree; fatal for that connection
    ProtocolMismatch { peer: PeerId, replica: ReplicaId },
    /// No factory is registered for an incoming chunk type
    UnknownChunkType { peer: PeerId, name: String },
    /// A remote call arrived and was dispatched to its chunk
    RpcReceived {
        replica: ReplicaId,
        chunk: u8,
        slot: u8,
    },
}
