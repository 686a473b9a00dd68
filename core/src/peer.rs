use std::collections::{HashMap, HashSet};

use crate::{
    rpc::QueuedRpc,
    types::{PacketIndex, PeerId, ReplicaId},
};

/// Replication status of one replica relative to one peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerReplicaStatus {
    /// Full-state announcement not yet acknowledged; updates are withheld
    PendingCreate { in_flight: Option<PacketIndex> },
    Active,
    /// Deletion notice not yet acknowledged
    Destroying { in_flight: Option<PacketIndex> },
}

/// What an in-flight reliable packet was carrying, so delivery and drop
/// notifications can be routed back to the state they concern
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PacketPurpose {
    Create(ReplicaId),
    Update(ReplicaId),
    Destroy(ReplicaId),
    MigrationRequest(ReplicaId),
    MigrationAck(ReplicaId),
    /// Carries the queued call so a drop can re-queue it
    Rpc(ReplicaId, u8, QueuedRpc),
}

/// Per-connection state the manager keeps for one remote peer: what each
/// replica looks like from that peer's point of view, which reliable
/// packets are still in flight, and how long the peer has been silent.
pub struct ReplicaPeer {
    id: PeerId,
    next_packet_index: PacketIndex,
    pub(crate) statuses: HashMap<ReplicaId, PeerReplicaStatus>,
    /// Reliable packets awaiting a transport delivery notification
    pub(crate) outstanding_reliable: HashSet<PacketIndex>,
    pub(crate) in_flight: HashMap<PacketIndex, PacketPurpose>,
    /// Remote calls drained from chunk queues, awaiting send (or re-send
    /// after a drop notification)
    pub(crate) pending_rpcs: Vec<(ReplicaId, u8, QueuedRpc)>,
    pub(crate) acked_since_last_tick: bool,
    pub(crate) silent_ticks: u8,
    byte_budget: Option<usize>,
}

impl ReplicaPeer {
    pub(crate) fn new(id: PeerId) -> Self {
        Self {
            id,
            next_packet_index: 0,
            statuses: HashMap::new(),
            outstanding_reliable: HashSet::new(),
            in_flight: HashMap::new(),
            pending_rpcs: Vec::new(),
            acked_since_last_tick: false,
            silent_ticks: 0,
            byte_budget: None,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Override the manager-wide per-tick byte budget for this peer
    pub fn set_byte_budget(&mut self, budget: Option<usize>) {
        self.byte_budget = budget;
    }

    pub(crate) fn budget_for_tick(&self, default: usize) -> usize {
        self.byte_budget.unwrap_or(default)
    }

    pub(crate) fn next_packet(&mut self) -> PacketIndex {
        let index = self.next_packet_index;
        self.next_packet_index = self.next_packet_index.wrapping_add(1);
        index
    }

    pub(crate) fn track_reliable(&mut self, index: PacketIndex, purpose: PacketPurpose) {
        self.outstanding_reliable.insert(index);
        self.in_flight.insert(index, purpose);
    }

    /// Transport says this packet arrived
    pub(crate) fn on_delivered(&mut self, index: PacketIndex) -> Option<PacketPurpose> {
        self.acked_since_last_tick = true;
        self.outstanding_reliable.remove(&index);
        self.in_flight.remove(&index)
    }

    /// Transport says this packet was lost. A drop notification is not an
    /// acknowledgement and does not reset the silence counter.
    pub(crate) fn on_dropped(&mut self, index: PacketIndex) -> Option<PacketPurpose> {
        self.outstanding_reliable.remove(&index);
        self.in_flight.remove(&index)
    }

    pub(crate) fn status(&self, replica: ReplicaId) -> Option<PeerReplicaStatus> {
        self.statuses.get(&replica).copied()
    }

    /// Discard every piece of pending work concerning a replica: nothing is
    /// retried once the replica is gone from this peer's view
    pub(crate) fn forget_replica(&mut self, replica: ReplicaId) {
        self.statuses.remove(&replica);
        self.in_flight.retain(|_, purpose| {
            !matches!(purpose,
                PacketPurpose::Create(tracked)
                | PacketPurpose::Update(tracked)
                | PacketPurpose::Destroy(tracked)
                | PacketPurpose::MigrationRequest(tracked)
                | PacketPurpose::MigrationAck(tracked)
                | PacketPurpose::Rpc(tracked, _, _) if *tracked == replica)
        });
        self.pending_rpcs.retain(|(tracked, _, _)| *tracked != replica);
    }
}
