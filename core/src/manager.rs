use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use log::{error, info, warn};
use replink_serde::{BitReader, BitWriter, Serde};

use crate::{
    carrier::Carrier,
    constants::{
        DEFAULT_BYTE_BUDGET_PER_TICK, DEFAULT_LIVENESS_MAX_SILENT_TICKS,
        DEFAULT_MIGRATION_TIMEOUT_MS,
    },
    context::{MarshalContext, MarshalFlags, ReplicaContext, TimeContext, UnmarshalContext},
    diff_mask::DiffMask,
    error::ReplicaError,
    events::{DisconnectReason, ReplicaEvent},
    peer::{PacketPurpose, PeerReplicaStatus, ReplicaPeer},
    registry::ChunkFactoryRegistry,
    replica::{MigrationState, Replica, ReplicaIdAllocator, ReplicaRef},
    rpc::QueuedRpc,
    types::{CapabilityFlags, PacketIndex, PeerId, Reliability, ReplicaId, ReplicaPriority, ReplicaRole},
    wire::{MessageType, PacketHeader},
};

/// Tuning knobs for one [`ReplicaManager`]
#[derive(Debug, Clone)]
pub struct ReplicaManagerConfig {
    /// Which ReplicaId allocation block this host draws from (0..128)
    pub host_index: u8,
    /// Serialized-byte budget applied per peer per tick, overridable per
    /// peer via [`ReplicaPeer::set_byte_budget`]
    pub byte_budget_per_tick: usize,
    /// Consecutive silent ticks before a peer is presumed disconnected
    pub liveness_max_silent_ticks: u8,
    /// How long a migration handshake may wait for its ack
    pub migration_timeout_ms: u64,
    /// Accept payloads carrying trailing data, for sessions negotiated with
    /// a newer protocol revision
    pub forward_compatible: bool,
}

impl Default for ReplicaManagerConfig {
    fn default() -> Self {
        Self {
            host_index: 0,
            byte_budget_per_tick: DEFAULT_BYTE_BUDGET_PER_TICK,
            liveness_max_silent_ticks: DEFAULT_LIVENESS_MAX_SILENT_TICKS,
            migration_timeout_ms: DEFAULT_MIGRATION_TIMEOUT_MS,
            forward_compatible: false,
        }
    }
}

/// Whether an incoming payload was applied or discarded. Discarded payloads
/// skip the trailing-data check because parsing stopped early on purpose.
enum Disposition {
    Consumed,
    Dropped,
}

/// The per-host replication hub.
///
/// Owns the replica table, per-peer connection state and the chunk factory
/// registry. The application drives it from its network loop:
///
/// 1. feed incoming payloads to [`receive`](Self::receive),
/// 2. call [`tick`](Self::tick) once per frame to flush dirty state through
///    a [`Carrier`],
/// 3. report transport delivery outcomes via
///    [`notify_packet_delivered`](Self::notify_packet_delivered) and
///    [`notify_packet_dropped`](Self::notify_packet_dropped),
/// 4. drain application-facing notifications from
///    [`drain_events`](Self::drain_events).
pub struct ReplicaManager {
    config: ReplicaManagerConfig,
    allocator: ReplicaIdAllocator,
    registry: ChunkFactoryRegistry,
    replicas: HashMap<ReplicaId, ReplicaRef>,
    peers: HashMap<PeerId, ReplicaPeer>,
    /// Acks owed to old authorities, flushed on the next tick
    pending_migration_acks: Vec<(PeerId, ReplicaId)>,
    events: Vec<ReplicaEvent>,
    now: TimeContext,
}

impl ReplicaManager {
    pub fn new(
        config: ReplicaManagerConfig,
        registry: ChunkFactoryRegistry,
    ) -> Result<Self, ReplicaError> {
        let allocator = ReplicaIdAllocator::new(config.host_index)?;
        Ok(Self {
            config,
            allocator,
            registry,
            replicas: HashMap::new(),
            peers: HashMap::new(),
            pending_migration_acks: Vec::new(),
            events: Vec::new(),
            now: TimeContext::default(),
        })
    }

    pub fn registry_mut(&mut self) -> &mut ChunkFactoryRegistry {
        &mut self.registry
    }

    pub fn replica(&self, id: ReplicaId) -> Option<ReplicaRef> {
        self.replicas.get(&id).cloned()
    }

    pub fn replica_ids(&self) -> impl Iterator<Item = ReplicaId> + '_ {
        self.replicas.keys().copied()
    }

    pub fn peer_mut(&mut self, peer: PeerId) -> Option<&mut ReplicaPeer> {
        self.peers.get_mut(&peer)
    }

    /// Take the notifications accumulated since the last drain
    pub fn drain_events(&mut self) -> Vec<ReplicaEvent> {
        std::mem::take(&mut self.events)
    }

    /// Register a peer. Every locally-owned replica is scheduled for a
    /// full-state announcement on the next tick. Idempotent.
    pub fn add_peer(&mut self, peer_id: PeerId) -> Result<(), ReplicaError> {
        if !peer_id.is_valid() {
            return Err(ReplicaError::UnknownPeer { peer: peer_id });
        }
        if self.peers.contains_key(&peer_id) {
            return Ok(());
        }
        let mut peer = ReplicaPeer::new(peer_id);
        for (id, replica) in &self.replicas {
            let mut guard = replica.write().map_err(|_| ReplicaError::LockPoisoned)?;
            if guard.role() != ReplicaRole::Primary || guard.doomed {
                continue;
            }
            subscribe(&mut guard, peer_id)?;
            peer.statuses
                .insert(*id, PeerReplicaStatus::PendingCreate { in_flight: None });
        }
        self.peers.insert(peer_id, peer);
        Ok(())
    }

    /// Remove a peer at the application's request, discarding everything
    /// queued for it
    pub fn remove_peer(&mut self, peer_id: PeerId) -> Result<(), ReplicaError> {
        if !self.peers.contains_key(&peer_id) {
            return Err(ReplicaError::UnknownPeer { peer: peer_id });
        }
        self.retire_peer(peer_id, DisconnectReason::Requested)
    }

    /// Register a locally-authored replica. Assigns it an id from this
    /// host's block and schedules full-state announcements to every known
    /// peer.
    pub fn spawn(&mut self, mut replica: Replica) -> Result<ReplicaRef, ReplicaError> {
        if replica.chunk_count() == 0 {
            return Err(ReplicaError::EmptyReplica);
        }
        let id = self.allocator.allocate()?;
        replica.set_id(id);
        replica.set_role(ReplicaRole::Primary, PeerId::INVALID);
        for (peer_id, peer) in &mut self.peers {
            subscribe(&mut replica, *peer_id)?;
            peer.statuses
                .insert(id, PeerReplicaStatus::PendingCreate { in_flight: None });
        }
        let shared = Arc::new(RwLock::new(replica));
        self.replicas.insert(id, shared.clone());
        Ok(shared)
    }

    /// Retire a replica under local authority (or an orphan). Peers that
    /// already saw it receive a reliable deletion notice before the table
    /// entry is dropped.
    pub fn destroy(&mut self, id: ReplicaId) -> Result<(), ReplicaError> {
        let replica = self
            .replicas
            .get(&id)
            .cloned()
            .ok_or(ReplicaError::UnknownReplica { replica: id })?;
        {
            let mut guard = replica.write().map_err(|_| ReplicaError::LockPoisoned)?;
            if guard.role() != ReplicaRole::Primary && !guard.is_orphaned() {
                return Err(ReplicaError::NotAuthority { replica: id });
            }
            guard.doomed = true;
        }
        for peer in self.peers.values_mut() {
            match peer.status(id) {
                // never announced, nothing to retract
                Some(PeerReplicaStatus::PendingCreate { in_flight: None }) => {
                    peer.forget_replica(id);
                }
                Some(PeerReplicaStatus::PendingCreate { in_flight: Some(_) })
                | Some(PeerReplicaStatus::Active) => {
                    peer.statuses
                        .insert(id, PeerReplicaStatus::Destroying { in_flight: None });
                }
                Some(PeerReplicaStatus::Destroying { .. }) | None => {}
            }
        }
        self.finalize_doomed(id)
    }

    /// Offer authority over `id` to `new_authority`. The replica's state
    /// freezes until the handshake resolves; the full-state request goes out
    /// on the next tick.
    pub fn begin_migration(
        &mut self,
        id: ReplicaId,
        new_authority: PeerId,
    ) -> Result<(), ReplicaError> {
        if !self.peers.contains_key(&new_authority) {
            return Err(ReplicaError::UnknownPeer {
                peer: new_authority,
            });
        }
        let replica = self
            .replicas
            .get(&id)
            .ok_or(ReplicaError::UnknownReplica { replica: id })?;
        let mut guard = replica.write().map_err(|_| ReplicaError::LockPoisoned)?;
        if guard.role() != ReplicaRole::Primary || guard.doomed {
            return Err(ReplicaError::NotAuthority { replica: id });
        }
        if !guard.is_migratable() {
            return Err(ReplicaError::NotMigratable { replica: id });
        }
        if guard.migration != MigrationState::None {
            return Err(ReplicaError::MigrationPending { replica: id });
        }
        guard.migration = MigrationState::AwaitingAck {
            new_authority,
            started_ms: self.now.elapsed_ms,
            request_sent: false,
        };
        Ok(())
    }

    /// Apply one incoming payload from `from`.
    ///
    /// Undecodable payloads are logged and dropped without failing the
    /// connection; schema mismatches are surfaced both as an error and a
    /// [`ReplicaEvent::ProtocolMismatch`].
    pub fn receive(&mut self, from: PeerId, payload: &[u8]) -> Result<(), ReplicaError> {
        if !self.peers.contains_key(&from) {
            return Err(ReplicaError::UnknownPeer { peer: from });
        }
        let mut reader = BitReader::new(payload);
        match self.dispatch(from, &mut reader) {
            Ok(Disposition::Consumed) => {
                let trailing = reader.bits_remaining();
                if !self.config.forward_compatible && trailing >= 8 {
                    warn!(
                        "payload from peer {:?} carries {} trailing bits",
                        from, trailing
                    );
                    return Err(ReplicaError::TrailingData {
                        peer: from,
                        trailing_bits: trailing,
                    });
                }
                Ok(())
            }
            Ok(Disposition::Dropped) => Ok(()),
            Err(ReplicaError::Deserialization(err)) => {
                warn!("dropping undecodable payload from peer {:?}: {}", from, err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn dispatch(
        &mut self,
        from: PeerId,
        reader: &mut BitReader,
    ) -> Result<Disposition, ReplicaError> {
        let header = PacketHeader::de(reader)?;
        match header.message {
            MessageType::CreateReplica => self.on_create(from, header.replica, reader),
            MessageType::UpdateReplica => self.on_update(from, header.replica, reader),
            MessageType::DestroyReplica => self.on_destroy(from, header.replica),
            MessageType::MigrationRequest => {
                self.on_migration_request(from, header.replica, reader)
            }
            MessageType::MigrationAck => self.on_migration_ack(from, header.replica),
            MessageType::Rpc => self.on_rpc(from, header.replica, reader),
        }
    }

    /// Decode the full-state body shared by create and migration-request
    /// packets into a fresh, unregistered replica
    fn decode_full_state(
        &mut self,
        from: PeerId,
        id: ReplicaId,
        reader: &mut BitReader,
    ) -> Result<Option<Replica>, ReplicaError> {
        let priority = ReplicaPriority::de(reader)?;
        let migratable = reader.read_bit().map_err(ReplicaError::from)?;
        let capabilities = CapabilityFlags::de(reader)?;
        let chunk_count = u8::de(reader)?;
        let mut replica = Replica::new(priority, migratable, capabilities);
        for _ in 0..chunk_count {
            let name = String::de(reader)?;
            let mut chunk = match self.registry.create(&name) {
                Ok(chunk) => chunk,
                Err(ReplicaError::UnknownChunkType { name }) => {
                    warn!(
                        "peer {:?} announced replica {:?} with unregistered chunk type '{}'",
                        from, id, name
                    );
                    self.events
                        .push(ReplicaEvent::UnknownChunkType { peer: from, name });
                    return Ok(None);
                }
                Err(err) => return Err(err),
            };
            let mut ctx = UnmarshalContext {
                peer: from,
                time: self.now,
                is_ctor_data: true,
                reader: &mut *reader,
            };
            match chunk.unmarshal_from_buffer(&mut ctx) {
                Ok(()) => {}
                Err(err @ ReplicaError::ProtocolMismatch { .. }) => {
                    error!("{}", err);
                    self.events
                        .push(ReplicaEvent::ProtocolMismatch { peer: from, replica: id });
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
            replica.add_chunk(chunk)?;
        }
        Ok(Some(replica))
    }

    /// Apply the full-state body of a create or migration-request onto a
    /// replica whose chunks already exist locally
    fn apply_snapshot(
        &mut self,
        from: PeerId,
        id: ReplicaId,
        guard: &mut Replica,
        reader: &mut BitReader,
    ) -> Result<Disposition, ReplicaError> {
        let priority = ReplicaPriority::de(reader)?;
        guard.set_priority(priority);
        let _migratable = reader.read_bit().map_err(ReplicaError::from)?;
        let _capabilities = CapabilityFlags::de(reader)?;
        let chunk_count = u8::de(reader)?;
        for _ in 0..chunk_count {
            let name = String::de(reader)?;
            let Some(index) = guard.chunk_index_by_name(&name) else {
                warn!(
                    "snapshot for replica {:?} names unknown chunk '{}'",
                    id, name
                );
                return Ok(Disposition::Dropped);
            };
            let Some(chunk) = guard.chunk_mut(index) else {
                return Ok(Disposition::Dropped);
            };
            let mut ctx = UnmarshalContext {
                peer: from,
                time: self.now,
                is_ctor_data: true,
                reader: &mut *reader,
            };
            match chunk.unmarshal_from_buffer(&mut ctx) {
                Ok(()) => {}
                Err(err @ ReplicaError::ProtocolMismatch { .. }) => {
                    error!("{}", err);
                    self.events
                        .push(ReplicaEvent::ProtocolMismatch { peer: from, replica: id });
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(Disposition::Consumed)
    }

    fn on_create(
        &mut self,
        from: PeerId,
        id: ReplicaId,
        reader: &mut BitReader,
    ) -> Result<Disposition, ReplicaError> {
        if let Some(replica) = self.replicas.get(&id).cloned() {
            let mut guard = replica.write().map_err(|_| ReplicaError::LockPoisoned)?;
            if guard.role() == ReplicaRole::Primary {
                warn!(
                    "peer {:?} announced replica {:?} this host is authoritative for",
                    from, id
                );
                return Ok(Disposition::Dropped);
            }
            // a repeated announcement names the current authority; after a
            // migration this host was not part of, it names the new one
            let previous = guard.owner();
            if let Disposition::Dropped = self.apply_snapshot(from, id, &mut guard, reader)? {
                return Ok(Disposition::Dropped);
            }
            if previous != from {
                guard.migration = MigrationState::None;
                guard.set_role(ReplicaRole::Proxy, from);
                self.events.push(ReplicaEvent::MigrationCompleted {
                    replica: id,
                    new_authority: from,
                });
            }
            return Ok(Disposition::Consumed);
        }
        let Some(mut replica) = self.decode_full_state(from, id, reader)? else {
            return Ok(Disposition::Dropped);
        };
        replica.set_id(id);
        replica.set_role(ReplicaRole::Proxy, from);
        self.replicas.insert(id, Arc::new(RwLock::new(replica)));
        self.events.push(ReplicaEvent::ProxyCreated {
            replica: id,
            authority: from,
        });
        Ok(Disposition::Consumed)
    }

    fn on_update(
        &mut self,
        from: PeerId,
        id: ReplicaId,
        reader: &mut BitReader,
    ) -> Result<Disposition, ReplicaError> {
        let Some(replica) = self.replicas.get(&id).cloned() else {
            warn!("update for unknown replica {:?} from peer {:?}", id, from);
            return Ok(Disposition::Dropped);
        };
        let mut guard = replica.write().map_err(|_| ReplicaError::LockPoisoned)?;
        if guard.owner() != from {
            warn!(
                "peer {:?} sent an update for replica {:?} it has no authority over",
                from, id
            );
            return Ok(Disposition::Dropped);
        }
        // walk the whole body before applying any of it; a payload
        // truncated inside a later entry must not leave earlier entries
        // applied
        {
            let mut lookahead = reader.clone();
            let entries = u8::de(&mut lookahead)?;
            for _ in 0..entries {
                let index = lookahead.read_bits(6).map_err(ReplicaError::from)? as usize;
                let Some(chunk) = guard.chunk(index) else {
                    warn!(
                        "update for replica {:?} references chunk index {} out of range",
                        id, index
                    );
                    return Ok(Disposition::Dropped);
                };
                chunk.dry_unmarshal(&mut lookahead)?;
            }
        }
        let entries = u8::de(reader)?;
        for _ in 0..entries {
            let index = reader.read_bits(6).map_err(ReplicaError::from)? as usize;
            let Some(chunk) = guard.chunk_mut(index) else {
                return Ok(Disposition::Dropped);
            };
            let mut ctx = UnmarshalContext {
                peer: from,
                time: self.now,
                is_ctor_data: false,
                reader: &mut *reader,
            };
            chunk.unmarshal_from_buffer(&mut ctx)?;
        }
        Ok(Disposition::Consumed)
    }

    fn on_destroy(&mut self, from: PeerId, id: ReplicaId) -> Result<Disposition, ReplicaError> {
        let Some(replica) = self.replicas.get(&id).cloned() else {
            warn!("destroy for unknown replica {:?} from peer {:?}", id, from);
            return Ok(Disposition::Dropped);
        };
        {
            let guard = replica.read().map_err(|_| ReplicaError::LockPoisoned)?;
            if guard.owner() != from {
                warn!(
                    "peer {:?} sent a destroy for replica {:?} it has no authority over",
                    from, id
                );
                return Ok(Disposition::Dropped);
            }
        }
        self.replicas.remove(&id);
        for peer in self.peers.values_mut() {
            peer.forget_replica(id);
        }
        self.events.push(ReplicaEvent::ReplicaDestroyed { replica: id });
        Ok(Disposition::Consumed)
    }

    fn on_migration_request(
        &mut self,
        from: PeerId,
        id: ReplicaId,
        reader: &mut BitReader,
    ) -> Result<Disposition, ReplicaError> {
        if let Some(replica) = self.replicas.get(&id).cloned() {
            let mut guard = replica.write().map_err(|_| ReplicaError::LockPoisoned)?;
            if guard.owner() != from {
                warn!(
                    "peer {:?} offered migration of replica {:?} it has no authority over",
                    from, id
                );
                return Ok(Disposition::Dropped);
            }
            // apply the frozen snapshot onto the proxy, then promote it
            if let Disposition::Dropped = self.apply_snapshot(from, id, &mut guard, reader)? {
                return Ok(Disposition::Dropped);
            }
            guard.set_role(ReplicaRole::Primary, PeerId::INVALID);
            guard.migration = MigrationState::None;
            // the whole session now looks to this host for updates. The old
            // authority already holds current state; everyone else gets a
            // fresh announcement and adopts this host as the authority
            // from it.
            for (peer_id, peer) in &mut self.peers {
                subscribe(&mut guard, *peer_id)?;
                let status = if *peer_id == from {
                    PeerReplicaStatus::Active
                } else {
                    PeerReplicaStatus::PendingCreate { in_flight: None }
                };
                peer.statuses.entry(id).or_insert(status);
            }
        } else {
            // the offer can precede the announcement; accept it as a create
            // that lands under local authority
            let Some(mut replica) = self.decode_full_state(from, id, reader)? else {
                return Ok(Disposition::Dropped);
            };
            replica.set_id(id);
            replica.set_role(ReplicaRole::Primary, PeerId::INVALID);
            for (peer_id, peer) in &mut self.peers {
                subscribe(&mut replica, *peer_id)?;
                let status = if *peer_id == from {
                    PeerReplicaStatus::Active
                } else {
                    PeerReplicaStatus::PendingCreate { in_flight: None }
                };
                peer.statuses.insert(id, status);
            }
            self.replicas.insert(id, Arc::new(RwLock::new(replica)));
        }
        self.pending_migration_acks.push((from, id));
        self.events.push(ReplicaEvent::AuthorityAcquired { replica: id });
        Ok(Disposition::Consumed)
    }

    fn on_migration_ack(
        &mut self,
        from: PeerId,
        id: ReplicaId,
    ) -> Result<Disposition, ReplicaError> {
        let Some(replica) = self.replicas.get(&id).cloned() else {
            warn!("migration ack for unknown replica {:?}", id);
            return Ok(Disposition::Dropped);
        };
        let mut guard = replica.write().map_err(|_| ReplicaError::LockPoisoned)?;
        match guard.migration {
            MigrationState::AwaitingAck { new_authority, .. } if new_authority == from => {
                guard.migration = MigrationState::None;
                guard.set_role(ReplicaRole::Proxy, from);
                // this host stops sending for the replica entirely
                let subscribers: Vec<PeerId> = guard.subscribers().collect();
                for peer_id in subscribers {
                    unsubscribe(&mut guard, peer_id)?;
                }
                drop(guard);
                for peer in self.peers.values_mut() {
                    peer.forget_replica(id);
                }
                self.events.push(ReplicaEvent::MigrationCompleted {
                    replica: id,
                    new_authority: from,
                });
                Ok(Disposition::Consumed)
            }
            _ => {
                warn!(
                    "unexpected migration ack for replica {:?} from peer {:?}",
                    id, from
                );
                Ok(Disposition::Dropped)
            }
        }
    }

    fn on_rpc(
        &mut self,
        from: PeerId,
        id: ReplicaId,
        reader: &mut BitReader,
    ) -> Result<Disposition, ReplicaError> {
        let chunk_index = reader.read_bits(6).map_err(ReplicaError::from)? as usize;
        let slot = reader.read_bits(5).map_err(ReplicaError::from)? as u8;
        let payload = Vec::<u8>::de(reader)?;
        let Some(replica) = self.replicas.get(&id).cloned() else {
            warn!("rpc for unknown replica {:?} from peer {:?}", id, from);
            return Ok(Disposition::Dropped);
        };
        let mut guard = replica.write().map_err(|_| ReplicaError::LockPoisoned)?;
        let role = guard.role();
        let allowed = match role {
            // upstream calls may only come from peers that see the replica
            ReplicaRole::Primary => guard.subscribers.contains(&from),
            // downstream calls only from the authority
            ReplicaRole::Proxy => guard.owner() == from,
        };
        if !allowed {
            warn!(
                "peer {:?} sent an rpc for replica {:?} outside its role",
                from, id
            );
            return Ok(Disposition::Dropped);
        }
        let ctx = ReplicaContext {
            peer: from,
            time: self.now,
            role,
        };
        let Some(chunk) = guard.chunk_mut(chunk_index) else {
            warn!(
                "rpc for replica {:?} references chunk index {} out of range",
                id, chunk_index
            );
            return Ok(Disposition::Dropped);
        };
        if slot >= chunk.core().rpc_slots() {
            warn!(
                "rpc slot {} out of range for chunk '{}'",
                slot,
                chunk.core().type_name()
            );
            return Ok(Disposition::Dropped);
        }
        chunk.on_rpc(slot, &payload, &ctx);
        self.events.push(ReplicaEvent::RpcReceived {
            replica: id,
            chunk: chunk_index as u8,
            slot,
        });
        Ok(Disposition::Consumed)
    }

    /// Transport confirmed delivery of a reliable packet previously sent to
    /// `peer_id`
    pub fn notify_packet_delivered(
        &mut self,
        peer_id: PeerId,
        index: PacketIndex,
    ) -> Result<(), ReplicaError> {
        let purpose = {
            let peer = self
                .peers
                .get_mut(&peer_id)
                .ok_or(ReplicaError::UnknownPeer { peer: peer_id })?;
            peer.on_delivered(index)
        };
        let Some(purpose) = purpose else {
            return Ok(());
        };
        match purpose {
            PacketPurpose::Update(id) => {
                self.settle_parked_masks(id, peer_id, index, true)?;
            }
            PacketPurpose::Create(id) => {
                if let Some(peer) = self.peers.get_mut(&peer_id) {
                    if peer.status(id)
                        == Some(PeerReplicaStatus::PendingCreate {
                            in_flight: Some(index),
                        })
                    {
                        peer.statuses.insert(id, PeerReplicaStatus::Active);
                    }
                }
                self.settle_parked_masks(id, peer_id, index, true)?;
            }
            PacketPurpose::Destroy(id) => {
                if let Some(peer) = self.peers.get_mut(&peer_id) {
                    peer.forget_replica(id);
                }
                self.finalize_doomed(id)?;
            }
            PacketPurpose::MigrationRequest(_)
            | PacketPurpose::MigrationAck(_)
            | PacketPurpose::Rpc(..) => {}
        }
        Ok(())
    }

    /// Transport reported a reliable packet as lost; the state it carried is
    /// rescheduled for the next tick
    pub fn notify_packet_dropped(
        &mut self,
        peer_id: PeerId,
        index: PacketIndex,
    ) -> Result<(), ReplicaError> {
        let purpose = {
            let peer = self
                .peers
                .get_mut(&peer_id)
                .ok_or(ReplicaError::UnknownPeer { peer: peer_id })?;
            peer.on_dropped(index)
        };
        let Some(purpose) = purpose else {
            return Ok(());
        };
        match purpose {
            PacketPurpose::Update(id) => {
                // lost bits flow back into the live dirty masks
                self.settle_parked_masks(id, peer_id, index, false)?;
            }
            PacketPurpose::Create(id) => {
                // the resend ships full state again; parked bits are moot
                self.settle_parked_masks(id, peer_id, index, true)?;
                if let Some(peer) = self.peers.get_mut(&peer_id) {
                    if peer.status(id)
                        == Some(PeerReplicaStatus::PendingCreate {
                            in_flight: Some(index),
                        })
                    {
                        peer.statuses
                            .insert(id, PeerReplicaStatus::PendingCreate { in_flight: None });
                    }
                }
            }
            PacketPurpose::Destroy(id) => {
                if let Some(peer) = self.peers.get_mut(&peer_id) {
                    if peer.status(id)
                        == Some(PeerReplicaStatus::Destroying {
                            in_flight: Some(index),
                        })
                    {
                        peer.statuses
                            .insert(id, PeerReplicaStatus::Destroying { in_flight: None });
                    }
                }
            }
            PacketPurpose::MigrationRequest(id) => {
                if let Some(replica) = self.replicas.get(&id) {
                    let mut guard = replica.write().map_err(|_| ReplicaError::LockPoisoned)?;
                    if let MigrationState::AwaitingAck {
                        new_authority,
                        started_ms,
                        ..
                    } = guard.migration
                    {
                        guard.migration = MigrationState::AwaitingAck {
                            new_authority,
                            started_ms,
                            request_sent: false,
                        };
                    }
                }
            }
            PacketPurpose::MigrationAck(id) => {
                self.pending_migration_acks.push((peer_id, id));
            }
            PacketPurpose::Rpc(id, chunk, rpc) => {
                if let Some(peer) = self.peers.get_mut(&peer_id) {
                    peer.pending_rpcs.push((id, chunk, rpc));
                }
            }
        }
        Ok(())
    }

    /// Resolve the dirty bits parked against one in-flight packet across all
    /// of a replica's chunks
    fn settle_parked_masks(
        &self,
        id: ReplicaId,
        peer_id: PeerId,
        index: PacketIndex,
        delivered: bool,
    ) -> Result<(), ReplicaError> {
        let Some(replica) = self.replicas.get(&id) else {
            return Ok(());
        };
        let guard = replica.read().map_err(|_| ReplicaError::LockPoisoned)?;
        for chunk_index in 0..guard.chunk_count() {
            if let Some(chunk) = guard.chunk(chunk_index) {
                let channel = chunk.core().dirty_channel();
                if delivered {
                    channel.acked(peer_id, index)?;
                } else {
                    channel.dropped(peer_id, index)?;
                }
            }
        }
        Ok(())
    }

    /// One network tick: expire stale migrations, route queued remote calls,
    /// flush every peer under its budget, then enforce liveness.
    pub fn tick(&mut self, now: TimeContext, carrier: &mut dyn Carrier) -> Result<(), ReplicaError> {
        self.now = now;
        self.expire_migrations()?;
        self.route_rpcs()?;
        let mut peer_ids: Vec<PeerId> = self.peers.keys().copied().collect();
        peer_ids.sort();
        for peer_id in peer_ids {
            self.flush_peer(peer_id, carrier)?;
        }
        self.enforce_liveness()?;
        self.reap_doomed()
    }

    fn expire_migrations(&mut self) -> Result<(), ReplicaError> {
        let mut orphaned = Vec::new();
        for (id, replica) in &self.replicas {
            let mut guard = replica.write().map_err(|_| ReplicaError::LockPoisoned)?;
            if let MigrationState::AwaitingAck {
                new_authority,
                started_ms,
                ..
            } = guard.migration
            {
                let elapsed_ms = self.now.elapsed_ms.saturating_sub(started_ms);
                if elapsed_ms < self.config.migration_timeout_ms {
                    continue;
                }
                error!(
                    "{}",
                    ReplicaError::MigrationTimeout {
                        replica: *id,
                        peer: new_authority,
                        elapsed_ms,
                    }
                );
                // authority is ambiguous from here on: the ack may be lost
                // rather than the peer, so the replica degrades instead of
                // resuming local sends
                guard.migration = MigrationState::Orphaned;
                guard.set_role(ReplicaRole::Proxy, PeerId::INVALID);
                let subscribers: Vec<PeerId> = guard.subscribers().collect();
                for peer_id in subscribers {
                    unsubscribe(&mut guard, peer_id)?;
                }
                orphaned.push((*id, new_authority));
            }
        }
        for (id, last_authority) in orphaned {
            for peer in self.peers.values_mut() {
                peer.forget_replica(id);
            }
            self.events.push(ReplicaEvent::ReplicaOrphaned {
                replica: id,
                last_authority,
            });
        }
        Ok(())
    }

    /// Drain every chunk's queued remote calls into the per-peer send
    /// queues: downstream to subscribers on the authority, upstream to the
    /// authority on a proxy
    fn route_rpcs(&mut self) -> Result<(), ReplicaError> {
        for (id, replica) in &self.replicas {
            let mut guard = replica.write().map_err(|_| ReplicaError::LockPoisoned)?;
            // frozen replicas hold their calls until the handshake resolves
            if matches!(guard.migration, MigrationState::AwaitingAck { .. }) {
                continue;
            }
            let discard = guard.doomed || guard.is_orphaned();
            let targets: Vec<PeerId> = match guard.role() {
                ReplicaRole::Primary => guard.subscribers().collect(),
                ReplicaRole::Proxy => {
                    if guard.owner().is_valid() {
                        vec![guard.owner()]
                    } else {
                        Vec::new()
                    }
                }
            };
            for chunk_index in 0..guard.chunk_count() {
                let Some(chunk) = guard.chunk_mut(chunk_index) else {
                    continue;
                };
                let rpcs = chunk.core_mut().take_rpcs();
                if discard || rpcs.is_empty() {
                    continue;
                }
                for rpc in rpcs {
                    for target in &targets {
                        let Some(peer) = self.peers.get_mut(target) else {
                            continue;
                        };
                        // peers still waiting on the announcement would not
                        // recognize the replica yet
                        if peer.status(*id).is_some()
                            && peer.status(*id) != Some(PeerReplicaStatus::Active)
                        {
                            continue;
                        }
                        peer.pending_rpcs
                            .push((*id, chunk_index as u8, rpc.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    fn flush_peer(&mut self, peer_id: PeerId, carrier: &mut dyn Carrier) -> Result<(), ReplicaError> {
        let (budget, mut destroys, mut creates) = {
            let Some(peer) = self.peers.get(&peer_id) else {
                return Ok(());
            };
            let mut destroys = Vec::new();
            let mut creates = Vec::new();
            for (id, status) in &peer.statuses {
                match status {
                    PeerReplicaStatus::Destroying { in_flight: None } => destroys.push(*id),
                    PeerReplicaStatus::PendingCreate { in_flight: None } => creates.push(*id),
                    _ => {}
                }
            }
            (
                peer.budget_for_tick(self.config.byte_budget_per_tick),
                destroys,
                creates,
            )
        };
        destroys.sort();
        creates.sort();

        // control traffic goes out ahead of the budgeted update stream
        for id in destroys {
            self.send_destroy(peer_id, id, carrier)?;
        }
        for id in creates {
            self.send_create(peer_id, id, carrier)?;
        }

        let mut requests = Vec::new();
        for (id, replica) in &self.replicas {
            let guard = replica.read().map_err(|_| ReplicaError::LockPoisoned)?;
            if let MigrationState::AwaitingAck {
                new_authority,
                request_sent: false,
                ..
            } = guard.migration
            {
                if new_authority == peer_id {
                    requests.push(*id);
                }
            }
        }
        requests.sort();
        for id in requests {
            self.send_migration_request(peer_id, id, carrier)?;
        }

        let mut acks = Vec::new();
        self.pending_migration_acks.retain(|(target, id)| {
            if *target == peer_id {
                acks.push(*id);
                false
            } else {
                true
            }
        });
        for id in acks {
            self.send_migration_ack(peer_id, id, carrier)?;
        }

        let mut spent = 0usize;
        let rpcs = {
            let Some(peer) = self.peers.get_mut(&peer_id) else {
                return Ok(());
            };
            std::mem::take(&mut peer.pending_rpcs)
        };
        for (id, chunk_index, rpc) in rpcs {
            spent += self.send_rpc(peer_id, id, chunk_index, rpc, carrier)?;
        }

        // rank dirty replicas for the remaining budget
        let mut real_time = Vec::new();
        let mut ranked = Vec::new();
        for (id, replica) in &self.replicas {
            let active = self
                .peers
                .get(&peer_id)
                .map_or(false, |peer| peer.status(*id) == Some(PeerReplicaStatus::Active));
            if !active {
                continue;
            }
            let guard = replica.read().map_err(|_| ReplicaError::LockPoisoned)?;
            if guard.doomed
                || guard.role() != ReplicaRole::Primary
                || guard.migration != MigrationState::None
            {
                continue;
            }
            let mut any_dirty = false;
            for chunk_index in 0..guard.chunk_count() {
                if let Some(chunk) = guard.chunk(chunk_index) {
                    if !chunk.core().dirty_channel().dirty_mask(peer_id)?.is_clear() {
                        any_dirty = true;
                        break;
                    }
                }
            }
            if !any_dirty {
                continue;
            }
            if guard.priority().is_real_time() {
                real_time.push(*id);
            } else {
                ranked.push((guard.priority(), *id));
            }
        }
        real_time.sort();
        // highest priority first, lowest id breaking ties
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        for id in real_time {
            spent += self.send_update(peer_id, id, carrier)?;
        }
        for (_, id) in ranked {
            // headroom check happens before serializing, so a skipped
            // replica keeps its dirty bits untouched
            if spent >= budget {
                break;
            }
            spent += self.send_update(peer_id, id, carrier)?;
        }
        Ok(())
    }

    /// Write the full-state body shared by create and migration-request
    /// packets
    fn write_full_state(
        &self,
        peer_id: PeerId,
        index: PacketIndex,
        replica: &Replica,
        writer: &mut BitWriter,
        park_masks: bool,
    ) -> Result<(), ReplicaError> {
        replica.priority().ser(writer);
        writer.write_bit(replica.is_migratable());
        replica.get_capabilities().ser(writer);
        (replica.chunk_count() as u8).ser(writer);
        for chunk_index in 0..replica.chunk_count() {
            let Some(chunk) = replica.chunk(chunk_index) else {
                continue;
            };
            chunk.core().type_name().to_string().ser(writer);
            let full = DiffMask::full(chunk.dataset_count());
            let mut ctx = MarshalContext {
                peer: peer_id,
                time: self.now,
                role: replica.role(),
                flags: MarshalFlags::FULL_STATE,
                mask: full,
                writer,
            };
            chunk.marshal(&mut ctx)?;
            if park_masks {
                // the snapshot covers everything dirty so far
                chunk.core().dirty_channel().park(peer_id, index, full)?;
            }
        }
        Ok(())
    }

    fn send_create(
        &mut self,
        peer_id: PeerId,
        id: ReplicaId,
        carrier: &mut dyn Carrier,
    ) -> Result<usize, ReplicaError> {
        let Some(replica) = self.replicas.get(&id).cloned() else {
            return Ok(0);
        };
        let guard = replica.read().map_err(|_| ReplicaError::LockPoisoned)?;
        let index = {
            let Some(peer) = self.peers.get_mut(&peer_id) else {
                return Ok(0);
            };
            peer.next_packet()
        };
        let mut writer = BitWriter::new();
        PacketHeader {
            index,
            message: MessageType::CreateReplica,
            replica: id,
        }
        .ser(&mut writer);
        self.write_full_state(peer_id, index, &guard, &mut writer, true)?;
        let bytes = writer.to_bytes();
        if let Some(peer) = self.peers.get_mut(&peer_id) {
            peer.track_reliable(index, PacketPurpose::Create(id));
            peer.statuses.insert(
                id,
                PeerReplicaStatus::PendingCreate {
                    in_flight: Some(index),
                },
            );
        }
        carrier.send(peer_id, &bytes, Reliability::Reliable);
        Ok(bytes.len())
    }

    fn send_destroy(
        &mut self,
        peer_id: PeerId,
        id: ReplicaId,
        carrier: &mut dyn Carrier,
    ) -> Result<usize, ReplicaError> {
        let Some(peer) = self.peers.get_mut(&peer_id) else {
            return Ok(0);
        };
        let index = peer.next_packet();
        let mut writer = BitWriter::new();
        PacketHeader {
            index,
            message: MessageType::DestroyReplica,
            replica: id,
        }
        .ser(&mut writer);
        let bytes = writer.to_bytes();
        peer.track_reliable(index, PacketPurpose::Destroy(id));
        peer.statuses.insert(
            id,
            PeerReplicaStatus::Destroying {
                in_flight: Some(index),
            },
        );
        carrier.send(peer_id, &bytes, Reliability::Reliable);
        Ok(bytes.len())
    }

    fn send_migration_request(
        &mut self,
        peer_id: PeerId,
        id: ReplicaId,
        carrier: &mut dyn Carrier,
    ) -> Result<usize, ReplicaError> {
        let Some(replica) = self.replicas.get(&id).cloned() else {
            return Ok(0);
        };
        let mut guard = replica.write().map_err(|_| ReplicaError::LockPoisoned)?;
        let index = {
            let Some(peer) = self.peers.get_mut(&peer_id) else {
                return Ok(0);
            };
            peer.next_packet()
        };
        let mut writer = BitWriter::new();
        PacketHeader {
            index,
            message: MessageType::MigrationRequest,
            replica: id,
        }
        .ser(&mut writer);
        self.write_full_state(peer_id, index, &guard, &mut writer, false)?;
        if let MigrationState::AwaitingAck {
            new_authority,
            started_ms,
            ..
        } = guard.migration
        {
            guard.migration = MigrationState::AwaitingAck {
                new_authority,
                started_ms,
                request_sent: true,
            };
        }
        let bytes = writer.to_bytes();
        if let Some(peer) = self.peers.get_mut(&peer_id) {
            peer.track_reliable(index, PacketPurpose::MigrationRequest(id));
        }
        carrier.send(peer_id, &bytes, Reliability::Reliable);
        Ok(bytes.len())
    }

    fn send_migration_ack(
        &mut self,
        peer_id: PeerId,
        id: ReplicaId,
        carrier: &mut dyn Carrier,
    ) -> Result<usize, ReplicaError> {
        let Some(peer) = self.peers.get_mut(&peer_id) else {
            return Ok(0);
        };
        let index = peer.next_packet();
        let mut writer = BitWriter::new();
        PacketHeader {
            index,
            message: MessageType::MigrationAck,
            replica: id,
        }
        .ser(&mut writer);
        let bytes = writer.to_bytes();
        peer.track_reliable(index, PacketPurpose::MigrationAck(id));
        carrier.send(peer_id, &bytes, Reliability::Reliable);
        Ok(bytes.len())
    }

    fn send_rpc(
        &mut self,
        peer_id: PeerId,
        id: ReplicaId,
        chunk_index: u8,
        rpc: QueuedRpc,
        carrier: &mut dyn Carrier,
    ) -> Result<usize, ReplicaError> {
        let Some(peer) = self.peers.get_mut(&peer_id) else {
            return Ok(0);
        };
        let index = peer.next_packet();
        let mut writer = BitWriter::new();
        PacketHeader {
            index,
            message: MessageType::Rpc,
            replica: id,
        }
        .ser(&mut writer);
        writer.write_bits(u64::from(chunk_index), 6);
        writer.write_bits(u64::from(rpc.slot), 5);
        rpc.payload.ser(&mut writer);
        let bytes = writer.to_bytes();
        let reliability = rpc.reliability;
        if reliability == Reliability::Reliable {
            peer.track_reliable(index, PacketPurpose::Rpc(id, chunk_index, rpc));
        }
        carrier.send(peer_id, &bytes, reliability);
        Ok(bytes.len())
    }

    /// Serialize one replica's dirty state for one peer: at most one
    /// reliable packet (parked until acknowledged) and one unreliable packet
    /// (cleared at send)
    fn send_update(
        &mut self,
        peer_id: PeerId,
        id: ReplicaId,
        carrier: &mut dyn Carrier,
    ) -> Result<usize, ReplicaError> {
        let Some(replica) = self.replicas.get(&id).cloned() else {
            return Ok(0);
        };
        let guard = replica.read().map_err(|_| ReplicaError::LockPoisoned)?;
        let mut reliable_entries: Vec<(u8, DiffMask)> = Vec::new();
        let mut unreliable_entries: Vec<(u8, DiffMask)> = Vec::new();
        for chunk_index in 0..guard.chunk_count() {
            let Some(chunk) = guard.chunk(chunk_index) else {
                continue;
            };
            let dirty = chunk.core().dirty_channel().dirty_mask(peer_id)?;
            if dirty.is_clear() {
                continue;
            }
            let reliable_ordinals = chunk.reliability_mask();
            let mut reliable = dirty;
            reliable.intersect(&reliable_ordinals);
            let mut unreliable = dirty;
            unreliable.subtract(&reliable_ordinals);
            if !reliable.is_clear() {
                reliable_entries.push((chunk_index as u8, reliable));
            }
            if !unreliable.is_clear() {
                unreliable_entries.push((chunk_index as u8, unreliable));
            }
        }

        let mut sent = 0usize;
        if !reliable_entries.is_empty() {
            let index = {
                let Some(peer) = self.peers.get_mut(&peer_id) else {
                    return Ok(0);
                };
                peer.next_packet()
            };
            let mut writer = BitWriter::new();
            PacketHeader {
                index,
                message: MessageType::UpdateReplica,
                replica: id,
            }
            .ser(&mut writer);
            (reliable_entries.len() as u8).ser(&mut writer);
            for (chunk_index, mask) in &reliable_entries {
                writer.write_bits(u64::from(*chunk_index), 6);
                let Some(chunk) = guard.chunk(usize::from(*chunk_index)) else {
                    continue;
                };
                let mut ctx = MarshalContext {
                    peer: peer_id,
                    time: self.now,
                    role: guard.role(),
                    flags: MarshalFlags::NONE,
                    mask: *mask,
                    writer: &mut writer,
                };
                chunk.marshal(&mut ctx)?;
                chunk.core().dirty_channel().park(peer_id, index, *mask)?;
            }
            let bytes = writer.to_bytes();
            if let Some(peer) = self.peers.get_mut(&peer_id) {
                peer.track_reliable(index, PacketPurpose::Update(id));
            }
            carrier.send(peer_id, &bytes, Reliability::Reliable);
            sent += bytes.len();
        }

        if !unreliable_entries.is_empty() {
            let index = {
                let Some(peer) = self.peers.get_mut(&peer_id) else {
                    return Ok(sent);
                };
                peer.next_packet()
            };
            let mut writer = BitWriter::new();
            PacketHeader {
                index,
                message: MessageType::UpdateReplica,
                replica: id,
            }
            .ser(&mut writer);
            (unreliable_entries.len() as u8).ser(&mut writer);
            for (chunk_index, mask) in &unreliable_entries {
                writer.write_bits(u64::from(*chunk_index), 6);
                let Some(chunk) = guard.chunk(usize::from(*chunk_index)) else {
                    continue;
                };
                let mut ctx = MarshalContext {
                    peer: peer_id,
                    time: self.now,
                    role: guard.role(),
                    flags: MarshalFlags::NONE,
                    mask: *mask,
                    writer: &mut writer,
                };
                chunk.marshal(&mut ctx)?;
                // a lost value is simply superseded by the next send
                chunk.core().dirty_channel().take_bits(peer_id, mask)?;
            }
            let bytes = writer.to_bytes();
            carrier.send(peer_id, &bytes, Reliability::Unreliable);
            sent += bytes.len();
        }
        Ok(sent)
    }

    fn enforce_liveness(&mut self) -> Result<(), ReplicaError> {
        let max = self.config.liveness_max_silent_ticks;
        let mut dead = Vec::new();
        for (id, peer) in &mut self.peers {
            if !peer.outstanding_reliable.is_empty() && !peer.acked_since_last_tick {
                peer.silent_ticks = peer.silent_ticks.saturating_add(1);
            } else {
                peer.silent_ticks = 0;
            }
            peer.acked_since_last_tick = false;
            if peer.silent_ticks >= max {
                error!(
                    "{}",
                    ReplicaError::LivenessFailure {
                        peer: *id,
                        silent_ticks: peer.silent_ticks,
                    }
                );
                dead.push(*id);
            }
        }
        for peer_id in dead {
            self.retire_peer(peer_id, DisconnectReason::Liveness)?;
        }
        Ok(())
    }

    /// Remove a peer and everything tied to it: its connection state and
    /// pending sends, its subscriptions, and every replica it authored
    fn retire_peer(
        &mut self,
        peer_id: PeerId,
        reason: DisconnectReason,
    ) -> Result<(), ReplicaError> {
        self.peers.remove(&peer_id);
        self.pending_migration_acks
            .retain(|(target, _)| *target != peer_id);

        let mut destroyed = Vec::new();
        for (id, replica) in &self.replicas {
            let mut guard = replica.write().map_err(|_| ReplicaError::LockPoisoned)?;
            if guard.owner() == peer_id {
                guard.doomed = true;
                destroyed.push(*id);
                continue;
            }
            unsubscribe(&mut guard, peer_id)?;
            if let MigrationState::AwaitingAck { new_authority, .. } = guard.migration {
                if new_authority == peer_id {
                    // handshake target vanished before acking; local
                    // authority resumes
                    info!(
                        "migration of replica {:?} cancelled: peer {:?} disconnected",
                        id, peer_id
                    );
                    guard.migration = MigrationState::None;
                }
            }
        }
        for id in destroyed {
            self.replicas.remove(&id);
            for peer in self.peers.values_mut() {
                peer.forget_replica(id);
            }
            self.events.push(ReplicaEvent::ReplicaDestroyed { replica: id });
        }
        self.events.push(ReplicaEvent::PeerDisconnected {
            peer: peer_id,
            reason,
        });
        Ok(())
    }

    /// Drop a doomed replica once no peer still needs a deletion notice
    fn finalize_doomed(&mut self, id: ReplicaId) -> Result<(), ReplicaError> {
        let Some(replica) = self.replicas.get(&id) else {
            return Ok(());
        };
        let doomed = replica
            .read()
            .map_err(|_| ReplicaError::LockPoisoned)?
            .doomed;
        if doomed
            && !self
                .peers
                .values()
                .any(|peer| peer.statuses.contains_key(&id))
        {
            self.replicas.remove(&id);
            self.events.push(ReplicaEvent::ReplicaDestroyed { replica: id });
        }
        Ok(())
    }

    fn reap_doomed(&mut self) -> Result<(), ReplicaError> {
        let doomed: Vec<ReplicaId> = {
            let mut ids = Vec::new();
            for (id, replica) in &self.replicas {
                if replica
                    .read()
                    .map_err(|_| ReplicaError::LockPoisoned)?
                    .doomed
                {
                    ids.push(*id);
                }
            }
            ids
        };
        for id in doomed {
            self.finalize_doomed(id)?;
        }
        Ok(())
    }
}

/// Add a peer to a replica's subscriber set and every chunk's dirty channel
fn subscribe(replica: &mut Replica, peer_id: PeerId) -> Result<(), ReplicaError> {
    replica.subscribers.insert(peer_id);
    for chunk_index in 0..replica.chunk_count() {
        if let Some(chunk) = replica.chunk(chunk_index) {
            chunk.core().dirty_channel().add_peer(peer_id)?;
        }
    }
    Ok(())
}

/// Inverse of [`subscribe`]; in-flight masks for the peer are discarded with
/// its channel entry
fn unsubscribe(replica: &mut Replica, peer_id: PeerId) -> Result<(), ReplicaError> {
    replica.subscribers.remove(&peer_id);
    for chunk_index in 0..replica.chunk_count() {
        if let Some(chunk) = replica.chunk(chunk_index) {
            chunk.core().dirty_channel().remove_peer(peer_id)?;
        }
    }
    Ok(())
}
