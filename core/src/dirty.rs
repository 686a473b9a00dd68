use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::{
    diff_mask::DiffMask,
    error::ReplicaError,
    types::{PacketIndex, PeerId},
};

/// Per-peer masks for one chunk: the live dirty mask plus reliable bits
/// parked against in-flight packets.
#[derive(Debug)]
struct PeerMasks {
    dirty: DiffMask,
    in_flight: HashMap<PacketIndex, DiffMask>,
}

#[derive(Debug)]
struct DirtyChannelInner {
    length: u8,
    peers: HashMap<PeerId, PeerMasks>,
}

/// Fan-out channel carrying one chunk's dirty state to every subscribed
/// peer. DataSets hold a [`DirtySender`] into the channel; the manager holds
/// the channel itself and resolves per-peer masks at send time.
///
/// Reliable bits are not cleared optimistically: marshaling moves them into
/// an in-flight slot keyed by packet index, a delivery notification discards
/// them, a drop notification ORs them back into the live mask.
#[derive(Debug, Clone)]
pub struct DirtyChannel {
    inner: Arc<RwLock<DirtyChannelInner>>,
}

impl DirtyChannel {
    pub fn new(length: u8) -> Self {
        Self {
            inner: Arc::new(RwLock::new(DirtyChannelInner {
                length,
                peers: HashMap::new(),
            })),
        }
    }

    pub fn sender(&self) -> DirtySender {
        DirtySender {
            inner: self.inner.clone(),
        }
    }

    pub fn add_peer(&self, peer: PeerId) -> Result<(), ReplicaError> {
        let mut inner = self.inner.write().map_err(|_| ReplicaError::LockPoisoned)?;
        let length = inner.length;
        inner.peers.entry(peer).or_insert_with(|| PeerMasks {
            dirty: DiffMask::new(length),
            in_flight: HashMap::new(),
        });
        Ok(())
    }

    /// Drop all state for a peer, including in-flight masks: pending sends
    /// are never retried against a removed peer
    pub fn remove_peer(&self, peer: PeerId) -> Result<(), ReplicaError> {
        let mut inner = self.inner.write().map_err(|_| ReplicaError::LockPoisoned)?;
        inner.peers.remove(&peer);
        Ok(())
    }

    /// Copy of the live dirty mask for a peer; clean if the peer is unknown
    pub fn dirty_mask(&self, peer: PeerId) -> Result<DiffMask, ReplicaError> {
        let inner = self.inner.read().map_err(|_| ReplicaError::LockPoisoned)?;
        Ok(inner
            .peers
            .get(&peer)
            .map(|masks| masks.dirty)
            .unwrap_or_else(|| DiffMask::new(inner.length)))
    }

    /// Clear `mask`'s bits from the live dirty mask (unreliable send path:
    /// stale-value overwrite, no retransmit)
    pub fn take_bits(&self, peer: PeerId, mask: &DiffMask) -> Result<(), ReplicaError> {
        let mut inner = self.inner.write().map_err(|_| ReplicaError::LockPoisoned)?;
        if let Some(masks) = inner.peers.get_mut(&peer) {
            masks.dirty.subtract(mask);
        }
        Ok(())
    }

    /// Clear `mask`'s bits from the live dirty mask and park them against
    /// `packet` (reliable send path)
    pub fn park(
        &self,
        peer: PeerId,
        packet: PacketIndex,
        mask: DiffMask,
    ) -> Result<(), ReplicaError> {
        let mut inner = self.inner.write().map_err(|_| ReplicaError::LockPoisoned)?;
        if let Some(masks) = inner.peers.get_mut(&peer) {
            masks.dirty.subtract(&mask);
            masks.in_flight.insert(packet, mask);
        }
        Ok(())
    }

    /// The packet carrying these bits was delivered; discard them
    pub fn acked(&self, peer: PeerId, packet: PacketIndex) -> Result<(), ReplicaError> {
        let mut inner = self.inner.write().map_err(|_| ReplicaError::LockPoisoned)?;
        if let Some(masks) = inner.peers.get_mut(&peer) {
            masks.in_flight.remove(&packet);
        }
        Ok(())
    }

    /// The packet carrying these bits was lost; restore them so the next
    /// tick resends
    pub fn dropped(&self, peer: PeerId, packet: PacketIndex) -> Result<(), ReplicaError> {
        let mut inner = self.inner.write().map_err(|_| ReplicaError::LockPoisoned)?;
        if let Some(masks) = inner.peers.get_mut(&peer) {
            if let Some(lost) = masks.in_flight.remove(&packet) {
                masks.dirty.or(&lost);
            }
        }
        Ok(())
    }
}

/// Write half of a [`DirtyChannel`], held by each DataSet after binding
#[derive(Debug, Clone)]
pub struct DirtySender {
    inner: Arc<RwLock<DirtyChannelInner>>,
}

impl DirtySender {
    /// Mark `ordinal` dirty for every subscribed peer. Returns false if the
    /// channel lock was poisoned.
    pub fn mark(&self, ordinal: u8) -> bool {
        let Ok(mut inner) = self.inner.write() else {
            return false;
        };
        for masks in inner.peers.values_mut() {
            masks.dirty.set_bit(ordinal, true);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEER: PeerId = PeerId(7);

    #[test]
    fn mark_reaches_every_peer() {
        let channel = DirtyChannel::new(4);
        channel.add_peer(PeerId(1)).unwrap();
        channel.add_peer(PeerId(2)).unwrap();
        channel.sender().mark(2);
        assert!(channel.dirty_mask(PeerId(1)).unwrap().bit(2));
        assert!(channel.dirty_mask(PeerId(2)).unwrap().bit(2));
    }

    #[test]
    fn unknown_peer_reads_clean() {
        let channel = DirtyChannel::new(4);
        assert!(channel.dirty_mask(PEER).unwrap().is_clear());
    }

    #[test]
    fn park_then_ack_discards() {
        let channel = DirtyChannel::new(4);
        channel.add_peer(PEER).unwrap();
        channel.sender().mark(1);

        let mask = channel.dirty_mask(PEER).unwrap();
        channel.park(PEER, 9, mask).unwrap();
        assert!(channel.dirty_mask(PEER).unwrap().is_clear());

        channel.acked(PEER, 9).unwrap();
        assert!(channel.dirty_mask(PEER).unwrap().is_clear());
    }

    #[test]
    fn park_then_drop_restores() {
        let channel = DirtyChannel::new(4);
        channel.add_peer(PEER).unwrap();
        channel.sender().mark(1);

        let mask = channel.dirty_mask(PEER).unwrap();
        channel.park(PEER, 9, mask).unwrap();
        channel.dropped(PEER, 9).unwrap();
        assert!(channel.dirty_mask(PEER).unwrap().bit(1));
    }

    #[test]
    fn drop_merges_with_newer_dirt() {
        let channel = DirtyChannel::new(4);
        channel.add_peer(PEER).unwrap();
        channel.sender().mark(0);

        let mask = channel.dirty_mask(PEER).unwrap();
        channel.park(PEER, 3, mask).unwrap();
        channel.sender().mark(2);
        channel.dropped(PEER, 3).unwrap();

        let dirty = channel.dirty_mask(PEER).unwrap();
        assert!(dirty.bit(0) && dirty.bit(2));
    }

    #[test]
    fn removed_peer_forgets_in_flight() {
        let channel = DirtyChannel::new(4);
        channel.add_peer(PEER).unwrap();
        channel.sender().mark(0);
        let mask = channel.dirty_mask(PEER).unwrap();
        channel.park(PEER, 1, mask).unwrap();

        channel.remove_peer(PEER).unwrap();
        channel.dropped(PEER, 1).unwrap();
        assert!(channel.dirty_mask(PEER).unwrap().is_clear());
    }
}
