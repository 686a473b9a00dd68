use crate::types::{PeerId, Reliability};

/// The abstract transport boundary.
///
/// The replication core never opens sockets or blocks on I/O: the manager
/// pushes already-serialized payloads here during its tick, and the
/// transport later reports per-packet delivery outcomes back through
/// [`ReplicaManager::notify_packet_delivered`] /
/// [`notify_packet_dropped`], correlating via the packet index carried in
/// the payload header.
///
/// [`ReplicaManager::notify_packet_delivered`]: crate::manager::ReplicaManager::notify_packet_delivered
/// [`notify_packet_dropped`]: crate::manager::ReplicaManager::notify_packet_dropped
pub trait Carrier {
    fn send(&mut self, peer: PeerId, payload: &[u8], reliability: Reliability);
}
