//! Shared harness for manager-level tests: a carrier that records instead
//! of sending, a small concrete chunk type, and helpers that shuttle
//! recorded packets between two managers.

// each test binary uses its own subset of the harness
#![allow(dead_code)]

use std::any::Any;

use replink::{
    peek_packet_index, AnyDataSet, BitReader, Carrier, ChunkCore, ChunkFactoryRegistry, DataSet,
    PacketHeader, PeerId, Quantized, Reliability, ReplicaChunk, ReplicaContext, ReplicaManager,
    ReplicaManagerConfig, Serde, TimeContext,
};

pub const PEER_A: PeerId = PeerId(1);
pub const PEER_B: PeerId = PeerId(2);
pub const PEER_C: PeerId = PeerId(3);

/// Captures outgoing packets for inspection and manual delivery
#[derive(Default)]
pub struct RecordingCarrier {
    pub sent: Vec<(PeerId, Vec<u8>, Reliability)>,
}

impl RecordingCarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<(PeerId, Vec<u8>, Reliability)> {
        std::mem::take(&mut self.sent)
    }
}

impl Carrier for RecordingCarrier {
    fn send(&mut self, peer: PeerId, payload: &[u8], reliability: Reliability) {
        self.sent.push((peer, payload.to_vec(), reliability));
    }
}

pub const POSITION_CHUNK_NAME: &str = "PositionChunk";

/// Three fields across both delivery classes, two RPC slots, migratable
pub struct PositionChunk {
    core: ChunkCore,
    pub x: DataSet<Quantized<10, 6>>,
    pub hp: DataSet<u16>,
    pub heading: DataSet<f32>,
    pub received_rpcs: Vec<(u8, Vec<u8>)>,
}

impl PositionChunk {
    pub fn new() -> Self {
        Self {
            core: ChunkCore::new(POSITION_CHUNK_NAME, 3, 2).unwrap(),
            x: DataSet::new(Quantized::new(0.0), Reliability::Unreliable),
            hp: DataSet::new(100, Reliability::Reliable),
            heading: DataSet::new(0.0, Reliability::Unreliable),
            received_rpcs: Vec::new(),
        }
    }

    pub fn register(registry: &mut ChunkFactoryRegistry) {
        registry
            .register(POSITION_CHUNK_NAME, || Box::new(PositionChunk::new()))
            .unwrap();
    }
}

impl ReplicaChunk for PositionChunk {
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
            0 => &self.x,
            1 => &self.hp,
            _ => &self.heading,
        }
    }

    fn dataset_mut(&mut self, ordinal: u8) -> &mut dyn AnyDataSet {
        match ordinal {
            0 => &mut self.x,
            1 => &mut self.hp,
            _ => &mut self.heading,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn is_replica_migratable(&self) -> bool {
        true
    }

    fn on_rpc(&mut self, slot: u8, payload: &[u8], _ctx: &ReplicaContext) {
        self.received_rpcs.push((slot, payload.to_vec()));
    }
}

pub fn manager(host_index: u8) -> ReplicaManager {
    manager_with(ReplicaManagerConfig {
        host_index,
        ..Default::default()
    })
}

pub fn manager_with(config: ReplicaManagerConfig) -> ReplicaManager {
    let mut registry = ChunkFactoryRegistry::new();
    PositionChunk::register(&mut registry);
    ReplicaManager::new(config, registry).unwrap()
}

/// Two managers that know each other: the first speaks as [`PEER_A`], the
/// second as [`PEER_B`]
pub fn pair() -> (ReplicaManager, ReplicaManager) {
    let mut a = manager(1);
    let mut b = manager(2);
    a.add_peer(PEER_B).unwrap();
    b.add_peer(PEER_A).unwrap();
    (a, b)
}

pub fn at(ms: u64) -> TimeContext {
    TimeContext {
        elapsed_ms: ms,
        local_ms: ms,
    }
}

/// Deliver every recorded packet to `receiver` (which knows the sender as
/// `sender_id`) and acknowledge the reliable ones back to `sender`
pub fn pump(
    sender: &mut ReplicaManager,
    sender_id: PeerId,
    receiver: &mut ReplicaManager,
    carrier: &mut RecordingCarrier,
) {
    for (target, payload, reliability) in carrier.take() {
        receiver.receive(sender_id, &payload).unwrap();
        if reliability == Reliability::Reliable {
            let index = peek_packet_index(&payload).unwrap();
            sender.notify_packet_delivered(target, index).unwrap();
        }
    }
}

/// [`pump`] for more than one receiver: each recorded packet goes to the
/// receiver it was addressed to, with reliable ones acknowledged back
pub fn fan_out(
    sender: &mut ReplicaManager,
    sender_id: PeerId,
    receivers: &mut [(PeerId, &mut ReplicaManager)],
    carrier: &mut RecordingCarrier,
) {
    for (target, payload, reliability) in carrier.take() {
        for (peer_id, receiver) in receivers.iter_mut() {
            if *peer_id == target {
                receiver.receive(sender_id, &payload).unwrap();
            }
        }
        if reliability == Reliability::Reliable {
            let index = peek_packet_index(&payload).unwrap();
            sender.notify_packet_delivered(target, index).unwrap();
        }
    }
}

/// Decode the leading header of each recorded packet
pub fn headers(packets: &[(PeerId, Vec<u8>, Reliability)]) -> Vec<PacketHeader> {
    packets
        .iter()
        .map(|(_, payload, _)| {
            let mut reader = BitReader::new(payload);
            PacketHeader::de(&mut reader).unwrap()
        })
        .collect()
}
