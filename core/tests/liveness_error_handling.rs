mod common;

use common::*;
use replink::{
    CapabilityFlags, DisconnectReason, Replica, ReplicaChunk, ReplicaEvent, ReplicaPriority,
};

fn spawn_position(manager: &mut replink::ReplicaManager) -> replink::ReplicaRef {
    let mut replica = Replica::new(ReplicaPriority::NORMAL, false, CapabilityFlags::NONE);
    replica.add_chunk(Box::new(PositionChunk::new())).unwrap();
    manager.spawn(replica).unwrap()
}

#[test]
fn silent_peer_is_retired_after_three_ticks() {
    let mut a = manager(1);
    a.add_peer(PEER_B).unwrap();
    let mut carrier = RecordingCarrier::new();
    let replica = spawn_position(&mut a);

    // the announcement goes out and is never acknowledged
    a.tick(at(0), &mut carrier).unwrap();
    assert_eq!(carrier.take().len(), 1);
    a.tick(at(16), &mut carrier).unwrap();
    assert!(a.drain_events().is_empty());
    a.tick(at(32), &mut carrier).unwrap();

    let events = a.drain_events();
    assert!(events.contains(&ReplicaEvent::PeerDisconnected {
        peer: PEER_B,
        reason: DisconnectReason::Liveness,
    }));
    // the local replica survives but no longer addresses the dead peer
    assert!(a.replica(replica.read().unwrap().id()).is_some());
    assert_eq!(replica.read().unwrap().subscribers().count(), 0);

    // nothing queued for the dead peer is ever sent
    a.tick(at(48), &mut carrier).unwrap();
    assert!(carrier.take().is_empty());
}

#[test]
fn delivery_notifications_reset_the_silence_counter() {
    let (mut a, mut b) = pair();
    let mut carrier = RecordingCarrier::new();
    let replica = spawn_position(&mut a);

    a.tick(at(0), &mut carrier).unwrap();
    pump(&mut a, PEER_A, &mut b, &mut carrier);

    // a steady ack stream keeps the peer alive indefinitely
    for round in 1..10u64 {
        {
            let mut guard = replica.write().unwrap();
            let chunk = guard.chunk_as_mut::<PositionChunk>(0).unwrap();
            chunk.hp.set(round as u16);
        }
        a.tick(at(round * 16), &mut carrier).unwrap();
        pump(&mut a, PEER_A, &mut b, &mut carrier);
    }
    assert!(!a
        .drain_events()
        .iter()
        .any(|event| matches!(event, ReplicaEvent::PeerDisconnected { .. })));
}

#[test]
fn idle_connections_are_not_punished() {
    let mut a = manager(1);
    a.add_peer(PEER_B).unwrap();
    let mut carrier = RecordingCarrier::new();

    // nothing outstanding, so silence is fine
    for round in 0..10u64 {
        a.tick(at(round * 16), &mut carrier).unwrap();
    }
    assert!(a.drain_events().is_empty());
}

#[test]
fn authored_replicas_die_with_their_peer() {
    let (mut a, mut b) = pair();
    let mut carrier = RecordingCarrier::new();
    let replica = spawn_position(&mut a);
    let id = replica.read().unwrap().id();

    a.tick(at(0), &mut carrier).unwrap();
    pump(&mut a, PEER_A, &mut b, &mut carrier);
    b.drain_events();
    assert!(b.replica(id).is_some());

    // b never hears back from a; the proxy goes with the peer
    let proxy = b.replica(id).unwrap();
    {
        let mut guard = proxy.write().unwrap();
        let chunk = guard.chunk_as_mut::<PositionChunk>(0).unwrap();
        chunk
            .core_mut()
            .queue_rpc(0, vec![1], replink::Reliability::Reliable)
            .unwrap();
    }
    b.tick(at(16), &mut carrier).unwrap();
    carrier.take();
    b.tick(at(32), &mut carrier).unwrap();
    b.tick(at(48), &mut carrier).unwrap();

    let events = b.drain_events();
    assert!(events.contains(&ReplicaEvent::PeerDisconnected {
        peer: PEER_A,
        reason: DisconnectReason::Liveness,
    }));
    assert!(events.contains(&ReplicaEvent::ReplicaDestroyed { replica: id }));
    assert!(b.replica(id).is_none());
}
