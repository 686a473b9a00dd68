mod common;

use common::*;
use replink::{
    CapabilityFlags, MigrationState, Replica, ReplicaError, ReplicaEvent, ReplicaManager,
    ReplicaPriority, ReplicaRef, ReplicaRole,
};

fn announce_migratable(a: &mut ReplicaManager, b: &mut ReplicaManager) -> ReplicaRef {
    let mut carrier = RecordingCarrier::new();
    let mut replica = Replica::new(ReplicaPriority::NORMAL, true, CapabilityFlags::NONE);
    replica.add_chunk(Box::new(PositionChunk::new())).unwrap();
    let replica = a.spawn(replica).unwrap();
    a.tick(at(0), &mut carrier).unwrap();
    pump(a, PEER_A, b, &mut carrier);
    b.drain_events();
    replica
}

#[test]
fn handshake_transfers_authority() {
    let (mut a, mut b) = pair();
    let mut carrier = RecordingCarrier::new();
    let replica = announce_migratable(&mut a, &mut b);
    let id = replica.read().unwrap().id();

    {
        let mut guard = replica.write().unwrap();
        let chunk = guard.chunk_as_mut::<PositionChunk>(0).unwrap();
        chunk.hp.set(64);
    }
    a.begin_migration(id, PEER_B).unwrap();

    // the frozen replica ships its full state instead of an update
    a.tick(at(100), &mut carrier).unwrap();
    pump(&mut a, PEER_A, &mut b, &mut carrier);

    assert!(b
        .drain_events()
        .contains(&ReplicaEvent::AuthorityAcquired { replica: id }));
    let adopted = b.replica(id).unwrap();
    {
        let guard = adopted.read().unwrap();
        assert_eq!(guard.role(), ReplicaRole::Primary);
        // the frozen value arrived with the snapshot
        assert_eq!(*guard.chunk_as::<PositionChunk>(0).unwrap().hp.get(), 64);
    }

    // the ack flows back on the new authority's next tick
    b.tick(at(116), &mut carrier).unwrap();
    pump(&mut b, PEER_B, &mut a, &mut carrier);

    assert!(a.drain_events().contains(&ReplicaEvent::MigrationCompleted {
        replica: id,
        new_authority: PEER_B,
    }));
    let guard = replica.read().unwrap();
    assert_eq!(guard.role(), ReplicaRole::Proxy);
    assert_eq!(guard.owner(), PEER_B);
    assert_eq!(guard.migration_state(), MigrationState::None);
}

#[test]
fn new_authority_updates_flow_to_old() {
    let (mut a, mut b) = pair();
    let mut carrier = RecordingCarrier::new();
    let replica = announce_migratable(&mut a, &mut b);
    let id = replica.read().unwrap().id();

    a.begin_migration(id, PEER_B).unwrap();
    a.tick(at(100), &mut carrier).unwrap();
    pump(&mut a, PEER_A, &mut b, &mut carrier);
    b.tick(at(116), &mut carrier).unwrap();
    pump(&mut b, PEER_B, &mut a, &mut carrier);

    let adopted = b.replica(id).unwrap();
    {
        let mut guard = adopted.write().unwrap();
        let chunk = guard.chunk_as_mut::<PositionChunk>(0).unwrap();
        chunk.hp.set(13);
    }
    b.tick(at(132), &mut carrier).unwrap();
    pump(&mut b, PEER_B, &mut a, &mut carrier);

    let guard = replica.read().unwrap();
    assert_eq!(*guard.chunk_as::<PositionChunk>(0).unwrap().hp.get(), 13);
}

#[test]
fn updates_freeze_while_awaiting_ack() {
    let (mut a, mut b) = pair();
    let mut carrier = RecordingCarrier::new();
    let replica = announce_migratable(&mut a, &mut b);
    let id = replica.read().unwrap().id();

    a.begin_migration(id, PEER_B).unwrap();
    a.tick(at(100), &mut carrier).unwrap();
    carrier.take();

    {
        let mut guard = replica.write().unwrap();
        let chunk = guard.chunk_as_mut::<PositionChunk>(0).unwrap();
        chunk.hp.set(1);
    }
    a.tick(at(116), &mut carrier).unwrap();
    assert!(carrier.take().is_empty());
}

#[test]
fn timeout_orphans_the_replica() {
    let (mut a, mut b) = pair();
    let mut carrier = RecordingCarrier::new();
    let replica = announce_migratable(&mut a, &mut b);
    let id = replica.read().unwrap().id();

    a.begin_migration(id, PEER_B).unwrap();
    a.tick(at(100), &mut carrier).unwrap();
    carrier.take();

    // the ack never arrives
    a.tick(at(100 + replink::DEFAULT_MIGRATION_TIMEOUT_MS), &mut carrier)
        .unwrap();
    assert!(a.drain_events().contains(&ReplicaEvent::ReplicaOrphaned {
        replica: id,
        last_authority: PEER_B,
    }));
    {
        let guard = replica.read().unwrap();
        assert!(guard.is_orphaned());
        assert_eq!(guard.role(), ReplicaRole::Proxy);
    }

    // an orphan may still be destroyed explicitly
    a.destroy(id).unwrap();
    assert!(a.replica(id).is_none());
}

#[test]
fn third_party_proxies_follow_the_new_authority() {
    let mut a = manager(1);
    let mut b = manager(2);
    let mut c = manager(3);
    a.add_peer(PEER_B).unwrap();
    a.add_peer(PEER_C).unwrap();
    b.add_peer(PEER_A).unwrap();
    b.add_peer(PEER_C).unwrap();
    c.add_peer(PEER_A).unwrap();
    c.add_peer(PEER_B).unwrap();
    let mut carrier = RecordingCarrier::new();

    let mut replica = Replica::new(ReplicaPriority::NORMAL, true, CapabilityFlags::NONE);
    replica.add_chunk(Box::new(PositionChunk::new())).unwrap();
    let replica = a.spawn(replica).unwrap();
    let id = replica.read().unwrap().id();
    a.tick(at(0), &mut carrier).unwrap();
    fan_out(
        &mut a,
        PEER_A,
        &mut [(PEER_B, &mut b), (PEER_C, &mut c)],
        &mut carrier,
    );
    assert_eq!(c.replica(id).unwrap().read().unwrap().owner(), PEER_A);

    a.begin_migration(id, PEER_B).unwrap();
    a.tick(at(16), &mut carrier).unwrap();
    fan_out(
        &mut a,
        PEER_A,
        &mut [(PEER_B, &mut b), (PEER_C, &mut c)],
        &mut carrier,
    );

    // the new authority acks to the old one and re-announces to everyone else
    b.tick(at(32), &mut carrier).unwrap();
    fan_out(
        &mut b,
        PEER_B,
        &mut [(PEER_A, &mut a), (PEER_C, &mut c)],
        &mut carrier,
    );

    {
        let bystander = c.replica(id).unwrap();
        let guard = bystander.read().unwrap();
        assert_eq!(guard.role(), ReplicaRole::Proxy);
        assert_eq!(guard.owner(), PEER_B);
    }
    assert!(c.drain_events().contains(&ReplicaEvent::MigrationCompleted {
        replica: id,
        new_authority: PEER_B,
    }));

    // updates from the new authority now reach the bystander
    let adopted = b.replica(id).unwrap();
    {
        let mut guard = adopted.write().unwrap();
        let chunk = guard.chunk_as_mut::<PositionChunk>(0).unwrap();
        chunk.hp.set(77);
    }
    b.tick(at(48), &mut carrier).unwrap();
    fan_out(
        &mut b,
        PEER_B,
        &mut [(PEER_A, &mut a), (PEER_C, &mut c)],
        &mut carrier,
    );
    let held = c.replica(id).unwrap();
    let guard = held.read().unwrap();
    assert_eq!(*guard.chunk_as::<PositionChunk>(0).unwrap().hp.get(), 77);
}

#[test]
fn non_migratable_replicas_are_refused() {
    let (mut a, mut b) = pair();
    let mut carrier = RecordingCarrier::new();
    let mut replica = Replica::new(ReplicaPriority::NORMAL, false, CapabilityFlags::NONE);
    replica.add_chunk(Box::new(PositionChunk::new())).unwrap();
    let replica = a.spawn(replica).unwrap();
    let id = replica.read().unwrap().id();
    a.tick(at(0), &mut carrier).unwrap();
    pump(&mut a, PEER_A, &mut b, &mut carrier);

    assert!(matches!(
        a.begin_migration(id, PEER_B),
        Err(ReplicaError::NotMigratable { .. })
    ));
}

#[test]
fn second_migration_refused_while_pending() {
    let (mut a, mut b) = pair();
    let replica = announce_migratable(&mut a, &mut b);
    let id = replica.read().unwrap().id();

    a.begin_migration(id, PEER_B).unwrap();
    assert!(matches!(
        a.begin_migration(id, PEER_B),
        Err(ReplicaError::MigrationPending { .. })
    ));
}

#[test]
fn target_disconnect_cancels_the_handshake() {
    let (mut a, mut b) = pair();
    let mut carrier = RecordingCarrier::new();
    let replica = announce_migratable(&mut a, &mut b);
    let id = replica.read().unwrap().id();

    a.begin_migration(id, PEER_B).unwrap();
    a.tick(at(100), &mut carrier).unwrap();
    carrier.take();

    a.remove_peer(PEER_B).unwrap();
    let guard = replica.read().unwrap();
    assert_eq!(guard.migration_state(), MigrationState::None);
    assert_eq!(guard.role(), ReplicaRole::Primary);
}
