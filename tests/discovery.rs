//! End to end checks of identity derivation, proximity ordering and the
//! deferred lookup discipline of the discovery loop.
//!
//! Run with: cargo test --test discovery

use std::{
    cmp::Ordering,
    net::{IpAddr, Ipv4Addr},
    thread,
    time::Duration,
};

use flume::Receiver;
use k256::SecretKey;

use kadpeer::{
    distance_cmp, Discovery, Error, FindNodeQuery, Node, NodeId, PeerState, ProximityHash,
    QueryError,
};

fn public_key(seed: u8) -> k256::PublicKey {
    SecretKey::from_slice(&[seed; 32]).unwrap().public_key()
}

fn discovery() -> (Discovery, Receiver<(Node, FindNodeQuery)>) {
    let (dispatcher, dispatched) = flume::unbounded();

    let discovery = Discovery::builder()
        .tick_interval(Duration::from_millis(10))
        .build(dispatcher)
        .unwrap();

    (discovery, dispatched)
}

#[test]
fn derive_format_parse_compare() -> Result<(), Error> {
    let id = NodeId::from_public_key(&public_key(1))?;

    let text = id.to_string();
    assert_eq!(text.len(), 128);
    assert_eq!(text, text.to_lowercase());

    let parsed: NodeId = text.parse()?;
    assert_eq!(parsed, id);
    assert_eq!(NodeId::from_hex(&format!("0x{text}"))?, id);

    let hash = parsed.proximity_hash();
    assert_eq!(distance_cmp(&hash, &hash, &hash), Ordering::Equal);

    let other = NodeId::from_public_key(&public_key(2))?.proximity_hash();
    let target = NodeId::from_public_key(&public_key(3))?.proximity_hash();

    let first = distance_cmp(&target, &hash, &other);
    assert_ne!(first, Ordering::Equal);

    for _ in 0..100 {
        let again = NodeId::from_public_key(&public_key(1))?.proximity_hash();
        assert_eq!(distance_cmp(&target, &again, &other), first);
        assert_eq!(distance_cmp(&target, &other, &again), first.reverse());
    }

    Ok(())
}

#[test]
fn ipv4_mapped_peers_share_an_address() {
    let id = NodeId::random();
    let ip = Ipv4Addr::new(192, 168, 1, 7);

    let plain = Node::new(id, IpAddr::V4(ip), 30303, 30303);
    let mapped = Node::new(id, IpAddr::V6(ip.to_ipv6_mapped()), 30303, 30303);

    assert_eq!(plain.addr(), mapped.addr());
}

#[test]
fn fifo_replay_after_bonding() {
    let (discovery, dispatched) = discovery();

    let peer = Node::random();
    discovery.add_node(peer.clone()).unwrap();

    let pending: Vec<_> = (0..3)
        .map(|_| discovery.find_node(peer.id(), NodeId::random()).unwrap())
        .collect();

    assert!(dispatched.try_recv().is_err());

    assert_eq!(discovery.bonded(peer.id()).unwrap(), Some(3));
    assert_eq!(discovery.peer_state(peer.id()).unwrap(), Some(PeerState::Bonded));

    let replayed: Vec<_> = (0..3)
        .map(|_| dispatched.recv().unwrap().1.id())
        .collect();

    assert_eq!(
        replayed,
        pending.iter().map(|p| p.id()).collect::<Vec<_>>()
    );
}

#[test]
fn withdrawn_query_is_skipped() {
    let (discovery, dispatched) = discovery();

    let peer = Node::random();
    discovery.add_node(peer.clone()).unwrap();

    let q1 = discovery.find_node(peer.id(), NodeId::random()).unwrap();
    let q2 = discovery.find_node(peer.id(), NodeId::random()).unwrap();
    let q3 = discovery.find_node(peer.id(), NodeId::random()).unwrap();

    assert!(discovery.withdraw(q2.id()).unwrap());
    assert_eq!(q2.recv(), Err(QueryError::Withdrawn));

    discovery.bonded(peer.id()).unwrap();

    let replayed: Vec<_> = dispatched.try_iter().map(|(_, q)| q.id()).collect();
    assert_eq!(replayed, vec![q1.id(), q3.id()]);
}

#[test]
fn replay_precedes_concurrent_submissions() {
    let (dispatcher, dispatched) = flume::unbounded::<(Node, FindNodeQuery)>();

    let discovery = Discovery::builder()
        .max_deferred_queries(64)
        .build(dispatcher)
        .unwrap();

    let peer = Node::random();
    discovery.add_node(peer.clone()).unwrap();

    let deferred: Vec<_> = (0..10)
        .map(|_| discovery.find_node(peer.id(), NodeId::random()).unwrap().id())
        .collect();

    let submitters: Vec<_> = (0..4)
        .map(|_| {
            let discovery = discovery.clone();
            let id = *peer.id();

            thread::spawn(move || {
                (0..10)
                    .map(|_| discovery.find_node(&id, NodeId::random()).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    discovery.bonded(peer.id()).unwrap();

    let late: Vec<_> = submitters
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();

    let order: Vec<_> = dispatched.try_iter().map(|(_, q)| q.id()).collect();

    assert_eq!(order.len(), deferred.len() + late.len());
    // Deferred queries keep their relative order and nothing queued after
    // them can overtake them once they are replayed.
    let replayed: Vec<_> = order
        .iter()
        .filter(|id| deferred.contains(id))
        .copied()
        .collect();
    assert_eq!(replayed, deferred);
    assert_eq!(order[..10], deferred[..]);
}

#[test]
fn eviction_and_timeout_answer_callers() {
    let (dispatcher, _dispatched) = flume::unbounded::<(Node, FindNodeQuery)>();

    let discovery = Discovery::builder()
        .deferred_query_timeout(Duration::from_millis(50))
        .tick_interval(Duration::from_millis(5))
        .build(dispatcher)
        .unwrap();

    let evicted = Node::random();
    let slow = Node::random();
    discovery.add_node(evicted.clone()).unwrap();
    discovery.add_node(slow.clone()).unwrap();

    let pending = discovery.find_node(evicted.id(), NodeId::random()).unwrap();
    assert!(discovery.evict(evicted.id()).unwrap());
    assert_eq!(pending.recv(), Err(QueryError::Evicted));
    assert_eq!(discovery.peer_state(evicted.id()).unwrap(), None);

    let pending = discovery.find_node(slow.id(), NodeId::random()).unwrap();
    assert_eq!(
        pending.recv_timeout(Duration::from_secs(5)),
        Some(Err(QueryError::Timeout(Duration::from_millis(50))))
    );
    assert_eq!(discovery.info().unwrap().deferred_queries(), 0);
}

#[test]
fn closest_known_peers() {
    let (discovery, _dispatched) = discovery();

    let nodes: Vec<Node> = (0..32).map(|_| Node::random()).collect();
    for node in &nodes {
        discovery.add_node(node.clone()).unwrap();
    }

    let target = ProximityHash::random();
    let closest = discovery.closest(target, 8).unwrap();

    let mut expected = nodes;
    kadpeer::sort_by_proximity(&target, &mut expected);

    assert_eq!(closest, expected[..8]);
}

#[test]
fn bootstrap_from_config() {
    let good = Node::random();

    let (dispatcher, _dispatched) = flume::unbounded::<(Node, FindNodeQuery)>();
    let discovery = Discovery::builder()
        .bootstrap(&[good.to_string()])
        .extra_bootstrap(&["enode://nope@127.0.0.1:30303"])
        .build(dispatcher)
        .unwrap();

    let info = discovery.info().unwrap();
    assert_eq!(info.peers(), 1);
    assert_eq!(info.unbonded(), 1);
    assert_eq!(discovery.address(good.id()).unwrap(), Some(good.addr()));
}

#[test]
fn closest_with_any_count_keeps_the_loop_alive() {
    let (discovery, _dispatched) = discovery();

    let peer = Node::random();
    discovery.add_node(peer.clone()).unwrap();
    let pending = discovery.find_node(peer.id(), NodeId::random()).unwrap();

    let closest = discovery.closest(ProximityHash::random(), usize::MAX).unwrap();
    assert_eq!(closest, vec![peer.clone()]);

    assert_eq!(discovery.info().unwrap().deferred_queries(), 1);
    assert_eq!(pending.recv_timeout(Duration::from_millis(20)), None);
    assert_eq!(discovery.bonded(peer.id()).unwrap(), Some(1));
}
