//! Simulated lookup against an in-memory network.
//!
//! A fake transport thread answers dispatched `find_node` queries with the
//! nodes it knows closest to the target, and a fake bonding thread confirms
//! peers a little after the lookups were queued.
//!
//! Run: `cargo run --example lookup`

use std::{thread, time::Duration};

use k256::SecretKey;
use kadpeer::{ClosestNodes, Discovery, Error, FindNodeQuery, Node, NodeId};
use tracing::{info, warn, Level};

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    let network: Vec<Node> = (0..200).map(|_| Node::random()).collect();
    let bootstrap: Vec<String> = network[..4].iter().map(|n| n.to_string()).collect();

    let (dispatcher, dispatched) = flume::unbounded::<(Node, FindNodeQuery)>();

    let discovery = Discovery::builder()
        .bootstrap(&bootstrap)
        .extra_bootstrap(&["0xnot-a-node@127.0.0.1:30303"])
        .build(dispatcher)?;

    // Transport: answer every query with the 16 closest nodes of the network.
    let transport_view = network.clone();
    thread::spawn(move || {
        for (to, query) in dispatched.iter() {
            let mut closest = ClosestNodes::with_capacity(query.target().proximity_hash(), 16);
            closest.extend(transport_view.iter().cloned());

            info!(to = %to.addr(), id = %query.id(), "Answering find_node");
            query.respond(closest.into_iter().collect());
        }
    });

    let secret = SecretKey::from_slice(&[7; 32]).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid demo secret")
    })?;
    let local = NodeId::from_public_key(&secret.public_key())?;
    info!(%local, "Looking up our own id");

    let pending: Vec<_> = network[..4]
        .iter()
        .map(|peer| discovery.find_node(peer.id(), local))
        .collect::<Result<_, _>>()?;

    // Bonding: confirm the bootstrap peers after a short delay.
    let bonding = discovery.clone();
    let peers: Vec<NodeId> = network[..4].iter().map(|n| *n.id()).collect();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));

        for id in peers {
            if let Ok(Some(replayed)) = bonding.bonded(&id) {
                info!(%id, replayed, "Bonded");
            }
        }
    });

    let target = local.proximity_hash();
    let mut closest = ClosestNodes::with_capacity(target, 16);

    for query in pending {
        match query.recv() {
            Ok(nodes) => closest.extend(nodes),
            Err(error) => warn!(%error, "Lookup failed"),
        }
    }

    for (i, node) in closest.nodes().iter().enumerate() {
        println!(
            "{i:>2} distance={:>3} {}",
            node.hash().log_distance(&target),
            node
        );
    }

    let info = discovery.info()?;
    println!(
        "peers={} bonded={} deferred={}",
        info.peers(),
        info.bonded(),
        info.deferred_queries()
    );

    discovery.shutdown();

    Ok(())
}
