//! Tests for the device registry under concurrent use.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use common::lan_ip;
use grabdrop_core::discovery::DeviceRegistry;
use grabdrop_core::gesture::{FrameSize, HandPosition};

const WRITERS: usize = 4;
const READERS: usize = 4;
const PEERS_PER_WRITER: usize = 50;

fn peer_id(writer: usize, n: usize) -> String {
    format!("w{writer}-p{n}")
}

fn peer_name(id: &str) -> String {
    format!("device-{id}")
}

fn peer_port(n: usize) -> u16 {
    5000 + u16::try_from(n).unwrap()
}

/// Concurrent announce/withdraw never produces a torn or stale snapshot.
#[test]
fn test_concurrent_announce_withdraw_and_snapshot() {
    let registry = DeviceRegistry::new();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let registry = registry.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut snapshots = 0;
                loop {
                    let finished = done.load(Ordering::Acquire);
                    let snapshot = registry.snapshot();
                    for peer in snapshot.peers() {
                        // Every field must come from the same announcement.
                        assert_eq!(peer.name, peer_name(&peer.id));
                        let n: usize = peer.id.rsplit('p').next().unwrap().parse().unwrap();
                        assert_eq!(peer.port, peer_port(n));
                    }
                    snapshots += 1;
                    if finished {
                        break snapshots;
                    }
                }
            })
        })
        .collect();

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let registry = registry.clone();
            thread::spawn(move || {
                for n in 0..PEERS_PER_WRITER {
                    let id = peer_id(w, n);
                    registry.announce(&id, &peer_name(&id), lan_ip(10), peer_port(n));
                    // Re-announce is idempotent.
                    registry.announce(&id, &peer_name(&id), lan_ip(10), peer_port(n));
                }
                for n in (1..PEERS_PER_WRITER).step_by(2) {
                    let id = peer_id(w, n);
                    assert!(registry.withdraw(&id).is_some());
                    // Once withdrawn, no later snapshot can contain it.
                    assert!(registry.snapshot().get(&id).is_none());
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    done.store(true, Ordering::Release);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.len(), WRITERS * PEERS_PER_WRITER / 2);
    for w in 0..WRITERS {
        for n in 0..PEERS_PER_WRITER {
            let present = snapshot.get(&peer_id(w, n)).is_some();
            assert_eq!(present, n % 2 == 0, "peer {}", peer_id(w, n));
        }
    }
}

/// Snapshot order follows first announcement, across re-announces.
#[test]
fn test_snapshot_order_is_discovery_order() {
    let registry = DeviceRegistry::new();
    for id in ["c", "a", "b"] {
        registry.announce(id, id, lan_ip(1), 5000);
    }
    registry.announce("c", "c-renamed", lan_ip(2), 5001);
    registry.withdraw("a");
    registry.announce("a", "a", lan_ip(3), 5000);

    let ids: Vec<_> = registry
        .snapshot()
        .peers()
        .iter()
        .map(|p| p.id.clone())
        .collect();
    assert_eq!(ids, ["c", "b", "a"]);
}

/// Selection follows the registry: first peer in snapshot order wins.
#[test]
fn test_selection_tracks_registry_changes() {
    let registry = DeviceRegistry::new();
    let frame = FrameSize::new(640, 480);
    let edge = HandPosition::new(600, 300);
    let centre = HandPosition::new(320, 240);

    assert!(registry.select_by_position(edge, frame, 200).is_none());

    registry.announce("a", "Alpha", lan_ip(10), 5000);
    assert_eq!(
        registry.select_by_position(centre, frame, 200).map(|p| p.id),
        Some("a".to_string())
    );

    registry.announce("b", "Beta", lan_ip(11), 5000);
    assert!(registry.select_by_position(centre, frame, 200).is_none());
    assert_eq!(
        registry.select_by_position(edge, frame, 200).map(|p| p.id),
        Some("a".to_string())
    );

    registry.withdraw("a");
    assert_eq!(
        registry.select_by_position(centre, frame, 200).map(|p| p.id),
        Some("b".to_string())
    );
}
