//! Peer discovery for Grabdrop.
//!
//! [`DeviceRegistry`] is the single place where known peers live. The
//! discovery layer (mDNS when the `mdns` feature is enabled) only ever calls
//! [`DeviceRegistry::announce`] and [`DeviceRegistry::withdraw`]; the gesture
//! pipeline only ever reads a [`RegistrySnapshot`].
//!
//! ## Concurrency
//!
//! Announcements and withdrawals may arrive from any thread, concurrently
//! with each other and with readers. Writers serialize on one lock and
//! publish a fresh immutable peer list; readers clone the current list
//! pointer and never see a half-applied update.
//!
//! ## Target selection
//!
//! [`RegistrySnapshot::select_by_position`] implements a deliberately simple
//! aiming rule: a lone peer is always the target, otherwise the hand has to
//! be near the right edge of the frame and the first discovered peer wins.
//! There is no spatial model of where peers physically are.

#[cfg(feature = "mdns")]
pub mod mdns;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::gesture::{FrameSize, HandPosition};

/// A device that can receive transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Stable identifier assigned by the discovery layer
    pub id: String,
    /// Human-readable device name
    pub name: String,
    /// Network address
    pub address: IpAddr,
    /// Receiver port
    pub port: u16,
    /// Last time the peer announced itself
    pub last_seen: DateTime<Utc>,
}

impl Peer {
    /// Address the receiver listens on.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

/// Immutable, point-in-time view of the registry.
///
/// Cheap to clone; later registry mutations never affect it.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    peers: Arc<[Peer]>,
}

impl RegistrySnapshot {
    /// Peers in discovery order.
    #[must_use]
    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    /// Number of peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// True if no peer is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Find a peer by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Peer> {
        self.peers.iter().find(|p| p.id == id)
    }

    /// Find a peer by display name (case-insensitive).
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Peer> {
        self.peers
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Pick the peer the hand is aiming at.
    ///
    /// - no peers: `None`
    /// - exactly one peer: that peer, wherever the hand is
    /// - otherwise: the first peer if `x > frame.width - edge_margin`, else `None`
    #[must_use]
    pub fn select_by_position(
        &self,
        position: HandPosition,
        frame: FrameSize,
        edge_margin: u32,
    ) -> Option<&Peer> {
        match self.peers.as_ref() {
            [] => None,
            [only] => Some(only),
            [first, ..] => {
                let edge = i64::from(frame.width) - i64::from(edge_margin);
                (i64::from(position.x) > edge).then_some(first)
            }
        }
    }
}

/// Concurrent map of discovered peers.
///
/// Clones share the same underlying registry.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    peers: Arc<RwLock<Arc<[Peer]>>>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a peer, or refresh it in place if already known.
    ///
    /// Returns `true` if the peer was not known before.
    pub fn announce(&self, id: &str, name: &str, address: IpAddr, port: u16) -> bool {
        let now = Utc::now();
        let mut guard = self.peers.write();

        let mut peers = guard.to_vec();
        let is_new = match peers.iter_mut().find(|p| p.id == id) {
            Some(existing) => {
                existing.name = name.to_string();
                existing.address = address;
                existing.port = port;
                existing.last_seen = now;
                false
            }
            None => {
                peers.push(Peer {
                    id: id.to_string(),
                    name: name.to_string(),
                    address,
                    port,
                    last_seen: now,
                });
                true
            }
        };
        *guard = peers.into();
        drop(guard);

        if is_new {
            tracing::info!(peer = %name, %address, port, "Peer discovered");
        } else {
            tracing::debug!(peer = %name, %address, port, "Peer refreshed");
        }
        is_new
    }

    /// Remove a peer. Unknown ids are ignored.
    pub fn withdraw(&self, id: &str) -> Option<Peer> {
        let mut guard = self.peers.write();

        let index = guard.iter().position(|p| p.id == id)?;
        let mut peers = guard.to_vec();
        let removed = peers.remove(index);
        *guard = peers.into();
        drop(guard);

        tracing::info!(peer = %removed.name, "Peer removed");
        Some(removed)
    }

    /// Consistent copy of the current peers.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            peers: Arc::clone(&self.peers.read()),
        }
    }

    /// Number of known peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// True if no peer is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Select a target against the current snapshot; see
    /// [`RegistrySnapshot::select_by_position`].
    #[must_use]
    pub fn select_by_position(
        &self,
        position: HandPosition,
        frame: FrameSize,
        edge_margin: u32,
    ) -> Option<Peer> {
        self.snapshot()
            .select_by_position(position, frame, edge_margin)
            .cloned()
    }
}
