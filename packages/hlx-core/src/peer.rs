//! Connected-peer bookkeeping shared by the server and proxy roles.
//!
//! Tracks every live downstream session and its outbound frame queue.
//! Frames are payloads without brackets; the session task brackets them
//! on write.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;

/// Identifier of one connected peer.
pub type PeerId = u64;

struct PeerHandle {
    frames: mpsc::UnboundedSender<String>,
}

/// Registry of live peers with frame fan-out.
#[derive(Default)]
pub struct PeerRegistry {
    peers: DashMap<PeerId, PeerHandle>,
    next_id: AtomicU64,
}

impl PeerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a peer, returning its identifier and the receiving end
    /// of its outbound frame queue.
    pub fn register(&self) -> (PeerId, mpsc::UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers.insert(id, PeerHandle { frames: tx });
        (id, rx)
    }

    /// Removes a peer. Idempotent.
    pub fn unregister(&self, peer: PeerId) {
        self.peers.remove(&peer);
    }

    /// Number of live peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// True when no peer is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Queues frames for one peer.
    pub fn send_to(&self, peer: PeerId, frames: &[String]) {
        if let Some(handle) = self.peers.get(&peer) {
            for frame in frames {
                let _ = handle.frames.send(frame.clone());
            }
        }
    }

    /// Queues frames for every peer.
    pub fn broadcast_all(&self, frames: &[String]) {
        for entry in self.peers.iter() {
            for frame in frames {
                let _ = entry.value().frames.send(frame.clone());
            }
        }
    }

    /// Queues frames for every peer except `requester`.
    pub fn broadcast_except(&self, requester: PeerId, frames: &[String]) {
        if frames.is_empty() {
            return;
        }
        for entry in self.peers.iter() {
            if *entry.key() == requester {
                continue;
            }
            for frame in frames {
                let _ = entry.value().frames.send(frame.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_except_skips_the_requester() {
        let registry = PeerRegistry::new();
        let (a, mut rx_a) = registry.register();
        let (_b, mut rx_b) = registry.register();

        registry.broadcast_except(a, &["VMO1".to_string()]);
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().unwrap(), "VMO1");
    }

    #[test]
    fn unregistered_peer_receives_nothing() {
        let registry = PeerRegistry::new();
        let (a, mut rx_a) = registry.register();
        registry.unregister(a);
        registry.send_to(a, &["QO1".to_string()]);
        assert!(rx_a.try_recv().is_err());
        assert!(registry.is_empty());
    }
}
