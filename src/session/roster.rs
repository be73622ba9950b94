// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hub-side peer roster: two-level name -> addr -> record map, plus the
//! liveness sweep that ages out stale peers.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Liveness sweep runs every 2 s.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(2);
/// A peer not heard from in 6 s (one heartbeat period + grace) is stale.
pub const STALE_AFTER: Duration = Duration::from_secs(6);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Online,
    Offline,
}

#[derive(Debug, Clone)]
pub struct PeerRecord {
    pub addr: String,
    pub last_seen: Instant,
    pub state: PeerState,
    /// When this peer was marked offline by `sweep`, retained for history.
    pub discarded_at: Option<Instant>,
}

/// name -> addr -> record.
#[derive(Default)]
pub struct Roster {
    peers: DashMap<String, DashMap<String, PeerRecord>>,
    /// Flattened online snapshot, refreshed by the liveness sweep; a single
    /// rwlock is simpler than a sharded map for a read-mostly snapshot.
    online_snapshot: RwLock<HashMap<String, String>>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
            online_snapshot: RwLock::new(HashMap::new()),
        }
    }

    /// Registers or refreshes a peer's `last_seen` on a valid CONNECT/HEARTBEAT.
    pub fn touch(&self, name: &str, addr: &str) {
        let by_addr = self.peers.entry(name.to_string()).or_default();
        by_addr.insert(
            addr.to_string(),
            PeerRecord {
                addr: addr.to_string(),
                last_seen: Instant::now(),
                state: PeerState::Online,
                discarded_at: None,
            },
        );
        drop(by_addr);
        self.online_snapshot
            .write()
            .insert(name.to_string(), addr.to_string());
    }

    /// Every address currently known for `name`.
    pub fn addresses(&self, name: &str) -> Vec<String> {
        self.peers
            .get(name)
            .map(|by_addr| by_addr.iter().map(|e| e.key().clone()).collect())
            .unwrap_or_default()
    }

    pub fn all_names(&self) -> Vec<String> {
        self.peers.iter().map(|e| e.key().clone()).collect()
    }

    /// Marks any peer whose `last_seen` predates `STALE_AFTER` as offline.
    /// Returns the names transitioned to offline this sweep.
    pub fn sweep(&self) -> Vec<String> {
        let now = Instant::now();
        let mut discarded = Vec::new();
        for entry in self.peers.iter() {
            let name = entry.key().clone();
            let mut any_online = false;
            for mut rec in entry.value().iter_mut() {
                if rec.state == PeerState::Online && now.duration_since(rec.last_seen) > STALE_AFTER
                {
                    rec.state = PeerState::Offline;
                    rec.discarded_at = Some(now);
                } else if rec.state == PeerState::Online {
                    any_online = true;
                }
            }
            if !any_online {
                discarded.push(name.clone());
                self.online_snapshot.write().remove(&name);
            }
        }
        discarded
    }

    /// Snapshot of name -> one known address, for the embedder-facing API.
    pub fn online_table(&self) -> HashMap<String, String> {
        self.online_snapshot.read().clone()
    }

    /// When `name`/`addr` was last marked offline by `sweep`, if ever.
    pub fn discarded_at(&self, name: &str, addr: &str) -> Option<Instant> {
        self.peers
            .get(name)
            .and_then(|by_addr| by_addr.get(addr).and_then(|rec| rec.discarded_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_then_sweep_keeps_fresh_peer_online() {
        let roster = Roster::new();
        roster.touch("n1", "1.2.3.4:9000");
        let discarded = roster.sweep();
        assert!(discarded.is_empty());
        assert_eq!(roster.online_table().get("n1").unwrap(), "1.2.3.4:9000");
    }

    #[test]
    fn stale_peer_is_discarded_by_sweep() {
        let roster = Roster::new();
        roster.touch("n1", "1.2.3.4:9000");
        {
            let by_addr = roster.peers.get("n1").unwrap();
            let mut rec = by_addr.get_mut("1.2.3.4:9000").unwrap();
            rec.last_seen = Instant::now() - Duration::from_secs(10);
        }
        let discarded = roster.sweep();
        assert_eq!(discarded, vec!["n1".to_string()]);
        assert!(!roster.online_table().contains_key("n1"));
        assert!(roster.discarded_at("n1", "1.2.3.4:9000").is_some());
    }

    #[test]
    fn fresh_peer_has_no_discard_time() {
        let roster = Roster::new();
        roster.touch("n1", "1.2.3.4:9000");
        assert!(roster.discarded_at("n1", "1.2.3.4:9000").is_none());
    }

    #[test]
    fn multiple_addresses_share_a_name() {
        let roster = Roster::new();
        roster.touch("n1", "addr-a");
        roster.touch("n1", "addr-b");
        let mut addrs = roster.addresses("n1");
        addrs.sort();
        assert_eq!(addrs, vec!["addr-a".to_string(), "addr-b".to_string()]);
    }
}
