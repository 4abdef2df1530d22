//! The tracker's in-memory swarm bookkeeping.
//!
//! A single [`TrackerState`] instance is shared (behind an `Arc`) by every
//! HTTP handler in [`super::http`]. All mutation happens under one mutex;
//! see the module-level concurrency notes in the crate root for why a plain
//! `std::sync::Mutex` is appropriate here (every critical section is
//! synchronous, no `.await` is ever taken while held).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use rand::seq::SliceRandom;

use crate::conf::TrackerConf;
use crate::error::TrackerError;
use crate::{Address, BlockId, PeerId, TRACKER_PSEUDO_PEER};

/// What a peer receives back from a successful (or repeated) `register`
/// call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub initial_blocks: Vec<BlockId>,
    pub total_blocks: u32,
}

struct Inner {
    active_peers: HashMap<PeerId, Address>,
    peer_blocks: HashMap<PeerId, HashSet<BlockId>>,
    undistributed_blocks: HashSet<BlockId>,
}

/// Process-wide authority over swarm membership and per-peer block
/// ownership.
pub struct TrackerState {
    conf: TrackerConf,
    inner: Mutex<Inner>,
}

impl TrackerState {
    /// Creates a fresh tracker for a swarm of `conf.total_blocks` blocks.
    /// The `tracker` pseudo-peer is seeded with every block up front, purely
    /// as advisory bookkeeping (see crate docs) — it is never returned from
    /// [`TrackerState::block_info`].
    pub fn new(conf: TrackerConf) -> Self {
        let all_blocks: HashSet<BlockId> = (0..conf.total_blocks).collect();
        let mut peer_blocks = HashMap::new();
        peer_blocks.insert(TRACKER_PSEUDO_PEER.to_string(), all_blocks.clone());
        Self {
            conf,
            inner: Mutex::new(Inner {
                active_peers: HashMap::new(),
                peer_blocks,
                undistributed_blocks: all_blocks,
            }),
        }
    }

    pub fn total_blocks(&self) -> u32 {
        self.conf.total_blocks
    }

    /// Registers `peer_id` at `address`, idempotently.
    ///
    /// If the peer is already known, its existing initial assignment is
    /// returned unchanged. Otherwise a fresh initial set is drawn, biased
    /// toward blocks that have never been handed to anyone (see the module
    /// docs for the exact policy), and the peer is recorded.
    pub fn register(&self, peer_id: PeerId, address: Address) -> Registration {
        let mut inner = self.inner.lock().unwrap();

        if let Some(blocks) = inner.peer_blocks.get(&peer_id) {
            let mut initial_blocks: Vec<BlockId> = blocks.iter().copied().collect();
            initial_blocks.sort_unstable();
            return Registration {
                initial_blocks,
                total_blocks: self.conf.total_blocks,
            };
        }

        inner.active_peers.insert(peer_id.clone(), address);

        let k = self
            .conf
            .initial_blocks_per_peer
            .min(self.conf.total_blocks as usize);

        let mut rng = rand::thread_rng();
        let initial: HashSet<BlockId> = if !inner.undistributed_blocks.is_empty() {
            // Bias toward coverage: draw only from blocks nobody has ever
            // held, even if that yields fewer than `k` blocks. We
            // deliberately don't top up from already-distributed blocks
            // here — see the crate-level open question on this branch.
            let mut pool: Vec<BlockId> = inner.undistributed_blocks.iter().copied().collect();
            pool.shuffle(&mut rng);
            let take = k.min(pool.len());
            let chosen: HashSet<BlockId> = pool.into_iter().take(take).collect();
            for block in &chosen {
                inner.undistributed_blocks.remove(block);
            }
            chosen
        } else {
            let mut pool: Vec<BlockId> = (0..self.conf.total_blocks).collect();
            pool.shuffle(&mut rng);
            pool.into_iter().take(k).collect()
        };

        let mut initial_blocks: Vec<BlockId> = initial.iter().copied().collect();
        initial_blocks.sort_unstable();
        log::info!(
            "peer {peer_id} registered with {} initial blocks ({} left undistributed)",
            initial_blocks.len(),
            inner.undistributed_blocks.len()
        );
        inner.peer_blocks.insert(peer_id, initial);

        Registration {
            initial_blocks,
            total_blocks: self.conf.total_blocks,
        }
    }

    /// Returns up to `peer_sample_size` active peers other than `requester`,
    /// sampled uniformly without replacement. A requester unknown to the
    /// tracker is still served.
    pub fn list_peers(&self, requester: &str) -> HashMap<PeerId, Address> {
        let inner = self.inner.lock().unwrap();
        let mut candidates: Vec<(&PeerId, &Address)> = inner
            .active_peers
            .iter()
            .filter(|(id, _)| id.as_str() != requester)
            .collect();
        candidates.shuffle(&mut rand::thread_rng());
        candidates
            .into_iter()
            .take(self.conf.peer_sample_size)
            .map(|(id, addr)| (id.clone(), addr.clone()))
            .collect()
    }

    /// For each requested block, returns the list of peer-ids currently
    /// holding it (excluding the `tracker` pseudo-peer). Unknown block-ids
    /// map to an empty list.
    pub fn block_info(&self, block_ids: &[BlockId]) -> HashMap<BlockId, Vec<PeerId>> {
        let inner = self.inner.lock().unwrap();
        block_ids
            .iter()
            .map(|&block_id| {
                let owners: Vec<PeerId> = inner
                    .peer_blocks
                    .iter()
                    .filter(|(id, blocks)| {
                        id.as_str() != TRACKER_PSEUDO_PEER && blocks.contains(&block_id)
                    })
                    .map(|(id, _)| id.clone())
                    .collect();
                (block_id, owners)
            })
            .collect()
    }

    /// Unions `blocks` into `peer_id`'s owned set. Fails with
    /// [`TrackerError::PeerUnknown`] if the peer was never registered.
    /// Monotone: a peer can never drop blocks through this call.
    pub fn update_blocks(
        &self,
        peer_id: &str,
        blocks: HashSet<BlockId>,
    ) -> Result<(), TrackerError> {
        let mut inner = self.inner.lock().unwrap();
        let owned = inner
            .peer_blocks
            .get_mut(peer_id)
            .ok_or(TrackerError::PeerUnknown)?;
        owned.extend(blocks);
        log::info!("peer {peer_id} now owns {} blocks", owned.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conf(total_blocks: u32) -> TrackerConf {
        TrackerConf {
            total_blocks,
            initial_blocks_per_peer: 4,
            peer_sample_size: 5,
        }
    }

    #[test]
    fn register_is_idempotent() {
        let tracker = TrackerState::new(conf(10));
        let first = tracker.register("a".into(), "http://a".into());
        let second = tracker.register("a".into(), "http://a".into());
        assert_eq!(first, second);
    }

    #[test]
    fn register_caps_initial_set_at_total_blocks() {
        let tracker = TrackerState::new(conf(3));
        let reg = tracker.register("a".into(), "http://a".into());
        assert_eq!(reg.total_blocks, 3);
        assert!(reg.initial_blocks.len() <= 3);
    }

    #[test]
    fn undistributed_blocks_exhaust_after_enough_registrations() {
        // total_blocks=10, initial=4: ceil(10/4) = 3 registrations needed.
        let tracker = TrackerState::new(conf(10));
        tracker.register("a".into(), "http://a".into());
        tracker.register("b".into(), "http://b".into());
        tracker.register("c".into(), "http://c".into());

        // Every block must now be owned by at least one peer.
        let info = tracker.block_info(&(0..10).collect::<Vec<_>>());
        for (block, owners) in info {
            assert!(!owners.is_empty(), "block {block} has no owner");
        }
    }

    #[test]
    fn initial_distribution_never_double_assigns_while_undistributed() {
        let tracker = TrackerState::new(conf(10));
        let a = tracker.register("a".into(), "http://a".into());
        let b = tracker.register("b".into(), "http://b".into());
        let a_set: HashSet<_> = a.initial_blocks.into_iter().collect();
        let b_set: HashSet<_> = b.initial_blocks.into_iter().collect();
        assert!(a_set.is_disjoint(&b_set));
    }

    #[test]
    fn block_info_excludes_tracker_pseudo_peer() {
        let tracker = TrackerState::new(conf(5));
        let info = tracker.block_info(&[0, 1, 2, 3, 4]);
        for owners in info.values() {
            assert!(!owners.iter().any(|p| p == TRACKER_PSEUDO_PEER));
        }
    }

    #[test]
    fn block_info_reports_unknown_block_as_empty() {
        let tracker = TrackerState::new(conf(5));
        let info = tracker.block_info(&[999]);
        assert_eq!(info.get(&999), Some(&Vec::new()));
    }

    #[test]
    fn update_blocks_is_monotone_and_unions() {
        let tracker = TrackerState::new(conf(10));
        tracker.register("a".into(), "http://a".into());
        tracker
            .update_blocks("a", [1, 2].into_iter().collect())
            .unwrap();
        tracker
            .update_blocks("a", [3].into_iter().collect())
            .unwrap();
        let info = tracker.block_info(&[1, 2, 3]);
        for owners in info.values() {
            assert!(owners.iter().any(|p| p == "a"));
        }
    }

    #[test]
    fn update_blocks_rejects_unknown_peer() {
        let tracker = TrackerState::new(conf(10));
        let result = tracker.update_blocks("ghost", [1].into_iter().collect());
        assert!(matches!(result, Err(TrackerError::PeerUnknown)));
    }

    #[test]
    fn list_peers_excludes_requester_and_caps_sample() {
        let tracker = TrackerState::new(conf(50));
        for i in 0..8 {
            tracker.register(format!("p{i}"), format!("http://p{i}"));
        }
        let peers = tracker.list_peers("p0");
        assert!(!peers.contains_key("p0"));
        assert!(peers.len() <= 5);
    }

    #[test]
    fn list_peers_returns_all_when_fewer_than_sample_size() {
        let tracker = TrackerState::new(conf(50));
        tracker.register("a".into(), "http://a".into());
        tracker.register("b".into(), "http://b".into());
        let peers = tracker.list_peers("a");
        assert_eq!(peers.len(), 1);
        assert!(peers.contains_key("b"));
    }
}
