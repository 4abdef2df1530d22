//! A single peer's shared mutable state.
//!
//! All of `owned_blocks`, `known_peers`, `fixed_unchoked`,
//! `optimistic_unchoked`, `seeding` and `total_blocks` live behind one
//! `std::sync::Mutex`, shared via `Arc` across the block server, the
//! download loop and the choke scheduler. Every critical section here is
//! synchronous; callers are responsible for never holding the lock across a
//! network call (see [`super::download`] and [`super::choke`]).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::{Address, BlockId, PeerId};

struct Inner {
    owned_blocks: HashSet<BlockId>,
    total_blocks: Option<u32>,
    known_peers: HashMap<PeerId, Address>,
    fixed_unchoked: HashSet<PeerId>,
    optimistic_unchoked: Option<PeerId>,
    seeding: bool,
}

/// Shared state for one peer instance.
pub struct PeerState {
    pub peer_id: PeerId,
    pub self_address: Address,
    inner: Mutex<Inner>,
}

impl PeerState {
    pub fn new(peer_id: PeerId, self_address: Address) -> Self {
        Self {
            peer_id,
            self_address,
            inner: Mutex::new(Inner {
                owned_blocks: HashSet::new(),
                total_blocks: None,
                known_peers: HashMap::new(),
                fixed_unchoked: HashSet::new(),
                optimistic_unchoked: None,
                seeding: false,
            }),
        }
    }

    /// Records the result of a successful registration: the initial block
    /// set and the swarm's total block count. Called once, at startup.
    pub fn apply_registration(&self, initial_blocks: Vec<BlockId>, total_blocks: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.owned_blocks.extend(initial_blocks);
        inner.total_blocks = Some(total_blocks);
        Self::maybe_enter_seeding(&mut inner);
    }

    pub fn total_blocks(&self) -> Option<u32> {
        self.inner.lock().unwrap().total_blocks
    }

    pub fn owned_blocks(&self) -> HashSet<BlockId> {
        self.inner.lock().unwrap().owned_blocks.clone()
    }

    pub fn owned_count(&self) -> usize {
        self.inner.lock().unwrap().owned_blocks.len()
    }

    pub fn is_seeding(&self) -> bool {
        self.inner.lock().unwrap().seeding
    }

    /// The blocks not yet owned, i.e. `[0, total_blocks) \ owned_blocks`.
    /// Returns `None` while `total_blocks` is still unknown.
    pub fn missing_blocks(&self) -> Option<HashSet<BlockId>> {
        let inner = self.inner.lock().unwrap();
        let total = inner.total_blocks?;
        Some((0..total).filter(|b| !inner.owned_blocks.contains(b)).collect())
    }

    pub fn known_peers(&self) -> HashMap<PeerId, Address> {
        self.inner.lock().unwrap().known_peers.clone()
    }

    /// Merges newly discovered peers into `known_peers`. Peers are only
    /// ever added, never removed, by the core engine.
    pub fn merge_known_peers(&self, discovered: HashMap<PeerId, Address>) {
        let mut inner = self.inner.lock().unwrap();
        inner.known_peers.extend(discovered);
    }

    /// Adds a newly acquired block to `owned_blocks` and flips into seeding
    /// mode if that completes the set. Returns the full owned set after the
    /// update, for the caller to report to the tracker.
    pub fn add_block(&self, block_id: BlockId) -> HashSet<BlockId> {
        let mut inner = self.inner.lock().unwrap();
        inner.owned_blocks.insert(block_id);
        Self::maybe_enter_seeding(&mut inner);
        inner.owned_blocks.clone()
    }

    fn maybe_enter_seeding(inner: &mut Inner) {
        if let Some(total) = inner.total_blocks {
            if !inner.seeding && inner.owned_blocks.len() as u32 >= total {
                inner.seeding = true;
                log::info!("all {total} blocks acquired, entering seeding mode");
            }
        }
    }

    /// Replaces the optimistic-unchoke slot with `peer_id`.
    pub fn set_optimistic_unchoked(&self, peer_id: Option<PeerId>) {
        self.inner.lock().unwrap().optimistic_unchoked = peer_id;
    }

    /// Atomically replaces the fixed-unchoke set.
    pub fn set_fixed_unchoked(&self, peers: HashSet<PeerId>) {
        self.inner.lock().unwrap().fixed_unchoked = peers;
    }

    /// A snapshot of the current fixed-unchoke set.
    pub fn fixed_unchoked(&self) -> HashSet<PeerId> {
        self.inner.lock().unwrap().fixed_unchoked.clone()
    }

    /// A snapshot of the current optimistic-unchoke slot, if any.
    pub fn optimistic_unchoked(&self) -> Option<PeerId> {
        self.inner.lock().unwrap().optimistic_unchoked.clone()
    }

    /// The block-server decision procedure (§4.2): whether `requester`
    /// would currently be allowed to fetch `block_id`, and whether we even
    /// own it. Exposed directly to keep [`super::server`] a thin transport
    /// adapter.
    pub fn serve_decision(&self, block_id: BlockId, requester: &str) -> ServeDecision {
        let inner = self.inner.lock().unwrap();
        if inner.seeding {
            return if inner.owned_blocks.contains(&block_id) {
                ServeDecision::Serve
            } else {
                ServeDecision::Missing
            };
        }

        let allowed = inner.fixed_unchoked.contains(requester)
            || inner.optimistic_unchoked.as_deref() == Some(requester);
        if !allowed {
            return ServeDecision::Choked;
        }
        if inner.owned_blocks.contains(&block_id) {
            ServeDecision::Serve
        } else {
            ServeDecision::Missing
        }
    }
}

/// Outcome of [`PeerState::serve_decision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeDecision {
    Serve,
    Choked,
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(total_blocks: u32, owned: &[BlockId]) -> PeerState {
        let state = PeerState::new("self".into(), "http://self".into());
        state.apply_registration(owned.to_vec(), total_blocks);
        state
    }

    #[test]
    fn choked_by_default() {
        let state = state_with(10, &[0, 1, 2]);
        assert_eq!(state.serve_decision(0, "anyone"), ServeDecision::Choked);
    }

    #[test]
    fn fixed_unchoked_can_fetch_owned_block() {
        let state = state_with(10, &[0, 1, 2]);
        state.set_fixed_unchoked(["x".to_string()].into_iter().collect());
        assert_eq!(state.serve_decision(0, "x"), ServeDecision::Serve);
        assert_eq!(state.serve_decision(5, "x"), ServeDecision::Missing);
    }

    #[test]
    fn optimistic_unchoked_can_fetch() {
        let state = state_with(10, &[0]);
        state.set_optimistic_unchoked(Some("y".to_string()));
        assert_eq!(state.serve_decision(0, "y"), ServeDecision::Serve);
        assert_eq!(state.serve_decision(0, "z"), ServeDecision::Choked);
    }

    #[test]
    fn seeder_serves_anyone_for_owned_blocks() {
        let state = state_with(2, &[0, 1]);
        assert!(state.is_seeding());
        assert_eq!(state.serve_decision(0, "stranger"), ServeDecision::Serve);
        assert_eq!(state.serve_decision(1, "stranger"), ServeDecision::Serve);
    }

    #[test]
    fn missing_blocks_computed_correctly() {
        let state = state_with(5, &[0, 2]);
        let missing = state.missing_blocks().unwrap();
        assert_eq!(missing, [1, 3, 4].into_iter().collect());
    }

    #[test]
    fn missing_blocks_none_before_registration() {
        let state = PeerState::new("self".into(), "http://self".into());
        assert!(state.missing_blocks().is_none());
    }

    #[test]
    fn add_block_can_trigger_seeding() {
        let state = state_with(2, &[0]);
        assert!(!state.is_seeding());
        state.add_block(1);
        assert!(state.is_seeding());
    }
}
