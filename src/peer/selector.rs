//! The rarest-first block selector (§4.3).

use std::collections::{HashMap, HashSet};

use rand::seq::IteratorRandom;

use crate::{Address, BlockId, PeerId};

use super::client::TrackerClient;
use super::state::PeerState;

/// What to fetch next, and from whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pick {
    pub block_id: BlockId,
    pub source_peer: PeerId,
}

/// Runs one selection round: queries the tracker for ownership of our
/// missing blocks, picks the rarest one with at least one owner we know
/// about, and returns a random such owner. Returns `None` at any point
/// where there's nothing actionable (no missing blocks, no reachable
/// owners, or none of the owners are in `known_peers`).
pub async fn select_rarest(
    state: &PeerState,
    tracker: &TrackerClient,
) -> Option<Pick> {
    let missing = state.missing_blocks()?;
    if missing.is_empty() {
        return None;
    }

    let owners = tracker.block_info(&missing).await.ok()?;
    let known_peers = state.known_peers();
    pick_from_owners(&owners, &known_peers)
}

/// Pure selection logic, split out from the tracker call for direct
/// testing (§8 property 5: rarest-first correctness).
pub fn pick_from_owners(
    owners: &HashMap<BlockId, Vec<PeerId>>,
    known_peers: &HashMap<PeerId, Address>,
) -> Option<Pick> {
    let (chosen_block, chosen_owners) = owners
        .iter()
        .filter(|(_, owners)| !owners.is_empty())
        .min_by_key(|(_, owners)| owners.len())?;

    let candidates: HashSet<&PeerId> = chosen_owners
        .iter()
        .filter(|p| known_peers.contains_key(*p))
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let source_peer = candidates
        .into_iter()
        .choose(&mut rand::thread_rng())
        .expect("candidates is non-empty")
        .clone();

    Some(Pick {
        block_id: *chosen_block,
        source_peer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(ids: &[&str]) -> HashMap<PeerId, Address> {
        ids.iter()
            .map(|id| (id.to_string(), format!("http://{id}")))
            .collect()
    }

    #[test]
    fn prefers_the_rarest_block() {
        let mut owners = HashMap::new();
        for block in 0..7 {
            owners.insert(block, vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        }
        owners.insert(7, vec!["d".to_string()]);

        let pick = pick_from_owners(&owners, &known(&["a", "b", "c", "d"])).unwrap();
        assert_eq!(pick.block_id, 7);
        assert_eq!(pick.source_peer, "d");
    }

    #[test]
    fn ignores_unreachable_blocks() {
        let mut owners = HashMap::new();
        owners.insert(0, vec![]);
        owners.insert(1, vec!["a".to_string()]);
        let pick = pick_from_owners(&owners, &known(&["a"])).unwrap();
        assert_eq!(pick.block_id, 1);
    }

    #[test]
    fn returns_none_when_nothing_reachable() {
        let mut owners = HashMap::new();
        owners.insert(0, vec![]);
        owners.insert(1, vec![]);
        assert!(pick_from_owners(&owners, &known(&["a"])).is_none());
    }

    #[test]
    fn returns_none_when_owners_are_unknown_to_us() {
        let mut owners = HashMap::new();
        owners.insert(0, vec!["stranger".to_string()]);
        assert!(pick_from_owners(&owners, &known(&["a"])).is_none());
    }

    #[test]
    fn only_picks_among_known_owners_of_the_rarest_block() {
        let mut owners = HashMap::new();
        owners.insert(0, vec!["a".to_string(), "stranger".to_string()]);
        let pick = pick_from_owners(&owners, &known(&["a"])).unwrap();
        assert_eq!(pick.source_peer, "a");
    }
}
