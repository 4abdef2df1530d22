//! The choke scheduler (§4.5): recomputes the optimistic-unchoke slot every
//! `choke_half_cycle`, and the fixed tit-for-tat unchoke set every other
//! half-cycle. Terminates once the peer starts seeding.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::seq::IteratorRandom;

use crate::conf::PeerConf;
use crate::{Address, BlockId, PeerId};

use super::client::TrackerClient;
use super::state::PeerState;

pub async fn run(state: Arc<PeerState>, tracker: TrackerClient, conf: PeerConf) {
    loop {
        tokio::time::sleep(conf.choke_half_cycle).await;
        if state.is_seeding() {
            log::info!("choke scheduler stopping, peer is seeding");
            return;
        }
        optimistic_unchoke_tick(&state);

        tokio::time::sleep(conf.choke_half_cycle).await;
        if state.is_seeding() {
            log::info!("choke scheduler stopping, peer is seeding");
            return;
        }
        tit_for_tat_tick(&state, &tracker, conf.fixed_unchoke_count, conf.rare_threshold).await;
    }
}

/// At +10s: pick a uniformly random peer from `known_peers \ fixed_unchoked`
/// as the optimistic-unchoke slot. Leaves the slot unchanged if there are no
/// candidates.
fn optimistic_unchoke_tick(state: &PeerState) {
    let known_peers = state.known_peers();
    let fixed = state.fixed_unchoked();
    let candidate = known_peers
        .keys()
        .filter(|peer| !fixed.contains(*peer))
        .choose(&mut rand::thread_rng())
        .cloned();
    if let Some(peer) = candidate {
        log::info!("optimistic unchoke: {peer}");
        state.set_optimistic_unchoked(Some(peer));
    }
}

/// At +20s: score every known peer by how many rare missing blocks it holds
/// and replace `fixed_unchoked` with the top `fixed_unchoke_count` by score.
/// Snapshots `missing`/`known_peers` under the peer lock, then releases it
/// for the tracker call, re-acquiring only to write the result — the lock is
/// never held across the network call.
async fn tit_for_tat_tick(
    state: &PeerState,
    tracker: &TrackerClient,
    fixed_unchoke_count: usize,
    rare_threshold: usize,
) {
    let missing = match state.missing_blocks() {
        Some(m) if !m.is_empty() => m,
        _ => return,
    };
    let known_peers = state.known_peers();

    let owners = match tracker.block_info(&missing).await {
        Ok(owners) => owners,
        Err(err) => {
            log::warn!("tit-for-tat: failed to fetch block info: {err}");
            return;
        }
    };

    let scores = score_peers(&known_peers, &owners, &missing, rare_threshold);
    let mut ranked: Vec<(PeerId, usize)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let top: HashSet<PeerId> = ranked
        .into_iter()
        .take(fixed_unchoke_count)
        .map(|(peer, _)| peer)
        .collect();
    log::info!("fixed unchoke set recomputed: {top:?}");
    state.set_fixed_unchoked(top);
}

/// Pure tit-for-tat scoring, split out for direct testing: `score(p)` is the
/// number of missing blocks owned by `p` that have fewer than
/// `rare_threshold` known owners.
fn score_peers(
    known_peers: &HashMap<PeerId, Address>,
    owners: &HashMap<BlockId, Vec<PeerId>>,
    missing: &HashSet<BlockId>,
    rare_threshold: usize,
) -> HashMap<PeerId, usize> {
    known_peers
        .keys()
        .map(|peer| {
            let score = missing
                .iter()
                .filter(|block| {
                    owners
                        .get(block)
                        .map(|o| o.len() < rare_threshold && o.iter().any(|p| p == peer))
                        .unwrap_or(false)
                })
                .count();
            (peer.clone(), score)
        })
        .collect()
}
