//! The download loop (§4.4): repeatedly picks the rarest reachable block
//! and fetches it, until every block is owned, then idles as a seeder.

use std::sync::Arc;

use rand::Rng;

use crate::conf::PeerConf;
use crate::error::PeerError;

use super::client::{request_block, TrackerClient};
use super::selector::select_rarest;
use super::state::PeerState;

/// Runs until the peer owns every block, then idles, logging a seeding
/// heartbeat on `conf.seeding_heartbeat`, for the lifetime of the task.
pub async fn run(state: Arc<PeerState>, tracker: TrackerClient, conf: PeerConf) {
    let http = reqwest::Client::new();

    loop {
        let total_blocks = match state.total_blocks() {
            Some(total) => total,
            None => {
                tokio::time::sleep(conf.registration_poll_interval).await;
                continue;
            }
        };

        if state.owned_count() as u32 >= total_blocks {
            break;
        }

        // Amortized low-frequency peer discovery refresh (~1 in 10 cycles,
        // matching the reference implementation's random.randint(1, 10)).
        if rand::thread_rng().gen_range(0..10) == 0 {
            if let Ok(discovered) = tracker.list_peers(&state.peer_id).await {
                state.merge_known_peers(discovered);
            }
        }

        match select_rarest(&state, &tracker).await {
            Some(pick) => {
                if let Err(err) = fetch_one(&state, &tracker, &http, &pick.block_id, &pick.source_peer).await {
                    if is_fatal(&err) {
                        log::error!(
                            "tracker no longer recognizes this peer, exiting: {err}"
                        );
                        std::process::exit(1);
                    }
                    match err {
                        PeerError::Choked | PeerError::BlockMissing => {
                            log::debug!(
                                "block {} unavailable from {}: {err}",
                                pick.block_id,
                                pick.source_peer
                            );
                        }
                        other => log::warn!("fetch of block {} failed: {other}", pick.block_id),
                    }
                }
            }
            None => tokio::time::sleep(conf.idle_sleep).await,
        }

        let (lo, hi) = conf.cycle_sleep_range;
        let backoff_ms = rand::thread_rng().gen_range(lo.as_millis()..=hi.as_millis());
        tokio::time::sleep(std::time::Duration::from_millis(backoff_ms as u64)).await;
    }

    log::info!("download complete, entering seeding idle loop");
    loop {
        tokio::time::sleep(conf.seeding_heartbeat).await;
        log::info!("acting as seeder");
    }
}

async fn fetch_one(
    state: &PeerState,
    tracker: &TrackerClient,
    http: &reqwest::Client,
    block_id: &crate::BlockId,
    source_peer: &str,
) -> Result<(), PeerError> {
    let known_peers = state.known_peers();
    let source_address = known_peers
        .get(source_peer)
        .ok_or_else(|| PeerError::Unexpected(format!("unknown source peer {source_peer}")))?;

    let acquired = request_block(http, source_address, &state.peer_id, *block_id).await?;
    let owned = state.add_block(acquired);
    log::info!(
        "acquired block {acquired} from {source_peer}, now own {}/{:?}",
        owned.len(),
        state.total_blocks()
    );
    tracker.update_blocks(&state.peer_id, &owned).await?;
    Ok(())
}

/// Whether `err` should end this peer's process rather than be shrugged off
/// until the next cycle. Per the spec, `PeerUnknown` from `updateBlocks`
/// means the tracker has forgotten us — there's no recovery but re-joining.
fn is_fatal(err: &PeerError) -> bool {
    matches!(err, PeerError::PeerUnknown)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn peer_unknown_is_fatal() {
        assert!(is_fatal(&PeerError::PeerUnknown));
    }

    #[test]
    fn choked_and_missing_are_not_fatal() {
        assert!(!is_fatal(&PeerError::Choked));
        assert!(!is_fatal(&PeerError::BlockMissing));
    }

    #[test]
    fn transport_errors_are_not_fatal() {
        assert!(!is_fatal(&PeerError::Unexpected("boom".into())));
    }

    /// A peer that already owns every block at startup must fall straight
    /// through into the seeding idle loop without ever attempting a
    /// network call (there is no tracker listening at the bogus address
    /// below, so any attempted call would hang/error).
    #[tokio::test]
    async fn download_loop_enters_seeding_idle_without_network_calls() {
        let state = Arc::new(PeerState::new("self".into(), "http://self".into()));
        state.apply_registration((0..3).collect(), 3);
        assert!(state.is_seeding());

        let tracker = TrackerClient::new("http://127.0.0.1:1".into());
        let conf = PeerConf {
            seeding_heartbeat: Duration::from_millis(5),
            ..PeerConf::default()
        };

        let handle = tokio::spawn(run(state.clone(), tracker, conf));
        tokio::time::sleep(Duration::from_millis(30)).await;

        // Still alive and idling as a seeder, not panicked or stuck on a
        // failed network call.
        assert!(!handle.is_finished());
        handle.abort();
    }
}

