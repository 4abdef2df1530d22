//! The peer role: registers with the tracker, then runs three concurrent
//! activities sharing one [`PeerState`] — the block server, the download
//! loop, and the choke scheduler (§2, §4.2-§4.5).

pub mod choke;
pub mod client;
pub mod download;
pub mod selector;
pub mod server;
pub mod state;

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::conf::PeerConf;
use crate::error::PeerError;
use crate::{Address, PeerId};

pub use state::PeerState;

use client::TrackerClient;

/// A running peer: its shared state, with the download loop and choke
/// scheduler already spawned as detached background tasks.
pub struct Peer {
    pub state: Arc<PeerState>,
}

impl Peer {
    /// Registers `peer_id` with the tracker at `tracker_url`, advertising
    /// `self_address` as this peer's reachable endpoint, then spawns the
    /// download loop and choke scheduler onto the current runtime. Fails
    /// fatally ([`PeerError::RegistrationFailed`]) if registration does not
    /// succeed, per §6's CLI contract (non-zero exit on registration
    /// failure).
    pub async fn register_and_spawn(
        peer_id: PeerId,
        self_address: Address,
        tracker_url: Address,
        conf: PeerConf,
    ) -> Result<Self, PeerError> {
        let tracker = TrackerClient::new(tracker_url);
        let (initial_blocks, total_blocks) =
            tracker.register(&peer_id, &self_address).await?;

        let state = Arc::new(PeerState::new(peer_id, self_address));
        state.apply_registration(initial_blocks, total_blocks);
        log::info!(
            "registered with {} initial blocks, {} total",
            state.owned_count(),
            total_blocks
        );

        if let Ok(discovered) = tracker.list_peers(&state.peer_id).await {
            state.merge_known_peers(discovered);
        }

        tokio::spawn(download::run(state.clone(), tracker.clone(), conf));
        tokio::spawn(choke::run(state.clone(), tracker, conf));

        Ok(Self { state })
    }

    /// Serves the block-server HTTP surface on `listener` until the process
    /// is terminated or the server errors out. This is the call that keeps
    /// `main` alive; the download loop and choke scheduler run independently
    /// in the background.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        let router = server::router(self.state.clone());
        axum::serve(listener, router).await
    }
}
