//! The peer binary: registers with the tracker, then serves blocks while
//! downloading the rest of the swarm's file.
//!
//! CLI surface per §6: two positional arguments, `peer_id` and `port`. Exit
//! code 0 on graceful termination, non-zero on registration failure.

use clap::Parser;
use swarmkit::conf::PeerConf;
use swarmkit::peer::Peer;

/// Runs a peer that joins the swarm hosted by the tracker at `tracker_url`.
#[derive(Parser, Debug)]
struct Args {
    /// This peer's unique identity within the swarm.
    peer_id: String,

    /// Port this peer listens on for inbound block requests.
    port: u16,

    /// Base URL of the tracker to register with.
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    tracker_url: String,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();
    let self_address = format!("http://127.0.0.1:{}", args.port);

    let peer = match Peer::register_and_spawn(
        args.peer_id.clone(),
        self_address.clone(),
        args.tracker_url,
        PeerConf::default(),
    )
    .await
    {
        Ok(peer) => peer,
        Err(err) => {
            log::error!("registration failed: {err}");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            log::error!("failed to bind port {}: {err}", args.port);
            std::process::exit(1);
        }
    };
    log::info!("peer {} listening on {self_address}", args.peer_id);

    if let Err(err) = peer.serve(listener).await {
        log::error!("block server exited: {err}");
        std::process::exit(1);
    }
}
