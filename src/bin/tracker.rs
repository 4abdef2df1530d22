//! The tracker binary: hosts the swarm's bootstrap and ownership-query
//! service over HTTP.

use std::sync::Arc;

use clap::Parser;
use swarmkit::conf::TrackerConf;
use swarmkit::tracker::{http, TrackerState};

/// Runs the tracker for a swarm of a fixed number of blocks.
#[derive(Parser, Debug)]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Total number of blocks the shared file is divided into.
    #[arg(long, default_value_t = 50)]
    total_blocks: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let conf = TrackerConf::new(args.total_blocks);
    let state = Arc::new(TrackerState::new(conf));
    let router = http::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!(
        "tracker listening on {addr}, {} blocks in the swarm",
        args.total_blocks
    );

    axum::serve(listener, router).await?;
    Ok(())
}
