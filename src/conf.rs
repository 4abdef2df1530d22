//! This module defines types used to configure the tracker and peer roles.

use std::time::Duration;

/// Configuration for the tracker: swarm size and the policy constants that
/// govern initial distribution and peer discovery.
#[derive(Clone, Copy, Debug)]
pub struct TrackerConf {
    /// The fixed number of blocks the shared file is divided into.
    pub total_blocks: u32,

    /// How many blocks a newly registered peer is handed, capped by
    /// `total_blocks`.
    pub initial_blocks_per_peer: usize,

    /// How many peers `listPeers` returns per call, at most.
    pub peer_sample_size: usize,
}

impl TrackerConf {
    /// Returns the reference tracker configuration: 50 blocks, 10 initial
    /// blocks per peer, samples of 5 peers.
    pub fn new(total_blocks: u32) -> Self {
        Self {
            total_blocks,
            initial_blocks_per_peer: 10,
            peer_sample_size: 5,
        }
    }
}

impl Default for TrackerConf {
    fn default() -> Self {
        Self::new(50)
    }
}

/// Configuration for a peer: the choke policy constants and the cadences of
/// its two background loops.
#[derive(Clone, Copy, Debug)]
pub struct PeerConf {
    /// Size of the fixed (tit-for-tat) unchoke set.
    pub fixed_unchoke_count: usize,

    /// A block is "rare" for tit-for-tat scoring purposes if fewer than this
    /// many known owners hold it.
    pub rare_threshold: usize,

    /// Half-cycle length of the choke scheduler: one full iteration
    /// (optimistic unchoke, then tit-for-tat recomputation) takes twice this.
    pub choke_half_cycle: Duration,

    /// How long the download loop waits when the selector found nothing to
    /// fetch.
    pub idle_sleep: Duration,

    /// Lower/upper bounds of the per-iteration backpressure sleep the
    /// download loop takes between cycles.
    pub cycle_sleep_range: (Duration, Duration),

    /// How long to wait, once registered but before `total_blocks` is known,
    /// before retrying.
    pub registration_poll_interval: Duration,

    /// How often a seeding peer logs its idle heartbeat.
    pub seeding_heartbeat: Duration,
}

impl Default for PeerConf {
    /// Returns the reference peer configuration: a fixed-unchoke set of 4, a
    /// rare threshold of 3, and the cadences from the tit-for-tat and
    /// download loop design (10s/20s choke cycle, 3s idle sleep, a
    /// 0.5s-2.0s backpressure sleep, 1s registration poll, 60s seeding
    /// heartbeat).
    fn default() -> Self {
        Self {
            fixed_unchoke_count: 4,
            rare_threshold: 3,
            choke_half_cycle: Duration::from_secs(10),
            idle_sleep: Duration::from_secs(3),
            cycle_sleep_range: (Duration::from_millis(500), Duration::from_millis(2000)),
            registration_poll_interval: Duration::from_secs(1),
            seeding_heartbeat: Duration::from_secs(60),
        }
    }
}
