pub mod conf;
pub mod error;
pub mod peer;
pub mod tracker;

/// The type of a block's index.
///
/// Blocks are the unit of transfer between peers: the shared file is a fixed,
/// known number of opaque blocks, numbered `[0, total_blocks)`.
pub type BlockId = u32;

/// A peer's self-chosen identity within the swarm. Opaque at the protocol
/// level; uniqueness is the caller's responsibility.
pub type PeerId = String;

/// An HTTP base address (e.g. `http://127.0.0.1:6001`) at which a peer or the
/// tracker can be reached.
pub type Address = String;

/// The special peer-id under which the tracker records itself as owning every
/// block. Advisory only: it documents that every block originates somewhere,
/// but is always filtered out of ownership responses (see
/// [`tracker::state::TrackerState::block_info`]).
pub const TRACKER_PSEUDO_PEER: &str = "tracker";
