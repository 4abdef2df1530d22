//! The tracker role: bootstraps the swarm's initial block distribution and
//! answers peer-discovery / ownership queries (§4.1, §4.6 of the design).

pub mod http;
pub mod state;

pub use state::{Registration, TrackerState};
