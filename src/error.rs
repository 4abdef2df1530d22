//! Error taxonomy for both swarm roles.
//!
//! Errors here are semantic, not just transport-level: callers match on the
//! specific variant (e.g. a peer treats [`PeerError::Choked`] very
//! differently from [`PeerError::Transport`]) rather than inspecting raw
//! status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

/// Errors produced by the tracker's own handlers.
#[derive(thiserror::Error, Debug)]
pub enum TrackerError {
    /// `updateBlocks` was called for a peer-id the tracker never registered.
    #[error("peer not registered")]
    PeerUnknown,

    /// A request was missing a required field or had an invalid shape.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = match &self {
            TrackerError::PeerUnknown => StatusCode::NOT_FOUND,
            TrackerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "status": "error", "message": self.to_string() }))).into_response()
    }
}

/// Errors observed by a peer, either serving a request or acting as a
/// client against the tracker or another peer.
#[derive(thiserror::Error, Debug)]
pub enum PeerError {
    /// The requester is not currently unchoked by this peer.
    #[error("choked")]
    Choked,

    /// The requested block is not (yet) owned by this peer.
    #[error("block not found")]
    BlockMissing,

    /// The peer was never registered with the tracker, or the tracker
    /// rejected an `updateBlocks` call for that reason.
    #[error("peer not registered with tracker")]
    PeerUnknown,

    /// Registration with the tracker failed outright; fatal for this peer.
    #[error("registration failed: {0}")]
    RegistrationFailed(String),

    /// Any network or timeout failure talking to the tracker or another
    /// peer. Recovered locally wherever it's encountered.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A remote peer or the tracker responded with a status this client
    /// doesn't otherwise special-case.
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl IntoResponse for PeerError {
    fn into_response(self) -> Response {
        let status = match &self {
            PeerError::Choked => StatusCode::FORBIDDEN,
            PeerError::BlockMissing => StatusCode::NOT_FOUND,
            PeerError::PeerUnknown => StatusCode::NOT_FOUND,
            PeerError::RegistrationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PeerError::Transport(_) => StatusCode::BAD_GATEWAY,
            PeerError::Unexpected(_) => StatusCode::BAD_GATEWAY,
        };
        let body = match &self {
            PeerError::Choked => json!({ "error": "choked" }),
            PeerError::BlockMissing => json!({ "error": "not found" }),
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
