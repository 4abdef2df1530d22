//! The peer's inbound HTTP surface: the single `serveBlock` operation
//! (§4.2, §4.7). The handler is a thin transport adapter over
//! [`PeerState::serve_decision`].

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::PeerError;
use crate::BlockId;

use super::state::{PeerState, ServeDecision};

pub fn router(state: Arc<PeerState>) -> Router {
    Router::new()
        .route("/request_block/{block_id}", get(request_block))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct RequestBlockQuery {
    peer_id: String,
}

#[derive(Debug, Serialize)]
struct BlockResponse {
    block_id: BlockId,
    data: String,
}

async fn request_block(
    State(state): State<Arc<PeerState>>,
    Path(block_id): Path<BlockId>,
    Query(q): Query<RequestBlockQuery>,
) -> Result<impl IntoResponse, PeerError> {
    match state.serve_decision(block_id, &q.peer_id) {
        ServeDecision::Serve => Ok(Json(BlockResponse {
            block_id,
            data: format!("block-{block_id}-payload"),
        })),
        ServeDecision::Choked => Err(PeerError::Choked),
        ServeDecision::Missing => Err(PeerError::BlockMissing),
    }
}
