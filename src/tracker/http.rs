//! The tracker's HTTP surface: four thin handlers over [`TrackerState`].
//!
//! Each handler deserializes its request, calls into the synchronous,
//! lock-scoped [`TrackerState`] API, and serializes the result. Malformed
//! JSON bodies and missing query parameters never reach handler code — axum's
//! extractors reject them with a 400 before the handler is invoked.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::{Address, BlockId, PeerId};

use super::state::TrackerState;

pub fn router(state: Arc<TrackerState>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/get_peers", get(get_peers))
        .route("/get_block_info", post(get_block_info))
        .route("/update_blocks", post(update_blocks))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    peer_id: PeerId,
    address: Address,
}

#[derive(Debug, Serialize)]
struct RegisterResponse {
    status: &'static str,
    initial_blocks: Vec<BlockId>,
    total_blocks: u32,
}

async fn register(
    State(state): State<Arc<TrackerState>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    let reg = state.register(req.peer_id, req.address);
    Json(RegisterResponse {
        status: "registered",
        initial_blocks: reg.initial_blocks,
        total_blocks: reg.total_blocks,
    })
}

#[derive(Debug, Deserialize)]
struct GetPeersQuery {
    peer_id: PeerId,
}

async fn get_peers(
    State(state): State<Arc<TrackerState>>,
    Query(q): Query<GetPeersQuery>,
) -> impl IntoResponse {
    Json(state.list_peers(&q.peer_id))
}

#[derive(Debug, Deserialize)]
struct GetBlockInfoRequest {
    #[serde(default)]
    block_ids: Vec<BlockId>,
}

async fn get_block_info(
    State(state): State<Arc<TrackerState>>,
    Json(req): Json<GetBlockInfoRequest>,
) -> impl IntoResponse {
    // The wire contract uses decimal-string keys for integer block ids; this
    // is a JSON-object requirement (object keys must be strings), not a
    // change to our internal representation.
    let info = state.block_info(&req.block_ids);
    let stringified: HashMap<String, Vec<PeerId>> = info
        .into_iter()
        .map(|(block_id, owners)| (block_id.to_string(), owners))
        .collect();
    Json(stringified)
}

#[derive(Debug, Deserialize)]
struct UpdateBlocksRequest {
    peer_id: PeerId,
    blocks: HashSet<BlockId>,
}

#[derive(Debug, Serialize)]
struct UpdateBlocksResponse {
    status: &'static str,
}

async fn update_blocks(
    State(state): State<Arc<TrackerState>>,
    Json(req): Json<UpdateBlocksRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    state.update_blocks(&req.peer_id, req.blocks)?;
    Ok(Json(UpdateBlocksResponse { status: "updated" }))
}
