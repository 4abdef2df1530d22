//! Outbound HTTP calls the peer makes: to the tracker (register, discover
//! peers, query block ownership, report new blocks) and to other peers
//! (fetch a block). Kept separate from [`super::state`] so that no network
//! call is ever made while the peer lock is held.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PeerError;
use crate::{Address, BlockId, PeerId};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A thin client for the tracker's four operations.
#[derive(Clone)]
pub struct TrackerClient {
    http: reqwest::Client,
    base_url: Address,
}

impl TrackerClient {
    pub fn new(base_url: Address) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build tracker http client");
        Self { http, base_url }
    }

    pub async fn register(
        &self,
        peer_id: &str,
        address: &str,
    ) -> Result<(Vec<BlockId>, u32), PeerError> {
        #[derive(Serialize)]
        struct Req<'a> {
            peer_id: &'a str,
            address: &'a str,
        }
        #[derive(Deserialize)]
        struct Resp {
            initial_blocks: Vec<BlockId>,
            total_blocks: u32,
        }

        let resp = self
            .http
            .post(format!("{}/register", self.base_url))
            .json(&Req { peer_id, address })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(PeerError::RegistrationFailed(format!(
                "tracker returned {}",
                resp.status()
            )));
        }
        let body: Resp = resp.json().await?;
        Ok((body.initial_blocks, body.total_blocks))
    }

    pub async fn list_peers(
        &self,
        peer_id: &str,
    ) -> Result<HashMap<PeerId, Address>, PeerError> {
        let resp = self
            .http
            .get(format!("{}/get_peers", self.base_url))
            .query(&[("peer_id", peer_id)])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn block_info(
        &self,
        block_ids: &HashSet<BlockId>,
    ) -> Result<HashMap<BlockId, Vec<PeerId>>, PeerError> {
        #[derive(Serialize)]
        struct Req {
            block_ids: Vec<BlockId>,
        }

        let resp = self
            .http
            .post(format!("{}/get_block_info", self.base_url))
            .json(&Req {
                block_ids: block_ids.iter().copied().collect(),
            })
            .send()
            .await?
            .error_for_status()?;
        let stringified: HashMap<String, Vec<PeerId>> = resp.json().await?;
        Ok(stringified
            .into_iter()
            .filter_map(|(k, v)| k.parse::<BlockId>().ok().map(|id| (id, v)))
            .collect())
    }

    pub async fn update_blocks(
        &self,
        peer_id: &str,
        blocks: &HashSet<BlockId>,
    ) -> Result<(), PeerError> {
        #[derive(Serialize)]
        struct Req<'a> {
            peer_id: &'a str,
            blocks: Vec<BlockId>,
        }

        let resp = self
            .http
            .post(format!("{}/update_blocks", self.base_url))
            .json(&Req {
                peer_id,
                blocks: blocks.iter().copied().collect(),
            })
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PeerError::PeerUnknown);
        }
        resp.error_for_status()?;
        Ok(())
    }
}

/// Requests `block_id` from the peer at `source_address`, identifying
/// ourselves as `self_id`. Maps 403/404 to [`PeerError::Choked`] /
/// [`PeerError::BlockMissing`] so the download loop can match on them
/// directly.
pub async fn request_block(
    http: &reqwest::Client,
    source_address: &str,
    self_id: &str,
    block_id: BlockId,
) -> Result<BlockId, PeerError> {
    #[derive(Deserialize)]
    struct Resp {
        block_id: BlockId,
    }

    let resp = http
        .get(format!("{source_address}/request_block/{block_id}"))
        .query(&[("peer_id", self_id)])
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await?;

    match resp.status() {
        reqwest::StatusCode::OK => {
            let body: Resp = resp.json().await?;
            Ok(body.block_id)
        }
        reqwest::StatusCode::FORBIDDEN => Err(PeerError::Choked),
        reqwest::StatusCode::NOT_FOUND => Err(PeerError::BlockMissing),
        other => Err(PeerError::Unexpected(format!(
            "status {other} requesting block {block_id}"
        ))),
    }
}
