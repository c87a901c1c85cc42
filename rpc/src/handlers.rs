//! RPC request handlers.
//!
//! Every handler receives the shared [`ChainNode`] and maps its errors
//! through [`RpcError`]. Bodies are extracted as `Result<Json<_>, _>` so a
//! malformed payload becomes a 400 with our own error shape.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use shardchain_network::{
    AppendRequest, ChainResponse, ForwardedTransaction, IdResponse, IndexResponse, SealRequest,
};
use shardchain_node::{ChainNode, DistributionReport, Micronode};
use shardchain_types::{Block, BlockHash, Transaction};

use crate::error::RpcError;

pub type NodeState = State<Arc<ChainNode>>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RpcError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| RpcError::InvalidRequest(rejection.body_text()))
}

// ── Mining ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: BlockHash,
}

impl From<Block> for MineResponse {
    fn from(block: Block) -> Self {
        Self {
            message: "New Block Forged".into(),
            index: block.index,
            transactions: block.transactions,
            proof: block.proof,
            previous_hash: block.previous_hash,
        }
    }
}

pub async fn mine(State(node): NodeState) -> Result<Json<MineResponse>, RpcError> {
    let block = node.mine().await?;
    Ok(Json(block.into()))
}

// ── Transactions ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NewTransactionRequest {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    /// Whole units only; fractional or negative amounts fail extraction.
    pub amount: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewTransactionResponse {
    pub message: String,
    pub index: u64,
}

pub async fn new_transaction(
    State(node): NodeState,
    payload: Result<Json<NewTransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NewTransactionResponse>), RpcError> {
    let request = body(payload)?;
    let (sender, recipient, amount) = match (request.sender, request.recipient, request.amount) {
        (Some(s), Some(r), Some(a)) => (s, r, a),
        (s, r, a) => {
            let mut missing = Vec::new();
            if s.is_none() {
                missing.push("sender");
            }
            if r.is_none() {
                missing.push("recipient");
            }
            if a.is_none() {
                missing.push("amount");
            }
            return Err(RpcError::MissingFields(missing));
        }
    };

    let index = node.submit_transaction(&sender, &recipient, amount).await?;
    Ok((
        StatusCode::CREATED,
        Json(NewTransactionResponse {
            message: format!("Transaction will be added to Block {index}"),
            index,
        }),
    ))
}

// ── Chain ────────────────────────────────────────────────────────────────

/// The full chain, reassembled from every micronode's fragment.
pub async fn chain(State(node): NodeState) -> Result<Json<ChainResponse>, RpcError> {
    let chain = node.full_chain().await?;
    Ok(Json(ChainResponse::new(chain)))
}

/// Only the blocks held by this node. Used by peers during assembly.
pub async fn local_chain(State(node): NodeState) -> Json<ChainResponse> {
    Json(ChainResponse::new(node.coordinator().local_chain().await))
}

pub async fn clear_chain(State(node): NodeState) -> Json<ChainResponse> {
    node.coordinator().clear_local().await;
    Json(ChainResponse::new(Vec::new()))
}

pub async fn append_chain(
    State(node): NodeState,
    payload: Result<Json<AppendRequest>, JsonRejection>,
) -> Result<Json<ChainResponse>, RpcError> {
    let request = body(payload)?;
    let chain = node.coordinator().append_fragment(request.blocks).await;
    Ok(Json(ChainResponse::new(chain)))
}

// ── Membership ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub nodes: Option<Vec<String>>,
}

impl RegisterRequest {
    fn nodes(self) -> Result<Vec<String>, RpcError> {
        match self.nodes {
            Some(nodes) if !nodes.is_empty() => Ok(nodes),
            _ => Err(RpcError::MissingFields(vec!["nodes"])),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterNodesResponse {
    pub message: String,
    pub total_nodes: Vec<String>,
}

pub async fn register_nodes(
    State(node): NodeState,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterNodesResponse>), RpcError> {
    let nodes = body(payload)?.nodes()?;
    let total_nodes = node.register_peers(&nodes).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterNodesResponse {
            message: "New nodes have been added".into(),
            total_nodes,
        }),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterSubnetResponse {
    pub message: String,
    pub micronodes: Vec<Micronode>,
}

pub async fn register_subnet(
    State(node): NodeState,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterSubnetResponse>), RpcError> {
    let nodes = body(payload)?.nodes()?;
    let micronodes = node.register_micronodes(&nodes).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterSubnetResponse {
            message: "New micronodes have been added".into(),
            micronodes,
        }),
    ))
}

pub async fn identity(State(node): NodeState) -> Json<IdResponse> {
    Json(IdResponse {
        id: node.identity().clone(),
    })
}

// ── Consensus ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub message: String,
    pub replaced: bool,
    pub chain: Vec<Block>,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<DistributionReport>,
}

pub async fn resolve(State(node): NodeState) -> Result<Json<ResolveResponse>, RpcError> {
    let outcome = node.resolve().await?;
    let message = if outcome.replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };
    Ok(Json(ResolveResponse {
        message: message.into(),
        replaced: outcome.replaced,
        length: outcome.chain.len(),
        chain: outcome.chain,
        distribution: outcome.distribution,
    }))
}

// ── Internal (node to node) ──────────────────────────────────────────────

pub async fn forwarded_seal(
    State(node): NodeState,
    payload: Result<Json<SealRequest>, JsonRejection>,
) -> Result<Json<Block>, RpcError> {
    let request = body(payload)?;
    let block = node.coordinator().accept_forwarded_seal(request).await?;
    Ok(Json(block))
}

pub async fn forwarded_transaction(
    State(node): NodeState,
    payload: Result<Json<ForwardedTransaction>, JsonRejection>,
) -> Result<Json<IndexResponse>, RpcError> {
    let request = body(payload)?;
    let index = node
        .coordinator()
        .accept_forwarded_transaction(request)
        .await?;
    Ok(Json(IndexResponse { index }))
}

// ── Metrics ──────────────────────────────────────────────────────────────

pub async fn metrics(State(node): NodeState) -> Result<impl IntoResponse, RpcError> {
    if !node.config().enable_metrics {
        return Err(RpcError::MetricsDisabled);
    }
    let text = node.metrics().encode()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    ))
}
