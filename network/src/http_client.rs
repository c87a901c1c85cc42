//! reqwest implementation of [`PeerClient`].

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use shardchain_types::{Block, NodeId};

use crate::client::PeerClient;
use crate::wire::{
    routes, AppendRequest, ChainResponse, ForwardedTransaction, IdResponse, IndexResponse,
    SealRequest,
};
use crate::NetworkError;

/// Default timeout for a whole peer request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Talks to other nodes over plain HTTP with JSON bodies.
#[derive(Clone)]
pub struct HttpPeerClient {
    http: reqwest::Client,
}

impl HttpPeerClient {
    /// Create a client with the default request timeout.
    pub fn new() -> Result<Self, NetworkError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| NetworkError::Client(e.to_string()))?;
        Ok(Self { http })
    }

    async fn get_json<T: DeserializeOwned>(&self, peer: &str, path: &str) -> Result<T, NetworkError> {
        let request = self.http.get(peer_url(peer, path));
        send_json(peer, request).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        peer: &str,
        path: &str,
        body: &B,
    ) -> Result<T, NetworkError> {
        let request = self.http.post(peer_url(peer, path)).json(body);
        send_json(peer, request).await
    }
}

fn peer_url(peer: &str, path: &str) -> String {
    format!("http://{}{}", peer.trim_end_matches('/'), path)
}

/// Send `request` and decode a JSON body, mapping transport failures the
/// same way for every route.
async fn send_json<T: DeserializeOwned>(
    peer: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, NetworkError> {
    let response = request.send().await.map_err(|e| {
        let reason = if e.is_timeout() {
            format!("request timed out: {e}")
        } else if e.is_connect() {
            format!("connection failed: {e}")
        } else {
            e.to_string()
        };
        NetworkError::PeerUnreachable {
            peer: peer.to_string(),
            reason,
        }
    })?;

    let status = response.status();
    if status == reqwest::StatusCode::CONFLICT {
        return Err(NetworkError::LeaderRejected {
            peer: peer.to_string(),
        });
    }
    if !status.is_success() {
        return Err(NetworkError::Status {
            peer: peer.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| NetworkError::InvalidResponse {
            peer: peer.to_string(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_identity(&self, peer: &str) -> Result<NodeId, NetworkError> {
        let resp: IdResponse = self.get_json(peer, routes::IDENTITY).await?;
        Ok(resp.id)
    }

    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse, NetworkError> {
        self.get_json(peer, routes::CHAIN).await
    }

    async fn fetch_fragment(&self, peer: &str) -> Result<Vec<Block>, NetworkError> {
        let resp: ChainResponse = self.get_json(peer, routes::LOCAL_CHAIN).await?;
        Ok(resp.chain)
    }

    async fn clear_chain(&self, peer: &str) -> Result<(), NetworkError> {
        let _: ChainResponse = self
            .post_json(peer, routes::CLEAR_CHAIN, &serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn post_fragment(&self, peer: &str, blocks: &[Block]) -> Result<(), NetworkError> {
        let body = AppendRequest {
            blocks: blocks.to_vec(),
        };
        let _: ChainResponse = self.post_json(peer, routes::APPEND_CHAIN, &body).await?;
        Ok(())
    }

    async fn forward_seal(
        &self,
        peer: &str,
        request: &SealRequest,
    ) -> Result<Block, NetworkError> {
        self.post_json(peer, routes::FORWARD_SEAL, request).await
    }

    async fn forward_transaction(
        &self,
        peer: &str,
        request: &ForwardedTransaction,
    ) -> Result<u64, NetworkError> {
        let resp: IndexResponse = self
            .post_json(peer, routes::FORWARD_TRANSACTION, request)
            .await?;
        Ok(resp.index)
    }
}
