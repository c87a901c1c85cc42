//! RPC error types and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use shardchain_network::NetworkError;
use shardchain_node::NodeError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("missing values: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("metrics are disabled")]
    MetricsDisabled,

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MetricsDisabled => StatusCode::NOT_FOUND,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Node(e) => match e {
                NodeError::NotLeader { .. } => StatusCode::CONFLICT,
                NodeError::NotInSubnet { .. } => StatusCode::OK,
                NodeError::Work(_) => StatusCode::SERVICE_UNAVAILABLE,
                NodeError::Network(NetworkError::InvalidAddress(_)) => StatusCode::BAD_REQUEST,
                NodeError::Network(_) | NodeError::FragmentUnavailable { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                NodeError::Ledger(_)
                | NodeError::InconsistentShards(_)
                | NodeError::Types(_)
                | NodeError::Config(_)
                | NodeError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request refused");
        }
        let body = match &self {
            // Not an error for the caller: the node simply stays out.
            Self::Node(NodeError::NotInSubnet { .. }) => {
                json!({ "message": "Node is not included in subnet" })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
