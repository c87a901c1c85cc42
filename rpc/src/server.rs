//! Axum-based RPC server.

use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, Instrument};

use shardchain_network::wire::routes;
use shardchain_node::tracing_spans::rpc_span;
use shardchain_node::ChainNode;

use crate::error::RpcError;
use crate::handlers;

/// Every route a node serves, bound to `node`.
pub fn router(node: Arc<ChainNode>) -> Router {
    Router::new()
        .route(routes::MINE, get(handlers::mine))
        .route(routes::NEW_TRANSACTION, post(handlers::new_transaction))
        .route(routes::CHAIN, get(handlers::chain))
        .route(routes::LOCAL_CHAIN, get(handlers::local_chain))
        .route(routes::CLEAR_CHAIN, post(handlers::clear_chain))
        .route(routes::APPEND_CHAIN, post(handlers::append_chain))
        .route(routes::REGISTER_NODES, post(handlers::register_nodes))
        .route(routes::REGISTER_SUBNET, post(handlers::register_subnet))
        .route(routes::RESOLVE, get(handlers::resolve))
        .route(routes::IDENTITY, get(handlers::identity))
        .route(routes::FORWARD_SEAL, post(handlers::forwarded_seal))
        .route(
            routes::FORWARD_TRANSACTION,
            post(handlers::forwarded_transaction),
        )
        .route(routes::METRICS, get(handlers::metrics))
        .layer(middleware::from_fn(trace_request))
        .with_state(node)
}

async fn trace_request(req: Request, next: Next) -> Response {
    let span = rpc_span(req.uri().path());
    let method = req.method().clone();
    async move {
        let response = next.run(req).await;
        tracing::debug!(%method, status = response.status().as_u16(), "request served");
        response
    }
    .instrument(span)
    .await
}

pub struct RpcServer {
    port: u16,
    node: Arc<ChainNode>,
}

impl RpcServer {
    pub fn new(port: u16, node: Arc<ChainNode>) -> Self {
        Self { port, node }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Bind `0.0.0.0:port` and serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Server(format!("bind {addr}: {e}")))?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already-bound listener. Tests bind port 0 and pass it here.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<(), RpcError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener
            .local_addr()
            .map_err(|e| RpcError::Server(e.to_string()))?;
        info!(addr = %local, id = %self.node.identity(), "RPC server listening");

        axum::serve(listener, router(self.node))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;

        info!("RPC server stopped");
        Ok(())
    }
}
