use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use dkgnode_driver::{Controller, KeyGenResult, Storage};
use dkgnode_protocol::{decode, hex, SignedTransport};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::{config::TlsConfig, Result};

pub(crate) struct ServerState {
    controller: Arc<Controller>,
    storage: Arc<dyn Storage>,
}

pub(crate) type State = Arc<ServerState>;

/// Body returned by the HTTP endpoints on failure or acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Short description of the outcome.
    pub message: String,
    /// Error detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }

    fn error(message: impl Into<String>, error: impl ToString) -> Self {
        Self {
            message: message.into(),
            error: Some(error.to_string()),
        }
    }
}

/// Operator node web server.
pub struct NodeServer {
    state: State,
    tls: Option<TlsConfig>,
}

impl NodeServer {
    /// Create a node server.
    pub fn new(
        controller: Arc<Controller>,
        storage: Arc<dyn Storage>,
        tls: Option<TlsConfig>,
    ) -> Self {
        Self {
            state: Arc::new(ServerState {
                controller,
                storage,
            }),
            tls,
        }
    }

    /// Start the server.
    pub async fn start(&self, addr: SocketAddr, handle: Handle) -> Result<()> {
        if let Some(tls) = self.tls.clone() {
            self.run_tls(addr, handle, tls).await
        } else {
            self.run(addr, handle).await
        }
    }

    /// Start the server running on HTTPS.
    async fn run_tls(
        &self,
        addr: SocketAddr,
        handle: Handle,
        tls: TlsConfig,
    ) -> Result<()> {
        let tls = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
        let app = self.router();
        tracing::info!(
            operator = self.state.controller.operator_id(),
            "listening on {}",
            addr
        );
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
        Ok(())
    }

    /// Start the server running on HTTP.
    async fn run(&self, addr: SocketAddr, handle: Handle) -> Result<()> {
        let app = self.router();
        tracing::info!(
            operator = self.state.controller.operator_id(),
            "listening on {}",
            addr
        );
        axum_server::bind(addr)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
        Ok(())
    }

    /// Routes for the node.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/consume", post(consume))
            .route("/dkg/:validator_pk", get(result))
            .layer(TraceLayer::new_for_http())
            .layer(Extension(Arc::clone(&self.state)))
    }
}

async fn consume(
    Extension(state): Extension<State>,
    body: Bytes,
) -> Response {
    let message: SignedTransport = match decode(&body).await {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(error = %e, "consume decode");
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error("malformed message", e)),
            )
                .into_response();
        }
    };

    let identifier = message.message.identifier;
    match state.controller.process(message).await {
        Ok(_) => {
            (StatusCode::OK, Json(ApiResponse::ok("processed"))).into_response()
        }
        Err(e) => {
            tracing::warn!(id = %identifier, error = %e, "consume");
            let status = if e.is_decode() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(ApiResponse::error("failed to process message", e)))
                .into_response()
        }
    }
}

async fn result(
    Extension(state): Extension<State>,
    Path(validator_pk): Path<String>,
) -> Response {
    let key = match hex::decode(validator_pk.trim_start_matches("0x")) {
        Ok(key) => key,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error("invalid validator public key", e)),
            )
                .into_response()
        }
    };

    match state.storage.get_key_gen_output(&key).await {
        Ok(Some(output)) => {
            (StatusCode::OK, Json(KeyGenResult::from(&output))).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("not found", validator_pk)),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "load key generation output");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("storage failure", e)),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_shape() -> anyhow::Result<()> {
        let value = serde_json::to_value(ApiResponse::ok("processed"))?;
        assert_eq!(serde_json::json!({ "message": "processed" }), value);
        let value =
            serde_json::to_value(ApiResponse::error("not found", "abc"))?;
        assert_eq!("abc", value["error"]);
        Ok(())
    }
}
