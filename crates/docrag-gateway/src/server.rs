use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use docrag_core::config::GatewayConfig;
use docrag_core::error::Result;
use docrag_core::traits::ChunkStore;

use crate::api::{Record, RetrievalRequest, RetrievalResponse};
use crate::error::GatewayError;

/// Shared handler state. The store is only touched from blocking tasks.
#[derive(Clone)]
pub struct GatewayState {
    store: Arc<dyn ChunkStore>,
    conf: Arc<GatewayConfig>,
}

impl GatewayState {
    pub fn new(store: Arc<dyn ChunkStore>, conf: GatewayConfig) -> Self {
        Self { store, conf: Arc::new(conf) }
    }

    fn authorize(&self, headers: &HeaderMap) -> std::result::Result<(), GatewayError> {
        let key = headers.get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(GatewayError::InvalidAuthorizationHeader)?;
        if !self.conf.api_keys.is_empty() && !self.conf.api_keys.iter().any(|k| k == key) {
            return Err(GatewayError::AuthorizationFailed);
        }
        Ok(())
    }

    fn check_knowledge(&self, knowledge_id: &str) -> std::result::Result<(), GatewayError> {
        if self.conf.knowledge_ids.is_empty() || self.conf.knowledge_ids.iter().any(|k| k == knowledge_id) {
            Ok(())
        } else {
            Err(GatewayError::KnowledgeNotFound(knowledge_id.to_string()))
        }
    }
}

/// `POST /retrieval` and a liveness route at `/`.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/retrieval", post(retrieval_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str { "docrag gateway is running" }

async fn retrieval_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<RetrievalResponse>, GatewayError> {
    state.authorize(&headers)?;
    let req: RetrievalRequest = serde_json::from_slice(&body).map_err(|e| GatewayError::BadRequest(e.to_string()))?;
    state.check_knowledge(&req.knowledge_id)?;

    let filter = req.filter();
    let setting = req.retrieval_setting;
    info!(query = %req.query.replace('\n', "\\n"), project = ?filter.project, top_k = setting.top_k, "retrieve");

    let store = state.store.clone();
    let query = req.query;
    let chunks = tokio::task::spawn_blocking(move || store.search(&query, &filter, setting.top_k))
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))??;

    let records: Vec<Record> = chunks.into_iter()
        .filter(|c| c.score >= setting.score_threshold)
        .map(Record::from)
        .collect();
    Ok(Json(RetrievalResponse { records }))
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(state: GatewayState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
