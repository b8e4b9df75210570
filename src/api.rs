// src/api.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::aggregator::{AggregationManager, ProviderSnapshot};
use crate::types::{AggregationResult, ConnectionStatus, SearchCriteria};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<AggregationManager>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", post(search))
        .route("/jobs/{provider}/{id}", get(job_details))
        .route("/sources/connections", get(connections))
        .route("/sources/stats", get(source_stats))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SearchReq {
    #[serde(default)]
    criteria: SearchCriteria,
    /// Optional subset of configured providers; omitted means the default set.
    #[serde(default)]
    providers: Option<Vec<String>>,
}

async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchReq>,
) -> Result<Json<AggregationResult>, (StatusCode, Json<serde_json::Value>)> {
    // Validate names at the boundary; an unknown provider is a caller error
    // here, not a programming error inside the manager. An empty list means
    // the same as omitting it: query the default subset.
    let providers = req.providers.as_deref().filter(|p| !p.is_empty());
    if let Some(names) = providers {
        for name in names {
            if !state.manager.has_provider(name) {
                return Err(bad_request(format!("unknown provider `{name}`")));
            }
        }
    }
    let result = state.manager.search_jobs(&req.criteria, providers).await;
    Ok(Json(result))
}

async fn job_details(
    State(state): State<AppState>,
    Path((provider, id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    if !state.manager.has_provider(&provider) {
        return Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "error": format!("unknown provider `{provider}`"),
            })),
        ));
    }
    let outcome = state.manager.get_job_details(&id, &provider).await;
    Ok(Json(serde_json::json!({
        "success": outcome.success,
        "job": outcome.job,
        "error": outcome.error,
    })))
}

async fn connections(State(state): State<AppState>) -> Json<BTreeMap<String, ConnectionStatus>> {
    Json(state.manager.test_all_connections().await)
}

async fn source_stats(State(state): State<AppState>) -> Json<BTreeMap<String, ProviderSnapshot>> {
    Json(state.manager.source_stats())
}

fn bad_request(msg: String) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "success": false, "error": msg })),
    )
}
