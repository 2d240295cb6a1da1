use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, HeaderValue}, routing::{get, post}, Json, Router};
use reelsim_core::persist::{load_recommender, ModelPaths};
use reelsim_core::{DocId, ModelHandle, Recommendation};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;

use error::{ApiError, ApiResult};

const MAX_TOP_N: usize = 100;

#[derive(Deserialize)]
pub struct RecommendParams {
    pub title: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}
fn default_top_n() -> usize { 5 }

#[derive(Serialize)]
pub struct RecommendResponse {
    pub query: String,
    pub resolved_title: String,
    pub took_s: f64,
    pub results: Vec<Recommendation>,
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub num_docs: usize,
    pub fingerprint: String,
}

#[derive(Clone)]
pub struct AppState {
    pub model_dir: PathBuf,
    pub handle: ModelHandle,
    pub admin_token: Option<String>,
}

pub fn build_app(model_dir: String) -> Result<Router> {
    // Load the model once at startup; /admin/reload swaps in a fresh one
    let recommender = load_recommender(&ModelPaths::new(&model_dir))?;
    tracing::info!(num_docs = recommender.model().num_docs(), strategy = ?recommender.strategy(), "model loaded");
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let app_state = AppState { model_dir: PathBuf::from(&model_dir), handle: ModelHandle::new(recommender), admin_token };
    Ok(router(app_state))
}

pub fn router(app_state: AppState) -> Router {
    let cors = cors_layer(std::env::var("CORS_ALLOW_ORIGIN").ok().as_deref());

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/recommend", get(recommend_handler))
        .route("/titles", get(titles_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// `CORS_ALLOW_ORIGIN` is a comma-separated origin list. Unset, or nothing parseable, means any origin.
fn cors_layer(allowed: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed
        .into_iter()
        .flat_map(|list| list.split(','))
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = o, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    let allow_origin = if origins.is_empty() { AllowOrigin::any() } else { AllowOrigin::list(origins) };
    CorsLayer::new().allow_origin(allow_origin).allow_methods(Any).allow_headers(Any)
}

pub async fn recommend_handler(State(state): State<AppState>, Query(params): Query<RecommendParams>) -> ApiResult<Json<RecommendResponse>> {
    let start = std::time::Instant::now();
    let recommender = state.handle.current();
    let top_n = params.top_n.min(MAX_TOP_N);
    let query = params.title.trim().to_string();

    // ranking is CPU-bound, keep it off the async workers
    let (resolved_title, results) = tokio::task::spawn_blocking(move || -> reelsim_core::Result<_> {
        let doc = recommender.resolve(&query)?;
        let results = recommender.recommend(&query, top_n)?;
        let resolved = recommender.model().records()[doc as usize].title.clone();
        Ok((resolved, results))
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let elapsed = start.elapsed();
    Ok(Json(RecommendResponse { query: params.title, resolved_title, took_s: elapsed.as_secs_f64(), results }))
}

pub async fn titles_handler(State(state): State<AppState>) -> Json<Vec<String>> {
    let recommender = state.handle.current();
    Json(recommender.model().records().iter().map(|r| r.title.clone()).collect())
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> ApiResult<Json<serde_json::Value>> {
    let recommender = state.handle.current();
    let record = recommender
        .model()
        .record(doc_id)
        .ok_or_else(|| ApiError::NotFound(format!("doc {doc_id}")))?;
    let mut obj = serde_json::to_value(record).map_err(|e| ApiError::Internal(e.to_string()))?;
    obj["doc_id"] = serde_json::Value::from(doc_id);
    Ok(Json(obj))
}

// --- Admin endpoints ---
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<ReloadResponse>> {
    authorize(&state, &headers)?;
    let dir = state.model_dir.clone();
    let recommender = tokio::task::spawn_blocking(move || load_recommender(&ModelPaths::new(dir)))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    let response = ReloadResponse {
        num_docs: recommender.model().num_docs(),
        fingerprint: recommender.model().fingerprint().to_string(),
    };
    state.handle.swap(recommender);
    tracing::info!(num_docs = response.num_docs, fingerprint = %response.fingerprint, "model reloaded");
    Ok(Json(response))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn allowed_origin(layer: CorsLayer, origin: &str) -> Option<String> {
        let app: Router = Router::new().route("/health", get(|| async { "ok" })).layer(layer);
        let req = Request::get("/health").header("Origin", origin).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        resp.headers().get("access-control-allow-origin").map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn cors_defaults_to_any_origin() {
        assert_eq!(allowed_origin(cors_layer(None), "https://a.example").await.as_deref(), Some("*"));
        assert_eq!(allowed_origin(cors_layer(Some(" , ")), "https://a.example").await.as_deref(), Some("*"));
    }

    #[tokio::test]
    async fn cors_list_only_echoes_listed_origins() {
        let list = Some("https://a.example, https://b.example");
        assert_eq!(allowed_origin(cors_layer(list), "https://b.example").await.as_deref(), Some("https://b.example"));
        assert_eq!(allowed_origin(cors_layer(list), "https://evil.example").await, None);
    }
}
