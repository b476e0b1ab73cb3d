use anyhow::{bail, Context, Result};
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use parking_lot::RwLock;
use postings_core::{FieldName, IndexError, IndexReader, Pipeline, INDEX_FILE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct TopKParams {
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Deserialize)]
pub struct PostingsParams {
    /// Field whose analyzer normalizes the path term; CONTENT when absent.
    pub field: Option<String>,
}

#[derive(Deserialize)]
pub struct QueryParams {
    pub q: String,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub key_terms: usize,
    pub value_terms: usize,
}

#[derive(Serialize)]
pub struct RankedTerm {
    pub term: String,
    pub total_term_frequency: u32,
}

#[derive(Serialize)]
pub struct TopKResponse {
    pub k: usize,
    pub terms: Vec<RankedTerm>,
}

#[derive(Serialize)]
pub struct PostingsResponse {
    pub term: String,
    pub total_term_frequency: u32,
    pub total_document_frequency: u32,
    pub postings: BTreeMap<String, u32>,
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub terms: Vec<String>,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<QueryHit>,
}

#[derive(Serialize)]
pub struct QueryHit {
    pub doc_id: String,
    pub frequency: u64,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": message.into() })))
}

#[derive(Clone)]
pub struct AppState {
    pub index_root: PathBuf,
    pub reader: Arc<RwLock<IndexReader>>,
    pub pipeline: Arc<Pipeline>,
    pub admin_token: Option<String>,
}

/// Fail early, with a readable message, when `index_dir` holds no built index.
pub fn check_index_dir(index_dir: &str) -> Result<PathBuf> {
    let root = FsPath::new(index_dir);
    if !root.is_dir() {
        bail!("index directory {index_dir} does not exist; run `indexer build` first");
    }
    let file = root.join(INDEX_FILE);
    if !file.is_file() {
        bail!("{} not found; run `indexer build --output {index_dir}` first", file.display());
    }
    Ok(file)
}

pub fn build_app(index_dir: String) -> Result<Router> {
    // A missing or malformed index is a startup error
    let reader = IndexReader::try_open(&index_dir).with_context(|| format!("loading index from {index_dir}"))?;
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let app_state = AppState {
        index_root: PathBuf::from(&index_dir),
        reader: Arc::new(RwLock::new(reader)),
        pipeline: Arc::new(Pipeline::standard()),
        admin_token,
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/stats", get(stats_handler))
        .route("/topk", get(top_k_handler))
        .route("/postings/:term", get(postings_handler))
        .route("/query", get(query_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);
    Ok(app)
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let reader = state.reader.read();
    Json(StatsResponse { key_terms: reader.total_key_terms(), value_terms: reader.total_value_terms() })
}

pub async fn top_k_handler(State(state): State<AppState>, Query(params): Query<TopKParams>) -> Result<Json<TopKResponse>, ApiError> {
    let reader = state.reader.read();
    let terms = reader
        .top_k(params.k)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "no terms"))?
        .into_iter()
        .filter_map(|t| {
            reader.posting(t).map(|p| RankedTerm { term: t.to_string(), total_term_frequency: p.total_term_frequency() })
        })
        .collect();
    Ok(Json(TopKResponse { k: params.k, terms }))
}

pub async fn postings_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Query(params): Query<PostingsParams>,
) -> Result<Json<PostingsResponse>, ApiError> {
    let field = match params.field.as_deref() {
        Some(name) => name.parse::<FieldName>().map_err(|err| api_error(StatusCode::BAD_REQUEST, err.to_string()))?,
        None => FieldName::Content,
    };
    let term = state
        .pipeline
        .normalize(field, &raw)
        .into_iter()
        .next()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("{raw:?} has no indexable terms")))?;
    let reader = state.reader.read();
    let posting = reader
        .posting(&term)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, IndexError::UnknownTerm(term.clone()).to_string()))?;
    Ok(Json(PostingsResponse {
        total_term_frequency: posting.total_term_frequency(),
        total_document_frequency: posting.total_document_frequency(),
        postings: posting.per_document_frequency().clone(),
        term,
    }))
}

pub async fn query_handler(State(state): State<AppState>, Query(params): Query<QueryParams>) -> Result<Json<QueryResponse>, ApiError> {
    let start = std::time::Instant::now();
    let terms = state.pipeline.normalize_query(&params.q);
    let hits = state.reader.read().query(terms.as_slice()).map_err(|err| {
        let status = if err.is_not_found() { StatusCode::NOT_FOUND } else { StatusCode::INTERNAL_SERVER_ERROR };
        api_error(status, err.to_string())
    })?;

    let mut results: Vec<QueryHit> = hits.into_iter().map(|(doc_id, frequency)| QueryHit { doc_id, frequency }).collect();
    results.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.doc_id.cmp(&b.doc_id)));

    Ok(Json(QueryResponse {
        query: params.q,
        terms,
        took_s: start.elapsed().as_secs_f64(),
        total_hits: results.len(),
        results,
    }))
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<StatsResponse>, ApiError> {
    authorize(&state, &headers)?;
    let reader = IndexReader::try_open(&state.index_root)
        .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;
    let stats = StatsResponse { key_terms: reader.total_key_terms(), value_terms: reader.total_value_terms() };
    *state.reader.write() = reader;
    tracing::info!(key_terms = stats.key_terms, "index reloaded");
    Ok(Json(stats))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(api_error(StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set")),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(api_error(StatusCode::UNAUTHORIZED, "invalid admin token"))
    }
}
