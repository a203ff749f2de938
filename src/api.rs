//! # HTTP Surface
//! Thin axum layer over the pure engine: deserialize the request,
//! normalize snapshots at the boundary, delegate to `engine::analyze`,
//! serialize the report. No analytics logic lives here.

use std::sync::{Arc, RwLock};

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::EngineConfig;
use crate::engine::{self, AnalysisRequest, InsightReport};
use crate::filter::FilterSelection;
use crate::model::{Article, Classification, Kpi, SecondaryClassification};

#[derive(Clone)]
pub struct AppState {
    config: Arc<RwLock<EngineConfig>>,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }
}

pub fn create_router() -> Router {
    create_router_with_config(EngineConfig::load())
}

pub fn create_router_with_config(config: EngineConfig) -> Router {
    let state = AppState::new(config);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/analyze", post(analyze))
        .route("/admin/reload-config", get(admin_reload_config))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct AnalyzeReq {
    #[serde(default)]
    articles: Vec<Article>,
    #[serde(default)]
    classifications: Vec<Classification>,
    #[serde(default)]
    secondary_classifications: Vec<SecondaryClassification>,
    #[serde(default)]
    kpis: Vec<Kpi>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(default)]
    selected_classification_ids: Vec<String>,
    #[serde(default)]
    selected_secondary_ids: Vec<String>,
}

async fn analyze(
    State(state): State<AppState>,
    Json(mut body): Json<AnalyzeReq>,
) -> Json<InsightReport> {
    // Hand-built payloads may carry unsorted or duplicate-dated
    // snapshots; restore the engine's ascending-unique invariant here.
    for article in &mut body.articles {
        article.normalize_snapshots();
    }

    metrics::counter!("analyze_requests_total").increment(1);
    metrics::gauge!("analyze_articles").set(body.articles.len() as f64);
    info!(
        article_count = body.articles.len(),
        kpi_count = body.kpis.len(),
        start = %body.start_date,
        end = %body.end_date,
        "running rollup"
    );

    let filter = FilterSelection {
        primary_ids: body.selected_classification_ids.iter().cloned().collect(),
        secondary_ids: body.selected_secondary_ids.iter().cloned().collect(),
    };
    let cfg = state.config.read().expect("config lock poisoned").clone();

    let report = engine::analyze(
        &AnalysisRequest {
            articles: &body.articles,
            classifications: &body.classifications,
            secondary_classifications: &body.secondary_classifications,
            kpis: &body.kpis,
            filter: &filter,
            start: body.start_date,
            end: body.end_date,
        },
        &cfg,
    );
    Json(report)
}

async fn admin_reload_config(State(state): State<AppState>) -> Json<EngineConfig> {
    let fresh = EngineConfig::load();
    info!(
        proposal_stage = %fresh.proposal_stage_name,
        spike_sigma = fresh.spike_sigma,
        above_average_factor = fresh.above_average_factor,
        "engine config reloaded"
    );
    let mut guard = state.config.write().expect("config lock poisoned");
    *guard = fresh.clone();
    Json(fresh)
}
