// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod category;
pub mod config;
pub mod delta;
pub mod engine;
pub mod filter;
pub mod funnel;
pub mod kpi;
pub mod metrics;
pub mod model;
pub mod outlier;
pub mod series;
pub mod snapshot;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::config::EngineConfig;
pub use crate::engine::{analyze, AnalysisRequest, InsightReport};
pub use crate::filter::FilterSelection;
pub use crate::kpi::{KpiEvaluation, KpiOutcome, MetricsScope};
pub use crate::model::{
    Article, Classification, DailySnapshot, Kpi, SecondaryClassification,
};
