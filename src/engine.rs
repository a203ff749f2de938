//! # Rollup Engine
//! Pure, synchronous orchestration: one deterministic function from
//! (articles, filter, date range, classification lists, KPIs, config)
//! to the full derived report. No I/O, no hidden state; arbitrarily
//! many invocations may run in parallel.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::category::{self, CategoryRow, SecondaryCountRow, SecondaryLikeRateRow};
use crate::config::EngineConfig;
use crate::delta::{self, ArticleDelta};
use crate::filter::FilterSelection;
use crate::funnel::{self, FunnelReport};
use crate::kpi::{self, KpiEvaluation, MetricsScope};
use crate::model::{Article, Classification, Kpi, SecondaryClassification};
use crate::series::{self, DailyRow};

/// Everything the engine needs for one computation. Snapshots are
/// expected ascending-unique by date (the HTTP boundary normalizes).
#[derive(Debug, Clone)]
pub struct AnalysisRequest<'a> {
    pub articles: &'a [Article],
    pub classifications: &'a [Classification],
    pub secondary_classifications: &'a [SecondaryClassification],
    pub kpis: &'a [Kpi],
    pub filter: &'a FilterSelection,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The full derived output for one invocation: plain, serializable,
/// order-stable rows with no references back into engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub daily_series: Vec<DailyRow>,
    pub articles: Vec<ArticleDelta>,
    pub category_totals: Vec<CategoryRow>,
    pub secondary_counts: Vec<SecondaryCountRow>,
    pub secondary_like_rates: Vec<SecondaryLikeRateRow>,
    pub funnel: FunnelReport,
    pub kpi_results: Vec<KpiEvaluation>,
}

/// Run the whole rollup. An inverted range (`end < start`) enumerates
/// no dates and produces empty/zeroed views rather than an error.
pub fn analyze(req: &AnalysisRequest<'_>, cfg: &EngineConfig) -> InsightReport {
    let filtered = req.filter.apply(req.articles);

    let daily_series = series::reconstruct(&filtered, req.start, req.end, cfg.spike_sigma);
    let articles = delta::compute(&filtered, req.start, req.end);
    let category_totals = category::primary_totals(
        &filtered,
        req.classifications,
        req.end,
        cfg.above_average_factor,
    );
    let secondary_counts = category::secondary_counts(&filtered, req.secondary_classifications);
    let secondary_like_rates =
        category::secondary_like_rates(&filtered, req.secondary_classifications, req.end);
    let funnel = funnel::compute(&articles, req.classifications, &cfg.proposal_stage_name);
    let scope = MetricsScope::from_deltas(&articles);
    let kpi_results = kpi::evaluate_all(req.kpis, &scope);

    InsightReport {
        daily_series,
        articles,
        category_totals,
        secondary_counts,
        secondary_like_rates,
        funnel,
        kpi_results,
    }
}
