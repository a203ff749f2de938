//! # Acquisition Funnel
//! Five stages from exposure to conversion, computed over the
//! delta-adjusted article set:
//!
//! 1. announce = lifetime X impressions + period views delta
//! 2. attract  = period views delta
//! 3. induce   = period likes delta
//! 4. propose  = views delta of articles tagged with the proposal stage
//! 5. sell     = sales summed over those articles' in-period snapshots
//!
//! Raw per-article deltas are summed as-is, negatives included. Stages
//! without a positive value are omitted from the output (no zero- or
//! negative-height segments).

use serde::{Deserialize, Serialize};

use crate::delta::ArticleDelta;
use crate::model::Classification;

/// Funnel stage identity, in audience-progression order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Announce,
    Attract,
    Induce,
    Propose,
    Sell,
}

/// One positive-valued funnel segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub stage: Stage,
    pub value: i64,
}

/// Stage-to-stage conversion rates, plain percentages, unclamped.
/// A zero denominator yields 0 rather than a fault.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FunnelRates {
    pub attraction_rate: f64,
    pub inducement_rate: f64,
    pub sales_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelReport {
    pub stages: Vec<FunnelStage>,
    pub rates: FunnelRates,
}

/// Build the funnel from the delta-adjusted set. The proposal stage is
/// located by exact name match in the primary classification list; when
/// no classification carries that name, the propose and sell stages are
/// simply empty.
pub fn compute(
    rows: &[ArticleDelta],
    classifications: &[Classification],
    proposal_stage_name: &str,
) -> FunnelReport {
    let impressions: i64 = rows.iter().map(|r| r.x_lifetime.impressions).sum();
    let views: i64 = rows.iter().map(|r| r.note_views_change).sum();
    let announce = impressions + views;
    let induce: i64 = rows.iter().map(|r| r.note_likes_change).sum();

    let proposal_id = classifications
        .iter()
        .find(|c| c.name == proposal_stage_name)
        .map(|c| c.id.as_str());
    let proposal_rows: Vec<&ArticleDelta> = match proposal_id {
        Some(id) => rows.iter().filter(|r| r.classification_id == id).collect(),
        None => Vec::new(),
    };

    let propose: i64 = proposal_rows.iter().map(|r| r.note_views_change).sum();
    let sell: i64 = proposal_rows
        .iter()
        .flat_map(|r| r.snapshots_in_period.iter())
        .map(|s| s.note_sales().unwrap_or(0))
        .sum();

    let stages = [
        (Stage::Announce, announce),
        (Stage::Attract, views),
        (Stage::Induce, induce),
        (Stage::Propose, propose),
        (Stage::Sell, sell),
    ]
    .into_iter()
    .filter(|(_, value)| *value > 0)
    .map(|(stage, value)| FunnelStage { stage, value })
    .collect();

    let rate = |num: i64, den: i64| {
        if den > 0 {
            num as f64 / den as f64 * 100.0
        } else {
            0.0
        }
    };

    FunnelReport {
        stages,
        rates: FunnelRates {
            attraction_rate: rate(views, announce),
            inducement_rate: rate(induce, views),
            sales_rate: rate(sell, propose),
        },
    }
}
