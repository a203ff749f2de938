//! # Category Rollups
//! Latest-value totals per primary classification (with above-average
//! flags) and the two secondary-axis views: article counts and like
//! rates. Works on the filtered-but-not-delta-adjusted article set.
//!
//! Each metric is looked up independently: the latest snapshot at or
//! before the period end that carries a value for *that* metric. A
//! different snapshot may supply views vs. impressions for the same
//! article.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{Article, Classification, DailySnapshot, SecondaryClassification};
use crate::outlier;
use crate::snapshot::latest_value_at_or_before;

/// Latest-value totals for one primary classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub name: String,
    pub note_views: i64,
    pub note_likes: i64,
    pub x_impressions: i64,
    pub x_likes: i64,
    #[serde(default)]
    pub note_views_above_average: bool,
    #[serde(default)]
    pub note_likes_above_average: bool,
    #[serde(default)]
    pub x_impressions_above_average: bool,
    #[serde(default)]
    pub x_likes_above_average: bool,
}

/// Article count for one secondary classification (zero rows dropped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryCountRow {
    pub name: String,
    pub count: usize,
}

/// Like rate (100 × likes / views) for one secondary classification
/// (zero rates dropped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryLikeRateRow {
    pub name: String,
    pub like_rate: f64,
}

/// Per-classification totals, above-average flagged. Every listed
/// classification produces a row, including empty ones: an empty
/// category is a legitimate zero, not a missing row.
pub fn primary_totals(
    articles: &[&Article],
    classifications: &[Classification],
    end: NaiveDate,
    above_average_factor: f64,
) -> Vec<CategoryRow> {
    let mut rows: Vec<CategoryRow> = classifications
        .iter()
        .map(|c| {
            let mut row = CategoryRow {
                name: c.name.clone(),
                note_views: 0,
                note_likes: 0,
                x_impressions: 0,
                x_likes: 0,
                note_views_above_average: false,
                note_likes_above_average: false,
                x_impressions_above_average: false,
                x_likes_above_average: false,
            };
            for article in articles.iter().filter(|a| a.classification_id == c.id) {
                let latest = |get: fn(&DailySnapshot) -> Option<i64>| {
                    latest_value_at_or_before(&article.daily_snapshots, end, get).unwrap_or(0)
                };
                row.note_views += latest(DailySnapshot::note_views);
                row.note_likes += latest(DailySnapshot::note_likes);
                row.x_impressions += latest(DailySnapshot::x_impressions);
                row.x_likes += latest(DailySnapshot::x_likes);
            }
            row
        })
        .collect();

    mark_above_average(&mut rows, above_average_factor);
    rows
}

fn mark_above_average(rows: &mut [CategoryRow], factor: f64) {
    mark_column(rows, factor, |r| r.note_views, |r, f| r.note_views_above_average = f);
    mark_column(rows, factor, |r| r.note_likes, |r, f| r.note_likes_above_average = f);
    mark_column(
        rows,
        factor,
        |r| r.x_impressions,
        |r, f| r.x_impressions_above_average = f,
    );
    mark_column(rows, factor, |r| r.x_likes, |r, f| r.x_likes_above_average = f);
}

fn mark_column<G, S>(rows: &mut [CategoryRow], factor: f64, get: G, set: S)
where
    G: Fn(&CategoryRow) -> i64,
    S: Fn(&mut CategoryRow, bool),
{
    let values: Vec<f64> = rows.iter().map(|r| get(r) as f64).collect();
    let threshold = outlier::above_average_threshold(&values, factor);
    for (row, flag) in rows.iter_mut().zip(outlier::flag_over(&values, threshold)) {
        set(row, flag);
    }
}

/// Article counts per secondary classification; tags with no member
/// articles are dropped rather than rendered as zero segments.
pub fn secondary_counts(
    articles: &[&Article],
    secondary: &[SecondaryClassification],
) -> Vec<SecondaryCountRow> {
    secondary
        .iter()
        .map(|sc| SecondaryCountRow {
            name: sc.name.clone(),
            count: articles
                .iter()
                .filter(|a| a.secondary_classification_id.as_deref() == Some(sc.id.as_str()))
                .count(),
        })
        .filter(|row| row.count > 0)
        .collect()
}

/// Like rates per secondary classification over the latest note-bearing
/// snapshot at or before `end`. Zero rates are dropped.
pub fn secondary_like_rates(
    articles: &[&Article],
    secondary: &[SecondaryClassification],
    end: NaiveDate,
) -> Vec<SecondaryLikeRateRow> {
    secondary
        .iter()
        .map(|sc| {
            let mut views = 0i64;
            let mut likes = 0i64;
            for article in articles
                .iter()
                .filter(|a| a.secondary_classification_id.as_deref() == Some(sc.id.as_str()))
            {
                // Latest snapshot that carries note_data at all; views
                // and likes come from that one snapshot together.
                let latest = article
                    .daily_snapshots
                    .iter()
                    .rev()
                    .filter(|s| s.date <= end)
                    .find(|s| s.note_data.is_some());
                if let Some(n) = latest.and_then(|s| s.note_data.as_ref()) {
                    views += n.views;
                    likes += n.likes;
                }
            }
            let like_rate = if views > 0 {
                likes as f64 / views as f64 * 100.0
            } else {
                0.0
            };
            SecondaryLikeRateRow {
                name: sc.name.clone(),
                like_rate,
            }
        })
        .filter(|row| row.like_rate > 0.0)
        .collect()
}
