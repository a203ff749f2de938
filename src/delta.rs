//! # Article Deltas
//! Per-article start/end metric deltas over a date range, plus the
//! top-performer marking. The end value comes from the latest snapshot
//! at or before the period end; the baseline comes from the latest
//! snapshot strictly before the period start (a snapshot dated on the
//! start day is period activity, not pre-period state).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Article, DailySnapshot, XLifetimeTotals};
use crate::snapshot::{in_range, latest_at_or_before, latest_before};

/// One filtered article with its period deltas. Carries the original
/// identifying fields so the presentation layer needs no join, the
/// snapshots trimmed to the period, and the lifetime X totals
/// (recomputed from the full history, not a stored field).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDelta {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub classification_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_classification_id: Option<String>,
    /// Snapshots dated within `[start, end]` inclusive.
    pub snapshots_in_period: Vec<DailySnapshot>,
    pub note_views_change: i64,
    pub note_likes_change: i64,
    pub note_comments_change: i64,
    pub x_impressions_change: i64,
    pub x_likes_change: i64,
    pub x_lifetime: XLifetimeTotals,
    #[serde(default)]
    pub is_top_performer: bool,
}

/// Compute deltas for every article, apply the inclusion rule, and mark
/// the top performer.
///
/// Inclusion: published on or before `end`, AND (at least one snapshot
/// in the period OR a non-zero views/likes delta). The second arm keeps
/// articles whose lifetime counters moved without an in-period
/// snapshot; articles with neither are noise and are dropped.
pub fn compute(articles: &[&Article], start: NaiveDate, end: NaiveDate) -> Vec<ArticleDelta> {
    let mut rows: Vec<ArticleDelta> = articles
        .iter()
        .map(|a| delta_for(a, start, end))
        .filter(|(a, row)| {
            a.published_on_or_before(end)
                && (!row.snapshots_in_period.is_empty()
                    || row.note_views_change != 0
                    || row.note_likes_change != 0)
        })
        .map(|(_, row)| row)
        .collect();

    mark_top_performer(&mut rows);
    rows
}

fn delta_for<'a>(
    article: &'a Article,
    start: NaiveDate,
    end: NaiveDate,
) -> (&'a Article, ArticleDelta) {
    let end_snap = latest_at_or_before(&article.daily_snapshots, end);
    let start_snap = latest_before(&article.daily_snapshots, start);

    let value = |snap: Option<&DailySnapshot>, get: fn(&DailySnapshot) -> Option<i64>| {
        snap.and_then(get).unwrap_or(0)
    };
    let change = |get: fn(&DailySnapshot) -> Option<i64>| {
        value(end_snap, get) - value(start_snap, get)
    };

    let row = ArticleDelta {
        id: article.id.clone(),
        title: article.title.clone(),
        url: article.url.clone(),
        publication_date: article.publication_date,
        classification_id: article.classification_id.clone(),
        secondary_classification_id: article.secondary_classification_id.clone(),
        snapshots_in_period: in_range(&article.daily_snapshots, start, end)
            .cloned()
            .collect(),
        note_views_change: change(DailySnapshot::note_views),
        note_likes_change: change(DailySnapshot::note_likes),
        note_comments_change: change(DailySnapshot::note_comments),
        x_impressions_change: change(DailySnapshot::x_impressions),
        x_likes_change: change(DailySnapshot::x_likes),
        x_lifetime: article.lifetime_x_totals(),
        is_top_performer: false,
    };
    (article, row)
}

/// Flag the first-encountered strictly-largest views delta, and only
/// when that maximum is strictly positive: with nothing growing there
/// is no top performer.
fn mark_top_performer(rows: &mut [ArticleDelta]) {
    let mut best: Option<(usize, i64)> = None;
    for (i, row) in rows.iter().enumerate() {
        match best {
            Some((_, max)) if row.note_views_change <= max => {}
            _ => best = Some((i, row.note_views_change)),
        }
    }
    if let Some((i, max)) = best {
        if max > 0 {
            rows[i].is_top_performer = true;
        }
    }
}
