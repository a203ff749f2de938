//! # Time-Series Reconstruction
//! Rebuilds a dense daily series from sparse snapshots: for every date
//! in the range, each article published by that date contributes its
//! latest snapshot at or before the date (forward-fill, never
//! interpolation). Articles with no snapshot yet contribute 0; they
//! are counted, not excluded.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::Article;
use crate::outlier;
use crate::snapshot::{dates_in_range, latest_at_or_before};

/// One reconstructed day of aggregate metrics across the filtered set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub note_views: i64,
    pub note_likes: i64,
    pub x_impressions: i64,
    pub x_likes: i64,
    #[serde(default)]
    pub note_views_is_spike: bool,
    #[serde(default)]
    pub note_likes_is_spike: bool,
    #[serde(default)]
    pub x_impressions_is_spike: bool,
    #[serde(default)]
    pub x_likes_is_spike: bool,
}

/// Forward-filled daily totals over `[start, end]`, spike-flagged.
pub fn reconstruct(
    articles: &[&Article],
    start: NaiveDate,
    end: NaiveDate,
    spike_sigma: f64,
) -> Vec<DailyRow> {
    let mut rows: Vec<DailyRow> = dates_in_range(start, end)
        .into_iter()
        .map(|date| {
            let mut row = DailyRow {
                date,
                note_views: 0,
                note_likes: 0,
                x_impressions: 0,
                x_likes: 0,
                note_views_is_spike: false,
                note_likes_is_spike: false,
                x_impressions_is_spike: false,
                x_likes_is_spike: false,
            };
            for article in articles {
                if !article.published_on_or_before(date) {
                    continue;
                }
                if let Some(s) = latest_at_or_before(&article.daily_snapshots, date) {
                    row.note_views += s.note_views().unwrap_or(0);
                    row.note_likes += s.note_likes().unwrap_or(0);
                    row.x_impressions += s.x_impressions().unwrap_or(0);
                    row.x_likes += s.x_likes().unwrap_or(0);
                }
            }
            row
        })
        .collect();

    mark_spikes(&mut rows, spike_sigma);
    rows
}

/// Flag per-column spikes across the whole series. Each column gets its
/// own mean/stddev/threshold.
fn mark_spikes(rows: &mut [DailyRow], sigma: f64) {
    mark_column(rows, sigma, |r| r.note_views, |r, f| r.note_views_is_spike = f);
    mark_column(rows, sigma, |r| r.note_likes, |r, f| r.note_likes_is_spike = f);
    mark_column(
        rows,
        sigma,
        |r| r.x_impressions,
        |r, f| r.x_impressions_is_spike = f,
    );
    mark_column(rows, sigma, |r| r.x_likes, |r, f| r.x_likes_is_spike = f);
}

fn mark_column<G, S>(rows: &mut [DailyRow], sigma: f64, get: G, set: S)
where
    G: Fn(&DailyRow) -> i64,
    S: Fn(&mut DailyRow, bool),
{
    let values: Vec<f64> = rows.iter().map(|r| get(r) as f64).collect();
    let threshold = outlier::spike_threshold(&values, sigma);
    for (row, flag) in rows.iter_mut().zip(outlier::flag_over(&values, threshold)) {
        set(row, flag);
    }
}
