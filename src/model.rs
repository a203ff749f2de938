//! # Data Model
//! Serde types for articles, daily snapshots, classifications, and KPIs,
//! as produced by the external ingestion pipelines (CSV/text import and
//! the X polling job). The engine consumes these as-is and never mutates
//! them.
//!
//! The confirmed-over-preliminary precedence rule for X metrics lives
//! here, on `DailySnapshot`, so every caller resolves it identically.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Cumulative note-side counters for one article on one date.
/// Counters are cumulative in principle but the engine never assumes
/// monotonicity (imports can correct earlier figures downward).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteData {
    pub views: i64,
    pub comments: i64,
    pub likes: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales: Option<i64>,
}

/// Same-day-window X counters from the fast/approximate source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XPreliminaryData {
    pub impressions: i64,
    pub likes: i64,
    pub replies: i64,
    pub retweets: i64,
    pub quotes: i64,
}

/// Same-day-window X counters from the slower/authoritative source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XConfirmedData {
    pub impressions: i64,
    pub likes: i64,
    pub engagements: i64,
}

/// One dated metrics record for one article. At most one snapshot per
/// calendar date; all three metric groups are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    /// Calendar date (`YYYY-MM-DD`), the snapshot key.
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_data: Option<NoteData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_preliminary_data: Option<XPreliminaryData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_confirmed_data: Option<XConfirmedData>,
}

impl DailySnapshot {
    /// Note views carried by this snapshot, if any.
    pub fn note_views(&self) -> Option<i64> {
        self.note_data.as_ref().map(|n| n.views)
    }

    /// Note likes carried by this snapshot, if any.
    pub fn note_likes(&self) -> Option<i64> {
        self.note_data.as_ref().map(|n| n.likes)
    }

    /// Note comments carried by this snapshot, if any.
    pub fn note_comments(&self) -> Option<i64> {
        self.note_data.as_ref().map(|n| n.comments)
    }

    /// Note sales carried by this snapshot, if any.
    pub fn note_sales(&self) -> Option<i64> {
        self.note_data.as_ref().and_then(|n| n.sales)
    }

    /// X impressions with precedence: confirmed wins over preliminary.
    pub fn x_impressions(&self) -> Option<i64> {
        self.x_confirmed_data
            .as_ref()
            .map(|c| c.impressions)
            .or_else(|| self.x_preliminary_data.as_ref().map(|p| p.impressions))
    }

    /// X likes with precedence: confirmed wins over preliminary.
    pub fn x_likes(&self) -> Option<i64> {
        self.x_confirmed_data
            .as_ref()
            .map(|c| c.likes)
            .or_else(|| self.x_preliminary_data.as_ref().map(|p| p.likes))
    }
}

/// Primary classification axis (flat tag set, id + display name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub id: String,
    pub name: String,
}

/// Secondary classification axis. Structurally identical to the primary
/// axis but selected and aggregated independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryClassification {
    pub id: String,
    pub name: String,
}

/// A user-defined goal: an expression over aggregate metrics plus a
/// numeric target. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub id: String,
    pub kpi_name: String,
    /// Formula in the small arithmetic/boolean grammar, e.g.
    /// `note_data.likes / note_data.views * 100`.
    pub expression: String,
    pub target_value: f64,
}

/// One article with its full snapshot history, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<DateTime<Utc>>,
    /// Primary classification id; empty string means "unclassified".
    #[serde(default)]
    pub classification_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_classification_id: Option<String>,
    /// Deactivation is a flag, not removal; absent means active.
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub daily_snapshots: Vec<DailySnapshot>,
}

fn default_true() -> bool {
    true
}

/// Lifetime X totals, recomputed on read from the snapshot history so
/// they can never go stale when snapshots change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XLifetimeTotals {
    pub impressions: i64,
    pub likes: i64,
    pub replies: i64,
    pub retweets: i64,
    pub quotes: i64,
    pub engagements: i64,
}

impl Article {
    /// Calendar date of publication, if the article has one.
    pub fn publication_day(&self) -> Option<NaiveDate> {
        self.publication_date.map(|ts| ts.date_naive())
    }

    /// True when the article was published on or before `day`.
    /// Articles without a publication date always qualify: a dateless
    /// record came from an import that predates date tracking, not
    /// from the future.
    pub fn published_on_or_before(&self, day: NaiveDate) -> bool {
        self.publication_day().is_none_or(|d| d <= day)
    }

    /// Sum the per-snapshot X counters over the full history.
    /// Precedence is per snapshot at the group level: a snapshot with
    /// confirmed data contributes only its confirmed counters, and the
    /// preliminary group (replies/retweets/quotes included) is read
    /// only when no confirmed group exists for that date.
    pub fn lifetime_x_totals(&self) -> XLifetimeTotals {
        let mut t = XLifetimeTotals::default();
        for s in &self.daily_snapshots {
            if let Some(c) = &s.x_confirmed_data {
                t.impressions += c.impressions;
                t.likes += c.likes;
                t.engagements += c.engagements;
            } else if let Some(p) = &s.x_preliminary_data {
                t.impressions += p.impressions;
                t.likes += p.likes;
                t.replies += p.replies;
                t.retweets += p.retweets;
                t.quotes += p.quotes;
            }
        }
        t
    }

    /// Restore the ascending-unique-date invariant on ingested data:
    /// sort by date, and where dates collide keep the last record
    /// (later writes win).
    pub fn normalize_snapshots(&mut self) {
        self.daily_snapshots.sort_by_key(|s| s.date);
        // Last write wins within equal dates; dedup_by keeps the first
        // of a run, so compare from the back.
        let mut i = self.daily_snapshots.len();
        while i > 1 {
            i -= 1;
            if self.daily_snapshots[i - 1].date == self.daily_snapshots[i].date {
                self.daily_snapshots.remove(i - 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().expect("valid date")
    }

    fn snap(date: &str) -> DailySnapshot {
        DailySnapshot {
            date: d(date),
            note_data: None,
            x_preliminary_data: None,
            x_confirmed_data: None,
        }
    }

    #[test]
    fn confirmed_takes_precedence_over_preliminary() {
        let mut s = snap("2025-06-01");
        s.x_preliminary_data = Some(XPreliminaryData {
            impressions: 100,
            likes: 10,
            ..Default::default()
        });
        s.x_confirmed_data = Some(XConfirmedData {
            impressions: 90,
            likes: 8,
            engagements: 5,
        });
        assert_eq!(s.x_impressions(), Some(90));
        assert_eq!(s.x_likes(), Some(8));
    }

    #[test]
    fn preliminary_used_when_no_confirmed() {
        let mut s = snap("2025-06-01");
        s.x_preliminary_data = Some(XPreliminaryData {
            impressions: 100,
            likes: 10,
            ..Default::default()
        });
        assert_eq!(s.x_impressions(), Some(100));
        assert_eq!(s.x_likes(), Some(10));
    }

    #[test]
    fn lifetime_totals_sum_with_precedence_per_snapshot() {
        let mut a = Article {
            id: "a1".into(),
            title: "t".into(),
            url: "u".into(),
            publication_date: None,
            classification_id: String::new(),
            secondary_classification_id: None,
            is_active: true,
            daily_snapshots: vec![snap("2025-06-01"), snap("2025-06-02")],
        };
        a.daily_snapshots[0].x_preliminary_data = Some(XPreliminaryData {
            impressions: 100,
            likes: 10,
            replies: 1,
            retweets: 2,
            quotes: 3,
        });
        a.daily_snapshots[1].x_preliminary_data = Some(XPreliminaryData {
            impressions: 50,
            likes: 5,
            ..Default::default()
        });
        a.daily_snapshots[1].x_confirmed_data = Some(XConfirmedData {
            impressions: 40,
            likes: 4,
            engagements: 7,
        });

        let t = a.lifetime_x_totals();
        assert_eq!(t.impressions, 140); // 100 preliminary + 40 confirmed
        assert_eq!(t.likes, 14);
        assert_eq!(t.replies, 1);
        assert_eq!(t.retweets, 2);
        assert_eq!(t.quotes, 3);
        assert_eq!(t.engagements, 7);
    }

    #[test]
    fn confirmed_snapshot_suppresses_preliminary_extras() {
        // When a date carries both groups, the whole preliminary group
        // is superseded: its replies/retweets/quotes must not leak into
        // the lifetime totals alongside the confirmed counters.
        let mut a = Article {
            id: "a1".into(),
            title: "t".into(),
            url: "u".into(),
            publication_date: None,
            classification_id: String::new(),
            secondary_classification_id: None,
            is_active: true,
            daily_snapshots: vec![snap("2025-06-01")],
        };
        a.daily_snapshots[0].x_preliminary_data = Some(XPreliminaryData {
            impressions: 100,
            likes: 10,
            replies: 7,
            retweets: 8,
            quotes: 9,
        });
        a.daily_snapshots[0].x_confirmed_data = Some(XConfirmedData {
            impressions: 90,
            likes: 8,
            engagements: 5,
        });

        let t = a.lifetime_x_totals();
        assert_eq!(t.impressions, 90);
        assert_eq!(t.likes, 8);
        assert_eq!(t.engagements, 5);
        assert_eq!(t.replies, 0);
        assert_eq!(t.retweets, 0);
        assert_eq!(t.quotes, 0);
    }

    #[test]
    fn normalize_sorts_and_keeps_last_write_per_date() {
        let mut a = Article {
            id: "a1".into(),
            title: "t".into(),
            url: "u".into(),
            publication_date: None,
            classification_id: String::new(),
            secondary_classification_id: None,
            is_active: true,
            daily_snapshots: vec![snap("2025-06-03"), snap("2025-06-01"), snap("2025-06-03")],
        };
        a.daily_snapshots[0].note_data = Some(NoteData {
            views: 1,
            ..Default::default()
        });
        a.daily_snapshots[2].note_data = Some(NoteData {
            views: 2,
            ..Default::default()
        });

        a.normalize_snapshots();
        assert_eq!(a.daily_snapshots.len(), 2);
        assert_eq!(a.daily_snapshots[0].date, d("2025-06-01"));
        assert_eq!(a.daily_snapshots[1].date, d("2025-06-03"));
        assert_eq!(a.daily_snapshots[1].note_views(), Some(2));
    }

    #[test]
    fn is_active_defaults_true_when_absent() {
        let a: Article = serde_json::from_str(
            r#"{"id":"a","title":"t","url":"u","classification_id":""}"#,
        )
        .expect("deserialize");
        assert!(a.is_active);
        assert!(a.daily_snapshots.is_empty());
    }
}
