//! # Filter Stage
//! Two-axis classification filter applied once, up front; every derived
//! view consumes only the filtered set.

use std::collections::HashSet;

use crate::model::Article;

/// The active filter selection, passed explicitly into the engine so
/// each component stays independently testable (no ambient state).
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    /// Selected primary classification ids; empty means pass-all.
    pub primary_ids: HashSet<String>,
    /// Selected secondary classification ids; empty means pass-all.
    pub secondary_ids: HashSet<String>,
}

impl FilterSelection {
    /// An empty selection on each axis deliberately means "no filter":
    /// clearing every checkbox must not filter away everything.
    pub fn matches(&self, article: &Article) -> bool {
        let primary_ok =
            self.primary_ids.is_empty() || self.primary_ids.contains(&article.classification_id);
        let secondary_ok = self.secondary_ids.is_empty()
            || article
                .secondary_classification_id
                .as_ref()
                .is_some_and(|id| !id.is_empty() && self.secondary_ids.contains(id));
        primary_ok && secondary_ok
    }

    /// The subset of `articles` passing both axes, in input order.
    pub fn apply<'a>(&self, articles: &'a [Article]) -> Vec<&'a Article> {
        articles.iter().filter(|a| self.matches(a)).collect()
    }
}
