use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::model::{DailyMetric, MetricsTable};

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// User-selected constraints on the daily metrics table. All five predicates
/// must hold for a row to pass.
///
/// An empty set means nothing of that category is accepted, so no row passes.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    /// Inclusive lower date bound.
    pub start: NaiveDate,
    /// Inclusive upper date bound.
    pub end: NaiveDate,
    /// Accepted classifications; `None` accepts unclassified rows.
    pub sentiments: BTreeSet<Option<String>>,
    pub leverage: BTreeSet<String>,
    pub frequency: BTreeSet<String>,
}

impl FilterCriteria {
    /// Criteria accepting every row of `table`: full date span and every
    /// category present.
    pub fn accept_all(table: &MetricsTable) -> Self {
        let (start, end) = table
            .date_bounds
            .unwrap_or((NaiveDate::MIN, NaiveDate::MAX));
        FilterCriteria {
            start,
            end,
            sentiments: table.sentiments.clone(),
            leverage: table.leverage_segments.clone(),
            frequency: table.frequency_segments.clone(),
        }
    }

    pub fn matches(&self, row: &DailyMetric) -> bool {
        self.start <= row.date
            && row.date <= self.end
            && self.sentiments.contains(&row.classification)
            && self.leverage.contains(&row.leverage_segment)
            && self.frequency.contains(&row.frequency_segment)
    }
}

/// Indices of rows passing `criteria`, in table order.
pub fn filtered_indices(table: &MetricsTable, criteria: &FilterCriteria) -> Vec<usize> {
    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| criteria.matches(row))
        .map(|(i, _)| i)
        .collect()
}

/// New table holding only the rows passing `criteria`. `table` is untouched.
pub fn filter_table(table: &MetricsTable, criteria: &FilterCriteria) -> MetricsTable {
    let rows = table
        .rows
        .iter()
        .filter(|row| criteria.matches(row))
        .cloned()
        .collect();
    MetricsTable::from_rows(rows)
}
