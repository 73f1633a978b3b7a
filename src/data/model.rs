use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

/// Display label for rows whose sentiment classification is missing.
pub const UNCLASSIFIED_LABEL: &str = "(unclassified)";

// ---------------------------------------------------------------------------
// DailyMetric – one trader account on one calendar date
// ---------------------------------------------------------------------------

/// A single row of `daily_metrics.csv` with both segment columns resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMetric {
    pub account: String,
    pub date: NaiveDate,
    pub num_trades: u64,
    pub avg_position: f64,
    /// Fraction of winning trades, in `[0, 1]`.
    pub win_rate: f64,
    pub total_pnl: f64,
    /// Market sentiment on that date; `None` when the join found nothing.
    pub classification: Option<String>,
    pub leverage_segment: String,
    pub frequency_segment: String,
}

impl DailyMetric {
    /// Sentiment label as shown in the UI.
    pub fn sentiment_label(&self) -> &str {
        sentiment_label(&self.classification)
    }
}

pub fn sentiment_label(classification: &Option<String>) -> &str {
    classification.as_deref().unwrap_or(UNCLASSIFIED_LABEL)
}

// ---------------------------------------------------------------------------
// MetricsTable – the daily metrics plus pre-computed category indices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsTable {
    pub rows: Vec<DailyMetric>,
    /// Distinct sentiment classifications; `None` stands for unclassified rows.
    pub sentiments: BTreeSet<Option<String>>,
    pub leverage_segments: BTreeSet<String>,
    pub frequency_segments: BTreeSet<String>,
    /// Earliest and latest row date.
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
}

impl MetricsTable {
    /// Build category indices from the loaded rows.
    pub fn from_rows(rows: Vec<DailyMetric>) -> Self {
        let mut sentiments = BTreeSet::new();
        let mut leverage_segments = BTreeSet::new();
        let mut frequency_segments = BTreeSet::new();
        let mut date_bounds: Option<(NaiveDate, NaiveDate)> = None;

        for row in &rows {
            sentiments.insert(row.classification.clone());
            leverage_segments.insert(row.leverage_segment.clone());
            frequency_segments.insert(row.frequency_segment.clone());
            date_bounds = Some(match date_bounds {
                None => (row.date, row.date),
                Some((lo, hi)) => (lo.min(row.date), hi.max(row.date)),
            });
        }

        MetricsTable {
            rows,
            sentiments,
            leverage_segments,
            frequency_segments,
            date_bounds,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Fear & greed index
// ---------------------------------------------------------------------------

/// One row of `fear_greed_index.csv`. Every field is optional because the
/// file is only loosely constrained.
#[derive(Debug, Clone, PartialEq)]
pub struct FearGreedEntry {
    pub date: Option<NaiveDate>,
    pub value: Option<f64>,
    pub classification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SentimentIndex {
    pub entries: Vec<FearGreedEntry>,
}

impl SentimentIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First and last dated entry, if any entry carries a date.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.entries.iter().filter_map(|e| e.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}

// ---------------------------------------------------------------------------
// Dataset – what the loader hands to the rest of the application
// ---------------------------------------------------------------------------

/// Both input tables. Immutable once loaded; shared as `Arc<Dataset>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub metrics: MetricsTable,
    pub sentiment_index: SentimentIndex,
    /// Directory the files were read from.
    pub source_dir: PathBuf,
}
