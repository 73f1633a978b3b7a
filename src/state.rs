use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::color::ColorMap;
use crate::config::DashboardConfig;
use crate::data::aggregate::{dataset_overview, DatasetOverview, Report};
use crate::data::export::export_rows;
use crate::data::filter::{filtered_indices, FilterCriteria};
use crate::data::loader::load_dataset;
use crate::data::model::{sentiment_label, DailyMetric, Dataset};

// ---------------------------------------------------------------------------
// Chart sections
// ---------------------------------------------------------------------------

/// The toggleable sections of the central panel, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChartSection {
    Overview,
    Sentiment,
    Performance,
    WinRates,
    Leverage,
    Frequency,
    Trends,
    Data,
}

impl ChartSection {
    pub const ALL: [ChartSection; 8] = [
        ChartSection::Overview,
        ChartSection::Sentiment,
        ChartSection::Performance,
        ChartSection::WinRates,
        ChartSection::Leverage,
        ChartSection::Frequency,
        ChartSection::Trends,
        ChartSection::Data,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChartSection::Overview => "📊 Overview",
            ChartSection::Sentiment => "🎭 Sentiment",
            ChartSection::Performance => "💰 Performance",
            ChartSection::WinRates => "🏆 Win Rates",
            ChartSection::Leverage => "⚖ Leverage",
            ChartSection::Frequency => "⏱ Frequency",
            ChartSection::Trends => "📈 Trends",
            ChartSection::Data => "📋 Data",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ChartSection::Overview => "Key performance metrics and summary statistics",
            ChartSection::Sentiment => "Market sentiment distribution and analysis",
            ChartSection::Performance => "PnL distribution and performance metrics",
            ChartSection::WinRates => "Win rate analysis by different segments",
            ChartSection::Leverage => "Leverage-based performance comparison",
            ChartSection::Frequency => "Trading frequency analysis",
            ChartSection::Trends => "Time-based trends and patterns",
            ChartSection::Data => "Raw data preview and exploration",
        }
    }
}

/// Tabs of the trends section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendTab {
    #[default]
    Pnl,
    WinRate,
    Volume,
}

/// Which categorical filter a bulk action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterColumn {
    Sentiment,
    Leverage,
    Frequency,
}

/// The two derived trader segment columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentColumn {
    Leverage,
    Frequency,
}

impl From<SegmentColumn> for FilterColumn {
    fn from(column: SegmentColumn) -> Self {
        match column {
            SegmentColumn::Leverage => FilterColumn::Leverage,
            SegmentColumn::Frequency => FilterColumn::Frequency,
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    pub config: DashboardConfig,

    /// Loaded dataset, shared read-only with the render code.
    pub dataset: Option<Arc<Dataset>>,

    /// Headline numbers of the unfiltered table.
    pub overview: Option<DatasetOverview>,

    /// Current filter predicates (None until a dataset is loaded).
    pub criteria: Option<FilterCriteria>,

    /// Indices of rows passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Aggregates over the visible rows (cached).
    pub report: Report,

    /// Selected chart sections.
    pub sections: BTreeSet<ChartSection>,

    pub trend_tab: TrendTab,

    pub sentiment_colors: ColorMap,

    /// Load failure. While set, the dashboard is not rendered.
    pub fatal_error: Option<String>,

    /// Non-fatal status / error message shown in the top bar.
    pub status_message: Option<String>,
}

impl AppState {
    /// Create the state and load the configured data directory.
    pub fn new(config: DashboardConfig) -> Self {
        let dir = config.data_dir.clone();
        let mut state = Self {
            config,
            ..Default::default()
        };
        state.load_dir(&dir);
        state
    }

    /// Load both input files from `dir`, replacing the current dataset.
    /// On failure the session halts with the error message.
    pub fn load_dir(&mut self, dir: &Path) {
        match load_dataset(dir) {
            Ok(dataset) => self.set_dataset(Arc::new(dataset)),
            Err(e) => {
                if e.is_missing_file() {
                    log::warn!("{e}");
                } else {
                    log::error!("Failed to load data from {}: {e}", dir.display());
                }
                self.dataset = None;
                self.overview = None;
                self.criteria = None;
                self.visible_indices.clear();
                self.report = Report::default();
                self.fatal_error = Some(e.to_string());
            }
        }
    }

    /// Ingest a newly loaded dataset, initialise filters and colours.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        let metrics = &dataset.metrics;
        self.criteria = Some(FilterCriteria::accept_all(metrics));
        self.overview = Some(dataset_overview(metrics));
        self.sentiment_colors =
            ColorMap::new(metrics.sentiments.iter().map(sentiment_label));
        self.config.data_dir = dataset.source_dir.clone();

        self.dataset = Some(dataset);
        self.fatal_error = None;
        self.status_message = None;
        self.refilter();
    }

    /// Recompute `visible_indices` and the report after a filter change.
    pub fn refilter(&mut self) {
        let (Some(ds), Some(criteria)) = (&self.dataset, &self.criteria) else {
            return;
        };
        self.visible_indices = filtered_indices(&ds.metrics, criteria);
        log::debug!(
            "Filter matched {} of {} rows",
            self.visible_indices.len(),
            ds.metrics.len()
        );

        let report = Report::build(&self.visible_rows(), self.config.preview_rows);
        self.report = report;
    }

    /// Rows passing the current filters, in table order.
    pub fn visible_rows(&self) -> Vec<&DailyMetric> {
        match &self.dataset {
            Some(ds) => self
                .visible_indices
                .iter()
                .map(|&i| &ds.metrics.rows[i])
                .collect(),
            None => Vec::new(),
        }
    }

    // -- filter edits --

    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) {
        if let Some(c) = &mut self.criteria {
            c.start = start;
            c.end = end;
        }
        self.refilter();
    }

    /// Toggle one classification (`None` = unclassified).
    pub fn toggle_sentiment(&mut self, value: &Option<String>) {
        if let Some(c) = &mut self.criteria {
            toggle(&mut c.sentiments, value);
        }
        self.refilter();
    }

    pub fn toggle_segment(&mut self, column: SegmentColumn, value: &str) {
        if let Some(c) = &mut self.criteria {
            let set = match column {
                SegmentColumn::Leverage => &mut c.leverage,
                SegmentColumn::Frequency => &mut c.frequency,
            };
            toggle(set, &value.to_string());
        }
        self.refilter();
    }

    /// Select every value of a column.
    pub fn select_all(&mut self, column: FilterColumn) {
        if let (Some(ds), Some(c)) = (&self.dataset, &mut self.criteria) {
            let metrics = &ds.metrics;
            match column {
                FilterColumn::Sentiment => c.sentiments = metrics.sentiments.clone(),
                FilterColumn::Leverage => c.leverage = metrics.leverage_segments.clone(),
                FilterColumn::Frequency => c.frequency = metrics.frequency_segments.clone(),
            }
        }
        self.refilter();
    }

    /// Deselect every value of a column.
    pub fn select_none(&mut self, column: FilterColumn) {
        if let Some(c) = &mut self.criteria {
            match column {
                FilterColumn::Sentiment => c.sentiments.clear(),
                FilterColumn::Leverage => c.leverage.clear(),
                FilterColumn::Frequency => c.frequency.clear(),
            }
        }
        self.refilter();
    }

    /// Back to accepting every row.
    pub fn clear_filters(&mut self) {
        if let Some(ds) = &self.dataset {
            self.criteria = Some(FilterCriteria::accept_all(&ds.metrics));
        }
        self.refilter();
    }

    // -- chart sections --

    pub fn toggle_section(&mut self, section: ChartSection) {
        if !self.sections.remove(&section) {
            self.sections.insert(section);
        }
    }

    pub fn show_all_sections(&mut self) {
        self.sections = ChartSection::ALL.into_iter().collect();
    }

    pub fn reset_sections(&mut self) {
        self.sections.clear();
    }

    // -- export --

    /// Write the visible rows to `path`; the outcome goes to the status line.
    pub fn export_visible(&mut self, path: &Path) {
        let result = export_rows(&self.visible_rows(), path);
        self.status_message = Some(match result {
            Ok(()) => format!(
                "Exported {} rows to {}",
                self.visible_indices.len(),
                path.display()
            ),
            Err(e) => {
                log::error!("Export failed: {e:#}");
                format!("Error: {e:#}")
            }
        });
    }
}

fn toggle<T: Ord + Clone>(set: &mut BTreeSet<T>, value: &T) {
    if !set.remove(value) {
        set.insert(value.clone());
    }
}
