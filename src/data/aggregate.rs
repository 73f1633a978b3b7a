use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::model::{DailyMetric, MetricsTable};

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Headline numbers for the whole (unfiltered) table.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetOverview {
    pub traders: usize,
    pub trading_days: usize,
    pub avg_win_rate: Option<f64>,
    pub total_pnl: f64,
}

/// Headline numbers for the filtered rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredOverview {
    pub rows: usize,
    pub avg_pnl: f64,
    pub avg_win_rate: f64,
    pub total_trades: u64,
}

/// Five-number summary of PnL for one sentiment, plus outliers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub sentiment: String,
    pub count: usize,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// Mean PnL and one other mean for a (sentiment, segment) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentBreakdown {
    pub sentiment: String,
    pub segment: String,
    pub mean_pnl: f64,
    /// Mean win rate for leverage breakdowns, mean trade count for frequency.
    pub mean_metric: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub mean_pnl: f64,
    pub mean_win_rate: f64,
    pub total_trades: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyInsights {
    /// Sentiment with the highest mean PnL.
    pub best_sentiment: Option<String>,
    /// Leverage segment with the highest mean win rate.
    pub best_leverage: Option<String>,
}

pub fn dataset_overview(table: &MetricsTable) -> DatasetOverview {
    let traders: BTreeSet<&str> = table.rows.iter().map(|r| r.account.as_str()).collect();
    let days: BTreeSet<NaiveDate> = table.rows.iter().map(|r| r.date).collect();
    DatasetOverview {
        traders: traders.len(),
        trading_days: days.len(),
        avg_win_rate: mean(table.rows.iter().map(|r| r.win_rate)),
        total_pnl: table.rows.iter().map(|r| r.total_pnl).sum(),
    }
}

/// `None` when no row passed the filters.
pub fn filtered_overview(rows: &[&DailyMetric]) -> Option<FilteredOverview> {
    Some(FilteredOverview {
        rows: rows.len(),
        avg_pnl: mean(rows.iter().map(|r| r.total_pnl))?,
        avg_win_rate: mean(rows.iter().map(|r| r.win_rate))?,
        total_trades: rows.iter().map(|r| r.num_trades).sum(),
    })
}

/// Rows per classification, most frequent first. Unclassified rows are
/// not counted.
pub fn sentiment_counts(rows: &[&DailyMetric]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        if let Some(c) = &row.classification {
            *counts.entry(c.as_str()).or_default() += 1;
        }
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(label, n)| (label.to_string(), n))
        .collect();
    // stable: equal counts stay in label order
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

pub fn pnl_distribution(rows: &[&DailyMetric]) -> Vec<BoxStats> {
    group_by_sentiment(rows)
        .into_iter()
        .filter_map(|(sentiment, group)| {
            let pnl: Vec<f64> = group.iter().map(|r| r.total_pnl).collect();
            box_stats(sentiment, &pnl)
        })
        .collect()
}

pub fn mean_win_rate_by_sentiment(rows: &[&DailyMetric]) -> Vec<(String, f64)> {
    group_by_sentiment(rows)
        .into_iter()
        .filter_map(|(sentiment, group)| {
            mean(group.iter().map(|r| r.win_rate)).map(|m| (sentiment, m))
        })
        .collect()
}

pub fn leverage_breakdown(rows: &[&DailyMetric]) -> Vec<SegmentBreakdown> {
    breakdown(rows, |r| &r.leverage_segment, |r| r.win_rate)
}

pub fn frequency_breakdown(rows: &[&DailyMetric]) -> Vec<SegmentBreakdown> {
    breakdown(rows, |r| &r.frequency_segment, |r| r.num_trades as f64)
}

/// Per-date means and trade totals, oldest first.
pub fn daily_trends(rows: &[&DailyMetric]) -> Vec<DailyTrend> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&DailyMetric>> = BTreeMap::new();
    for &row in rows {
        by_date.entry(row.date).or_default().push(row);
    }
    by_date
        .into_iter()
        .filter_map(|(date, group)| {
            Some(DailyTrend {
                date,
                mean_pnl: mean(group.iter().map(|r| r.total_pnl))?,
                mean_win_rate: mean(group.iter().map(|r| r.win_rate))?,
                total_trades: group.iter().map(|r| r.num_trades).sum(),
            })
        })
        .collect()
}

pub fn key_insights(rows: &[&DailyMetric]) -> KeyInsights {
    let best_sentiment = argmax(
        group_by_sentiment(rows)
            .into_iter()
            .filter_map(|(s, g)| mean(g.iter().map(|r| r.total_pnl)).map(|m| (s, m))),
    );

    let mut by_leverage: BTreeMap<&str, Vec<&DailyMetric>> = BTreeMap::new();
    for &row in rows {
        by_leverage.entry(row.leverage_segment.as_str()).or_default().push(row);
    }
    let best_leverage = argmax(by_leverage.into_iter().filter_map(|(seg, g)| {
        mean(g.iter().map(|r| r.win_rate)).map(|m| (seg.to_string(), m))
    }));

    KeyInsights {
        best_sentiment,
        best_leverage,
    }
}

// ---------------------------------------------------------------------------
// Report – everything the chart sections need, cached between frames
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    pub filtered: Option<FilteredOverview>,
    pub sentiment_counts: Vec<(String, usize)>,
    pub pnl_boxes: Vec<BoxStats>,
    pub win_rates: Vec<(String, f64)>,
    pub leverage: Vec<SegmentBreakdown>,
    pub frequency: Vec<SegmentBreakdown>,
    pub trends: Vec<DailyTrend>,
    pub insights: KeyInsights,
    /// Leading rows of the filtered view.
    pub preview: Vec<DailyMetric>,
    pub total_rows: usize,
}

impl Report {
    pub fn build(rows: &[&DailyMetric], preview_rows: usize) -> Self {
        Report {
            filtered: filtered_overview(rows),
            sentiment_counts: sentiment_counts(rows),
            pnl_boxes: pnl_distribution(rows),
            win_rates: mean_win_rate_by_sentiment(rows),
            leverage: leverage_breakdown(rows),
            frequency: frequency_breakdown(rows),
            trends: daily_trends(rows),
            insights: key_insights(rows),
            preview: rows.iter().take(preview_rows).map(|&r| r.clone()).collect(),
            total_rows: rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Rows grouped by classification label; unclassified rows are dropped.
fn group_by_sentiment<'a>(rows: &[&'a DailyMetric]) -> BTreeMap<String, Vec<&'a DailyMetric>> {
    let mut groups: BTreeMap<String, Vec<&DailyMetric>> = BTreeMap::new();
    for &row in rows {
        if let Some(c) = &row.classification {
            groups.entry(c.clone()).or_default().push(row);
        }
    }
    groups
}

fn breakdown(
    rows: &[&DailyMetric],
    segment: impl Fn(&DailyMetric) -> &String,
    metric: impl Fn(&DailyMetric) -> f64,
) -> Vec<SegmentBreakdown> {
    let mut groups: BTreeMap<(&str, &str), Vec<&DailyMetric>> = BTreeMap::new();
    for &row in rows {
        if let Some(c) = &row.classification {
            groups
                .entry((c.as_str(), segment(row).as_str()))
                .or_default()
                .push(row);
        }
    }
    groups
        .into_iter()
        .filter_map(|((sentiment, seg), group)| {
            Some(SegmentBreakdown {
                sentiment: sentiment.to_string(),
                segment: seg.to_string(),
                mean_pnl: round4(mean(group.iter().map(|r| r.total_pnl))?),
                mean_metric: round4(mean(group.iter().map(|&r| metric(r)))?),
            })
        })
        .collect()
}

/// Label with the largest value; the first label wins ties.
fn argmax(items: impl Iterator<Item = (String, f64)>) -> Option<String> {
    let mut best: Option<(String, f64)> = None;
    for (label, v) in items {
        if best.as_ref().map_or(true, |(_, bv)| v > *bv) {
            best = Some((label, v));
        }
    }
    best.map(|(label, _)| label)
}

/// Linear-interpolation quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Whiskers reach the most extreme points within 1.5 IQR of the box.
fn box_stats(sentiment: String, values: &[f64]) -> Option<BoxStats> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25)?;
    let median = quantile(&sorted, 0.5)?;
    let q3 = quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    let inside = sorted.iter().copied().filter(|v| (lo_fence..=hi_fence).contains(v));
    let lower_whisker = inside.clone().next().unwrap_or(q1);
    let upper_whisker = inside.last().unwrap_or(q3);
    let outliers = sorted
        .iter()
        .copied()
        .filter(|v| !(lo_fence..=hi_fence).contains(v))
        .collect();

    Some(BoxStats {
        sentiment,
        count: sorted.len(),
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{date, metric};

    fn row(sentiment: Option<&str>, day: u32, pnl: f64, win: f64, trades: u64) -> DailyMetric {
        let mut r = metric(&format!("acct{day}"), date(2021, 1, day), sentiment);
        r.total_pnl = pnl;
        r.win_rate = win;
        r.num_trades = trades;
        r
    }

    fn sample() -> Vec<DailyMetric> {
        let mut rows = vec![
            row(Some("Fear"), 1, -10.0, 0.2, 4),
            row(Some("Greed"), 1, 30.0, 0.6, 10),
            row(Some("Fear"), 2, 20.0, 0.4, 6),
            row(Some("Greed"), 2, 50.0, 0.8, 2),
            row(Some("Greed"), 3, 10.0, 0.7, 3),
            row(None, 3, 1000.0, 1.0, 1),
        ];
        rows[1].leverage_segment = "High Leverage".to_string();
        rows[3].leverage_segment = "High Leverage".to_string();
        rows[3].frequency_segment = "Frequent".to_string();
        rows
    }

    #[test]
    fn overview_of_whole_table() {
        let table = MetricsTable::from_rows(sample());
        let ov = dataset_overview(&table);
        assert_eq!(ov.traders, 3);
        assert_eq!(ov.trading_days, 3);
        assert_eq!(ov.total_pnl, 1100.0);
        assert!((ov.avg_win_rate.unwrap() - 3.7 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn filtered_overview_is_none_when_empty() {
        assert_eq!(filtered_overview(&[]), None);

        let rows = sample();
        let refs: Vec<&DailyMetric> = rows.iter().take(2).collect();
        let ov = filtered_overview(&refs).unwrap();
        assert_eq!(ov.rows, 2);
        assert_eq!(ov.avg_pnl, 10.0);
        assert_eq!(ov.total_trades, 14);
    }

    #[test]
    fn sentiment_counts_descend_and_skip_nulls() {
        let rows = sample();
        let refs: Vec<&DailyMetric> = rows.iter().collect();
        assert_eq!(
            sentiment_counts(&refs),
            vec![("Greed".to_string(), 3), ("Fear".to_string(), 2)]
        );
    }

    #[test]
    fn win_rate_and_best_segments() {
        let rows = sample();
        let refs: Vec<&DailyMetric> = rows.iter().collect();

        let win = mean_win_rate_by_sentiment(&refs);
        assert_eq!(win[0].0, "Fear");
        assert!((win[0].1 - 0.3).abs() < 1e-12);
        assert!((win[1].1 - 0.7).abs() < 1e-12);

        let insights = key_insights(&refs);
        assert_eq!(insights.best_sentiment.as_deref(), Some("Greed"));
        // unclassified rows still count towards the leverage comparison
        assert_eq!(insights.best_leverage.as_deref(), Some("High Leverage"));
    }

    #[test]
    fn leverage_breakdown_groups_pairs_and_rounds() {
        let rows = sample();
        let refs: Vec<&DailyMetric> = rows.iter().collect();
        let lev = leverage_breakdown(&refs);

        let keys: Vec<(&str, &str)> = lev
            .iter()
            .map(|b| (b.sentiment.as_str(), b.segment.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("Fear", "Low Leverage"),
                ("Greed", "High Leverage"),
                ("Greed", "Low Leverage"),
            ]
        );
        assert_eq!(lev[1].mean_pnl, 40.0);
        assert_eq!(lev[1].mean_metric, 0.7);
    }

    #[test]
    fn frequency_breakdown_means_trade_counts() {
        let rows = sample();
        let refs: Vec<&DailyMetric> = rows.iter().collect();
        let freq = frequency_breakdown(&refs);

        let greed_infrequent = freq
            .iter()
            .find(|b| b.sentiment == "Greed" && b.segment == "Infrequent")
            .unwrap();
        assert_eq!(greed_infrequent.mean_metric, 6.5);
        assert_eq!(greed_infrequent.mean_pnl, 20.0);
    }

    #[test]
    fn daily_trends_sorted_by_date() {
        let rows = sample();
        let refs: Vec<&DailyMetric> = rows.iter().collect();
        let trends = daily_trends(&refs);

        assert_eq!(trends.len(), 3);
        assert_eq!(trends[0].date, date(2021, 1, 1));
        assert_eq!(trends[0].mean_pnl, 10.0);
        assert_eq!(trends[0].total_trades, 14);
        // unclassified rows still count towards the daily series
        assert_eq!(trends[2].mean_pnl, 505.0);
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.5), Some(2.5));
        assert_eq!(quantile(&v, 0.25), Some(1.75));
        assert_eq!(quantile(&[7.0], 0.75), Some(7.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn box_stats_flag_outliers() {
        let stats = box_stats("Fear".into(), &[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.q1, 2.0);
        assert_eq!(stats.q3, 4.0);
        assert_eq!(stats.upper_whisker, 4.0);
        assert_eq!(stats.lower_whisker, 1.0);
        assert_eq!(stats.outliers, vec![100.0]);
    }

    #[test]
    fn report_preview_is_capped() {
        let rows: Vec<DailyMetric> = (1..=25)
            .map(|d| row(Some("Fear"), d, d as f64, 0.5, 1))
            .collect();
        let refs: Vec<&DailyMetric> = rows.iter().collect();
        let report = Report::build(&refs, 20);

        assert_eq!(report.preview.len(), 20);
        assert_eq!(report.total_rows, 25);
        assert!(!report.is_empty());
        assert!(Report::build(&[], 20).is_empty());
    }
}
