use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use thiserror::Error;

use super::model::{DailyMetric, Dataset, FearGreedEntry, MetricsTable, SentimentIndex};
use super::segment::{median_split, SegmentError, FREQUENCY_LABELS, LEVERAGE_LABELS};

pub const DAILY_METRICS_FILE: &str = "daily_metrics.csv";
pub const FEAR_GREED_FILE: &str = "fear_greed_index.csv";

/// Columns `daily_metrics.csv` must carry.
pub const REQUIRED_METRIC_COLUMNS: &[&str] = &[
    "account",
    "date",
    "num_trades",
    "avg_position",
    "win_rate",
    "total_pnl",
    "classification",
];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Data file not found: {}. Run the analysis notebook first to generate the required data.", path.display())]
    MissingFile { path: PathBuf },

    #[error("Error loading {file}: missing column '{column}'")]
    MissingColumn { file: String, column: String },

    #[error("Error loading {file}, row {row}: {message}")]
    Parse {
        file: String,
        row: usize,
        message: String,
    },

    #[error("Error loading {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("Error deriving segments: {0}")]
    Segment(#[from] SegmentError),
}

impl LoadError {
    pub fn is_missing_file(&self) -> bool {
        matches!(self, LoadError::MissingFile { .. })
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load both input tables from `dir`.
///
/// Both files are checked for existence before either is parsed, so a
/// missing file never leaves a half-loaded dataset behind.
pub fn load_dataset(dir: &Path) -> Result<Dataset, LoadError> {
    let metrics_path = dir.join(DAILY_METRICS_FILE);
    let index_path = dir.join(FEAR_GREED_FILE);

    for path in [&metrics_path, &index_path] {
        if !path.is_file() {
            return Err(LoadError::MissingFile { path: path.clone() });
        }
    }

    let metrics = load_daily_metrics(&metrics_path)?;
    let sentiment_index = load_fear_greed(&index_path)?;

    log::info!(
        "Loaded {} daily metric rows and {} sentiment index rows from {}",
        metrics.len(),
        sentiment_index.len(),
        dir.display()
    );

    Ok(Dataset {
        metrics,
        sentiment_index,
        source_dir: dir.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// daily_metrics.csv
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawDailyMetric {
    account: String,
    date: String,
    num_trades: f64,
    avg_position: f64,
    win_rate: f64,
    total_pnl: f64,
    classification: Option<String>,
    #[serde(default)]
    leverage_segment: Option<String>,
    #[serde(default)]
    frequency_segment: Option<String>,
}

/// Parsed row before segment resolution.
struct PartialMetric {
    metric: DailyMetric,
    leverage_segment: Option<String>,
    frequency_segment: Option<String>,
}

pub(crate) fn load_daily_metrics(path: &Path) -> Result<MetricsTable, LoadError> {
    let file = display_name(path);
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Csv {
            file: file.clone(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| LoadError::Csv {
            file: file.clone(),
            source,
        })?
        .clone();

    for column in REQUIRED_METRIC_COLUMNS {
        if !has_column(&headers, column) {
            return Err(LoadError::MissingColumn {
                file: file.clone(),
                column: column.to_string(),
            });
        }
    }
    let has_leverage = has_column(&headers, "leverage_segment");
    let has_frequency = has_column(&headers, "frequency_segment");

    let mut partial = Vec::new();
    for (idx, result) in reader.deserialize::<RawDailyMetric>().enumerate() {
        // data rows are 1-based, after the header
        let row = idx + 1;
        let raw = result.map_err(|source| LoadError::Csv {
            file: file.clone(),
            source,
        })?;
        partial.push(convert_row(raw, &file, row)?);
    }

    let leverage = resolve_segment(
        &partial,
        has_leverage,
        "leverage_segment",
        "avg_position",
        LEVERAGE_LABELS,
        &file,
        |p| p.metric.avg_position,
        |p| p.leverage_segment.as_deref(),
    )?;
    let frequency = resolve_segment(
        &partial,
        has_frequency,
        "frequency_segment",
        "num_trades",
        FREQUENCY_LABELS,
        &file,
        |p| p.metric.num_trades as f64,
        |p| p.frequency_segment.as_deref(),
    )?;

    let rows = partial
        .into_iter()
        .zip(leverage)
        .zip(frequency)
        .map(|((p, lev), freq)| DailyMetric {
            leverage_segment: lev,
            frequency_segment: freq,
            ..p.metric
        })
        .collect();

    Ok(MetricsTable::from_rows(rows))
}

fn convert_row(raw: RawDailyMetric, file: &str, row: usize) -> Result<PartialMetric, LoadError> {
    let parse_err = |message: String| LoadError::Parse {
        file: file.to_string(),
        row,
        message,
    };

    let date = parse_date(&raw.date)
        .ok_or_else(|| parse_err(format!("'{}' is not a date", raw.date)))?;

    let n = raw.num_trades;
    if !n.is_finite() || n < 0.0 || n.fract() != 0.0 {
        return Err(parse_err(format!(
            "num_trades must be a non-negative integer, got {n}"
        )));
    }
    if !(0.0..=1.0).contains(&raw.win_rate) {
        return Err(parse_err(format!(
            "win_rate must lie in [0, 1], got {}",
            raw.win_rate
        )));
    }
    if !raw.avg_position.is_finite() || !raw.total_pnl.is_finite() {
        return Err(parse_err("avg_position and total_pnl must be finite".into()));
    }

    Ok(PartialMetric {
        metric: DailyMetric {
            account: raw.account,
            date,
            num_trades: n as u64,
            avg_position: raw.avg_position,
            win_rate: raw.win_rate,
            total_pnl: raw.total_pnl,
            classification: raw.classification.filter(|c| !c.is_empty()),
            leverage_segment: String::new(),
            frequency_segment: String::new(),
        },
        leverage_segment: raw.leverage_segment,
        frequency_segment: raw.frequency_segment,
    })
}

/// Take a segment column from the file when present, otherwise derive it by
/// median split of `source_column`.
#[allow(clippy::too_many_arguments)]
fn resolve_segment(
    partial: &[PartialMetric],
    present: bool,
    segment_column: &str,
    source_column: &str,
    labels: [&str; 2],
    file: &str,
    source: impl Fn(&PartialMetric) -> f64,
    existing: impl Fn(&PartialMetric) -> Option<&str>,
) -> Result<Vec<String>, LoadError> {
    if present {
        log::warn!("Using pre-computed '{segment_column}' column from {file} without validation");
        return partial
            .iter()
            .enumerate()
            .map(|(idx, p)| match existing(p) {
                Some(label) if !label.is_empty() => Ok(label.to_string()),
                _ => Err(LoadError::Parse {
                    file: file.to_string(),
                    row: idx + 1,
                    message: format!("empty '{segment_column}' value"),
                }),
            })
            .collect();
    }

    let values: Vec<f64> = partial.iter().map(source).collect();
    let labels = median_split(source_column, &values, labels)?;
    log::debug!("Derived '{segment_column}' from '{source_column}' for {} rows", values.len());
    Ok(labels.into_iter().map(str::to_string).collect())
}

// ---------------------------------------------------------------------------
// fear_greed_index.csv
// ---------------------------------------------------------------------------

/// Reads `date`, `value` and `classification` when their headers exist.
/// Other columns are ignored; unparseable cells become `None`.
pub(crate) fn load_fear_greed(path: &Path) -> Result<SentimentIndex, LoadError> {
    let file = display_name(path);
    let csv_err = |source: csv::Error| LoadError::Csv {
        file: file.clone(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();

    let date_idx = column_index(&headers, "date");
    let value_idx = column_index(&headers, "value");
    let class_idx = column_index(&headers, "classification");

    let mut entries = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).filter(|s| !s.is_empty());

        entries.push(FearGreedEntry {
            date: cell(date_idx).and_then(parse_date),
            value: cell(value_idx).and_then(|s| s.parse::<f64>().ok()),
            classification: cell(class_idx).map(str::to_string),
        });
    }

    Ok(SentimentIndex { entries })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Normalise a date cell to a calendar date. Accepts a plain `YYYY-MM-DD`
/// or a timestamp whose date part is kept.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

fn has_column(headers: &StringRecord, name: &str) -> bool {
    column_index(headers, name).is_some()
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const METRICS_HEADER: &str =
        "account,date,num_trades,avg_position,win_rate,total_pnl,classification";

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn ten_row_metrics() -> String {
        let mut body = format!("{METRICS_HEADER}\n");
        for i in 1..=10 {
            let sentiment = if i % 2 == 1 { "Fear" } else { "Greed" };
            body.push_str(&format!(
                "0xabc{i},2021-01-{i:02},{i},{},0.5,{}.5,{sentiment}\n",
                i * 100,
                i * 10
            ));
        }
        body
    }

    #[test]
    fn loads_both_files_and_derives_segments() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), DAILY_METRICS_FILE, &ten_row_metrics());
        write(
            dir.path(),
            FEAR_GREED_FILE,
            "timestamp,value,classification,date\n1517463000,30,Fear,2018-02-01\n1517549400,15,Extreme Fear,2018-02-02\n",
        );

        let ds = load_dataset(dir.path()).unwrap();
        assert_eq!(ds.metrics.len(), 10);
        assert_eq!(ds.sentiment_index.len(), 2);
        assert_eq!(ds.source_dir, dir.path());

        let frequent = ds
            .metrics
            .rows
            .iter()
            .filter(|r| r.frequency_segment == "Frequent")
            .count();
        assert_eq!(frequent, 5);
        assert_eq!(ds.metrics.rows[0].frequency_segment, "Infrequent");
        assert_eq!(ds.metrics.rows[9].leverage_segment, "High Leverage");
    }

    #[test]
    fn missing_fear_greed_file_is_reported_without_a_table() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), DAILY_METRICS_FILE, &ten_row_metrics());

        let err = load_dataset(dir.path()).unwrap_err();
        assert!(err.is_missing_file());
        match err {
            LoadError::MissingFile { path } => assert!(path.ends_with(FEAR_GREED_FILE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn existing_segment_columns_are_kept_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DAILY_METRICS_FILE);
        write(
            dir.path(),
            DAILY_METRICS_FILE,
            &format!(
                "{METRICS_HEADER},leverage_segment\n\
                 a,2021-01-01,1,10,0.1,1,Fear,Custom\n\
                 b,2021-01-02,2,20,0.2,2,Greed,Other\n"
            ),
        );

        let table = load_daily_metrics(&path).unwrap();
        assert_eq!(table.rows[0].leverage_segment, "Custom");
        assert_eq!(table.rows[1].leverage_segment, "Other");
        // frequency still derived
        assert_eq!(table.rows[0].frequency_segment, "Infrequent");
        assert_eq!(table.rows[1].frequency_segment, "Frequent");
    }

    #[test]
    fn degenerate_source_column_is_a_segment_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DAILY_METRICS_FILE);
        write(
            dir.path(),
            DAILY_METRICS_FILE,
            &format!(
                "{METRICS_HEADER}\n\
                 a,2021-01-01,3,10,0.1,1,Fear\n\
                 b,2021-01-02,3,20,0.2,2,Greed\n"
            ),
        );

        let err = load_daily_metrics(&path).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Segment(SegmentError::TooFewDistinct { .. })
        ));
    }

    #[test]
    fn empty_classification_becomes_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DAILY_METRICS_FILE);
        write(
            dir.path(),
            DAILY_METRICS_FILE,
            &format!(
                "{METRICS_HEADER}\n\
                 a,2021-01-01,1,10,0.1,1,\n\
                 b,2021-01-02 00:00:00,2,20,0.2,2,Greed\n"
            ),
        );

        let table = load_daily_metrics(&path).unwrap();
        assert_eq!(table.rows[0].classification, None);
        assert_eq!(table.rows[1].date, NaiveDate::from_ymd_opt(2021, 1, 2).unwrap());
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DAILY_METRICS_FILE);

        write(
            dir.path(),
            DAILY_METRICS_FILE,
            &format!("{METRICS_HEADER}\na,not-a-date,1,10,0.1,1,Fear\n"),
        );
        let err = load_daily_metrics(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { row: 1, .. }));

        write(
            dir.path(),
            DAILY_METRICS_FILE,
            &format!("{METRICS_HEADER}\na,2021-01-01,abc,10,0.1,1,Fear\n"),
        );
        let err = load_daily_metrics(&path).unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));

        write(
            dir.path(),
            DAILY_METRICS_FILE,
            &format!("{METRICS_HEADER}\na,2021-01-01,1.5,10,0.1,1,Fear\n"),
        );
        let err = load_daily_metrics(&path).unwrap_err();
        assert!(err.to_string().contains("num_trades"));
    }

    #[test]
    fn missing_required_column_is_named() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DAILY_METRICS_FILE);
        write(
            dir.path(),
            DAILY_METRICS_FILE,
            "account,date,num_trades,avg_position,total_pnl,classification\n",
        );

        let err = load_daily_metrics(&path).unwrap_err();
        match err {
            LoadError::MissingColumn { column, .. } => assert_eq!(column, "win_rate"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fear_greed_tolerates_missing_headers_and_bad_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FEAR_GREED_FILE);
        write(dir.path(), FEAR_GREED_FILE, "date,value\n2018-02-01,n/a\n,42\n");

        let index = load_fear_greed(&path).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.entries[0].value, None);
        assert_eq!(index.entries[0].classification, None);
        assert_eq!(index.entries[1].date, None);
        assert_eq!(index.entries[1].value, Some(42.0));
    }

    #[test]
    fn parse_date_accepts_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date("2024-03-09"), expected);
        assert_eq!(parse_date("2024-03-09 13:45:00"), expected);
        assert_eq!(parse_date("2024-03-09T13:45:00"), expected);
        assert_eq!(parse_date("09/03/2024"), None);
    }
}
