use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::model::DailyMetric;

/// Output formats offered by the export dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Parquet,
}

impl ExportFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "parquet" | "pq" => Ok(ExportFormat::Parquet),
            other => bail!("Unsupported export extension: .{other}"),
        }
    }
}

/// Write the given rows to `path`, format chosen by extension.
pub fn export_rows(rows: &[&DailyMetric], path: &Path) -> Result<()> {
    match ExportFormat::from_path(path)? {
        ExportFormat::Csv => write_csv(rows, path),
        ExportFormat::Json => write_json(rows, path),
        ExportFormat::Parquet => write_parquet(rows, path),
    }
    .with_context(|| format!("exporting {} rows to {}", rows.len(), path.display()))?;

    log::info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV / JSON
// ---------------------------------------------------------------------------

/// Same column layout as `daily_metrics.csv`, segment columns included, so
/// an export can be loaded again as input.
fn write_csv(rows: &[&DailyMetric], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    for row in rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

/// Records-oriented JSON array.
fn write_json(rows: &[&DailyMetric], path: &Path) -> Result<()> {
    let file = File::create(path).context("creating JSON file")?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, rows).context("writing JSON")?;
    out.flush().context("flushing JSON file")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

fn metrics_schema() -> Schema {
    Schema::new(vec![
        Field::new("account", DataType::Utf8, false),
        Field::new("date", DataType::Date32, false),
        Field::new("num_trades", DataType::UInt64, false),
        Field::new("avg_position", DataType::Float64, false),
        Field::new("win_rate", DataType::Float64, false),
        Field::new("total_pnl", DataType::Float64, false),
        Field::new("classification", DataType::Utf8, true),
        Field::new("leverage_segment", DataType::Utf8, false),
        Field::new("frequency_segment", DataType::Utf8, false),
    ])
}

fn write_parquet(rows: &[&DailyMetric], path: &Path) -> Result<()> {
    let schema = Arc::new(metrics_schema());

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.account.as_str()))),
        Arc::new(Date32Array::from_iter_values(rows.iter().map(|r| r.date.to_epoch_days()))),
        Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.num_trades))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.avg_position))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.win_rate))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.total_pnl))),
        Arc::new(StringArray::from(
            rows.iter()
                .map(|r| r.classification.as_deref())
                .collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.leverage_segment.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.frequency_segment.as_str()),
        )),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    use super::*;
    use crate::data::loader::load_daily_metrics;
    use crate::data::model::tests::{date, metric};

    fn rows() -> Vec<DailyMetric> {
        let mut a = metric("0xaaa", date(2024, 2, 1), Some("Greed"));
        a.leverage_segment = "High Leverage".to_string();
        let b = metric("0xbbb", date(2024, 2, 2), None);
        vec![a, b]
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("a.CSV")).unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("a.json")).unwrap(), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("a.pq")).unwrap(), ExportFormat::Parquet);
        assert!(ExportFormat::from_path(Path::new("a.xlsx")).is_err());
        assert!(ExportFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn csv_export_loads_back_as_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily_metrics.csv");
        let rows = rows();
        let refs: Vec<&DailyMetric> = rows.iter().collect();

        export_rows(&refs, &path).unwrap();
        let table = load_daily_metrics(&path).unwrap();

        assert_eq!(table.rows, rows);
    }

    #[test]
    fn json_export_is_a_records_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let rows = rows();
        let refs: Vec<&DailyMetric> = rows.iter().collect();

        export_rows(&refs, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        let records = value.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["date"], "2024-02-01");
        assert!(records[1]["classification"].is_null());
    }

    #[test]
    fn parquet_export_keeps_rows_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        let rows = rows();
        let refs: Vec<&DailyMetric> = rows.iter().collect();

        export_rows(&refs, &path).unwrap();

        let file = File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        let total: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(total, 2);

        let class = batches[0].column(6);
        assert!(!class.is_null(0));
        assert!(class.is_null(1));
    }

    #[test]
    fn parquet_dates_are_days_since_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.parquet");
        let row = metric("0xccc", date(1970, 1, 31), Some("Fear"));

        export_rows(&[&row], &path).unwrap();

        let file = File::open(&path).unwrap();
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batch = reader.next().unwrap().unwrap();
        let dates = batch
            .column(1)
            .as_any()
            .downcast_ref::<Date32Array>()
            .unwrap();
        assert_eq!(dates.value(0), 30);
    }
}
