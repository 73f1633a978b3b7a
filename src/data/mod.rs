/// Data layer: core types, loading, segmentation, filtering and aggregation.
///
/// Architecture:
/// ```text
///  daily_metrics.csv   fear_greed_index.csv
///        │                    │
///        ▼                    ▼
///   ┌──────────────────────────────┐
///   │ loader   parse, derive segments│──► segment (median split)
///   └──────────────────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset  │  Arc-shared, immutable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐      ┌───────────┐
///   │  filter   │ ──► │ aggregate │  per-chart statistics
///   └──────────┘      └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  csv / json / parquet
///   └──────────┘
/// ```

pub mod aggregate;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod segment;
