use std::path::PathBuf;

use clap::Parser;

/// Rows shown by the data preview section.
pub const DEFAULT_PREVIEW_ROWS: usize = 20;

/// Trader behaviour vs. market sentiment dashboard
#[derive(Parser, Debug)]
#[command(name = "trader-insights")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding daily_metrics.csv and fear_greed_index.csv
    #[arg(default_value = ".")]
    pub data_dir: PathBuf,

    /// Rows shown in the data preview table
    #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
    pub preview_rows: usize,
}

/// Startup settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Directory holding `daily_metrics.csv` and `fear_greed_index.csv`.
    pub data_dir: PathBuf,
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl From<Cli> for DashboardConfig {
    fn from(cli: Cli) -> Self {
        Self {
            data_dir: cli.data_dir,
            preview_rows: cli.preview_rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<DashboardConfig, clap::Error> {
        Cli::try_parse_from(args).map(DashboardConfig::from)
    }

    #[test]
    fn defaults_to_working_directory() {
        let config = parse(&["trader-insights"]).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.preview_rows, 20);
    }

    #[test]
    fn positional_argument_is_data_dir() {
        let config = parse(&["trader-insights", "/tmp/run42", "--preview-rows", "5"]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/run42"));
        assert_eq!(config.preview_rows, 5);
    }

    #[test]
    fn flags_are_not_taken_as_directories() {
        assert!(parse(&["trader-insights", "--bogus"]).is_err());
        assert!(parse(&["trader-insights", "/a", "/b"]).is_err());

        let help = parse(&["trader-insights", "--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
