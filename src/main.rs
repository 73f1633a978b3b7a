mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::TraderInsightsApp;
use clap::Parser;
use config::{Cli, DashboardConfig};
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = DashboardConfig::from(Cli::parse());
    log::info!("Reading input data from {}", config.data_dir.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Trader Insights – Sentiment Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(TraderInsightsApp::new(config)))),
    )
}
