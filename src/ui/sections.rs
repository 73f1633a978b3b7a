use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::aggregate::Report;
use crate::data::model::sentiment_label;
use crate::state::{AppState, ChartSection, TrendTab};
use crate::ui::format::{money, percent, thousands};
use crate::ui::plot;

const ACCENT: Color32 = Color32::from_rgb(0x63, 0x66, 0xf1);

/// Columns of the data preview table.
const PREVIEW_COLUMNS: [&str; 9] = [
    "account",
    "date",
    "num_trades",
    "avg_position",
    "win_rate",
    "total_pnl",
    "classification",
    "leverage_segment",
    "frequency_segment",
];

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Shown instead of the dashboard when loading failed.
pub fn load_failure(ui: &mut Ui, message: &str) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.add_space(40.0);
        ui.heading("⚠ Data Not Available");
        ui.add_space(8.0);
        ui.label(RichText::new(message).color(Color32::RED));
        ui.add_space(8.0);
        ui.label("Generate daily_metrics.csv and fear_greed_index.csv, then use File → Open data folder…");
    });
}

/// Render the whole dashboard body.
pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    welcome(ui);
    headline_metrics(ui, state);
    ui.add_space(12.0);

    if state.sections.is_empty() {
        empty_state(ui);
        footer(ui);
        return;
    }

    selected_list(ui, state);

    for section in ChartSection::ALL {
        if !state.sections.contains(&section) {
            continue;
        }
        section_header(ui, section);
        if section_has_data(&state.report, section) {
            render_section(ui, state, section);
        } else {
            plot::no_data(ui);
        }
        ui.add_space(16.0);
    }

    ui.separator();
    analysis_summary(ui, state);
    footer(ui);
}

fn welcome(ui: &mut Ui) {
    egui::Frame::group(ui.style())
        .fill(ACCENT)
        .show(ui, |ui: &mut Ui| {
            ui.set_min_width(ui.available_width());
            ui.vertical_centered(|ui: &mut Ui| {
                ui.label(
                    RichText::new("📊 Trader Behaviour Dashboard")
                        .size(28.0)
                        .strong()
                        .color(Color32::WHITE),
                );
                ui.label(
                    RichText::new(
                        "Analyze trading behavior and performance across different market sentiments",
                    )
                    .color(Color32::WHITE),
                );
                ui.label(
                    RichText::new("Select charts from the sidebar to explore insights and trends")
                        .small()
                        .color(Color32::from_white_alpha(200)),
                );
            });
        });
    ui.add_space(12.0);
}

fn stat_card(ui: &mut Ui, value: &str, label: &str) {
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.set_min_width(ui.available_width());
        ui.label(RichText::new(value).size(24.0).strong().color(ACCENT));
        ui.label(RichText::new(label.to_uppercase()).small().weak());
    });
}

/// Cards over the full, unfiltered table.
fn headline_metrics(ui: &mut Ui, state: &AppState) {
    let Some(ov) = &state.overview else {
        return;
    };
    let cards = [
        (thousands(ov.traders as u64), "Total Traders"),
        (thousands(ov.trading_days as u64), "Trading Days"),
        (
            ov.avg_win_rate.map(percent).unwrap_or_else(|| "–".into()),
            "Avg Win Rate",
        ),
        (money(ov.total_pnl), "Total PnL"),
    ];
    ui.columns(cards.len(), |cols| {
        for (col, (value, label)) in cols.iter_mut().zip(cards.iter()) {
            stat_card(col, value, label);
        }
    });
}

fn empty_state(ui: &mut Ui) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.add_space(30.0);
        ui.label(RichText::new("📊").size(40.0));
        ui.heading("Ready to Explore!");
        ui.label("Choose charts from the sidebar to start analyzing your trading data.");
        ui.label(
            RichText::new("Pro tip: start with \"📊 Overview\" to get a quick summary of your trading performance.")
                .small()
                .weak(),
        );
    });
}

fn selected_list(ui: &mut Ui, state: &AppState) {
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.set_min_width(ui.available_width());
        ui.strong(format!("📊 Selected Charts ({})", state.sections.len()));
        for section in &state.sections {
            ui.label(format!("• {}", section.label()));
        }
    });

    egui::CollapsingHeader::new("💡 How to use this dashboard")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.label("• Use the sidebar to select which charts you want to see");
            ui.label("• Apply filters to focus on specific time periods or trader segments");
            ui.label("• Hover over chart elements for detailed information");
            ui.label("• Use the \"Show All\" button to see everything at once");
            ui.label("• Expand \"Advanced Filters\" for more control over your analysis");
        });
    ui.add_space(8.0);
}

fn section_title(section: ChartSection) -> &'static str {
    match section {
        ChartSection::Overview => "Performance Overview",
        ChartSection::Sentiment => "Market Sentiment Analysis",
        ChartSection::Performance => "Performance Analysis",
        ChartSection::WinRates => "Win Rate Analysis",
        ChartSection::Leverage => "Leverage Analysis",
        ChartSection::Frequency => "Trading Frequency Analysis",
        ChartSection::Trends => "Time-Based Trends",
        ChartSection::Data => "Data Explorer",
    }
}

fn section_header(ui: &mut Ui, section: ChartSection) {
    // label() starts with the section's icon
    let icon = section.label().split_whitespace().next().unwrap_or_default();
    ui.horizontal(|ui: &mut Ui| {
        ui.label(RichText::new(icon).size(20.0));
        ui.label(RichText::new(section_title(section)).size(20.0).strong());
    });
    ui.separator();
}

/// Per-sentiment charts drop unclassified rows, so they can be empty even
/// when some rows passed the filters.
fn section_has_data(report: &Report, section: ChartSection) -> bool {
    if report.is_empty() {
        return false;
    }
    match section {
        ChartSection::Sentiment => !report.sentiment_counts.is_empty(),
        ChartSection::Performance => !report.pnl_boxes.is_empty(),
        ChartSection::WinRates => !report.win_rates.is_empty(),
        ChartSection::Leverage => !report.leverage.is_empty(),
        ChartSection::Frequency => !report.frequency.is_empty(),
        ChartSection::Overview | ChartSection::Trends | ChartSection::Data => true,
    }
}

fn render_section(ui: &mut Ui, state: &mut AppState, section: ChartSection) {
    let report = &state.report;
    let colors = &state.sentiment_colors;
    match section {
        ChartSection::Overview => filtered_cards(ui, report),
        ChartSection::Sentiment => plot::sentiment_pie(ui, &report.sentiment_counts, colors),
        ChartSection::Performance => plot::pnl_box_plot(ui, &report.pnl_boxes, colors),
        ChartSection::WinRates => plot::win_rate_bars(ui, &report.win_rates, colors),
        ChartSection::Leverage => plot::leverage_bars(ui, &report.leverage),
        ChartSection::Frequency => {
            plot::frequency_scatter(ui, &report.frequency, colors);
            egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
                ui.label(
                    "💡 Key insights: high leverage traders excel in Greed periods but struggle in Fear. \
                     Low leverage traders show more consistent performance. Frequent traders generate \
                     higher volume but variable profitability.",
                );
            });
        }
        ChartSection::Trends => trends(ui, state),
        ChartSection::Data => preview_table(ui, report),
    }
}

fn filtered_cards(ui: &mut Ui, report: &Report) {
    let Some(ov) = &report.filtered else {
        plot::no_data(ui);
        return;
    };
    let cards = [
        (thousands(ov.rows as u64), "Trading Days"),
        (money(ov.avg_pnl), "Avg Daily PnL"),
        (percent(ov.avg_win_rate), "Win Rate"),
        (thousands(ov.total_trades), "Total Trades"),
    ];
    ui.columns(cards.len(), |cols| {
        for (col, (value, label)) in cols.iter_mut().zip(cards.iter()) {
            stat_card(col, value, label);
        }
    });
}

fn trends(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.selectable_value(&mut state.trend_tab, TrendTab::Pnl, "📈 PnL Trends");
        ui.selectable_value(&mut state.trend_tab, TrendTab::WinRate, "🏆 Win Rate Trends");
        ui.selectable_value(&mut state.trend_tab, TrendTab::Volume, "📊 Volume Trends");
    });

    let trends = &state.report.trends;
    match state.trend_tab {
        TrendTab::Pnl => plot::trend_line(
            ui,
            "trend_pnl",
            "Average Daily PnL Over Time",
            trends,
            |t| t.mean_pnl,
            Color32::from_rgb(0x1f, 0x77, 0xb4),
        ),
        TrendTab::WinRate => plot::trend_line(
            ui,
            "trend_win_rate",
            "Win Rate Trend Over Time",
            trends,
            |t| t.mean_win_rate,
            Color32::from_rgb(0xff, 0x7f, 0x0e),
        ),
        TrendTab::Volume => {
            plot::volume_bars(ui, trends, Color32::from_rgb(0x2c, 0xa0, 0x2c))
        }
    }
}

fn preview_table(ui: &mut Ui, report: &Report) {
    ui.push_id("preview_table", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .vscroll(false)
            .columns(Column::auto().at_least(70.0), PREVIEW_COLUMNS.len())
            .header(20.0, |mut header| {
                for name in PREVIEW_COLUMNS {
                    header.col(|ui: &mut Ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|mut body| {
                for row in &report.preview {
                    let cells = [
                        row.account.clone(),
                        row.date.to_string(),
                        row.num_trades.to_string(),
                        format!("{:.2}", row.avg_position),
                        format!("{:.4}", row.win_rate),
                        format!("{:.2}", row.total_pnl),
                        sentiment_label(&row.classification).to_string(),
                        row.leverage_segment.clone(),
                        row.frequency_segment.clone(),
                    ];
                    body.row(18.0, |mut table_row| {
                        for cell in &cells {
                            table_row.col(|ui: &mut Ui| {
                                ui.label(cell);
                            });
                        }
                    });
                }
            });
    });
    ui.label(
        RichText::new(format!(
            "Showing first {} rows of {} total records",
            report.preview.len(),
            thousands(report.total_rows as u64)
        ))
        .strong(),
    );
}

fn analysis_summary(ui: &mut Ui, state: &AppState) {
    ui.heading("📋 Analysis Summary");
    let Some(criteria) = &state.criteria else {
        return;
    };

    ui.columns(2, |cols| {
        cols[0].strong("Data Overview:");
        egui::Frame::group(cols[0].style()).show(&mut cols[0], |ui: &mut Ui| {
            ui.set_min_width(ui.available_width());
            ui.label(format!(
                "• Time Period: {} to {}",
                criteria.start.format("%Y-%m-%d"),
                criteria.end.format("%Y-%m-%d")
            ));
            ui.label(format!(
                "• Filtered Records: {}",
                thousands(state.report.total_rows as u64)
            ));
            let sentiments: Vec<&str> = criteria.sentiments.iter().map(sentiment_label).collect();
            ui.label(format!("• Selected Sentiments: {}", sentiments.join(", ")));
            ui.label(format!(
                "• Trader Segments: {} leverage × {} frequency types",
                criteria.leverage.len(),
                criteria.frequency.len()
            ));
            if let Some(ds) = &state.dataset {
                let index = &ds.sentiment_index;
                let span = index
                    .date_span()
                    .map(|(a, b)| format!(" spanning {a} to {b}"))
                    .unwrap_or_default();
                ui.label(format!("• Fear & Greed Index: {} entries{span}", index.len()));
            }
        });

        cols[1].strong("Key Insights:");
        if state.report.is_empty() {
            cols[1].label(
                RichText::new("No data matches your current filters. Try adjusting the criteria.")
                    .color(Color32::from_rgb(0xf5, 0x9e, 0x0b)),
            );
        } else {
            let insights = &state.report.insights;
            let n_sections = state.sections.len();
            egui::Frame::group(cols[1].style()).show(&mut cols[1], |ui: &mut Ui| {
                ui.set_min_width(ui.available_width());
                ui.label(format!(
                    "• Best Performing Sentiment: {}",
                    insights.best_sentiment.as_deref().unwrap_or("–")
                ));
                ui.label(format!(
                    "• Most Consistent Segment: {} traders",
                    insights.best_leverage.as_deref().unwrap_or("–")
                ));
                ui.label(format!(
                    "• Analysis Complete: {n_sections} visualizations generated"
                ));
            });
        }
    });
}

fn footer(ui: &mut Ui) {
    ui.add_space(24.0);
    ui.separator();
    ui.vertical_centered(|ui: &mut Ui| {
        ui.label(RichText::new("📊 Trader Behaviour Dashboard | Built with egui").strong());
        ui.label(
            RichText::new("Analyze trading behavior and optimize performance across market conditions")
                .small()
                .weak(),
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{date, metric};
    use crate::data::model::DailyMetric;

    #[test]
    fn every_section_has_a_title_and_icon() {
        for section in ChartSection::ALL {
            assert!(!section_title(section).is_empty());
            assert!(section.label().split_whitespace().count() >= 2);
        }
    }

    #[test]
    fn unclassified_only_rows_leave_sentiment_charts_empty() {
        let rows = vec![
            metric("a", date(2021, 1, 1), None),
            metric("b", date(2021, 1, 2), None),
        ];
        let refs: Vec<&DailyMetric> = rows.iter().collect();
        let report = Report::build(&refs, 20);
        assert!(!report.is_empty());

        for section in [
            ChartSection::Sentiment,
            ChartSection::Performance,
            ChartSection::WinRates,
            ChartSection::Leverage,
            ChartSection::Frequency,
        ] {
            assert!(!section_has_data(&report, section), "{section:?}");
        }
        for section in [ChartSection::Overview, ChartSection::Trends, ChartSection::Data] {
            assert!(section_has_data(&report, section), "{section:?}");
        }
    }

    #[test]
    fn empty_report_has_no_sections() {
        let report = Report::build(&[], 20);
        for section in ChartSection::ALL {
            assert!(!section_has_data(&report, section));
        }
    }
}
