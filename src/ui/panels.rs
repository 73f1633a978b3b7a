use eframe::egui::{self, Color32, ProgressBar, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::loader::{DAILY_METRICS_FILE, FEAR_GREED_FILE};
use crate::data::model::sentiment_label;
use crate::state::{AppState, ChartSection, FilterColumn, SegmentColumn};

// ---------------------------------------------------------------------------
// Left side panel – dashboard controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("🎛 Dashboard Controls");
    ui.label(RichText::new("Customize your analysis").small().weak());
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            quick_actions(ui, state);
            ui.separator();
            chart_selection(ui, state);
            ui.separator();

            if state.dataset.is_none() {
                ui.label("No dataset loaded.");
                return;
            }
            egui::CollapsingHeader::new(RichText::new("🔍 Advanced Filters").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    filter_widgets(ui, state);
                });
        });
}

fn quick_actions(ui: &mut Ui, state: &mut AppState) {
    ui.strong("⚡ Quick Actions");
    ui.horizontal(|ui: &mut Ui| {
        if ui
            .button("📊 Show All")
            .on_hover_text("Display all available charts")
            .clicked()
        {
            state.show_all_sections();
        }
        if ui
            .button("🔄 Reset")
            .on_hover_text("Clear all selections")
            .clicked()
        {
            state.reset_sections();
        }
    });
}

fn chart_selection(ui: &mut Ui, state: &mut AppState) {
    ui.strong("📈 Select Charts");
    egui::Grid::new("chart_grid")
        .num_columns(2)
        .show(ui, |ui: &mut Ui| {
            for (i, section) in ChartSection::ALL.into_iter().enumerate() {
                let mut checked = state.sections.contains(&section);
                if ui
                    .checkbox(&mut checked, section.label())
                    .on_hover_text(section.description())
                    .changed()
                {
                    state.toggle_section(section);
                }
                if i % 2 == 1 {
                    ui.end_row();
                }
            }
        });

    let n = state.sections.len();
    if n > 0 {
        let total = ChartSection::ALL.len();
        ui.add(ProgressBar::new(n as f32 / total as f32));
        ui.label(
            RichText::new(format!("{n} of {total} charts selected"))
                .small()
                .weak(),
        );
    }
}

fn filter_widgets(ui: &mut Ui, state: &mut AppState) {
    // Clone the handles so the state can be mutated inside the widgets.
    let (Some(dataset), Some(criteria)) = (state.dataset.clone(), state.criteria.clone()) else {
        return;
    };
    let metrics = &dataset.metrics;

    // ---- Date range ----
    ui.strong("📅 Date Range");
    let (mut start, mut end) = (criteria.start, criteria.end);
    let mut dates_changed = false;
    egui::Grid::new("date_range").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("From");
        dates_changed |= ui
            .add(DatePickerButton::new(&mut start).id_salt("date_from"))
            .changed();
        ui.end_row();
        ui.label("To");
        dates_changed |= ui
            .add(DatePickerButton::new(&mut end).id_salt("date_to"))
            .changed();
        ui.end_row();
    });
    if dates_changed {
        state.set_date_range(start, end);
    }
    ui.add_space(6.0);

    // ---- Market sentiment ----
    let header = format!(
        "🎭 Market Sentiment  ({}/{})",
        criteria.sentiments.len(),
        metrics.sentiments.len()
    );
    multi_select(ui, state, &header, FilterColumn::Sentiment, |ui, state| {
        for value in &metrics.sentiments {
            let label = sentiment_label(value);
            let mut checked = criteria.sentiments.contains(value);
            let text = RichText::new(label).color(state.sentiment_colors.color_for(label));
            if ui.checkbox(&mut checked, text).changed() {
                state.toggle_sentiment(value);
            }
        }
    });

    // ---- Trader segments ----
    let segment_filters = [
        (
            SegmentColumn::Leverage,
            "⚖ Leverage",
            &metrics.leverage_segments,
            &criteria.leverage,
        ),
        (
            SegmentColumn::Frequency,
            "⏱ Frequency",
            &metrics.frequency_segments,
            &criteria.frequency,
        ),
    ];
    for (column, title, all, selected) in segment_filters {
        let header = format!("{title}  ({}/{})", selected.len(), all.len());
        multi_select(ui, state, &header, column.into(), |ui, state| {
            for value in all {
                let mut checked = selected.contains(value);
                if ui.checkbox(&mut checked, value.as_str()).changed() {
                    state.toggle_segment(column, value);
                }
            }
        });
    }

    ui.add_space(6.0);
    if ui.button("Clear filters").clicked() {
        state.clear_filters();
    }
}

/// Collapsible multi-select with All / None buttons.
fn multi_select(
    ui: &mut Ui,
    state: &mut AppState,
    header: &str,
    column: FilterColumn,
    body: impl FnOnce(&mut Ui, &mut AppState),
) {
    egui::CollapsingHeader::new(RichText::new(header).strong())
        .id_salt(column_id(column))
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all(column);
                }
                if ui.small_button("None").clicked() {
                    state.select_none(column);
                }
            });
            body(ui, state);
        });
}

fn column_id(column: FilterColumn) -> &'static str {
    match column {
        FilterColumn::Sentiment => "filter_sentiment",
        FilterColumn::Leverage => "filter_leverage",
        FilterColumn::Frequency => "filter_frequency",
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open data folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
            let can_export = state.dataset.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export filtered rows…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} rows loaded, {} visible",
                ds.metrics.len(),
                state.visible_indices.len()
            ));
            ui.separator();
            ui.label(RichText::new(ds.source_dir.display().to_string()).weak());
        }

        if let Some(msg) = &state.status_message {
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                Color32::GRAY
            };
            ui.separator();
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_folder_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title(format!("Folder containing {DAILY_METRICS_FILE} and {FEAR_GREED_FILE}"))
        .set_directory(&state.config.data_dir)
        .pick_folder();

    if let Some(dir) = folder {
        state.load_dir(&dir);
    }
}

pub fn export_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export filtered rows")
        .set_file_name("filtered_metrics.csv")
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .save_file();

    if let Some(path) = file {
        state.export_visible(&path);
    }
}
