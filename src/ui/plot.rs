use std::collections::BTreeSet;
use std::f64::consts::{FRAC_PI_2, TAU};
use std::ops::RangeInclusive;

use chrono::NaiveDate;
use eframe::egui::{self, Color32, RichText, Sense, Shape, Stroke, Ui, Vec2};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, Legend, Line, MarkerShape, Plot,
    PlotPoints, Points,
};

use crate::color::ColorMap;
use crate::data::aggregate::{BoxStats, DailyTrend, SegmentBreakdown};

const PLOT_HEIGHT: f32 = 280.0;

/// Bar colours for the two leverage segments, lower segment first.
const LEVERAGE_COLORS: [Color32; 2] = [
    Color32::from_rgb(0x48, 0xbb, 0x78),
    Color32::from_rgb(0xf5, 0x65, 0x65),
];

// ---------------------------------------------------------------------------
// Axis helpers
// ---------------------------------------------------------------------------

/// Calendar dates are plotted as days since 1970-01-01.
pub fn date_to_x(date: NaiveDate) -> f64 {
    f64::from(date.to_epoch_days())
}

pub fn x_to_date(x: f64) -> Option<NaiveDate> {
    if !x.is_finite() || x.abs() > 1.0e7 {
        return None;
    }
    NaiveDate::from_epoch_days(x.round() as i32)
}

/// Axis labels for categories plotted at x = 0, 1, 2, …
fn category_axis(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let v = mark.value;
        if v < -0.01 || (v - v.round()).abs() > 1.0e-6 {
            return String::new();
        }
        labels.get(v.round() as usize).cloned().unwrap_or_default()
    }
}

fn date_axis(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    x_to_date(mark.value)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn base_plot(id: &str) -> Plot {
    Plot::new(id)
        .height(PLOT_HEIGHT)
        .legend(Legend::default())
        .allow_scroll(false)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_zoom(true)
}

fn chart_title(ui: &mut Ui, title: &str) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.label(RichText::new(title).strong().color(Color32::LIGHT_BLUE));
    });
}

// ---------------------------------------------------------------------------
// Pie (donut) chart
// ---------------------------------------------------------------------------

/// One wedge of the sentiment donut. Angles in radians, clockwise from the
/// top in screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub count: usize,
    pub fraction: f64,
    pub start: f64,
    pub end: f64,
}

pub fn pie_slices(counts: &[(String, usize)]) -> Vec<PieSlice> {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    if total == 0 {
        return Vec::new();
    }
    let mut angle = -FRAC_PI_2;
    counts
        .iter()
        .map(|(label, n)| {
            let fraction = *n as f64 / total as f64;
            let start = angle;
            angle += fraction * TAU;
            PieSlice {
                label: label.clone(),
                count: *n,
                fraction,
                start,
                end: angle,
            }
        })
        .collect()
}

/// Value counts of sentiment as a donut with a legend.
pub fn sentiment_pie(ui: &mut Ui, counts: &[(String, usize)], colors: &ColorMap) {
    chart_title(ui, "Market Sentiment Distribution");
    let slices = pie_slices(counts);

    ui.horizontal(|ui: &mut Ui| {
        let size = Vec2::splat(PLOT_HEIGHT);
        let (rect, response) = ui.allocate_exact_size(size, Sense::hover());
        let painter = ui.painter_at(rect);
        let center = rect.center();
        let outer = rect.height() * 0.45;
        let inner = outer * 0.4;

        for slice in &slices {
            let color = colors.color_for(&slice.label);
            // thin convex quads approximate the ring segment
            let steps = ((slice.end - slice.start) / (TAU / 180.0)).ceil().max(1.0) as usize;
            let step = (slice.end - slice.start) / steps as f64;
            for k in 0..steps {
                let a0 = (slice.start + step * k as f64) as f32;
                let a1 = (slice.start + step * (k + 1) as f64) as f32;
                let quad = vec![
                    center + inner * Vec2::angled(a0),
                    center + outer * Vec2::angled(a0),
                    center + outer * Vec2::angled(a1),
                    center + inner * Vec2::angled(a1),
                ];
                painter.add(Shape::convex_polygon(quad, color, Stroke::NONE));
            }
        }

        if let Some(pos) = response.hover_pos() {
            let offset = pos - center;
            let r = offset.length();
            if r >= inner && r <= outer {
                let mut angle = f64::from(offset.y.atan2(offset.x));
                if angle < -FRAC_PI_2 {
                    angle += TAU;
                }
                if let Some(s) = slices.iter().find(|s| angle >= s.start && angle < s.end) {
                    response.on_hover_text(format!(
                        "{}: {} ({:.1}%)",
                        s.label,
                        s.count,
                        s.fraction * 100.0
                    ));
                }
            }
        }

        ui.vertical(|ui: &mut Ui| {
            for s in &slices {
                ui.horizontal(|ui: &mut Ui| {
                    let (swatch, _) = ui.allocate_exact_size(Vec2::splat(12.0), Sense::hover());
                    ui.painter().rect_filled(swatch, 2.0, colors.color_for(&s.label));
                    ui.label(format!("{}  {:.1}%", s.label, s.fraction * 100.0));
                });
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Box plot
// ---------------------------------------------------------------------------

/// PnL distribution per sentiment.
pub fn pnl_box_plot(ui: &mut Ui, boxes: &[BoxStats], colors: &ColorMap) {
    chart_title(ui, "PnL Distribution by Market Sentiment");
    let labels: Vec<String> = boxes.iter().map(|b| b.sentiment.clone()).collect();

    base_plot("pnl_box_plot")
        .x_axis_label("classification")
        .y_axis_label("total_pnl")
        .x_axis_formatter(category_axis(labels))
        .show(ui, |plot_ui| {
            for (i, b) in boxes.iter().enumerate() {
                let x = i as f64;
                let color = colors.color_for(&b.sentiment);
                let spread =
                    BoxSpread::new(b.lower_whisker, b.q1, b.median, b.q3, b.upper_whisker);
                let elem = BoxElem::new(x, spread)
                    .name(format!("{} (n={})", b.sentiment, b.count))
                    .box_width(0.5);
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&b.sentiment).color(color));

                if !b.outliers.is_empty() {
                    let pts: Vec<[f64; 2]> = b.outliers.iter().map(|&v| [x, v]).collect();
                    plot_ui.points(Points::new(pts).color(color).radius(2.5));
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Bar charts
// ---------------------------------------------------------------------------

/// Mean win rate per sentiment.
pub fn win_rate_bars(ui: &mut Ui, win_rates: &[(String, f64)], colors: &ColorMap) {
    chart_title(ui, "Win Rate by Market Sentiment");
    let labels: Vec<String> = win_rates.iter().map(|(s, _)| s.clone()).collect();

    base_plot("win_rate_bars")
        .x_axis_label("classification")
        .y_axis_label("win_rate")
        .x_axis_formatter(category_axis(labels))
        .show(ui, |plot_ui| {
            for (i, (sentiment, rate)) in win_rates.iter().enumerate() {
                let bar = Bar::new(i as f64, *rate)
                    .name(sentiment)
                    .fill(colors.color_for(sentiment))
                    .width(0.6);
                plot_ui.bar_chart(BarChart::new(vec![bar]).name(sentiment));
            }
        });
}

/// Mean PnL per sentiment, one bar per leverage segment side by side.
pub fn leverage_bars(ui: &mut Ui, breakdown: &[SegmentBreakdown]) {
    chart_title(ui, "Performance by Leverage Segment");

    let sentiments: Vec<String> = breakdown
        .iter()
        .map(|b| b.sentiment.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let segments: Vec<String> = breakdown
        .iter()
        .map(|b| b.segment.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let extra_colors = ColorMap::new(segments.iter().map(String::as_str));

    let width = 0.8 / segments.len().max(1) as f64;
    let charts: Vec<BarChart> = segments
        .iter()
        .enumerate()
        .map(|(j, segment)| {
            let color = LEVERAGE_COLORS
                .get(j)
                .copied()
                .unwrap_or_else(|| extra_colors.color_for(segment));
            let offset = (j as f64 - (segments.len() as f64 - 1.0) / 2.0) * width;
            let bars = breakdown
                .iter()
                .filter(|b| &b.segment == segment)
                .filter_map(|b| {
                    let i = sentiments.iter().position(|s| s == &b.sentiment)?;
                    Some(
                        Bar::new(i as f64 + offset, b.mean_pnl)
                            .name(format!("{} / {}\nwin rate {:.4}", b.sentiment, segment, b.mean_metric))
                            .fill(color)
                            .width(width * 0.95),
                    )
                })
                .collect();
            BarChart::new(bars).name(segment).color(color)
        })
        .collect();

    base_plot("leverage_bars")
        .x_axis_label("classification")
        .y_axis_label("mean total_pnl")
        .x_axis_formatter(category_axis(sentiments))
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

// ---------------------------------------------------------------------------
// Scatter
// ---------------------------------------------------------------------------

/// Mean trade count vs. mean PnL, coloured by sentiment, shaped by
/// frequency segment, sized by trade count.
pub fn frequency_scatter(ui: &mut Ui, breakdown: &[SegmentBreakdown], colors: &ColorMap) {
    chart_title(ui, "Trading Frequency vs Performance");

    let segments: Vec<&str> = breakdown
        .iter()
        .map(|b| b.segment.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    const SHAPES: [MarkerShape; 4] = [
        MarkerShape::Circle,
        MarkerShape::Diamond,
        MarkerShape::Square,
        MarkerShape::Cross,
    ];
    let max_trades = breakdown
        .iter()
        .map(|b| b.mean_metric)
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON);

    base_plot("frequency_scatter")
        .x_axis_label("mean num_trades")
        .y_axis_label("mean total_pnl")
        .show(ui, |plot_ui| {
            for b in breakdown {
                let shape_idx = segments.iter().position(|s| *s == b.segment).unwrap_or(0);
                let radius = 4.0 + 10.0 * (b.mean_metric / max_trades) as f32;
                plot_ui.points(
                    Points::new(vec![[b.mean_metric, b.mean_pnl]])
                        .name(format!("{} / {}", b.sentiment, b.segment))
                        .color(colors.color_for(&b.sentiment))
                        .shape(SHAPES[shape_idx % SHAPES.len()])
                        .filled(true)
                        .radius(radius),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

/// Line with markers over the daily series.
pub fn trend_line(
    ui: &mut Ui,
    id: &str,
    title: &str,
    trends: &[DailyTrend],
    value: impl Fn(&DailyTrend) -> f64,
    color: Color32,
) {
    chart_title(ui, title);
    let pts: Vec<[f64; 2]> = trends.iter().map(|t| [date_to_x(t.date), value(t)]).collect();

    base_plot(id)
        .x_axis_label("date")
        .x_axis_formatter(date_axis)
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::from(pts.clone()))
                    .name(title)
                    .color(color)
                    .width(1.5),
            );
            plot_ui.points(Points::new(pts).color(color).radius(3.0));
        });
}

/// Total trades per date.
pub fn volume_bars(ui: &mut Ui, trends: &[DailyTrend], color: Color32) {
    chart_title(ui, "Daily Trading Volume Over Time");
    let bars: Vec<Bar> = trends
        .iter()
        .map(|t| {
            Bar::new(date_to_x(t.date), t.total_trades as f64)
                .name(t.date.format("%Y-%m-%d").to_string())
                .fill(color)
                .width(0.8)
        })
        .collect();

    base_plot("volume_bars")
        .x_axis_label("date")
        .y_axis_label("num_trades")
        .x_axis_formatter(date_axis)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("num_trades").color(color));
        });
}

/// Placeholder shown instead of a chart when nothing passed the filters.
pub fn no_data(ui: &mut Ui) {
    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
        ui.label(
            RichText::new("No data matches your current filters. Try adjusting the criteria.")
                .color(Color32::from_rgb(0xf5, 0x9e, 0x0b)),
        );
    });
}
