//! Dashboard rendering.
//!
//! Panel contents are extracted first (`panel_data`, pure) and drawn
//! second (`render_dashboard`, plotters bitmap backend), one panel per
//! grid cell in profile order.

use crate::{
    analysis::{EngagementSummary, GroupStats},
    config::{ChartPanel, ReportProfile},
    dataset::Dataset,
    error::{EngagementError, EngagementResult},
    histogram::Histogram as Binned,
    model::EngagementRecord,
};
use plotters::{coord::Shift, prelude::*};
use std::path::Path;

const PALETTE: [RGBColor; 4] = [
    RGBColor(0x2E, 0x86, 0xAB),
    RGBColor(0xA2, 0x3B, 0x72),
    RGBColor(0xF1, 0x8F, 0x01),
    RGBColor(0xC7, 0x3E, 0x1D),
];
const RETAINED: RGBColor = RGBColor(0x27, 0xAE, 0x60);
const NOT_RETAINED: RGBColor = RGBColor(0xC0, 0x39, 0x2B);

#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSeries {
    pub name: String,
    pub bins: Binned,
    pub retained: Option<bool>,
}

/// What one panel shows, independent of how it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelData {
    Bars {
        title: String,
        y_desc: String,
        labels: Vec<String>,
        series: Vec<BarSeries>,
    },
    Histograms {
        title: String,
        x_desc: String,
        series: Vec<HistogramSeries>,
    },
    Scatter {
        title: String,
        retained: Vec<(f64, f64)>,
        not_retained: Vec<(f64, f64)>,
    },
}

fn single_bars(title: &str, y_desc: &str, groups: &[GroupStats], value: fn(&GroupStats) -> f64) -> PanelData {
    PanelData::Bars {
        title: title.into(),
        y_desc: y_desc.into(),
        labels: groups.iter().map(|g| g.key.clone()).collect(),
        series: vec![BarSeries {
            name: y_desc.into(),
            values: groups.iter().map(value).collect(),
        }],
    }
}

fn histogram(title: &str, x_desc: &str, bins: &Binned) -> PanelData {
    PanelData::Histograms {
        title: title.into(),
        x_desc: x_desc.into(),
        series: vec![HistogramSeries {
            name: title.into(),
            bins: bins.clone(),
            retained: None,
        }],
    }
}

pub fn panel_data(panel: ChartPanel, dataset: &Dataset, summary: &EngagementSummary) -> PanelData {
    let dist = &summary.distributions;
    match panel {
        ChartPanel::Kpis => {
            let k = &summary.kpis;
            PanelData::Bars {
                title: "Key Performance Indicators".into(),
                y_desc: "Value".into(),
                labels: vec![
                    "Total Users".into(),
                    "Retention %".into(),
                    "Avg Session".into(),
                    "Avg Clicks".into(),
                ],
                series: vec![BarSeries {
                    name: "KPI".into(),
                    values: vec![k.unique_users as f64, k.retention_pct, k.avg_session, k.avg_clicks],
                }],
            }
        }
        ChartPanel::AbRetention => {
            let mut data = single_bars(
                "A/B Test: Retention Rate",
                "Retention (%)",
                &summary.by_version,
                |g| g.retention_pct,
            );
            if let PanelData::Bars { labels, .. } = &mut data {
                for l in labels.iter_mut() {
                    *l = format!("Feature {l}");
                }
            }
            data
        }
        ChartPanel::RetentionByNetwork => {
            single_bars("Retention by Network", "Retention (%)", &summary.by_network, |g| g.retention_pct)
        }
        ChartPanel::NetworkComparison => PanelData::Bars {
            title: "Network Performance Comparison".into(),
            y_desc: "Value".into(),
            labels: summary.by_network.iter().map(|g| g.key.clone()).collect(),
            series: vec![
                BarSeries {
                    name: "Retention %".into(),
                    values: summary.by_network.iter().map(|g| g.retention_pct).collect(),
                },
                BarSeries {
                    name: "Avg Session".into(),
                    values: summary.by_network.iter().map(|g| g.avg_session).collect(),
                },
                BarSeries {
                    name: "Avg Clicks".into(),
                    values: summary.by_network.iter().map(|g| g.avg_clicks).collect(),
                },
            ],
        },
        ChartPanel::RetentionByDevice => {
            single_bars("Retention by Device", "Retention (%)", &summary.by_device, |g| g.retention_pct)
        }
        ChartPanel::DeviceComparison => {
            let mut devices = summary.by_device.clone();
            devices.sort_by(|a, b| b.retention_pct.total_cmp(&a.retention_pct));
            PanelData::Bars {
                title: "Device Performance".into(),
                y_desc: "Value".into(),
                labels: devices.iter().map(|g| g.key.clone()).collect(),
                series: vec![
                    BarSeries {
                        name: "Retention %".into(),
                        values: devices.iter().map(|g| g.retention_pct).collect(),
                    },
                    BarSeries {
                        name: "Avg Session".into(),
                        values: devices.iter().map(|g| g.avg_session).collect(),
                    },
                ],
            }
        }
        ChartPanel::RetentionByAgeGroup => single_bars(
            "Retention by Age Group",
            "Retention (%)",
            &summary.by_age_group,
            |g| g.retention_pct,
        ),
        ChartPanel::SessionDurationHistogram => {
            histogram("Session Duration Distribution", "Seconds", &dist.session_duration)
        }
        ChartPanel::ClicksHistogram => histogram("Clicks Distribution", "Number of Clicks", &dist.clicks),
        ChartPanel::AgeHistogram => histogram("User Age Distribution", "Age", &dist.age),
        ChartPanel::FeedbackDistribution => PanelData::Bars {
            title: "Feedback Score Distribution".into(),
            y_desc: "Records".into(),
            labels: dist.feedback_counts.iter().map(|(s, _)| s.to_string()).collect(),
            series: vec![BarSeries {
                name: "Records".into(),
                values: dist.feedback_counts.iter().map(|(_, n)| *n as f64).collect(),
            }],
        },
        ChartPanel::RetentionByFeedback => single_bars(
            "Retention Rate by Feedback Score",
            "Retention (%)",
            &summary.by_feedback,
            |g| g.retention_pct,
        ),
        ChartPanel::DurationByRetention => PanelData::Histograms {
            title: "Session Duration: Retained vs Not Retained".into(),
            x_desc: "Session Duration (seconds)".into(),
            series: vec![
                HistogramSeries {
                    name: "Retained".into(),
                    bins: dist.duration_retained.clone(),
                    retained: Some(true),
                },
                HistogramSeries {
                    name: "Not Retained".into(),
                    bins: dist.duration_not_retained.clone(),
                    retained: Some(false),
                },
            ],
        },
        ChartPanel::DataUsageScatter => {
            let (retained, not_retained): (Vec<_>, Vec<_>) =
                dataset.records().iter().partition(|r| r.retention_flag);
            let point = |r: &&EngagementRecord| (r.data_used_mb, f64::from(r.session_duration));
            PanelData::Scatter {
                title: "Data Usage vs Session Duration".into(),
                retained: retained.iter().map(point).collect(),
                not_retained: not_retained.iter().map(point).collect(),
            }
        }
        ChartPanel::TopLocations => single_bars(
            "Top 5 Locations by Retention",
            "Retention (%)",
            &summary.top_locations,
            |g| g.retention_pct,
        ),
        ChartPanel::FeatureComparison => PanelData::Bars {
            title: "Feature Version Comparison".into(),
            y_desc: "Value".into(),
            labels: vec!["Retention %".into(), "Duration".into(), "Clicks".into()],
            series: summary
                .by_version
                .iter()
                .map(|g| BarSeries {
                    name: format!("Version {}", g.key),
                    values: vec![g.retention_pct, g.avg_session, g.avg_clicks],
                })
                .collect(),
        },
        ChartPanel::EngagementSegments => {
            let seg = &summary.segments;
            PanelData::Bars {
                title: "Retention by Engagement Level".into(),
                y_desc: "Retention (%)".into(),
                labels: vec!["High Engagement".into(), "Low Engagement".into()],
                series: vec![BarSeries {
                    name: "Retention (%)".into(),
                    values: vec![
                        seg.high.retention_pct.unwrap_or(0.0),
                        seg.low.retention_pct.unwrap_or(0.0),
                    ],
                }],
            }
        }
        ChartPanel::RetentionByGender => {
            single_bars("Retention by Gender", "Retention (%)", &summary.by_gender, |g| g.retention_pct)
        }
        ChartPanel::SessionByNetwork => {
            single_bars("Avg Session by Network", "Seconds", &summary.by_network, |g| g.avg_session)
        }
    }
}

fn chart_err<E: std::fmt::Display>(e: E) -> EngagementError {
    EngagementError::Chart(e.to_string())
}

/// Draw every panel of `profile` into one raster image at `path`.
pub fn render_dashboard(
    dataset: &Dataset,
    summary: &EngagementSummary,
    profile: &ReportProfile,
    path: &Path,
) -> EngagementResult<()> {
    profile.validate()?;
    let root = BitMapBackend::new(path, profile.image_size).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let cells = root.split_evenly((profile.grid_rows as usize, profile.grid_cols as usize));
    for (panel, cell) in profile.panels.iter().zip(cells.iter()) {
        let data = panel_data(*panel, dataset, summary);
        draw_panel(cell, &data)?;
    }

    root.present().map_err(chart_err)?;
    log::info!("chart: {} panels drawn to {}", profile.panels.len(), path.display());
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, data: &PanelData) -> EngagementResult<()> {
    match data {
        PanelData::Bars { title, y_desc, labels, series } => draw_bars(area, title, y_desc, labels, series),
        PanelData::Histograms { title, x_desc, series } => draw_histograms(area, title, x_desc, series),
        PanelData::Scatter { title, retained, not_retained } => {
            draw_scatter(area, title, retained, not_retained)
        }
    }
}

fn draw_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    y_desc: &str,
    labels: &[String],
    series: &[BarSeries],
) -> EngagementResult<()> {
    let n = labels.len().max(1);
    let y_max = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .fold(0.0_f64, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.15 } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)
        .map_err(chart_err)?;

    // Category names only on integer ticks.
    let label_at = |x: &f64| -> String {
        let i = x.round();
        if (x - i).abs() < 1e-6 && i >= 0.0 && (i as usize) < labels.len() {
            labels[i as usize].clone()
        } else {
            String::new()
        }
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n * 2 + 1)
        .x_label_formatter(&label_at)
        .y_desc(y_desc)
        .draw()
        .map_err(chart_err)?;

    let slot = 0.8 / series.len().max(1) as f64;
    for (s, bars) in series.iter().enumerate() {
        let color = PALETTE[s % PALETTE.len()];
        let offset = -0.4 + slot * s as f64;
        chart
            .draw_series(bars.values.iter().enumerate().map(move |(i, v)| {
                let x0 = i as f64 + offset;
                Rectangle::new([(x0, 0.0), (x0 + slot, *v)], color.filled())
            }))
            .map_err(chart_err)?
            .label(bars.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }
    if series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(chart_err)?;
    }
    Ok(())
}

fn draw_histograms<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    x_desc: &str,
    series: &[HistogramSeries],
) -> EngagementResult<()> {
    let Some(first) = series.first() else {
        return Ok(());
    };
    let edges = &first.bins.edges;
    let (x_lo, x_hi) = match (edges.first(), edges.last()) {
        (Some(lo), Some(hi)) if hi > lo => (*lo, *hi),
        _ => (0.0, 1.0),
    };
    let y_max = series.iter().map(|s| s.bins.max_count()).max().unwrap_or(0) as f64;
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, 0f64..y_max)
        .map_err(chart_err)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc("Frequency")
        .draw()
        .map_err(chart_err)?;

    // Series share each bin side by side.
    let k = series.len() as f64;
    for (s, hist) in series.iter().enumerate() {
        let color = match hist.retained {
            Some(true) => RETAINED,
            Some(false) => NOT_RETAINED,
            None => PALETTE[s % PALETTE.len()],
        };
        let bins = &hist.bins;
        chart
            .draw_series(bins.counts.iter().enumerate().map(move |(i, c)| {
                let lo = bins.edges[i];
                let width = (bins.edges[i + 1] - lo) / k;
                let x0 = lo + width * s as f64;
                Rectangle::new([(x0, 0.0), (x0 + width, *c as f64)], color.mix(0.75).filled())
            }))
            .map_err(chart_err)?
            .label(hist.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }
    if series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(chart_err)?;
    }
    Ok(())
}

fn draw_scatter<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    retained: &[(f64, f64)],
    not_retained: &[(f64, f64)],
) -> EngagementResult<()> {
    let (x_max, y_max) = retained
        .iter()
        .chain(not_retained)
        .fold((0.0_f64, 0.0_f64), |(mx, my), (x, y)| (mx.max(*x), my.max(*y)));
    let x_max = if x_max > 0.0 { x_max * 1.05 } else { 1.0 };
    let y_max = if y_max > 0.0 { y_max * 1.05 } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)
        .map_err(chart_err)?;
    chart
        .configure_mesh()
        .x_desc("Data Used (MB)")
        .y_desc("Session Duration (s)")
        .draw()
        .map_err(chart_err)?;

    for (name, points, color) in [
        ("Not Retained", not_retained, NOT_RETAINED),
        ("Retained", retained, RETAINED),
    ] {
        chart
            .draw_series(
                points
                    .iter()
                    .map(move |&(x, y)| Circle::new((x, y), 2, color.mix(0.4).filled())),
            )
            .map_err(chart_err)?
            .label(name)
            .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(chart_err)?;
    Ok(())
}
