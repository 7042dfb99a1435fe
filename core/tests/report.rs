//! HTML templates, chart panel contents and full report runs through the
//! output store. The full runs rasterize, so they need a system font.

use engagement_core::{
    analysis::summarize,
    chart::{panel_data, PanelData},
    config::{ChartPanel, GeneratorConfig, ReportProfile},
    dataset::Dataset,
    error::EngagementError,
    report::{generate_report, render_html},
    store::OutputStore,
    synthesizer::Synthesizer,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn dataset() -> Dataset {
    Synthesizer::new(GeneratorConfig::default_test()).unwrap().run().dataset
}

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("engagement-report-{tag}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn staging_leftovers(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(".partial-") || name.starts_with(".previous-"))
        .collect()
}

#[test]
fn tables_report_embeds_the_numbers() {
    let ds = dataset();
    let summary = summarize(&ds).unwrap();
    let profile = ReportProfile::complete();
    let html = render_html(&summary, &profile, "2025-11-27 09:00");

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Complete User Engagement Analysis"));
    assert!(html.contains("Generated: 2025-11-27 09:00"));
    assert!(html.contains(&format!("{:.1}%", summary.kpis.retention_pct)));
    assert!(html.contains(&format!("Records: {}", ds.len())));
    assert!(html.contains(r#"src="complete_analysis.png""#));
    for g in &summary.by_network {
        assert!(html.contains(&format!("<td>{}</td><td>{:.1}%</td>", g.key, g.retention_pct)));
    }
    for g in &summary.by_age_group {
        assert!(html.contains(&format!("<td>{}</td>", g.key)), "age group {}", g.key);
    }
}

#[test]
fn cards_report_embeds_best_groups() {
    let summary = summarize(&dataset()).unwrap();
    let profile = ReportProfile::overview();
    let html = render_html(&summary, &profile, "2025-11-27 09:00");

    assert!(html.contains("User Engagement Analysis Report"));
    assert!(html.contains(r#"src="user_engagement_analysis.png""#));
    let best = summary.best_network.as_ref().unwrap();
    assert!(html.contains(&format!("Best: <strong>{}</strong>", best.key)));
    assert!(html.contains(&format!("{} records", summary.segments.low.count)));
    assert!(!html.contains("NaN"));
}

#[test]
fn single_version_renders_na_instead_of_nan() {
    let mut ds = dataset().records().to_vec();
    for r in &mut ds {
        r.feature_version = "A".into();
    }
    let summary = summarize(&Dataset::new(ds)).unwrap();
    for profile in ReportProfile::all() {
        let html = render_html(&summary, &profile, "now");
        assert!(html.contains("n/a"), "profile {}", profile.name);
        assert!(!html.contains("NaN"), "profile {}", profile.name);
    }
}

#[test]
fn panels_carry_summary_values() {
    let ds = dataset();
    let summary = summarize(&ds).unwrap();

    match panel_data(ChartPanel::RetentionByNetwork, &ds, &summary) {
        PanelData::Bars { labels, series, .. } => {
            assert_eq!(labels.len(), summary.by_network.len());
            let expected: Vec<f64> = summary.by_network.iter().map(|g| g.retention_pct).collect();
            assert_eq!(series[0].values, expected);
        }
        other => panic!("expected bars, got {other:?}"),
    }

    match panel_data(ChartPanel::DataUsageScatter, &ds, &summary) {
        PanelData::Scatter { retained, not_retained, .. } => {
            assert_eq!(retained.len() + not_retained.len(), ds.len());
        }
        other => panic!("expected scatter, got {other:?}"),
    }

    match panel_data(ChartPanel::DurationByRetention, &ds, &summary) {
        PanelData::Histograms { series, .. } => {
            assert_eq!(series.len(), 2);
            assert_eq!(series[0].bins.edges, series[1].bins.edges);
        }
        other => panic!("expected histograms, got {other:?}"),
    }
}

#[test]
fn every_profile_writes_image_and_page() {
    let dir = temp_dir("profiles");
    let store = OutputStore::open(&dir).unwrap();
    let ds = dataset();

    for profile in ReportProfile::all() {
        let outcome = generate_report(&ds, &profile, &store).unwrap();
        assert_eq!(outcome.image_path, dir.join(&profile.image_file));
        assert_eq!(outcome.html_path, dir.join(&profile.html_file));

        let image = fs::read(&outcome.image_path).unwrap();
        assert!(image.starts_with(&PNG_MAGIC), "{} is not a PNG", profile.image_file);
        let html = fs::read_to_string(&outcome.html_path).unwrap();
        assert!(html.contains(&format!(r#"src="{}""#, profile.image_file)));
        assert_eq!(outcome.summary.kpis.total_records, ds.len());
    }
    assert!(staging_leftovers(&dir).is_empty(), "{:?}", staging_leftovers(&dir));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn failed_runs_write_nothing() {
    let dir = temp_dir("failed");
    let store = OutputStore::open(&dir).unwrap();

    let profile = ReportProfile::overview();
    let err = generate_report(&Dataset::new(Vec::new()), &profile, &store).unwrap_err();
    assert!(matches!(err, EngagementError::EmptyDataset), "{err}");

    let mut no_panels = ReportProfile::complete();
    no_panels.panels.clear();
    assert!(generate_report(&dataset(), &no_panels, &store).is_err());

    for name in [&profile.image_file, &profile.html_file, &no_panels.image_file, &no_panels.html_file] {
        assert!(!dir.join(name).exists(), "{name} written by a failed run");
    }
    assert!(staging_leftovers(&dir).is_empty(), "{:?}", staging_leftovers(&dir));

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn failed_run_keeps_the_previous_report() {
    let dir = temp_dir("keep");
    let store = OutputStore::open(&dir).unwrap();
    let profile = ReportProfile::overview();

    let first = generate_report(&dataset(), &profile, &store).unwrap();
    let image = fs::read(&first.image_path).unwrap();
    let html = fs::read(&first.html_path).unwrap();

    assert!(generate_report(&Dataset::new(Vec::new()), &profile, &store).is_err());
    assert_eq!(fs::read(&first.image_path).unwrap(), image);
    assert_eq!(fs::read(&first.html_path).unwrap(), html);

    fs::remove_dir_all(&dir).unwrap();
}
