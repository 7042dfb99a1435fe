//! Summary statistics over hand-built tables.

use chrono::NaiveDate;
use engagement_core::{
    analysis::{is_high_engagement, is_low_engagement, summarize},
    config::GeneratorConfig,
    dataset::Dataset,
    error::EngagementError,
    model::EngagementRecord,
    synthesizer::Synthesizer,
};

fn record(user_id: u32, retained: bool) -> EngagementRecord {
    EngagementRecord {
        user_id,
        age: 30,
        gender: "F".into(),
        location: "Lilongwe".into(),
        device: "Android".into(),
        network: "Airtel".into(),
        date: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
        clicks: 4,
        session_duration: 200,
        feature_version: "A".into(),
        feedback_score: Some(4),
        retention_flag: retained,
        data_used_mb: 50.0,
    }
}

#[test]
fn retention_of_three_in_four_is_75_percent() {
    let dataset = Dataset::new(vec![
        record(0, true),
        record(1, true),
        record(2, false),
        record(3, true),
    ]);
    let summary = summarize(&dataset).unwrap();
    assert_eq!(summary.kpis.retention_pct, 75.0);
    assert_eq!(summary.kpis.unique_users, 4);
    assert_eq!(summary.kpis.total_records, 4);
    assert_eq!(summary.kpis.avg_feedback, Some(4.0));
}

#[test]
fn segment_boundary_examples() {
    assert!(is_high_engagement(6, 310));
    assert!(!is_low_engagement(6, 310));
    assert!(is_low_engagement(1, 400));
    assert!(!is_high_engagement(1, 400));
}

#[test]
fn segments_count_records_on_each_side() {
    let mut high = record(0, true);
    high.clicks = 6;
    high.session_duration = 310;
    let mut low_retained = record(1, true);
    low_retained.clicks = 1;
    low_retained.session_duration = 400;
    let mut low_lost = record(2, false);
    low_lost.session_duration = 100;
    let middle = record(3, false);

    let summary = summarize(&Dataset::new(vec![high, low_retained, low_lost, middle])).unwrap();
    let seg = &summary.segments;
    assert_eq!(seg.high.count, 1);
    assert_eq!(seg.high.retention_pct, Some(100.0));
    assert_eq!(seg.low.count, 2);
    assert_eq!(seg.low.retention_pct, Some(50.0));
    assert_eq!(seg.at_risk.count, 1);
    assert_eq!(seg.at_risk.retention_pct, Some(0.0));
    assert_eq!(seg.low_share_pct, 50.0);
    assert_eq!(seg.retention_gap, Some(50.0));
}

#[test]
fn empty_segments_report_none_not_nan() {
    let summary = summarize(&Dataset::new(vec![record(0, true)])).unwrap();
    assert_eq!(summary.segments.high.count, 0);
    assert_eq!(summary.segments.high.retention_pct, None);
    assert_eq!(summary.segments.retention_gap, None);
}

#[test]
fn ab_delta_is_a_minus_b() {
    let mut rows = vec![record(0, true), record(1, true), record(2, false), record(3, false)];
    rows[2].feature_version = "B".into();
    rows[3].feature_version = "B".into();
    rows[3].retention_flag = true;

    let summary = summarize(&Dataset::new(rows)).unwrap();
    assert_eq!(summary.ab.a.as_ref().unwrap().retention_pct, 100.0);
    assert_eq!(summary.ab.b.as_ref().unwrap().retention_pct, 50.0);
    assert_eq!(summary.ab.retention_delta, Some(50.0));
    assert_eq!(summary.ab.session_delta, Some(0.0));
}

#[test]
fn single_version_has_no_delta() {
    let summary = summarize(&Dataset::new(vec![record(0, true)])).unwrap();
    assert!(summary.ab.b.is_none());
    assert_eq!(summary.ab.retention_delta, None);
}

#[test]
fn best_network_ties_go_to_first_key() {
    let mut rows = vec![record(0, true), record(1, true), record(2, false)];
    rows[1].network = "TNM".into();
    rows[2].network = "MTL".into();

    let summary = summarize(&Dataset::new(rows)).unwrap();
    let keys: Vec<_> = summary.by_network.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["Airtel", "MTL", "TNM"]);
    assert_eq!(summary.best_network.unwrap().key, "Airtel");
    assert_eq!(summary.worst_network.unwrap().key, "MTL");
}

#[test]
fn age_groups_follow_bucket_order() {
    let mut rows = Vec::new();
    for (i, age) in [60u32, 25, 26, 45, 18].into_iter().enumerate() {
        let mut r = record(i as u32, true);
        r.age = age;
        rows.push(r);
    }
    let summary = summarize(&Dataset::new(rows)).unwrap();
    let labels: Vec<_> = summary.by_age_group.iter().map(|g| (g.key.as_str(), g.records)).collect();
    assert_eq!(labels, vec![("18-25", 2), ("26-35", 1), ("36-45", 1), ("55+", 1)]);
}

#[test]
fn missing_feedback_is_ignored() {
    let mut rows = vec![record(0, true), record(1, false)];
    rows[1].feedback_score = None;
    let summary = summarize(&Dataset::new(rows)).unwrap();
    assert_eq!(summary.kpis.avg_feedback, Some(4.0));
    assert_eq!(summary.by_feedback.len(), 1);
    assert_eq!(summary.distributions.feedback_counts[3], (4, 1));

    let mut rows = vec![record(0, true)];
    rows[0].feedback_score = None;
    let summary = summarize(&Dataset::new(rows)).unwrap();
    assert_eq!(summary.kpis.avg_feedback, None);
}

#[test]
fn empty_dataset_is_an_error() {
    let err = summarize(&Dataset::default()).unwrap_err();
    assert!(matches!(err, EngagementError::EmptyDataset), "{err}");
}

#[test]
fn summary_is_a_pure_function_of_the_table() {
    let out = Synthesizer::new(GeneratorConfig::default_test()).unwrap().run();
    let a = summarize(&out.dataset).unwrap();
    let b = summarize(&out.dataset.clone()).unwrap();
    assert_eq!(a, b);
    assert!(a.top_locations.len() <= 5);
    assert_eq!(a.distributions.session_duration.total(), out.dataset.len());
    assert_eq!(
        a.distributions.duration_retained.total() + a.distributions.duration_not_retained.total(),
        out.dataset.len()
    );
}
