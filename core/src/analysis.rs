//! Descriptive statistics over a loaded dataset.
//!
//! Everything here is a pure function of the records: no randomness, no
//! I/O. Groups are ordered by key (age groups by bucket order), and every
//! argmax/argmin keeps the first group in that order on ties.
//!
//! Rates are percentages in [0, 100]. A mean over zero rows is `None`.

use crate::{
    dataset::Dataset,
    error::{EngagementError, EngagementResult},
    histogram::Histogram,
    model::EngagementRecord,
};
use serde::Serialize;
use std::collections::BTreeMap;

pub const HIGH_ENGAGEMENT_MIN_CLICKS: u32 = 5;
pub const HIGH_ENGAGEMENT_MIN_DURATION: u32 = 300;
pub const LOW_ENGAGEMENT_MAX_CLICKS: u32 = 3;
pub const LOW_ENGAGEMENT_MAX_DURATION: u32 = 150;
pub const TOP_LOCATION_COUNT: usize = 5;

const DURATION_BINS: usize = 20;
const CLICK_BINS: usize = 15;
const AGE_BINS: usize = 20;

// ── Segment predicates ───────────────────────────────────────────────────────

/// Both thresholds must hold.
pub fn is_high_engagement(clicks: u32, session_duration: u32) -> bool {
    clicks >= HIGH_ENGAGEMENT_MIN_CLICKS && session_duration >= HIGH_ENGAGEMENT_MIN_DURATION
}

/// Either shortfall is enough.
pub fn is_low_engagement(clicks: u32, session_duration: u32) -> bool {
    clicks < LOW_ENGAGEMENT_MAX_CLICKS || session_duration < LOW_ENGAGEMENT_MAX_DURATION
}

pub fn is_at_risk(record: &EngagementRecord) -> bool {
    is_low_engagement(record.clicks, record.session_duration) && !record.retention_flag
}

// ── Age buckets ──────────────────────────────────────────────────────────────

/// Right-closed age buckets over edges 0/25/35/45/55/100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AgeBucket {
    UpTo25,
    From26To35,
    From36To45,
    From46To55,
    Over55,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 5] = [
        AgeBucket::UpTo25,
        AgeBucket::From26To35,
        AgeBucket::From36To45,
        AgeBucket::From46To55,
        AgeBucket::Over55,
    ];

    /// `None` outside (0, 100].
    pub fn from_age(age: u32) -> Option<Self> {
        match age {
            1..=25 => Some(Self::UpTo25),
            26..=35 => Some(Self::From26To35),
            36..=45 => Some(Self::From36To45),
            46..=55 => Some(Self::From46To55),
            56..=100 => Some(Self::Over55),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::UpTo25 => "18-25",
            Self::From26To35 => "26-35",
            Self::From36To45 => "36-45",
            Self::From46To55 => "46-55",
            Self::Over55 => "55+",
        }
    }
}

// ── Aggregates ───────────────────────────────────────────────────────────────

/// Means for one group of records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub key: String,
    pub records: usize,
    pub retention_pct: f64,
    pub avg_session: f64,
    pub avg_clicks: f64,
}

#[derive(Debug, Default, Clone)]
struct Accumulator {
    records: usize,
    retained: usize,
    session_sum: f64,
    clicks_sum: f64,
}

impl Accumulator {
    fn add(&mut self, r: &EngagementRecord) {
        self.records += 1;
        self.retained += usize::from(r.retention_flag);
        self.session_sum += f64::from(r.session_duration);
        self.clicks_sum += f64::from(r.clicks);
    }

    /// Only called on non-empty groups.
    fn finish(&self, key: String) -> GroupStats {
        let n = self.records as f64;
        GroupStats {
            key,
            records: self.records,
            retention_pct: self.retained as f64 / n * 100.0,
            avg_session: self.session_sum / n,
            avg_clicks: self.clicks_sum / n,
        }
    }
}

/// Group by a string key; groups come back in key order.
pub fn group_by<'a, I, F>(records: I, key: F) -> Vec<GroupStats>
where
    I: IntoIterator<Item = &'a EngagementRecord>,
    F: Fn(&EngagementRecord) -> String,
{
    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    for r in records {
        groups.entry(key(r)).or_default().add(r);
    }
    groups.into_iter().map(|(k, acc)| acc.finish(k)).collect()
}

pub fn group_by_age(records: &[EngagementRecord]) -> Vec<GroupStats> {
    let mut groups: BTreeMap<AgeBucket, Accumulator> = BTreeMap::new();
    for r in records {
        if let Some(bucket) = AgeBucket::from_age(r.age) {
            groups.entry(bucket).or_default().add(r);
        }
    }
    groups
        .into_iter()
        .map(|(b, acc)| acc.finish(b.label().to_string()))
        .collect()
}

/// First group with the highest retention.
pub fn best_by_retention(groups: &[GroupStats]) -> Option<&GroupStats> {
    groups.iter().fold(None, |best: Option<&GroupStats>, g| match best {
        Some(b) if b.retention_pct >= g.retention_pct => Some(b),
        _ => Some(g),
    })
}

/// First group with the lowest retention.
pub fn worst_by_retention(groups: &[GroupStats]) -> Option<&GroupStats> {
    groups.iter().fold(None, |worst: Option<&GroupStats>, g| match worst {
        Some(w) if w.retention_pct <= g.retention_pct => Some(w),
        _ => Some(g),
    })
}

/// The `n` groups with highest retention; ties keep key order.
pub fn top_by_retention(groups: &[GroupStats], n: usize) -> Vec<GroupStats> {
    let mut sorted = groups.to_vec();
    sorted.sort_by(|a, b| b.retention_pct.total_cmp(&a.retention_pct));
    sorted.truncate(n);
    sorted
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub unique_users: usize,
    pub total_records: usize,
    pub retention_pct: f64,
    pub avg_session: f64,
    pub avg_clicks: f64,
    /// Missing scores are ignored; `None` when every score is missing.
    pub avg_feedback: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentStats {
    pub count: usize,
    pub retention_pct: Option<f64>,
}

impl SegmentStats {
    fn from_records<'a>(records: impl Iterator<Item = &'a EngagementRecord>) -> Self {
        let (count, retained) = records.fold((0usize, 0usize), |(n, k), r| {
            (n + 1, k + usize::from(r.retention_flag))
        });
        Self {
            count,
            retention_pct: (count > 0).then(|| retained as f64 / count as f64 * 100.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementSegments {
    pub high: SegmentStats,
    pub low: SegmentStats,
    pub at_risk: SegmentStats,
    /// Low-engagement records as a share of all records.
    pub low_share_pct: f64,
    /// High minus low retention, when both segments are populated.
    pub retention_gap: Option<f64>,
}

/// Feature A against feature B.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbComparison {
    pub a: Option<GroupStats>,
    pub b: Option<GroupStats>,
    /// Retention of A minus retention of B, in points.
    pub retention_delta: Option<f64>,
    pub session_delta: Option<f64>,
    pub clicks_delta: Option<f64>,
}

impl AbComparison {
    fn from_versions(versions: &[GroupStats]) -> Self {
        let find = |label: &str| versions.iter().find(|g| g.key == label).cloned();
        let a = find("A");
        let b = find("B");
        Self {
            retention_delta: delta(&a, &b, |g| g.retention_pct),
            session_delta: delta(&a, &b, |g| g.avg_session),
            clicks_delta: delta(&a, &b, |g| g.avg_clicks),
            a,
            b,
        }
    }
}

fn delta(a: &Option<GroupStats>, b: &Option<GroupStats>, f: fn(&GroupStats) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a) - f(b)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distributions {
    pub session_duration: Histogram,
    pub clicks: Histogram,
    pub age: Histogram,
    /// Duration split by retention over shared edges.
    pub duration_retained: Histogram,
    pub duration_not_retained: Histogram,
    /// Record counts for scores 1..=5, in score order.
    pub feedback_counts: Vec<(u8, usize)>,
}

/// Every number the reports embed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementSummary {
    pub kpis: Kpis,
    pub by_version: Vec<GroupStats>,
    pub by_network: Vec<GroupStats>,
    pub by_device: Vec<GroupStats>,
    pub by_age_group: Vec<GroupStats>,
    pub by_gender: Vec<GroupStats>,
    pub by_feedback: Vec<GroupStats>,
    pub top_locations: Vec<GroupStats>,
    pub ab: AbComparison,
    pub segments: EngagementSegments,
    pub best_network: Option<GroupStats>,
    pub worst_network: Option<GroupStats>,
    pub best_device: Option<GroupStats>,
    pub best_age_group: Option<GroupStats>,
    pub distributions: Distributions,
}

/// Compute the full summary. An empty dataset is an error, not a page
/// of NaNs.
pub fn summarize(dataset: &Dataset) -> EngagementResult<EngagementSummary> {
    if dataset.is_empty() {
        return Err(EngagementError::EmptyDataset);
    }
    let records = dataset.records();

    let kpis = compute_kpis(dataset);
    let by_version = group_by(records, |r| r.feature_version.clone());
    let by_network = group_by(records, |r| r.network.clone());
    let by_device = group_by(records, |r| r.device.clone());
    let by_age_group = group_by_age(records);
    let by_gender = group_by(records, |r| r.gender.clone());
    let by_feedback = group_by(
        records.iter().filter(|r| r.feedback_score.is_some()),
        |r| r.feedback_score.map(|s| s.to_string()).unwrap_or_default(),
    );
    let by_location = group_by(records, |r| r.location.clone());
    let top_locations = top_by_retention(&by_location, TOP_LOCATION_COUNT);

    let summary = EngagementSummary {
        ab: AbComparison::from_versions(&by_version),
        segments: compute_segments(records),
        best_network: best_by_retention(&by_network).cloned(),
        worst_network: worst_by_retention(&by_network).cloned(),
        best_device: best_by_retention(&by_device).cloned(),
        best_age_group: best_by_retention(&by_age_group).cloned(),
        distributions: compute_distributions(records),
        kpis,
        by_version,
        by_network,
        by_device,
        by_age_group,
        by_gender,
        by_feedback,
        top_locations,
    };

    log::debug!(
        "analysis: retention={:.1}% ab_delta={:?} high={} low={}",
        summary.kpis.retention_pct,
        summary.ab.retention_delta,
        summary.segments.high.count,
        summary.segments.low.count
    );
    Ok(summary)
}

fn compute_kpis(dataset: &Dataset) -> Kpis {
    let records = dataset.records();
    let n = records.len() as f64;
    let overall = group_by(records, |_| String::new());
    let overall = &overall[0];

    let scores: Vec<f64> = records
        .iter()
        .filter_map(|r| r.feedback_score.map(f64::from))
        .collect();
    let avg_feedback = (!scores.is_empty()).then(|| scores.iter().sum::<f64>() / scores.len() as f64);

    Kpis {
        unique_users: dataset.unique_users(),
        total_records: n as usize,
        retention_pct: overall.retention_pct,
        avg_session: overall.avg_session,
        avg_clicks: overall.avg_clicks,
        avg_feedback,
    }
}

fn compute_segments(records: &[EngagementRecord]) -> EngagementSegments {
    let high = SegmentStats::from_records(
        records
            .iter()
            .filter(|r| is_high_engagement(r.clicks, r.session_duration)),
    );
    let low = SegmentStats::from_records(
        records
            .iter()
            .filter(|r| is_low_engagement(r.clicks, r.session_duration)),
    );
    let at_risk = SegmentStats::from_records(records.iter().filter(|r| is_at_risk(r)));

    let low_share_pct = low.count as f64 / records.len() as f64 * 100.0;
    let retention_gap = match (high.retention_pct, low.retention_pct) {
        (Some(h), Some(l)) => Some(h - l),
        _ => None,
    };
    EngagementSegments {
        high,
        low,
        at_risk,
        low_share_pct,
        retention_gap,
    }
}

fn compute_distributions(records: &[EngagementRecord]) -> Distributions {
    let durations: Vec<f64> = records.iter().map(|r| f64::from(r.session_duration)).collect();
    let clicks: Vec<f64> = records.iter().map(|r| f64::from(r.clicks)).collect();
    let ages: Vec<f64> = records.iter().map(|r| f64::from(r.age)).collect();

    let (retained, not_retained): (Vec<&EngagementRecord>, Vec<&EngagementRecord>) =
        records.iter().partition(|r| r.retention_flag);
    let shared_edges = Histogram::edges_for(&durations, DURATION_BINS);
    let duration_of =
        |rs: &Vec<&EngagementRecord>| -> Vec<f64> { rs.iter().map(|r| f64::from(r.session_duration)).collect() };

    let mut feedback = [0usize; 5];
    for score in records.iter().filter_map(|r| r.feedback_score) {
        if (1..=5).contains(&score) {
            feedback[usize::from(score - 1)] += 1;
        }
    }

    Distributions {
        session_duration: Histogram::with_edges(&durations, shared_edges.clone()),
        clicks: Histogram::from_values(&clicks, CLICK_BINS),
        age: Histogram::from_values(&ages, AGE_BINS),
        duration_retained: Histogram::with_edges(&duration_of(&retained), shared_edges.clone()),
        duration_not_retained: Histogram::with_edges(&duration_of(&not_retained), shared_edges),
        feedback_counts: (1u8..=5).zip(feedback).collect(),
    }
}
