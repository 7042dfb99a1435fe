use crate::{
    catalog::MalawiCatalog,
    error::{EngagementError, EngagementResult},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const WEIGHT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedCategory {
    pub label: String,
    pub weight: f64,
}

impl WeightedCategory {
    pub fn new(label: &str, weight: f64) -> Self {
        Self { label: label.into(), weight }
    }
}

/// One feedback outcome. `score: None` models a skipped survey.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedScore {
    pub score: Option<u8>,
    pub weight: f64,
}

/// Device-specific click and session-duration distributions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BehaviorProfile {
    pub clicks_lambda: f64,
    pub duration_mean: f64,
    pub duration_std: f64,
}

// ── Metadata sidecar ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contributor {
    pub name: String,
    pub registration_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetadataConfig {
    pub title: String,
    pub group: Vec<Contributor>,
    /// Fixed so the sidecar is reproducible alongside the table.
    pub date: NaiveDate,
    pub generation_method: String,
    pub locations_note: String,
    pub devices_note: String,
    pub source: String,
    pub license: String,
    pub contact: String,
    pub context: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            title: "Malawi User Engagement Dataset for App Feature Analysis".into(),
            group: vec![Contributor {
                name: "Engagement Analytics Group".into(),
                registration_number: "EAG-0001".into(),
            }],
            date: NaiveDate::from_ymd_opt(2025, 11, 27).expect("valid calendar date"),
            generation_method: "Synthetic (Rust engagement-core)".into(),
            locations_note: "Malawi districts and cities".into(),
            devices_note: "Realistic Malawi market distribution".into(),
            source: "synthetic - Malawi context".into(),
            license: "CC0".into(),
            contact: "engagement-analytics@example.org".into(),
            context: "Simulated Malawian mobile user behavior with realistic demographics".into(),
        }
    }
}

// ── Generator ──────────────────────────────────────────────────────

/// Every parameter the synthesizer reads. Defaults are the canonical
/// constants; a JSON file may override any subset of fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub n_users: u32,
    pub n_days: u32,
    pub start_date: NaiveDate,
    pub age_min: u32,
    /// Exclusive upper bound.
    pub age_max: u32,
    pub genders: Vec<WeightedCategory>,
    pub locations: Vec<String>,
    pub urban_locations: Vec<String>,
    pub urban_multiplier: f64,
    pub rural_multiplier: f64,
    pub devices: Vec<WeightedCategory>,
    /// Behavior keyed by device label. Devices not listed use
    /// `default_behavior`.
    pub device_behaviors: BTreeMap<String, BehaviorProfile>,
    pub default_behavior: BehaviorProfile,
    pub networks: Vec<WeightedCategory>,
    pub feature_versions: Vec<WeightedCategory>,
    pub feedback_scores: Vec<WeightedScore>,
    pub retention_rate: f64,
    pub data_usage_mean: f64,
    pub data_usage_std: f64,
    pub min_session_secs: u32,
    pub metadata: MetadataConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let weighted = |pairs: &[(&str, f64)]| {
            pairs
                .iter()
                .map(|(label, w)| WeightedCategory::new(label, *w))
                .collect::<Vec<_>>()
        };

        let mut device_behaviors = BTreeMap::new();
        device_behaviors.insert(
            "Android".to_string(),
            BehaviorProfile { clicks_lambda: 6.0, duration_mean: 320.0, duration_std: 60.0 },
        );
        device_behaviors.insert(
            "iOS".to_string(),
            BehaviorProfile { clicks_lambda: 7.0, duration_mean: 350.0, duration_std: 50.0 },
        );

        Self {
            seed: 42,
            n_users: 3000,
            n_days: 30,
            start_date: NaiveDate::from_ymd_opt(2025, 11, 1).expect("valid calendar date"),
            age_min: 18,
            age_max: 65,
            genders: weighted(MalawiCatalog::genders()),
            locations: MalawiCatalog::locations().iter().map(|s| s.to_string()).collect(),
            urban_locations: MalawiCatalog::urban_locations()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            urban_multiplier: 1.2,
            rural_multiplier: 0.8,
            devices: weighted(MalawiCatalog::devices()),
            device_behaviors,
            default_behavior: BehaviorProfile {
                clicks_lambda: 3.0,
                duration_mean: 180.0,
                duration_std: 40.0,
            },
            networks: weighted(MalawiCatalog::networks()),
            feature_versions: weighted(&[("A", 0.5), ("B", 0.5)]),
            feedback_scores: vec![
                WeightedScore { score: Some(1), weight: 0.05 },
                WeightedScore { score: Some(2), weight: 0.10 },
                WeightedScore { score: Some(3), weight: 0.25 },
                WeightedScore { score: Some(4), weight: 0.35 },
                WeightedScore { score: Some(5), weight: 0.20 },
                WeightedScore { score: None, weight: 0.05 },
            ],
            retention_rate: 0.75,
            data_usage_mean: 50.0,
            data_usage_std: 20.0,
            min_session_secs: 30,
            metadata: MetadataConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Load overrides from a JSON file. Missing fields keep their defaults.
    /// In tests, use GeneratorConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: GeneratorConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Canonical distributions with a small population for unit tests.
    pub fn default_test() -> Self {
        Self {
            n_users: 50,
            n_days: 5,
            ..Self::default()
        }
    }

    pub fn total_records(&self) -> u64 {
        u64::from(self.n_users) * u64::from(self.n_days)
    }

    pub fn behavior_for(&self, device: &str) -> &BehaviorProfile {
        self.device_behaviors
            .get(device)
            .unwrap_or(&self.default_behavior)
    }

    pub fn is_urban(&self, location: &str) -> bool {
        self.urban_locations.iter().any(|u| u == location)
    }

    pub fn location_multiplier(&self, location: &str) -> f64 {
        if self.is_urban(location) {
            self.urban_multiplier
        } else {
            self.rural_multiplier
        }
    }

    /// Reject configurations the synthesizer cannot sample from.
    pub fn validate(&self) -> EngagementResult<()> {
        if self.n_users == 0 || self.n_days == 0 {
            return invalid(format!(
                "n_users ({}) and n_days ({}) must be positive",
                self.n_users, self.n_days
            ));
        }
        if self.age_max <= self.age_min {
            return invalid(format!("age range [{}, {}) is empty", self.age_min, self.age_max));
        }
        if self.locations.is_empty() {
            return invalid("location catalog is empty".into());
        }
        if let Some(missing) = self
            .urban_locations
            .iter()
            .find(|u| !self.locations.contains(*u))
        {
            return invalid(format!("urban location '{missing}' is not in the catalog"));
        }
        if self.urban_multiplier < 0.0 || self.rural_multiplier < 0.0 {
            return invalid("location multipliers must be non-negative".into());
        }

        check_weights("genders", self.genders.iter().map(|c| c.weight))?;
        check_weights("devices", self.devices.iter().map(|c| c.weight))?;
        check_weights("networks", self.networks.iter().map(|c| c.weight))?;
        check_weights("feature_versions", self.feature_versions.iter().map(|c| c.weight))?;
        check_weights("feedback_scores", self.feedback_scores.iter().map(|s| s.weight))?;

        if let Some(bad) = self
            .feedback_scores
            .iter()
            .filter_map(|s| s.score)
            .find(|s| !(1..=5).contains(s))
        {
            return invalid(format!("feedback score {bad} is outside 1..=5"));
        }
        if !(0.0..=1.0).contains(&self.retention_rate) {
            return invalid(format!("retention_rate {} is not a probability", self.retention_rate));
        }
        if self.data_usage_std < 0.0 {
            return invalid("data_usage_std must be non-negative".into());
        }

        let behaviors = self
            .device_behaviors
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .chain(std::iter::once(("default", &self.default_behavior)));
        for (device, b) in behaviors {
            if b.clicks_lambda <= 0.0 || b.duration_std < 0.0 {
                return invalid(format!(
                    "behavior for '{device}' needs clicks_lambda > 0 and duration_std >= 0"
                ));
            }
        }
        Ok(())
    }
}

fn invalid(reason: String) -> EngagementResult<()> {
    Err(EngagementError::InvalidConfig { reason })
}

fn check_weights(name: &str, weights: impl Iterator<Item = f64>) -> EngagementResult<()> {
    let weights: Vec<f64> = weights.collect();
    if weights.is_empty() {
        return invalid(format!("{name} has no categories"));
    }
    if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
        return invalid(format!("{name} has a negative or non-finite weight"));
    }
    let total: f64 = weights.iter().sum();
    if (total - 1.0).abs() > WEIGHT_TOLERANCE {
        return invalid(format!("{name} weights sum to {total}, expected 1.0"));
    }
    Ok(())
}

// ── Report profiles ────────────────────────────────────────────────

/// One dashboard panel. Each variant maps to exactly one chart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChartPanel {
    Kpis,
    AbRetention,
    RetentionByNetwork,
    NetworkComparison,
    RetentionByDevice,
    DeviceComparison,
    RetentionByAgeGroup,
    SessionDurationHistogram,
    ClicksHistogram,
    FeedbackDistribution,
    RetentionByFeedback,
    DurationByRetention,
    DataUsageScatter,
    TopLocations,
    FeatureComparison,
    EngagementSegments,
    RetentionByGender,
    AgeHistogram,
    SessionByNetwork,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportTemplate {
    /// Table-heavy analysis report.
    Tables,
    /// Card-style executive overview.
    Cards,
}

/// A named chart set + HTML template + output file names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportProfile {
    pub name: String,
    pub title: String,
    pub image_file: String,
    pub html_file: String,
    pub grid_rows: u32,
    pub grid_cols: u32,
    pub image_size: (u32, u32),
    pub panels: Vec<ChartPanel>,
    pub template: ReportTemplate,
}

impl ReportProfile {
    /// The sixteen-panel analysis with full tables.
    pub fn complete() -> Self {
        use ChartPanel::*;
        Self {
            name: "complete".into(),
            title: "Complete User Engagement Analysis".into(),
            image_file: "complete_analysis.png".into(),
            html_file: "complete_analysis_report.html".into(),
            grid_rows: 4,
            grid_cols: 4,
            image_size: (2700, 2400),
            panels: vec![
                Kpis,
                AbRetention,
                RetentionByNetwork,
                RetentionByDevice,
                RetentionByAgeGroup,
                SessionDurationHistogram,
                ClicksHistogram,
                FeedbackDistribution,
                DurationByRetention,
                DataUsageScatter,
                TopLocations,
                FeatureComparison,
                EngagementSegments,
                RetentionByGender,
                AgeHistogram,
                SessionByNetwork,
            ],
            template: ReportTemplate::Tables,
        }
    }

    /// The nine-panel overview with KPI cards and recommendations.
    pub fn overview() -> Self {
        use ChartPanel::*;
        Self {
            name: "overview".into(),
            title: "User Engagement Analysis Report".into(),
            image_file: "user_engagement_analysis.png".into(),
            html_file: "user_engagement_report.html".into(),
            grid_rows: 3,
            grid_cols: 3,
            image_size: (3000, 2700),
            panels: vec![
                Kpis,
                AbRetention,
                AgeHistogram,
                DurationByRetention,
                NetworkComparison,
                DeviceComparison,
                ClicksHistogram,
                RetentionByFeedback,
                DataUsageScatter,
            ],
            template: ReportTemplate::Cards,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::complete(), Self::overview()]
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|p| p.name == name)
    }

    pub fn validate(&self) -> EngagementResult<()> {
        let capacity = (self.grid_rows * self.grid_cols) as usize;
        if self.panels.is_empty() || self.panels.len() > capacity {
            return invalid(format!(
                "profile '{}' has {} panels for a {}x{} grid",
                self.name,
                self.panels.len(),
                self.grid_rows,
                self.grid_cols
            ));
        }
        Ok(())
    }
}
