//! The synthesizer: turns a config and a seed into a dataset.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Validate the config.
//!   2. Build one SimRng from the configured seed.
//!   3. Generate the whole user population.
//!   4. For each user in id order, for each day in order, sample one
//!      day of activity.
//!   5. Describe the run in the metadata sidecar.
//!
//! RULES:
//!   - All randomness flows through the single SimRng.
//!   - Per record the draw order is: clicks, duration, feature version,
//!     feedback, retention, data usage.
//!   - Feature version is drawn per record, so one user can land in both
//!     A and B on different days.

use crate::{
    config::GeneratorConfig,
    dataset::Dataset,
    error::EngagementResult,
    metadata::{DatasetMetadata, METADATA_FILE},
    model::{DailyActivity, EngagementRecord, User},
    population::{pick_category, PopulationGenerator},
    rng::SimRng,
    store::OutputStore,
    types::DayIndex,
};
use chrono::Days;
use std::path::PathBuf;

pub const DATASET_FILE: &str = "user_engagement_data.csv";

/// Samples daily activity for a single user.
pub struct ActivitySampler<'a> {
    config: &'a GeneratorConfig,
}

impl<'a> ActivitySampler<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn sample(&self, user: &User, day: DayIndex, rng: &mut SimRng) -> DailyActivity {
        let behavior = self.config.behavior_for(&user.device);
        let multiplier = self.config.location_multiplier(&user.location);

        let base_clicks = rng.poisson(behavior.clicks_lambda) as f64;
        let base_duration = rng.normal(behavior.duration_mean, behavior.duration_std);

        let clicks = (base_clicks * multiplier).round().max(0.0) as u32;
        let min_session = f64::from(self.config.min_session_secs);
        let session_duration = (base_duration * multiplier).round().max(min_session) as u32;

        let feature_version = pick_category(&self.config.feature_versions, rng);
        let feedback_score = self.pick_feedback(rng);
        let retention_flag = rng.chance(self.config.retention_rate);
        let data_used_mb = rng
            .normal(self.config.data_usage_mean, self.config.data_usage_std)
            .max(0.0);

        DailyActivity {
            date: self.config.start_date + Days::new(u64::from(day)),
            clicks,
            session_duration,
            feature_version,
            feedback_score,
            retention_flag,
            data_used_mb,
        }
    }

    fn pick_feedback(&self, rng: &mut SimRng) -> Option<u8> {
        let weights: Vec<f64> = self.config.feedback_scores.iter().map(|s| s.weight).collect();
        self.config.feedback_scores[rng.pick_weighted(&weights)].score
    }
}

/// Everything one synthesizer run produces.
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub users: Vec<User>,
    pub dataset: Dataset,
    pub metadata: DatasetMetadata,
}

pub struct Synthesizer {
    config: GeneratorConfig,
}

impl Synthesizer {
    /// Build a synthesizer. Fails if the config cannot be sampled from.
    pub fn new(config: GeneratorConfig) -> EngagementResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate the full dataset. Same config, same output, every time.
    pub fn run(&self) -> SynthesisOutput {
        let mut rng = SimRng::new(self.config.seed).with_name("synthesizer");

        let users = PopulationGenerator::new(&self.config).generate(&mut rng);
        let sampler = ActivitySampler::new(&self.config);

        let mut records = Vec::with_capacity(self.config.total_records() as usize);
        for user in &users {
            for day in 0..self.config.n_days {
                let activity = sampler.sample(user, day, &mut rng);
                records.push(EngagementRecord::new(user, activity));
            }
        }

        let dataset = Dataset::new(records);
        let metadata = DatasetMetadata::describe(&self.config, dataset.len() as u64);
        log::info!(
            "synthesizer: seed={} produced {} records ({} users x {} days)",
            self.config.seed,
            dataset.len(),
            self.config.n_users,
            self.config.n_days
        );

        SynthesisOutput { users, dataset, metadata }
    }

    /// Write the table and its sidecar. Both are encoded in memory and
    /// committed together.
    pub fn write_outputs(
        output: &SynthesisOutput,
        store: &OutputStore,
    ) -> EngagementResult<Vec<PathBuf>> {
        let csv_bytes = output.dataset.to_csv_bytes()?;
        let metadata_json = output.metadata.to_json_pretty()?;

        let mut staging = store.begin();
        staging.stage_bytes(DATASET_FILE, &csv_bytes)?;
        staging.stage_bytes(METADATA_FILE, metadata_json.as_bytes())?;
        let written = staging.commit()?;

        log::info!("synthesizer: dataset saved to {}", store.path_for(DATASET_FILE).display());
        Ok(written)
    }
}

/// Log the shape and category breakdown of a freshly generated dataset.
pub fn log_distribution_summary(dataset: &Dataset) {
    log::info!(
        "dataset shape: ({}, {})",
        dataset.len(),
        crate::types::DATASET_COLUMNS.len()
    );
    for (device, n) in dataset.value_counts(|r| r.device.as_str()) {
        log::info!("device {device}: {n}");
    }
    for (location, n) in dataset.value_counts(|r| r.location.as_str()).into_iter().take(10) {
        log::info!("location {location}: {n}");
    }
    for (network, n) in dataset.value_counts(|r| r.network.as_str()) {
        log::info!("network {network}: {n}");
    }
}
