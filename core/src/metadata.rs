//! Metadata sidecar describing a generated dataset.
//!
//! Written once next to the table and never read back by the pipeline.
//! Every field is derived from the config and the record count, so the
//! sidecar is as reproducible as the table itself.

use crate::config::{Contributor, GeneratorConfig};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationParameters {
    pub n_users: u32,
    pub n_days: u32,
    pub seed: u64,
    pub total_records: u64,
    pub locations: String,
    pub devices: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetMetadata {
    pub title: String,
    pub group: Vec<Contributor>,
    pub date: NaiveDate,
    pub generation_method: String,
    pub parameters: GenerationParameters,
    pub source: String,
    pub license: String,
    pub contact: String,
    pub context: String,
}

impl DatasetMetadata {
    pub fn describe(config: &GeneratorConfig, total_records: u64) -> Self {
        let meta = &config.metadata;
        Self {
            title: meta.title.clone(),
            group: meta.group.clone(),
            date: meta.date,
            generation_method: meta.generation_method.clone(),
            parameters: GenerationParameters {
                n_users: config.n_users,
                n_days: config.n_days,
                seed: config.seed,
                total_records,
                locations: meta.locations_note.clone(),
                devices: meta.devices_note.clone(),
            },
            source: meta.source.clone(),
            license: meta.license.clone(),
            contact: meta.contact.clone(),
            context: meta.context.clone(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
