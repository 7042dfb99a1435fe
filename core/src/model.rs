//! Row types for the synthetic population and the persisted table.

use crate::types::UserId;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// A synthetic individual. Created once by the synthesizer; immutable after.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    pub age: u32,
    pub gender: String,
    pub location: String,
    pub device: String,
    pub network: String,
}

/// Per-day behavior sampled for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub clicks: u32,
    pub session_duration: u32,
    pub feature_version: String,
    pub feedback_score: Option<u8>,
    pub retention_flag: bool,
    pub data_used_mb: f64,
}

/// One row of the dataset: a user's static fields plus one day of activity.
/// Field order is the column order on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub user_id: UserId,
    pub age: u32,
    pub gender: String,
    pub location: String,
    pub device: String,
    pub network: String,
    pub date: NaiveDate,
    pub clicks: u32,
    pub session_duration: u32,
    pub feature_version: String,
    #[serde(deserialize_with = "lenient_score")]
    pub feedback_score: Option<u8>,
    #[serde(with = "flag_as_int")]
    pub retention_flag: bool,
    pub data_used_mb: f64,
}

impl EngagementRecord {
    pub fn new(user: &User, activity: DailyActivity) -> Self {
        Self {
            user_id: user.user_id,
            age: user.age,
            gender: user.gender.clone(),
            location: user.location.clone(),
            device: user.device.clone(),
            network: user.network.clone(),
            date: activity.date,
            clicks: activity.clicks,
            session_duration: activity.session_duration,
            feature_version: activity.feature_version,
            feedback_score: activity.feedback_score,
            retention_flag: activity.retention_flag,
            data_used_mb: activity.data_used_mb,
        }
    }
}

/// Accepts `4` as well as `4.0`, which spreadsheet tools write for
/// integer columns that contain blanks.
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let value: f64 = raw
        .parse()
        .map_err(|_| D::Error::custom(format!("feedback_score '{raw}' is not a number")))?;
    if value.fract() != 0.0 || !(1.0..=5.0).contains(&value) {
        return Err(D::Error::custom(format!("feedback_score {raw} is outside 1..=5")));
    }
    Ok(Some(value as u8))
}

/// Retention is persisted as `0`/`1`.
mod flag_as_int {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*flag))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim() {
            "1" | "true" | "True" => Ok(true),
            "0" | "false" | "False" => Ok(false),
            other => Err(D::Error::custom(format!("retention_flag '{other}' is not 0 or 1"))),
        }
    }
}
