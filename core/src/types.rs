//! Shared primitive types used across the whole pipeline.

/// A synthetic user identifier. Contiguous and 0-indexed.
pub type UserId = u32;

/// A simulated day offset. Day 0 is the configured start date.
pub type DayIndex = u32;

/// The fixed column order of the persisted dataset table.
pub const DATASET_COLUMNS: [&str; 13] = [
    "user_id",
    "age",
    "gender",
    "location",
    "device",
    "network",
    "date",
    "clicks",
    "session_duration",
    "feature_version",
    "feedback_score",
    "retention_flag",
    "data_used_mb",
];
