//! The persisted engagement table: CSV encoding, decoding and counts.

use crate::{
    error::{EngagementError, EngagementResult},
    model::EngagementRecord,
    types::DATASET_COLUMNS,
};
use std::{collections::BTreeMap, io::Read, path::Path};

/// All engagement records in user-major, day-minor order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    records: Vec<EngagementRecord>,
}

impl Dataset {
    pub fn new(records: Vec<EngagementRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[EngagementRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn unique_users(&self) -> usize {
        let mut ids: Vec<_> = self.records.iter().map(|r| r.user_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Record counts per category, largest first, ties in key order.
    pub fn value_counts<F>(&self, key: F) -> Vec<(String, usize)>
    where
        F: Fn(&EngagementRecord) -> &str,
    {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for r in &self.records {
            *counts.entry(key(r)).or_insert(0) += 1;
        }
        let mut counts: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(k, n)| (k.to_string(), n))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    /// Encode as CSV with the fixed header, even when empty.
    pub fn to_csv_bytes(&self) -> EngagementResult<Vec<u8>> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        wtr.write_record(DATASET_COLUMNS)?;
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.into_inner()
            .map_err(|e| EngagementError::Io(e.into_error()))
    }

    /// Decode a table. The header must match the fixed column list exactly;
    /// any row that does not parse into a typed record aborts the read.
    pub fn from_reader<R: Read>(reader: R) -> EngagementResult<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        check_header(rdr.headers()?)?;

        let mut records = Vec::new();
        for row in rdr.deserialize::<EngagementRecord>() {
            records.push(row?);
        }
        Ok(Self { records })
    }

    pub fn read_csv(path: &Path) -> EngagementResult<Self> {
        let file = std::fs::File::open(path)?;
        let dataset = Self::from_reader(std::io::BufReader::new(file))?;
        log::info!("dataset: loaded {} records from {}", dataset.len(), path.display());
        Ok(dataset)
    }
}

fn check_header(header: &csv::StringRecord) -> EngagementResult<()> {
    let found: Vec<&str> = header.iter().map(str::trim).collect();
    for position in 0..DATASET_COLUMNS.len().max(found.len()) {
        let expected = DATASET_COLUMNS.get(position).copied();
        let actual = found.get(position).copied();
        if expected != actual {
            return Err(EngagementError::SchemaMismatch {
                position,
                expected: expected.unwrap_or("<end of header>").to_string(),
                found: actual.unwrap_or("<missing>").to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "user_id,age,gender,location,device,network,date,clicks,session_duration,feature_version,feedback_score,retention_flag,data_used_mb";

    #[test]
    fn blank_feedback_and_float_scores_parse() {
        let csv = format!(
            "{HEADER}\n0,30,F,Zomba,Android,TNM,2025-11-01,4,300,A,,1,12.5\n\
             0,30,F,Zomba,Android,TNM,2025-11-02,2,100,B,4.0,0,0.0\n"
        );
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records()[0].feedback_score, None);
        assert_eq!(ds.records()[1].feedback_score, Some(4));
        assert!(ds.records()[0].retention_flag);
        assert!(!ds.records()[1].retention_flag);
    }

    #[test]
    fn wrong_header_is_a_schema_mismatch() {
        let csv = "user_id,age\n0,30\n";
        let err = Dataset::from_reader(csv.as_bytes()).unwrap_err();
        match err {
            EngagementError::SchemaMismatch { position, .. } => assert_eq!(position, 2),
            other => panic!("expected schema mismatch, got {other}"),
        }
    }

    #[test]
    fn corrupt_row_is_fatal() {
        let csv = format!("{HEADER}\n0,thirty,F,Zomba,Android,TNM,2025-11-01,4,300,A,,1,12.5\n");
        assert!(Dataset::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn empty_dataset_still_has_header() {
        let bytes = Dataset::default().to_csv_bytes().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().trim_end(), HEADER);
    }
}
