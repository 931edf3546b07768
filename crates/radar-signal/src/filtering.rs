//! Record filtering ahead of feature extraction.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use radar_core::ObservationRecord;

/// Allow-list of frame classifications; empty means everything passes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    allowed_classifications: BTreeSet<u8>,
}

impl RecordFilter {
    /// Filter that passes every record
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn with_classifications<I>(classifications: I) -> Self
    where
        I: IntoIterator<Item = u8>,
    {
        Self {
            allowed_classifications: classifications.into_iter().collect(),
        }
    }

    pub fn is_pass_through(&self) -> bool {
        self.allowed_classifications.is_empty()
    }

    pub fn allows(&self, record: &ObservationRecord) -> bool {
        self.is_pass_through() || self.allowed_classifications.contains(&record.classification)
    }

    /// Records that pass, in their original order
    pub fn apply(&self, records: &[ObservationRecord]) -> Vec<ObservationRecord> {
        records.iter().copied().filter(|r| self.allows(r)).collect()
    }
}
