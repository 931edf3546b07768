//! Fundamental types for the ambient radar system.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Scalar motion likelihood for one batch of observations, in `[0, 1]`.
pub type DisturbanceScore = f64;

/// Frame classification tags as reported by the capture layer.
///
/// The value packs the 802.11 frame type and subtype; the signal math never
/// reads it, it only exists so upstream stages can filter records.
pub mod classification {
    pub const MANAGEMENT_BEACON: u8 = 8;
    pub const MANAGEMENT_PROBE_RESPONSE: u8 = 5;
    pub const DATA: u8 = 32;
    pub const DATA_QOS: u8 = 40;
}

/// Seconds since the Unix epoch, from the system wall clock.
pub fn wall_clock_secs() -> f64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(0) as f64 / 1_000_000_000.0
}

/// One timestamped radio measurement from the capture collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Capture time in seconds (monotonic or wall clock)
    pub timestamp: f64,

    /// Received signal strength proxy (dBm), absent when the radio did not report it
    pub signal_strength: Option<f64>,

    /// Phase in radians, absent on most commodity hardware
    pub phase: Option<f64>,

    /// Frame type/subtype tag, passed through for filtering
    pub classification: u8,
}

impl ObservationRecord {
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            signal_strength: None,
            phase: None,
            classification: classification::MANAGEMENT_BEACON,
        }
    }

    pub fn with_signal_strength(mut self, signal_strength: f64) -> Self {
        self.signal_strength = Some(signal_strength);
        self
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_classification(mut self, classification: u8) -> Self {
        self.classification = classification;
        self
    }

    /// Phase used for feature extraction.
    ///
    /// Falls back to the fractional-second part of the timestamp scaled to
    /// `[0, 2π)` when the hardware reported no phase.
    pub fn effective_phase(&self) -> f64 {
        match self.phase {
            Some(phase) => phase,
            None => Self::timestamp_phase_proxy(self.timestamp),
        }
    }

    /// Deterministic phase proxy derived from a timestamp
    pub fn timestamp_phase_proxy(timestamp: f64) -> f64 {
        timestamp.rem_euclid(1.0) * TAU
    }
}

/// Motion-sensitive features extracted from one observation batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Mean of the reported signal strengths
    pub signal_mean: f64,
    /// Population variance of the reported signal strengths
    pub signal_variance: f64,
    /// Population variance of the (possibly proxied) phases
    pub phase_variance: f64,
    /// Spectral energy of the signal-strength sequence
    pub spectral_energy: f64,
    /// Absolute change of mean phase since the previous batch
    pub phase_delta: f64,
    /// Number of records in the batch
    pub sample_count: usize,
}

impl FeatureVector {
    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }
}

/// Summary of the spatial grid handed to the visualization collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GridStatistics {
    pub rows: usize,
    pub cols: usize,
    pub max_value: f64,
    pub mean_value: f64,
    /// Cells above the activity threshold
    pub active_cell_count: usize,
    /// Number of averaged bins retained in history
    pub history_length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_proxy_uses_fractional_second() {
        let record = ObservationRecord::new(12.25);
        assert!((record.effective_phase() - 0.25 * TAU).abs() < 1e-12);
    }

    #[test]
    fn test_explicit_phase_wins_over_proxy() {
        let record = ObservationRecord::new(12.25).with_phase(1.0);
        assert_eq!(record.effective_phase(), 1.0);
    }

    #[test]
    fn test_phase_proxy_range() {
        for ts in [-3.75, -0.1, 0.0, 0.999_999, 1_700_000_000.5] {
            let proxy = ObservationRecord::timestamp_phase_proxy(ts);
            assert!((0.0..TAU).contains(&proxy), "proxy {} out of range for {}", proxy, ts);
        }
    }

    #[test]
    fn test_empty_feature_vector() {
        let features = FeatureVector::default();
        assert!(features.is_empty());
        assert_eq!(features.signal_variance, 0.0);
        assert_eq!(features.spectral_energy, 0.0);
    }

    #[test]
    fn test_record_serde() {
        let record = ObservationRecord::new(1.5)
            .with_signal_strength(-48.0)
            .with_classification(classification::DATA);
        let json = serde_json::to_string(&record).unwrap();
        let back: ObservationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert!(back.phase.is_none());
    }
}
