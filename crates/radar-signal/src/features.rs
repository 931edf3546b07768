//! Feature extraction from batches of overheard frames.
//!
//! Each polling interval yields a batch of [`ObservationRecord`]s. The
//! extractor reduces the batch to a [`FeatureVector`]:
//!
//! - signal-strength mean and variance (multipath fluctuation)
//! - phase variance, using the timestamp proxy where phase is missing
//! - spectral energy of the ordered strength sequence
//! - phase drift relative to the previous batch
//!
//! The only state carried between batches is the previous mean phase.

use radar_core::{DisturbanceScore, FeatureVector, ObservationRecord};
use serde::{Deserialize, Serialize};

use crate::scoring::ScoreWeights;
use crate::spectral::{SpectralAnalyzer, SpectralEnergy};

/// Mean and population variance; `None` for an empty set
fn mean_and_variance(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some((mean, variance))
}

/// Stateful batch → features → score transform
pub struct FeatureExtractor {
    spectral: SpectralAnalyzer,
    weights: ScoreWeights,

    /// Mean phase of the most recent non-empty batch
    previous_mean_phase: Option<f64>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self {
            spectral: SpectralAnalyzer::new(),
            weights: ScoreWeights::default(),
            previous_mean_phase: None,
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_spectral(mut self, spectral: SpectralAnalyzer) -> Self {
        self.spectral = spectral;
        self
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn previous_mean_phase(&self) -> Option<f64> {
        self.previous_mean_phase
    }

    /// Reduce a batch of records to a feature vector.
    ///
    /// Never fails: missing fields and degenerate batches produce zeros.
    pub fn extract_features(&mut self, records: &[ObservationRecord]) -> FeatureVector {
        if records.is_empty() {
            return FeatureVector::default();
        }

        let strengths: Vec<f64> = records
            .iter()
            .filter_map(|record| record.signal_strength)
            .collect();

        let phases: Vec<f64> = records
            .iter()
            .map(ObservationRecord::effective_phase)
            .collect();

        let (signal_mean, signal_variance) = mean_and_variance(&strengths).unwrap_or((0.0, 0.0));
        let (mean_phase, phase_variance) = mean_and_variance(&phases).unwrap_or((0.0, 0.0));

        let spectral = self.spectral.energy(&strengths);
        if spectral.is_numeric_failure() {
            tracing::debug!(
                samples = strengths.len(),
                "Spectral energy degraded to zero: {:?}",
                spectral
            );
        }

        let phase_delta = self.phase_delta(mean_phase);

        tracing::trace!(
            records = records.len(),
            with_strength = strengths.len(),
            "Extracted batch features"
        );

        FeatureVector {
            signal_mean,
            signal_variance,
            phase_variance,
            spectral_energy: spectral.value(),
            phase_delta,
            sample_count: records.len(),
        }
    }

    /// Score a feature vector with this extractor's weights
    pub fn extract_disturbance_score(&self, features: &FeatureVector) -> DisturbanceScore {
        self.weights.score(features)
    }

    /// Spectral energy of a strength sequence, exposed for diagnostics
    pub fn spectral_energy(&mut self, strengths: &[f64]) -> SpectralEnergy {
        self.spectral.energy(strengths)
    }

    /// Drift against the previous batch, then remember the new mean.
    /// A non-finite mean yields 0.0 and leaves the memory as it was.
    fn phase_delta(&mut self, mean_phase: f64) -> f64 {
        if !mean_phase.is_finite() {
            return 0.0;
        }

        let delta = match self.previous_mean_phase {
            Some(previous) => (mean_phase - previous).abs(),
            None => 0.0,
        };

        self.previous_mean_phase = Some(mean_phase);
        delta
    }
}

/// Per-feature enable switches applied before scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    /// Signal-strength mean and variance
    pub signal_enabled: bool,
    /// Phase variance and phase delta
    pub phase_enabled: bool,
    /// Spectral energy
    pub spectral_enabled: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            signal_enabled: true,
            phase_enabled: true,
            spectral_enabled: true,
        }
    }
}

impl FeatureToggles {
    /// Zero out disabled features
    pub fn apply(&self, mut features: FeatureVector) -> FeatureVector {
        if !self.signal_enabled {
            features.signal_mean = 0.0;
            features.signal_variance = 0.0;
        }
        if !self.phase_enabled {
            features.phase_variance = 0.0;
            features.phase_delta = 0.0;
        }
        if !self.spectral_enabled {
            features.spectral_energy = 0.0;
        }
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn record(ts: f64, strength: Option<f64>, phase: Option<f64>) -> ObservationRecord {
        ObservationRecord {
            timestamp: ts,
            signal_strength: strength,
            phase,
            classification: 8,
        }
    }

    #[test]
    fn test_empty_batch() {
        let mut extractor = FeatureExtractor::new();
        let features = extractor.extract_features(&[]);

        assert_eq!(features, FeatureVector::default());
        assert_eq!(features.sample_count, 0);
        assert!(extractor.previous_mean_phase().is_none());
    }

    #[test]
    fn test_constant_strength_zero_variance() {
        let mut extractor = FeatureExtractor::new();
        let records: Vec<_> = (0..20)
            .map(|i| record(i as f64 * 0.01, Some(-61.0), None))
            .collect();

        let features = extractor.extract_features(&records);
        assert_eq!(features.signal_variance, 0.0);
        assert_eq!(features.signal_mean, -61.0);
        assert_eq!(features.sample_count, 20);
    }

    #[test]
    fn test_missing_strength_yields_zero_signal_features() {
        let mut extractor = FeatureExtractor::new();
        let records = [
            record(0.1, None, Some(0.5)),
            record(0.2, None, Some(1.5)),
        ];

        let features = extractor.extract_features(&records);
        assert_eq!(features.signal_mean, 0.0);
        assert_eq!(features.signal_variance, 0.0);
        assert_eq!(features.spectral_energy, 0.0);
        // var([0.5, 1.5]) = 0.25
        assert!((features.phase_variance - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_signal_statistics_skip_missing() {
        let mut extractor = FeatureExtractor::new();
        let records = [
            record(0.0, Some(-40.0), Some(0.0)),
            record(0.0, None, Some(0.0)),
            record(0.0, Some(-60.0), Some(0.0)),
        ];

        let features = extractor.extract_features(&records);
        assert_eq!(features.signal_mean, -50.0);
        assert_eq!(features.signal_variance, 100.0);
        assert_eq!(features.sample_count, 3);
    }

    #[test]
    fn test_phase_proxy_from_timestamp() {
        let mut extractor = FeatureExtractor::new();
        // Proxies: 0.0 and π
        let records = [record(10.0, None, None), record(10.5, None, None)];

        let features = extractor.extract_features(&records);
        let expected = (PI / 2.0).powi(2);
        assert!((features.phase_variance - expected).abs() < 1e-9);
    }

    #[test]
    fn test_single_strength_sample_no_spectrum() {
        let mut extractor = FeatureExtractor::new();
        let features = extractor.extract_features(&[record(0.0, Some(-50.0), Some(0.0))]);
        assert_eq!(features.spectral_energy, 0.0);
    }

    #[test]
    fn test_phase_delta_tracks_previous_batch() {
        let mut extractor = FeatureExtractor::new();

        let first = extractor.extract_features(&[record(0.0, None, Some(1.0))]);
        assert_eq!(first.phase_delta, 0.0);
        assert_eq!(extractor.previous_mean_phase(), Some(1.0));

        let second = extractor.extract_features(&[
            record(0.0, None, Some(2.0)),
            record(0.0, None, Some(3.0)),
        ]);
        assert!((second.phase_delta - 1.5).abs() < 1e-12);

        let third = extractor.extract_features(&[record(0.0, None, Some(0.5))]);
        assert!((third.phase_delta - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_batch_keeps_phase_memory() {
        let mut extractor = FeatureExtractor::new();
        extractor.extract_features(&[record(0.0, None, Some(1.0))]);
        extractor.extract_features(&[]);

        let next = extractor.extract_features(&[record(0.0, None, Some(1.25))]);
        assert!((next.phase_delta - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_nan_phase_keeps_phase_memory() {
        let mut extractor = FeatureExtractor::new();
        extractor.extract_features(&[record(0.0, None, Some(1.0))]);

        let poisoned = extractor.extract_features(&[record(0.0, None, Some(f64::NAN))]);
        assert_eq!(poisoned.phase_delta, 0.0);
        assert_eq!(extractor.previous_mean_phase(), Some(1.0));

        let next = extractor.extract_features(&[record(0.0, None, Some(1.5))]);
        assert!((next.phase_delta - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_independent_extractors() {
        let mut a = FeatureExtractor::new();
        let mut b = FeatureExtractor::new();

        a.extract_features(&[record(0.0, None, Some(3.0))]);
        let from_b = b.extract_features(&[record(0.0, None, Some(1.0))]);

        assert_eq!(from_b.phase_delta, 0.0);
        assert_eq!(a.previous_mean_phase(), Some(3.0));
    }

    #[test]
    fn test_non_finite_strength_absorbed() {
        let mut extractor = FeatureExtractor::new();
        let records = [
            record(0.0, Some(-50.0), Some(0.0)),
            record(0.0, Some(f64::INFINITY), Some(0.0)),
        ];

        let features = extractor.extract_features(&records);
        assert_eq!(features.spectral_energy, 0.0);
    }

    #[test]
    fn test_static_scene_scenario() {
        let records = [
            record(0.0, Some(-50.0), Some(0.0)),
            record(0.1, Some(-50.0), Some(0.0)),
            record(0.2, Some(-50.0), Some(0.0)),
        ];

        // Full-spectrum energy keeps the DC term: (3·50)²/3
        let mut extractor = FeatureExtractor::new();
        let features = extractor.extract_features(&records);
        assert_eq!(features.signal_variance, 0.0);
        assert_eq!(features.phase_variance, 0.0);
        assert!((features.spectral_energy - 7500.0).abs() < 1e-6);

        // With DC excluded the constant signal has no AC energy
        let mut ac_only = FeatureExtractor::new()
            .with_spectral(SpectralAnalyzer::new().with_dc_excluded(true));
        let features = ac_only.extract_features(&records);
        assert!(features.spectral_energy < 1e-9);

        let score = ac_only.extract_disturbance_score(&features);
        assert!(score < 1e-9, "static scene should score near zero, got {}", score);
    }

    #[test]
    fn test_moving_scene_scores_higher() {
        let mut extractor = FeatureExtractor::new()
            .with_spectral(SpectralAnalyzer::new().with_dc_excluded(true));

        let still: Vec<_> = (0..30)
            .map(|i| record(i as f64 * 0.01, Some(-50.0 + if i % 2 == 0 { 0.5 } else { -0.5 }), Some(1.0)))
            .collect();
        let moving: Vec<_> = (0..30)
            .map(|i| record(i as f64 * 0.01, Some(-50.0 + 6.0 * ((i as f64) * 0.9).sin()), Some(1.0)))
            .collect();

        let still_score = {
            let f = extractor.extract_features(&still);
            extractor.extract_disturbance_score(&f)
        };
        let moving_score = {
            let f = extractor.extract_features(&moving);
            extractor.extract_disturbance_score(&f)
        };

        assert!(moving_score > still_score);
    }

    #[test]
    fn test_toggles_zero_disabled_features() {
        let features = FeatureVector {
            signal_mean: -50.0,
            signal_variance: 4.0,
            phase_variance: 1.0,
            spectral_energy: 12.0,
            phase_delta: 0.5,
            sample_count: 4,
        };

        let toggles = FeatureToggles {
            signal_enabled: false,
            phase_enabled: true,
            spectral_enabled: false,
        };
        let masked = toggles.apply(features);

        assert_eq!(masked.signal_variance, 0.0);
        assert_eq!(masked.signal_mean, 0.0);
        assert_eq!(masked.spectral_energy, 0.0);
        assert_eq!(masked.phase_variance, 1.0);
        assert_eq!(masked.sample_count, 4);
        assert_eq!(FeatureToggles::default().apply(features), features);
    }
}
