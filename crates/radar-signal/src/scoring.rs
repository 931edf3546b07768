//! Disturbance scoring: collapse a feature vector into one scalar in `[0, 1]`.
//!
//! score = min((w_sv·signal_variance + w_pv·phase_variance
//!              + w_se·spectral_energy + w_pd·phase_delta) / scale, 1)
//!
//! The weights and scale are calibration constants with no physical
//! derivation; they live in [`ScoreWeights`] so deployments can tune them.

use radar_core::{DisturbanceScore, Error, FeatureVector, Result};
use serde::{Deserialize, Serialize};

/// Weights applied to each feature before normalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub signal_variance: f64,
    pub phase_variance: f64,
    pub spectral_energy: f64,
    pub phase_delta: f64,

    /// Divisor mapping the weighted sum onto `[0, 1]`
    pub scale: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            signal_variance: 0.3,
            phase_variance: 0.2,
            spectral_energy: 0.3,
            phase_delta: 0.2,
            scale: 100.0,
        }
    }
}

impl ScoreWeights {
    /// Reject weights that would break the `[0, 1]` contract
    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("signal_variance", self.signal_variance),
            ("phase_variance", self.phase_variance),
            ("spectral_energy", self.spectral_energy),
            ("phase_delta", self.phase_delta),
        ];

        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidParameter { name, value });
            }
        }

        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "scale",
                value: self.scale,
            });
        }

        Ok(())
    }

    /// Weighted sum before scaling
    pub fn weighted_sum(&self, features: &FeatureVector) -> f64 {
        self.signal_variance * features.signal_variance
            + self.phase_variance * features.phase_variance
            + self.spectral_energy * features.spectral_energy
            + self.phase_delta * features.phase_delta
    }

    /// Score a feature vector. Pure; never fails.
    pub fn score(&self, features: &FeatureVector) -> DisturbanceScore {
        let raw = self.weighted_sum(features) / self.scale;

        if raw.is_nan() {
            return 0.0;
        }

        raw.clamp(0.0, 1.0)
    }
}
