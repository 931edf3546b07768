//! Spectral energy of a signal-strength sequence.
//!
//! Temporal fluctuation of received signal strength is a motion cue: a body
//! moving through the propagation path modulates the multipath sum seen at
//! the receiver. The discrete Fourier transform of the ordered strength
//! sequence spreads that fluctuation over frequency bins:
//!
//! X_k = Σ_n x_n · e^(-j·2π·k·n/N)
//!
//! and the energy reported here is Σ_k |X_k|² / N.
//!
//! A constant signal is DC-only: all of its energy sits in bin 0. The
//! analyzer can be told to drop that bin so that only the fluctuating (AC)
//! part contributes.

use num_complex::Complex;
use rustfft::FftPlanner;

/// Minimum number of samples for a meaningful spectrum
pub const MIN_SPECTRAL_SAMPLES: usize = 2;

/// Outcome of a spectral energy computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpectralEnergy {
    /// Transform completed with a finite energy
    Computed(f64),

    /// Transform was skipped or produced garbage; contributes zero
    Degraded(DegradedReason),
}

/// Why a spectral computation fell back to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedReason {
    /// Fewer than [`MIN_SPECTRAL_SAMPLES`] samples
    InsufficientSamples { available: usize },

    /// An input sample was NaN or infinite
    NonFiniteInput { index: usize },

    /// The transform overflowed
    NonFiniteOutput,
}

impl SpectralEnergy {
    /// Energy value, zero when degraded
    pub fn value(&self) -> f64 {
        match self {
            SpectralEnergy::Computed(energy) => *energy,
            SpectralEnergy::Degraded(_) => 0.0,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SpectralEnergy::Degraded(_))
    }

    /// True for numeric failures, as opposed to plain short input
    pub fn is_numeric_failure(&self) -> bool {
        matches!(
            self,
            SpectralEnergy::Degraded(DegradedReason::NonFiniteInput { .. })
                | SpectralEnergy::Degraded(DegradedReason::NonFiniteOutput)
        )
    }
}

/// Computes spectral energy, reusing FFT plans across batch sizes
pub struct SpectralAnalyzer {
    planner: FftPlanner<f64>,

    /// Drop bin 0 (the mean) from the energy sum
    exclude_dc: bool,
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectralAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            exclude_dc: false,
        }
    }

    pub fn with_dc_excluded(mut self, exclude_dc: bool) -> Self {
        self.exclude_dc = exclude_dc;
        self
    }

    pub fn excludes_dc(&self) -> bool {
        self.exclude_dc
    }

    /// Per-bin power |X_k|² / N of the sequence
    pub fn power_spectrum(&mut self, samples: &[f64]) -> Result<Vec<f64>, DegradedReason> {
        if samples.len() < MIN_SPECTRAL_SAMPLES {
            return Err(DegradedReason::InsufficientSamples {
                available: samples.len(),
            });
        }

        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(DegradedReason::NonFiniteInput { index });
        }

        let n = samples.len();
        let fft = self.planner.plan_fft_forward(n);

        let mut buffer: Vec<Complex<f64>> =
            samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
        fft.process(&mut buffer);

        let power: Vec<f64> = buffer.iter().map(|c| c.norm_sqr() / n as f64).collect();

        if power.iter().any(|p| !p.is_finite()) {
            return Err(DegradedReason::NonFiniteOutput);
        }

        Ok(power)
    }

    /// Total spectral energy of the sequence
    pub fn energy(&mut self, samples: &[f64]) -> SpectralEnergy {
        let skip = usize::from(self.exclude_dc);

        match self.power_spectrum(samples) {
            Ok(power) => {
                let energy: f64 = power.iter().skip(skip).sum();
                if energy.is_finite() {
                    SpectralEnergy::Computed(energy)
                } else {
                    SpectralEnergy::Degraded(DegradedReason::NonFiniteOutput)
                }
            }
            Err(reason) => SpectralEnergy::Degraded(reason),
        }
    }
}
