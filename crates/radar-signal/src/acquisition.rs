//! Observation sources feeding the pipeline.
//!
//! Real capture (a monitor-mode interface sniffing 802.11 frames) lives
//! outside this crate. It plugs in through [`ObservationSource`], either by
//! implementing the trait directly or by pushing batches into a
//! [`ChannelSource`]. [`SimulatedSource`] produces synthetic traffic for demos
//! and tests on machines without monitor-mode hardware.

use async_trait::async_trait;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tokio::sync::mpsc;

use radar_core::{classification, wall_clock_secs, Error, ObservationRecord, Result};

/// Trait for observation batch producers
#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Start producing batches
    async fn start(&mut self) -> Result<()>;

    /// Stop producing batches
    async fn stop(&mut self) -> Result<()>;

    /// Check if the source is active
    fn is_running(&self) -> bool;

    /// Next batch of records (waits if the source has nothing ready)
    async fn next_batch(&mut self) -> Result<Vec<ObservationRecord>>;

    /// Next batch if one is ready, without waiting
    fn try_next_batch(&mut self) -> Option<Vec<ObservationRecord>>;
}

/// Shape of the synthetic traffic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Records per batch
    pub batch_size: usize,

    /// Mean signal strength (dBm)
    pub base_signal_strength: f64,

    /// Strength noise while someone moves (dB)
    pub motion_noise_std: f64,

    /// Strength noise in a still room (dB)
    pub static_noise_std: f64,

    /// Batches per motion cycle
    pub motion_period: usize,

    /// Leading batches of each cycle that contain motion
    pub motion_batches: usize,

    /// Seconds between consecutive records
    pub record_spacing: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            batch_size: 30,
            base_signal_strength: -50.0,
            motion_noise_std: 5.0,
            static_noise_std: 1.0,
            motion_period: 10,
            motion_batches: 7,
            record_spacing: 0.01,
        }
    }
}

/// Synthetic beacon traffic with periodic bursts of motion
pub struct SimulatedSource {
    config: SimulationConfig,
    rng: ChaCha8Rng,
    motion_noise: Normal<f64>,
    static_noise: Normal<f64>,
    clock: f64,
    batches_emitted: usize,
    batch_limit: Option<usize>,
    is_running: bool,
}

impl SimulatedSource {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        Self::with_rng(config, ChaCha8Rng::from_entropy())
    }

    pub fn seeded(config: SimulationConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: SimulationConfig, rng: ChaCha8Rng) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(Error::Config("simulation batch_size must be positive".into()));
        }
        if config.motion_period == 0 || config.motion_batches > config.motion_period {
            return Err(Error::Config(format!(
                "motion_batches ({}) must not exceed a positive motion_period ({})",
                config.motion_batches, config.motion_period
            )));
        }

        for (name, deviation) in [
            ("motion_noise_std", config.motion_noise_std),
            ("static_noise_std", config.static_noise_std),
        ] {
            if !deviation.is_finite() || deviation < 0.0 {
                return Err(Error::Config(format!(
                    "{} must be finite and non-negative, got {}",
                    name, deviation
                )));
            }
        }

        let motion_noise = Normal::new(0.0, config.motion_noise_std).map_err(|e| {
            Error::Config(format!("motion_noise_std {}: {}", config.motion_noise_std, e))
        })?;
        let static_noise = Normal::new(0.0, config.static_noise_std).map_err(|e| {
            Error::Config(format!("static_noise_std {}: {}", config.static_noise_std, e))
        })?;

        Ok(Self {
            config,
            rng,
            motion_noise,
            static_noise,
            clock: wall_clock_secs(),
            batches_emitted: 0,
            batch_limit: None,
            is_running: false,
        })
    }

    /// Report [`Error::SourceExhausted`] after `limit` batches
    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = Some(limit);
        self
    }

    /// Start the synthetic clock at `start` instead of the wall clock
    pub fn with_start_time(mut self, start: f64) -> Self {
        self.clock = start;
        self
    }

    pub fn batches_emitted(&self) -> usize {
        self.batches_emitted
    }

    /// Whether the next batch falls in the motion part of the cycle
    pub fn next_has_motion(&self) -> bool {
        self.batches_emitted % self.config.motion_period < self.config.motion_batches
    }

    fn generate_batch(&mut self) -> Vec<ObservationRecord> {
        let noise = if self.next_has_motion() {
            self.motion_noise
        } else {
            self.static_noise
        };

        let batch = (0..self.config.batch_size)
            .map(|_| {
                let strength = self.config.base_signal_strength + noise.sample(&mut self.rng);
                let phase = self.rng.gen_range(0.0..TAU);
                let record = ObservationRecord::new(self.clock)
                    .with_signal_strength(strength)
                    .with_phase(phase)
                    .with_classification(classification::MANAGEMENT_BEACON);
                self.clock += self.config.record_spacing;
                record
            })
            .collect();

        self.batches_emitted += 1;
        batch
    }

    fn exhausted(&self) -> bool {
        self.batch_limit
            .map(|limit| self.batches_emitted >= limit)
            .unwrap_or(false)
    }
}

#[async_trait]
impl ObservationSource for SimulatedSource {
    async fn start(&mut self) -> Result<()> {
        self.is_running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.is_running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.is_running
    }

    async fn next_batch(&mut self) -> Result<Vec<ObservationRecord>> {
        if !self.is_running {
            return Err(Error::Acquisition("Simulated source not started".into()));
        }
        if self.exhausted() {
            return Err(Error::SourceExhausted);
        }
        Ok(self.generate_batch())
    }

    fn try_next_batch(&mut self) -> Option<Vec<ObservationRecord>> {
        if !self.is_running || self.exhausted() {
            return None;
        }
        Some(self.generate_batch())
    }
}

/// Source fed by an external capture task through an mpsc channel
pub struct ChannelSource {
    rx: mpsc::Receiver<Vec<ObservationRecord>>,
    is_running: bool,
}

impl ChannelSource {
    /// Create the source and the sender the capture task pushes batches into
    pub fn new(buffer: usize) -> (Self, mpsc::Sender<Vec<ObservationRecord>>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                rx,
                is_running: false,
            },
            tx,
        )
    }
}

#[async_trait]
impl ObservationSource for ChannelSource {
    async fn start(&mut self) -> Result<()> {
        self.is_running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.is_running = false;
        self.rx.close();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.is_running
    }

    async fn next_batch(&mut self) -> Result<Vec<ObservationRecord>> {
        if !self.is_running {
            return Err(Error::Acquisition("Channel source not started".into()));
        }
        self.rx.recv().await.ok_or(Error::SourceExhausted)
    }

    fn try_next_batch(&mut self) -> Option<Vec<ObservationRecord>> {
        if !self.is_running {
            return None;
        }
        self.rx.try_recv().ok()
    }
}
