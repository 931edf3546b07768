//! Spatial disturbance grid.
//!
//! Disturbance scores arrive as a stream; the grid bins them in time and, on
//! every bin flush:
//!
//! 1. averages the bin and records the average in a bounded history
//! 2. decays every cell by a constant factor
//! 3. if the average exceeds the activity threshold, diffuses it over the
//!    grid with a Gaussian kernel centred on a random cell:
//!
//!    cell(i, j) += avg · exp(-d² / 2σ²),  d = |(i, j) - (r, c)|
//!
//! 4. optionally rescales so the hottest cell is exactly 1.0
//!
//! Placement is a single-sensor heuristic. One receiver cannot localize a
//! disturbance, so the centre is drawn from an injected RNG; seeding that
//! RNG makes the heatmap reproducible.

use std::collections::VecDeque;
use std::sync::Arc;

use ndarray::Array2;
use parking_lot::RwLock;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use radar_core::{DisturbanceScore, Error, GridStatistics, Result};

pub const DEFAULT_DECAY_FACTOR: f64 = 0.95;
pub const DEFAULT_ACTIVITY_THRESHOLD: f64 = 0.1;
pub const DEFAULT_DIFFUSION_SIGMA: f64 = 2.0;
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Grid dimensions, binning and diffusion parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub rows: usize,
    pub cols: usize,

    /// Seconds of scores averaged into one flush
    pub bin_duration: f64,

    /// Rescale so the maximum cell is 1.0 after each flush
    pub normalize: bool,

    /// Multiplier applied to every cell once per flush
    pub decay_factor: f64,

    /// Bin average above which a disturbance is diffused; also the
    /// threshold for counting a cell as active
    pub activity_threshold: f64,

    /// Gaussian kernel width in cells
    pub diffusion_sigma: f64,

    /// Number of bin averages retained
    pub history_capacity: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 10,
            cols: 10,
            bin_duration: 1.0,
            normalize: true,
            decay_factor: DEFAULT_DECAY_FACTOR,
            activity_threshold: DEFAULT_ACTIVITY_THRESHOLD,
            diffusion_sigma: DEFAULT_DIFFUSION_SIGMA,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl GridConfig {
    pub fn new(rows: usize, cols: usize, bin_duration: f64, normalize: bool) -> Self {
        Self {
            rows,
            cols,
            bin_duration,
            normalize,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(Error::InvalidDimensions {
                rows: self.rows,
                cols: self.cols,
            });
        }

        if !self.bin_duration.is_finite() || self.bin_duration <= 0.0 {
            return Err(Error::InvalidBinDuration(self.bin_duration));
        }

        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return Err(Error::InvalidParameter {
                name: "decay_factor",
                value: self.decay_factor,
            });
        }

        if !self.activity_threshold.is_finite() || self.activity_threshold < 0.0 {
            return Err(Error::InvalidParameter {
                name: "activity_threshold",
                value: self.activity_threshold,
            });
        }

        if !self.diffusion_sigma.is_finite() || self.diffusion_sigma <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "diffusion_sigma",
                value: self.diffusion_sigma,
            });
        }

        if self.history_capacity == 0 {
            return Err(Error::Config("history_capacity must be positive".into()));
        }

        Ok(())
    }
}

/// What a bin flush did to the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinFlush {
    /// Mean of the scores in the flushed bin
    pub average: f64,

    /// Diffusion centre `(row, col)`, `None` when below the activity threshold
    pub center: Option<(usize, usize)>,
}

/// Time-binned, decaying disturbance heatmap
pub struct SpatialGrid<R: Rng = ChaCha8Rng> {
    config: GridConfig,
    cells: Array2<f64>,
    pending_scores: Vec<f64>,
    bin_started_at: f64,
    history: VecDeque<f64>,
    rng: R,
}

impl SpatialGrid<ChaCha8Rng> {
    /// Create a grid with an entropy-seeded RNG
    pub fn new(config: GridConfig, now: f64) -> Result<Self> {
        Self::with_rng(config, ChaCha8Rng::from_entropy(), now)
    }

    /// Create a grid whose diffusion placement is reproducible
    pub fn seeded(config: GridConfig, seed: u64, now: f64) -> Result<Self> {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed), now)
    }
}

impl<R: Rng> SpatialGrid<R> {
    pub fn with_rng(config: GridConfig, rng: R, now: f64) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            cells: Array2::zeros((config.rows, config.cols)),
            pending_scores: Vec::new(),
            bin_started_at: now,
            history: VecDeque::with_capacity(config.history_capacity),
            config,
            rng,
        })
    }

    /// Feed one score. Flushes the bin once `bin_duration` has elapsed.
    ///
    /// Non-finite scores are recorded as 0.0 and negative scores are
    /// clamped to 0.0 so cells can never go negative. A non-finite `now`
    /// never closes the bin.
    pub fn update(&mut self, score: DisturbanceScore, now: f64) -> Option<BinFlush> {
        let score = if score.is_finite() { score.max(0.0) } else { 0.0 };
        self.pending_scores.push(score);

        if !now.is_finite() || now - self.bin_started_at < self.config.bin_duration {
            return None;
        }

        let flush = self.flush_bin();
        self.bin_started_at = now;
        self.pending_scores.clear();
        flush
    }

    fn flush_bin(&mut self) -> Option<BinFlush> {
        if self.pending_scores.is_empty() {
            return None;
        }

        let average = self.pending_scores.iter().sum::<f64>() / self.pending_scores.len() as f64;

        if self.history.len() == self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(average);

        let decay = self.config.decay_factor;
        self.cells.mapv_inplace(|v| v * decay);

        let center = if average > self.config.activity_threshold {
            let row = self.rng.gen_range(0..self.config.rows);
            let col = self.rng.gen_range(0..self.config.cols);
            self.diffuse(average, row, col);
            Some((row, col))
        } else {
            None
        };

        if self.config.normalize {
            self.normalize();
        }

        tracing::debug!(
            average,
            center = ?center,
            pending = self.pending_scores.len(),
            "Flushed disturbance bin"
        );

        Some(BinFlush { average, center })
    }

    /// Add a Gaussian bump of height `amplitude` centred on `(row, col)`
    fn diffuse(&mut self, amplitude: f64, row: usize, col: usize) {
        let two_sigma_sq = 2.0 * self.config.diffusion_sigma.powi(2);

        for ((i, j), cell) in self.cells.indexed_iter_mut() {
            let di = i as f64 - row as f64;
            let dj = j as f64 - col as f64;
            let dist_sq = di * di + dj * dj;
            *cell += amplitude * (-dist_sq / two_sigma_sq).exp();
        }
    }

    fn normalize(&mut self) {
        let max = self.max_value();
        if max > 0.0 {
            self.cells.mapv_inplace(|v| v / max);
        }
    }

    fn max_value(&self) -> f64 {
        self.cells.iter().copied().fold(0.0, f64::max)
    }

    /// Independent copy of the cell matrix (row-major)
    pub fn snapshot(&self) -> Array2<f64> {
        self.cells.clone()
    }

    pub fn statistics(&self) -> GridStatistics {
        let threshold = self.config.activity_threshold;

        GridStatistics {
            rows: self.config.rows,
            cols: self.config.cols,
            max_value: self.max_value(),
            mean_value: self.cells.mean().unwrap_or(0.0),
            active_cell_count: self.cells.iter().filter(|&&v| v > threshold).count(),
            history_length: self.history.len(),
        }
    }

    /// Zero the grid, drop history and pending scores, restart the bin clock
    pub fn reset(&mut self, now: f64) {
        self.cells.fill(0.0);
        self.history.clear();
        self.pending_scores.clear();
        self.bin_started_at = now;
    }

    /// Bin averages, oldest first
    pub fn history(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    pub fn pending_len(&self) -> usize {
        self.pending_scores.len()
    }

    pub fn bin_started_at(&self) -> f64 {
        self.bin_started_at
    }

    /// Sum of all cells
    pub fn total_mass(&self) -> f64 {
        self.cells.sum()
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }
}

/// Cloneable handle for one writer and any number of snapshot readers.
///
/// A flush runs entirely under the write lock, so readers see the grid either
/// before or after a flush, never halfway through decay or diffusion.
pub struct SharedGrid<R: Rng = ChaCha8Rng> {
    inner: Arc<RwLock<SpatialGrid<R>>>,
}

impl<R: Rng> Clone for SharedGrid<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Rng> SharedGrid<R> {
    pub fn new(grid: SpatialGrid<R>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(grid)),
        }
    }

    pub fn update(&self, score: DisturbanceScore, now: f64) -> Option<BinFlush> {
        self.inner.write().update(score, now)
    }

    pub fn snapshot(&self) -> Array2<f64> {
        self.inner.read().snapshot()
    }

    pub fn statistics(&self) -> GridStatistics {
        self.inner.read().statistics()
    }

    /// Snapshot and statistics taken under one read lock
    pub fn snapshot_with_statistics(&self) -> (Array2<f64>, GridStatistics) {
        let grid = self.inner.read();
        (grid.snapshot(), grid.statistics())
    }

    pub fn reset(&self, now: f64) {
        self.inner.write().reset(now);
    }
}
