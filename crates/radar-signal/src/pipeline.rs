//! Complete disturbance processing pipeline.
//!
//! Ties filtering, feature extraction, scoring and the spatial grid into one
//! streaming loop: batch → features → score → grid update.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;

use radar_core::{
    wall_clock_secs, DisturbanceScore, Error, FeatureVector, GridStatistics, ObservationRecord,
    Result,
};

use crate::acquisition::ObservationSource;
use crate::features::{FeatureExtractor, FeatureToggles};
use crate::filtering::RecordFilter;
use crate::scoring::ScoreWeights;
use crate::spatial::{BinFlush, GridConfig, SharedGrid, SpatialGrid};
use crate::spectral::SpectralAnalyzer;

/// Configuration for the processing pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Grid dimensions and binning
    pub grid: GridConfig,

    /// Scoring calibration
    pub weights: ScoreWeights,

    /// Features that contribute to the score
    pub features: FeatureToggles,

    /// Drop the DC bin from spectral energy
    pub exclude_dc: bool,

    /// Classification allow-list
    pub filter: RecordFilter,

    /// How often the streaming loop polls its source
    pub poll_interval: Duration,

    /// Output queue size
    pub output_queue_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            weights: ScoreWeights::default(),
            features: FeatureToggles::default(),
            exclude_dc: false,
            filter: RecordFilter::allow_all(),
            poll_interval: Duration::from_millis(500),
            output_queue_size: 1000,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.weights.validate()?;

        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll_interval must be positive".into()));
        }
        if self.output_queue_size == 0 {
            return Err(Error::Config("output_queue_size must be positive".into()));
        }

        Ok(())
    }
}

/// Result of pushing one batch through the pipeline
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedBatch {
    /// Time the batch was applied to the grid
    pub timestamp: f64,

    /// Records that survived filtering
    pub packet_count: usize,

    pub features: FeatureVector,
    pub score: DisturbanceScore,

    /// Set when this batch closed a bin
    pub flush: Option<BinFlush>,

    /// Grid statistics after the update
    pub statistics: GridStatistics,

    /// Row-major grid after the update, read together with `statistics`
    pub heatmap: Vec<Vec<f64>>,
}

/// The main disturbance processing pipeline
pub struct RadarPipeline<R: Rng = ChaCha8Rng> {
    config: PipelineConfig,
    extractor: FeatureExtractor,
    grid: SharedGrid<R>,
    is_running: Arc<RwLock<bool>>,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl RadarPipeline<ChaCha8Rng> {
    pub fn new(config: PipelineConfig, now: f64) -> Result<Self> {
        let grid = SpatialGrid::new(config.grid.clone(), now)?;
        Self::with_grid(config, grid)
    }

    /// Pipeline with reproducible diffusion placement
    pub fn seeded(config: PipelineConfig, seed: u64, now: f64) -> Result<Self> {
        let grid = SpatialGrid::seeded(config.grid.clone(), seed, now)?;
        Self::with_grid(config, grid)
    }
}

impl<R: Rng> RadarPipeline<R> {
    pub fn with_grid(config: PipelineConfig, grid: SpatialGrid<R>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            extractor: Self::build_extractor(&config),
            grid: SharedGrid::new(grid),
            config,
            is_running: Arc::new(RwLock::new(false)),
            stop_tx: None,
            task: None,
        })
    }

    fn build_extractor(config: &PipelineConfig) -> FeatureExtractor {
        FeatureExtractor::new()
            .with_weights(config.weights)
            .with_spectral(SpectralAnalyzer::new().with_dc_excluded(config.exclude_dc))
    }

    /// Process one batch of observations captured since the last poll.
    ///
    /// A batch that is empty after filtering leaves the grid and the phase
    /// memory untouched.
    pub fn process_batch(&mut self, records: &[ObservationRecord], now: f64) -> ProcessedBatch {
        let records = if self.config.filter.is_pass_through() {
            records.to_vec()
        } else {
            self.config.filter.apply(records)
        };

        if records.is_empty() {
            let (heatmap, statistics) = self.grid_state();
            return ProcessedBatch {
                timestamp: now,
                packet_count: 0,
                features: FeatureVector::default(),
                score: 0.0,
                flush: None,
                statistics,
                heatmap,
            };
        }

        let features = self
            .config
            .features
            .apply(self.extractor.extract_features(&records));
        let score = self.extractor.extract_disturbance_score(&features);

        let flush = self.grid.update(score, now);
        let (heatmap, statistics) = self.grid_state();

        tracing::trace!(packets = records.len(), score, "Processed observation batch");

        ProcessedBatch {
            timestamp: now,
            packet_count: records.len(),
            features,
            score,
            flush,
            statistics,
            heatmap,
        }
    }

    fn grid_state(&self) -> (Vec<Vec<f64>>, GridStatistics) {
        let (snapshot, statistics) = self.grid.snapshot_with_statistics();
        let heatmap = snapshot.rows().into_iter().map(|row| row.to_vec()).collect();
        (heatmap, statistics)
    }

    /// Handle for snapshot readers such as a heatmap renderer
    pub fn grid(&self) -> SharedGrid<R> {
        self.grid.clone()
    }

    /// Get current configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Start a fresh session: clear the grid and forget the previous phase
    pub fn reset(&mut self, now: f64) {
        self.grid.reset(now);
        self.extractor = Self::build_extractor(&self.config);
        tracing::info!(now, "Pipeline reset");
    }
}

impl<R: Rng + Send + Sync + 'static> RadarPipeline<R> {
    /// Start the pipeline with an observation source.
    ///
    /// A background task polls the source every `poll_interval`, applies each
    /// batch to the shared grid and forwards the result. The task ends when
    /// the source is exhausted or fails, the receiver is dropped, this
    /// pipeline is dropped, or [`stop`](Self::stop) is called. Starting again
    /// stops the previous task.
    pub async fn start_streaming<S: ObservationSource + 'static>(
        &mut self,
        mut source: S,
    ) -> Result<mpsc::Receiver<ProcessedBatch>> {
        self.stop().await;

        let (tx, rx) = mpsc::channel(self.config.output_queue_size);
        let (stop_tx, mut stop_rx) = watch::channel(false);

        source.start().await?;

        *self.is_running.write().await = true;
        let is_running = self.is_running.clone();

        // The task owns the extractor; the grid is shared with this handle
        let mut pipeline = RadarPipeline {
            config: self.config.clone(),
            extractor: Self::build_extractor(&self.config),
            grid: self.grid.clone(),
            is_running: self.is_running.clone(),
            stop_tx: None,
            task: None,
        };
        let poll_interval = self.config.poll_interval;

        tracing::info!(?poll_interval, "Starting disturbance pipeline");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);

            // Every await point also watches the stop signal, so a source
            // with no pending input cannot keep the task alive
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop_rx.changed() => break,
                }

                let batch = tokio::select! {
                    batch = source.next_batch() => batch,
                    _ = stop_rx.changed() => break,
                };

                match batch {
                    Ok(batch) => {
                        let processed = pipeline.process_batch(&batch, wall_clock_secs());
                        let sent = tokio::select! {
                            sent = tx.send(processed) => sent.is_ok(),
                            _ = stop_rx.changed() => break,
                        };
                        if !sent {
                            tracing::warn!("Output receiver dropped, discarding batch");
                            break;
                        }
                    }
                    Err(Error::SourceExhausted) => {
                        tracing::info!("Observation source exhausted");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Acquisition error: {}", e);
                        break;
                    }
                }
            }

            if let Err(e) = source.stop().await {
                tracing::warn!("Failed to stop observation source: {}", e);
            }
            *is_running.write().await = false;
            tracing::info!("Disturbance pipeline stopped");
        });

        self.stop_tx = Some(stop_tx);
        self.task = Some(task);

        Ok(rx)
    }

    /// Stop the pipeline and wait for the streaming task to exit.
    ///
    /// Once this returns the source has been stopped and the output channel
    /// is closed.
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // Err means the task already finished
            let _ = stop_tx.send(true);
        }

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Streaming task failed: {}", e);
            }
        }

        *self.is_running.write().await = false;
    }

    /// Whether a streaming task is still alive
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }
}
