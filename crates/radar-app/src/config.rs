//! Radar configuration.
//!
//! Loaded from an optional file (TOML, JSON or YAML) layered with
//! `RADAR_`-prefixed environment variables, e.g.
//! `RADAR_SPATIAL__BIN_DURATION=0.5`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use radar_core::classification;
use radar_core::{Error, Result};
use radar_signal::{
    FeatureToggles, GridConfig, PipelineConfig, RecordFilter, ScoreWeights, SimulationConfig,
    DEFAULT_ACTIVITY_THRESHOLD, DEFAULT_DECAY_FACTOR, DEFAULT_DIFFUSION_SIGMA,
    DEFAULT_HISTORY_CAPACITY,
};

use crate::logging::LogConfig;

/// Complete radar configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    /// Capture interface settings, handed to the capture collaborator
    pub capture: CaptureConfig,

    /// Frame filtering
    pub filtering: FilteringConfig,

    /// Feature toggles
    pub features: FeaturesConfig,

    /// Spatial grid
    pub spatial: SpatialConfig,

    /// Disturbance score calibration
    pub scoring: ScoreWeights,

    /// Polling cadence of the consumer
    pub visualization: VisualizationConfig,

    /// Synthetic traffic for runs without capture hardware
    pub simulation: SimulationConfig,

    /// Logging
    pub logging: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Monitor-mode interface name
    pub interface: String,

    /// WiFi channel
    pub channel: u8,

    /// Band in GHz
    pub frequency_ghz: f64,

    /// Seconds of traffic per capture slice
    pub sampling_duration: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: "wlan0mon".to_string(),
            channel: 6,
            frequency_ghz: 2.4,
            sampling_duration: 0.1,
        }
    }
}

/// Frame kinds that may pass the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketType {
    Beacon,
    ProbeResponse,
    Data,
    QosData,
}

impl PacketType {
    pub fn classification(&self) -> u8 {
        match self {
            PacketType::Beacon => classification::MANAGEMENT_BEACON,
            PacketType::ProbeResponse => classification::MANAGEMENT_PROBE_RESPONSE,
            PacketType::Data => classification::DATA,
            PacketType::QosData => classification::DATA_QOS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilteringConfig {
    /// Allowed frame kinds; empty passes everything
    pub packet_types: Vec<PacketType>,
}

impl FilteringConfig {
    pub fn record_filter(&self) -> RecordFilter {
        RecordFilter::with_classifications(self.packet_types.iter().map(PacketType::classification))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub signal_enabled: bool,
    pub phase_enabled: bool,
    pub spectral_enabled: bool,

    /// Count only the fluctuating part of the spectrum
    pub exclude_dc: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            signal_enabled: true,
            phase_enabled: true,
            spectral_enabled: true,
            exclude_dc: false,
        }
    }
}

impl FeaturesConfig {
    pub fn toggles(&self) -> FeatureToggles {
        FeatureToggles {
            signal_enabled: self.signal_enabled,
            phase_enabled: self.phase_enabled,
            spectral_enabled: self.spectral_enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// `[rows, cols]`
    pub grid_size: [usize; 2],
    pub bin_duration: f64,
    pub normalization: bool,
    pub decay_factor: f64,
    pub activity_threshold: f64,
    pub diffusion_sigma: f64,
    pub history_capacity: usize,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            grid_size: [10, 10],
            bin_duration: 1.0,
            normalization: true,
            decay_factor: DEFAULT_DECAY_FACTOR,
            activity_threshold: DEFAULT_ACTIVITY_THRESHOLD,
            diffusion_sigma: DEFAULT_DIFFUSION_SIGMA,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl SpatialConfig {
    pub fn grid_config(&self) -> GridConfig {
        GridConfig {
            rows: self.grid_size[0],
            cols: self.grid_size[1],
            bin_duration: self.bin_duration,
            normalize: self.normalization,
            decay_factor: self.decay_factor,
            activity_threshold: self.activity_threshold,
            diffusion_sigma: self.diffusion_sigma,
            history_capacity: self.history_capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    /// Seconds between polls of the grid
    pub update_interval: f64,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            update_interval: 0.5,
        }
    }
}

/// Configuration plus where it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RadarConfig,

    /// False when the file was absent and only defaults and environment apply
    pub file_found: bool,
}

impl RadarConfig {
    /// Load configuration from file and environment.
    ///
    /// A missing file is not an error; check [`LoadedConfig::file_found`] to
    /// report it once logging is up.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<LoadedConfig, config::ConfigError> {
        let path = path.as_ref();
        Ok(LoadedConfig {
            config: Self::from_file(path)?,
            file_found: path.is_file(),
        })
    }

    /// Load configuration from file and environment
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, config::ConfigError> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(Self::environment())
            .build()?;

        settings.try_deserialize()
    }

    /// Load from environment variables
    pub fn from_env() -> std::result::Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(Self::environment())
            .build()?;

        settings.try_deserialize()
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("RADAR")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Pipeline configuration; fails on invalid values
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let interval = self.visualization.update_interval;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(Error::Config(format!(
                "visualization.update_interval must be positive, got {}",
                interval
            )));
        }

        let config = PipelineConfig {
            grid: self.spatial.grid_config(),
            weights: self.scoring,
            features: self.features.toggles(),
            exclude_dc: self.features.exclude_dc,
            filter: self.filtering.record_filter(),
            poll_interval: Duration::from_secs_f64(interval),
            ..Default::default()
        };

        config.validate().map_err(|e| Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Apply command-line overrides on top of file and environment values
    pub fn apply_overrides(&mut self, interface: Option<String>, channel: Option<u8>) {
        if let Some(interface) = interface {
            self.capture.interface = interface;
        }
        if let Some(channel) = channel {
            self.capture.channel = channel;
        }
    }

    /// Fail fast on configuration errors
    pub fn validate(&self) -> Result<()> {
        if self.capture.interface.trim().is_empty() {
            return Err(Error::Config("capture.interface must not be empty".into()));
        }
        self.pipeline_config().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RadarConfig::default();
        assert_eq!(config.capture.interface, "wlan0mon");
        assert_eq!(config.capture.channel, 6);
        assert_eq!(config.spatial.grid_size, [10, 10]);
        assert!(config.spatial.normalization);
        assert!(config.validate().is_ok());

        let pipeline = config.pipeline_config().unwrap();
        assert_eq!(pipeline.grid, GridConfig::default());
        assert_eq!(pipeline.poll_interval, Duration::from_millis(500));
        assert!(pipeline.filter.is_pass_through());
    }

    #[test]
    fn test_invalid_grid_rejected() {
        let mut config = RadarConfig::default();
        config.spatial.grid_size = [0, 10];
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = RadarConfig::default();
        config.spatial.bin_duration = -1.0;
        assert!(config.validate().is_err());

        let mut config = RadarConfig::default();
        config.visualization.update_interval = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = RadarConfig::default();
        config.apply_overrides(None, Some(11));
        assert_eq!(config.capture.interface, "wlan0mon");
        assert_eq!(config.capture.channel, 11);

        config.apply_overrides(Some(String::new()), None);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_packet_type_filter() {
        let filtering = FilteringConfig {
            packet_types: vec![PacketType::Beacon, PacketType::Data],
        };
        let filter = filtering.record_filter();

        let beacon = radar_core::ObservationRecord::new(0.0)
            .with_classification(classification::MANAGEMENT_BEACON);
        let qos = radar_core::ObservationRecord::new(0.0)
            .with_classification(classification::DATA_QOS);

        assert!(filter.allows(&beacon));
        assert!(!filter.allows(&qos));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radar.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[capture]
interface = "wlan1mon"
channel = 11

[spatial]
grid_size = [16, 12]
bin_duration = 0.5
normalization = false

[features]
exclude_dc = true

[filtering]
packet_types = ["Beacon"]

[scoring]
scale = 50.0
"#
        )
        .unwrap();

        let loaded = RadarConfig::load(&path).unwrap();
        assert!(loaded.file_found);
        let config = loaded.config;
        assert_eq!(config.capture.interface, "wlan1mon");
        assert_eq!(config.capture.channel, 11);
        // Unspecified fields keep their defaults
        assert_eq!(config.capture.sampling_duration, 0.1);
        assert_eq!(config.scoring.signal_variance, 0.3);

        let pipeline = config.pipeline_config().unwrap();
        assert_eq!((pipeline.grid.rows, pipeline.grid.cols), (16, 12));
        assert_eq!(pipeline.grid.bin_duration, 0.5);
        assert!(!pipeline.grid.normalize);
        assert!(pipeline.exclude_dc);
        assert_eq!(pipeline.weights.scale, 50.0);
        assert!(!pipeline.filter.is_pass_through());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = RadarConfig::load(dir.path().join("absent.toml")).unwrap();
        assert!(!loaded.file_found);
        assert_eq!(loaded.config.spatial, SpatialConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let config = RadarConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: RadarConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
