//! # Radar-Signal
//!
//! Signal engine for passive WiFi motion sensing.
//!
//! Nothing is transmitted. A receiver in monitor mode overhears ambient
//! traffic (beacons, data frames) and a person moving through the room
//! perturbs the multipath channel those frames travel through. This crate
//! turns that perturbation into a heatmap.
//!
//! ## Pipeline Stages
//!
//! 1. **Acquisition**: Batches of observation records from a capture source
//! 2. **Filtering**: Optional classification allow-list
//! 3. **Feature Extraction**: Signal variance, phase variance, spectral energy, phase drift
//! 4. **Scoring**: Weighted, normalized disturbance score in [0, 1]
//! 5. **Spatial Accumulation**: Time-binned, decaying, Gaussian-diffused 2-D grid

pub mod acquisition;
pub mod features;
pub mod filtering;
pub mod pipeline;
pub mod scoring;
pub mod spatial;
pub mod spectral;

pub use acquisition::*;
pub use features::*;
pub use filtering::*;
pub use pipeline::*;
pub use scoring::*;
pub use spatial::*;
pub use spectral::*;
