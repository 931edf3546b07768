//! # Radar-App
//!
//! Configuration loading and logging bootstrap for the `ambient-radar`
//! binary.
//!
//! ## Configuration Sources
//!
//! 1. Built-in defaults
//! 2. Config file (`--config`, TOML/JSON/YAML by extension)
//! 3. `RADAR_`-prefixed environment variables (`RADAR_CAPTURE__CHANNEL=11`)
//! 4. Command-line overrides

pub mod config;
pub mod logging;

pub use config::*;
pub use logging::*;
