//! # Radar-Core
//!
//! Core types and errors shared by the ambient radar crates: passive WiFi
//! motion sensing that turns overheard traffic into a 2-D disturbance heatmap.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
