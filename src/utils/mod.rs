//! Configuration loading and validation

pub mod config;

pub use config::{
    anchor_geometry_warnings, AppConfig, ConfigError, LatencyConfig, ModeConfig, ValidationResult,
};
