//! Telemetry configuration loading, `${ENV}` substitution, and environment
//! overrides.
//!
//! Config files: `admitly.toml`, `admitly.yaml`, `admitly.yml` or `admitly.json`,
//! searched in `./` then the user config directory.

pub mod env;
pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    env::{apply_env_overrides, apply_env_overrides_with},
    error::{Error, Result},
    loader::{config_dir, discover_and_load, load_config},
    schema::{EndpointsConfig, ExporterType, MetricsConfig, TelemetryConfig},
};
