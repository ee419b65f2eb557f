//! File-backed solver configuration.
//!
//! Sweep drivers keep their tolerances in a `.config` directory next to the
//! manifest: `default.toml` always loads, and a file named after the
//! `RUN_MODE` environment variable (absent by default) may override any
//! field. All values deserialize into the same immutable configuration
//! objects the solvers take per call.

use crate::convergence::{Decimation, DysonConfig};
use config::{Config, File};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::env;

/// The solver tolerances of one sweep campaign
#[derive(Debug, Deserialize)]
pub struct Configuration<T: nalgebra::RealField + Default> {
    /// Fixed-point solver settings
    pub dyson: DysonConfig<T>,
    /// Decimation settings
    pub decimation: Decimation<T>,
}

impl<T: nalgebra::RealField + DeserializeOwned + Default> Configuration<T> {
    /// Loads `.config/default.toml` plus the optional `RUN_MODE` override
    pub fn build() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let settings = Config::builder()
            // The default settings used in the general case
            .add_source(File::with_name(".config/default"))
            // Override settings which may be set by the user, optional
            .add_source(File::with_name(&format!(".config/{}", run_mode)).required(false))
            .build()?;

        settings.try_deserialize()
    }
}
