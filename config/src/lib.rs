//! Utilities for loading and merging ngcsim configuration files.
//!
//! Configuration is read from [`CONFIG_FILE`]s found in the working directory
//! and its ancestors, then overridden by `NGCSIM_<SECTION>_<KEY>` environment
//! variables:
//!
//! ```toml
//! [simulator]
//! command = "ngspice"
//! args = ["-b"]
//! timeout = 300
//!
//! [run]
//! jobs = 4
//! scratch_dir = "scratch"
//!
//! [report]
//! unavailable = "N/A"
//!
//! [sweep]
//! default_temperature = 25
//! ```
#![warn(missing_docs)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

pub(crate) mod paths;
mod raw;

use raw::RawConfig;
pub use raw::{CONFIG_FILE, ENV_PREFIX};

/// Absolute zero in degrees Celsius.
const ABSOLUTE_ZERO: Decimal = Decimal::from_parts(27315, 0, 0, true, 2);

/// The complete ngcsim configuration.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Simulator invocation.
    pub simulator: SimulatorConfig,
    /// Execution of a sweep.
    pub run: RunConfig,
    /// Report output.
    pub report: ReportConfig,
    /// Sweep defaults.
    pub sweep: SweepConfig,
}

/// Simulator invocation configuration.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulatorConfig {
    /// The simulator executable.
    ///
    /// Relative paths containing a separator are resolved against the
    /// directory of the file defining them.
    pub command: String,
    /// Arguments passed before the netlist path.
    pub args: Vec<String>,
    /// Per-simulation timeout in seconds.
    pub timeout: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            command: "ngspice".to_string(),
            args: vec!["-b".to_string()],
            timeout: 300,
        }
    }
}

impl SimulatorConfig {
    /// The per-simulation timeout.
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Sweep execution configuration.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// The number of simulations run concurrently.
    pub jobs: usize,
    /// Where rendered netlists are written.
    ///
    /// Relative paths are resolved against the directory of the file defining them.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: 1,
            scratch_dir: None,
        }
    }
}

/// Report output configuration.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// The text written for unavailable measurements.
    pub unavailable: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            unavailable: "N/A".to_string(),
        }
    }
}

/// Sweep configuration.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// The temperature in degrees Celsius of netlists that sweep no temperatures.
    pub default_temperature: Decimal,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            default_temperature: Decimal::from(25),
        }
    }
}

impl Config {
    /// Loads the configuration for the given working directory.
    pub fn new(cwd: impl Into<PathBuf>) -> Result<Self> {
        ConfigLoader::new(cwd).load()
    }

    /// Loads the configuration for the current working directory of the process.
    pub fn from_current_dir() -> Result<Self> {
        let cwd = std::env::current_dir()
            .with_context(|| "couldn't get the current directory of the process")?;
        Self::new(cwd)
    }

    /// Returns a loader for customizing configuration discovery.
    pub fn loader(cwd: impl Into<PathBuf>) -> ConfigLoader {
        ConfigLoader::new(cwd)
    }

    fn validate(&self) -> Result<()> {
        if self.simulator.command.is_empty() {
            bail!("`simulator.command` must not be empty");
        }
        if self.simulator.timeout == 0 {
            bail!("`simulator.timeout` must be at least 1 second");
        }
        if self.run.jobs == 0 {
            bail!("`run.jobs` must be at least 1");
        }
        if self.sweep.default_temperature < ABSOLUTE_ZERO {
            bail!(
                "`sweep.default_temperature` must not be below {} degrees Celsius",
                ABSOLUTE_ZERO
            );
        }
        Ok(())
    }
}

/// Loads a [`Config`] with custom discovery settings.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    raw: RawConfig,
}

impl ConfigLoader {
    /// Creates a loader starting discovery at `cwd`, using the process environment.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            raw: RawConfig::new(cwd.into()),
        }
    }

    /// Replaces the environment variables consulted for overrides.
    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.raw.set_env(env);
        self
    }

    /// Stops searching for configuration files at the given directory (inclusive).
    pub fn stop_at(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.set_search_stop_path(path.into());
        self
    }

    /// Loads, merges, and validates the configuration.
    pub fn load(&self) -> Result<Config> {
        let table = self
            .raw
            .load()
            .with_context(|| "could not load ngcsim configuration")?;
        let config: Config = toml::Value::Table(table)
            .try_into()
            .with_context(|| "invalid ngcsim configuration")?;
        config.validate()?;
        tracing::debug!(config = ?config, "loaded configuration");
        Ok(config)
    }
}
