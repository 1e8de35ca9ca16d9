//! Collector configuration.

use crate::error::{Error, Result};

/// Upper bound accepted for [`Config::max_frames`].
pub const MAX_FRAMES_LIMIT: usize = 256;

/// What happens to the panic report of a fault caught inside a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultReporting {
    /// Nothing is printed or logged.
    Silent,
    /// A `tracing` warning for every caught fault, and a debug event for
    /// every panic raised inside guarded work, including ones the work
    /// catches itself.
    Log,
    /// The panic hook that was installed before ours runs as usual.
    ChainDefault,
}

impl Default for FaultReporting {
    fn default() -> Self {
        FaultReporting::Log
    }
}

/// Capture settings of a [`FaultCollector`](crate::FaultCollector).
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of caller frames kept in a fault record.
    pub max_frames: usize,
    /// Whether the human readable stack is rendered at capture time.
    pub format_trace: bool,
    /// How caught faults are reported.
    pub reporting: FaultReporting,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_frames: 32,
            format_trace: true,
            reporting: FaultReporting::default(),
        }
    }
}

impl Config {
    /// Start from the defaults.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_frames == 0 {
            return Err(Error::config("max_frames must be > 0"));
        }
        if self.max_frames > MAX_FRAMES_LIMIT {
            return Err(Error::config(format!(
                "max_frames too large (max {})",
                MAX_FRAMES_LIMIT
            )));
        }

        Ok(())
    }
}

/// Consuming builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// A builder holding the default config.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set [`Config::max_frames`].
    pub fn max_frames(mut self, n: usize) -> Self {
        self.config.max_frames = n;
        self
    }

    /// Set [`Config::format_trace`].
    pub fn format_trace(mut self, enable: bool) -> Self {
        self.config.format_trace = enable;
        self
    }

    /// Set [`Config::reporting`].
    pub fn reporting(mut self, reporting: FaultReporting) -> Self {
        self.config.reporting = reporting;
        self
    }

    /// Validate and return the config.
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
