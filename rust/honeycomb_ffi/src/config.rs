//! Process-wide configuration.
//!
//! The configuration decides whether contract violations are fatal and whether objects are
//! checked against the shutdown flag. It is installed at most once per process, either
//! explicitly through [`Config::install`] or lazily from the environment on first use.

use crate::error::{Error, Result};
use std::sync::OnceLock;

/// Environment variable overriding [`Config::dchecks`].
pub const DCHECKS_ENV: &str = "HONEYCOMB_DCHECKS";

/// Environment variable overriding [`Config::shutdown_checks`].
pub const SHUTDOWN_CHECKS_ENV: &str = "HONEYCOMB_SHUTDOWN_CHECKS";

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Configuration of the wrapper layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Config {
    dchecks: bool,
    shutdown_checks: bool,
}

impl Config {
    /// Constructs a new builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Constructs the configuration from the process environment.
    ///
    /// Variables that are not set keep their default value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(value) = lookup(DCHECKS_ENV) {
            builder = builder.with_dchecks(parse_bool(DCHECKS_ENV, &value)?);
        }
        if let Some(value) = lookup(SHUTDOWN_CHECKS_ENV) {
            builder = builder.with_shutdown_checks(parse_bool(SHUTDOWN_CHECKS_ENV, &value)?);
        }
        Ok(builder.build())
    }

    /// Whether failed contract checks panic.
    ///
    /// Failed checks are always logged. When this is `false` the offending operation
    /// degrades to a safe default instead.
    pub fn dchecks(&self) -> bool {
        self.dchecks
    }

    /// Whether objects are checked against the shutdown flag.
    pub fn shutdown_checks(&self) -> bool {
        self.shutdown_checks
    }

    /// Installs the configuration for the current process.
    ///
    /// Fails if a configuration was already installed, or if [`current`] was called before.
    pub fn install(self) -> Result {
        CONFIG.set(self).map_err(|_config| Error::AlreadyInstalled)?;
        tracing::debug!(
            dchecks = self.dchecks,
            shutdown_checks = self.shutdown_checks,
            "installed wrapper configuration"
        );
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A builder for a [`Config`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigBuilder {
    dchecks: Option<bool>,
    shutdown_checks: Option<bool>,
}

impl ConfigBuilder {
    /// Constructs a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether failed contract checks panic.
    ///
    /// Defaults to `cfg!(debug_assertions)`.
    pub fn with_dchecks(mut self, enabled: bool) -> Self {
        self.dchecks = Some(enabled);
        self
    }

    /// Sets whether objects are checked against the shutdown flag.
    ///
    /// Defaults to the value of the `dchecks` option.
    pub fn with_shutdown_checks(mut self, enabled: bool) -> Self {
        self.shutdown_checks = Some(enabled);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Config {
        let dchecks = self.dchecks.unwrap_or(cfg!(debug_assertions));
        Config {
            dchecks,
            shutdown_checks: self.shutdown_checks.unwrap_or(dchecks),
        }
    }

    /// Builds and installs the configuration.
    pub fn install(self) -> Result {
        self.build().install()
    }
}

/// Returns the configuration of the current process.
///
/// If no configuration was installed, it is read from the environment. Invalid
/// environment values fall back to the default configuration.
pub fn current() -> &'static Config {
    CONFIG.get_or_init(|| {
        Config::from_env().unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to the default wrapper configuration");
            Config::default()
        })
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(Error::InvalidEnv {
            var,
            value: value.to_owned(),
        }),
    }
}
