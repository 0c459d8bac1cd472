//! Bottle CLI Configuration Management
//!
//! Configuration is layered with figment, lowest priority first: defaults,
//! `bottle.toml` in the working directory (or the file given with
//! `--config`), `BOTTLE_` environment variables, then command line flags.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `BOTTLE_CLIENT__NAMESERVER_PORT=10001` or
//! `BOTTLE_CLIENT__READINESS__MAX_ATTEMPTS=20`.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use bottle_ws::ClientConfig;

use crate::cli::Cli;
use crate::error::{CliError, Result};

/// Default configuration file name
pub const CONFIG_FILE: &str = "bottle.toml";

// ----------------------------------------------------------------------------
// Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the `bottle` binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Nameserver and transport settings
    pub client: ClientConfig,
    /// How received bottles are printed
    pub output: OutputConfig,
}

/// Output formatting options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print bottles as JSON instead of YARP text
    pub json: bool,
    /// Print header-only acknowledgements while streaming
    pub show_headers: bool,
}

impl AppConfig {
    /// Load with the standard priority order, applying `cli` flags last
    pub fn load(cli: &Cli) -> Result<Self> {
        let file = cli.config.as_deref().unwrap_or(CONFIG_FILE);
        let mut figment = Self::figment(file);

        if let Some(host) = &cli.host {
            figment = figment.merge(("client.nameserver_host", host));
        }
        if let Some(port) = cli.port {
            figment = figment.merge(("client.nameserver_port", port));
        }
        if let Some(policy) = &cli.close_policy {
            figment = figment.merge(("client.close_policy", policy));
        }
        if cli.json {
            figment = figment.merge(("output.json", true));
        }

        Self::extract(figment)
    }

    /// Defaults, then `file` if it exists, then `BOTTLE_` environment variables
    pub fn figment(file: &str) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("BOTTLE_").split("__"))
    }

    pub fn extract(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| CliError::Config(format!("Failed to load configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.client
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Effective configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
