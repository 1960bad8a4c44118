use anyhow::{Context, Result, bail};
use beanstalk::WatchOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

/// Starter config written by `ebenv config init`
pub const CONFIG_TEMPLATE: &str = r#"# ebenv configuration

[gateway]
# Base URL of the deployment service gateway (or set EBENV_ENDPOINT)
endpoint = "http://localhost:4566"
# Bearer token sent with every request (or set EBENV_TOKEN)
# token = ""

[watch]
# How long `update --wait` waits for the update to complete
timeout_secs = 600
# Delay between two event polls
poll_interval_secs = 1

# Named targets, usable as `ebenv info prod`
# [targets.prod]
# application = "shop"
# environment = "shop-prod"
"#;

// ============================================================================
// Config Schema
// ============================================================================

/// The ebenv configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// How to reach the deployment service
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Watch timing defaults
    #[serde(default)]
    pub watch: WatchConfig,

    /// Named application environments
    #[serde(default)]
    pub targets: BTreeMap<String, Target>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_poll_interval_secs() -> u64 {
    1
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// One application environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub application: String,
    pub environment: String,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.application, self.environment)
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load the config from the config directory, or defaults if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_file()?)
    }

    /// Load the config from a specific file, or defaults if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file {} does not exist, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))?;

        log::debug!(
            "Loaded config from {} ({} target(s))",
            path.display(),
            config.targets.len()
        );
        Ok(config)
    }

    /// Write the starter config, refusing to overwrite unless forced
    pub fn init(path: &Path, force: bool) -> Result<PathBuf> {
        if path.exists() && !force {
            bail!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }
        fs::write(path, CONFIG_TEMPLATE)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(path.to_path_buf())
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve a target alias or explicit application/environment pair
    pub fn resolve_target(
        &self,
        alias: Option<&str>,
        application: Option<&str>,
        environment: Option<&str>,
    ) -> Result<Target> {
        match (alias, application, environment) {
            (_, Some(application), Some(environment)) => Ok(Target {
                application: application.to_string(),
                environment: environment.to_string(),
            }),
            (Some(alias), _, _) => self.targets.get(alias).cloned().with_context(|| {
                let known: Vec<&str> = self.targets.keys().map(String::as_str).collect();
                if known.is_empty() {
                    format!("Unknown target '{alias}' (no targets configured, use --app and --env)")
                } else {
                    format!("Unknown target '{alias}' (known: {})", known.join(", "))
                }
            }),
            _ => bail!("No target given: pass a target name or --app and --env"),
        }
    }

    /// The gateway endpoint, preferring an explicit override
    pub fn endpoint(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.gateway.endpoint.clone())
            .context("No gateway endpoint configured (set EBENV_ENDPOINT, --endpoint or gateway.endpoint)")
    }

    /// The bearer token, preferring an explicit override
    pub fn token(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.gateway.token.clone())
            .filter(|t| !t.is_empty())
    }

    /// Watch timing, with an optional timeout override in seconds
    pub fn watch_options(&self, timeout_secs: Option<u64>) -> WatchOptions {
        WatchOptions {
            timeout: Duration::from_secs(timeout_secs.unwrap_or(self.watch.timeout_secs)),
            poll_interval: Duration::from_secs(self.watch.poll_interval_secs.max(1)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
