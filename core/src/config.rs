//! `config.toml` in the Kritikos home directory, layered under CLI overrides.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use kritikos_gateway::ModelSelection;
use kritikos_provider_config::ModelProviderInfo;
use kritikos_provider_config::ProviderOverrides;
use kritikos_provider_config::gemini_provider;
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

pub const KRITIKOS_HOME_ENV_VAR: &str = "KRITIKOS_HOME";
pub const CONFIG_TOML_FILE: &str = "config.toml";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_HOME_DIR: &str = ".kritikos";

/// On-disk shape of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    pub model: Option<String>,
    pub rewrite_model: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub provider: Option<ProviderOverrides>,
}

/// Values passed on the command line; each one beats `config.toml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub rewrite_model: Option<String>,
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub kritikos_home: PathBuf,
    pub provider: ModelProviderInfo,
    pub models: ModelSelection,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        self.provider.request_timeout()
    }
}

/// `$KRITIKOS_HOME` when set and non-empty, else `~/.kritikos`. The directory
/// does not have to exist.
pub fn find_kritikos_home() -> Result<PathBuf, ConfigError> {
    find_kritikos_home_with(|var| std::env::var(var).ok())
}

fn find_kritikos_home_with(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, ConfigError> {
    if let Some(value) = lookup(KRITIKOS_HOME_ENV_VAR).filter(|value| !value.trim().is_empty()) {
        return Ok(PathBuf::from(value));
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_HOME_DIR))
        .ok_or(ConfigError::NoHome)
}

/// Read `config.toml` from `kritikos_home`. A missing file is the default
/// config.
pub fn load_config_toml(kritikos_home: &Path) -> Result<ConfigToml, ConfigError> {
    let path = kritikos_home.join(CONFIG_TOML_FILE);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file; using defaults");
            return Ok(ConfigToml::default());
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

pub fn load_config(
    kritikos_home: &Path,
    overrides: ConfigOverrides,
) -> Result<Config, ConfigError> {
    let cfg = load_config_toml(kritikos_home)?;
    Config::load_from_base_config_with_overrides(cfg, overrides, kritikos_home.to_path_buf())
}

impl Config {
    pub fn load_from_base_config_with_overrides(
        cfg: ConfigToml,
        overrides: ConfigOverrides,
        kritikos_home: PathBuf,
    ) -> Result<Self, ConfigError> {
        let ConfigOverrides {
            model,
            rewrite_model,
            request_timeout,
        } = overrides;

        let audit_model = non_empty("model", model.or(cfg.model))?
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let rewrite_model = non_empty("rewrite_model", rewrite_model.or(cfg.rewrite_model))?
            .unwrap_or_else(|| audit_model.clone());

        let mut provider = gemini_provider();
        if let Some(provider_overrides) = &cfg.provider {
            provider.apply_overrides(provider_overrides);
        }
        let timeout_ms = request_timeout
            .map(|timeout| u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
            .or(cfg.request_timeout_ms);
        match timeout_ms {
            Some(0) => return Err(ConfigError::ZeroTimeout),
            Some(ms) => provider.request_timeout_ms = Some(ms),
            None => {}
        }

        Ok(Self {
            kritikos_home,
            provider,
            models: ModelSelection {
                audit: audit_model,
                rewrite: rewrite_model,
            },
        })
    }
}

fn non_empty(field: &'static str, value: Option<String>) -> Result<Option<String>, ConfigError> {
    match value {
        Some(value) if value.trim().is_empty() => Err(ConfigError::EmptyValue { field }),
        other => Ok(other),
    }
}
