//! Startup configuration: the API origin from the environment, plus an
//! optional `settings.toml` for local tweaks.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::detail::DEFAULT_SETTLE_DELAY;
use crate::error::ConfigError;
use crate::model::PartnerCode;

pub const ENDPOINT_VAR: &str = "INVOICE_ENDPOINT";
/// Name used by the web deployment; still honoured.
pub const LEGACY_ENDPOINT_VAR: &str = "NEXT_PUBLIC_INVOICE_ENDPOINT";

/// Resolved once in `main` and passed to every component that talks HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: Url,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Self::parse(ENDPOINT_VAR, base_url)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// `lookup` stands in for the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        for name in [ENDPOINT_VAR, LEGACY_ENDPOINT_VAR] {
            if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
                return Self::parse(name, &value);
            }
        }
        Err(ConfigError::Missing(ENDPOINT_VAR))
    }

    fn parse(name: &'static str, value: &str) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::Malformed {
            name,
            value: value.to_string(),
        };
        let url = Url::parse(value.trim()).map_err(|_| malformed())?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(malformed());
        }
        Ok(Self { base_url: url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append percent-encoded `segments` to the base path.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub settle_delay_secs: u64,
    pub default_partner: PartnerCode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            settle_delay_secs: DEFAULT_SETTLE_DELAY.as_secs(),
            default_partner: PartnerCode::Vnp,
        }
    }
}

impl Settings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    /// Missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let settings_error = |reason: String| ConfigError::Settings {
            path: path.display().to_string(),
            reason,
        };
        let content = fs::read_to_string(path).map_err(|e| settings_error(e.to_string()))?;
        toml::from_str(&content).map_err(|e| settings_error(e.to_string()))
    }
}

pub fn settings_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("vn", "hoadon", "hoadon") {
        return proj_dirs.config_dir().join("settings.toml");
    }
    PathBuf::from("settings.toml")
}
