use crate::access::Role;
use crate::filter::PageSize;
use crate::store::rest::DEFAULT_TABLE;
use crate::store::{CertificateBackend, LocalBackend, RestBackend, RestConfig};
use crate::utils::errors::{RegistryError, Result};
use crate::utils::paths::{expand_home, RegistryPaths};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_URL: &str = "CERT_REGISTRY_URL";
pub const ENV_API_KEY: &str = "CERT_REGISTRY_API_KEY";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Rest,
    #[default]
    Local,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rest" | "supabase" => Ok(Self::Rest),
            "local" => Ok(Self::Local),
            _ => Err(format!("Invalid backend: {s}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestSettings {
    pub url: String,
    pub api_key: String,
    pub table: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSettings {
    pub path: Option<PathBuf>,
}

/// Contents of `config.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    pub rest: RestSettings,
    pub local: LocalSettings,
    pub page_size: Option<String>,
    pub role: Role,
    pub organization: Option<String>,
}

impl Config {
    /// Read the config file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&contents)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from `path`, or from the default location when none is given
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(&expand_home(path)),
            None => Self::load(&RegistryPaths::config_file()?),
        }
    }

    /// Apply `CERT_REGISTRY_URL` / `CERT_REGISTRY_API_KEY` if set
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_URL).ok(),
            std::env::var(ENV_API_KEY).ok(),
        );
    }

    fn apply_overrides(&mut self, url: Option<String>, api_key: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.rest.url = url;
        }
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.rest.api_key = key;
        }
    }

    pub fn page_size(&self) -> Result<PageSize> {
        match &self.page_size {
            Some(value) => value.parse().map_err(RegistryError::Config),
            None => Ok(PageSize::default()),
        }
    }

    pub fn local_path(&self) -> Result<PathBuf> {
        match &self.local.path {
            Some(path) => Ok(expand_home(path)),
            None => RegistryPaths::local_store(),
        }
    }

    pub fn rest_config(&self) -> RestConfig {
        RestConfig {
            url: self.rest.url.trim_end_matches('/').to_string(),
            api_key: self.rest.api_key.clone(),
            table: self
                .rest
                .table
                .clone()
                .unwrap_or_else(|| DEFAULT_TABLE.to_string()),
        }
    }

    pub fn create_backend(&self) -> Result<Box<dyn CertificateBackend>> {
        match self.backend {
            BackendKind::Rest => Ok(Box::new(RestBackend::new(self.rest_config())?)),
            BackendKind::Local => Ok(Box::new(LocalBackend::new(self.local_path()?))),
        }
    }
}
