use crate::utils::errors::{RegistryError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub struct RegistryPaths;
pub const PROGRAM_NAME: &str = "cert-registry";

impl RegistryPaths {
    /// Get the base data directory: ~/.local/share/cert-registry/
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|dir| dir.join(PROGRAM_NAME))
            .ok_or_else(|| {
                RegistryError::Config("Cannot determine local data directory".to_string())
            })
    }

    /// Get the config directory: ~/.config/cert-registry/
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(PROGRAM_NAME))
            .ok_or_else(|| RegistryError::Config("Cannot determine config directory".to_string()))
    }

    /// ~/.config/cert-registry/config.yaml
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.yaml"))
    }

    /// Default file for the local backend: ~/.local/share/cert-registry/certificates.json
    pub fn local_store() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("certificates.json"))
    }

    /// Ensure a directory exists with owner-only permissions
    pub fn ensure_dir_exists(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = fs::metadata(path)?.permissions();
                perms.set_mode(0o700);
                fs::set_permissions(path, perms)?;
            }
        }
        Ok(())
    }

    pub fn ensure_all_dirs() -> Result<()> {
        Self::ensure_dir_exists(&Self::data_dir()?)?;
        Self::ensure_dir_exists(&Self::config_dir()?)?;
        Ok(())
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
