mod loader;
mod types;
pub mod validation;

pub use loader::{load_config, load_config_from_file, load_config_from_file_with_profile, load_config_with_profile};
pub use types::*;

use crate::foundation::ArbiterError;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "ARBITER_CONFIG_PATH";
pub const DATA_DIR_ENV: &str = "ARBITER_DATA_DIR";

/// Resolve data dir and config path from the environment, then load.
///
/// Loading does not validate; callers decide whether a validation error
/// is fatal via [`AppConfig::validate`].
pub fn load_app_config() -> Result<AppConfig, ArbiterError> {
    let data_dir = resolve_data_dir()?;
    let config_path = resolve_config_path(&data_dir);
    load_config_from_file(&config_path, &data_dir)
}

pub fn load_app_config_from_path(path: &Path) -> Result<AppConfig, ArbiterError> {
    let data_dir = resolve_data_dir()?;
    load_config_from_file(path, &data_dir)
}

pub fn load_app_config_from_profile_path(path: &Path, profile: &str) -> Result<AppConfig, ArbiterError> {
    let data_dir = resolve_data_dir()?;
    load_config_from_file_with_profile(path, &data_dir, profile)
}

pub fn resolve_config_path(data_dir: &Path) -> PathBuf {
    if let Ok(value) = std::env::var(CONFIG_PATH_ENV) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    data_dir.join(loader::CONFIG_FILE_NAME)
}

pub fn resolve_data_dir() -> Result<PathBuf, ArbiterError> {
    if let Ok(data_dir) = std::env::var(DATA_DIR_ENV) {
        let trimmed = data_dir.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }
    let cwd = std::env::current_dir().map_err(|err| ArbiterError::Message(err.to_string()))?;
    Ok(cwd.join(".arbiter"))
}
