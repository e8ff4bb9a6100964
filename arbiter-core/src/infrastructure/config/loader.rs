//! Configuration loader using Figment for layered config management.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML config file
//! 3. Profile overrides from `[profiles.<name>]`
//! 4. Environment variables (ARBITER_* prefix)

use crate::foundation::ArbiterError;
use crate::infrastructure::config::types::AppConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::value::Dict;
use figment::{Figment, Profile};
use log::{debug, info};
use std::path::Path;

pub(crate) const CONFIG_FILE_NAME: &str = "arbiter-config.toml";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5560";
const DEFAULT_FORWARD_ADDR: &str = "127.0.0.1:5561";

/// Environment variable prefix for config overrides.
///
/// Example: `ARBITER_INGRESS__LISTEN_ADDR` -> `ingress.listen_addr`
const ENV_PREFIX: &str = "ARBITER_";

/// Load configuration from the default file in `data_dir` (`arbiter-config.toml`).
pub fn load_config(data_dir: &Path) -> Result<AppConfig, ArbiterError> {
    let config_path = data_dir.join(CONFIG_FILE_NAME);
    load_config_from_file(&config_path, data_dir)
}

/// Load configuration from the default file in `data_dir` (`arbiter-config.toml`) with a profile.
pub fn load_config_with_profile(data_dir: &Path, profile: &str) -> Result<AppConfig, ArbiterError> {
    let config_path = data_dir.join(CONFIG_FILE_NAME);
    load_config_from_file_with_profile(&config_path, data_dir, profile)
}

/// Load configuration from a specific file path.
pub fn load_config_from_file(path: &Path, data_dir: &Path) -> Result<AppConfig, ArbiterError> {
    info!("loading configuration from {} (data_dir {})", path.display(), data_dir.display());
    let figment = figment_base(path).merge(Env::prefixed(ENV_PREFIX).split("__"));
    let mut config: AppConfig =
        figment.extract().map_err(|e| ArbiterError::ConfigError(format!("config extraction failed: {e}")))?;
    postprocess(&mut config, data_dir);
    debug!(
        "configuration loaded: listen_addr={} forward_addr={} window_ms={}",
        config.ingress.listen_addr, config.egress.forward_addr, config.arbitration.collection_window_ms
    );
    Ok(config)
}

/// Load configuration from a specific file path with profile overrides.
pub fn load_config_from_file_with_profile(path: &Path, data_dir: &Path, profile: &str) -> Result<AppConfig, ArbiterError> {
    info!("loading configuration from {} with profile '{}'", path.display(), profile);

    // Extract once to access `profiles.<name>` overrides from the file.
    let base_config: AppConfig =
        figment_base(path).extract().map_err(|e| ArbiterError::ConfigError(format!("config extraction failed: {e}")))?;

    let overrides = profile_overrides(&base_config, profile)?;

    // Full extraction with overrides + env.
    let figment =
        figment_base(path).merge(Serialized::from(overrides, Profile::Default)).merge(Env::prefixed(ENV_PREFIX).split("__"));

    let mut config: AppConfig = figment
        .extract()
        .map_err(|e| ArbiterError::ConfigError(format!("config extraction failed for profile '{profile}': {e}")))?;

    postprocess(&mut config, data_dir);

    debug!("configuration loaded with profile '{}': listen_addr={}", profile, config.ingress.listen_addr);

    Ok(config)
}

fn figment_base(path: &Path) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));
    if path.exists() {
        figment = figment.merge(Toml::file(path));
    } else {
        debug!("configuration file {} missing; using defaults and env only", path.display());
    }
    figment
}

fn profile_overrides(config: &AppConfig, profile: &str) -> Result<Dict, ArbiterError> {
    let profiles = config.profiles.as_ref().ok_or_else(|| ArbiterError::ConfigError("no profiles section in config".to_string()))?;

    profiles
        .get(profile)
        .cloned()
        .ok_or_else(|| ArbiterError::ConfigError(format!("profile '{profile}' not found in config")))
}

fn postprocess(config: &mut AppConfig, data_dir: &Path) {
    if config.service.data_dir.trim().is_empty() {
        config.service.data_dir = data_dir.to_string_lossy().to_string();
    }

    if config.ingress.listen_addr.trim().is_empty() {
        config.ingress.listen_addr = DEFAULT_LISTEN_ADDR.to_string();
    }

    if config.egress.forward_addr.trim().is_empty() {
        config.egress.forward_addr = DEFAULT_FORWARD_ADDR.to_string();
    }
}
