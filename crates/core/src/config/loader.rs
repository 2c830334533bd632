use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// Environment variable prefix for overrides, e.g. `PRINTWIZARD_REMOTE__URL`.
/// Nested keys are separated by `__` so single underscores stay in field names.
pub const ENV_PREFIX: &str = "PRINTWIZARD_";

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "PRINTWIZARD_CONFIG";

/// Config file used when [`CONFIG_PATH_VAR`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Path of the config file: `$PRINTWIZARD_CONFIG`, else `config.toml`.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from file with environment variable overrides.
///
/// Environment values win over the file. The path variable itself is not
/// treated as a config key.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(env_overrides())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from a TOML string, without environment overrides.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    Figment::from(Toml::string(toml_str))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn env_overrides() -> Env {
    let path_key = CONFIG_PATH_VAR.trim_start_matches(ENV_PREFIX);
    Env::prefixed(ENV_PREFIX).ignore(&[path_key]).split("__")
}
