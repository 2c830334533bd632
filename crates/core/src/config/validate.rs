use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Remote URL is an http(s) URL
/// - Poll and countdown intervals are not 0
/// - Progress step is positive and the cap stays below 100
/// - Server port, session idle time and session bound are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let url = config.remote.url.trim();
    if url.is_empty() {
        return Err(ConfigError::ValidationError(
            "remote.url cannot be empty".to_string(),
        ));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "remote.url must be an http(s) URL, got {}",
            url
        )));
    }

    let lifecycle = &config.lifecycle;
    if lifecycle.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "lifecycle.poll_interval_ms cannot be 0".to_string(),
        ));
    }
    if lifecycle.countdown_tick_ms == 0 {
        return Err(ConfigError::ValidationError(
            "lifecycle.countdown_tick_ms cannot be 0".to_string(),
        ));
    }
    if lifecycle.progress_step_pct == 0 {
        return Err(ConfigError::ValidationError(
            "lifecycle.progress_step_pct cannot be 0".to_string(),
        ));
    }
    if lifecycle.progress_cap_pct >= 100 {
        return Err(ConfigError::ValidationError(
            "lifecycle.progress_cap_pct must be below 100".to_string(),
        ));
    }

    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }
    if config.server.session_idle_secs == 0 {
        return Err(ConfigError::ValidationError(
            "server.session_idle_secs cannot be 0".to_string(),
        ));
    }
    if config.server.max_sessions == 0 {
        return Err(ConfigError::ValidationError(
            "server.max_sessions cannot be 0".to_string(),
        ));
    }

    Ok(())
}
