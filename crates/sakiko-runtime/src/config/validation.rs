//! Configuration validation utilities.

use std::str::FromStr;

use super::error::{ConfigError, ConfigResult};
use super::schema::{BusConfig, LogOutput, LoggingConfig, SakikoConfig};

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validates the entire configuration.
pub fn validate_config(config: &SakikoConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    config
        .snowflake
        .validate()
        .map_err(|e| ConfigError::validation(format!("snowflake: {e}")))?;
    validate_bus_config(&config.bus)?;

    if let Some(name) = config.adapters.keys().find(|name| name.is_empty()) {
        return Err(ConfigError::validation(format!(
            "adapter section name must not be empty (got {name:?})"
        )));
    }

    Ok(())
}

fn validate_level(level: &str) -> ConfigResult<()> {
    if tracing::Level::from_str(level).is_err() {
        return Err(ConfigError::validation(format!(
            "invalid log level: {level}. Valid values are: {VALID_LOG_LEVELS:?}"
        )));
    }
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    validate_level(&logging.level)?;

    for (module, level) in &logging.filters {
        if module.is_empty() {
            return Err(ConfigError::validation("log filter module must not be empty"));
        }
        validate_level(level)?;
    }

    if logging.output == LogOutput::File && logging.file.prefix.is_empty() {
        return Err(ConfigError::validation(
            "logging.file.prefix must not be empty when writing to a file",
        ));
    }

    Ok(())
}

fn validate_bus_config(bus: &BusConfig) -> ConfigResult<()> {
    if bus.default_timeout_ms == Some(0) {
        return Err(ConfigError::validation(
            "bus.default_timeout_ms must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&SakikoConfig::default()).is_ok());
    }

    #[test]
    fn test_level_is_case_insensitive() {
        let mut config = SakikoConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_unknown_level() {
        let mut config = SakikoConfig::default();
        config.logging.level = "verbose".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("verbose"));
    }

    #[test]
    fn test_rejects_unknown_filter_level() {
        let mut config = SakikoConfig::default();
        config
            .logging
            .filters
            .insert("sakiko_core".to_string(), "loud".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_oversized_snowflake_layout() {
        let mut config = SakikoConfig::default();
        config.snowflake.worker_id_bits = 16;
        config.snowflake.sequence_bits = 12;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("snowflake"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let mut config = SakikoConfig::default();
        config.bus.default_timeout_ms = Some(0);
        assert!(validate_config(&config).is_err());

        config.bus.default_timeout_ms = Some(1);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_empty_file_prefix() {
        let mut config = SakikoConfig::default();
        config.logging.output = LogOutput::File;
        config.logging.file.prefix.clear();
        assert!(validate_config(&config).is_err());
    }
}
