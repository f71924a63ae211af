//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BrassConfig, LogFormat, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &BrassConfig) -> ConfigResult<()> {
    validate_bot(config)?;
    validate_gate(config)?;
    validate_logging(&config.logging)?;
    Ok(())
}

fn validate_bot(config: &BrassConfig) -> ConfigResult<()> {
    let prefix = &config.bot.default_prefix;
    if prefix.is_empty() {
        return Err(ConfigError::missing_field("bot.default_prefix"));
    }
    if prefix.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "Default prefix cannot contain whitespace: {prefix:?}"
        )));
    }

    for channel in &config.bot.channels {
        if channel.is_empty() || channel.contains(' ') {
            return Err(ConfigError::validation(format!(
                "Invalid channel name: {channel:?}"
            )));
        }
    }

    Ok(())
}

fn validate_gate(config: &BrassConfig) -> ConfigResult<()> {
    if config.gate.default_timeout_ms == Some(0) {
        return Err(ConfigError::validation(
            "Default precommand timeout must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "JSON log format requires the `json-log` feature",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&BrassConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_prefix() {
        let mut config = BrassConfig::default();
        config.bot.default_prefix.clear();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.bot.default_prefix = "! ".into();
        assert!(validate_config(&config).is_err());

        config.bot.default_prefix = "bot:".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_channels() {
        let mut config = BrassConfig::default();
        config.bot.channels = vec!["#six".into(), "".into()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = BrassConfig::default();
        config.gate.default_timeout_ms = Some(0);
        assert!(validate_config(&config).is_err());

        config.gate.default_timeout_ms = Some(250);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = BrassConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("brass.log".into());
        assert!(validate_config(&config).is_ok());
    }
}
