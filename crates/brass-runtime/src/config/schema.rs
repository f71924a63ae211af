//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;

use brass_framework::{BotConfig, DEFAULT_PREFIX, GateConfig};
use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// ```toml
/// [bot]
/// default_prefix = "!"
/// channels = ["#six"]
///
/// [gate]
/// mode = "concurrent"
/// default_timeout_ms = 5000
///
/// [logging]
/// level = "debug"
///
/// [plugins.admin]
/// admins = ["txdv"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrassConfig {
    /// Bot settings.
    #[serde(default)]
    pub bot: BotSettings,

    /// Precommand gate settings.
    #[serde(default)]
    pub gate: GateConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-plugin sections, keyed by plugin name. Read with
    /// [`BrassRuntime::plugin_config`](crate::BrassRuntime::plugin_config).
    #[serde(default)]
    pub plugins: HashMap<String, serde_json::Value>,
}

impl BrassConfig {
    /// The framework settings for the bot.
    pub fn bot_config(&self) -> BotConfig {
        BotConfig {
            default_prefix: self.bot.default_prefix.clone(),
            gate: self.gate.clone(),
        }
    }
}

/// Bot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotSettings {
    /// Command prefix used when neither the command nor its plugin sets one.
    #[serde(default = "default_prefix")]
    pub default_prefix: String,

    /// Channels to join when the runtime starts.
    #[serde(default)]
    pub channels: Vec<String>,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            default_prefix: default_prefix(),
            channels: Vec::new(),
        }
    }
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// How often the log file rolls over.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Which span lifecycle events to log.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module levels, e.g. `brass_framework = "trace"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            rotation: LogRotation::default(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The level as a filter directive.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Log file rollover period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Span lifecycle events to log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use brass_framework::GateMode;

    #[test]
    fn test_defaults() {
        let config = BrassConfig::default();
        assert_eq!(config.bot.default_prefix, "!");
        assert!(config.bot.channels.is_empty());
        assert_eq!(config.gate.mode, GateMode::Concurrent);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.output, LogOutput::Stdout);
        assert!(config.plugins.is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BrassConfig = serde_json::from_str(
            r##"{
                "bot": { "channels": ["#six"] },
                "gate": { "mode": "sequential" },
                "logging": { "level": "trace", "filters": { "brass_core": "warn" } },
                "plugins": { "flood": { "count": 3 } }
            }"##,
        )
        .unwrap();

        assert_eq!(config.bot.default_prefix, "!");
        assert_eq!(config.bot.channels, vec!["#six"]);
        assert_eq!(config.gate.mode, GateMode::Sequential);
        assert_eq!(config.logging.level, LogLevel::Trace);
        assert_eq!(config.logging.filters.get("brass_core"), Some(&LogLevel::Warn));
        assert_eq!(config.plugins["flood"]["count"], 3);

        let bot = config.bot_config();
        assert_eq!(bot.default_prefix, "!");
        assert_eq!(bot.gate.mode, GateMode::Sequential);
    }
}
