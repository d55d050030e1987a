//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use sakiko_core::SnowflakeOptions;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// usable configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SakikoConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Identifier generator settings.
    #[serde(default)]
    pub snowflake: SnowflakeOptions,

    /// Event bus settings.
    #[serde(default)]
    pub bus: BusConfig,

    /// Per-adapter sections, keyed by adapter name.
    #[serde(default)]
    pub adapters: HashMap<String, figment::value::Value>,

    /// Per-plugin sections, keyed by plugin name.
    #[serde(default)]
    pub plugins: HashMap<String, serde_json::Value>,
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Output destination.
    pub output: LogOutput,

    /// Rolling file settings, used when `output` is `file`.
    pub file: FileOutputConfig,

    /// Which span lifecycle events to log.
    pub span_events: SpanEventConfig,

    /// Colored output. Always off for file output.
    pub ansi: bool,

    /// Include thread ids.
    pub thread_ids: bool,

    /// Include source file and line.
    pub file_location: bool,

    /// Per-module levels, e.g. `sakiko_core = "debug"`.
    pub filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file: FileOutputConfig::default(),
            span_events: SpanEventConfig::default(),
            ansi: true,
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Rolling file appender settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Directory the log files are written to.
    pub dir: PathBuf,
    /// File name prefix; the rotation date is appended.
    pub prefix: String,
    /// How often a new file is started.
    pub rotation: Rotation,
    /// Number of rotated files to keep. `0` keeps all of them.
    pub max_files: usize,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            prefix: "sakiko.log".to_string(),
            rotation: Rotation::Daily,
            max_files: 7,
        }
    }
}

/// File rotation period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<Rotation> for tracing_appender::rolling::Rotation {
    fn from(rotation: Rotation) -> Self {
        match rotation {
            Rotation::Minutely => Self::MINUTELY,
            Rotation::Hourly => Self::HOURLY,
            Rotation::Daily => Self::DAILY,
            Rotation::Never => Self::NEVER,
        }
    }
}

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

// =============================================================================
// Bus
// =============================================================================

/// Event bus settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Timeout applied to matchers that do not declare their own.
    pub default_timeout_ms: Option<u64>,
}

impl BusConfig {
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}
