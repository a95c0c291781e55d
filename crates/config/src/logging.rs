//! `[log]` section
//!
//! Proposals and table listings go to stdout, so every log line is written
//! to stderr regardless of format.

use serde::Deserialize;

/// Minimum level of emitted events
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    /// Per-candidate and per-batch decisions
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    /// One JSON object per line
    Json,
}

/// ```toml
/// [log]
/// level = "warn"
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,

    pub format: LogFormat,
}

impl LogConfig {
    /// `EnvFilter` directive for this section
    ///
    /// `debug` lowers the level to at least `debug`. Per-statement logging of
    /// the database driver stays at `warn` either way.
    pub fn directive(&self, debug: bool) -> String {
        let level = if debug { self.level.min(LogLevel::Debug) } else { self.level };
        format!("{},sqlx::query=warn", level.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_defaults_and_overrides() {
        let config: LogConfig = toml::from_str("").unwrap();
        assert_eq!((config.level, config.format), (LogLevel::Info, LogFormat::Console));

        let config: LogConfig = toml::from_str("level = \"warn\"\nformat = \"json\"").unwrap();
        assert_eq!((config.level, config.format), (LogLevel::Warn, LogFormat::Json));

        assert!(toml::from_str::<LogConfig>("level = \"loud\"").is_err());
    }

    #[test]
    fn test_directive() {
        let config = LogConfig::default();
        assert_eq!(config.directive(false), "info,sqlx::query=warn");
        assert_eq!(config.directive(true), "debug,sqlx::query=warn");

        let config = LogConfig {
            level: LogLevel::Trace,
            ..Default::default()
        };
        assert_eq!(config.directive(true), "trace,sqlx::query=warn");
    }
}
