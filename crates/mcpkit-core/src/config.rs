//! Environment-driven runtime configuration.
//!
//! | Variable | Effect |
//! |---|---|
//! | `MCPKIT_DEBUG=1` | Attach error source chains to wire error data |
//! | `MCPKIT_SILENT=true` | Disable all logging output |
//! | `LOG_LEVEL` | `debug`, `info`, `warn`, `error`, or `silent` |
//! | `MCPKIT_NO_DEFAULT_TRANSPORT=true` | Do not auto-attach the stdio transport |

use std::str::FromStr;

/// Log verbosity accepted via `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Silent,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "silent" => Ok(LogLevel::Silent),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "off",
        }
    }
}

/// Process-wide settings read once from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Attach stack context to wire errors.
    pub debug: bool,
    /// Minimum log level; `Silent` suppresses the subscriber entirely.
    pub log_level: LogLevel,
    /// Skip attaching a default stdio transport (test harnesses set this).
    pub no_default_transport: bool,
}

fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(value.trim(), "1" | "true" | "TRUE" | "True"),
        Err(_) => false,
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let silent = env_flag("MCPKIT_SILENT");
        let log_level = if silent {
            LogLevel::Silent
        } else {
            std::env::var("LOG_LEVEL")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or_default()
        };
        Self {
            debug: env_flag("MCPKIT_DEBUG"),
            log_level,
            no_default_transport: env_flag("MCPKIT_NO_DEFAULT_TRANSPORT"),
        }
    }

    pub fn is_silent(&self) -> bool {
        self.log_level == LogLevel::Silent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("SILENT".parse::<LogLevel>(), Ok(LogLevel::Silent));
        assert!("chatty".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_filter_directives() {
        assert_eq!(LogLevel::Silent.as_filter(), "off");
        assert_eq!(LogLevel::Warn.as_filter(), "warn");
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert!(!config.debug);
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(!config.is_silent());
    }
}
