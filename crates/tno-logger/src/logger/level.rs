use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, de};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;

use crate::logger::error::LoggerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LoggerLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LoggerLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoggerLevel::Trace => "trace",
            LoggerLevel::Debug => "debug",
            LoggerLevel::Info => "info",
            LoggerLevel::Warn => "warn",
            LoggerLevel::Error => "error",
        }
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "trace" => Ok(LoggerLevel::Trace),
            "debug" => Ok(LoggerLevel::Debug),
            "info" => Ok(LoggerLevel::Info),
            "warn" | "warning" => Ok(LoggerLevel::Warn),
            "error" | "err" => Ok(LoggerLevel::Error),
            _ => Err(LoggerError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl fmt::Display for LoggerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LoggerLevel> for Level {
    fn from(level: LoggerLevel) -> Self {
        match level {
            LoggerLevel::Trace => Level::TRACE,
            LoggerLevel::Debug => Level::DEBUG,
            LoggerLevel::Info => Level::INFO,
            LoggerLevel::Warn => Level::WARN,
            LoggerLevel::Error => Level::ERROR,
        }
    }
}

impl From<LoggerLevel> for LevelFilter {
    fn from(level: LoggerLevel) -> Self {
        LevelFilter::from_level(level.into())
    }
}

impl<'de> Deserialize<'de> for LoggerLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
