use std::{io::IsTerminal, path::PathBuf};

use serde::Deserialize;

use crate::logger::{level::LoggerLevel, mode::Mode};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub mode: Mode,
    /// Active log file of the production pipeline; unused in interactive mode.
    pub destination_path: PathBuf,
    pub minimum_level: LoggerLevel,
    pub use_color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Interactive,
            destination_path: PathBuf::from("logs/app.log"),
            minimum_level: LoggerLevel::Info,
            use_color: std::io::stdout().is_terminal(),
        }
    }
}
