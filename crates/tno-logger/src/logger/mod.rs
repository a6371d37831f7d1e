mod attr;
mod config;
mod error;
mod level;
mod log;
mod mode;
mod record;
mod render;

pub use attr::{
    Attr, AttrValue, LEVEL_KEY, MESSAGE_KEY, ReplaceAttr, SOURCE_KEY, SourceLocation, TIME_KEY,
    replace_attr,
};
pub use config::LogConfig;
pub use error::LoggerError;
pub use level::LoggerLevel;
pub use log::Logger;
pub use mode::Mode;
pub use render::{ConsoleFormat, JsonFormat};

use crate::rotate::{RollingFileWriter, RotationPolicy};

pub fn logger_new(cfg: &LogConfig) -> Logger {
    match cfg.mode {
        Mode::Interactive => Logger::console(cfg, std::io::stdout, cfg.use_color),
        Mode::Production => {
            let file = RollingFileWriter::new(&cfg.destination_path, RotationPolicy::FIXED);
            Logger::json(cfg, file.clone()).with_file(file)
        }
    }
}
