mod console;
mod json;

pub use console::ConsoleFormat;
pub use json::JsonFormat;
