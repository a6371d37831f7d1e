mod logger;
pub use logger::*;

mod rotate;
pub use rotate::{RollingFileWriter, RotationPolicy};
