mod cleanup;
mod filename;
mod policy;
mod writer;

pub use policy::RotationPolicy;
pub use writer::RollingFileWriter;
