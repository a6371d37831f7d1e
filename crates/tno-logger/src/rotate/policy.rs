use std::time::Duration;

const MEGABYTE: u64 = 1024 * 1024;
const DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Size in bytes the active file may reach before it is rotated.
    pub max_size: u64,
    /// Number of backups to retain; `0` keeps all of them.
    pub max_backups: usize,
    /// Backups older than this are removed; `Duration::ZERO` disables age pruning.
    pub max_age: Duration,
    /// Gzip backups after rotation.
    pub compress: bool,
}

impl RotationPolicy {
    /// Policy used by the production pipeline.
    pub const FIXED: Self = Self {
        max_size: 10 * MEGABYTE,
        max_backups: 3,
        max_age: Duration::from_secs(28 * DAY),
        compress: true,
    };

    pub(crate) fn needs_mill(&self) -> bool {
        self.max_backups > 0 || !self.max_age.is_zero() || self.compress
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::FIXED
    }
}
