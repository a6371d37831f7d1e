use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use time::{
    OffsetDateTime, PrimitiveDateTime,
    format_description::BorrowedFormatItem,
    macros::format_description,
};

const BACKUP_TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]-[minute]-[second].[subsecond digits:3]"
);

pub(crate) const COMPRESS_SUFFIX: &str = ".gz";

/// Naming scheme of an active log file and its backups.
#[derive(Debug, Clone)]
pub(crate) struct LogName {
    path: PathBuf,
    dir: PathBuf,
    prefix: String,
    ext: String,
}

impl LogName {
    pub fn new(path: &Path) -> Self {
        let path = if path.as_os_str().is_empty() {
            default_path()
        } else {
            path.to_path_buf()
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, ext) = match file_name.rfind('.') {
            Some(idx) => file_name.split_at(idx),
            None => (file_name.as_str(), ""),
        };

        Self {
            prefix: format!("{stem}-"),
            ext: ext.to_string(),
            path,
            dir,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn backup_path(&self, at: OffsetDateTime) -> PathBuf {
        let at = at.to_offset(time::UtcOffset::UTC);
        let stamp = at
            .format(BACKUP_TIME_FORMAT)
            .unwrap_or_else(|_| at.unix_timestamp().to_string());
        self.dir.join(format!("{}{stamp}{}", self.prefix, self.ext))
    }

    /// First backup path at or after `at` (in 1 ms steps) that is not taken yet,
    /// compressed or not.
    pub fn unused_backup_path(&self, mut at: OffsetDateTime) -> PathBuf {
        loop {
            let path = self.backup_path(at);
            let mut gz = path.clone().into_os_string();
            gz.push(COMPRESS_SUFFIX);
            if !path.exists() && !Path::new(&gz).exists() {
                return path;
            }
            at += time::Duration::milliseconds(1);
        }
    }

    /// Timestamp encoded in a backup file name, compressed or not.
    /// `None` for files that are not backups of this log.
    pub fn parse_backup(&self, file_name: &OsStr) -> Option<OffsetDateTime> {
        let name = file_name.to_str()?;
        let name = name.strip_suffix(COMPRESS_SUFFIX).unwrap_or(name);
        let stamp = name.strip_prefix(&self.prefix)?.strip_suffix(&self.ext)?;
        PrimitiveDateTime::parse(stamp, BACKUP_TIME_FORMAT)
            .ok()
            .map(PrimitiveDateTime::assume_utc)
    }
}

fn default_path() -> PathBuf {
    let program = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "tno".to_string());
    std::env::temp_dir().join(format!("{program}-rolling.log"))
}
