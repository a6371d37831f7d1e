use std::{
    collections::HashSet,
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use flate2::{Compression, write::GzEncoder};
use time::OffsetDateTime;

use crate::rotate::{
    filename::{COMPRESS_SUFFIX, LogName},
    policy::RotationPolicy,
};

#[derive(Debug)]
struct Backup {
    path: PathBuf,
    created: OffsetDateTime,
}

impl Backup {
    fn is_compressed(&self) -> bool {
        self.path
            .to_str()
            .is_some_and(|p| p.ends_with(COMPRESS_SUFFIX))
    }

    /// Name without the compression suffix, shared by both forms of one backup.
    fn logical_name(&self) -> String {
        let name = self.path.to_string_lossy();
        name.strip_suffix(COMPRESS_SUFFIX)
            .unwrap_or(&name)
            .to_string()
    }
}

/// Removes backups beyond `max_backups` and older than `max_age`, then compresses
/// whatever remains uncompressed. Every step is attempted; the first error is returned.
pub(crate) fn mill(name: &LogName, policy: &RotationPolicy, now: OffsetDateTime) -> io::Result<()> {
    if !policy.needs_mill() {
        return Ok(());
    }

    let mut first_err = None;
    let mut keep = |res: io::Result<()>| {
        if let Err(e) = res {
            first_err.get_or_insert(e);
        }
    };

    let mut backups = list_backups(name)?;

    if policy.max_backups > 0 {
        let mut preserved = HashSet::new();
        let mut remaining = Vec::with_capacity(backups.len());
        for backup in backups {
            preserved.insert(backup.logical_name());
            if preserved.len() > policy.max_backups {
                keep(fs::remove_file(&backup.path));
            } else {
                remaining.push(backup);
            }
        }
        backups = remaining;
    }

    if !policy.max_age.is_zero() {
        let cutoff = now - policy.max_age;
        let mut remaining = Vec::with_capacity(backups.len());
        for backup in backups {
            if backup.created < cutoff {
                keep(fs::remove_file(&backup.path));
            } else {
                remaining.push(backup);
            }
        }
        backups = remaining;
    }

    if policy.compress {
        for backup in backups.iter().filter(|b| !b.is_compressed()) {
            let mut dst = backup.path.clone().into_os_string();
            dst.push(COMPRESS_SUFFIX);
            keep(compress(&backup.path, Path::new(&dst)));
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Backups of `name`, newest first.
fn list_backups(name: &LogName) -> io::Result<Vec<Backup>> {
    let entries = match fs::read_dir(name.dir()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut backups = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(created) = name.parse_backup(&entry.file_name()) {
            backups.push(Backup {
                path: entry.path(),
                created,
            });
        }
    }
    backups.sort_by(|a, b| b.created.cmp(&a.created));
    Ok(backups)
}

/// Gzips `src` into `dst` and removes `src`. A partially written `dst` is removed on failure.
fn compress(src: &Path, dst: &Path) -> io::Result<()> {
    let mut input = File::open(src)?;
    match gzip_into(&mut input, dst) {
        Ok(()) => fs::remove_file(src),
        Err(e) => {
            let _ = fs::remove_file(dst);
            Err(e)
        }
    }
}

fn gzip_into(input: &mut File, dst: &Path) -> io::Result<()> {
    let mut encoder = GzEncoder::new(File::create(dst)?, Compression::default());
    io::copy(input, &mut encoder)?;
    encoder.finish()?.sync_all()
}
