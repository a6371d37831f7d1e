use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use time::OffsetDateTime;
use tracing_subscriber::fmt::MakeWriter;

use crate::rotate::{cleanup, filename::LogName, policy::RotationPolicy};

/// Shared handle to a rotating log file.
///
/// Clones write to the same file. Nothing is opened until the first write.
/// Only one writer per path may be alive at a time: a second, independently
/// created writer keeps appending to the file the other one rotated away.
#[derive(Clone)]
pub struct RollingFileWriter {
    shared: Arc<Shared>,
}

struct Shared {
    name: LogName,
    policy: RotationPolicy,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    file: Option<File>,
    size: u64,
}

impl RollingFileWriter {
    pub fn new(path: impl AsRef<Path>, policy: RotationPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                name: LogName::new(path.as_ref()),
                policy,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Path of the active log file.
    pub fn path(&self) -> &Path {
        self.shared.name.path()
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.shared.policy
    }

    /// Moves the active file to a backup and starts a new one.
    pub fn rotate(&self) -> io::Result<()> {
        let mut state = self.lock()?;
        self.shared.rotate(&mut state)
    }

    /// Closes the active file. A later write reopens it.
    pub fn close(&self) -> io::Result<()> {
        let mut state = self.lock()?;
        match state.file.take() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, State>> {
        self.shared
            .state
            .lock()
            .map_err(|_| io::Error::other("rolling file lock poisoned"))
    }
}

impl Shared {
    fn write(&self, state: &mut State, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len() as u64;
        if len > self.policy.max_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "write length {len} exceeds maximum file size {}",
                    self.policy.max_size
                ),
            ));
        }

        if state.file.is_none() {
            self.open_existing_or_new(state, len)?;
        }
        if state.size + len > self.policy.max_size {
            self.rotate(state)?;
        }

        let file = state
            .file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file is not open"))?;
        let n = file.write(buf)?;
        state.size += n as u64;
        Ok(n)
    }

    fn open_existing_or_new(&self, state: &mut State, write_len: u64) -> io::Result<()> {
        self.mill();

        let path = self.name.path();
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return self.open_new(state),
            Err(e) => return Err(e),
        };
        if meta.len() + write_len >= self.policy.max_size {
            return self.rotate(state);
        }

        match OpenOptions::new().append(true).open(path) {
            Ok(file) => {
                state.file = Some(file);
                state.size = meta.len();
                Ok(())
            }
            Err(_) => self.open_new(state),
        }
    }

    fn open_new(&self, state: &mut State) -> io::Result<()> {
        fs::create_dir_all(self.name.dir())?;

        let path = self.name.path();
        let permissions = match fs::metadata(path) {
            Ok(meta) => {
                fs::rename(path, self.name.unused_backup_path(OffsetDateTime::now_utc()))?;
                Some(meta.permissions())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        let file = new_file(path)?;
        if let Some(permissions) = permissions {
            file.set_permissions(permissions)?;
        }
        state.file = Some(file);
        state.size = 0;
        Ok(())
    }

    fn rotate(&self, state: &mut State) -> io::Result<()> {
        state.file = None;
        self.open_new(state)?;
        self.mill();
        Ok(())
    }

    fn mill(&self) {
        if let Err(e) = cleanup::mill(&self.name, &self.policy, OffsetDateTime::now_utc()) {
            eprintln!(
                "tno-logger: failed to clean up backups of {}: {e}",
                self.name.path().display()
            );
        }
    }
}

fn new_file(path: &Path) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path)
}

impl Write for &RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock()?;
        self.shared.write(&mut state, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.lock()?;
        match state.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Write for RollingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self).flush()
    }
}

impl<'a> MakeWriter<'a> for RollingFileWriter {
    type Writer = &'a RollingFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}
