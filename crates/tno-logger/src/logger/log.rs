use time::UtcOffset;
use tracing::{Dispatch, dispatcher::DefaultGuard};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
};

use crate::{
    logger::{
        attr::replace_attr,
        config::LogConfig,
        error::LoggerError,
        level::LoggerLevel,
        mode::Mode,
        render::{ConsoleFormat, JsonFormat},
    },
    rotate::RollingFileWriter,
};

/// A configured logging pipeline. Nothing is installed globally on construction.
#[derive(Clone)]
pub struct Logger {
    mode: Mode,
    dispatch: Dispatch,
    file: Option<RollingFileWriter>,
}

impl Logger {
    pub(crate) fn console<W>(cfg: &LogConfig, make_writer: W, use_color: bool) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let fmt_layer = fmt::layer()
            .event_format(ConsoleFormat::new(mk_offset(), replace_attr))
            .with_ansi(use_color)
            .with_writer(make_writer);

        let subscriber = tracing_subscriber::registry()
            .with(mk_filter(cfg.minimum_level))
            .with(fmt_layer);
        Self {
            mode: Mode::Interactive,
            dispatch: Dispatch::new(subscriber),
            file: None,
        }
    }

    pub(crate) fn json<W>(cfg: &LogConfig, make_writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let fmt_layer = fmt::layer()
            .event_format(JsonFormat::new(mk_offset(), replace_attr))
            .with_ansi(false)
            .with_writer(make_writer);

        let subscriber = tracing_subscriber::registry()
            .with(mk_filter(cfg.minimum_level))
            .with(fmt_layer);
        Self {
            mode: Mode::Production,
            dispatch: Dispatch::new(subscriber),
            file: None,
        }
    }

    pub(crate) fn with_file(mut self, file: RollingFileWriter) -> Self {
        self.file = Some(file);
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn file(&self) -> Option<&RollingFileWriter> {
        self.file.as_ref()
    }

    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Makes this logger the current thread's default until the guard is dropped.
    pub fn set_default(&self) -> DefaultGuard {
        tracing::dispatcher::set_default(&self.dispatch)
    }

    /// Installs this logger as the process-wide default. Works once per process.
    pub fn init_global(&self) -> Result<(), LoggerError> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|_| LoggerError::AlreadyInitialized)
    }
}

fn mk_filter(level: LoggerLevel) -> LevelFilter {
    level.into()
}

fn mk_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io,
        path::PathBuf,
        sync::{Arc, Mutex},
    };

    use serde_json::Value;
    use tracing::{debug, error, info, warn};

    use crate::logger_new;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn cfg(mode: Mode, level: LoggerLevel, path: PathBuf) -> LogConfig {
        LogConfig {
            mode,
            destination_path: path,
            minimum_level: level,
            use_color: false,
        }
    }

    fn assert_time_shape(time: &str) {
        let bytes = time.as_bytes();
        assert_eq!(bytes.len(), 19, "{time}");
        for (idx, b) in bytes.iter().enumerate() {
            match idx {
                4 | 7 => assert_eq!(*b, b'-', "{time}"),
                10 => assert_eq!(*b, b' ', "{time}"),
                13 | 16 => assert_eq!(*b, b':', "{time}"),
                _ => assert!(b.is_ascii_digit(), "{time}"),
            }
        }
    }

    #[test]
    fn console_line_has_rewritten_time_and_source() {
        let out = Capture::default();
        let logger = Logger::console(
            &cfg(Mode::Interactive, LoggerLevel::Info, PathBuf::new()),
            out.clone(),
            false,
        );

        logger.in_scope(|| info!(user = "ana", attempt = 3, "request served"));

        let text = out.contents();
        let mut lines = text.lines();
        let line = lines.next().unwrap();
        assert!(lines.next().is_none());

        let (time, rest) = line.split_at(19);
        assert_time_shape(time);
        assert!(rest.starts_with(" INF tno_logger log.rs:"), "{line}");
        assert!(rest.ends_with(" request served user=ana attempt=3"), "{line}");
    }

    #[test]
    fn console_drops_records_below_minimum_level() {
        let out = Capture::default();
        let logger = Logger::console(
            &cfg(Mode::Interactive, LoggerLevel::Warn, PathBuf::new()),
            out.clone(),
            false,
        );

        logger.in_scope(|| {
            debug!("noise");
            info!("still noise");
            warn!(disk = "sda1", "disk almost full");
            error!("disk full");
        });

        let text = out.contents();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2, "{text}");
        assert!(lines[0].contains(" WRN ") && lines[0].contains("disk almost full disk=sda1"));
        assert!(lines[1].contains(" ERR ") && lines[1].ends_with("disk full"));
        assert!(!text.contains("noise"));
    }

    #[test]
    fn json_lines_are_independent_objects() {
        let out = Capture::default();
        let logger = Logger::json(
            &cfg(Mode::Production, LoggerLevel::Debug, PathBuf::new()),
            out.clone(),
        );

        logger.in_scope(|| {
            info!(order_id = 42, paid = true, customer = "ana", total = 12.5, "order placed");
            debug!(delta = -7, "stock adjusted");
        });

        let text = out.contents();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2, "{text}");
        assert!(lines[0].starts_with(r#"{"time":""#), "{}", lines[0]);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_time_shape(first["time"].as_str().unwrap());
        assert_eq!(first["level"], "INFO");
        assert!(
            first["source"]
                .as_str()
                .unwrap()
                .starts_with("tno_logger log.rs:")
        );
        assert_eq!(first["msg"], "order placed");
        assert_eq!(first["order_id"], 42);
        assert_eq!(first["paid"], true);
        assert_eq!(first["customer"], "ana");
        assert_eq!(first["total"], 12.5);

        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["level"], "DEBUG");
        assert_eq!(second["delta"], -7);
    }

    #[test]
    fn json_drops_records_below_minimum_level() {
        let out = Capture::default();
        let logger = Logger::json(
            &cfg(Mode::Production, LoggerLevel::Error, PathBuf::new()),
            out.clone(),
        );

        logger.in_scope(|| {
            info!("ignored");
            warn!("ignored too");
        });

        assert!(out.contents().is_empty());
    }

    #[test]
    fn unknown_mode_builds_interactive_logger() {
        let parsed: LogConfig =
            serde_json::from_str(r#"{ "mode": "staging", "use_color": false }"#).unwrap();
        let fallback = logger_new(&parsed);
        let explicit = logger_new(&LogConfig {
            mode: Mode::Interactive,
            ..parsed.clone()
        });

        assert_eq!(fallback.mode(), Mode::Interactive);
        assert_eq!(fallback.mode(), explicit.mode());
        assert!(fallback.file().is_none());
        assert!(explicit.file().is_none());
    }

    #[test]
    fn production_logger_writes_json_to_rotating_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/agent.log");
        let config = cfg(Mode::Production, LoggerLevel::Info, path.clone());

        let logger = logger_new(&config);
        assert_eq!(logger.mode(), Mode::Production);
        assert_eq!(logger.file().unwrap().path(), path.as_path());
        assert_eq!(logger.file().unwrap().policy(), &crate::RotationPolicy::FIXED);
        assert!(!path.exists());

        logger.in_scope(|| {
            debug!("dropped");
            info!(job = "sync", "job finished");
        });

        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 1, "{body}");
        let record: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["msg"], "job finished");
        assert_eq!(record["job"], "sync");
    }

    #[test]
    fn repeated_construction_appends_to_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.log");
        let config = cfg(Mode::Production, LoggerLevel::Info, path.clone());

        for round in 0..3 {
            let logger = logger_new(&config);
            logger.in_scope(|| info!(round, "started"));
        }

        let body = std::fs::read_to_string(&path).unwrap();
        let rounds: Vec<u64> = body
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["round"].as_u64().unwrap())
            .collect();
        assert_eq!(rounds, vec![0, 1, 2]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn reconstruction_keeps_existing_backups_intact() {
        use flate2::{Compression, read::GzDecoder, write::GzEncoder};
        use std::{fs, fs::File, io::Read, io::Write};
        use time::{OffsetDateTime, macros::format_description};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.log");
        let now = OffsetDateTime::now_utc();
        let stamp = |hours_ago: i64| {
            (now - time::Duration::hours(hours_ago))
                .format(format_description!(
                    "[year]-[month]-[day]T[hour]-[minute]-[second].[subsecond digits:3]"
                ))
                .unwrap()
        };

        let compressed = [(3, "oldest backup\n"), (2, "older backup\n")];
        for (age, body) in compressed {
            let file = File::create(dir.path().join(format!("agent-{}.log.gz", stamp(age)))).unwrap();
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(body.as_bytes()).unwrap();
            encoder.finish().unwrap();
        }
        let plain = format!("agent-{}.log", stamp(1));
        fs::write(dir.path().join(&plain), "recent backup\n").unwrap();
        fs::write(&path, "active\n").unwrap();

        let config = cfg(Mode::Production, LoggerLevel::Info, path.clone());
        for round in 0..3 {
            let logger = logger_new(&config);
            logger.in_scope(|| info!(round, "restarted"));
        }

        let read_gz = |name: &str| {
            let mut body = String::new();
            GzDecoder::new(File::open(dir.path().join(name)).unwrap())
                .read_to_string(&mut body)
                .unwrap();
            body
        };
        for (age, body) in compressed {
            assert_eq!(read_gz(&format!("agent-{}.log.gz", stamp(age))), body);
        }
        assert!(!dir.path().join(&plain).exists());
        assert_eq!(read_gz(&format!("{plain}.gz")), "recent backup\n");

        let backups = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name() != "agent.log")
            .count();
        assert!(backups <= 3, "{backups} backups left");

        let active = fs::read_to_string(&path).unwrap();
        assert!(active.starts_with("active\n"), "{active}");
        assert_eq!(active.lines().count(), 4);
    }

    #[test]
    fn caller_field_with_builtin_key_is_a_second_entry() {
        let out = Capture::default();
        let logger = Logger::json(
            &cfg(Mode::Production, LoggerLevel::Info, PathBuf::new()),
            out.clone(),
        );

        logger.in_scope(|| info!(msg = "from caller", "from event"));

        let line = out.contents();
        let builtin = line.find(r#""msg":"from event""#).unwrap();
        let caller = line.find(r#""msg":"from caller""#).unwrap();
        assert!(builtin < caller, "{line}");
    }

    #[test]
    fn default_guard_scopes_the_logger() {
        let out = Capture::default();
        let logger = Logger::console(
            &cfg(Mode::Interactive, LoggerLevel::Info, PathBuf::new()),
            out.clone(),
            false,
        );

        {
            let _guard = logger.set_default();
            info!("inside guard");
        }
        info!("after guard");
        tracing::dispatcher::with_default(logger.dispatch(), || info!("through dispatch"));

        let text = out.contents();
        assert!(text.contains("inside guard"), "{text}");
        assert!(text.contains("through dispatch"), "{text}");
        assert!(!text.contains("after guard"), "{text}");
    }

    #[test]
    fn global_install_happens_once() {
        let logger = Logger::json(
            &cfg(Mode::Production, LoggerLevel::Error, PathBuf::new()),
            Capture::default(),
        );
        let _ = logger.init_global();
        assert!(matches!(
            logger.init_global(),
            Err(LoggerError::AlreadyInitialized)
        ));
    }
}
