//! Logging setup for Stencil Scout binaries.
//!
//! Events go to a size-rotated log file under `~/.stencil_scout/logs` and to
//! stderr. `RUST_LOG` overrides the default filter for both.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "stencil=info,stencil_scout=info";
const HOME_ENV: &str = "STENCIL_HOME";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Logging configuration for one binary run.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Show the full filter on stderr instead of warnings only
    pub verbose: bool,
}

/// Initialize tracing with a rotating file writer and stderr output.
///
/// If the log directory cannot be created, logging continues on stderr only.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let file_filter = env_filter();
    let console_filter = if config.verbose {
        env_filter()
    } else {
        EnvFilter::new("warn")
    };

    let file_layer = match ensure_logs_dir()
        .and_then(|dir| SharedRollingWriter::new(dir, config.app_name))
    {
        Ok(writer) => Some(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter),
        ),
        Err(err) => {
            eprintln!("Warning: file logging disabled: {:#}", err);
            None
        }
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(app = config.app_name, logs = %logs_dir().display(), "Logging initialized");
    Ok(())
}

/// `RUST_LOG` if set, else the default filter.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Home directory for Stencil Scout state: `~/.stencil_scout`, or `$STENCIL_HOME`.
pub fn stencil_home() -> PathBuf {
    if let Ok(override_path) = std::env::var(HOME_ENV) {
        return PathBuf::from(override_path);
    }
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".stencil_scout")
}

/// Logs directory: `<home>/logs`
pub fn logs_dir() -> PathBuf {
    stencil_home().join("logs")
}

/// Ensure the logs directory exists.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let logs = logs_dir();
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs)
}

/// Appends to `<name>.log`, shifting it to `<name>.log.1`, `.2`, ... once it
/// grows past `max_size`. At most `max_files` files are kept.
struct RollingFileAppender {
    dir: PathBuf,
    base_name: String,
    max_files: usize,
    max_size: u64,
    file: Option<File>,
    written: u64,
}

impl RollingFileAppender {
    fn open(dir: PathBuf, base_name: &str, max_files: usize, max_size: u64) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        let mut appender = Self {
            dir,
            base_name: sanitize_name(base_name),
            max_files: max_files.max(1),
            max_size,
            file: None,
            written: 0,
        };
        appender.reopen()?;
        if appender.written > appender.max_size {
            appender.roll()?;
        }
        Ok(appender)
    }

    fn active_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.base_name))
    }

    fn backup_path(&self, generation: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.base_name, generation))
    }

    fn reopen(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.active_path())?;
        self.written = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    fn roll(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }

        let oldest = self.max_files - 1;
        if oldest == 0 {
            // Single file: start over
            fs::remove_file(self.active_path()).or_else(ignore_missing)?;
            return self.reopen();
        }

        fs::remove_file(self.backup_path(oldest)).or_else(ignore_missing)?;
        for generation in (1..oldest).rev() {
            fs::rename(self.backup_path(generation), self.backup_path(generation + 1))
                .or_else(ignore_missing)?;
        }
        fs::rename(self.active_path(), self.backup_path(1)).or_else(ignore_missing)?;

        self.reopen()
    }
}

fn ignore_missing(err: io::Error) -> io::Result<()> {
    if err.kind() == io::ErrorKind::NotFound {
        Ok(())
    } else {
        Err(err)
    }
}

impl Write for RollingFileAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_size {
            self.roll()?;
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file unavailable"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Cloneable handle handed to `tracing_subscriber` as a `MakeWriter`.
#[derive(Clone)]
struct SharedRollingWriter {
    inner: Arc<Mutex<RollingFileAppender>>,
}

impl SharedRollingWriter {
    fn new(dir: PathBuf, app_name: &str) -> Result<Self> {
        let appender = RollingFileAppender::open(dir, app_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
            .with_context(|| format!("Failed to open log file for {}", app_name))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(appender)),
        })
    }

    fn with_appender<T>(&self, f: impl FnOnce(&mut RollingFileAppender) -> io::Result<T>) -> io::Result<T> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        f(&mut guard)
    }
}

impl Write for SharedRollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_appender(|appender| appender.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_appender(|appender| appender.flush())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedRollingWriter {
    type Writer = SharedRollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("stencil"), "stencil");
        assert_eq!(sanitize_name("stencil scan/v1"), "stencil_scan_v1");
    }

    #[test]
    fn test_appender_rolls_over() {
        let temp = TempDir::new().unwrap();
        let mut appender = RollingFileAppender::open(temp.path().to_path_buf(), "test", 3, 10).unwrap();

        appender.write_all(b"0123456789").unwrap();
        appender.write_all(b"abcdefghij").unwrap();
        appender.write_all(b"KLMNOPQRST").unwrap();
        appender.write_all(b"uvwxyz").unwrap();
        appender.flush().unwrap();

        let read = |name: &str| fs::read_to_string(temp.path().join(name)).unwrap();
        assert_eq!(read("test.log"), "uvwxyz");
        assert_eq!(read("test.log.1"), "KLMNOPQRST");
        assert_eq!(read("test.log.2"), "abcdefghij");
        assert!(!temp.path().join("test.log.3").exists());
    }

    #[test]
    fn test_single_file_appender_truncates() {
        let temp = TempDir::new().unwrap();
        let mut appender = RollingFileAppender::open(temp.path().to_path_buf(), "one", 1, 4).unwrap();
        appender.write_all(b"aaaa").unwrap();
        appender.write_all(b"bb").unwrap();
        appender.flush().unwrap();

        assert_eq!(fs::read_to_string(temp.path().join("one.log")).unwrap(), "bb");
        assert!(!temp.path().join("one.log.1").exists());
    }

    #[test]
    fn test_appender_resumes_existing_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("resume.log"), "abc").unwrap();

        let mut appender = RollingFileAppender::open(temp.path().to_path_buf(), "resume", 2, 100).unwrap();
        appender.write_all(b"def").unwrap();
        appender.flush().unwrap();

        assert_eq!(fs::read_to_string(temp.path().join("resume.log")).unwrap(), "abcdef");
    }
}
