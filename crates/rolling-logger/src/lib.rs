//! Rolling file logger with an in-memory tail
//!
//! `init_logger` installs a `tracing` subscriber that writes to
//! `<log_dir>/<app_name>.log`, rotating to `<app_name>.1.log`,
//! `<app_name>.2.log`, ... once the file passes `MAX_FILE_BYTES`. Records from
//! the `log` facade are bridged into the same subscriber. The last
//! `BUFFER_LINES` lines are also kept in memory for `recent_lines`.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;
pub const MAX_ROTATED_FILES: usize = 3;
pub const BUFFER_LINES: usize = 500;

static INITIALIZED: OnceLock<()> = OnceLock::new();
static RECENT: OnceLock<Mutex<LineBuffer>> = OnceLock::new();

fn recent() -> &'static Mutex<LineBuffer> {
    RECENT.get_or_init(|| Mutex::new(LineBuffer::new(BUFFER_LINES)))
}

/// Fixed-capacity buffer that drops the oldest line when full
#[derive(Debug)]
pub struct LineBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

/// Log file that rotates itself by size
#[derive(Debug)]
pub struct RollingFile {
    dir: PathBuf,
    name: String,
    max_bytes: u64,
    keep: usize,
    file: File,
    size: u64,
}

impl RollingFile {
    pub fn open(dir: &Path, name: &str, max_bytes: u64, keep: usize) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.log", name));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            max_bytes,
            keep,
            file,
            size,
        })
    }

    fn path(&self, index: usize) -> PathBuf {
        if index == 0 {
            self.dir.join(format!("{}.log", self.name))
        } else {
            self.dir.join(format!("{}.{}.log", self.name, index))
        }
    }

    /// Shift `name.N.log` to `name.N+1.log`, dropping the oldest
    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.keep == 0 {
            self.file = File::create(self.path(0))?;
            self.size = 0;
            return Ok(());
        }
        let oldest = self.path(self.keep);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (0..self.keep).rev() {
            let from = self.path(index);
            if from.exists() {
                fs::rename(&from, self.path(index + 1))?;
            }
        }
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(0))?;
        self.size = 0;
        Ok(())
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.size > 0 && self.size + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let written = self.file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Shared handle handed to the `fmt` layer
#[derive(Debug, Clone)]
pub struct RollingWriter {
    file: Arc<Mutex<RollingFile>>,
}

impl RollingWriter {
    pub fn new(file: RollingFile) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut lines) = recent().lock() {
            for line in String::from_utf8_lossy(buf).lines() {
                lines.push(line.to_string());
            }
        }
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.lock() {
            Ok(mut file) => file.flush(),
            Err(_) => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Install the global subscriber; call once at startup
pub fn init_logger(log_dir: PathBuf, app_name: &str) -> Result<(), String> {
    if INITIALIZED.get().is_some() {
        return Err("logger already initialized".to_string());
    }
    let file = RollingFile::open(&log_dir, app_name, MAX_FILE_BYTES, MAX_ROTATED_FILES)
        .map_err(|e| format!("Failed to open log file in {}: {}", log_dir.display(), e))?;

    tracing_subscriber::fmt()
        .with_writer(RollingWriter::new(file))
        .with_timer(LocalTime)
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish()
        .try_init()
        .map_err(|e| format!("Failed to install subscriber: {}", e))?;

    let _ = INITIALIZED.set(());
    tracing::info!("{} logging to {}", app_name, log_dir.display());
    Ok(())
}

fn ensure_initialized() -> Result<(), String> {
    INITIALIZED
        .get()
        .map(|_| ())
        .ok_or_else(|| "logger not initialized".to_string())
}

pub fn info(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::info!("{}", msg);
    Ok(())
}

pub fn warn(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::warn!("{}", msg);
    Ok(())
}

pub fn error(msg: &str) -> Result<(), String> {
    ensure_initialized()?;
    tracing::error!("{}", msg);
    Ok(())
}

/// The most recent formatted log lines, oldest first
pub fn recent_lines() -> Vec<String> {
    recent().lock().map(|lines| lines.lines()).unwrap_or_default()
}
