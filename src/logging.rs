//! Process-wide log subscriber
//!
//! `RUST_LOG` wins over the configured default filter. Without a log path the
//! output goes to stderr; with one it goes to a size-rotated file set
//! (`wallet.log`, `wallet.log.1`, ...).

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::{WalletError, WalletResult};
use crate::wallet::LoggingConfig;

/// Install the global subscriber described by `config`
///
/// Returns `Ok(false)` when another subscriber is already installed, which
/// happens when a host creates more than one wallet per process.
pub fn init_logging(config: &LoggingConfig) -> WalletResult<bool> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .map_err(|e| WalletError::config("default_filter", e.to_string()))?;

    let installed = match &config.log_path {
        Some(path) => {
            let writer = RotatingFile::open(path, config.max_log_files, config.max_log_file_bytes)
                .map_err(|e| WalletError::config("log_path", format!("{}: {e}", path.display())))?;
            fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(Mutex::new(writer))
                .try_init()
                .is_ok()
        }
        None => fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(io::stderr)
            .try_init()
            .is_ok(),
    };
    Ok(installed)
}

/// Log file that rolls over once it reaches `max_bytes`
///
/// At most `max_files` files are kept, the live one included.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    max_files: u32,
    max_bytes: u64,
    file: File,
    written: u64,
}

impl RotatingFile {
    pub fn open(path: impl AsRef<Path>, max_files: u32, max_bytes: u64) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            max_files: max_files.max(1),
            max_bytes: max_bytes.max(1),
            file,
            written,
        })
    }

    fn rotated_path(&self, index: u32) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.max_files > 1 {
            for index in (1..self.max_files - 1).rev() {
                let from = self.rotated_path(index);
                if from.exists() {
                    fs::rename(&from, self.rotated_path(index + 1))?;
                }
            }
            fs::rename(&self.path, self.rotated_path(1))?;
        }
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
