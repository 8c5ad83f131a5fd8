//! Size-rotated log file sink.
//!
//! Backups are `<file>.1` (newest) through `<file>.N` (oldest). When the live
//! file grows past the threshold every backup shifts up by one, the oldest is
//! deleted, and a fresh live file is started.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::repository::sink::{Sink, SinkSpec};

struct OpenFile {
    file: File,
    size: u64,
}

/// Rolling file sink.
pub struct RollingFileSink {
    path: PathBuf,
    max_file_size: u64,
    max_backups: usize,
    current: Mutex<Option<OpenFile>>,
}

impl RollingFileSink {
    pub fn new(path: impl Into<PathBuf>, max_file_size: u64, max_backups: usize) -> Self {
        Self {
            path: path.into(),
            max_file_size,
            max_backups,
            current: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of backup number `index` (1-based).
    pub fn backup_path(&self, index: usize) -> PathBuf {
        backup_path(&self.path, index)
    }

    fn open(&self) -> io::Result<OpenFile> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let size = file.metadata()?.len();
        Ok(OpenFile { file, size })
    }

    fn roll_over(&self) -> io::Result<()> {
        if self.max_backups == 0 {
            // Nothing to keep: start the live file over.
            File::create(&self.path)?;
            return Ok(());
        }

        let oldest = self.backup_path(self.max_backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.max_backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))
    }
}

fn backup_path(base: &Path, index: usize) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(format!(".{}", index));
    PathBuf::from(path)
}

impl Sink for RollingFileSink {
    fn spec(&self) -> SinkSpec {
        SinkSpec::RollingFile {
            path: self.path.clone(),
            max_file_size: self.max_file_size,
            max_backups: self.max_backups,
        }
    }

    fn append(&self, line: &str) -> io::Result<()> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.is_none() {
            *current = Some(self.open()?);
        }

        let rolled = match current.as_mut() {
            Some(open) => {
                open.file.write_all(line.as_bytes())?;
                open.file.write_all(b"\n")?;
                open.size += line.len() as u64 + 1;
                open.size > self.max_file_size
            }
            None => false,
        };

        if rolled {
            // Close before renaming.
            *current = None;
            if let Err(e) = self.roll_over() {
                tracing::warn!(path = ?self.path, error = %e, "Log file rollover failed");
            }
            *current = Some(self.open()?);
        }
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(open) = current.as_mut() {
            open.file.flush()?;
        }
        Ok(())
    }
}
