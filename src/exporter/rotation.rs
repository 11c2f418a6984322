//! Size-based log file rotation with age and count pruning.
//!
//! The active file keeps its configured name. When a write would push it past
//! the size limit it is renamed to `<stem>-<timestamp>.<ext>` and a fresh file
//! is opened in its place. Old backups are pruned after every rotation.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layout embedded in backup file names.
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

const MEGABYTE: u64 = 1024 * 1024;

fn default_max_megabytes() -> u64 {
    100
}

fn default_max_backups() -> usize {
    100
}

/// Rotation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Size limit of the active file in megabytes (default: 100).
    #[serde(default = "default_max_megabytes")]
    pub max_megabytes: u64,
    /// Days to retain backups; 0 keeps them regardless of age.
    #[serde(default)]
    pub max_days: u64,
    /// Number of backups to retain (default: 100); 0 keeps all.
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
    /// Use local time instead of UTC in backup names.
    #[serde(default)]
    pub local_time: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            max_megabytes: default_max_megabytes(),
            max_days: 0,
            max_backups: default_max_backups(),
            local_time: false,
        }
    }
}

/// A file writer that rotates by size.
///
/// Not internally synchronized; callers serialize access.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    max_age: Option<Duration>,
    max_backups: usize,
    local_time: bool,
    file: Option<File>,
    size: u64,
}

impl RotatingFile {
    /// Create a writer for `path`. The file is opened on first write.
    pub fn new(path: impl Into<PathBuf>, config: &RotationConfig) -> Self {
        let max_megabytes = if config.max_megabytes == 0 {
            default_max_megabytes()
        } else {
            config.max_megabytes
        };
        Self {
            path: path.into(),
            max_bytes: max_megabytes * MEGABYTE,
            max_age: (config.max_days > 0)
                .then(|| Duration::from_secs(config.max_days * 24 * 60 * 60)),
            max_backups: config.max_backups,
            local_time: config.local_time,
            file: None,
            size: 0,
        }
    }

    /// Override the size limit in bytes.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes.max(1);
        self
    }

    /// Path of the active file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `buf` in full to the active file, rotating first if it would not fit.
    ///
    /// # Errors
    /// Returns `InvalidInput` if `buf` alone exceeds the size limit, or any
    /// I/O error from opening, renaming or writing.
    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let len = buf.len() as u64;
        if len > self.max_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "write length {} exceeds maximum file size {}",
                    len, self.max_bytes
                ),
            ));
        }

        if self.file.is_none() {
            self.open_existing_or_new(len)?;
        } else if self.size + len > self.max_bytes {
            self.rotate()?;
        }

        let Some(file) = self.file.as_mut() else {
            return Err(io::Error::other("rotating file not open"));
        };
        file.write_all(buf)?;
        self.size += len;
        Ok(())
    }

    /// Flush and close the active file. Safe to call repeatedly.
    pub fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(mut file) => {
                self.size = 0;
                file.flush()
            }
            None => Ok(()),
        }
    }

    /// Move the active file aside and start a new one.
    fn rotate(&mut self) -> io::Result<()> {
        self.close()?;
        self.open_new()?;
        self.prune();
        Ok(())
    }

    fn open_existing_or_new(&mut self, write_len: u64) -> io::Result<()> {
        let existing = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return self.open_new(),
            Err(e) => return Err(e),
        };
        if existing + write_len > self.max_bytes {
            return self.rotate();
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.file = Some(file);
        self.size = existing;
        Ok(())
    }

    /// Move any current file aside and create an empty one.
    fn open_new(&mut self) -> io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        if self.path.exists() {
            let backup = self.backup_path();
            fs::rename(&self.path, &backup)?;
            tracing::debug!(from = %self.path.display(), to = %backup.display(), "Rotated file");
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.file = Some(file);
        self.size = 0;
        Ok(())
    }

    fn now(&self) -> NaiveDateTime {
        if self.local_time {
            Local::now().naive_local()
        } else {
            Utc::now().naive_utc()
        }
    }

    fn name_parts(&self) -> (String, String) {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self
            .path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (stem, ext)
    }

    fn backup_path(&self) -> PathBuf {
        let (stem, ext) = self.name_parts();
        let mut ts = self.now();
        loop {
            let name = format!("{}-{}{}", stem, ts.format(BACKUP_TIME_FORMAT), ext);
            let candidate = self.path.with_file_name(name);
            if !candidate.exists() {
                return candidate;
            }
            // two rotations within one millisecond
            ts += chrono::Duration::milliseconds(1);
        }
    }

    /// Existing backups, newest first.
    fn backups(&self) -> io::Result<Vec<(NaiveDateTime, PathBuf)>> {
        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let (stem, ext) = self.name_parts();
        let prefix = format!("{stem}-");

        let mut backups = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(ts) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(ext.as_str()))
            else {
                continue;
            };
            if let Ok(ts) = NaiveDateTime::parse_from_str(ts, BACKUP_TIME_FORMAT) {
                backups.push((ts, entry.path()));
            }
        }
        backups.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(backups)
    }

    /// Remove backups beyond the count and age limits.
    fn prune(&self) {
        if self.max_backups == 0 && self.max_age.is_none() {
            return;
        }
        let backups = match self.backups() {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to list backups");
                return;
            }
        };

        let cutoff = self
            .max_age
            .and_then(|age| chrono::Duration::from_std(age).ok())
            .map(|age| self.now() - age);

        for (idx, (ts, path)) in backups.iter().enumerate() {
            let too_many = self.max_backups > 0 && idx >= self.max_backups;
            let too_old = cutoff.is_some_and(|cutoff| *ts < cutoff);
            if (too_many || too_old)
                && let Err(e) = fs::remove_file(path)
            {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove backup");
            }
        }
    }
}

impl Drop for RotatingFile {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backups_in(dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with("out-"))
            .collect();
        found.sort();
        found
    }

    #[test]
    fn test_default_config() {
        let config = RotationConfig::default();
        assert_eq!(config.max_megabytes, 100);
        assert_eq!(config.max_backups, 100);
        assert_eq!(config.max_days, 0);
        assert!(!config.local_time);
    }

    #[test]
    fn test_writes_without_rotation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let mut file = RotatingFile::new(&path, &RotationConfig::default());

        file.write_all(b"one\n").unwrap();
        file.write_all(b"two\n").unwrap();
        file.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
        assert!(backups_in(dir.path()).is_empty());
    }

    #[test]
    fn test_rotation_never_splits_a_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let mut file = RotatingFile::new(&path, &RotationConfig::default()).with_max_bytes(10);

        file.write_all(b"aaaaaa\n").unwrap();
        file.write_all(b"bbbbbb\n").unwrap();
        file.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "bbbbbb\n");
        let backups = backups_in(dir.path());
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "aaaaaa\n");
        let name = backups[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn test_prunes_beyond_max_backups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let config = RotationConfig {
            max_backups: 2,
            ..Default::default()
        };
        let mut file = RotatingFile::new(&path, &config).with_max_bytes(4);

        for line in [b"1\n", b"2\n", b"3\n", b"4\n", b"5\n", b"6\n", b"7\n", b"8\n"] {
            file.write_all(line).unwrap();
            file.write_all(line).unwrap();
        }
        file.close().unwrap();

        assert_eq!(backups_in(dir.path()).len(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "8\n8\n");
    }

    #[test]
    fn test_oversized_write_rejected() {
        let dir = TempDir::new().unwrap();
        let mut file =
            RotatingFile::new(dir.path().join("out.json"), &RotationConfig::default()).with_max_bytes(3);
        let err = file.write_all(b"too long").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_close_is_idempotent_and_write_reopens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let mut file = RotatingFile::new(&path, &RotationConfig::default());

        file.write_all(b"a\n").unwrap();
        file.close().unwrap();
        file.close().unwrap();
        file.write_all(b"b\n").unwrap();
        file.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_existing_file_is_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "old\n").unwrap();

        let mut file = RotatingFile::new(&path, &RotationConfig::default());
        file.write_all(b"new\n").unwrap();
        file.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "old\nnew\n");
    }

    #[test]
    fn test_prunes_by_age() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let stale = dir.path().join("out-2000-01-01T00-00-00.000.json");
        fs::write(&stale, "ancient\n").unwrap();

        let config = RotationConfig {
            max_days: 1,
            max_backups: 0,
            ..Default::default()
        };
        let mut file = RotatingFile::new(&path, &config).with_max_bytes(4);
        file.write_all(b"1\n").unwrap();
        file.write_all(b"22\n").unwrap();
        file.close().unwrap();

        assert!(!stale.exists());
        assert_eq!(backups_in(dir.path()).len(), 1);
    }
}
