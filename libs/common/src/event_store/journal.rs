//! Append-only journal backing the event store.
//!
//! Every durable mutation is one JSON line: a winner row or a cursor
//! advance. Opening the journal replays all lines to rebuild the
//! in-memory state, mirroring how the store itself is rebuilt from the
//! chain. Because the file is only ever appended to, there is no rewrite
//! step a crash could tear in half; the one failure mode is a torn final
//! line from a crash mid-append, which replay detects, drops, and
//! truncates away.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::types::{SyncCursor, WinnerEvent};

/// Default path for the event journal
pub const DEFAULT_STORE_PATH: &str = "./winner-events.jsonl";

/// Environment variable overriding the journal path
pub const STORE_PATH_ENV_VAR: &str = "TRACKER_STORE_PATH";

/// Errors raised while replaying or appending the journal
#[derive(Debug)]
pub enum StoreError {
    /// Reading, creating, or writing the journal file failed
    Io { path: String, reason: String },
    /// A record other than the torn tail could not be parsed
    Corrupt {
        path: String,
        line: usize,
        reason: String,
    },
    /// A record could not be serialized
    Encode { reason: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io { path, reason } => {
                write!(f, "Event journal I/O failure at '{}': {}", path, reason)
            }
            StoreError::Corrupt { path, line, reason } => {
                write!(
                    f,
                    "Event journal '{}' has an unreadable record at line {}: {}",
                    path, line, reason
                )
            }
            StoreError::Encode { reason } => {
                write!(f, "Could not encode journal record: {}", reason)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Configuration for the journal-backed store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the journal file
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_STORE_PATH.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new(path: String) -> Self {
        Self { path }
    }

    /// Read the path from the environment, falling back to the default
    pub fn from_env() -> Self {
        let path =
            std::env::var(STORE_PATH_ENV_VAR).unwrap_or_else(|_| DEFAULT_STORE_PATH.to_string());
        Self { path }
    }
}

/// One durable line of the journal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalRecord {
    /// A winner row observed on chain
    Winner(WinnerEvent),
    /// A cursor advance for one contract
    Cursor(SyncCursor),
}

/// Append handle over the journal file.
pub struct Journal {
    path: PathBuf,
    file: File,
}

impl Journal {
    /// Open the journal, replaying every stored record in write order.
    ///
    /// A missing file starts an empty journal. A torn final line is
    /// dropped and truncated so later appends start on a clean record
    /// boundary; an unparsable line anywhere else is corruption and an
    /// error.
    pub fn open(path: &Path) -> Result<(Self, Vec<JournalRecord>), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| Self::io_error(path, e))?;
            }
        }

        let mut records = Vec::new();

        if path.exists() {
            let mut torn: Option<(usize, String)> = None;
            let mut valid_len = 0u64;
            let reader = BufReader::new(File::open(path).map_err(|e| Self::io_error(path, e))?);
            for (index, line) in reader.lines().enumerate() {
                let line = line.map_err(|e| Self::io_error(path, e))?;
                if let Some((line_no, reason)) = torn.take() {
                    // A bad line with data after it is not a torn tail
                    return Err(StoreError::Corrupt {
                        path: path.display().to_string(),
                        line: line_no,
                        reason,
                    });
                }
                let consumed = line.len() as u64 + 1;
                if line.trim().is_empty() {
                    valid_len += consumed;
                    continue;
                }
                match serde_json::from_str(&line) {
                    Ok(record) => {
                        records.push(record);
                        valid_len += consumed;
                    }
                    Err(e) => torn = Some((index + 1, e.to_string())),
                }
            }

            if let Some((line_no, reason)) = torn {
                tracing::warn!(
                    path = %path.display(),
                    line = line_no,
                    %reason,
                    "Dropping torn record left by an interrupted append"
                );
                let file = OpenOptions::new()
                    .write(true)
                    .open(path)
                    .map_err(|e| Self::io_error(path, e))?;
                file.set_len(valid_len).map_err(|e| Self::io_error(path, e))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Self::io_error(path, e))?;

        Ok((
            Self {
                path: path.to_path_buf(),
                file,
            },
            records,
        ))
    }

    /// Append a batch of records as one durable write.
    pub fn append_all(&mut self, records: &[JournalRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for record in records {
            let line = serde_json::to_string(record).map_err(|e| StoreError::Encode {
                reason: e.to_string(),
            })?;
            buf.push_str(&line);
            buf.push('\n');
        }

        self.file
            .write_all(buf.as_bytes())
            .map_err(|e| Self::io_error(&self.path, e))?;
        self.file
            .sync_data()
            .map_err(|e| Self::io_error(&self.path, e))
    }

    fn io_error(path: &Path, e: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    }
}
