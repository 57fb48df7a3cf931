//! Write-ahead log writer
//!
//! Append-only log of order intents, fsynced on every append so that an
//! acknowledged command survives a crash. Files rotate by size and age
//! and old files are deleted beyond a retention count.
//!
//! # Binary format (per record)
//! ```text
//! [body_len: u32 LE]
//! [body: bincode of WalRecord]
//! ```
//! The record checksum is the base-31 rolling hash of the body serialized
//! with the checksum field set to zero.

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use types::order::OrderIntent;
use types::time::unix_millis;

use crate::checksum::rolling_checksum;
use crate::reader;

/// Upper bound on a single record body, anything larger is corruption.
pub const MAX_RECORD_LEN: usize = 10 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// One durably logged command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalRecord {
    /// Gapless per-stream sequence, starts at 1 on a fresh stream.
    pub seq: u64,
    pub intent: OrderIntent,
    /// Unix milliseconds when the record was appended.
    pub timestamp: i64,
    /// Rolling checksum over the record with this field zeroed.
    pub checksum: u64,
}

impl WalRecord {
    pub fn new(seq: u64, intent: OrderIntent, timestamp: i64) -> Result<Self, WalError> {
        let mut record = Self {
            seq,
            intent,
            timestamp,
            checksum: 0,
        };
        record.checksum = record.compute_checksum()?;
        Ok(record)
    }

    fn compute_checksum(&self) -> Result<u64, WalError> {
        let mut zeroed = self.clone();
        zeroed.checksum = 0;
        let bytes = bincode::serialize(&zeroed)?;
        Ok(rolling_checksum(&bytes))
    }

    pub fn verify_checksum(&self) -> bool {
        self.compute_checksum()
            .map(|expected| expected == self.checksum)
            .unwrap_or(false)
    }

    /// Serialize to the length-prefixed wire format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WalError> {
        let body = bincode::serialize(self)?;
        let mut buf = Vec::with_capacity(4 + body.len());
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    /// Deserialize one record from the front of `data`.
    ///
    /// Returns `(record, bytes_consumed)`. Checksum verification is the
    /// caller's job.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), WalError> {
        let (body, consumed) = Self::read_frame(data)?;
        let record: WalRecord = bincode::deserialize(body)?;
        Ok((record, consumed))
    }

    /// Split one length-prefixed frame off the front of `data`.
    ///
    /// Returns `(body, bytes_consumed)`. Only the frame is validated here,
    /// not the body: an undecodable body is a single bad record, while a
    /// bad length prefix or a truncated frame means the rest of the file
    /// cannot be walked at all.
    pub(crate) fn read_frame(data: &[u8]) -> Result<(&[u8], usize), WalError> {
        if data.len() < 4 {
            return Err(WalError::Corrupt("not enough data for length prefix".into()));
        }
        let body_len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if body_len == 0 || body_len > MAX_RECORD_LEN {
            return Err(WalError::Corrupt(format!(
                "implausible record length: {body_len}"
            )));
        }
        let total = 4 + body_len;
        if data.len() < total {
            return Err(WalError::Corrupt(format!(
                "truncated record: need {} bytes, have {}",
                total,
                data.len()
            )));
        }
        Ok((&data[4..total], total))
    }
}

/// Configuration for one WAL stream.
///
/// Files live under `dir/instance_id/` and are named
/// `wal-{instance_id}-{index:06}.log`.
#[derive(Debug, Clone)]
pub struct WalConfig {
    pub dir: PathBuf,
    pub instance_id: String,
    /// Maximum file size in bytes before rotation.
    pub max_file_size: u64,
    /// Maximum file age in milliseconds before rotation.
    pub max_file_age_ms: i64,
    /// Number of newest files kept after rotation.
    pub retained_files: usize,
}

impl WalConfig {
    pub fn new(dir: impl Into<PathBuf>, instance_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            instance_id: instance_id.into(),
            max_file_size: 64 * 1024 * 1024,
            max_file_age_ms: 60 * 60 * 1000,
            retained_files: 10,
        }
    }

    pub fn stream_dir(&self) -> PathBuf {
        self.dir.join(&self.instance_id)
    }
}

/// Append-only WAL writer.
///
/// Single-producer by ownership: appending takes `&mut self` and the
/// writer is not clonable, so sequence numbers stay gapless without any
/// locking.
pub struct WalWriter {
    config: WalConfig,
    file: File,
    current_path: PathBuf,
    current_size: u64,
    opened_at_ms: i64,
    file_index: u64,
    next_seq: u64,
}

impl WalWriter {
    /// Open a writer, creating the stream directory if needed.
    ///
    /// Scans existing files so that the sequence continues past anything
    /// already on disk, then always starts a fresh file.
    pub fn open(config: WalConfig) -> Result<Self, WalError> {
        let dir = config.stream_dir();
        fs::create_dir_all(&dir)?;

        let next_seq = reader::scan_max_seq(&dir) + 1;
        let file_index = find_latest_index(&dir) + 1;
        let current_path = wal_path(&dir, &config.instance_id, file_index);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&current_path)?;

        Ok(Self {
            config,
            file,
            current_path,
            current_size: 0,
            opened_at_ms: unix_millis(),
            file_index,
            next_seq,
        })
    }

    /// Sequence the next append will receive.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn current_path(&self) -> &Path {
        &self.current_path
    }

    /// Append one intent and fsync.
    ///
    /// Returns the record's sequence. When this returns `Ok`, the record
    /// is durable and the command may be acknowledged upstream.
    pub fn append(&mut self, intent: &OrderIntent) -> Result<u64, WalError> {
        let now = unix_millis();
        if self.current_size >= self.config.max_file_size
            || now - self.opened_at_ms >= self.config.max_file_age_ms
        {
            self.rotate()?;
        }

        let seq = self.next_seq;
        let record = WalRecord::new(seq, intent.clone(), now)?;
        let bytes = record.to_bytes()?;
        self.file.write_all(&bytes)?;
        self.file.sync_all()?;

        self.current_size += bytes.len() as u64;
        self.next_seq += 1;
        Ok(seq)
    }

    /// Switch to a fresh file, then prune old ones.
    ///
    /// The new file is created before the old one is released, so a
    /// failure here leaves the writer on the old file with all state
    /// intact.
    fn rotate(&mut self) -> Result<(), WalError> {
        let dir = self.config.stream_dir();
        let next_index = self.file_index + 1;
        let next_path = wal_path(&dir, &self.config.instance_id, next_index);
        let next_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&next_path)?;

        self.file.sync_all()?;
        self.file = next_file;
        self.current_path = next_path;
        self.current_size = 0;
        self.opened_at_ms = unix_millis();
        self.file_index = next_index;

        self.cleanup(&dir);
        Ok(())
    }

    /// Delete everything older than the newest `retained_files` files.
    /// Best effort; a failed delete is logged and retried on the next
    /// rotation.
    fn cleanup(&self, dir: &Path) {
        let mut files = list_wal_files(dir);
        if files.len() <= self.config.retained_files {
            return;
        }
        files.sort_by_key(|(index, _)| *index);
        let excess = files.len() - self.config.retained_files;
        for (_, path) in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to delete old wal file");
            }
        }
    }
}

pub(crate) fn wal_path(dir: &Path, instance_id: &str, index: u64) -> PathBuf {
    dir.join(format!("wal-{instance_id}-{index:06}.log"))
}

/// All WAL files in `dir` with their parsed indexes, unsorted.
pub(crate) fn list_wal_files(dir: &Path) -> Vec<(u64, PathBuf)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let path = e.path();
            let name = e.file_name().to_string_lossy().to_string();
            let index = name
                .strip_prefix("wal-")?
                .strip_suffix(".log")?
                .rsplit('-')
                .next()?
                .parse::<u64>()
                .ok()?;
            Some((index, path))
        })
        .collect()
}

fn find_latest_index(dir: &Path) -> u64 {
    list_wal_files(dir)
        .into_iter()
        .map(|(index, _)| index)
        .max()
        .unwrap_or(0)
}
