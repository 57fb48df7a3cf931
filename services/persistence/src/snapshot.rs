//! Order book snapshots
//!
//! A snapshot is a full serialized book plus the WAL watermark it
//! reflects. Writes are atomic (tmp file, fsync, rename) and files are
//! named by watermark, so the newest snapshot is simply the highest
//! sequence in the directory. Only the newest few per instrument are
//! kept.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use matching_engine::book::OrderBook;
use types::ids::SymbolId;
use types::time::unix_millis;

use crate::checksum::rolling_checksum;

/// Bump on any incompatible change to [`SnapshotData`].
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("unsupported snapshot version: {found}")]
    VersionMismatch { found: u32 },

    #[error("snapshot checksum mismatch")]
    ChecksumMismatch,
}

/// On-disk snapshot payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotData {
    pub version: u32,
    pub symbol_id: SymbolId,
    /// WAL watermark: replay resumes at this sequence + 1.
    pub last_applied_wal_seq: u64,
    pub book: OrderBook,
    /// Unix milliseconds when the snapshot was built.
    pub timestamp: i64,
    /// Rolling checksum over the snapshot with this field zeroed.
    pub checksum: u64,
}

impl SnapshotData {
    /// Build a snapshot from an owned book copy.
    ///
    /// Takes the book by value: the caller hands over a deep copy and the
    /// live book is never reachable from snapshot code.
    pub fn new(book: OrderBook) -> Result<Self, SnapshotError> {
        let mut snapshot = Self {
            version: SNAPSHOT_VERSION,
            symbol_id: book.symbol_id(),
            last_applied_wal_seq: book.last_applied_wal_seq(),
            book,
            timestamp: unix_millis(),
            checksum: 0,
        };
        snapshot.checksum = snapshot.compute_checksum()?;
        Ok(snapshot)
    }

    fn compute_checksum(&self) -> Result<u64, SnapshotError> {
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
}

/// Configuration shared by the snapshot writer and loader.
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub dir: PathBuf,
    pub instance_id: String,
    /// Newest snapshots kept per instrument.
    pub retained: usize,
    /// Scheduler interval in milliseconds.
    pub interval_ms: u64,
}

impl SnapshotConfig {
    pub fn new(dir: impl Into<PathBuf>, instance_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            instance_id: instance_id.into(),
            retained: 12,
            interval_ms: 5 * 60 * 1000,
        }
    }
}

/// Writes snapshots atomically and prunes old ones.
pub struct SnapshotWriter {
    config: SnapshotConfig,
}

impl SnapshotWriter {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    /// Persist a snapshot of the given book copy.
    ///
    /// Written to a `.tmp` sibling, fsynced, then renamed into place, so
    /// a crash mid-write never leaves a half-written `.dat` behind.
    pub fn write(&self, book: OrderBook) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(&self.config.dir)?;

        let snapshot = SnapshotData::new(book)?;
        let bytes = bincode::serialize(&snapshot)?;
        let path = self.snapshot_path(snapshot.symbol_id, snapshot.last_applied_wal_seq);
        let tmp = path.with_extension("tmp");

        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        info!(
            symbol_id = %snapshot.symbol_id,
            wal_seq = snapshot.last_applied_wal_seq,
            orders = snapshot.book.order_count(),
            "snapshot written"
        );
        self.cleanup(snapshot.symbol_id);
        Ok(path)
    }

    fn snapshot_path(&self, symbol_id: SymbolId, seq: u64) -> PathBuf {
        self.config.dir.join(format!(
            "snapshot-{}-{}-{:012}.dat",
            self.config.instance_id, symbol_id, seq
        ))
    }

    /// Best-effort prune of everything older than the newest `retained`.
    fn cleanup(&self, symbol_id: SymbolId) {
        let mut files = list_snapshots(&self.config.dir, &self.config.instance_id, symbol_id);
        if files.len() <= self.config.retained {
            return;
        }
        files.sort_by_key(|(seq, _)| *seq);
        let excess = files.len() - self.config.retained;
        for (_, path) in files.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to delete old snapshot");
            }
        }
    }
}

/// Loads the newest usable snapshot per instrument.
pub struct SnapshotLoader {
    config: SnapshotConfig,
}

impl SnapshotLoader {
    pub fn new(config: SnapshotConfig) -> Self {
        Self { config }
    }

    /// Newest snapshot that deserializes, matches the current version and
    /// passes its checksum. Damaged snapshots are skipped with a warning
    /// and the next-newest is tried.
    pub fn load_latest(&self, symbol_id: SymbolId) -> Option<SnapshotData> {
        let mut files = list_snapshots(&self.config.dir, &self.config.instance_id, symbol_id);
        files.sort_by_key(|(seq, _)| std::cmp::Reverse(*seq));

        for (_, path) in files {
            match load_snapshot(&path) {
                Ok(snapshot) => {
                    info!(
                        path = %path.display(),
                        wal_seq = snapshot.last_applied_wal_seq,
                        "snapshot loaded"
                    );
                    return Some(snapshot);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unusable snapshot");
                }
            }
        }
        None
    }
}

fn load_snapshot(path: &Path) -> Result<SnapshotData, SnapshotError> {
    let bytes = fs::read(path)?;
    let snapshot: SnapshotData = bincode::deserialize(&bytes)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::VersionMismatch {
            found: snapshot.version,
        });
    }
    if !snapshot.verify_checksum() {
        return Err(SnapshotError::ChecksumMismatch);
    }
    Ok(snapshot)
}

/// All snapshot files for one instrument with their parsed watermarks.
fn list_snapshots(dir: &Path, instance_id: &str, symbol_id: SymbolId) -> Vec<(u64, PathBuf)> {
    let prefix = format!("snapshot-{instance_id}-{symbol_id}-");
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let path = e.path();
            let name = e.file_name().to_string_lossy().to_string();
            let seq = name
                .strip_prefix(&prefix)?
                .strip_suffix(".dat")?
                .parse::<u64>()
                .ok()?;
            Some((seq, path))
        })
        .collect()
}
