//! Write-ahead log reader
//!
//! Reads a WAL stream back for recovery. Damage is isolated as narrowly
//! as the framing allows: records that fail their checksum or do not
//! decode are skipped individually, a file whose framing breaks down or
//! that holds too many bad records is skipped whole, and everything
//! readable elsewhere is still replayed.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::wal::{list_wal_files, WalError, WalRecord};

/// A file with more invalid records than this is considered damaged and
/// skipped entirely.
const MAX_INVALID_RECORDS_PER_FILE: usize = 10;

/// Outcome of scanning one WAL file.
enum FileScan {
    Valid(Vec<WalRecord>),
    Rejected { reason: String },
}

/// Reader over one WAL stream directory.
pub struct WalReader {
    dir: PathBuf,
}

impl WalReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// All verifiable records with `seq >= from_seq`, in sequence order.
    ///
    /// A missing stream directory is an empty stream, not an error.
    pub fn read_from(&self, from_seq: u64) -> Result<Vec<WalRecord>, WalError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = list_wal_files(&self.dir);
        files.sort_by_key(|(index, _)| *index);

        let mut records = Vec::new();
        for (_, path) in files {
            match scan_file(&path) {
                FileScan::Valid(file_records) => {
                    records.extend(file_records.into_iter().filter(|r| r.seq >= from_seq));
                }
                FileScan::Rejected { reason } => {
                    warn!(path = %path.display(), reason, "skipping damaged wal file");
                }
            }
        }
        debug!(count = records.len(), from_seq, "wal read complete");
        Ok(records)
    }
}

/// Scan one file, collecting checksum-verified records.
///
/// Frame damage (bad length prefix, truncation) rejects the whole file
/// since the remaining bytes cannot be walked. An undecodable body or a
/// checksum mismatch is a single bad record: the frame's length prefix
/// still locates the next record, so the bad one is counted and skipped,
/// up to [`MAX_INVALID_RECORDS_PER_FILE`] per file.
fn scan_file(path: &Path) -> FileScan {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            return FileScan::Rejected {
                reason: format!("unreadable: {e}"),
            }
        }
    };

    let mut records = Vec::new();
    let mut invalid = 0usize;
    let mut pos = 0usize;
    while pos < data.len() {
        let (body, consumed) = match WalRecord::read_frame(&data[pos..]) {
            Ok(frame) => frame,
            Err(e) => {
                return FileScan::Rejected {
                    reason: e.to_string(),
                };
            }
        };
        pos += consumed;
        match bincode::deserialize::<WalRecord>(body) {
            Ok(record) if record.verify_checksum() => records.push(record),
            Ok(_) | Err(_) => {
                invalid += 1;
                if invalid > MAX_INVALID_RECORDS_PER_FILE {
                    return FileScan::Rejected {
                        reason: format!(
                            "more than {MAX_INVALID_RECORDS_PER_FILE} invalid records"
                        ),
                    };
                }
            }
        }
    }
    if invalid > 0 {
        warn!(path = %path.display(), invalid, "wal file contains records with bad checksums");
    }
    FileScan::Valid(records)
}

/// Highest sequence present across all structurally readable files.
///
/// Used by the writer at open to continue the stream past what is already
/// on disk. Checksums are deliberately not verified here: a record that
/// was written far enough to carry its sequence must not be reissued.
pub(crate) fn scan_max_seq(dir: &Path) -> u64 {
    let mut max_seq = 0u64;
    for (_, path) in list_wal_files(dir) {
        let Ok(data) = fs::read(&path) else { continue };
        let mut pos = 0usize;
        while pos < data.len() {
            let Ok((body, consumed)) = WalRecord::read_frame(&data[pos..]) else {
                break;
            };
            pos += consumed;
            if let Ok(record) = bincode::deserialize::<WalRecord>(body) {
                max_seq = max_seq.max(record.seq);
            }
        }
    }
    max_seq
}
