//! Persistence service
//!
//! Durability layer for the matching engine: write-ahead log, order book
//! snapshots, and startup recovery.
//!
//! **Durability contract:** an order is acknowledged only after its WAL
//! record is fsynced. Snapshots are an optimization; losing every
//! snapshot only makes recovery replay more of the WAL.

pub mod checksum;
pub mod reader;
pub mod recovery;
pub mod snapshot;
pub mod wal;

pub use reader::WalReader;
pub use recovery::{recover, RecoveryError, RecoveryReport};
pub use snapshot::{SnapshotConfig, SnapshotData, SnapshotLoader, SnapshotWriter};
pub use wal::{WalConfig, WalError, WalRecord, WalWriter};
