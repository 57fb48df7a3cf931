//! Engine configuration
//!
//! Loaded from a TOML file; every field has a default so a partial file
//! is fine. The instrument list is the source of the symbol registry.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use persistence::{SnapshotConfig, WalConfig};
use types::ids::SymbolId;
use types::registry::SymbolRegistry;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Identifies this engine's WAL stream and snapshot files.
    pub instance_id: String,
    /// Root directory for WAL and snapshot data.
    pub data_dir: PathBuf,
    /// Bounded apply-queue capacity; submitters block when it is full.
    pub queue_capacity: usize,
    /// Price levels per side in published depth updates.
    pub depth_levels: usize,
    /// Market feed broadcast buffer size.
    pub feed_capacity: usize,
    pub wal: WalSection,
    pub snapshot: SnapshotSection,
    pub instruments: Vec<InstrumentConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WalSection {
    pub max_file_size: u64,
    pub max_file_age_ms: i64,
    pub retained_files: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SnapshotSection {
    pub interval_ms: u64,
    pub retained: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub id: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instance_id: "engine-0".into(),
            data_dir: PathBuf::from("data"),
            queue_capacity: 8192,
            depth_levels: 10,
            feed_capacity: 1024,
            wal: WalSection::default(),
            snapshot: SnapshotSection::default(),
            instruments: Vec::new(),
        }
    }
}

impl Default for WalSection {
    fn default() -> Self {
        Self {
            max_file_size: 64 * 1024 * 1024,
            max_file_age_ms: 60 * 60 * 1000,
            retained_files: 10,
        }
    }
}

impl Default for SnapshotSection {
    fn default() -> Self {
        Self {
            interval_ms: 5 * 60 * 1000,
            retained: 12,
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn build_registry(&self) -> SymbolRegistry {
        let mut registry = SymbolRegistry::new();
        for instrument in &self.instruments {
            registry.register(instrument.symbol.clone(), SymbolId::new(instrument.id));
        }
        registry
    }

    pub fn wal_config(&self) -> WalConfig {
        let mut config = WalConfig::new(self.data_dir.join("wal"), self.instance_id.clone());
        config.max_file_size = self.wal.max_file_size;
        config.max_file_age_ms = self.wal.max_file_age_ms;
        config.retained_files = self.wal.retained_files;
        config
    }

    pub fn snapshot_config(&self) -> SnapshotConfig {
        let mut config =
            SnapshotConfig::new(self.data_dir.join("snapshots"), self.instance_id.clone());
        config.interval_ms = self.snapshot.interval_ms;
        config.retained = self.snapshot.retained;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.queue_capacity, 8192);
        assert_eq!(config.snapshot.interval_ms, 300_000);
        assert!(config.instruments.is_empty());
    }

    #[test]
    fn test_parse_partial_toml() {
        let raw = r#"
            instance_id = "engine-7"
            data_dir = "/var/lib/engine"

            [wal]
            max_file_size = 1048576

            [[instruments]]
            symbol = "BTC-USDT"
            id = 1

            [[instruments]]
            symbol = "ETH-USDT"
            id = 2
        "#;
        let config: EngineConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.instance_id, "engine-7");
        assert_eq!(config.wal.max_file_size, 1_048_576);
        // untouched fields keep their defaults
        assert_eq!(config.wal.retained_files, 10);
        assert_eq!(config.depth_levels, 10);

        let registry = config.build_registry();
        assert_eq!(registry.resolve("ETH-USDT"), Some(SymbolId::new(2)));
    }
}
