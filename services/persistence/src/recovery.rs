//! Startup recovery
//!
//! Rebuilds every registered instrument's book from its newest usable
//! snapshot plus a WAL replay from the snapshot's watermark. Replay goes
//! through the same [`apply_intent`] path as live traffic and emits no
//! notifications, so a recovered book is byte-identical to one that never
//! crashed.

use thiserror::Error;
use tracing::{info, warn};

use matching_engine::book::BookManager;
use matching_engine::engine::apply_intent;
use types::ids::SymbolId;
use types::registry::SymbolRegistry;

use crate::reader::WalReader;
use crate::snapshot::{SnapshotConfig, SnapshotLoader};
use crate::wal::{WalConfig, WalError};

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("wal error: {0}")]
    Wal(#[from] WalError),
}

/// Per-instrument recovery outcome.
#[derive(Debug)]
pub struct InstrumentRecovery {
    pub symbol_id: SymbolId,
    /// Watermark of the restored snapshot, if any.
    pub snapshot_seq: Option<u64>,
    /// Records applied during replay.
    pub replayed: u64,
    /// Records that failed to apply and were skipped.
    pub skipped: u64,
}

/// Overall recovery outcome.
#[derive(Debug, Default)]
pub struct RecoveryReport {
    pub instruments: Vec<InstrumentRecovery>,
}

impl RecoveryReport {
    pub fn total_replayed(&self) -> u64 {
        self.instruments.iter().map(|i| i.replayed).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.instruments.iter().map(|i| i.skipped).sum()
    }
}

/// Recover all registered instruments.
///
/// Instruments without a snapshot replay the whole WAL from the start. A
/// record that fails to apply is logged and skipped; the watermark still
/// advances past it so the failure is not retried on the next restart.
pub fn recover(
    registry: &SymbolRegistry,
    wal_config: &WalConfig,
    snapshot_config: &SnapshotConfig,
) -> Result<(BookManager, RecoveryReport), RecoveryError> {
    let loader = SnapshotLoader::new(snapshot_config.clone());
    let reader = WalReader::new(wal_config.stream_dir());
    let mut books = BookManager::new();
    let mut report = RecoveryReport::default();

    for symbol_id in registry.ids() {
        let mut outcome = InstrumentRecovery {
            symbol_id,
            snapshot_seq: None,
            replayed: 0,
            skipped: 0,
        };

        let from_seq = match loader.load_latest(symbol_id) {
            Some(snapshot) => {
                let seq = snapshot.last_applied_wal_seq;
                books.install(snapshot.book);
                outcome.snapshot_seq = Some(seq);
                seq + 1
            }
            None => {
                books.create(symbol_id);
                1
            }
        };

        let records = reader.read_from(from_seq)?;
        let Some(book) = books.get_mut(symbol_id) else {
            continue;
        };
        for record in records.iter().filter(|r| r.intent.symbol_id == symbol_id) {
            match apply_intent(book, &record.intent) {
                Ok(_) => outcome.replayed += 1,
                Err(e) => {
                    warn!(seq = record.seq, error = %e, "skipping unreplayable wal record");
                    outcome.skipped += 1;
                }
            }
            book.advance_watermark(record.seq);
        }

        info!(
            %symbol_id,
            snapshot_seq = ?outcome.snapshot_seq,
            replayed = outcome.replayed,
            skipped = outcome.skipped,
            watermark = book.last_applied_wal_seq(),
            "instrument recovered"
        );
        report.instruments.push(outcome);
    }

    Ok((books, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotWriter;
    use crate::wal::WalWriter;
    use tempfile::TempDir;
    use types::ids::{OrderId, UserId};
    use types::numeric::{Price, Quantity};
    use types::order::{OrderIntent, OrderType, Side, TimeInForce};

    const TS: i64 = 1_700_000_000_000;

    fn registry() -> SymbolRegistry {
        let mut registry = SymbolRegistry::new();
        registry.register("BTC-USDT", SymbolId::new(1));
        registry
    }

    fn create_intent(id: u64, side: Side, price: u64, qty: u64) -> OrderIntent {
        OrderIntent::create(
            OrderId::new(id),
            UserId::new(id),
            SymbolId::new(1),
            OrderType::Limit,
            side,
            Some(Price::from_u64(price)),
            Quantity::from_u64(qty),
            Some(TimeInForce::Gtc),
            TS,
        )
    }

    fn configs(dir: &std::path::Path) -> (WalConfig, SnapshotConfig) {
        (
            WalConfig::new(dir.join("wal"), "test"),
            SnapshotConfig::new(dir.join("snapshots"), "test"),
        )
    }

    #[test]
    fn test_recover_from_empty_state() {
        let tmp = TempDir::new().unwrap();
        let (wal_config, snapshot_config) = configs(tmp.path());

        let (books, report) = recover(&registry(), &wal_config, &snapshot_config).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(report.total_replayed(), 0);
        assert_eq!(
            books.get(SymbolId::new(1)).unwrap().order_count(),
            0
        );
    }

    #[test]
    fn test_recover_from_wal_only() {
        let tmp = TempDir::new().unwrap();
        let (wal_config, snapshot_config) = configs(tmp.path());

        let mut writer = WalWriter::open(wal_config.clone()).unwrap();
        writer.append(&create_intent(1, Side::Buy, 100, 5)).unwrap();
        writer.append(&create_intent(2, Side::Sell, 101, 3)).unwrap();

        let (books, report) = recover(&registry(), &wal_config, &snapshot_config).unwrap();
        let book = books.get(SymbolId::new(1)).unwrap();
        assert_eq!(report.total_replayed(), 2);
        assert_eq!(book.order_count(), 2);
        assert_eq!(book.best_bid(), Some(Price::from_u64(100)));
        assert_eq!(book.best_ask(), Some(Price::from_u64(101)));
        assert_eq!(book.last_applied_wal_seq(), 2);
    }

    #[test]
    fn test_recover_snapshot_plus_tail() {
        let tmp = TempDir::new().unwrap();
        let (wal_config, snapshot_config) = configs(tmp.path());

        // Build state through the WAL, snapshot it, then add more records.
        let mut writer = WalWriter::open(wal_config.clone()).unwrap();
        writer.append(&create_intent(1, Side::Buy, 100, 5)).unwrap();
        writer.append(&create_intent(2, Side::Buy, 99, 5)).unwrap();

        let (books, _) = recover(&registry(), &wal_config, &snapshot_config).unwrap();
        let snapshotted = books.get(SymbolId::new(1)).unwrap().deep_copy();
        SnapshotWriter::new(snapshot_config.clone())
            .write(snapshotted)
            .unwrap();

        writer.append(&create_intent(3, Side::Sell, 101, 2)).unwrap();

        let (books, report) = recover(&registry(), &wal_config, &snapshot_config).unwrap();
        let book = books.get(SymbolId::new(1)).unwrap();
        let outcome = &report.instruments[0];
        assert_eq!(outcome.snapshot_seq, Some(2));
        // Only the tail after the snapshot replays.
        assert_eq!(outcome.replayed, 1);
        assert_eq!(book.order_count(), 3);
        assert_eq!(book.last_applied_wal_seq(), 3);
    }

    #[test]
    fn test_recovery_equals_straight_replay() {
        let tmp = TempDir::new().unwrap();
        let (wal_config, snapshot_config) = configs(tmp.path());

        let intents = vec![
            create_intent(1, Side::Buy, 100, 5),
            create_intent(2, Side::Sell, 100, 3),
            create_intent(3, Side::Sell, 102, 4),
            OrderIntent::cancel(OrderId::new(3), UserId::new(3), SymbolId::new(1), TS),
            create_intent(4, Side::Buy, 99, 2),
            // Joins the partially filled order 1 at 100, behind it in the queue.
            create_intent(5, Side::Buy, 100, 2),
        ];
        let mut writer = WalWriter::open(wal_config.clone()).unwrap();
        for intent in &intents {
            writer.append(intent).unwrap();
        }

        // Straight replay without persistence.
        let mut expected = matching_engine::book::OrderBook::new(SymbolId::new(1));
        for intent in &intents {
            apply_intent(&mut expected, intent).unwrap();
        }
        expected.advance_watermark(intents.len() as u64);

        let (books, _) = recover(&registry(), &wal_config, &snapshot_config).unwrap();
        let recovered = books.get(SymbolId::new(1)).unwrap();
        // Structural equality covers every level's price, total, and
        // order queue order, not just the aggregated depth view.
        assert_eq!(recovered, &expected);
    }

    #[test]
    fn test_unreplayable_record_skipped() {
        let tmp = TempDir::new().unwrap();
        let (wal_config, snapshot_config) = configs(tmp.path());

        let mut bad = create_intent(1, Side::Buy, 100, 5);
        bad.quantity = Some(Quantity::zero());
        let mut writer = WalWriter::open(wal_config.clone()).unwrap();
        writer.append(&bad).unwrap();
        writer.append(&create_intent(2, Side::Buy, 100, 5)).unwrap();

        let (books, report) = recover(&registry(), &wal_config, &snapshot_config).unwrap();
        let outcome = &report.instruments[0];
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.replayed, 1);
        // Watermark advances past the skipped record.
        assert_eq!(
            books.get(SymbolId::new(1)).unwrap().last_applied_wal_seq(),
            2
        );
    }
}
