//! Single-writer sequencing pipeline
//!
//! Command path: validate, append to the WAL (fsync), acknowledge
//! upstream, then hand off to the writer thread over a bounded queue.
//! The hand-off blocks when the queue is full; an already-durable command
//! is never dropped.
//!
//! One thread owns every book mutation. Snapshot ticks and depth queries
//! ride the same queue as commands, so deep copies and reads are
//! serialized against applies without any locking on the books
//! themselves. Snapshot serialization and IO happen on a separate worker
//! thread that receives owned book copies.
//!
//! Single-producer discipline for the WAL is enforced by ownership:
//! [`SequencerHandle`] is not clonable and `submit` takes `&mut self`.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use matching_engine::book::{BookManager, OrderBook};
use matching_engine::engine::apply_intent;
use persistence::recovery::{recover, RecoveryError, RecoveryReport};
use persistence::snapshot::SnapshotWriter;
use persistence::wal::{WalError, WalWriter};
use types::depth::BookDepth;
use types::errors::ValidationError;
use types::ids::SymbolId;
use types::order::OrderIntent;
use types::registry::SymbolRegistry;

use crate::config::EngineConfig;
use crate::events::{MarketEvent, MarketFeed};
use crate::validate::validate_intent;

/// Work items for the writer thread.
enum Job {
    Apply { seq: u64, intent: OrderIntent },
    Snapshot,
    Depth {
        symbol_id: SymbolId,
        levels: usize,
        reply: mpsc::Sender<Option<BookDepth>>,
    },
    Shutdown,
}

#[derive(Error, Debug)]
pub enum StartError {
    #[error("recovery failed: {0}")]
    Recovery(#[from] RecoveryError),

    #[error("wal error: {0}")]
    Wal(#[from] WalError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum SubmitError {
    /// Rejected before the WAL; nothing was journaled.
    #[error("intent rejected: {0}")]
    Rejected(#[from] ValidationError),

    /// The append itself failed; the command is not durable and must not
    /// be acknowledged.
    #[error("wal append failed: {0}")]
    Wal(#[from] WalError),

    #[error("pipeline closed")]
    Closed,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown instrument: {0}")]
    UnknownInstrument(SymbolId),

    #[error("pipeline closed")]
    Closed,
}

pub struct Sequencer;

impl Sequencer {
    /// Recover state and start the pipeline threads.
    pub fn start(config: EngineConfig) -> Result<SequencerHandle, StartError> {
        let registry = config.build_registry();
        let wal_config = config.wal_config();
        let snapshot_config = config.snapshot_config();

        let (books, recovery) = recover(&registry, &wal_config, &snapshot_config)?;
        info!(
            instruments = recovery.instruments.len(),
            replayed = recovery.total_replayed(),
            skipped = recovery.total_skipped(),
            "recovery complete"
        );

        let wal = WalWriter::open(wal_config)?;
        let feed = MarketFeed::new(config.feed_capacity);
        let (job_tx, job_rx) = mpsc::sync_channel::<Job>(config.queue_capacity);
        let (snap_tx, snap_rx) = mpsc::channel::<Vec<OrderBook>>();

        let snapshot_writer = SnapshotWriter::new(snapshot_config);
        let snapshot_thread = thread::Builder::new()
            .name("snapshot-writer".into())
            .spawn(move || snapshot_loop(snap_rx, snapshot_writer))?;

        let depth_levels = config.depth_levels;
        let writer_feed = feed.clone();
        let apply_thread = thread::Builder::new()
            .name("book-writer".into())
            .spawn(move || apply_loop(books, job_rx, snap_tx, writer_feed, depth_levels))?;

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let interval = Duration::from_millis(config.snapshot.interval_ms);
        let tick_tx = job_tx.clone();
        let scheduler_thread = thread::Builder::new()
            .name("snapshot-scheduler".into())
            .spawn(move || scheduler_loop(stop_rx, interval, tick_tx))?;

        Ok(SequencerHandle {
            registry,
            wal,
            job_tx,
            feed,
            recovery,
            scheduler_stop: stop_tx,
            apply_thread: Some(apply_thread),
            scheduler_thread: Some(scheduler_thread),
            snapshot_thread: Some(snapshot_thread),
        })
    }
}

/// Owner of the ingestion side of the pipeline.
pub struct SequencerHandle {
    registry: SymbolRegistry,
    wal: WalWriter,
    job_tx: SyncSender<Job>,
    feed: MarketFeed,
    recovery: RecoveryReport,
    scheduler_stop: mpsc::Sender<()>,
    apply_thread: Option<JoinHandle<()>>,
    scheduler_thread: Option<JoinHandle<()>>,
    snapshot_thread: Option<JoinHandle<()>>,
}

impl SequencerHandle {
    /// Validate, journal, and enqueue one command.
    ///
    /// Returns the WAL sequence once the command is durable and queued.
    pub fn submit(&mut self, intent: OrderIntent) -> Result<u64, SubmitError> {
        self.submit_with_ack(intent, |_| {})
    }

    /// Like [`submit`](Self::submit), but invokes `ack` between the fsync
    /// and the queue hand-off, which is where an upstream acknowledgement
    /// (e.g. a consumer offset commit) belongs: the command is durable but
    /// not yet applied.
    pub fn submit_with_ack(
        &mut self,
        intent: OrderIntent,
        ack: impl FnOnce(u64),
    ) -> Result<u64, SubmitError> {
        validate_intent(&intent, &self.registry)?;
        let seq = self.wal.append(&intent)?;
        ack(seq);
        self.job_tx
            .send(Job::Apply { seq, intent })
            .map_err(|_| SubmitError::Closed)?;
        Ok(seq)
    }

    /// Request an immediate snapshot tick.
    pub fn snapshot_now(&self) -> Result<(), SubmitError> {
        self.job_tx
            .send(Job::Snapshot)
            .map_err(|_| SubmitError::Closed)
    }

    /// Depth query, answered by the writer thread after everything queued
    /// ahead of it has been applied.
    pub fn depth(&self, symbol_id: SymbolId, levels: usize) -> Result<BookDepth, QueryError> {
        request_depth(&self.job_tx, &self.registry, symbol_id, levels)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.feed.subscribe()
    }

    /// What recovery did at startup.
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.recovery
    }

    /// A clonable handle for read-side consumers on other threads.
    pub fn query_handle(&self) -> QueryHandle {
        QueryHandle {
            registry: self.registry.clone(),
            job_tx: self.job_tx.clone(),
            feed: self.feed.clone(),
        }
    }

    /// Stop every pipeline thread and wait for them.
    ///
    /// Commands already queued are applied first; snapshot ticks already
    /// handed to the worker are written out before it exits.
    pub fn shutdown(mut self) {
        let _ = self.scheduler_stop.send(());
        let _ = self.job_tx.send(Job::Shutdown);
        if let Some(handle) = self.scheduler_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.apply_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.snapshot_thread.take() {
            let _ = handle.join();
        }
        info!("sequencer stopped");
    }
}

/// Read-side handle; safe to clone and move to other threads.
#[derive(Clone)]
pub struct QueryHandle {
    registry: SymbolRegistry,
    job_tx: SyncSender<Job>,
    feed: MarketFeed,
}

impl QueryHandle {
    pub fn depth(&self, symbol_id: SymbolId, levels: usize) -> Result<BookDepth, QueryError> {
        request_depth(&self.job_tx, &self.registry, symbol_id, levels)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.feed.subscribe()
    }
}

fn request_depth(
    job_tx: &SyncSender<Job>,
    registry: &SymbolRegistry,
    symbol_id: SymbolId,
    levels: usize,
) -> Result<BookDepth, QueryError> {
    if !registry.contains_id(symbol_id) {
        return Err(QueryError::UnknownInstrument(symbol_id));
    }
    let (reply_tx, reply_rx) = mpsc::channel();
    job_tx
        .send(Job::Depth {
            symbol_id,
            levels,
            reply: reply_tx,
        })
        .map_err(|_| QueryError::Closed)?;
    reply_rx
        .recv()
        .map_err(|_| QueryError::Closed)?
        .ok_or(QueryError::UnknownInstrument(symbol_id))
}

/// Writer thread: sole owner of the books.
fn apply_loop(
    mut books: BookManager,
    job_rx: Receiver<Job>,
    snap_tx: mpsc::Sender<Vec<OrderBook>>,
    feed: MarketFeed,
    depth_levels: usize,
) {
    while let Ok(job) = job_rx.recv() {
        match job {
            Job::Apply { seq, intent } => {
                let Some(book) = books.get_mut(intent.symbol_id) else {
                    error!(symbol_id = %intent.symbol_id, seq, "no book for journaled intent");
                    continue;
                };
                match apply_intent(book, &intent) {
                    Ok(outcome) => {
                        for trade in outcome.trades {
                            feed.publish(MarketEvent::Trade(trade));
                        }
                        if outcome.book_changed {
                            feed.publish(MarketEvent::Depth(book.depth(depth_levels)));
                        }
                    }
                    Err(e) => {
                        // Already durable, so log and move on; replay will
                        // skip it the same way.
                        error!(seq, order_id = %intent.order_id, error = %e,
                               "journaled intent failed to apply");
                    }
                }
                book.advance_watermark(seq);
            }
            Job::Snapshot => {
                let copies: Vec<OrderBook> = books.iter().map(OrderBook::deep_copy).collect();
                if snap_tx.send(copies).is_err() {
                    warn!("snapshot worker gone, tick dropped");
                }
            }
            Job::Depth {
                symbol_id,
                levels,
                reply,
            } => {
                let depth = books.get(symbol_id).map(|b| b.depth(levels));
                let _ = reply.send(depth);
            }
            Job::Shutdown => break,
        }
    }
}

/// Snapshot worker: serializes and writes owned book copies off the hot
/// path. Exits when the writer thread goes away.
fn snapshot_loop(snap_rx: Receiver<Vec<OrderBook>>, writer: SnapshotWriter) {
    while let Ok(copies) = snap_rx.recv() {
        for book in copies {
            if let Err(e) = writer.write(book) {
                error!(error = %e, "snapshot write failed");
            }
        }
    }
}

/// Periodic snapshot ticks. A full queue skips the tick instead of
/// blocking; the next one will cover the same state.
fn scheduler_loop(stop_rx: Receiver<()>, interval: Duration, tick_tx: SyncSender<Job>) {
    loop {
        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => match tick_tx.try_send(Job::Snapshot) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => warn!("apply queue full, snapshot tick skipped"),
                Err(TrySendError::Disconnected(_)) => break,
            },
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
