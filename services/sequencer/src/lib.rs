//! Sequencer service
//!
//! Front door of the engine: validates inbound order commands, journals
//! them, and drives the single writer thread that owns the books. Also
//! schedules snapshots and serves depth queries.

pub mod config;
pub mod events;
pub mod pipeline;
pub mod validate;

pub use config::EngineConfig;
pub use events::{MarketEvent, MarketFeed};
pub use pipeline::{QueryError, QueryHandle, Sequencer, SequencerHandle, StartError, SubmitError};
