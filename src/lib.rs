//! Ghostferry - Live MySQL Data Migration Engine
//!
//! The core of a MySQL-to-MySQL migration: the target converges to a
//! consistent snapshot of a live source without stopping source writes.
//! Existing rows are copied in iterative batches while the source's
//! binary log is replayed continuously, and the two phases are
//! coordinated so that schema changes never race the copy.
//!
//! # Architecture
//!
//! - The **batch writer** applies bulk-copy row batches transactionally,
//!   optionally verifying row fingerprints inside the same transaction.
//! - The **binlog writer** buffers replication events on a bounded
//!   queue, batches DML into multi-statement transactions, serialises
//!   DDL through a barrier that waits for bulk-copy completion, and
//!   checkpoints binlog positions.
//! - The **cutover coordinator** orders copy completion, binlog
//!   catch-up, external source locking, delta re-copy of joined tables
//!   and release.
//!
//! The binlog reader, the pagination strategy and the fingerprint hash
//! live outside this crate and plug in through traits.

pub mod binlog;
pub mod config;
pub mod copy;
pub mod cutover;
pub mod error;
pub mod error_handler;
pub mod ferry;
pub mod filter;
pub mod logging;
pub mod metrics;
pub mod retry;
pub mod schema;
pub mod state;
pub mod stmt_cache;
pub mod throttler;
pub mod value;
pub mod verifier;

pub use config::Config;
pub use error::{Error, Result};
pub use ferry::Ferry;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::binlog::{
        BinlogPosition, BinlogWriter, BinlogWriterHandle, ReplicationEvent,
    };
    pub use crate::config::Config;
    pub use crate::copy::{BatchWriter, InsertRowBatch, RowBatch};
    pub use crate::cutover::{BinlogStreamer, CutoverCoordinator, DataIterator};
    pub use crate::error::{Error, Result};
    pub use crate::ferry::Ferry;
    pub use crate::schema::{QualifiedTableName, SchemaCache, TableSchema};
    pub use crate::state::{SerializableState, StateTracker};
    pub use crate::value::Value;
}
