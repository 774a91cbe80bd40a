//! Binlog Replay
//!
//! Translation of replication events into applier-ready DXL events and
//! the buffered writer that applies them to the target.

pub mod analyzer;
pub mod event;
pub mod position;
pub mod writer;

pub use event::{DxlEvent, DxlEventWrapper, EventPayload, ReplicationEvent, RowChange};
pub use position::BinlogPosition;
pub use writer::{BinlogWriter, BinlogWriterHandle, ControlSignal};
