//! Bulk Copy
//!
//! Row batches produced by the data iterator and the transactional
//! applier that writes them to the target.

pub mod batch_writer;
pub mod row_batch;

pub use batch_writer::BatchWriter;
pub use row_batch::{InitRowBatch, InsertRowBatch, RowBatch};
