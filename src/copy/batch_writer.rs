//! Batch Writer
//!
//! Transactional applier of bulk-copy row batches. Each batch commits
//! atomically; when an inline verifier is attached its fingerprint
//! check runs inside the same transaction and a mismatch rolls the
//! batch back. The state tracker stays keyed by source names whatever
//! the rewrites say.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::{MySqlPool, Statement};

use crate::config::Config;
use crate::copy::row_batch::{InitRowBatch, InsertRowBatch, RowBatch};
use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::retry::with_retries;
use crate::state::StateTracker;
use crate::stmt_cache::StatementCache;
use crate::verifier::InlineRowVerifier;

/// Transactional applier of bulk row batches
pub struct BatchWriter {
    pool: MySqlPool,
    stmt_cache: Arc<StatementCache>,
    state_tracker: Arc<StateTracker>,
    verifier: Option<Arc<dyn InlineRowVerifier>>,
    metrics: Arc<Metrics>,
    write_retries: u32,
    force_resume_state_updates: bool,
    database_rewrites: HashMap<String, String>,
    table_rewrites: HashMap<String, String>,
}

impl BatchWriter {
    pub fn new(
        pool: MySqlPool,
        stmt_cache: Arc<StatementCache>,
        state_tracker: Arc<StateTracker>,
        verifier: Option<Arc<dyn InlineRowVerifier>>,
        metrics: Arc<Metrics>,
        config: &Config,
    ) -> Self {
        Self {
            pool,
            stmt_cache,
            state_tracker,
            verifier,
            metrics,
            write_retries: config.replication.write_retries,
            force_resume_state_updates: config.replication.force_resume_state_updates_to_db,
            database_rewrites: config.rewrites.database_rewrites.clone(),
            table_rewrites: config.rewrites.table_rewrites.clone(),
        }
    }

    /// Apply one batch. On success the whole batch is committed and the
    /// state tracker reflects its terminal pagination key; on failure no
    /// partial commit is visible and the batch may be retried.
    pub async fn write_row_batch(&self, batch: &RowBatch) -> Result<()> {
        with_retries(self.write_retries, "batch writer", || self.apply(batch)).await
    }

    async fn apply(&self, batch: &RowBatch) -> Result<()> {
        match batch {
            RowBatch::Init(init) => self.apply_init(init).await,
            RowBatch::Insert(insert) => self.apply_insert(insert).await,
        }
    }

    async fn apply_init(&self, batch: &InitRowBatch) -> Result<()> {
        tracing::debug!("applying init batch for {}", batch.table);
        let stmt = self.stmt_cache.prepare(&batch.statement).await?;
        let mut tx = self.pool.begin().await?;
        if let Err(err) = stmt.query().execute(&mut *tx).await {
            let _ = tx.rollback().await;
            return Err(err.into());
        }
        tx.commit().await?;
        Ok(())
    }

    async fn apply_insert(&self, batch: &InsertRowBatch) -> Result<()> {
        if batch.rows.is_empty() {
            return Ok(());
        }

        let source = &batch.table.name;
        let target = source.rewritten(&self.database_rewrites, &self.table_rewrites);
        let range = batch.pagination_key_range();

        let (sql, args) = batch.as_sql(&target)?;
        let stmt = self.stmt_cache.prepare(&sql).await?;

        let mut tx = self.pool.begin().await?;

        let mut query = stmt.query();
        for value in &args {
            query = value.bind(query);
        }
        if let Err(err) = query.execute(&mut *tx).await {
            let _ = tx.rollback().await;
            return Err(Error::QueryExecution(format!(
                "failed to write row batch for {}: {}",
                source, err
            )));
        }

        if let Some(verifier) = &self.verifier {
            let mismatched = match verifier.verify_batch(&mut tx, &target, batch).await {
                Ok(mismatched) => mismatched,
                Err(err) => {
                    let _ = tx.rollback().await;
                    return Err(err);
                }
            };
            if !mismatched.is_empty() {
                let _ = tx.rollback().await;
                return Err(Error::VerificationFailed {
                    table: source.to_string(),
                    pagination_keys: mismatched,
                });
            }
        }

        if self.force_resume_state_updates {
            if let Some((_, last)) = range {
                let sql = match self.state_tracker.store_row_copy_progress_sql(source, last) {
                    Ok(sql) => sql,
                    Err(err) => {
                        let _ = tx.rollback().await;
                        return Err(err);
                    }
                };
                if let Err(err) = sqlx::query(&sql).execute(&mut *tx).await {
                    let _ = tx.rollback().await;
                    return Err(err.into());
                }
            }
        }

        tx.commit().await?;

        if let Some((_, last)) = range {
            self.state_tracker
                .update_last_successful_pagination_key(source, last);
        }
        self.metrics.record_rows_copied(batch.rows.len() as u64);
        Ok(())
    }
}
