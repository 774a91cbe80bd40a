//! Replication and DXL Events
//!
//! `ReplicationEvent` is one parsed binlog event as delivered by the
//! streamer. The writer translates it into applier-ready DXL events,
//! rendered to SQL at apply time with possibly-rewritten names. DML
//! renders are idempotent so a replay from an earlier checkpoint is a
//! no-op; DDL events implicitly commit in MySQL and therefore never
//! share a batch with other statements.

use chrono::{DateTime, Utc};

use crate::binlog::position::BinlogPosition;
use crate::schema::QualifiedTableName;
use crate::value::Value;

/// One parsed binlog event plus its position and event time
#[derive(Debug, Clone)]
pub struct ReplicationEvent {
    pub position: BinlogPosition,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

/// Payload variants the applier cares about
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// Row operations on a single table
    Rows {
        table: QualifiedTableName,
        changes: Vec<RowChange>,
    },
    /// Arbitrary SQL, typically DDL
    Query { schema: String, query: String },
}

/// A single row operation from a rows event
#[derive(Debug, Clone)]
pub enum RowChange {
    Insert { row: Vec<Value> },
    Update { before: Vec<Value>, after: Vec<Value> },
    Delete { row: Vec<Value> },
}

/// Applier-ready event, rendered to SQL at apply time
#[derive(Debug, Clone)]
pub enum DxlEvent {
    Dml(DmlEvent),
    Ddl(DdlEvent),
}

impl DxlEvent {
    /// DDL implicitly commits and must run as its own batch
    pub fn is_auto_transaction(&self) -> bool {
        matches!(self, DxlEvent::Ddl(_))
    }

    /// Source-side table this event touches
    pub fn table(&self) -> &QualifiedTableName {
        match self {
            DxlEvent::Dml(dml) => &dml.table,
            DxlEvent::Ddl(ddl) => &ddl.table,
        }
    }

    pub fn position(&self) -> &BinlogPosition {
        match self {
            DxlEvent::Dml(dml) => &dml.position,
            DxlEvent::Ddl(ddl) => &ddl.position,
        }
    }

    /// Render the fully-bound statement against the resolved target name
    pub fn sql(&self, target: &QualifiedTableName) -> String {
        match self {
            DxlEvent::Dml(dml) => dml.sql(target),
            DxlEvent::Ddl(ddl) => ddl.statement.clone(),
        }
    }
}

/// Normalised row-level change
#[derive(Debug, Clone)]
pub struct DmlEvent {
    pub table: QualifiedTableName,
    pub position: BinlogPosition,
    pub columns: Vec<String>,
    pub pk_columns: Vec<String>,
    pub change: DmlChange,
}

#[derive(Debug, Clone)]
pub enum DmlChange {
    Insert {
        values: Vec<Value>,
    },
    Update {
        values: Vec<Value>,
        pk_values: Vec<Value>,
    },
    Delete {
        pk_values: Vec<Value>,
    },
}

impl DmlEvent {
    /// Render an idempotent statement: inserts upsert on the duplicate
    /// key, updates and deletes are keyed by primary key.
    pub fn sql(&self, target: &QualifiedTableName) -> String {
        match &self.change {
            DmlChange::Insert { values } => {
                let columns = self.quoted_columns();
                let rendered: Vec<String> = values.iter().map(|v| v.to_sql()).collect();
                let updates: Vec<String> = self
                    .columns
                    .iter()
                    .map(|c| format!("`{}` = VALUES(`{}`)", c, c))
                    .collect();
                format!(
                    "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {}",
                    target.quoted(),
                    columns.join(", "),
                    rendered.join(", "),
                    updates.join(", ")
                )
            }

            DmlChange::Update { values, pk_values } => {
                let sets: Vec<String> = self
                    .columns
                    .iter()
                    .zip(values.iter())
                    .map(|(c, v)| format!("`{}` = {}", c, v.to_sql()))
                    .collect();
                format!(
                    "UPDATE {} SET {} WHERE {}",
                    target.quoted(),
                    sets.join(", "),
                    self.pk_where_clause(pk_values)
                )
            }

            DmlChange::Delete { pk_values } => {
                format!(
                    "DELETE FROM {} WHERE {}",
                    target.quoted(),
                    self.pk_where_clause(pk_values)
                )
            }
        }
    }

    fn quoted_columns(&self) -> Vec<String> {
        self.columns.iter().map(|c| format!("`{}`", c)).collect()
    }

    fn pk_where_clause(&self, pk_values: &[Value]) -> String {
        let clauses: Vec<String> = self
            .pk_columns
            .iter()
            .zip(pk_values.iter())
            .map(|(c, v)| format!("`{}` = {}", c, v.to_sql()))
            .collect();
        clauses.join(" AND ")
    }
}

/// Schema-change statement, rewritten for the target
#[derive(Debug, Clone)]
pub struct DdlEvent {
    pub table: QualifiedTableName,
    pub position: BinlogPosition,
    pub statement: String,
}

/// Commands run by the writer outside the wrapping transaction, before
/// the write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreApplyAction {
    WaitForCopyPhase(QualifiedTableName),
}

/// Commands run by the writer after commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostApplyAction {
    ReloadSchema(QualifiedTableName),
    MarkTableCompleted(QualifiedTableName),
}

/// A DXL event paired with its pre/post apply commands
#[derive(Debug, Clone)]
pub struct DxlEventWrapper {
    pub event: DxlEvent,
    pub pre_apply: Vec<PreApplyAction>,
    pub post_apply: Vec<PostApplyAction>,
}

impl DxlEventWrapper {
    pub fn dml(event: DmlEvent) -> Self {
        Self {
            event: DxlEvent::Dml(event),
            pre_apply: Vec::new(),
            post_apply: Vec::new(),
        }
    }

    pub fn ddl(
        event: DdlEvent,
        pre_apply: Vec<PreApplyAction>,
        post_apply: Vec<PostApplyAction>,
    ) -> Self {
        Self {
            event: DxlEvent::Ddl(event),
            pre_apply,
            post_apply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders_event(change: DmlChange) -> DmlEvent {
        DmlEvent {
            table: QualifiedTableName::new("shop", "orders"),
            position: BinlogPosition::new("mysql-bin.000001", 4096),
            columns: vec!["id".to_string(), "total".to_string()],
            pk_columns: vec!["id".to_string()],
            change,
        }
    }

    #[test]
    fn test_insert_renders_upsert() {
        let event = orders_event(DmlChange::Insert {
            values: vec![Value::Int(1), Value::Int(250)],
        });
        let sql = event.sql(&QualifiedTableName::new("shop_v2", "orders"));
        assert_eq!(
            sql,
            "INSERT INTO `shop_v2`.`orders` (`id`, `total`) VALUES (1, 250) \
             ON DUPLICATE KEY UPDATE `id` = VALUES(`id`), `total` = VALUES(`total`)"
        );
    }

    #[test]
    fn test_update_keyed_by_primary_key() {
        let event = orders_event(DmlChange::Update {
            values: vec![Value::Int(1), Value::Int(300)],
            pk_values: vec![Value::Int(1)],
        });
        let sql = event.sql(&event.table);
        assert_eq!(
            sql,
            "UPDATE `shop`.`orders` SET `id` = 1, `total` = 300 WHERE `id` = 1"
        );
    }

    #[test]
    fn test_delete_keyed_by_primary_key() {
        let event = orders_event(DmlChange::Delete {
            pk_values: vec![Value::Int(9)],
        });
        let sql = event.sql(&event.table);
        assert_eq!(sql, "DELETE FROM `shop`.`orders` WHERE `id` = 9");
    }

    #[test]
    fn test_auto_transaction_predicate() {
        let dml = DxlEvent::Dml(orders_event(DmlChange::Delete {
            pk_values: vec![Value::Int(1)],
        }));
        let ddl = DxlEvent::Ddl(DdlEvent {
            table: QualifiedTableName::new("shop", "orders"),
            position: BinlogPosition::new("mysql-bin.000001", 8192),
            statement: "ALTER TABLE `shop`.`orders` ADD COLUMN note TEXT".to_string(),
        });

        assert!(!dml.is_auto_transaction());
        assert!(ddl.is_auto_transaction());
    }
}
