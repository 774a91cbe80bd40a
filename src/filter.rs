//! Table and Copy Filters
//!
//! Seams that decide which databases, tables and row events take part in
//! the run. The regex filter implements the ignored-tables configuration;
//! sharding-aware copy filters are supplied by the embedding application.

use regex::Regex;

use crate::binlog::event::DmlEvent;
use crate::error::{Error, Result};
use crate::schema::QualifiedTableName;

/// MySQL system schemas that never take part in a migration
const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "performance_schema", "mysql", "sys"];

/// Database/table applicability for schema loading and DDL replication
pub trait TableFilter: Send + Sync {
    fn applicable_database(&self, schema_name: &str) -> bool;
    fn applicable_table(&self, table: &QualifiedTableName) -> bool;
}

/// Per-event applicability for sharded/partial copies. Events the filter
/// rejects are discarded before batching.
pub trait CopyFilter: Send + Sync {
    fn applicable_dml(&self, event: &DmlEvent) -> Result<bool>;
}

/// Table filter backed by the ignored-tables regexp list. System schemas
/// are always excluded.
pub struct RegexTableFilter {
    ignored: Vec<Regex>,
}

impl RegexTableFilter {
    pub fn from_patterns(patterns: &[String]) -> Result<Self> {
        let ignored = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    Error::Config(format!("invalid ignored-tables pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ignored })
    }
}

impl TableFilter for RegexTableFilter {
    fn applicable_database(&self, schema_name: &str) -> bool {
        !SYSTEM_SCHEMAS.contains(&schema_name)
    }

    fn applicable_table(&self, table: &QualifiedTableName) -> bool {
        if !self.applicable_database(&table.schema_name) {
            return false;
        }
        let key = table.to_string();
        !self.ignored.iter().any(|re| re.is_match(&key))
    }
}
