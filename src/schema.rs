//! Table Names and Schema Cache
//!
//! Qualified table names, cached table definitions, and the shared
//! schema cache the appliers consult. Entries are invalidated and
//! reloaded on DDL that alters or creates a table; drops leave the old
//! entry in place (stale but unused).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::{MySqlPool, Row};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::filter::TableFilter;

/// Schema-qualified table name. Equality and hashing are case-sensitive;
/// the display form `<schema>.<table>` is the canonical state-tracker key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedTableName {
    pub schema_name: String,
    pub table_name: String,
}

impl QualifiedTableName {
    pub fn new(schema_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
        }
    }

    /// Parse a state-tracker key of the form `<schema>.<table>`
    pub fn from_key(key: &str) -> Option<Self> {
        let (schema, table) = key.split_once('.')?;
        if schema.is_empty() || table.is_empty() {
            return None;
        }
        Some(Self::new(schema, table))
    }

    /// Resolve the target-side name by consulting the configured
    /// database- and table-rewrite mappings
    pub fn rewritten(
        &self,
        database_rewrites: &HashMap<String, String>,
        table_rewrites: &HashMap<String, String>,
    ) -> QualifiedTableName {
        let schema = database_rewrites
            .get(&self.schema_name)
            .unwrap_or(&self.schema_name);
        let table = table_rewrites
            .get(&self.table_name)
            .unwrap_or(&self.table_name);
        QualifiedTableName::new(schema.clone(), table.clone())
    }

    /// Backtick-quoted form for SQL rendering
    pub fn quoted(&self) -> String {
        format!("`{}`.`{}`", self.schema_name, self.table_name)
    }
}

impl fmt::Display for QualifiedTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema_name, self.table_name)
    }
}

/// Column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub key: String,
    pub default: Option<String>,
    pub extra: String,
}

/// Cached table definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: QualifiedTableName,
    pub columns: Vec<ColumnSchema>,
    pub primary_key: Vec<String>,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Positions of the primary-key columns within the column list
    pub fn primary_key_indices(&self) -> Vec<usize> {
        self.primary_key
            .iter()
            .filter_map(|pk| self.columns.iter().position(|c| &c.name == pk))
            .collect()
    }
}

/// Shared cache of table definitions, keyed by source-side qualified name
pub struct SchemaCache {
    tables: RwLock<HashMap<QualifiedTableName, Arc<TableSchema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, name: &QualifiedTableName) -> Option<Arc<TableSchema>> {
        self.tables.read().await.get(name).cloned()
    }

    pub async fn contains(&self, name: &QualifiedTableName) -> bool {
        self.tables.read().await.contains_key(name)
    }

    pub async fn insert(&self, schema: TableSchema) {
        self.tables
            .write()
            .await
            .insert(schema.name.clone(), Arc::new(schema));
    }

    pub async fn table_names(&self) -> Vec<QualifiedTableName> {
        self.tables.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.len()
    }

    /// Load definitions for every applicable table visible on the given
    /// connection. Returns the number of tables loaded.
    pub async fn load_from_database(
        &self,
        pool: &MySqlPool,
        filter: &dyn TableFilter,
    ) -> Result<usize> {
        let rows = sqlx::query(
            "SELECT table_schema, table_name FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE'",
        )
        .fetch_all(pool)
        .await?;

        let mut loaded = 0;
        for row in rows {
            let schema: String = row.try_get("table_schema")?;
            let table: String = row.try_get("table_name")?;
            let name = QualifiedTableName::new(schema, table);

            if !filter.applicable_database(&name.schema_name) || !filter.applicable_table(&name) {
                continue;
            }

            let table_schema = fetch_table_schema(pool, &name).await?;
            self.insert(table_schema).await;
            loaded += 1;
        }

        tracing::info!("loaded {} table definitions into the schema cache", loaded);
        Ok(loaded)
    }

    /// Refresh one entry from the given connection, creating it if new.
    /// `fetch_as` is the name on that connection (the rewritten target
    /// name after DDL); the entry stays keyed by `name`.
    pub async fn reload_table(
        &self,
        pool: &MySqlPool,
        name: &QualifiedTableName,
        fetch_as: &QualifiedTableName,
    ) -> Result<()> {
        let mut schema = fetch_table_schema(pool, fetch_as).await?;
        schema.name = name.clone();
        tracing::info!("reloaded schema for {}", name);
        self.insert(schema).await;
        Ok(())
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch a table definition (columns and primary key)
pub async fn fetch_table_schema(
    pool: &MySqlPool,
    name: &QualifiedTableName,
) -> Result<TableSchema> {
    let rows = sqlx::query(&format!("DESCRIBE {}", name.quoted()))
        .fetch_all(pool)
        .await?;

    let columns: Vec<ColumnSchema> = rows
        .iter()
        .filter_map(|row| {
            Some(ColumnSchema {
                name: row.try_get("Field").ok()?,
                data_type: row.try_get("Type").ok()?,
                nullable: row.try_get::<String, _>("Null").ok()? == "YES",
                key: row.try_get("Key").ok().unwrap_or_default(),
                default: row.try_get("Default").ok(),
                extra: row.try_get("Extra").ok().unwrap_or_default(),
            })
        })
        .collect();

    let primary_key: Vec<String> = columns
        .iter()
        .filter(|c| c.key == "PRI")
        .map(|c| c.name.clone())
        .collect();

    Ok(TableSchema {
        name: name.clone(),
        columns,
        primary_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewrites(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_display_and_key_parsing() {
        let name = QualifiedTableName::new("shop", "orders");
        assert_eq!(name.to_string(), "shop.orders");
        assert_eq!(name.quoted(), "`shop`.`orders`");
        assert_eq!(QualifiedTableName::from_key("shop.orders"), Some(name));
        assert_eq!(QualifiedTableName::from_key("orders"), None);
    }

    #[test]
    fn test_rewritten() {
        let name = QualifiedTableName::new("shop", "orders");
        let db_rewrites = rewrites(&[("shop", "shop_v2")]);
        let table_rewrites = rewrites(&[("carts", "baskets")]);

        let target = name.rewritten(&db_rewrites, &table_rewrites);
        assert_eq!(target, QualifiedTableName::new("shop_v2", "orders"));

        // no applicable rewrite leaves the name untouched
        let other = QualifiedTableName::new("crm", "leads");
        assert_eq!(other.rewritten(&db_rewrites, &table_rewrites), other);
    }

    #[test]
    fn test_primary_key_indices() {
        let schema = TableSchema {
            name: QualifiedTableName::new("shop", "orders"),
            columns: vec![
                column("id", "PRI"),
                column("customer_id", ""),
                column("total", ""),
            ],
            primary_key: vec!["id".to_string()],
        };
        assert_eq!(schema.primary_key_indices(), vec![0]);
        assert_eq!(
            schema.column_names(),
            vec!["id", "customer_id", "total"]
        );
    }

    fn column(name: &str, key: &str) -> ColumnSchema {
        ColumnSchema {
            name: name.to_string(),
            data_type: "bigint".to_string(),
            nullable: false,
            key: key.to_string(),
            default: None,
            extra: String::new(),
        }
    }
}
