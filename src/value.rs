//! SQL Value Representation
//!
//! Column values as decoded from binlog row images or produced by the
//! data iterator, with both literal rendering (for the binlog applier's
//! textual transactions) and parameter binding (for the batch applier's
//! prepared statements).

use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::MySql;

/// SQL value representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    /// JSON column payload, carried as its serialized text
    Json(serde_json::Value),
}

impl Value {
    /// Convert to SQL literal
    pub fn to_sql(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => format!("'{}'", escape(s)),
            Value::Bytes(b) => format!("X'{}'", hex_encode(b)),
            Value::Json(j) => format!("'{}'", escape(&j.to_string())),
        }
    }

    /// Bind this value as the next parameter of a prepared-statement query
    pub fn bind<'q>(
        &self,
        query: Query<'q, MySql, MySqlArguments>,
    ) -> Query<'q, MySql, MySqlArguments> {
        match self {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::UInt(u) => query.bind(*u),
            Value::Float(f) => query.bind(*f),
            Value::String(s) => query.bind(s.clone()),
            Value::Bytes(b) => query.bind(b.clone()),
            Value::Json(j) => query.bind(j.to_string()),
        }
    }

    /// Interpret this value as a pagination key, if it is one
    pub fn as_pagination_key(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            Value::Int(i) if *i >= 0 => Some(*i as u64),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "''")
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_rendering() {
        assert_eq!(Value::Null.to_sql(), "NULL");
        assert_eq!(Value::Bool(true).to_sql(), "1");
        assert_eq!(Value::Int(-5).to_sql(), "-5");
        assert_eq!(Value::UInt(42).to_sql(), "42");
        assert_eq!(Value::String("Alice".to_string()).to_sql(), "'Alice'");
        assert_eq!(Value::Bytes(vec![0xde, 0xad]).to_sql(), "X'dead'");
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(Value::String("O'Brien".to_string()).to_sql(), "'O''Brien'");
        assert_eq!(
            Value::String("a\\b".to_string()).to_sql(),
            "'a\\\\b'"
        );
    }

    #[test]
    fn test_pagination_key_extraction() {
        assert_eq!(Value::UInt(7).as_pagination_key(), Some(7));
        assert_eq!(Value::Int(7).as_pagination_key(), Some(7));
        assert_eq!(Value::Int(-1).as_pagination_key(), None);
        assert_eq!(Value::String("7".to_string()).as_pagination_key(), None);
    }
}
