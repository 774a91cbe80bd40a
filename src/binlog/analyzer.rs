//! Query Event Analyzer
//!
//! Classifies the SQL carried by a query event into zero or more
//! schema-change descriptors. Statements the analyzer does not
//! recognise (stored-routine DDL, privilege changes, ...) produce no
//! descriptors and are passed over without error.
//!
//! Table names are resolved against the event's default schema and the
//! descriptor statement is rewritten with the configured database- and
//! table-name mappings, so it can be executed against the target as-is.

use std::collections::HashMap;

use crate::schema::QualifiedTableName;

/// One recognised schema change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaChange {
    /// Source-side table the statement operates on
    pub affected_table: QualifiedTableName,
    /// Set for drops and renames
    pub deleted_table: Option<QualifiedTableName>,
    /// Set for renames
    pub created_table: Option<QualifiedTableName>,
    /// Statement rewritten with target names
    pub statement: String,
    /// False for DDL that leaves the table definition unchanged
    pub is_schema_change: bool,
}

impl SchemaChange {
    /// Table whose definition must be refreshed after the DDL applies:
    /// the created name for renames, the affected name for creates and
    /// alters, none for pure drops.
    pub fn table_to_reload(&self) -> Option<QualifiedTableName> {
        if !self.is_schema_change {
            return None;
        }
        if let Some(created) = &self.created_table {
            return Some(created.clone());
        }
        if self.deleted_table.is_some() {
            return None;
        }
        Some(self.affected_table.clone())
    }
}

/// Analyze one query-event statement. Returns an empty list for
/// statements that are not recognised table DDL.
pub fn parse_schema_changes(
    default_schema: &str,
    query: &str,
    database_rewrites: &HashMap<String, String>,
    table_rewrites: &HashMap<String, String>,
) -> Vec<SchemaChange> {
    let rewrite =
        |name: &QualifiedTableName| name.rewritten(database_rewrites, table_rewrites);
    let mut scanner = Scanner::new(query);

    if scanner.eat_keyword("CREATE") && scanner.eat_keyword("TABLE") {
        scanner.eat_keyword("IF");
        scanner.eat_keyword("NOT");
        scanner.eat_keyword("EXISTS");
        let Some((name, span)) = scanner.parse_table_name(default_schema) else {
            return Vec::new();
        };
        return vec![SchemaChange {
            statement: replace_spans(query, &[(span, rewrite(&name).quoted())]),
            affected_table: name,
            deleted_table: None,
            created_table: None,
            is_schema_change: true,
        }];
    }

    let mut scanner = Scanner::new(query);
    if scanner.eat_keyword("DROP") && scanner.eat_keyword("TABLE") {
        scanner.eat_keyword("IF");
        scanner.eat_keyword("EXISTS");
        let mut changes = Vec::new();
        loop {
            let Some((name, _)) = scanner.parse_table_name(default_schema) else {
                break;
            };
            // each dropped table becomes its own descriptor
            changes.push(SchemaChange {
                statement: format!("DROP TABLE IF EXISTS {}", rewrite(&name).quoted()),
                affected_table: name.clone(),
                deleted_table: Some(name),
                created_table: None,
                is_schema_change: true,
            });
            if !scanner.eat_char(',') {
                break;
            }
        }
        return changes;
    }

    let mut scanner = Scanner::new(query);
    if scanner.eat_keyword("ALTER") && scanner.eat_keyword("TABLE") {
        let Some((name, span)) = scanner.parse_table_name(default_schema) else {
            return Vec::new();
        };

        if let Some((new_name, new_span)) = scanner.find_rename_target(default_schema) {
            // ALTER TABLE ... RENAME [TO|AS] <new>
            let spans = vec![
                (span, rewrite(&name).quoted()),
                (new_span, rewrite(&new_name).quoted()),
            ];
            return vec![SchemaChange {
                statement: replace_spans(query, &spans),
                affected_table: name.clone(),
                deleted_table: Some(name),
                created_table: Some(new_name),
                is_schema_change: true,
            }];
        }

        return vec![SchemaChange {
            statement: replace_spans(query, &[(span, rewrite(&name).quoted())]),
            affected_table: name,
            deleted_table: None,
            created_table: None,
            is_schema_change: true,
        }];
    }

    let mut scanner = Scanner::new(query);
    if scanner.eat_keyword("RENAME") && scanner.eat_keyword("TABLE") {
        let mut changes = Vec::new();
        loop {
            let Some((from, _)) = scanner.parse_table_name(default_schema) else {
                break;
            };
            if !scanner.eat_keyword("TO") {
                break;
            }
            let Some((to, _)) = scanner.parse_table_name(default_schema) else {
                break;
            };
            changes.push(SchemaChange {
                statement: format!(
                    "RENAME TABLE {} TO {}",
                    rewrite(&from).quoted(),
                    rewrite(&to).quoted()
                ),
                affected_table: from.clone(),
                deleted_table: Some(from),
                created_table: Some(to),
                is_schema_change: true,
            });
            if !scanner.eat_char(',') {
                break;
            }
        }
        return changes;
    }

    let mut scanner = Scanner::new(query);
    if scanner.eat_keyword("TRUNCATE") {
        scanner.eat_keyword("TABLE");
        let Some((name, span)) = scanner.parse_table_name(default_schema) else {
            return Vec::new();
        };
        // implicit commit, but the table definition is unchanged
        return vec![SchemaChange {
            statement: replace_spans(query, &[(span, rewrite(&name).quoted())]),
            affected_table: name,
            deleted_table: None,
            created_table: None,
            is_schema_change: false,
        }];
    }

    Vec::new()
}

type Span = (usize, usize);

/// Replace name spans with their rewritten quoted forms. Spans must not
/// overlap; replacement runs right-to-left so earlier offsets stay valid.
fn replace_spans(statement: &str, spans: &[(Span, String)]) -> String {
    let mut ordered: Vec<&(Span, String)> = spans.iter().collect();
    ordered.sort_by_key(|((start, _), _)| std::cmp::Reverse(*start));

    let mut out = statement.to_string();
    for ((start, end), replacement) in ordered {
        out.replace_range(*start..*end, replacement);
    }
    out
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    /// Consume a keyword (case-insensitive, word-bounded)
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let rest = &self.input[self.pos..];
        let bytes = rest.as_bytes();
        if bytes.len() < keyword.len() {
            return false;
        }
        if !bytes[..keyword.len()].eq_ignore_ascii_case(keyword.as_bytes()) {
            return false;
        }
        // the keyword is ASCII, so this boundary is valid
        if rest[keyword.len()..]
            .chars()
            .next()
            .map(is_ident_char)
            .unwrap_or(false)
        {
            return false;
        }
        self.pos += keyword.len();
        true
    }

    fn eat_char(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.input[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// Parse `name` or `schema.name`, backticked or bare. Returns the
    /// qualified name and the byte span of the whole token.
    fn parse_table_name(&mut self, default_schema: &str) -> Option<(QualifiedTableName, Span)> {
        self.skip_whitespace();
        let start = self.pos;
        let first = self.parse_ident()?;
        let name = if self.input[self.pos..].starts_with('.') {
            self.pos += 1;
            let second = self.parse_ident()?;
            QualifiedTableName::new(first, second)
        } else {
            QualifiedTableName::new(default_schema, first)
        };
        Some((name, (start, self.pos)))
    }

    fn parse_ident(&mut self) -> Option<String> {
        let rest = &self.input[self.pos..];
        if let Some(stripped) = rest.strip_prefix('`') {
            let end = stripped.find('`')?;
            self.pos += end + 2;
            return Some(stripped[..end].to_string());
        }

        let end = rest
            .char_indices()
            .find(|(_, c)| !is_ident_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        self.pos += end;
        Some(rest[..end].to_string())
    }

    /// Scan the remaining ALTER clauses for a table rename. `RENAME
    /// COLUMN`, `RENAME INDEX` and `RENAME KEY` are ordinary alters.
    fn find_rename_target(&mut self, default_schema: &str) -> Option<(QualifiedTableName, Span)> {
        while self.pos < self.input.len() {
            if self.eat_keyword("RENAME") {
                if self.eat_keyword("COLUMN") || self.eat_keyword("INDEX") || self.eat_keyword("KEY")
                {
                    continue;
                }
                let _ = self.eat_keyword("TO") || self.eat_keyword("AS");
                return self.parse_table_name(default_schema);
            }
            self.skip_whitespace();
            if self.pos < self.input.len() {
                // advance past the next token
                if self.parse_ident().is_none() {
                    self.pos += self.input[self.pos..]
                        .chars()
                        .next()
                        .map(|c| c.len_utf8())
                        .unwrap_or(1);
                }
            }
        }
        None
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_rewrites() -> (HashMap<String, String>, HashMap<String, String>) {
        (HashMap::new(), HashMap::new())
    }

    fn parse(query: &str) -> Vec<SchemaChange> {
        let (db, table) = no_rewrites();
        parse_schema_changes("shop", query, &db, &table)
    }

    #[test]
    fn test_create_table() {
        let changes = parse("CREATE TABLE t (id bigint PRIMARY KEY, data int)");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].affected_table, QualifiedTableName::new("shop", "t"));
        assert_eq!(changes[0].deleted_table, None);
        assert!(changes[0].is_schema_change);
        assert_eq!(
            changes[0].statement,
            "CREATE TABLE `shop`.`t` (id bigint PRIMARY KEY, data int)"
        );
        assert_eq!(
            changes[0].table_to_reload(),
            Some(QualifiedTableName::new("shop", "t"))
        );
    }

    #[test]
    fn test_create_table_if_not_exists_qualified() {
        let changes = parse("CREATE TABLE IF NOT EXISTS `crm`.`leads` (id int)");
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].affected_table,
            QualifiedTableName::new("crm", "leads")
        );
        assert_eq!(
            changes[0].statement,
            "CREATE TABLE IF NOT EXISTS `crm`.`leads` (id int)"
        );
    }

    #[test]
    fn test_alter_table_reloads_affected() {
        let changes = parse("ALTER TABLE t ADD COLUMN data2 int DEFAULT NULL");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].deleted_table, None);
        assert_eq!(changes[0].created_table, None);
        assert_eq!(
            changes[0].table_to_reload(),
            Some(QualifiedTableName::new("shop", "t"))
        );
        assert_eq!(
            changes[0].statement,
            "ALTER TABLE `shop`.`t` ADD COLUMN data2 int DEFAULT NULL"
        );
    }

    #[test]
    fn test_alter_table_rename_to() {
        let changes = parse("ALTER TABLE t RENAME TO t_renamed");
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].deleted_table,
            Some(QualifiedTableName::new("shop", "t"))
        );
        assert_eq!(
            changes[0].created_table,
            Some(QualifiedTableName::new("shop", "t_renamed"))
        );
        assert_eq!(
            changes[0].table_to_reload(),
            Some(QualifiedTableName::new("shop", "t_renamed"))
        );
    }

    #[test]
    fn test_alter_rename_column_is_plain_alter() {
        let changes = parse("ALTER TABLE t RENAME COLUMN a TO b");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].created_table, None);
        assert_eq!(
            changes[0].table_to_reload(),
            Some(QualifiedTableName::new("shop", "t"))
        );
    }

    #[test]
    fn test_rename_table_multiple_pairs() {
        let changes = parse("RENAME TABLE t TO t_renamed, u TO u_renamed");
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes[0].statement,
            "RENAME TABLE `shop`.`t` TO `shop`.`t_renamed`"
        );
        assert_eq!(
            changes[1].created_table,
            Some(QualifiedTableName::new("shop", "u_renamed"))
        );
    }

    #[test]
    fn test_drop_table_multiple() {
        let changes = parse("DROP TABLE IF EXISTS t, `crm`.`leads`");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].statement, "DROP TABLE IF EXISTS `shop`.`t`");
        assert_eq!(
            changes[0].deleted_table,
            Some(QualifiedTableName::new("shop", "t"))
        );
        assert_eq!(changes[0].table_to_reload(), None);
        assert_eq!(
            changes[1].statement,
            "DROP TABLE IF EXISTS `crm`.`leads`"
        );
    }

    #[test]
    fn test_truncate_is_not_a_schema_change() {
        let changes = parse("TRUNCATE t");
        assert_eq!(changes.len(), 1);
        assert!(!changes[0].is_schema_change);
        assert_eq!(changes[0].table_to_reload(), None);
        assert_eq!(changes[0].statement, "TRUNCATE `shop`.`t`");

        let changes = parse("TRUNCATE TABLE `shop`.`t`");
        assert_eq!(changes[0].statement, "TRUNCATE TABLE `shop`.`t`");
    }

    #[test]
    fn test_unrecognised_statements_decline() {
        assert!(parse("CREATE PROCEDURE p() BEGIN END").is_empty());
        assert!(parse("DROP PROCEDURE p").is_empty());
        assert!(parse("GRANT ALL ON shop.* TO 'app'").is_empty());
        assert!(parse("BEGIN").is_empty());
        assert!(parse("CREATE INDEX idx ON t (id)").is_empty());
    }

    #[test]
    fn test_rewrites_applied_to_statement() {
        let mut db_rewrites = HashMap::new();
        db_rewrites.insert("shop".to_string(), "shop_v2".to_string());
        let table_rewrites = HashMap::new();

        let changes = parse_schema_changes(
            "shop",
            "ALTER TABLE t ADD COLUMN note TEXT",
            &db_rewrites,
            &table_rewrites,
        );
        assert_eq!(
            changes[0].statement,
            "ALTER TABLE `shop_v2`.`t` ADD COLUMN note TEXT"
        );
        // descriptors keep source-side names
        assert_eq!(changes[0].affected_table, QualifiedTableName::new("shop", "t"));

        let changes = parse_schema_changes(
            "shop",
            "RENAME TABLE t TO t_renamed",
            &db_rewrites,
            &table_rewrites,
        );
        assert_eq!(
            changes[0].statement,
            "RENAME TABLE `shop_v2`.`t` TO `shop_v2`.`t_renamed`"
        );
    }
}
