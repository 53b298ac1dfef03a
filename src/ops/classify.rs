//! conflict classification
//!
//! a conflicting [`DiffEntry`] is mapped to a typed [`ConflictKind`] by
//! looking at the object mode and, for columns, constraints and indexes, at
//! the parsed definition text. severity and suggestion then come from the
//! [`RuleTable`], never from the raw content.

use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;
use crate::hash::Hash;
use crate::object::read_blob;
use crate::repo::Repo;
use crate::rules::{RuleTable, Suggestion};
use crate::types::{
    ChangeKind, Classification, ColumnChange, ConflictKind, DiffEntry, ObjectMode, Severity, Side,
};

/// keywords that end the type portion of a column definition
const COLUMN_KEYWORDS: &[&str] = &[
    "NOT",
    "NULL",
    "DEFAULT",
    "PRIMARY",
    "REFERENCES",
    "UNIQUE",
    "CHECK",
    "CONSTRAINT",
    "COLLATE",
    "GENERATED",
];

/// parsed single-column definition, e.g. `email VARCHAR(100) NOT NULL DEFAULT ''`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    /// lower-cased, single-spaced type text
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub primary_key: bool,
    pub references: Option<String>,
}

impl ColumnDef {
    /// parse a column definition; None if there is no type
    pub fn parse(definition: &str) -> Option<ColumnDef> {
        let text = definition.trim().trim_end_matches([',', ';']);
        let tokens = tokenize(text);
        let (name, rest) = tokens.split_first()?;

        let type_len = rest
            .iter()
            .position(|t| is_keyword(t))
            .unwrap_or(rest.len());
        if type_len == 0 {
            return None;
        }

        let data_type = rest[..type_len]
            .iter()
            .map(|t| t.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        let mut def = ColumnDef {
            name: name.trim_matches('"').to_string(),
            data_type,
            nullable: true,
            default: None,
            primary_key: false,
            references: None,
        };

        let clauses = &rest[type_len..];
        let mut i = 0;
        while i < clauses.len() {
            let word = clauses[i].to_ascii_uppercase();
            let next = clauses.get(i + 1).map(|t| t.to_ascii_uppercase());
            match (word.as_str(), next.as_deref()) {
                ("NOT", Some("NULL")) => {
                    def.nullable = false;
                    i += 2;
                }
                ("PRIMARY", Some("KEY")) => {
                    def.primary_key = true;
                    def.nullable = false;
                    i += 2;
                }
                ("REFERENCES", Some(_)) => {
                    def.references = clauses.get(i + 1).map(|t| t.to_string());
                    i += 2;
                }
                ("DEFAULT", Some(_)) => {
                    // the first token always belongs to the default, e.g. DEFAULT NULL
                    let end = clauses[i + 2..]
                        .iter()
                        .position(|t| is_keyword(t))
                        .map(|p| i + 2 + p)
                        .unwrap_or(clauses.len());
                    def.default = Some(clauses[i + 1..end].join(" "));
                    i = end;
                }
                _ => i += 1,
            }
        }

        Some(def)
    }
}

fn is_keyword(token: &str) -> bool {
    COLUMN_KEYWORDS
        .iter()
        .any(|k| k.eq_ignore_ascii_case(token))
}

/// split on whitespace outside parentheses
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in text.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// coarse SQL type with the parameters that matter for lossiness
#[derive(Clone, Debug, PartialEq, Eq)]
enum SqlType {
    /// byte width
    Integer(u8),
    Decimal { precision: Option<u32>, scale: u32 },
    /// byte width
    Float(u8),
    Character,
    Boolean,
    Date,
    Time,
    Timestamp,
    Binary,
    Other(String),
}

impl SqlType {
    fn parse(data_type: &str) -> SqlType {
        let (base, params) = match data_type.find('(') {
            Some(open) => {
                let close = data_type.rfind(')').unwrap_or(data_type.len());
                let inner = data_type.get(open + 1..close).unwrap_or("");
                let params: Vec<u32> = inner
                    .split(',')
                    .filter_map(|p| p.trim().parse().ok())
                    .collect();
                (data_type[..open].trim(), params)
            }
            None => (data_type.trim(), Vec::new()),
        };

        match base {
            "smallint" | "int2" | "smallserial" => SqlType::Integer(2),
            "integer" | "int" | "int4" | "serial" => SqlType::Integer(4),
            "bigint" | "int8" | "bigserial" => SqlType::Integer(8),
            "numeric" | "decimal" => SqlType::Decimal {
                precision: params.first().copied(),
                scale: params.get(1).copied().unwrap_or(0),
            },
            "real" | "float4" => SqlType::Float(4),
            "double precision" | "float8" | "float" => SqlType::Float(8),
            "text" | "varchar" | "char" | "character" | "character varying" | "bpchar"
            | "citext" => SqlType::Character,
            "boolean" | "bool" => SqlType::Boolean,
            "date" => SqlType::Date,
            b if b.starts_with("timestamp") => SqlType::Timestamp,
            b if b.starts_with("time") => SqlType::Time,
            "bytea" | "blob" | "binary" | "varbinary" => SqlType::Binary,
            other => SqlType::Other(other.to_string()),
        }
    }
}

/// would converting a column from `from` to `to` silently discard data
///
/// types outside the known families are compared by name: any change between
/// two of them counts as lossy, so `jsonb` to `json` is CRITICAL under the
/// default rules.
pub fn is_lossy_conversion(from: &str, to: &str) -> bool {
    use SqlType::*;

    match (SqlType::parse(from), SqlType::parse(to)) {
        (Integer(a), Integer(b)) => b < a,
        (Integer(_), Decimal { precision: None, .. }) => false,
        (
            Integer(width),
            Decimal {
                precision: Some(p),
                scale,
            },
        ) => p.saturating_sub(scale) < integer_digits(width),
        (Integer(_), Float(_)) => false,
        (Decimal { .. } | Float(_), Integer(_)) => true,
        (
            Decimal {
                precision: pa,
                scale: sa,
            },
            Decimal {
                precision: pb,
                scale: sb,
            },
        ) => sb < sa || matches!((pa, pb), (Some(a), Some(b)) if b < a) || (pa.is_none() && pb.is_some()),
        (Float(a), Float(b)) => b < a,
        (Character, Character) => false,
        (Timestamp, Date | Time) => true,
        (Date, Timestamp) => false,
        (a, b) => a != b,
    }
}

/// decimal digits needed for the largest value of an integer width
fn integer_digits(width: u8) -> u32 {
    match width {
        2 => 5,
        4 => 10,
        _ => 19,
    }
}

/// most significant difference between two column definitions
pub fn column_change(from: &str, to: &str) -> ColumnChange {
    let (Some(a), Some(b)) = (ColumnDef::parse(from), ColumnDef::parse(to)) else {
        return ColumnChange::Other;
    };

    let mut changes = Vec::new();
    if a.data_type != b.data_type {
        if is_lossy_conversion(&a.data_type, &b.data_type) {
            changes.push(ColumnChange::TypeLossy {
                from: a.data_type.clone(),
                to: b.data_type.clone(),
            });
        } else {
            changes.push(ColumnChange::TypeChanged {
                from: a.data_type.clone(),
                to: b.data_type.clone(),
            });
        }
    }
    if a.primary_key != b.primary_key || a.references != b.references {
        changes.push(ColumnChange::KeyChanged);
    }
    if a.nullable != b.nullable {
        changes.push(ColumnChange::NullabilityChanged);
    }
    if a.default != b.default {
        changes.push(ColumnChange::DefaultChanged);
    }

    most_significant(changes)
}

fn most_significant(changes: Vec<ColumnChange>) -> ColumnChange {
    changes
        .into_iter()
        .max_by_key(|c| c.weight())
        .unwrap_or(ColumnChange::Other)
}

/// index definitions appended by each side, when that is all that happened
///
/// both sides must keep the base lines as a prefix, add at least one line,
/// and not add indexes with the same name.
pub fn appended_indexes(
    base: Option<&str>,
    ours: &str,
    theirs: &str,
) -> Option<(Vec<String>, Vec<String>)> {
    let base_lines: Vec<&str> = base.map(|b| b.lines().collect()).unwrap_or_default();

    let appended = |text: &str| -> Option<Vec<String>> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() <= base_lines.len() || lines[..base_lines.len()] != base_lines[..] {
            return None;
        }
        Some(
            lines[base_lines.len()..]
                .iter()
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.to_string())
                .collect(),
        )
    };

    let ours_added = appended(ours)?;
    let theirs_added = appended(theirs)?;

    let ours_names: HashSet<String> = ours_added.iter().filter_map(|l| index_name(l)).collect();
    if theirs_added
        .iter()
        .filter_map(|l| index_name(l))
        .any(|n| ours_names.contains(&n))
    {
        return None;
    }

    Some((ours_added, theirs_added))
}

/// name following INDEX in a CREATE INDEX statement
fn index_name(line: &str) -> Option<String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let pos = tokens.iter().position(|t| t.eq_ignore_ascii_case("INDEX"))?;
    let mut rest = tokens[pos + 1..].iter();
    let mut name = rest.next()?;
    // CREATE INDEX IF NOT EXISTS name / CONCURRENTLY name
    while name.eq_ignore_ascii_case("IF")
        || name.eq_ignore_ascii_case("NOT")
        || name.eq_ignore_ascii_case("EXISTS")
        || name.eq_ignore_ascii_case("CONCURRENTLY")
    {
        name = rest.next()?;
    }
    if name.eq_ignore_ascii_case("ON") {
        return None;
    }
    Some(name.trim_matches('"').to_ascii_lowercase())
}

/// classifies entries against a rule table
pub struct Classifier<'a> {
    repo: &'a Repo,
    rules: &'a RuleTable,
    default_side: Side,
}

impl<'a> Classifier<'a> {
    /// classifier using the repository's configured rules
    pub fn new(repo: &'a Repo) -> Self {
        let config = repo.config();
        Self {
            repo,
            rules: &config.rules,
            default_side: config.merge.default_side,
        }
    }

    pub fn with_rules(repo: &'a Repo, rules: &'a RuleTable, default_side: Side) -> Self {
        Self {
            repo,
            rules,
            default_side,
        }
    }

    /// classify one diff entry
    ///
    /// clean entries are reported as INFO with their implicit side as the
    /// suggestion.
    pub fn classify(&self, entry: &DiffEntry) -> Result<Classification> {
        let mode = entry_mode(entry);

        if !entry.is_conflict() {
            return Ok(Classification {
                kind: ConflictKind::ObjectModified { mode },
                severity: Severity::Info,
                suggestion: entry.change.implicit_side(),
            });
        }

        let kind = self.conflict_kind(entry, mode)?;
        let rule = self.rules.rule(kind.rule_key());
        let classification = Classification {
            severity: rule.severity,
            suggestion: rule.suggestion.resolve(self.default_side),
            kind,
        };

        debug!(
            path = %entry.path,
            change = %entry.change,
            rule = ?classification.kind.rule_key(),
            severity = %classification.severity,
            "classified conflict"
        );

        Ok(classification)
    }

    /// should an automatic resolution of `kind` keep both sides
    pub(crate) fn combines(&self, kind: &ConflictKind) -> bool {
        matches!(kind, ConflictKind::IndexAdded { .. })
            && self.rules.rule(kind.rule_key()).suggestion == Suggestion::Union
    }

    fn conflict_kind(&self, entry: &DiffEntry, mode: ObjectMode) -> Result<ConflictKind> {
        if let (Some(ours), Some(theirs)) = (&entry.ours, &entry.theirs) {
            if ours.is_tree() && theirs.is_tree() {
                return Ok(ConflictKind::ModeChanged {
                    base: entry.base.as_ref().map(|e| e.mode),
                    ours: ours.mode,
                    theirs: theirs.mode,
                });
            }
        }

        let kind = match entry.change {
            ChangeKind::KindMismatch => ConflictKind::KindMismatch,
            ChangeKind::ModifiedVsRemoved => ConflictKind::ModifyRemove {
                mode,
                removed_by: Side::Theirs,
            },
            ChangeKind::RemovedVsModified => ConflictKind::ModifyRemove {
                mode,
                removed_by: Side::Ours,
            },
            ChangeKind::AddedBothDifferent | ChangeKind::ModifiedBothDifferent => {
                self.content_kind(entry, mode)?
            }
            _ => ConflictKind::ObjectModified { mode },
        };
        Ok(kind)
    }

    /// both sides hold a blob that differs from the other
    fn content_kind(&self, entry: &DiffEntry, mode: ObjectMode) -> Result<ConflictKind> {
        let base = self.text(entry.base.as_ref().map(|e| &e.hash))?;
        let ours = self
            .text(entry.ours.as_ref().map(|e| &e.hash))?
            .unwrap_or_default();
        let theirs = self
            .text(entry.theirs.as_ref().map(|e| &e.hash))?
            .unwrap_or_default();

        let kind = match mode {
            ObjectMode::Column => {
                let change = match &base {
                    Some(base) => {
                        most_significant(vec![column_change(base, &ours), column_change(base, &theirs)])
                    }
                    None => column_change(&ours, &theirs),
                };
                ConflictKind::ColumnModified { change }
            }
            ObjectMode::Constraint => {
                let texts = [base.as_deref(), Some(ours.as_str()), Some(theirs.as_str())];
                let upper: Vec<String> = texts
                    .iter()
                    .flatten()
                    .map(|t| t.to_ascii_uppercase())
                    .collect();
                ConflictKind::ConstraintModified {
                    referential: upper
                        .iter()
                        .any(|t| t.contains("FOREIGN KEY") || t.contains("REFERENCES")),
                    primary_key: upper.iter().any(|t| t.contains("PRIMARY KEY")),
                }
            }
            ObjectMode::Index => match appended_indexes(base.as_deref(), &ours, &theirs) {
                Some((ours, theirs)) => ConflictKind::IndexAdded { ours, theirs },
                None => ConflictKind::IndexModified,
            },
            _ if entry.change == ChangeKind::AddedBothDifferent => {
                ConflictKind::ObjectAddedBoth { mode }
            }
            ObjectMode::Table => ConflictKind::TableModified,
            ObjectMode::Routine => ConflictKind::RoutineModified,
            _ => ConflictKind::ObjectModified { mode },
        };
        Ok(kind)
    }

    fn text(&self, hash: Option<&Hash>) -> Result<Option<String>> {
        hash.map(|h| read_blob(self.repo, h)).transpose()
    }
}

/// classify one diff entry with the repository's rules
pub fn classify(repo: &Repo, entry: &DiffEntry) -> Result<Classification> {
    Classifier::new(repo).classify(entry)
}

/// mode of the entry, preferring ours, then theirs, then base
pub(crate) fn entry_mode(entry: &DiffEntry) -> ObjectMode {
    entry
        .ours
        .as_ref()
        .or(entry.theirs.as_ref())
        .or(entry.base.as_ref())
        .map(|e| e.mode)
        .unwrap_or(ObjectMode::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Rule, Suggestion};
    use crate::test_support::{object, test_repo};
    use crate::types::TreeEntry;

    fn conflict(
        repo: &Repo,
        mode: ObjectMode,
        base: Option<&str>,
        ours: Option<&str>,
        theirs: Option<&str>,
        change: ChangeKind,
    ) -> DiffEntry {
        let make = |text: Option<&str>| -> Option<TreeEntry> {
            text.map(|t| object(repo, "obj", mode, t))
        };
        DiffEntry {
            path: "users/obj".into(),
            base: make(base),
            ours: make(ours),
            theirs: make(theirs),
            change,
        }
    }

    #[test]
    fn test_parse_column() {
        let col = ColumnDef::parse("email VARCHAR(100) NOT NULL DEFAULT 'x@y'").unwrap();
        assert_eq!(col.name, "email");
        assert_eq!(col.data_type, "varchar(100)");
        assert!(!col.nullable);
        assert_eq!(col.default.as_deref(), Some("'x@y'"));
        assert!(!col.primary_key);

        let id = ColumnDef::parse("id BIGINT PRIMARY KEY,").unwrap();
        assert!(id.primary_key);
        assert!(!id.nullable);

        let fk = ColumnDef::parse("user_id INT REFERENCES users(id)").unwrap();
        assert_eq!(fk.references.as_deref(), Some("users(id)"));

        let spaced = ColumnDef::parse("amount NUMERIC(10, 2)").unwrap();
        assert_eq!(spaced.data_type, "numeric(10, 2)");

        let multi = ColumnDef::parse("seen_at TIMESTAMP WITH TIME ZONE").unwrap();
        assert_eq!(multi.data_type, "timestamp with time zone");

        assert!(ColumnDef::parse("lonely").is_none());
    }

    #[test]
    fn test_lossy_conversions() {
        assert!(is_lossy_conversion("bigint", "integer"));
        assert!(is_lossy_conversion("numeric(10, 2)", "integer"));
        assert!(is_lossy_conversion("double precision", "integer"));
        assert!(is_lossy_conversion("numeric(10, 4)", "numeric(10, 2)"));
        assert!(is_lossy_conversion("timestamp", "date"));
        assert!(is_lossy_conversion("text", "integer"));
        assert!(is_lossy_conversion("double precision", "real"));

        assert!(!is_lossy_conversion("integer", "bigint"));
        assert!(!is_lossy_conversion("integer", "numeric"));
        assert!(!is_lossy_conversion("text", "varchar(100)"));
        assert!(!is_lossy_conversion("varchar(10)", "varchar(255)"));
        assert!(!is_lossy_conversion("date", "timestamp"));
        assert!(!is_lossy_conversion("numeric(10, 2)", "numeric(12, 2)"));
        assert!(is_lossy_conversion("bigint", "numeric(10)"));
        assert!(!is_lossy_conversion("integer", "numeric(12, 2)"));
    }

    #[test]
    fn test_column_change_priority() {
        assert_eq!(
            column_change("email TEXT", "email TEXT NOT NULL"),
            ColumnChange::NullabilityChanged
        );
        assert_eq!(
            column_change("n INT DEFAULT 0", "n INT DEFAULT 1"),
            ColumnChange::DefaultChanged
        );
        assert_eq!(
            column_change("n NUMERIC(10, 2)", "n INTEGER NOT NULL"),
            ColumnChange::TypeLossy {
                from: "numeric(10, 2)".into(),
                to: "integer".into()
            }
        );
        assert_eq!(column_change("n INT", "n INT PRIMARY KEY"), ColumnChange::KeyChanged);
    }

    #[test]
    fn test_true_conflict_is_warning() {
        let (_dir, repo) = test_repo();
        let entry = conflict(
            &repo,
            ObjectMode::Column,
            Some("email TEXT"),
            Some("email VARCHAR(100)"),
            Some("email TEXT NOT NULL"),
            ChangeKind::ModifiedBothDifferent,
        );

        let c = classify(&repo, &entry).unwrap();
        assert_eq!(c.severity, Severity::Warning);
        assert_eq!(c.suggestion, None);
        assert!(matches!(
            c.kind,
            ConflictKind::ColumnModified {
                change: ColumnChange::TypeChanged { .. }
            }
        ));
    }

    #[test]
    fn test_lossy_column_is_critical() {
        let (_dir, repo) = test_repo();
        let entry = conflict(
            &repo,
            ObjectMode::Column,
            Some("total NUMERIC(12, 2)"),
            Some("total INTEGER"),
            Some("total NUMERIC(12, 2) NOT NULL"),
            ChangeKind::ModifiedBothDifferent,
        );

        let c = classify(&repo, &entry).unwrap();
        assert_eq!(c.severity, Severity::Critical);
        assert_eq!(c.kind.rule_key(), crate::types::RuleKey::ColumnTypeLossy);
    }

    #[test]
    fn test_foreign_key_constraint_is_critical() {
        let (_dir, repo) = test_repo();
        let entry = conflict(
            &repo,
            ObjectMode::Constraint,
            Some("FOREIGN KEY (user_id) REFERENCES users(id)"),
            Some("FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE"),
            Some("FOREIGN KEY (user_id) REFERENCES accounts(id)"),
            ChangeKind::ModifiedBothDifferent,
        );

        let c = classify(&repo, &entry).unwrap();
        assert_eq!(c.severity, Severity::Critical);
        assert_eq!(
            c.kind,
            ConflictKind::ConstraintModified {
                referential: true,
                primary_key: false
            }
        );
    }

    #[test]
    fn test_check_constraint_is_warning() {
        let (_dir, repo) = test_repo();
        let entry = conflict(
            &repo,
            ObjectMode::Constraint,
            Some("CHECK (qty > 0)"),
            Some("CHECK (qty >= 0)"),
            Some("CHECK (qty > 1)"),
            ChangeKind::ModifiedBothDifferent,
        );
        assert_eq!(classify(&repo, &entry).unwrap().severity, Severity::Warning);
    }

    #[test]
    fn test_independent_indexes_are_info() {
        let (_dir, repo) = test_repo();
        let base = "CREATE INDEX users_pkey_idx ON users (id)";
        let entry = conflict(
            &repo,
            ObjectMode::Index,
            Some(base),
            Some(format!("{}\nCREATE INDEX users_email_idx ON users (email)", base).as_str()),
            Some(format!("{}\nCREATE INDEX users_name_idx ON users (name)", base).as_str()),
            ChangeKind::ModifiedBothDifferent,
        );

        let c = classify(&repo, &entry).unwrap();
        assert_eq!(c.severity, Severity::Info);
        // default side from config is theirs
        assert_eq!(c.suggestion, Some(Side::Theirs));
        match c.kind {
            ConflictKind::IndexAdded { ours, theirs } => {
                assert_eq!(ours, vec!["CREATE INDEX users_email_idx ON users (email)"]);
                assert_eq!(theirs, vec!["CREATE INDEX users_name_idx ON users (name)"]);
            }
            other => panic!("expected IndexAdded, got {:?}", other),
        }
    }

    #[test]
    fn test_same_index_name_is_modified() {
        let (_dir, repo) = test_repo();
        let entry = conflict(
            &repo,
            ObjectMode::Index,
            None,
            Some("CREATE INDEX idx ON users (email)"),
            Some("CREATE UNIQUE INDEX idx ON users (email)"),
            ChangeKind::AddedBothDifferent,
        );
        assert_eq!(
            classify(&repo, &entry).unwrap().kind,
            ConflictKind::IndexModified
        );
    }

    #[test]
    fn test_modify_remove() {
        let (_dir, repo) = test_repo();
        let entry = conflict(
            &repo,
            ObjectMode::Table,
            Some("CREATE TABLE t ()"),
            None,
            Some("CREATE TABLE t (id INT)"),
            ChangeKind::RemovedVsModified,
        );

        let c = classify(&repo, &entry).unwrap();
        assert_eq!(
            c.kind,
            ConflictKind::ModifyRemove {
                mode: ObjectMode::Table,
                removed_by: Side::Ours
            }
        );
        assert_eq!(c.severity, Severity::Warning);
    }

    #[test]
    fn test_custom_rules() {
        let (_dir, repo) = test_repo();
        let mut rules = RuleTable::default();
        rules.table_modified = Rule {
            severity: Severity::Info,
            suggestion: Suggestion::Ours,
        };

        let entry = conflict(
            &repo,
            ObjectMode::Table,
            Some("CREATE TABLE t ()"),
            Some("CREATE TABLE t (a INT)"),
            Some("CREATE TABLE t (b INT)"),
            ChangeKind::ModifiedBothDifferent,
        );

        let c = Classifier::with_rules(&repo, &rules, Side::Theirs)
            .classify(&entry)
            .unwrap();
        assert_eq!(c.kind, ConflictKind::TableModified);
        assert_eq!(c.severity, Severity::Info);
        assert_eq!(c.suggestion, Some(Side::Ours));
    }

    #[test]
    fn test_clean_entry_reports_implicit_side() {
        let (_dir, repo) = test_repo();
        let entry = conflict(
            &repo,
            ObjectMode::View,
            Some("SELECT 1"),
            Some("SELECT 1"),
            Some("SELECT 2"),
            ChangeKind::ModifiedTheirsOnly,
        );
        let c = classify(&repo, &entry).unwrap();
        assert_eq!(c.severity, Severity::Info);
        assert_eq!(c.suggestion, Some(Side::Theirs));
    }

    #[test]
    fn test_structured_mode_conflict() {
        let (_dir, repo) = test_repo();
        let users = crate::test_support::table(&repo, "users", &[("id", "id INT")]);
        let as_mode = |mode| TreeEntry::tree("users", mode, users.hash);
        let entry = DiffEntry {
            path: "users".into(),
            base: Some(users.clone()),
            ours: Some(as_mode(ObjectMode::View)),
            theirs: Some(as_mode(ObjectMode::Other)),
            change: ChangeKind::ModifiedBothDifferent,
        };

        let c = classify(&repo, &entry).unwrap();
        assert_eq!(
            c.kind,
            ConflictKind::ModeChanged {
                base: Some(ObjectMode::Table),
                ours: ObjectMode::View,
                theirs: ObjectMode::Other,
            }
        );
        assert_eq!(c.severity, Severity::Critical);
        assert_eq!(c.suggestion, None);
    }

    #[test]
    fn test_union_follows_rules() {
        let (_dir, repo) = test_repo();
        let added = ConflictKind::IndexAdded {
            ours: vec!["CREATE INDEX a ON t (a)".into()],
            theirs: vec!["CREATE INDEX b ON t (b)".into()],
        };
        assert!(Classifier::new(&repo).combines(&added));
        assert!(!Classifier::new(&repo).combines(&ConflictKind::IndexModified));

        let mut rules = RuleTable::default();
        rules.index_added = Rule {
            severity: Severity::Info,
            suggestion: Suggestion::Ours,
        };
        assert!(!Classifier::with_rules(&repo, &rules, Side::Theirs).combines(&added));
    }
}
