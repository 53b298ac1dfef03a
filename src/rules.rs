//! severity policy for conflicting changes
//!
//! every [`RuleKey`] maps to a [`Rule`]. the built-in table can be overridden
//! key by key from the `[rules]` section of `config.toml` or a standalone
//! TOML file:
//!
//! ```toml
//! [column_default_changed]
//! severity = "info"
//! suggestion = "default_side"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoResultExt, Result};
use crate::types::{RuleKey, Severity, Side};

/// what to suggest for a conflict matching a rule
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suggestion {
    /// require an explicit resolution
    #[default]
    None,
    /// take the side configured in the merge policy
    DefaultSide,
    Ours,
    Theirs,
    /// keep both sides where the conflict allows it (independent index
    /// additions), otherwise the default side
    Union,
}

impl Suggestion {
    pub fn resolve(self, default_side: Side) -> Option<Side> {
        match self {
            Suggestion::None => None,
            Suggestion::DefaultSide | Suggestion::Union => Some(default_side),
            Suggestion::Ours => Some(Side::Ours),
            Suggestion::Theirs => Some(Side::Theirs),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub severity: Severity,
    #[serde(default)]
    pub suggestion: Suggestion,
}

impl Rule {
    const fn new(severity: Severity, suggestion: Suggestion) -> Self {
        Self {
            severity,
            suggestion,
        }
    }

    const fn critical() -> Self {
        Self::new(Severity::Critical, Suggestion::None)
    }

    const fn warning() -> Self {
        Self::new(Severity::Warning, Suggestion::None)
    }
}

/// rule per conflict kind; missing keys fall back to the built-in defaults
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleTable {
    pub column_type_lossy: Rule,
    pub column_type_changed: Rule,
    pub column_key_changed: Rule,
    pub column_nullability_changed: Rule,
    pub column_default_changed: Rule,
    pub column_modified: Rule,
    pub foreign_key_changed: Rule,
    pub primary_key_changed: Rule,
    pub constraint_changed: Rule,
    pub index_added: Rule,
    pub index_modified: Rule,
    pub table_modified: Rule,
    pub routine_modified: Rule,
    pub added_both_different: Rule,
    pub modify_remove: Rule,
    pub kind_mismatch: Rule,
    pub mode_changed: Rule,
    pub object_modified: Rule,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            column_type_lossy: Rule::critical(),
            column_type_changed: Rule::warning(),
            column_key_changed: Rule::critical(),
            column_nullability_changed: Rule::warning(),
            column_default_changed: Rule::warning(),
            column_modified: Rule::warning(),
            foreign_key_changed: Rule::critical(),
            primary_key_changed: Rule::critical(),
            constraint_changed: Rule::warning(),
            index_added: Rule::new(Severity::Info, Suggestion::Union),
            index_modified: Rule::warning(),
            table_modified: Rule::warning(),
            routine_modified: Rule::warning(),
            added_both_different: Rule::warning(),
            modify_remove: Rule::warning(),
            kind_mismatch: Rule::warning(),
            mode_changed: Rule::critical(),
            object_modified: Rule::warning(),
        }
    }
}

impl RuleTable {
    /// parse a rule table from TOML text
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// load a standalone rule table file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        Self::from_toml_str(&content)
    }

    pub fn rule(&self, key: RuleKey) -> &Rule {
        match key {
            RuleKey::ColumnTypeLossy => &self.column_type_lossy,
            RuleKey::ColumnTypeChanged => &self.column_type_changed,
            RuleKey::ColumnKeyChanged => &self.column_key_changed,
            RuleKey::ColumnNullabilityChanged => &self.column_nullability_changed,
            RuleKey::ColumnDefaultChanged => &self.column_default_changed,
            RuleKey::ColumnModified => &self.column_modified,
            RuleKey::ForeignKeyChanged => &self.foreign_key_changed,
            RuleKey::PrimaryKeyChanged => &self.primary_key_changed,
            RuleKey::ConstraintChanged => &self.constraint_changed,
            RuleKey::IndexAdded => &self.index_added,
            RuleKey::IndexModified => &self.index_modified,
            RuleKey::TableModified => &self.table_modified,
            RuleKey::RoutineModified => &self.routine_modified,
            RuleKey::AddedBothDifferent => &self.added_both_different,
            RuleKey::ModifyRemove => &self.modify_remove,
            RuleKey::KindMismatch => &self.kind_mismatch,
            RuleKey::ModeChanged => &self.mode_changed,
            RuleKey::ObjectModified => &self.object_modified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let table = RuleTable::default();
        assert_eq!(table.rule(RuleKey::ForeignKeyChanged).severity, Severity::Critical);
        assert_eq!(table.rule(RuleKey::PrimaryKeyChanged).severity, Severity::Critical);
        assert_eq!(table.rule(RuleKey::ColumnTypeLossy).severity, Severity::Critical);
        assert_eq!(table.rule(RuleKey::ColumnTypeChanged).severity, Severity::Warning);
        assert_eq!(table.rule(RuleKey::ColumnDefaultChanged).severity, Severity::Warning);
        assert_eq!(table.rule(RuleKey::ConstraintChanged).severity, Severity::Warning);

        let index = table.rule(RuleKey::IndexAdded);
        assert_eq!(index.severity, Severity::Info);
        assert_eq!(index.suggestion, Suggestion::Union);
        assert_eq!(table.rule(RuleKey::ModeChanged).severity, Severity::Critical);
    }

    #[test]
    fn test_only_info_suggests_by_default() {
        let table = RuleTable::default();
        for key in [
            RuleKey::ColumnTypeLossy,
            RuleKey::ColumnTypeChanged,
            RuleKey::ForeignKeyChanged,
            RuleKey::ModifyRemove,
            RuleKey::KindMismatch,
        ] {
            assert_eq!(table.rule(key).suggestion, Suggestion::None);
        }
    }

    #[test]
    fn test_partial_override() {
        let table = RuleTable::from_toml_str(
            r#"
[column_default_changed]
severity = "info"
suggestion = "ours"

[index_added]
severity = "warning"
"#,
        )
        .unwrap();

        let default_rule = table.rule(RuleKey::ColumnDefaultChanged);
        assert_eq!(default_rule.severity, Severity::Info);
        assert_eq!(default_rule.suggestion, Suggestion::Ours);

        // missing suggestion means none
        assert_eq!(table.rule(RuleKey::IndexAdded).suggestion, Suggestion::None);

        // untouched keys keep defaults
        assert_eq!(table.rule(RuleKey::ForeignKeyChanged).severity, Severity::Critical);
    }

    #[test]
    fn test_unknown_severity_rejected() {
        let result = RuleTable::from_toml_str("[index_added]\nseverity = \"fatal\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(&path, "[table_modified]\nseverity = \"critical\"\n").unwrap();

        let table = RuleTable::load(&path).unwrap();
        assert_eq!(table.rule(RuleKey::TableModified).severity, Severity::Critical);
    }

    #[test]
    fn test_suggestion_resolve() {
        assert_eq!(Suggestion::None.resolve(Side::Theirs), None);
        assert_eq!(Suggestion::DefaultSide.resolve(Side::Theirs), Some(Side::Theirs));
        assert_eq!(Suggestion::Ours.resolve(Side::Theirs), Some(Side::Ours));
        assert_eq!(Suggestion::Union.resolve(Side::Ours), Some(Side::Ours));
    }
}
