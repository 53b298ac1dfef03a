use serde::{Deserialize, Serialize};

use crate::types::{ObjectMode, Side};

/// how urgently a conflict needs a human
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// what changed in a conflicting column definition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnChange {
    /// type conversion that silently discards information
    TypeLossy { from: String, to: String },
    TypeChanged { from: String, to: String },
    /// primary key or references clause on the column itself
    KeyChanged,
    NullabilityChanged,
    DefaultChanged,
    Other,
}

impl ColumnChange {
    /// ordering used to keep the most significant change of two sides
    pub(crate) fn weight(&self) -> u8 {
        match self {
            ColumnChange::TypeLossy { .. } => 5,
            ColumnChange::KeyChanged => 4,
            ColumnChange::TypeChanged { .. } => 3,
            ColumnChange::NullabilityChanged => 2,
            ColumnChange::DefaultChanged => 1,
            ColumnChange::Other => 0,
        }
    }
}

/// typed description of a conflicting change
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConflictKind {
    ColumnModified { change: ColumnChange },
    ConstraintModified { referential: bool, primary_key: bool },
    /// both sides only appended index definitions
    IndexAdded { ours: Vec<String>, theirs: Vec<String> },
    IndexModified,
    TableModified,
    RoutineModified,
    ObjectAddedBoth { mode: ObjectMode },
    ModifyRemove { mode: ObjectMode, removed_by: Side },
    KindMismatch,
    /// both sides gave a structured object a different mode
    ModeChanged {
        base: Option<ObjectMode>,
        ours: ObjectMode,
        theirs: ObjectMode,
    },
    ObjectModified { mode: ObjectMode },
}

/// key into the rule table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKey {
    ColumnTypeLossy,
    ColumnTypeChanged,
    ColumnKeyChanged,
    ColumnNullabilityChanged,
    ColumnDefaultChanged,
    ColumnModified,
    ForeignKeyChanged,
    PrimaryKeyChanged,
    ConstraintChanged,
    IndexAdded,
    IndexModified,
    TableModified,
    RoutineModified,
    AddedBothDifferent,
    ModifyRemove,
    KindMismatch,
    ModeChanged,
    ObjectModified,
}

impl ConflictKind {
    pub fn rule_key(&self) -> RuleKey {
        match self {
            ConflictKind::ColumnModified { change } => match change {
                ColumnChange::TypeLossy { .. } => RuleKey::ColumnTypeLossy,
                ColumnChange::TypeChanged { .. } => RuleKey::ColumnTypeChanged,
                ColumnChange::KeyChanged => RuleKey::ColumnKeyChanged,
                ColumnChange::NullabilityChanged => RuleKey::ColumnNullabilityChanged,
                ColumnChange::DefaultChanged => RuleKey::ColumnDefaultChanged,
                ColumnChange::Other => RuleKey::ColumnModified,
            },
            ConflictKind::ConstraintModified {
                referential: true, ..
            } => RuleKey::ForeignKeyChanged,
            ConflictKind::ConstraintModified {
                primary_key: true, ..
            } => RuleKey::PrimaryKeyChanged,
            ConflictKind::ConstraintModified { .. } => RuleKey::ConstraintChanged,
            ConflictKind::IndexAdded { .. } => RuleKey::IndexAdded,
            ConflictKind::IndexModified => RuleKey::IndexModified,
            ConflictKind::TableModified => RuleKey::TableModified,
            ConflictKind::RoutineModified => RuleKey::RoutineModified,
            ConflictKind::ObjectAddedBoth { .. } => RuleKey::AddedBothDifferent,
            ConflictKind::ModifyRemove { .. } => RuleKey::ModifyRemove,
            ConflictKind::KindMismatch => RuleKey::KindMismatch,
            ConflictKind::ModeChanged { .. } => RuleKey::ModeChanged,
            ConflictKind::ObjectModified { .. } => RuleKey::ObjectModified,
        }
    }
}

/// result of classifying one conflicting entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub kind: ConflictKind,
    pub severity: Severity,
    /// side to take without asking, if policy allows it
    pub suggestion: Option<Side>,
}

/// "one side dropped `from` and added `to` with nearly the same definition"
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenameHint {
    pub side: Side,
    pub from: String,
    pub to: String,
    pub similarity: f64,
}

impl std::fmt::Display for RenameHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: likely rename {} -> {} ({:.0}% similar)",
            self.side,
            self.from,
            self.to,
            self.similarity * 100.0
        )
    }
}
