use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash;
use crate::types::{ChangeKind, ConflictKind, ObjectMode, RenameHint, Severity, Side};

/// lifecycle state of a merge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStatus {
    Initiated,
    AwaitingResolution,
    Completed,
    Aborted,
}

impl MergeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MergeStatus::Completed | MergeStatus::Aborted)
    }
}

impl std::fmt::Display for MergeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeStatus::Initiated => write!(f, "INITIATED"),
            MergeStatus::AwaitingResolution => write!(f, "AWAITING_RESOLUTION"),
            MergeStatus::Completed => write!(f, "COMPLETED"),
            MergeStatus::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// resolution supplied by a caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Ours,
    Theirs,
    /// replacement definition text; stored as a new blob
    Custom(String),
}

/// resolution as recorded on a conflict
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChosenResolution {
    Ours,
    Theirs,
    Custom { blob: Hash },
}

impl From<Side> for ChosenResolution {
    fn from(side: Side) -> Self {
        match side {
            Side::Ours => ChosenResolution::Ours,
            Side::Theirs => ChosenResolution::Theirs,
        }
    }
}

/// one divergent object inside a merge
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// identifier, unique within its merge
    pub id: u32,
    pub path: String,
    pub mode: ObjectMode,
    pub change: ChangeKind,
    pub base: Option<Hash>,
    pub ours: Option<Hash>,
    pub theirs: Option<Hash>,
    pub kind: ConflictKind,
    pub severity: Severity,
    pub suggestion: Option<Side>,
    pub resolution: Option<ChosenResolution>,
    pub resolved_at: Option<i64>,
    /// true when the suggestion was applied without a caller decision
    #[serde(default)]
    pub auto_resolved: bool,
}

impl ConflictRecord {
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}

/// an attempted merge and its audit trail
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub id: Uuid,
    pub ours_branch: String,
    pub theirs_branch: String,
    pub base: Hash,
    pub ours: Hash,
    pub theirs: Hash,
    pub status: MergeStatus,
    pub result: Option<Hash>,
    pub author: String,
    pub message: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub conflicts: Vec<ConflictRecord>,
    #[serde(default)]
    pub renames: Vec<RenameHint>,
}

impl MergeRecord {
    pub fn unresolved_count(&self) -> usize {
        self.conflicts.iter().filter(|c| !c.is_resolved()).count()
    }

    pub fn conflict(&self, id: u32) -> Option<&ConflictRecord> {
        self.conflicts.iter().find(|c| c.id == id)
    }

    pub fn conflict_mut(&mut self, id: u32) -> Option<&mut ConflictRecord> {
        self.conflicts.iter_mut().find(|c| c.id == id)
    }
}
