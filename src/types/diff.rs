use serde::{Deserialize, Serialize};

use crate::types::TreeEntry;

/// one side of a merge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Ours,
    Theirs,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Ours => Side::Theirs,
            Side::Theirs => Side::Ours,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Ours => write!(f, "ours"),
            Side::Theirs => write!(f, "theirs"),
        }
    }
}

/// three-way classification of one named object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    AddedTheirsOnly,
    AddedOursOnly,
    AddedBothIdentical,
    AddedBothDifferent,
    ModifiedTheirsOnly,
    ModifiedOursOnly,
    ModifiedBothIdentical,
    ModifiedBothDifferent,
    RemovedTheirsOnly,
    RemovedOursOnly,
    RemovedBoth,
    ModifiedVsRemoved,
    RemovedVsModified,
    /// one side holds a blob where the other holds a tree
    KindMismatch,
}

impl ChangeKind {
    /// does this change need a decision beyond the implicit rule
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ChangeKind::AddedBothDifferent
                | ChangeKind::ModifiedBothDifferent
                | ChangeKind::ModifiedVsRemoved
                | ChangeKind::RemovedVsModified
                | ChangeKind::KindMismatch
        )
    }

    /// which side a clean change is taken from
    ///
    /// for identical changes and removed-both either side yields the same
    /// result, ours is reported.
    pub fn implicit_side(&self) -> Option<Side> {
        match self {
            ChangeKind::AddedTheirsOnly
            | ChangeKind::ModifiedTheirsOnly
            | ChangeKind::RemovedTheirsOnly => Some(Side::Theirs),
            ChangeKind::AddedOursOnly
            | ChangeKind::ModifiedOursOnly
            | ChangeKind::RemovedOursOnly
            | ChangeKind::AddedBothIdentical
            | ChangeKind::ModifiedBothIdentical
            | ChangeKind::RemovedBoth => Some(Side::Ours),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::AddedTheirsOnly => "added-theirs-only",
            ChangeKind::AddedOursOnly => "added-ours-only",
            ChangeKind::AddedBothIdentical => "added-both-identical",
            ChangeKind::AddedBothDifferent => "added-both-different",
            ChangeKind::ModifiedTheirsOnly => "modified-theirs-only",
            ChangeKind::ModifiedOursOnly => "modified-ours-only",
            ChangeKind::ModifiedBothIdentical => "modified-both-identical",
            ChangeKind::ModifiedBothDifferent => "modified-both-different",
            ChangeKind::RemovedTheirsOnly => "removed-theirs-only",
            ChangeKind::RemovedOursOnly => "removed-ours-only",
            ChangeKind::RemovedBoth => "removed-both",
            ChangeKind::ModifiedVsRemoved => "modified-vs-removed",
            ChangeKind::RemovedVsModified => "removed-vs-modified",
            ChangeKind::KindMismatch => "kind-mismatch",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// entry in a three-way diff result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// slash-joined path of the object from the tree root
    pub path: String,
    pub base: Option<TreeEntry>,
    pub ours: Option<TreeEntry>,
    pub theirs: Option<TreeEntry>,
    pub change: ChangeKind,
}

impl DiffEntry {
    pub fn is_conflict(&self) -> bool {
        self.change.is_conflict()
    }

    /// the entry a clean change resolves to (None means the object is dropped)
    pub fn implicit_entry(&self) -> Option<&TreeEntry> {
        self.change.implicit_side().and_then(|side| self.side(side))
    }

    pub fn side(&self, side: Side) -> Option<&TreeEntry> {
        match side {
            Side::Ours => self.ours.as_ref(),
            Side::Theirs => self.theirs.as_ref(),
        }
    }

    /// last path component
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

impl std::fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.change, self.path)
    }
}
