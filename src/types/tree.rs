use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hash::Hash;

/// a snapshot of named schema objects - collection of entries sorted by name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// create a new tree, validating and sorting entries
    pub fn new(mut entries: Vec<TreeEntry>) -> Result<Self> {
        for entry in &entries {
            validate_entry_name(&entry.name)?;
        }

        // sort by name (byte-wise)
        entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

        for window in entries.windows(2) {
            if window[0].name == window[1].name {
                return Err(Error::DuplicateEntryName(window[0].name.clone()));
            }
        }

        Ok(Self { entries })
    }

    /// create an empty tree
    pub fn empty() -> Self {
        Self { entries: vec![] }
    }

    /// get entries slice
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// consume and return entries
    pub fn into_entries(self) -> Vec<TreeEntry> {
        self.entries
    }

    /// look up entry by name
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// is tree empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// validate an entry name
fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidEntryName("empty name".to_string()));
    }
    if name.contains('/') {
        return Err(Error::InvalidEntryName(format!(
            "name contains '/': {}",
            name
        )));
    }
    if name.contains('\0') {
        return Err(Error::InvalidEntryName(format!(
            "name contains null byte: {}",
            name
        )));
    }
    if name == "." || name == ".." {
        return Err(Error::InvalidEntryName(format!("reserved name: {}", name)));
    }
    Ok(())
}

/// a single entry in a tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
    pub mode: ObjectMode,
    pub hash: Hash,
}

impl TreeEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind, mode: ObjectMode, hash: Hash) -> Self {
        Self {
            name: name.into(),
            kind,
            mode,
            hash,
        }
    }

    /// create an entry pointing at a blob
    pub fn blob(name: impl Into<String>, mode: ObjectMode, hash: Hash) -> Self {
        Self::new(name, EntryKind::Blob, mode, hash)
    }

    /// create an entry pointing at a nested tree
    pub fn tree(name: impl Into<String>, mode: ObjectMode, hash: Hash) -> Self {
        Self::new(name, EntryKind::Tree, mode, hash)
    }

    /// true if both entries refer to the same thing, ignoring the name
    pub fn same_target(&self, other: &TreeEntry) -> bool {
        self.kind == other.kind && self.mode == other.mode && self.hash == other.hash
    }

    pub fn is_tree(&self) -> bool {
        self.kind == EntryKind::Tree
    }
}

/// what a tree entry points at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Blob,
    Tree,
}

impl EntryKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            EntryKind::Blob => "blob",
            EntryKind::Tree => "tree",
        }
    }
}

/// the class of schema object an entry describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectMode {
    Table,
    Column,
    Index,
    Constraint,
    Routine,
    View,
    Sequence,
    Other,
}

impl ObjectMode {
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectMode::Table => "table",
            ObjectMode::Column => "column",
            ObjectMode::Index => "index",
            ObjectMode::Constraint => "constraint",
            ObjectMode::Routine => "routine",
            ObjectMode::View => "view",
            ObjectMode::Sequence => "sequence",
            ObjectMode::Other => "other",
        }
    }
}

impl std::fmt::Display for ObjectMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}
