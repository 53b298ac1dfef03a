//! schemavc - versioned schema objects with three-way merges
//!
//! a content-addressed store for database schema snapshots with git-like
//! history. branches of a schema are merged with a three-way diff whose
//! conflicts are classified by kind and severity, resolved by a caller or by
//! policy, and recorded as an auditable merge history.
//!
//! # Core concepts
//!
//! - **Blob**: one normalized object definition (zstd compressed)
//! - **Tree**: named, typed entries pointing at blobs or subtrees (CBOR + zstd)
//! - **Commit**: a snapshot of a tree with parents and metadata (CBOR + zstd)
//! - **Branch**: a named head updated only by compare-and-swap
//! - **Merge record**: lifecycle and conflict decisions of one merge
//!
//! # Hash format
//!
//! hash = SHA256(tag | len(payload) as u64 LE | payload)
//!
//! where tag is `blob`, `tree` or `commit` and the payload is the normalized
//! definition text or the canonical CBOR encoding.
//!
//! # Example usage
//!
//! ```no_run
//! use schemavc::{ops, create_blob, create_commit, create_tree, create_branch, ObjectMode, Repo, TreeEntry};
//! use std::path::Path;
//!
//! let repo = Repo::init(Path::new("/path/to/repo")).unwrap();
//!
//! let users = create_blob(&repo, "CREATE TABLE users (id BIGINT PRIMARY KEY)").unwrap();
//! let tree = create_tree(&repo, vec![TreeEntry::blob("users", ObjectMode::Table, users)]).unwrap();
//! let root = create_commit(&repo, tree, vec![], "dba", "initial schema").unwrap();
//! create_branch(&repo, "main", &root).unwrap();
//! create_branch(&repo, "feature", &root).unwrap();
//!
//! let outcome = ops::start_merge(&repo, "main", "feature", &ops::MergeOptions::new("dba")).unwrap();
//! for conflict in &outcome.conflicts {
//!     println!("{} {} {}", conflict.id, conflict.severity, conflict.path);
//! }
//! ```

mod config;
mod error;
mod graph;
mod hash;
mod merges;
mod object;
mod refs;
mod repo;
mod rules;

pub mod ops;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::{Config, MergePolicy};
pub use error::{Error, ErrorCategory, Result};
pub use graph::{is_ancestor, CommitGraph, GraphNode};
pub use hash::{compute_blob_hash, normalize_definition, Hash};
pub use merges::{list_merges, read_merge};
pub use object::{
    blob_exists, commit_exists, create_blob, create_commit, create_tree, read_blob, read_commit,
    read_tree, store_commit, tree_exists,
};
pub use refs::{
    branch_exists, create_branch, list_branches, list_branches_matching, read_branch,
    resolve_commit, update_branch, Branch,
};
pub use repo::{Repo, RepoLock};
pub use rules::{Rule, RuleTable, Suggestion};
pub use types::{
    ChangeKind, ChosenResolution, Classification, ColumnChange, Commit, ConflictKind,
    ConflictRecord, DiffEntry, EntryKind, MergeRecord, MergeStatus, ObjectMode, RenameHint,
    Resolution, RuleKey, Severity, Side, Tree, TreeEntry,
};
