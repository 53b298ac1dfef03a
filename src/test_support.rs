//! shared fixtures for unit tests

use tempfile::TempDir;

use crate::hash::Hash;
use crate::object::{create_blob, create_commit, create_tree};
use crate::repo::Repo;
use crate::types::{ObjectMode, TreeEntry};

pub(crate) fn test_repo() -> (TempDir, Repo) {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repo::init(&dir.path().join("repo")).unwrap();
    (dir, repo)
}

/// blob entry holding `definition`
pub(crate) fn object(repo: &Repo, name: &str, mode: ObjectMode, definition: &str) -> TreeEntry {
    let hash = create_blob(repo, definition).unwrap();
    TreeEntry::blob(name, mode, hash)
}

/// flat tree of blob entries
pub(crate) fn flat_tree(repo: &Repo, objects: &[(&str, ObjectMode, &str)]) -> Hash {
    let entries = objects
        .iter()
        .map(|(name, mode, def)| object(repo, name, *mode, def))
        .collect();
    create_tree(repo, entries).unwrap()
}

/// table subtree whose entries are column definitions
pub(crate) fn table(repo: &Repo, name: &str, columns: &[(&str, &str)]) -> TreeEntry {
    let entries = columns
        .iter()
        .map(|(col, def)| object(repo, col, ObjectMode::Column, def))
        .collect();
    TreeEntry::tree(name, ObjectMode::Table, create_tree(repo, entries).unwrap())
}

pub(crate) fn commit_tree(repo: &Repo, tree: Hash, parents: Vec<Hash>, message: &str) -> Hash {
    create_commit(repo, tree, parents, "dba", message).unwrap()
}
