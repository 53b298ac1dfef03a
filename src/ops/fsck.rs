use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::graph::CommitGraph;
use crate::hash::Hash;
use crate::object::{blob_exists, commit_exists, read_blob, read_commit, read_tree, tree_exists};
use crate::refs::{list_branches, read_branch};
use crate::repo::Repo;
use crate::types::{Commit, EntryKind, Tree};

/// fsck report
#[derive(Debug, Default)]
pub struct FsckReport {
    /// objects checked
    pub objects_checked: usize,
    /// objects that cannot be read or whose content does not match their hash
    pub corrupt_objects: Vec<CorruptObject>,
    /// missing objects referenced by other objects or branches
    pub missing_objects: Vec<MissingObject>,
    /// dangling objects (not reachable from any branch)
    pub dangling_objects: Vec<Hash>,
    /// commits whose cached graph row disagrees with the commit
    pub graph_mismatches: Vec<Hash>,
}

impl FsckReport {
    pub fn is_ok(&self) -> bool {
        self.corrupt_objects.is_empty()
            && self.missing_objects.is_empty()
            && self.graph_mismatches.is_empty()
    }
}

#[derive(Debug)]
pub struct CorruptObject {
    pub hash: Hash,
    pub object_type: ObjectType,
    pub message: String,
}

#[derive(Debug)]
pub struct MissingObject {
    pub hash: Hash,
    pub object_type: ObjectType,
    pub referenced_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectType::Blob => write!(f, "blob"),
            ObjectType::Tree => write!(f, "tree"),
            ObjectType::Commit => write!(f, "commit"),
        }
    }
}

/// verify repository integrity
///
/// every stored object is re-read (which re-verifies its identity), every
/// reference from trees, commits and branches is checked, and cached graph
/// rows are compared with the commits they describe.
pub fn fsck(repo: &Repo) -> Result<FsckReport> {
    let mut report = FsckReport::default();

    let all_blobs = list_objects(&repo.blobs_path())?;
    let all_trees = list_objects(&repo.trees_path())?;
    let all_commits = list_objects(&repo.commits_path())?;

    for hash in &all_blobs {
        report.objects_checked += 1;
        if let Err(e) = read_blob(repo, hash) {
            report.corrupt(*hash, ObjectType::Blob, e);
        }
    }

    for hash in &all_trees {
        report.objects_checked += 1;
        match read_tree(repo, hash) {
            Ok(tree) => check_tree_children(repo, hash, &tree, &mut report),
            Err(e) => report.corrupt(*hash, ObjectType::Tree, e),
        }
    }

    let mut graph = CommitGraph::new(repo);
    for hash in &all_commits {
        report.objects_checked += 1;
        match read_commit(repo, hash) {
            Ok(commit) => {
                check_commit_refs(repo, hash, &commit, &mut report);
                check_graph_row(&mut graph, hash, &commit, &mut report);
            }
            Err(e) => report.corrupt(*hash, ObjectType::Commit, e),
        }
    }

    let reachable = reachable_objects(repo, &mut report)?;
    report.dangling_objects = all_blobs
        .iter()
        .chain(&all_trees)
        .chain(&all_commits)
        .filter(|h| !reachable.contains(h))
        .copied()
        .collect();

    if report.is_ok() {
        info!(
            objects = report.objects_checked,
            dangling = report.dangling_objects.len(),
            "fsck clean"
        );
    } else {
        warn!(
            corrupt = report.corrupt_objects.len(),
            missing = report.missing_objects.len(),
            graph = report.graph_mismatches.len(),
            "fsck found problems"
        );
    }

    Ok(report)
}

impl FsckReport {
    fn corrupt(&mut self, hash: Hash, object_type: ObjectType, error: Error) {
        self.corrupt_objects.push(CorruptObject {
            hash,
            object_type,
            message: error.to_string(),
        });
    }

    fn missing(&mut self, hash: Hash, object_type: ObjectType, referenced_by: String) {
        self.missing_objects.push(MissingObject {
            hash,
            object_type,
            referenced_by,
        });
    }
}

fn check_tree_children(repo: &Repo, tree_hash: &Hash, tree: &Tree, report: &mut FsckReport) {
    for entry in tree.entries() {
        let (present, object_type) = match entry.kind {
            EntryKind::Blob => (blob_exists(repo, &entry.hash), ObjectType::Blob),
            EntryKind::Tree => (tree_exists(repo, &entry.hash), ObjectType::Tree),
        };
        if !present {
            report.missing(
                entry.hash,
                object_type,
                format!("tree {} entry {}", tree_hash, entry.name),
            );
        }
    }
}

fn check_commit_refs(repo: &Repo, hash: &Hash, commit: &Commit, report: &mut FsckReport) {
    if !tree_exists(repo, &commit.tree) {
        report.missing(commit.tree, ObjectType::Tree, format!("commit {}", hash));
    }
    for parent in &commit.parents {
        if !commit_exists(repo, parent) {
            report.missing(*parent, ObjectType::Commit, format!("commit {}", hash));
        }
    }
}

fn check_graph_row(graph: &mut CommitGraph, hash: &Hash, commit: &Commit, report: &mut FsckReport) {
    // parents that cannot be resolved are already reported as missing
    let Ok(node) = graph.node(hash).cloned() else {
        return;
    };

    let mut expected = 0;
    for parent in &commit.parents {
        match graph.generation(parent) {
            Ok(g) => expected = expected.max(g + 1),
            Err(_) => return,
        }
    }

    if node.parents != commit.parents || node.generation != expected {
        warn!(
            commit = %hash.short(),
            cached = node.generation,
            expected,
            "graph row out of date"
        );
        report.graph_mismatches.push(*hash);
    }
}

/// objects reachable from branch heads; missing heads are reported
fn reachable_objects(repo: &Repo, report: &mut FsckReport) -> Result<HashSet<Hash>> {
    let mut reachable = HashSet::new();
    let mut commits: Vec<Hash> = Vec::new();

    for name in list_branches(repo)? {
        let head = read_branch(repo, &name)?.head;
        if commit_exists(repo, &head) {
            commits.push(head);
        } else {
            report.missing(head, ObjectType::Commit, format!("branch {}", name));
        }
    }

    let mut trees: Vec<Hash> = Vec::new();
    while let Some(hash) = commits.pop() {
        if !reachable.insert(hash) {
            continue;
        }
        if let Ok(commit) = read_commit(repo, &hash) {
            trees.push(commit.tree);
            commits.extend(commit.parents);
        }
    }

    while let Some(hash) = trees.pop() {
        if !reachable.insert(hash) {
            continue;
        }
        if let Ok(tree) = read_tree(repo, &hash) {
            for entry in tree.entries() {
                match entry.kind {
                    EntryKind::Blob => {
                        reachable.insert(entry.hash);
                    }
                    EntryKind::Tree => trees.push(entry.hash),
                }
            }
        }
    }

    Ok(reachable)
}

fn list_objects(dir: &Path) -> Result<Vec<Hash>> {
    let mut hashes = Vec::new();

    if !dir.exists() {
        return Ok(hashes);
    }

    for entry in WalkDir::new(dir).min_depth(2).max_depth(2) {
        let entry = entry.map_err(|e| Error::Io {
            path: dir.to_path_buf(),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walkdir error")),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let parent_name = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or("");

        let hex = format!("{}{}", parent_name, file_name);
        if let Ok(hash) = Hash::from_hex(&hex) {
            hashes.push(hash);
        }
    }

    Ok(hashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{blob_path, create_blob, create_tree};
    use crate::ops::commit_to_branch;
    use crate::refs::create_branch;
    use crate::test_support::{commit_tree, flat_tree, test_repo};
    use crate::types::ObjectMode::Table;
    use std::fs;

    fn populated(repo: &Repo) -> Hash {
        let tree = flat_tree(repo, &[("users", Table, "CREATE TABLE users ()")]);
        let root = commit_tree(repo, tree, vec![], "init");
        create_branch(repo, "main", &root).unwrap();
        let tree2 = flat_tree(
            repo,
            &[
                ("users", Table, "CREATE TABLE users ()"),
                ("orders", Table, "CREATE TABLE orders ()"),
            ],
        );
        commit_to_branch(repo, "main", tree2, "dba", "add orders").unwrap()
    }

    #[test]
    fn test_fsck_healthy_repo() {
        let (_dir, repo) = test_repo();
        populated(&repo);

        let report = fsck(&repo).unwrap();

        assert!(report.is_ok());
        // 2 blobs, 2 trees, 2 commits
        assert_eq!(report.objects_checked, 6);
        assert!(report.dangling_objects.is_empty());
    }

    #[test]
    fn test_fsck_with_dangling() {
        let (_dir, repo) = test_repo();
        populated(&repo);

        let orphan = create_blob(&repo, "CREATE TABLE scratch ()").unwrap();
        let orphan_tree = create_tree(&repo, vec![]).unwrap();

        let report = fsck(&repo).unwrap();
        assert!(report.is_ok());
        assert!(report.dangling_objects.contains(&orphan));
        assert!(report.dangling_objects.contains(&orphan_tree));
    }

    #[test]
    fn test_fsck_detects_corruption() {
        let (_dir, repo) = test_repo();
        populated(&repo);

        let hash = create_blob(&repo, "CREATE TABLE users ()").unwrap();
        let other = crate::object::compress(b"CREATE TABLE evil ()").unwrap();
        fs::write(blob_path(&repo, &hash), other).unwrap();

        let report = fsck(&repo).unwrap();
        assert!(!report.is_ok());
        assert_eq!(report.corrupt_objects.len(), 1);
        assert_eq!(report.corrupt_objects[0].hash, hash);
        assert_eq!(report.corrupt_objects[0].object_type, ObjectType::Blob);
    }

    #[test]
    fn test_fsck_detects_missing_blob() {
        let (_dir, repo) = test_repo();
        populated(&repo);

        let hash = create_blob(&repo, "CREATE TABLE orders ()").unwrap();
        fs::remove_file(blob_path(&repo, &hash)).unwrap();

        let report = fsck(&repo).unwrap();
        assert!(report
            .missing_objects
            .iter()
            .any(|m| m.hash == hash && m.object_type == ObjectType::Blob));
    }
}
