//! branch table
//!
//! a branch is a single row `refs/heads/<name>` holding `<head hex> <version>`.
//! rows only move through [`update_branch`], a compare-and-swap on the head
//! performed under the repository lock; the version counts successful moves.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, IoResultExt, Result};
use crate::hash::Hash;
use crate::object::{commit_exists, write_atomic};
use crate::repo::{with_lock, Repo};

/// a named, movable pointer to a commit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub head: Hash,
    /// incremented on every successful update
    pub version: u64,
}

/// create a branch pointing at an existing commit
pub fn create_branch(repo: &Repo, name: &str, head: &Hash) -> Result<Branch> {
    validate_branch_name(name)?;
    if !commit_exists(repo, head) {
        return Err(Error::ObjectNotFound(*head));
    }

    let branch = with_lock(repo, || {
        if branch_exists(repo, name) {
            return Err(Error::BranchExists(name.to_string()));
        }
        let branch = Branch {
            name: name.to_string(),
            head: *head,
            version: 1,
        };
        write_row(repo, &branch)?;
        Ok(branch)
    })?;

    info!(branch = name, head = %head.short(), "created branch");
    Ok(branch)
}

/// read a branch row
pub fn read_branch(repo: &Repo, name: &str) -> Result<Branch> {
    validate_branch_name(name)?;
    let path = branch_path(repo, name);

    let content = fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::BranchNotFound(name.to_string())
        } else {
            Error::Io {
                path: path.clone(),
                source: e,
            }
        }
    })?;

    parse_row(name, &content)
}

/// move a branch from `expected` to `new`
///
/// fails with ConcurrentModification if the branch no longer points at
/// `expected`; the caller has to recompute against the new head.
pub fn update_branch(repo: &Repo, name: &str, expected: &Hash, new: &Hash) -> Result<Branch> {
    with_lock(repo, || swap_head(repo, name, expected, new))
}

/// compare-and-swap of a branch head; the caller holds the repository lock
pub(crate) fn swap_head(repo: &Repo, name: &str, expected: &Hash, new: &Hash) -> Result<Branch> {
    if !commit_exists(repo, new) {
        return Err(Error::ObjectNotFound(*new));
    }

    let current = read_branch(repo, name)?;
    if current.head != *expected {
        warn!(
            branch = name,
            expected = %expected.short(),
            actual = %current.head.short(),
            "branch moved since it was read"
        );
        return Err(Error::ConcurrentModification {
            branch: name.to_string(),
            expected: *expected,
            actual: current.head,
        });
    }

    let branch = Branch {
        name: name.to_string(),
        head: *new,
        version: current.version + 1,
    };
    write_row(repo, &branch)?;

    info!(
        branch = name,
        from = %expected.short(),
        to = %new.short(),
        version = branch.version,
        "advanced branch"
    );
    Ok(branch)
}

/// check if a branch exists
pub fn branch_exists(repo: &Repo, name: &str) -> bool {
    branch_path(repo, name).is_file()
}

/// resolve a branch name or a 64-char hex hash to a commit hash
pub fn resolve_commit(repo: &Repo, branch_or_hash: &str) -> Result<Hash> {
    if branch_or_hash.len() == 64 && branch_or_hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return Hash::from_hex(branch_or_hash);
    }
    Ok(read_branch(repo, branch_or_hash)?.head)
}

/// list all branch names, sorted
pub fn list_branches(repo: &Repo) -> Result<Vec<String>> {
    let refs_dir = repo.refs_path();
    let mut names = Vec::new();

    if refs_dir.exists() {
        collect_branches(&refs_dir, &refs_dir, &mut names)?;
    }

    names.sort();
    Ok(names)
}

/// list branch names matching a glob pattern
pub fn list_branches_matching(repo: &Repo, pattern: &str) -> Result<Vec<String>> {
    let glob = glob::Pattern::new(pattern).map_err(|e| Error::InvalidBranch(e.to_string()))?;
    Ok(list_branches(repo)?
        .into_iter()
        .filter(|name| glob.matches(name))
        .collect())
}

fn branch_path(repo: &Repo, name: &str) -> PathBuf {
    repo.refs_path().join(name)
}

fn write_row(repo: &Repo, branch: &Branch) -> Result<()> {
    let row = format!("{} {}\n", branch.head.to_hex(), branch.version);
    write_atomic(repo, &branch_path(repo, &branch.name), row.as_bytes())
}

fn parse_row(name: &str, content: &str) -> Result<Branch> {
    let corrupt = || Error::CorruptObjectMessage(format!("malformed branch row for {}", name));

    let mut fields = content.split_whitespace();
    let head = Hash::from_hex(fields.next().ok_or_else(corrupt)?)?;
    let version = fields
        .next()
        .ok_or_else(corrupt)?
        .parse::<u64>()
        .map_err(|_| corrupt())?;

    Ok(Branch {
        name: name.to_string(),
        head,
        version,
    })
}

/// recursively collect branch names from directory
fn collect_branches(base: &Path, dir: &Path, names: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir).with_path(dir)? {
        let entry = entry.with_path(dir)?;
        let path = entry.path();

        if path.is_dir() {
            collect_branches(base, &path, names)?;
        } else if path.is_file() {
            if let Ok(rel) = path.strip_prefix(base) {
                names.push(rel.to_string_lossy().to_string());
            }
        }
    }
    Ok(())
}

/// validate branch name
fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidBranch("empty branch name".to_string()));
    }

    if name.starts_with('/') || name.ends_with('/') {
        return Err(Error::InvalidBranch(format!(
            "branch name cannot start or end with '/': {}",
            name
        )));
    }

    if name.contains("//") {
        return Err(Error::InvalidBranch(format!(
            "branch name cannot contain '//': {}",
            name
        )));
    }

    if name.contains('\0') || name.chars().any(char::is_whitespace) {
        return Err(Error::InvalidBranch(format!(
            "branch name cannot contain whitespace or null bytes: {:?}",
            name
        )));
    }

    // check for path traversal
    for component in name.split('/') {
        if component == "." || component == ".." {
            return Err(Error::InvalidBranch(format!(
                "branch name cannot contain '.' or '..': {}",
                name
            )));
        }
    }

    Ok(())
}
