use crate::error::Result;
use crate::hash::Hash;
use crate::object::store_commit;
use crate::refs::{read_branch, update_branch};
use crate::repo::Repo;
use crate::types::Commit;

/// commit a tree on top of a branch head and advance the branch
///
/// fails with ConcurrentModification if the branch moved between reading the
/// head and advancing it; the stored commit is then simply unreferenced.
pub fn commit_to_branch(
    repo: &Repo,
    branch: &str,
    tree: Hash,
    author: &str,
    message: &str,
) -> Result<Hash> {
    commit_to_branch_with_metadata(repo, branch, tree, author, message, &[])
}

/// commit to a branch with custom metadata
pub fn commit_to_branch_with_metadata(
    repo: &Repo,
    branch: &str,
    tree: Hash,
    author: &str,
    message: &str,
    metadata: &[(&str, &str)],
) -> Result<Hash> {
    let head = read_branch(repo, branch)?.head;

    let mut commit = Commit::new(tree, vec![head], author, message);
    for (key, value) in metadata {
        commit = commit.with_metadata(*key, *value);
    }

    let commit_hash = store_commit(repo, &commit)?;
    update_branch(repo, branch, &head, &commit_hash)?;

    Ok(commit_hash)
}
