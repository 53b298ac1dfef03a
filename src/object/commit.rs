use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::graph::CommitGraph;
use crate::hash::{compute_commit_hash, Hash};
use crate::object::{
    compress, decompress, from_cbor, read_object_file, sharded_path, to_cbor, tree_exists,
    write_atomic,
};
use crate::repo::Repo;
use crate::types::Commit;

/// create a commit stamped with the current time
pub fn create_commit(
    repo: &Repo,
    tree: Hash,
    parents: Vec<Hash>,
    author: &str,
    message: &str,
) -> Result<Hash> {
    store_commit(repo, &Commit::new(tree, parents, author, message))
}

/// validate and store a fully-specified commit
///
/// the tree and every parent must already be stored; nothing is written
/// otherwise. the commit's generation is recorded in the commit graph.
pub fn store_commit(repo: &Repo, commit: &Commit) -> Result<Hash> {
    if !tree_exists(repo, &commit.tree) {
        return Err(Error::UnknownTreeOrParent(commit.tree));
    }
    for parent in &commit.parents {
        if !commit_exists(repo, parent) {
            return Err(Error::UnknownTreeOrParent(*parent));
        }
    }

    let hash = write_commit(repo, commit)?;
    let generation = CommitGraph::new(repo).record(&hash, commit)?;

    info!(
        commit = %hash.short(),
        tree = %commit.tree.short(),
        parents = commit.parents.len(),
        generation,
        "created commit"
    );

    Ok(hash)
}

/// serialize as CBOR, hash the canonical bytes, store zstd compressed
fn write_commit(repo: &Repo, commit: &Commit) -> Result<Hash> {
    let cbor_bytes = to_cbor(commit)?;
    let hash = compute_commit_hash(&cbor_bytes);

    let path = commit_path(repo, &hash);
    if path.exists() {
        debug!(commit = %hash.short(), "commit already stored");
        return Ok(hash);
    }

    write_atomic(repo, &path, &compress(&cbor_bytes)?)?;
    Ok(hash)
}

/// read a commit from the object store
pub fn read_commit(repo: &Repo, hash: &Hash) -> Result<Commit> {
    let path = commit_path(repo, hash);
    let compressed = read_object_file(&path, hash)?;
    let cbor_bytes = decompress(&compressed, &path)?;

    if compute_commit_hash(&cbor_bytes) != *hash {
        return Err(Error::CorruptObject(*hash));
    }

    from_cbor(&cbor_bytes)
}

/// get the filesystem path to a commit object
pub fn commit_path(repo: &Repo, hash: &Hash) -> PathBuf {
    sharded_path(repo.commits_path(), hash)
}

/// check if a commit exists in the object store
pub fn commit_exists(repo: &Repo, hash: &Hash) -> bool {
    commit_path(repo, hash).exists()
}
