use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};
use crate::hash::{compute_tree_hash, Hash};
use crate::object::{
    blob_exists, compress, decompress, from_cbor, read_object_file, sharded_path, to_cbor,
    write_atomic,
};
use crate::repo::Repo;
use crate::types::{EntryKind, Tree, TreeEntry};

/// validate entries and write them as a tree
///
/// entries are sorted by name before hashing, so insertion order does not
/// affect identity. every entry must point at an object already in the store.
pub fn create_tree(repo: &Repo, entries: Vec<TreeEntry>) -> Result<Hash> {
    let tree = Tree::new(entries)?;

    for entry in tree.entries() {
        let present = match entry.kind {
            EntryKind::Blob => blob_exists(repo, &entry.hash),
            EntryKind::Tree => tree_exists(repo, &entry.hash),
        };
        if !present {
            return Err(Error::MalformedEntry {
                name: entry.name.clone(),
                message: format!("references missing {} {}", entry.kind.type_name(), entry.hash),
            });
        }
    }

    write_tree(repo, &tree)
}

/// write an already-validated tree to the object store
///
/// trees are serialized as CBOR and hashed before zstd compression, so
/// identity does not depend on the compressor.
pub fn write_tree(repo: &Repo, tree: &Tree) -> Result<Hash> {
    let cbor_bytes = to_cbor(tree)?;
    let hash = compute_tree_hash(&cbor_bytes);

    let path = tree_path(repo, &hash);
    if path.exists() {
        return Ok(hash);
    }

    write_atomic(repo, &path, &compress(&cbor_bytes)?)?;
    debug!(tree = %hash.short(), entries = tree.len(), "stored tree");

    Ok(hash)
}

/// read a tree from the object store
pub fn read_tree(repo: &Repo, hash: &Hash) -> Result<Tree> {
    let path = tree_path(repo, hash);
    let compressed = read_object_file(&path, hash)?;
    let cbor_bytes = decompress(&compressed, &path)?;

    if compute_tree_hash(&cbor_bytes) != *hash {
        return Err(Error::CorruptObject(*hash));
    }

    from_cbor(&cbor_bytes)
}

/// get the filesystem path to a tree object
pub fn tree_path(repo: &Repo, hash: &Hash) -> PathBuf {
    sharded_path(repo.trees_path(), hash)
}

/// check if a tree exists in the object store
pub fn tree_exists(repo: &Repo, hash: &Hash) -> bool {
    tree_path(repo, hash).exists()
}
