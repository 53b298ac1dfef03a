use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};
use crate::hash::{compute_blob_hash, normalize_definition, Hash};
use crate::object::{compress, decompress, read_object_file, sharded_path, write_atomic};
use crate::repo::Repo;

/// write an object definition to the store
///
/// the definition is normalized first, the hash is computed over the
/// normalized text. writing content that already exists is a no-op.
pub fn create_blob(repo: &Repo, content: &str) -> Result<Hash> {
    let normalized = normalize_definition(content);
    let hash = compute_blob_hash(&normalized);

    let path = blob_path(repo, &hash);
    if path.exists() {
        return Ok(hash);
    }

    let compressed = compress(normalized.as_bytes())?;
    write_atomic(repo, &path, &compressed)?;
    debug!(blob = %hash.short(), bytes = normalized.len(), "stored blob");

    Ok(hash)
}

/// read a normalized definition back, verifying its identity
pub fn read_blob(repo: &Repo, hash: &Hash) -> Result<String> {
    let path = blob_path(repo, hash);
    let compressed = read_object_file(&path, hash)?;
    let raw = decompress(&compressed, &path)?;

    let text = String::from_utf8(raw)
        .map_err(|_| Error::CorruptObjectMessage(format!("blob {} is not utf-8", hash)))?;

    if compute_blob_hash(&text) != *hash {
        return Err(Error::CorruptObject(*hash));
    }

    Ok(text)
}

/// get the filesystem path to a blob
pub fn blob_path(repo: &Repo, hash: &Hash) -> PathBuf {
    sharded_path(repo.blobs_path(), hash)
}

/// check if a blob exists in the object store
pub fn blob_exists(repo: &Repo, hash: &Hash) -> bool {
    blob_path(repo, hash).exists()
}
