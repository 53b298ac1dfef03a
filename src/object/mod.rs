pub mod blob;
pub mod commit;
pub mod tree;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, IoResultExt, Result};
use crate::hash::Hash;
use crate::repo::Repo;

pub use blob::{blob_exists, blob_path, create_blob, read_blob};
pub use commit::{commit_exists, commit_path, create_commit, read_commit, store_commit};
pub use tree::{create_tree, read_tree, tree_exists, tree_path, write_tree};

/// zstd level for stored payloads (fast, reasonable ratio)
const ZSTD_LEVEL: i32 = 3;

/// encode a value as CBOR; struct fields and BTreeMaps keep this canonical
pub(crate) fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)?;
    Ok(bytes)
}

pub(crate) fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(ciborium::from_reader(bytes)?)
}

pub(crate) fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(bytes, ZSTD_LEVEL).with_path("<zstd>")
}

pub(crate) fn decompress(bytes: &[u8], path: &Path) -> Result<Vec<u8>> {
    zstd::decode_all(bytes).with_path(path)
}

/// object file location: <root>/xx/<remaining hex>
pub(crate) fn sharded_path(root: PathBuf, hash: &Hash) -> PathBuf {
    let (dir, file) = hash.to_path_components();
    root.join(dir).join(file)
}

/// read an object file, mapping a missing file to ObjectNotFound
pub(crate) fn read_object_file(path: &Path, hash: &Hash) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::ObjectNotFound(*hash)
        } else {
            Error::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

/// atomic write: temp -> fsync -> rename -> fsync parent
///
/// concurrent writers of the same content-addressed path race harmlessly,
/// the last rename wins with identical bytes.
pub(crate) fn write_atomic(repo: &Repo, path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::CorruptObjectMessage(format!("no parent for {}", path.display())))?;
    fs::create_dir_all(parent).with_path(parent)?;

    let tmp_path = repo.tmp_path().join(uuid::Uuid::new_v4().to_string());
    {
        let mut tmp_file = File::create(&tmp_path).with_path(&tmp_path)?;
        tmp_file.write_all(bytes).with_path(&tmp_path)?;
        tmp_file.sync_all().with_path(&tmp_path)?;
    }

    fs::rename(&tmp_path, path).with_path(path)?;

    let dir = File::open(parent).with_path(parent)?;
    dir.sync_all().with_path(parent)?;

    Ok(())
}
