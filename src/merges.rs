//! merge-history table
//!
//! one CBOR file per merge under `merges/<uuid>`. records are rewritten in
//! place as a merge moves through its lifecycle and are never deleted.

use std::fs;
use std::path::PathBuf;

use uuid::Uuid;

use crate::error::{Error, IoResultExt, Result};
use crate::object::{from_cbor, to_cbor, write_atomic};
use crate::repo::{with_lock, Repo};
use crate::types::MergeRecord;

fn merge_path(repo: &Repo, id: &Uuid) -> PathBuf {
    repo.merges_path().join(id.to_string())
}

/// persist a record, replacing any previous version
pub(crate) fn write_merge(repo: &Repo, record: &MergeRecord) -> Result<()> {
    write_atomic(repo, &merge_path(repo, &record.id), &to_cbor(record)?)
}

/// read a merge record
pub fn read_merge(repo: &Repo, id: &Uuid) -> Result<MergeRecord> {
    let path = merge_path(repo, id);
    let bytes = fs::read(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::MergeNotFound(*id)
        } else {
            Error::Io {
                path: path.clone(),
                source: e,
            }
        }
    })?;
    from_cbor(&bytes)
}

/// all merge records, oldest first
pub fn list_merges(repo: &Repo) -> Result<Vec<MergeRecord>> {
    let dir = repo.merges_path();
    let mut records = Vec::new();

    for entry in fs::read_dir(&dir).with_path(&dir)? {
        let entry = entry.with_path(&dir)?;
        let name = entry.file_name();
        // skip anything that is not a record file
        let Ok(id) = Uuid::parse_str(&name.to_string_lossy()) else {
            continue;
        };
        records.push(read_merge(repo, &id)?);
    }

    records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    Ok(records)
}

/// read-modify-write a record under the repository lock
///
/// the record is only written back if `f` succeeds.
pub(crate) fn update_merge<T, F>(repo: &Repo, id: &Uuid, f: F) -> Result<T>
where
    F: FnOnce(&mut MergeRecord) -> Result<T>,
{
    with_lock(repo, || {
        let mut record = read_merge(repo, id)?;
        let out = f(&mut record)?;
        write_merge(repo, &record)?;
        Ok(out)
    })
}
