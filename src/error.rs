use std::path::PathBuf;

use uuid::Uuid;

use crate::types::MergeStatus;
use crate::Hash;

/// error type for schemavc operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --- content ---
    #[error("invalid tree entry name: {0}")]
    InvalidEntryName(String),

    #[error("duplicate tree entry name: {0}")]
    DuplicateEntryName(String),

    #[error("malformed entry {name}: {message}")]
    MalformedEntry { name: String, message: String },

    // --- graph ---
    #[error("unknown tree or parent referenced by commit: {0}")]
    UnknownTreeOrParent(Hash),

    #[error("unrelated histories: {ours} and {theirs} share no ancestor")]
    UnrelatedHistories { ours: Hash, theirs: Hash },

    #[error("cycle detected in commit graph at {0}")]
    CycleDetected(Hash),

    // --- merge ---
    #[error("merge {merge_id} incomplete: {unresolved} conflict(s) unresolved")]
    MergeIncomplete { merge_id: Uuid, unresolved: usize },

    #[error("branch {branch} moved: expected {expected}, found {actual}")]
    ConcurrentModification {
        branch: String,
        expected: Hash,
        actual: Hash,
    },

    #[error("merge not found: {0}")]
    MergeNotFound(Uuid),

    #[error("merge {merge_id} is {status}, operation not allowed")]
    InvalidMergeState { merge_id: Uuid, status: MergeStatus },

    // --- resolution ---
    #[error("conflict {conflict_id} not found in merge {merge_id}")]
    ConflictNotFound { merge_id: Uuid, conflict_id: u32 },

    #[error("conflict {conflict_id} in merge {merge_id} is already resolved")]
    AlreadyResolved { merge_id: Uuid, conflict_id: u32 },

    #[error("invalid resolution: {0}")]
    InvalidResolution(String),

    // --- branches ---
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("branch already exists: {0}")]
    BranchExists(String),

    #[error("invalid branch name: {0}")]
    InvalidBranch(String),

    // --- storage ---
    #[error("repository not found at {0}")]
    NoRepo(PathBuf),

    #[error("repository already exists at {0}")]
    RepoExists(PathBuf),

    #[error("object not found: {0}")]
    ObjectNotFound(Hash),

    #[error("corrupt object: hash mismatch for {0}")]
    CorruptObject(Hash),

    #[error("corrupt object: {0}")]
    CorruptObjectMessage(String),

    #[error("lock contention on repository")]
    LockContention,

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cbor serialization error: {0}")]
    CborEncode(#[from] ciborium::ser::Error<std::io::Error>),

    #[error("cbor deserialization error: {0}")]
    CborDecode(#[from] ciborium::de::Error<std::io::Error>),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("invalid hash hex: {0}")]
    InvalidHashHex(String),
}

/// coarse grouping of errors, matching how callers react to them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// bad tree input; fix the input
    Content,
    /// commit graph could not answer the question
    Graph,
    /// merge could not be completed as requested
    Merge,
    /// a conflict resolution was rejected
    Resolution,
    /// branch table errors
    Branch,
    /// io, encoding, corruption
    Storage,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidEntryName(_)
            | Error::DuplicateEntryName(_)
            | Error::MalformedEntry { .. } => ErrorCategory::Content,
            Error::UnknownTreeOrParent(_)
            | Error::UnrelatedHistories { .. }
            | Error::CycleDetected(_) => ErrorCategory::Graph,
            Error::MergeIncomplete { .. }
            | Error::ConcurrentModification { .. }
            | Error::MergeNotFound(_)
            | Error::InvalidMergeState { .. } => ErrorCategory::Merge,
            Error::ConflictNotFound { .. }
            | Error::AlreadyResolved { .. }
            | Error::InvalidResolution(_) => ErrorCategory::Resolution,
            Error::BranchNotFound(_) | Error::BranchExists(_) | Error::InvalidBranch(_) => {
                ErrorCategory::Branch
            }
            _ => ErrorCategory::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
