mod commit;
mod conflict;
mod diff;
mod merge;
mod tree;

pub use commit::Commit;
pub(crate) use commit::unix_now;
pub use conflict::{Classification, ColumnChange, ConflictKind, RenameHint, RuleKey, Severity};
pub use diff::{ChangeKind, DiffEntry, Side};
pub use merge::{ChosenResolution, ConflictRecord, MergeRecord, MergeStatus, Resolution};
pub use tree::{EntryKind, ObjectMode, Tree, TreeEntry};
