//! high-level operations on schema repositories

mod classify;
mod commit;
mod diff;
mod fsck;
mod log;
mod ls_tree;
mod merge;
mod merge_base;
mod rename;

pub use classify::{
    appended_indexes, classify, column_change, is_lossy_conversion, Classifier, ColumnDef,
};
pub use commit::{commit_to_branch, commit_to_branch_with_metadata};
pub use diff::{diff, diff_commits};
pub use fsck::{fsck, CorruptObject, FsckReport, MissingObject, ObjectType};
pub use log::{log, LogEntry};
pub use ls_tree::{ls_tree, ls_tree_recursive, LsTreeEntry};
pub use merge::{
    abort_merge, finalize_merge, resolve_conflict, start_merge, MergeOptions, MergeOutcome,
};
pub use merge_base::{find_merge_base, find_merge_base_detailed, MergeBase};
pub use rename::detect_renames;
