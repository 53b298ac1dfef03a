//! merge lifecycle
//!
//! a merge record starts INITIATED and moves to COMPLETED when nothing needs
//! a decision, otherwise to AWAITING_RESOLUTION until it is finalized or
//! aborted. the ours branch is only touched when a merge completes, and
//! only through a compare-and-swap against the head the merge was computed
//! from.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::graph::CommitGraph;
use crate::hash::Hash;
use crate::merges::{read_merge, update_merge, write_merge};
use crate::object::{create_blob, create_commit, create_tree, read_blob, read_commit, read_tree};
use crate::ops::classify::{entry_mode, Classifier};
use crate::ops::diff::{classify_change, descends, diff_commits, load_subtree};
use crate::ops::merge_base::find_merge_base;
use crate::ops::rename::detect_renames;
use crate::refs::{read_branch, swap_head};
use crate::repo::{with_lock, Repo};
use crate::types::{
    unix_now, ChosenResolution, ConflictKind, ConflictRecord, DiffEntry, MergeRecord, MergeStatus,
    ObjectMode, RenameHint, Resolution, Tree, TreeEntry,
};

/// options for starting a merge
#[derive(Clone, Debug)]
pub struct MergeOptions {
    pub author: String,
    /// commit message; defaults to "merge <theirs> into <ours>"
    pub message: Option<String>,
    /// apply rule suggestions right away; None uses the repository policy
    pub auto_resolve: Option<bool>,
    /// move ours straight to theirs when ours has nothing of its own
    pub fast_forward: bool,
}

impl MergeOptions {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            message: None,
            auto_resolve: None,
            fast_forward: false,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_auto_resolve(mut self, auto_resolve: bool) -> Self {
        self.auto_resolve = Some(auto_resolve);
        self
    }

    pub fn with_fast_forward(mut self, fast_forward: bool) -> Self {
        self.fast_forward = fast_forward;
        self
    }
}

/// structured result of [`start_merge`]
#[derive(Clone, Debug, PartialEq)]
pub struct MergeOutcome {
    pub merge_id: Uuid,
    pub status: MergeStatus,
    /// resulting ours head once COMPLETED
    pub result: Option<Hash>,
    pub conflicts: Vec<ConflictRecord>,
    pub renames: Vec<RenameHint>,
}

impl From<MergeRecord> for MergeOutcome {
    fn from(record: MergeRecord) -> Self {
        Self {
            merge_id: record.id,
            status: record.status,
            result: record.result,
            conflicts: record.conflicts,
            renames: record.renames,
        }
    }
}

/// merge `theirs_branch` into `ours_branch`
///
/// finding conflicts is not an error: the outcome is AWAITING_RESOLUTION and
/// lists them. an error is returned when the merge cannot be computed, in
/// which case nothing is recorded, or when a merge that needed no decisions
/// could not be completed, for example because the ours branch moved (the
/// record is then ABORTED).
pub fn start_merge(
    repo: &Repo,
    ours_branch: &str,
    theirs_branch: &str,
    options: &MergeOptions,
) -> Result<MergeOutcome> {
    let ours = read_branch(repo, ours_branch)?.head;
    let theirs = read_branch(repo, theirs_branch)?.head;

    let now = unix_now();
    let mut record = MergeRecord {
        id: Uuid::new_v4(),
        ours_branch: ours_branch.to_string(),
        theirs_branch: theirs_branch.to_string(),
        base: theirs,
        ours,
        theirs,
        status: MergeStatus::Initiated,
        result: None,
        author: options.author.clone(),
        message: options
            .message
            .clone()
            .unwrap_or_else(|| format!("merge {} into {}", theirs_branch, ours_branch)),
        created_at: now,
        updated_at: now,
        conflicts: Vec::new(),
        renames: Vec::new(),
    };

    if CommitGraph::new(repo).is_ancestor(&theirs, &ours)? {
        record.status = MergeStatus::Completed;
        record.result = Some(ours);
        write_merge(repo, &record)?;
        info!(
            merge_id = %record.id,
            ours = ours_branch,
            theirs = theirs_branch,
            "already up to date"
        );
        return Ok(record.into());
    }

    let base = find_merge_base(repo, &ours, &theirs)?;
    record.base = base;

    let fast_forward = base == ours && options.fast_forward;
    let entries = if fast_forward {
        Vec::new()
    } else {
        let entries = diff_commits(repo, &base, &ours, &theirs)?;
        classify_conflicts(repo, options, &entries, &mut record)?;
        entries
    };

    // nothing is recorded for a merge that could not be computed
    write_merge(repo, &record)?;
    info!(
        merge_id = %record.id,
        ours = ours_branch,
        theirs = theirs_branch,
        base = %base.short(),
        "merge initiated"
    );
    for hint in &record.renames {
        info!(merge_id = %record.id, %hint, "semantic conflict hint");
    }

    if fast_forward {
        return complete(repo, &record.id, Ok(theirs));
    }

    if record.unresolved_count() == 0 {
        let commit = assemble(repo, &record, &entries);
        return complete(repo, &record.id, commit);
    }

    let record = update_merge(repo, &record.id, |record| {
        expect_status(record, MergeStatus::Initiated)?;
        record.status = MergeStatus::AwaitingResolution;
        record.updated_at = unix_now();
        Ok(record.clone())
    })?;
    info!(
        merge_id = %record.id,
        conflicts = record.conflicts.len(),
        unresolved = record.unresolved_count(),
        "merge awaiting resolution"
    );

    Ok(record.into())
}

/// classify every conflicting entry, apply suggestions when auto-resolving,
/// and collect rename hints
fn classify_conflicts(
    repo: &Repo,
    options: &MergeOptions,
    entries: &[DiffEntry],
    record: &mut MergeRecord,
) -> Result<()> {
    let policy = &repo.config().merge;
    let auto_resolve = options.auto_resolve.unwrap_or(policy.auto_resolve);
    let classifier = Classifier::new(repo);
    let now = unix_now();

    for (entry, id) in entries.iter().filter(|e| e.is_conflict()).zip(1u32..) {
        let classification = classifier.classify(entry)?;
        let mut conflict = ConflictRecord {
            id,
            path: entry.path.clone(),
            mode: entry_mode(entry),
            change: entry.change,
            base: entry.base.as_ref().map(|e| e.hash),
            ours: entry.ours.as_ref().map(|e| e.hash),
            theirs: entry.theirs.as_ref().map(|e| e.hash),
            kind: classification.kind,
            severity: classification.severity,
            suggestion: classification.suggestion,
            resolution: None,
            resolved_at: None,
            auto_resolved: false,
        };

        if let (true, Some(side)) = (auto_resolve, conflict.suggestion) {
            let resolution = match &conflict.kind {
                ConflictKind::IndexAdded { ours, theirs } if classifier.combines(&conflict.kind) => {
                    union_resolution(repo, entry, ours, theirs)?
                }
                _ => side.into(),
            };
            conflict.resolution = Some(resolution);
            conflict.resolved_at = Some(now);
            conflict.auto_resolved = true;
            debug!(
                merge_id = %record.id,
                conflict = id,
                path = %conflict.path,
                %side,
                "auto-resolved conflict"
            );
        }

        record.conflicts.push(conflict);
    }

    record.renames = detect_renames(repo, entries, policy.rename_similarity)?;
    Ok(())
}

/// record a decision for one conflict of an AWAITING_RESOLUTION merge
pub fn resolve_conflict(
    repo: &Repo,
    merge_id: &Uuid,
    conflict_id: u32,
    resolution: Resolution,
) -> Result<ConflictRecord> {
    // fail before storing custom content
    let record = read_merge(repo, merge_id)?;
    check_resolvable(&record, conflict_id)?;

    let chosen = match resolution {
        Resolution::Ours => ChosenResolution::Ours,
        Resolution::Theirs => ChosenResolution::Theirs,
        Resolution::Custom(text) => {
            let mode_only = record
                .conflict(conflict_id)
                .is_some_and(|c| matches!(c.kind, ConflictKind::ModeChanged { .. }));
            if mode_only {
                return Err(Error::InvalidResolution(
                    "a mode conflict takes one side's mode".to_string(),
                ));
            }
            if text.trim().is_empty() {
                return Err(Error::InvalidResolution(
                    "custom resolution has no content".to_string(),
                ));
            }
            ChosenResolution::Custom {
                blob: create_blob(repo, &text)?,
            }
        }
    };

    let conflict = update_merge(repo, merge_id, |record| {
        check_resolvable(record, conflict_id)?;

        let now = unix_now();
        record.updated_at = now;
        let conflict = record
            .conflict_mut(conflict_id)
            .ok_or(Error::ConflictNotFound {
                merge_id: *merge_id,
                conflict_id,
            })?;
        conflict.resolution = Some(chosen);
        conflict.resolved_at = Some(now);
        Ok(conflict.clone())
    })?;

    info!(
        merge_id = %merge_id,
        conflict = conflict_id,
        path = %conflict.path,
        resolution = ?conflict.resolution,
        "resolved conflict"
    );

    Ok(conflict)
}

/// write the merge commit and advance the ours branch
///
/// rejects the merge with MergeIncomplete while any conflict is unresolved.
/// if the ours branch moved since the merge started, ConcurrentModification
/// is returned and the record stays AWAITING_RESOLUTION.
pub fn finalize_merge(repo: &Repo, merge_id: &Uuid) -> Result<Hash> {
    let record = read_merge(repo, merge_id)?;
    expect_status(&record, MergeStatus::AwaitingResolution)?;

    let unresolved = record.unresolved_count();
    if unresolved > 0 {
        warn!(merge_id = %merge_id, unresolved, "refusing to finalize incomplete merge");
        return Err(Error::MergeIncomplete {
            merge_id: *merge_id,
            unresolved,
        });
    }

    let entries = diff_commits(repo, &record.base, &record.ours, &record.theirs)?;
    let commit = assemble(repo, &record, &entries)?;

    // status, branch and record move together under one lock; an abort
    // that landed meanwhile wins
    update_merge(repo, merge_id, |record| {
        expect_status(record, MergeStatus::AwaitingResolution)?;
        swap_head(repo, &record.ours_branch, &record.ours, &commit)?;
        record.status = MergeStatus::Completed;
        record.result = Some(commit);
        record.updated_at = unix_now();
        Ok(())
    })?;

    info!(merge_id = %merge_id, commit = %commit.short(), "merge completed");
    Ok(commit)
}

/// cancel an unfinished merge; branches are untouched
pub fn abort_merge(repo: &Repo, merge_id: &Uuid) -> Result<()> {
    update_merge(repo, merge_id, |record| match record.status {
        MergeStatus::Initiated | MergeStatus::AwaitingResolution => {
            record.status = MergeStatus::Aborted;
            record.updated_at = unix_now();
            Ok(())
        }
        status => Err(Error::InvalidMergeState {
            merge_id: record.id,
            status,
        }),
    })?;

    info!(merge_id = %merge_id, "merge aborted");
    Ok(())
}

fn expect_status(record: &MergeRecord, status: MergeStatus) -> Result<()> {
    if record.status != status {
        return Err(Error::InvalidMergeState {
            merge_id: record.id,
            status: record.status,
        });
    }
    Ok(())
}

fn check_resolvable(record: &MergeRecord, conflict_id: u32) -> Result<()> {
    expect_status(record, MergeStatus::AwaitingResolution)?;

    let conflict = record.conflict(conflict_id).ok_or(Error::ConflictNotFound {
        merge_id: record.id,
        conflict_id,
    })?;
    if conflict.is_resolved() {
        return Err(Error::AlreadyResolved {
            merge_id: record.id,
            conflict_id,
        });
    }

    Ok(())
}

/// advance the ours branch to `result` and close an INITIATED record
///
/// any failure, including a failure to compute `result`, leaves the record
/// ABORTED.
fn complete(repo: &Repo, merge_id: &Uuid, result: Result<Hash>) -> Result<MergeOutcome> {
    with_lock(repo, || {
        let mut record = read_merge(repo, merge_id)?;
        expect_status(&record, MergeStatus::Initiated)?;

        let advanced = result.and_then(|commit| {
            swap_head(repo, &record.ours_branch, &record.ours, &commit).map(|_| commit)
        });
        record.updated_at = unix_now();

        match advanced {
            Ok(commit) => {
                record.status = MergeStatus::Completed;
                record.result = Some(commit);
                write_merge(repo, &record)?;
                info!(merge_id = %record.id, commit = %commit.short(), "merge completed");
                Ok(record.into())
            }
            Err(e) => {
                record.status = MergeStatus::Aborted;
                write_merge(repo, &record)?;
                warn!(merge_id = %record.id, error = %e, "merge could not complete, aborted");
                Err(e)
            }
        }
    })
}

/// independent index additions of both sides on top of the base lines
fn union_resolution(
    repo: &Repo,
    entry: &DiffEntry,
    ours: &[String],
    theirs: &[String],
) -> Result<ChosenResolution> {
    let mut lines: Vec<String> = match &entry.base {
        Some(base) => read_blob(repo, &base.hash)?
            .lines()
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };
    lines.extend(ours.iter().cloned());
    lines.extend(theirs.iter().cloned());

    Ok(ChosenResolution::Custom {
        blob: create_blob(repo, &lines.join("\n"))?,
    })
}

/// build the merged tree and the two-parent merge commit
fn assemble(repo: &Repo, record: &MergeRecord, entries: &[DiffEntry]) -> Result<Hash> {
    let mut resolved: HashMap<&str, Option<TreeEntry>> = HashMap::new();

    for entry in entries {
        let chosen = if entry.is_conflict() {
            let conflict = record
                .conflicts
                .iter()
                .find(|c| c.path == entry.path)
                .ok_or_else(|| Error::MalformedEntry {
                    name: entry.path.clone(),
                    message: "conflict missing from merge record".to_string(),
                })?;
            match &conflict.resolution {
                None => {
                    return Err(Error::MergeIncomplete {
                        merge_id: record.id,
                        unresolved: record.unresolved_count(),
                    })
                }
                Some(ChosenResolution::Ours) => entry.ours.clone(),
                Some(ChosenResolution::Theirs) => entry.theirs.clone(),
                Some(ChosenResolution::Custom { blob }) => {
                    Some(TreeEntry::blob(entry.name(), conflict.mode, *blob))
                }
            }
        } else {
            entry.implicit_entry().cloned()
        };
        resolved.insert(entry.path.as_str(), chosen);
    }

    let base = read_tree(repo, &read_commit(repo, &record.base)?.tree)?;
    let ours = read_tree(repo, &read_commit(repo, &record.ours)?.tree)?;
    let theirs = read_tree(repo, &read_commit(repo, &record.theirs)?.tree)?;

    let merged = merge_level(repo, Some(&base), Some(&ours), Some(&theirs), "", &resolved)?;
    let tree = create_tree(repo, merged)?;
    let commit = create_commit(
        repo,
        tree,
        vec![record.ours, record.theirs],
        &record.author,
        &record.message,
    )?;

    debug!(
        merge_id = %record.id,
        tree = %tree.short(),
        commit = %commit.short(),
        "assembled merge commit"
    );

    Ok(commit)
}

/// merged entries for one tree level, walking the same way the differ does
fn merge_level(
    repo: &Repo,
    base: Option<&Tree>,
    ours: Option<&Tree>,
    theirs: Option<&Tree>,
    prefix: &str,
    resolved: &HashMap<&str, Option<TreeEntry>>,
) -> Result<Vec<TreeEntry>> {
    let names: BTreeSet<&str> = [base, ours, theirs]
        .into_iter()
        .flatten()
        .flat_map(|t| t.entries().iter().map(|e| e.name.as_str()))
        .collect();

    let mut merged = Vec::new();
    for name in names {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        };

        let b = base.and_then(|t| t.get(name));
        let o = ours.and_then(|t| t.get(name));
        let t = theirs.and_then(|t| t.get(name));

        let Some(change) = classify_change(b, o, t) else {
            merged.extend(o.cloned());
            continue;
        };

        let all_trees = [b, o, t].into_iter().flatten().all(|e| e.is_tree());
        if descends(change) && all_trees {
            // a decision on the subtree itself: removal or one side kept whole
            // where the other dropped it, otherwise the mode to keep
            let mode = match resolved.get(path.as_str()) {
                Some(None) => continue,
                Some(Some(e)) if o.is_none() || t.is_none() || !e.is_tree() => {
                    merged.push(e.clone());
                    continue;
                }
                Some(Some(e)) => e.mode,
                None => [o, t, b]
                    .into_iter()
                    .flatten()
                    .next()
                    .map(|e| e.mode)
                    .unwrap_or(ObjectMode::Other),
            };

            let children = merge_level(
                repo,
                load_subtree(repo, b)?.as_ref(),
                load_subtree(repo, o)?.as_ref(),
                load_subtree(repo, t)?.as_ref(),
                &path,
                resolved,
            )?;
            // a side removed the object and nothing survived the merge
            if children.is_empty() && (o.is_none() || t.is_none()) {
                continue;
            }
            let hash = create_tree(repo, children)?;
            merged.push(TreeEntry::tree(name, mode, hash));
            continue;
        }

        let entry = resolved
            .get(path.as_str())
            .ok_or_else(|| Error::MalformedEntry {
                name: path.clone(),
                message: "no resolution for changed entry".to_string(),
            })?;
        merged.extend(entry.clone());
    }

    Ok(merged)
}
