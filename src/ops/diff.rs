use std::collections::BTreeSet;

use tracing::debug;

use crate::error::Result;
use crate::hash::Hash;
use crate::object::{read_commit, read_tree};
use crate::repo::Repo;
use crate::types::{ChangeKind, DiffEntry, Tree, TreeEntry};

/// three-way diff of three tree hashes
///
/// every object name present in any tree is classified; unchanged names
/// produce no entry. results are sorted by path.
pub fn diff(repo: &Repo, base: &Hash, ours: &Hash, theirs: &Hash) -> Result<Vec<DiffEntry>> {
    let mut changes = Vec::new();

    if !(ours == base && theirs == base) {
        let base_tree = read_tree(repo, base)?;
        let ours_tree = read_tree(repo, ours)?;
        let theirs_tree = read_tree(repo, theirs)?;
        diff_level(
            repo,
            Some(&base_tree),
            Some(&ours_tree),
            Some(&theirs_tree),
            "",
            &mut changes,
        )?;
    }

    changes.sort_by(|a, b| a.path.cmp(&b.path));

    debug!(
        entries = changes.len(),
        conflicts = changes.iter().filter(|c| c.is_conflict()).count(),
        "three-way diff"
    );

    Ok(changes)
}

/// three-way diff of the trees of three commits
pub fn diff_commits(
    repo: &Repo,
    base: &Hash,
    ours: &Hash,
    theirs: &Hash,
) -> Result<Vec<DiffEntry>> {
    let base_tree = read_commit(repo, base)?.tree;
    let ours_tree = read_commit(repo, ours)?.tree;
    let theirs_tree = read_commit(repo, theirs)?.tree;
    diff(repo, &base_tree, &ours_tree, &theirs_tree)
}

/// compare one level of three (possibly absent) trees
fn diff_level(
    repo: &Repo,
    base: Option<&Tree>,
    ours: Option<&Tree>,
    theirs: Option<&Tree>,
    prefix: &str,
    changes: &mut Vec<DiffEntry>,
) -> Result<()> {
    let names: BTreeSet<&str> = [base, ours, theirs]
        .into_iter()
        .flatten()
        .flat_map(|t| t.entries().iter().map(|e| e.name.as_str()))
        .collect();

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
            continue;
        };

        let present: Vec<&TreeEntry> = [b, o, t].into_iter().flatten().collect();

        // structured objects changed in place are compared per child
        if descends(change) && present.iter().all(|e| e.is_tree()) {
            // the subtree itself is reported only for its mode
            if let Some(mode_change) = mode_change(b, o, t) {
                changes.push(entry(path.clone(), b, o, t, mode_change));
            }
            let b_tree = load_subtree(repo, b)?;
            let o_tree = load_subtree(repo, o)?;
            let t_tree = load_subtree(repo, t)?;
            diff_level(
                repo,
                b_tree.as_ref(),
                o_tree.as_ref(),
                t_tree.as_ref(),
                &path,
                changes,
            )?;
            continue;
        }

        if change.is_conflict() && present.iter().any(|e| e.is_tree()) {
            changes.push(entry(path, b, o, t, ChangeKind::KindMismatch));
            continue;
        }

        changes.push(entry(path, b, o, t, change));
    }

    Ok(())
}

/// changes whose trees are diffed child by child; whole-tree additions,
/// removals and identical changes stay a single entry
pub(crate) fn descends(change: ChangeKind) -> bool {
    matches!(
        change,
        ChangeKind::ModifiedOursOnly
            | ChangeKind::ModifiedTheirsOnly
            | ChangeKind::AddedBothDifferent
            | ChangeKind::ModifiedBothDifferent
            | ChangeKind::ModifiedVsRemoved
            | ChangeKind::RemovedVsModified
    )
}

/// the classification table applied to the modes of a subtree that exists
/// on at least two sides; None when no side changed the mode
pub(crate) fn mode_change(
    base: Option<&TreeEntry>,
    ours: Option<&TreeEntry>,
    theirs: Option<&TreeEntry>,
) -> Option<ChangeKind> {
    let mode = |e: Option<&TreeEntry>| e.map(|e| e.mode);

    match (mode(base), mode(ours), mode(theirs)) {
        (Some(b), Some(o), Some(t)) => match (o != b, t != b) {
            (false, false) => None,
            (true, false) => Some(ChangeKind::ModifiedOursOnly),
            (false, true) => Some(ChangeKind::ModifiedTheirsOnly),
            (true, true) if o == t => Some(ChangeKind::ModifiedBothIdentical),
            (true, true) => Some(ChangeKind::ModifiedBothDifferent),
        },
        (None, Some(o), Some(t)) if o != t => Some(ChangeKind::AddedBothDifferent),
        (Some(b), Some(o), None) if o != b => Some(ChangeKind::ModifiedVsRemoved),
        (Some(b), None, Some(t)) if t != b => Some(ChangeKind::RemovedVsModified),
        _ => None,
    }
}

/// the classification table; None means unchanged on both sides
pub(crate) fn classify_change(
    base: Option<&TreeEntry>,
    ours: Option<&TreeEntry>,
    theirs: Option<&TreeEntry>,
) -> Option<ChangeKind> {
    let same = |x: Option<&TreeEntry>, y: Option<&TreeEntry>| match (x, y) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_target(b),
        _ => false,
    };

    let change = match base {
        None => match (ours, theirs) {
            (None, None) => return None,
            (None, Some(_)) => ChangeKind::AddedTheirsOnly,
            (Some(_), None) => ChangeKind::AddedOursOnly,
            (Some(_), Some(_)) if same(ours, theirs) => ChangeKind::AddedBothIdentical,
            (Some(_), Some(_)) => ChangeKind::AddedBothDifferent,
        },
        Some(_) => {
            let ours_changed = !same(base, ours);
            let theirs_changed = !same(base, theirs);
            match (ours_changed, theirs_changed) {
                (false, false) => return None,
                (false, true) if theirs.is_none() => ChangeKind::RemovedTheirsOnly,
                (false, true) => ChangeKind::ModifiedTheirsOnly,
                (true, false) if ours.is_none() => ChangeKind::RemovedOursOnly,
                (true, false) => ChangeKind::ModifiedOursOnly,
                (true, true) => match (ours, theirs) {
                    (None, None) => ChangeKind::RemovedBoth,
                    (Some(_), None) => ChangeKind::ModifiedVsRemoved,
                    (None, Some(_)) => ChangeKind::RemovedVsModified,
                    (Some(_), Some(_)) if same(ours, theirs) => ChangeKind::ModifiedBothIdentical,
                    (Some(_), Some(_)) => ChangeKind::ModifiedBothDifferent,
                },
            }
        }
    };

    Some(change)
}

pub(crate) fn load_subtree(repo: &Repo, entry: Option<&TreeEntry>) -> Result<Option<Tree>> {
    match entry {
        Some(e) if e.is_tree() => Ok(Some(read_tree(repo, &e.hash)?)),
        _ => Ok(None),
    }
}

fn entry(
    path: String,
    base: Option<&TreeEntry>,
    ours: Option<&TreeEntry>,
    theirs: Option<&TreeEntry>,
    change: ChangeKind,
) -> DiffEntry {
    DiffEntry {
        path,
        base: base.cloned(),
        ours: ours.cloned(),
        theirs: theirs.cloned(),
        change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::create_tree;
    use crate::test_support::{flat_tree, object, table, test_repo};
    use crate::types::ObjectMode::{Column, Index, Table, View};

    fn changes(entries: &[DiffEntry]) -> Vec<(&str, ChangeKind)> {
        entries
            .iter()
            .map(|e| (e.path.as_str(), e.change))
            .collect()
    }

    #[test]
    fn test_identical_trees_no_entries() {
        let (_dir, repo) = test_repo();
        let t = flat_tree(&repo, &[("users", Table, "CREATE TABLE users ()")]);
        assert!(diff(&repo, &t, &t, &t).unwrap().is_empty());
    }

    #[test]
    fn test_every_table_row() {
        let (_dir, repo) = test_repo();

        let base = flat_tree(
            &repo,
            &[
                ("mod_theirs", Column, "a INT"),
                ("mod_ours", Column, "b INT"),
                ("mod_same", Column, "c INT"),
                ("mod_diff", Column, "d INT"),
                ("rm_theirs", Column, "e INT"),
                ("rm_ours", Column, "f INT"),
                ("rm_both", Column, "g INT"),
                ("mod_vs_rm", Column, "h INT"),
                ("rm_vs_mod", Column, "i INT"),
                ("untouched", Column, "j INT"),
            ],
        );
        let ours = flat_tree(
            &repo,
            &[
                ("add_ours", Column, "k INT"),
                ("add_same", Column, "l INT"),
                ("add_diff", Column, "m INT"),
                ("mod_theirs", Column, "a INT"),
                ("mod_ours", Column, "b BIGINT"),
                ("mod_same", Column, "c BIGINT"),
                ("mod_diff", Column, "d BIGINT"),
                ("rm_theirs", Column, "e INT"),
                ("mod_vs_rm", Column, "h BIGINT"),
                ("untouched", Column, "j INT"),
            ],
        );
        let theirs = flat_tree(
            &repo,
            &[
                ("add_theirs", Column, "n INT"),
                ("add_same", Column, "l INT"),
                ("add_diff", Column, "m TEXT"),
                ("mod_theirs", Column, "a TEXT"),
                ("mod_ours", Column, "b INT"),
                ("mod_same", Column, "c BIGINT"),
                ("mod_diff", Column, "d TEXT"),
                ("rm_ours", Column, "f INT"),
                ("rm_vs_mod", Column, "i TEXT"),
                ("untouched", Column, "j INT"),
            ],
        );

        let result = diff(&repo, &base, &ours, &theirs).unwrap();
        assert_eq!(
            changes(&result),
            vec![
                ("add_diff", ChangeKind::AddedBothDifferent),
                ("add_ours", ChangeKind::AddedOursOnly),
                ("add_same", ChangeKind::AddedBothIdentical),
                ("add_theirs", ChangeKind::AddedTheirsOnly),
                ("mod_diff", ChangeKind::ModifiedBothDifferent),
                ("mod_ours", ChangeKind::ModifiedOursOnly),
                ("mod_same", ChangeKind::ModifiedBothIdentical),
                ("mod_theirs", ChangeKind::ModifiedTheirsOnly),
                ("mod_vs_rm", ChangeKind::ModifiedVsRemoved),
                ("rm_both", ChangeKind::RemovedBoth),
                ("rm_ours", ChangeKind::RemovedOursOnly),
                ("rm_theirs", ChangeKind::RemovedTheirsOnly),
                ("rm_vs_mod", ChangeKind::RemovedVsModified),
            ]
        );
    }

    #[test]
    fn test_mode_change_counts_as_modification() {
        let (_dir, repo) = test_repo();
        let base = flat_tree(&repo, &[("x", Column, "x INT")]);
        let ours = flat_tree(&repo, &[("x", Index, "x INT")]);

        let result = diff(&repo, &base, &ours, &base).unwrap();
        assert_eq!(changes(&result), vec![("x", ChangeKind::ModifiedOursOnly)]);
    }

    #[test]
    fn test_nested_tables_descend() {
        let (_dir, repo) = test_repo();

        let base = create_tree(&repo, vec![table(&repo, "users", &[("email", "email TEXT")])])
            .unwrap();
        let ours = create_tree(
            &repo,
            vec![table(&repo, "users", &[("email", "email VARCHAR(100)")])],
        )
        .unwrap();
        let theirs = create_tree(
            &repo,
            vec![table(
                &repo,
                "users",
                &[("email", "email TEXT NOT NULL"), ("name", "name TEXT")],
            )],
        )
        .unwrap();

        let result = diff(&repo, &base, &ours, &theirs).unwrap();
        assert_eq!(
            changes(&result),
            vec![
                ("users/email", ChangeKind::ModifiedBothDifferent),
                ("users/name", ChangeKind::AddedTheirsOnly),
            ]
        );
    }

    #[test]
    fn test_one_sided_table_change_descends() {
        let (_dir, repo) = test_repo();

        let base = create_tree(&repo, vec![table(&repo, "users", &[("id", "id INT")])]).unwrap();
        let ours = create_tree(
            &repo,
            vec![
                table(&repo, "users", &[("id", "id BIGINT")]),
                table(&repo, "orders", &[("id", "id INT")]),
            ],
        )
        .unwrap();

        let result = diff(&repo, &base, &ours, &base).unwrap();
        assert_eq!(
            changes(&result),
            vec![
                ("orders", ChangeKind::AddedOursOnly),
                ("users/id", ChangeKind::ModifiedOursOnly),
            ]
        );
    }

    #[test]
    fn test_removed_table_vs_modified_column() {
        let (_dir, repo) = test_repo();

        let users_base = table(&repo, "users", &[("id", "id INT"), ("email", "email TEXT")]);
        let users_theirs = table(
            &repo,
            "users",
            &[("id", "id INT"), ("email", "email TEXT NOT NULL")],
        );

        let base = create_tree(&repo, vec![users_base]).unwrap();
        let ours = create_tree(&repo, vec![]).unwrap();
        let theirs = create_tree(&repo, vec![users_theirs]).unwrap();

        let result = diff(&repo, &base, &ours, &theirs).unwrap();
        assert_eq!(
            changes(&result),
            vec![
                ("users/email", ChangeKind::RemovedVsModified),
                ("users/id", ChangeKind::RemovedOursOnly),
            ]
        );
    }

    #[test]
    fn test_kind_mismatch() {
        let (_dir, repo) = test_repo();

        let base = create_tree(&repo, vec![]).unwrap();
        let ours = create_tree(&repo, vec![table(&repo, "audit", &[("id", "id INT")])]).unwrap();
        let theirs = create_tree(
            &repo,
            vec![object(&repo, "audit", Table, "CREATE VIEW audit AS SELECT 1")],
        )
        .unwrap();

        let result = diff(&repo, &base, &ours, &theirs).unwrap();
        assert_eq!(changes(&result), vec![("audit", ChangeKind::KindMismatch)]);
        assert!(result[0].is_conflict());
    }

    #[test]
    fn test_diff_commits() {
        let (_dir, repo) = test_repo();
        let base_tree = flat_tree(&repo, &[("users", Table, "CREATE TABLE users ()")]);
        let ours_tree = flat_tree(
            &repo,
            &[
                ("users", Table, "CREATE TABLE users ()"),
                ("orders", Table, "CREATE TABLE orders ()"),
            ],
        );

        let base = crate::test_support::commit_tree(&repo, base_tree, vec![], "base");
        let ours = crate::test_support::commit_tree(&repo, ours_tree, vec![base], "ours");

        let result = diff_commits(&repo, &base, &ours, &base).unwrap();
        assert_eq!(changes(&result), vec![("orders", ChangeKind::AddedOursOnly)]);
    }

    #[test]
    fn test_subtree_mode_change_reported() {
        let (_dir, repo) = test_repo();
        let users = table(&repo, "users", &[("id", "id INT")]);
        let as_view = TreeEntry::tree("users", View, users.hash);

        let base = create_tree(&repo, vec![users]).unwrap();
        let ours = create_tree(&repo, vec![as_view]).unwrap();

        let result = diff(&repo, &base, &ours, &base).unwrap();
        assert_eq!(changes(&result), vec![("users", ChangeKind::ModifiedOursOnly)]);
        assert_eq!(result[0].ours.as_ref().map(|e| e.mode), Some(View));
        assert!(!result[0].is_conflict());
    }

    #[test]
    fn test_subtree_mode_conflict_alongside_children() {
        let (_dir, repo) = test_repo();
        let users = table(&repo, "users", &[("id", "id INT")]);
        let edited = table(&repo, "users", &[("id", "id BIGINT")]);

        let base = create_tree(&repo, vec![users.clone()]).unwrap();
        let ours = create_tree(&repo, vec![TreeEntry::tree("users", View, users.hash)]).unwrap();
        let theirs =
            create_tree(&repo, vec![TreeEntry::tree("users", Index, edited.hash)]).unwrap();

        let result = diff(&repo, &base, &ours, &theirs).unwrap();
        assert_eq!(
            changes(&result),
            vec![
                ("users", ChangeKind::ModifiedBothDifferent),
                ("users/id", ChangeKind::ModifiedTheirsOnly),
            ]
        );
        assert!(result[0].is_conflict());
    }
}
