//! likely-rename detection
//!
//! a removed object and an added object of the same mode whose definitions
//! are nearly identical, once each object's own name is masked out, are
//! reported as a [`RenameHint`]. hints are informational; nothing is applied.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::Result;
use crate::hash::Hash;
use crate::object::read_blob;
use crate::repo::Repo;
use crate::types::{DiffEntry, RenameHint, Side, TreeEntry};

const SELF_TOKEN: &str = "\u{0}self";

/// pair removals with additions across a three-way diff
pub fn detect_renames(
    repo: &Repo,
    entries: &[DiffEntry],
    threshold: f64,
) -> Result<Vec<RenameHint>> {
    let added: Vec<(&DiffEntry, &TreeEntry)> = entries
        .iter()
        .filter(|e| e.base.is_none())
        .flat_map(|e| [e.ours.as_ref(), e.theirs.as_ref()].into_iter().flatten().map(move |t| (e, t)))
        .filter(|(_, t)| !t.is_tree())
        .collect();

    if added.is_empty() {
        return Ok(Vec::new());
    }

    let mut texts: HashMap<Hash, String> = HashMap::new();
    let mut hints = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for side in [Side::Ours, Side::Theirs] {
        let removed = entries
            .iter()
            .filter(|e| e.side(side).is_none())
            .filter_map(|e| e.base.as_ref().map(|b| (e, b)))
            .filter(|(_, b)| !b.is_tree());

        for (from, base) in removed {
            let from_tokens = tokens(&cached_text(repo, &mut texts, &base.hash)?, from.name());

            let mut best: Option<(f64, &DiffEntry)> = None;
            for (to, target) in &added {
                if target.mode != base.mode || to.path == from.path {
                    continue;
                }
                let to_tokens = tokens(&cached_text(repo, &mut texts, &target.hash)?, to.name());
                let score = similarity(&from_tokens, &to_tokens);
                if score >= threshold && best.map_or(true, |(s, _)| score > s) {
                    best = Some((score, to));
                }
            }

            if let Some((score, to)) = best {
                if seen.insert((from.path.clone(), to.path.clone())) {
                    debug!(
                        %side,
                        from = %from.path,
                        to = %to.path,
                        similarity = score,
                        "likely rename"
                    );
                    hints.push(RenameHint {
                        side,
                        from: from.path.clone(),
                        to: to.path.clone(),
                        similarity: score,
                    });
                }
            }
        }
    }

    Ok(hints)
}

fn cached_text(repo: &Repo, cache: &mut HashMap<Hash, String>, hash: &Hash) -> Result<String> {
    if let Some(text) = cache.get(hash) {
        return Ok(text.clone());
    }
    let text = read_blob(repo, hash)?;
    cache.insert(*hash, text.clone());
    Ok(text)
}

/// lower-cased word tokens with the object's own name replaced by a marker
fn tokens(text: &str, own_name: &str) -> HashSet<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(|t| {
            if t.eq_ignore_ascii_case(own_name) {
                SELF_TOKEN.to_string()
            } else {
                t.to_ascii_lowercase()
            }
        })
        .collect()
}

/// jaccard index of two token sets
fn similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::create_tree;
    use crate::ops::diff;
    use crate::test_support::{flat_tree, table, test_repo};
    use crate::types::ObjectMode::{Column, Table, View};

    #[test]
    fn test_rename_on_one_side() {
        let (_dir, repo) = test_repo();
        let base = create_tree(&repo, vec![table(&repo, "users", &[("mail", "mail TEXT NOT NULL")])])
            .unwrap();
        let ours = create_tree(
            &repo,
            vec![table(&repo, "users", &[("email", "email TEXT NOT NULL")])],
        )
        .unwrap();

        let entries = diff(&repo, &base, &ours, &base).unwrap();
        let hints = detect_renames(&repo, &entries, 0.9).unwrap();

        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].side, Side::Ours);
        assert_eq!(hints[0].from, "users/mail");
        assert_eq!(hints[0].to, "users/email");
        assert_eq!(hints[0].similarity, 1.0);
    }

    #[test]
    fn test_removed_one_side_added_other() {
        let (_dir, repo) = test_repo();
        let view = "CREATE VIEW active AS SELECT id FROM users WHERE active";
        let base = flat_tree(&repo, &[("active", View, view)]);
        let ours = flat_tree(&repo, &[]);
        let theirs = flat_tree(
            &repo,
            &[
                ("active", View, view),
                (
                    "active_users",
                    View,
                    "CREATE VIEW active_users AS SELECT id FROM users WHERE active",
                ),
            ],
        );

        let entries = diff(&repo, &base, &ours, &theirs).unwrap();
        let hints = detect_renames(&repo, &entries, 0.9).unwrap();

        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].side, Side::Ours);
        assert_eq!(hints[0].to, "active_users");
    }

    #[test]
    fn test_dissimilar_or_other_mode_ignored() {
        let (_dir, repo) = test_repo();
        let base = flat_tree(&repo, &[("a", Column, "a INT NOT NULL DEFAULT 0")]);
        let ours = flat_tree(
            &repo,
            &[
                ("b", Column, "b TEXT COLLATE C"),
                ("c", Table, "c INT NOT NULL DEFAULT 0"),
            ],
        );

        let entries = diff(&repo, &base, &ours, &base).unwrap();
        assert!(detect_renames(&repo, &entries, 0.9).unwrap().is_empty());
    }

    #[test]
    fn test_similarity() {
        let a = tokens("mail TEXT NOT NULL", "mail");
        let b = tokens("email TEXT NOT NULL", "email");
        assert_eq!(similarity(&a, &b), 1.0);

        let c = tokens("email VARCHAR NOT NULL", "email");
        assert_eq!(similarity(&a, &c), 0.6);
    }
}
