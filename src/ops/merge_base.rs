use std::collections::{BinaryHeap, HashMap};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::graph::CommitGraph;
use crate::hash::Hash;
use crate::repo::Repo;

/// nearest common ancestor of two commits
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeBase {
    pub hash: Hash,
    pub generation: u64,
    /// parent hops from the ours tip
    pub distance_ours: u32,
    /// parent hops from the theirs tip
    pub distance_theirs: u32,
    /// lowest common ancestors found at the winning generation (>1 on criss-cross)
    pub candidates: usize,
}

/// which tips reached a commit, and how far away each one is
#[derive(Clone, Copy, Default)]
struct Paint {
    ours: Option<u32>,
    theirs: Option<u32>,
}

impl Paint {
    fn is_common(&self) -> bool {
        self.ours.is_some() && self.theirs.is_some()
    }

    fn absorb(&mut self, child: Paint) {
        self.ours = min_distance(self.ours, child.ours.map(|d| d + 1));
        self.theirs = min_distance(self.theirs, child.theirs.map(|d| d + 1));
    }
}

fn min_distance(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, None) => x,
        (None, y) => y,
    }
}

/// find the merge base of two commits
pub fn find_merge_base(repo: &Repo, ours: &Hash, theirs: &Hash) -> Result<Hash> {
    Ok(find_merge_base_detailed(repo, ours, theirs)?.hash)
}

/// find the merge base with distances and candidate count
///
/// walks back from both tips in descending generation order. a commit's paint
/// is final when it is popped, since all its descendants have higher
/// generations. the first generation holding a commit painted by both sides
/// wins; on a tie the smallest hash is chosen.
pub fn find_merge_base_detailed(repo: &Repo, ours: &Hash, theirs: &Hash) -> Result<MergeBase> {
    let mut graph = CommitGraph::new(repo);

    if ours == theirs {
        return Ok(MergeBase {
            hash: *ours,
            generation: graph.generation(ours)?,
            distance_ours: 0,
            distance_theirs: 0,
            candidates: 1,
        });
    }

    let mut paints: HashMap<Hash, Paint> = HashMap::new();
    let mut heap: BinaryHeap<(u64, Hash)> = BinaryHeap::new();

    paints.insert(
        *ours,
        Paint {
            ours: Some(0),
            theirs: None,
        },
    );
    paints.insert(
        *theirs,
        Paint {
            ours: None,
            theirs: Some(0),
        },
    );
    heap.push((graph.generation(ours)?, *ours));
    heap.push((graph.generation(theirs)?, *theirs));

    let mut best_generation: Option<u64> = None;
    let mut candidates: Vec<Hash> = Vec::new();
    let mut visited = 0usize;

    while let Some((generation, hash)) = heap.pop() {
        if best_generation.is_some_and(|best| generation < best) {
            break;
        }
        visited += 1;

        let paint = paints.get(&hash).copied().unwrap_or_default();
        if paint.is_common() {
            best_generation = Some(generation);
            candidates.push(hash);
            continue;
        }

        for parent in graph.parents(&hash)? {
            let parent_generation = graph.generation(&parent)?;
            if parent_generation >= generation {
                return Err(Error::CycleDetected(parent));
            }

            match paints.get_mut(&parent) {
                Some(existing) => existing.absorb(paint),
                None => {
                    let mut fresh = Paint::default();
                    fresh.absorb(paint);
                    paints.insert(parent, fresh);
                    heap.push((parent_generation, parent));
                }
            }
        }
    }

    candidates.sort();
    let Some(&base) = candidates.first() else {
        return Err(Error::UnrelatedHistories {
            ours: *ours,
            theirs: *theirs,
        });
    };

    if candidates.len() > 1 {
        warn!(
            ours = %ours.short(),
            theirs = %theirs.short(),
            candidates = candidates.len(),
            chosen = %base.short(),
            "multiple lowest common ancestors, using smallest hash"
        );
    }

    let paint = paints.get(&base).copied().unwrap_or_default();
    let result = MergeBase {
        hash: base,
        generation: best_generation.unwrap_or_default(),
        distance_ours: paint.ours.unwrap_or_default(),
        distance_theirs: paint.theirs.unwrap_or_default(),
        candidates: candidates.len(),
    };

    debug!(
        base = %base.short(),
        generation = result.generation,
        distance_ours = result.distance_ours,
        distance_theirs = result.distance_theirs,
        visited,
        "resolved merge base"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{create_commit, create_tree};
    use tempfile::tempdir;

    fn test_repo() -> (tempfile::TempDir, Repo) {
        let dir = tempdir().unwrap();
        let repo = Repo::init(&dir.path().join("repo")).unwrap();
        (dir, repo)
    }

    fn commit(repo: &Repo, parents: Vec<Hash>, message: &str) -> Hash {
        let tree = create_tree(repo, vec![]).unwrap();
        create_commit(repo, tree, parents, "dba", message).unwrap()
    }

    #[test]
    fn test_simple_fork() {
        let (_dir, repo) = test_repo();
        let base = commit(&repo, vec![], "base");
        let x1 = commit(&repo, vec![base], "x1");
        let y1 = commit(&repo, vec![base], "y1");

        assert_eq!(find_merge_base(&repo, &x1, &y1).unwrap(), base);
        assert_eq!(find_merge_base(&repo, &y1, &x1).unwrap(), base);
    }

    #[test]
    fn test_same_commit() {
        let (_dir, repo) = test_repo();
        let base = commit(&repo, vec![], "base");
        assert_eq!(find_merge_base(&repo, &base, &base).unwrap(), base);
    }

    #[test]
    fn test_ancestor_is_base() {
        let (_dir, repo) = test_repo();
        let base = commit(&repo, vec![], "base");
        let a = commit(&repo, vec![base], "a");
        let b = commit(&repo, vec![a], "b");

        let found = find_merge_base_detailed(&repo, &a, &b).unwrap();
        assert_eq!(found.hash, a);
        assert_eq!(found.distance_ours, 0);
        assert_eq!(found.distance_theirs, 1);
    }

    #[test]
    fn test_uneven_branches_distances() {
        let (_dir, repo) = test_repo();
        let root = commit(&repo, vec![], "root");
        let base = commit(&repo, vec![root], "base");
        let mut ours = base;
        for i in 0..4 {
            ours = commit(&repo, vec![ours], &format!("ours {}", i));
        }
        let theirs = commit(&repo, vec![base], "theirs");

        let found = find_merge_base_detailed(&repo, &ours, &theirs).unwrap();
        assert_eq!(found.hash, base);
        assert_eq!(found.generation, 1);
        assert_eq!(found.distance_ours, 4);
        assert_eq!(found.distance_theirs, 1);
        assert_eq!(found.candidates, 1);
    }

    #[test]
    fn test_after_previous_merge() {
        // root - a1 - m - a2
        //      \ b1 /  \ b2
        let (_dir, repo) = test_repo();
        let root = commit(&repo, vec![], "root");
        let a1 = commit(&repo, vec![root], "a1");
        let b1 = commit(&repo, vec![root], "b1");
        let m = commit(&repo, vec![a1, b1], "merge");
        let a2 = commit(&repo, vec![m], "a2");
        let b2 = commit(&repo, vec![b1], "b2");

        // b2 only knows b1; the merge brought b1 into ours
        assert_eq!(find_merge_base(&repo, &a2, &b2).unwrap(), b1);
    }

    #[test]
    fn test_criss_cross_picks_smallest_hash() {
        let (_dir, repo) = test_repo();
        let root = commit(&repo, vec![], "root");
        let a = commit(&repo, vec![root], "a");
        let b = commit(&repo, vec![root], "b");
        let x = commit(&repo, vec![a, b], "x");
        let y = commit(&repo, vec![b, a], "y");

        let found = find_merge_base_detailed(&repo, &x, &y).unwrap();
        assert_eq!(found.candidates, 2);
        assert_eq!(found.hash, a.min(b));

        // deterministic regardless of argument order
        assert_eq!(find_merge_base(&repo, &y, &x).unwrap(), a.min(b));
    }

    #[test]
    fn test_unrelated_histories() {
        let (_dir, repo) = test_repo();
        let r1 = commit(&repo, vec![], "root one");
        let r2 = commit(&repo, vec![], "root two");
        let a = commit(&repo, vec![r1], "a");
        let b = commit(&repo, vec![r2], "b");

        assert!(matches!(
            find_merge_base(&repo, &a, &b),
            Err(Error::UnrelatedHistories { .. })
        ));
    }
}
