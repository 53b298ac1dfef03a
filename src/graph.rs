//! commit-graph index
//!
//! every commit gets a generation number: 0 for a root, otherwise one more
//! than the highest parent generation. rows live under `graph/` keyed by the
//! commit hash and never change once written, since parents never change.
//! ancestry queries use generations to stop walking early.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::object::{from_cbor, read_commit, read_object_file, sharded_path, to_cbor, write_atomic};
use crate::repo::Repo;
use crate::types::Commit;

/// cached graph row for one commit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub generation: u64,
    pub parents: Vec<Hash>,
}

/// view over the commit-graph cache with an in-memory memo
pub struct CommitGraph<'a> {
    repo: &'a Repo,
    nodes: HashMap<Hash, GraphNode>,
}

impl<'a> CommitGraph<'a> {
    pub fn new(repo: &'a Repo) -> Self {
        Self {
            repo,
            nodes: HashMap::new(),
        }
    }

    /// record a freshly stored commit; returns its generation
    pub fn record(&mut self, hash: &Hash, commit: &Commit) -> Result<u64> {
        if let Some(node) = self.load_row(hash)? {
            return Ok(node.generation);
        }

        let mut generation = 0;
        for parent in &commit.parents {
            generation = generation.max(self.generation(parent)? + 1);
        }

        let node = GraphNode {
            generation,
            parents: commit.parents.clone(),
        };
        self.store_row(hash, &node)?;
        self.nodes.insert(*hash, node);

        Ok(generation)
    }

    /// graph row for a commit, rebuilding missing rows from the object store
    pub fn node(&mut self, hash: &Hash) -> Result<&GraphNode> {
        if !self.nodes.contains_key(hash) {
            match self.load_row(hash)? {
                Some(node) => {
                    self.nodes.insert(*hash, node);
                }
                None => self.rebuild(hash)?,
            }
        }
        self.nodes
            .get(hash)
            .ok_or(Error::ObjectNotFound(*hash))
    }

    pub fn generation(&mut self, hash: &Hash) -> Result<u64> {
        Ok(self.node(hash)?.generation)
    }

    pub fn parents(&mut self, hash: &Hash) -> Result<Vec<Hash>> {
        Ok(self.node(hash)?.parents.clone())
    }

    /// true if `ancestor` is reachable from `descendant` (a commit is its own ancestor)
    pub fn is_ancestor(&mut self, ancestor: &Hash, descendant: &Hash) -> Result<bool> {
        if ancestor == descendant {
            return Ok(true);
        }

        let floor = self.generation(ancestor)?;
        if self.generation(descendant)? <= floor {
            return Ok(false);
        }

        let mut queue = VecDeque::from([*descendant]);
        let mut visited = HashSet::from([*descendant]);

        while let Some(hash) = queue.pop_front() {
            let generation = self.generation(&hash)?;
            for parent in self.parents(&hash)? {
                if parent == *ancestor {
                    return Ok(true);
                }
                let parent_generation = self.generation(&parent)?;
                if parent_generation >= generation {
                    return Err(Error::CycleDetected(parent));
                }
                // ancestors of anything at or below the floor cannot reach it
                if parent_generation > floor && visited.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }

        Ok(false)
    }

    /// recompute rows for `start` and any uncached ancestors
    ///
    /// iterative post-order walk; a parent already on the current path means
    /// the parent pointers form a cycle.
    fn rebuild(&mut self, start: &Hash) -> Result<()> {
        let mut stack = vec![(*start, false)];
        let mut on_path: HashSet<Hash> = HashSet::new();
        let mut pending: HashMap<Hash, Vec<Hash>> = HashMap::new();

        while let Some((hash, expanded)) = stack.pop() {
            if self.nodes.contains_key(&hash) {
                continue;
            }

            if expanded {
                let parents = pending.remove(&hash).unwrap_or_default();
                let mut generation = 0;
                for parent in &parents {
                    let parent_generation = self
                        .nodes
                        .get(parent)
                        .map(|n| n.generation)
                        .ok_or(Error::CycleDetected(*parent))?;
                    generation = generation.max(parent_generation + 1);
                }
                let node = GraphNode {
                    generation,
                    parents,
                };
                self.store_row(&hash, &node)?;
                self.nodes.insert(hash, node);
                on_path.remove(&hash);
                continue;
            }

            if let Some(node) = self.load_row(&hash)? {
                self.nodes.insert(hash, node);
                continue;
            }

            if !on_path.insert(hash) {
                return Err(Error::CycleDetected(hash));
            }

            let commit = read_commit(self.repo, &hash)?;
            stack.push((hash, true));
            for parent in &commit.parents {
                if on_path.contains(parent) {
                    return Err(Error::CycleDetected(*parent));
                }
                if !self.nodes.contains_key(parent) {
                    stack.push((*parent, false));
                }
            }
            pending.insert(hash, commit.parents);
        }

        debug!(commit = %start.short(), "rebuilt commit-graph rows");
        Ok(())
    }

    fn row_path(&self, hash: &Hash) -> PathBuf {
        sharded_path(self.repo.graph_path(), hash)
    }

    fn load_row(&self, hash: &Hash) -> Result<Option<GraphNode>> {
        let path = self.row_path(hash);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = read_object_file(&path, hash)?;
        Ok(Some(from_cbor(&bytes)?))
    }

    fn store_row(&self, hash: &Hash, node: &GraphNode) -> Result<()> {
        write_atomic(self.repo, &self.row_path(hash), &to_cbor(node)?)
    }
}

/// convenience wrapper for a single ancestry query
pub fn is_ancestor(repo: &Repo, ancestor: &Hash, descendant: &Hash) -> Result<bool> {
    CommitGraph::new(repo).is_ancestor(ancestor, descendant)
}
