use crate::error::Result;
use crate::object::{read_commit, read_tree};
use crate::refs::resolve_commit;
use crate::repo::Repo;
use crate::types::{Tree, TreeEntry};

/// tree entry with its full slash path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsTreeEntry {
    pub path: String,
    pub entry: TreeEntry,
}

impl std::fmt::Display for LsTreeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}\t{}",
            self.entry.mode,
            self.entry.kind.type_name(),
            self.entry.hash,
            self.path
        )
    }
}

/// list one level of a commit's tree, optionally below a slash path
///
/// a path naming a blob lists just that entry; a path that does not exist
/// lists nothing.
pub fn ls_tree(repo: &Repo, branch_or_hash: &str, path: Option<&str>) -> Result<Vec<LsTreeEntry>> {
    let commit = read_commit(repo, &resolve_commit(repo, branch_or_hash)?)?;
    let root = read_tree(repo, &commit.tree)?;

    let components: Vec<&str> = path
        .unwrap_or("")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let mut tree = root;
    let mut prefix = String::new();
    for (i, component) in components.iter().enumerate() {
        let Some(entry) = tree.get(component).cloned() else {
            return Ok(vec![]);
        };
        let full_path = join(&prefix, component);

        if !entry.is_tree() {
            // only the last component may name a blob
            if i + 1 == components.len() {
                return Ok(vec![LsTreeEntry {
                    path: full_path,
                    entry,
                }]);
            }
            return Ok(vec![]);
        }

        tree = read_tree(repo, &entry.hash)?;
        prefix = full_path;
    }

    Ok(list_level(&tree, &prefix))
}

/// every entry of a commit's tree, depth first
///
/// this is the shape the materialization layer consumes: each blob with its
/// path and mode, each subtree before its children.
pub fn ls_tree_recursive(repo: &Repo, branch_or_hash: &str) -> Result<Vec<LsTreeEntry>> {
    let commit = read_commit(repo, &resolve_commit(repo, branch_or_hash)?)?;
    let tree = read_tree(repo, &commit.tree)?;

    let mut entries = Vec::new();
    ls_tree_recursive_impl(repo, &tree, "", &mut entries)?;
    Ok(entries)
}

fn ls_tree_recursive_impl(
    repo: &Repo,
    tree: &Tree,
    prefix: &str,
    entries: &mut Vec<LsTreeEntry>,
) -> Result<()> {
    for entry in tree.entries() {
        let path = join(prefix, &entry.name);

        entries.push(LsTreeEntry {
            path: path.clone(),
            entry: entry.clone(),
        });

        if entry.is_tree() {
            let subtree = read_tree(repo, &entry.hash)?;
            ls_tree_recursive_impl(repo, &subtree, &path, entries)?;
        }
    }

    Ok(())
}

fn list_level(tree: &Tree, prefix: &str) -> Vec<LsTreeEntry> {
    tree.entries()
        .iter()
        .map(|entry| LsTreeEntry {
            path: join(prefix, &entry.name),
            entry: entry.clone(),
        })
        .collect()
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}
