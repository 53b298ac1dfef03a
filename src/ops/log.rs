use std::collections::HashSet;

use crate::error::Result;
use crate::hash::Hash;
use crate::object::read_commit;
use crate::refs::resolve_commit;
use crate::repo::Repo;
use crate::types::Commit;

/// commit with its hash for log output
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub hash: Hash,
    pub commit: Commit,
}

/// commit history reachable from a branch or commit hash, newest first
pub fn log(repo: &Repo, branch_or_hash: &str, max_count: Option<usize>) -> Result<Vec<LogEntry>> {
    let head_hash = resolve_commit(repo, branch_or_hash)?;
    let mut entries = Vec::new();
    let mut to_visit = vec![head_hash];
    let mut visited = HashSet::new();

    while let Some(hash) = to_visit.pop() {
        if !visited.insert(hash) {
            continue;
        }

        let commit = read_commit(repo, &hash)?;

        // first parent is visited first
        for parent in commit.parents.iter().rev() {
            to_visit.push(*parent);
        }

        entries.push(LogEntry { hash, commit });
    }

    // newest first; hash keeps same-second commits in a stable order
    entries.sort_by(|a, b| {
        b.commit
            .timestamp
            .cmp(&a.commit.timestamp)
            .then_with(|| a.hash.cmp(&b.hash))
    });

    if let Some(max) = max_count {
        entries.truncate(max);
    }

    Ok(entries)
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "commit {}", self.hash)?;
        if self.commit.is_merge() {
            let parents: Vec<String> = self.commit.parents.iter().map(|p| p.short()).collect();
            writeln!(f, "Merge:  {}", parents.join(" "))?;
        }
        writeln!(f, "Author: {}", self.commit.author)?;
        writeln!(f, "Date:   {}", self.commit.timestamp)?;
        for (key, value) in &self.commit.metadata {
            writeln!(f, "{}: {}", key, value)?;
        }

        writeln!(f)?;
        for line in self.commit.message.lines() {
            writeln!(f, "    {}", line)?;
        }

        Ok(())
    }
}
