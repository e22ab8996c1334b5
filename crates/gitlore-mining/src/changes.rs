//! Rename-aware file changes for every commit reachable from any reference.
//!
//! Each non-merge commit is diffed against its first parent with rename
//! detection enabled. A rename's line counts belong to the destination
//! path; the source path's history ends at the commit before it.
//! Deleted files stay queryable because nothing here is limited to paths
//! that exist at HEAD.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use git2::{
    Commit, Delta, Diff, DiffFile, DiffFindOptions, DiffOptions, FileMode, Oid, Patch, Repository,
    Sort,
};
use gitlore_core::Result;
use tracing::{debug, warn};

/// Same effect as `git config diff.renameLimit 999999`.
const RENAME_LIMIT: usize = 999_999;

/// Status of a file change within a commit.
///
/// # Examples
///
/// ```
/// use gitlore_mining::changes::ChangeStatus;
///
/// let status = ChangeStatus::Renamed { from: "old.rs".into() };
/// assert_ne!(status, ChangeStatus::Modified);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
    /// New file.
    Added,
    /// Existing file modified.
    Modified,
    /// File removed.
    Deleted,
    /// File renamed from another path.
    Renamed {
        /// Original path before rename.
        from: String,
    },
}

/// A single file change within a commit.
///
/// # Examples
///
/// ```
/// use gitlore_mining::changes::{ChangeStatus, FileChange};
///
/// let change = FileChange {
///     path: "src/main.rs".into(),
///     status: ChangeStatus::Modified,
///     insertions: 10,
///     deletions: 3,
/// };
/// assert_eq!(change.insertions, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Path after the commit; the removed path for deletions.
    pub path: String,
    /// Type of change.
    pub status: ChangeStatus,
    /// Lines added to this file.
    pub insertions: usize,
    /// Lines deleted from this file.
    pub deletions: usize,
}

/// The file changes of one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedCommit {
    /// Commit id.
    pub oid: Oid,
    /// Parent ids; at most one, merges are never indexed.
    pub parents: Vec<Oid>,
    /// Lines added across the whole commit.
    pub insertions: usize,
    /// Lines removed across the whole commit.
    pub deletions: usize,
    /// Changes against the first parent.
    pub changes: Vec<FileChange>,
}

/// One commit's line counts for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatEntry {
    /// Commit id.
    pub commit: Oid,
    /// Path the file had in this commit (the removed path for deletions).
    pub path: String,
    /// Position of the commit in the index, 0 being the newest.
    pub position: usize,
    /// Lines added to the file.
    pub insertions: usize,
    /// Lines deleted from the file.
    pub deletions: usize,
}

/// "`from` was renamed to `to` in `commit`".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameLink {
    /// Source path.
    pub from: String,
    /// Destination path.
    pub to: String,
    /// Commit that performed the rename.
    pub commit: Oid,
}

/// Per-commit file changes, newest commit first.
///
/// Parent links of every walked commit, merges included, are kept so
/// rename lookups can follow ancestry rather than time alone.
#[derive(Debug, Clone, Default)]
pub struct ChangeIndex {
    commits: Vec<IndexedCommit>,
    positions: HashMap<Oid, usize>,
    parents: HashMap<Oid, Vec<Oid>>,
}

impl ChangeIndex {
    /// Index every non-merge commit reachable from any reference or HEAD.
    ///
    /// A change whose patch cannot be produced is logged and left out;
    /// only failures to read commits or trees abort the build.
    ///
    /// # Errors
    ///
    /// Returns [`GitloreError::Git`](gitlore_core::GitloreError::Git) if
    /// the history cannot be walked.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use git2::Repository;
    /// use gitlore_mining::changes::ChangeIndex;
    ///
    /// let repo = Repository::open(".").unwrap();
    /// let index = ChangeIndex::build(&repo).unwrap();
    /// println!("{} commits indexed", index.len());
    /// ```
    pub fn build(repo: &Repository) -> Result<Self> {
        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push_glob("*")?;
        // A detached HEAD is not under refs/.
        revwalk.push_head().ok();

        let mut commits = Vec::new();
        let mut merges = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = repo.find_commit(oid)?;
            let parents: Vec<Oid> = commit.parent_ids().collect();
            if parents.len() > 1 {
                merges.push((oid, parents));
                continue;
            }
            let diff = first_parent_diff(repo, &commit)?;
            let stats = diff.stats()?;
            commits.push(IndexedCommit {
                oid,
                parents,
                insertions: stats.insertions(),
                deletions: stats.deletions(),
                changes: file_changes(&diff, oid),
            });
        }

        debug!(
            commits = commits.len(),
            merges = merges.len(),
            "change index built"
        );
        let mut index = Self::from_commits(commits);
        index.parents.extend(merges);
        Ok(index)
    }

    /// Build an index from already extracted commits, newest first.
    pub fn from_commits(commits: Vec<IndexedCommit>) -> Self {
        let positions = commits
            .iter()
            .enumerate()
            .map(|(position, commit)| (commit.oid, position))
            .collect();
        let parents = commits
            .iter()
            .map(|commit| (commit.oid, commit.parents.clone()))
            .collect();
        Self {
            commits,
            positions,
            parents,
        }
    }

    /// The indexed commit with id `oid`, if it is not a merge.
    #[must_use]
    pub fn commit(&self, oid: Oid) -> Option<&IndexedCommit> {
        self.positions.get(&oid).map(|&position| &self.commits[position])
    }

    /// Whether `ancestor` is reachable from `descendant` through parent links.
    ///
    /// A commit counts as its own descendant.
    #[must_use]
    pub fn descends_from(&self, descendant: Oid, ancestor: Oid) -> bool {
        let mut pending = vec![descendant];
        let mut seen = HashSet::new();
        while let Some(oid) = pending.pop() {
            if oid == ancestor {
                return true;
            }
            if !seen.insert(oid) {
                continue;
            }
            if let Some(parents) = self.parents.get(&oid) {
                pending.extend(parents.iter().copied());
            }
        }
        false
    }

    /// Number of indexed commits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Whether no commit was indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Indexed commits, newest first.
    #[must_use]
    pub fn commits(&self) -> &[IndexedCommit] {
        &self.commits
    }

    /// Number of distinct commits that touched each path.
    #[must_use]
    pub fn touch_counts(&self) -> HashMap<&str, usize> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for commit in &self.commits {
            let paths: HashSet<&str> = commit.changes.iter().map(|c| c.path.as_str()).collect();
            for path in paths {
                *counts.entry(path).or_default() += 1;
            }
        }
        counts
    }

    /// Line counts of every commit that touched `path`, newest first.
    #[must_use]
    pub fn history(&self, path: &str) -> Vec<StatEntry> {
        self.commits
            .iter()
            .enumerate()
            .filter_map(|(position, commit)| {
                commit
                    .changes
                    .iter()
                    .find(|change| change.path == path)
                    .map(|change| StatEntry {
                        commit: commit.oid,
                        path: change.path.clone(),
                        position,
                        insertions: change.insertions,
                        deletions: change.deletions,
                    })
            })
            .collect()
    }

    /// Was `path` created by renaming another file in `commit`?
    #[must_use]
    pub fn renamed_from(&self, path: &str, commit: Oid) -> Option<RenameLink> {
        let indexed = &self.commits[*self.positions.get(&commit)?];
        indexed.changes.iter().find_map(|change| match change.status {
            ChangeStatus::Renamed { ref from } if change.path == path => Some(RenameLink {
                from: from.clone(),
                to: path.to_string(),
                commit: indexed.oid,
            }),
            _ => None,
        })
    }

    /// The first rename away from `path` in a commit newer than, and
    /// descending from, the commit at position `after`.
    ///
    /// Renames on branches that forked off before that commit belong to a
    /// different line of history and are ignored.
    #[must_use]
    pub fn renamed_to(&self, path: &str, after: usize) -> Option<RenameLink> {
        let origin = self.commits.get(after)?.oid;
        let newer = &self.commits[..after];
        newer.iter().rev().find_map(|indexed| {
            if !self.descends_from(indexed.oid, origin) {
                return None;
            }
            indexed.changes.iter().find_map(|change| match change.status {
                ChangeStatus::Renamed { ref from } if from == path => Some(RenameLink {
                    from: path.to_string(),
                    to: change.path.clone(),
                    commit: indexed.oid,
                }),
                _ => None,
            })
        })
    }
}

/// Diff a commit against its first parent (or the empty tree) with rename detection.
pub(crate) fn first_parent_diff<'r>(
    repo: &'r Repository,
    commit: &Commit<'_>,
) -> Result<Diff<'r>> {
    let commit_tree = commit.tree()?;
    let parent_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    let mut diff =
        repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), Some(&mut diff_opts))?;

    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true).rename_limit(RENAME_LIMIT);
    diff.find_similar(Some(&mut find_opts))?;

    Ok(diff)
}

fn file_changes(diff: &Diff<'_>, oid: Oid) -> Vec<FileChange> {
    let mut changes = Vec::with_capacity(diff.deltas().len());

    for (idx, delta) in diff.deltas().enumerate() {
        // Submodule pointers are not files.
        let is_submodule = |file: DiffFile<'_>| file.mode() == FileMode::Commit;
        if is_submodule(delta.new_file()) || is_submodule(delta.old_file()) {
            continue;
        }

        let (path, status) = match delta.status() {
            Delta::Added | Delta::Copied => (path_of(&delta.new_file()), ChangeStatus::Added),
            Delta::Deleted => (path_of(&delta.old_file()), ChangeStatus::Deleted),
            Delta::Modified | Delta::Typechange => {
                (path_of(&delta.new_file()), ChangeStatus::Modified)
            }
            Delta::Renamed => (
                path_of(&delta.new_file()),
                ChangeStatus::Renamed {
                    from: path_of(&delta.old_file()),
                },
            ),
            _ => continue,
        };

        if path.is_empty() {
            continue;
        }

        let line_stats = Patch::from_diff(diff, idx).and_then(|patch| match patch {
            Some(patch) => patch.line_stats().map(|(_, added, deleted)| (added, deleted)),
            // Binary content has no lines.
            None => Ok((0, 0)),
        });
        let (insertions, deletions) = match line_stats {
            Ok(counts) => counts,
            Err(err) => {
                warn!(
                    commit = %oid,
                    path = %path,
                    error = %err,
                    "skipping change without line stats"
                );
                continue;
            }
        };

        changes.push(FileChange {
            path,
            status,
            insertions,
            deletions,
        });
    }

    changes
}

fn path_of(file: &DiffFile<'_>) -> String {
    file.path()
        .unwrap_or(Path::new(""))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_repo::TestRepo;

    const ALICE: (&str, &str) = ("alice", "alice@example.com");

    fn five_lines() -> String {
        (1..=5)
            .map(|i| format!("original line number {i} of the file\n"))
            .collect()
    }

    #[test]
    fn rename_is_attributed_to_destination() {
        let repo = TestRepo::new();
        repo.write("a.txt", &five_lines());
        let c1 = repo.commit("add a", ALICE, 1_000);

        repo.rename("a.txt", "b.txt");
        let edited = five_lines().replace("number 3", "number three") + "an extra line\n";
        repo.write("b.txt", &edited);
        let c2 = repo.commit("rename a to b", ALICE, 2_000);

        let index = ChangeIndex::build(&repo.repo).unwrap();
        assert_eq!(index.len(), 2);

        let renamed = &index.commits()[0];
        assert_eq!(renamed.oid, c2);
        assert_eq!(
            renamed.changes,
            vec![FileChange {
                path: "b.txt".into(),
                status: ChangeStatus::Renamed {
                    from: "a.txt".into()
                },
                insertions: 2,
                deletions: 1,
            }]
        );

        let a_history = index.history("a.txt");
        assert_eq!(a_history.len(), 1);
        assert_eq!(a_history[0].commit, c1);
        assert_eq!((a_history[0].insertions, a_history[0].deletions), (5, 0));

        let link = index.renamed_from("b.txt", c2).unwrap();
        assert_eq!(link.from, "a.txt");
        assert_eq!(link.to, "b.txt");

        let forward = index.renamed_to("a.txt", a_history[0].position).unwrap();
        assert_eq!(forward.to, "b.txt");
        assert_eq!(forward.commit, c2);
    }

    #[test]
    fn deleted_files_keep_their_history() {
        let repo = TestRepo::new();
        repo.write("gone.rs", "fn main() {}\nfn helper() {}\n");
        repo.write("keep.rs", "fn keep() {}\n");
        repo.commit("add", ALICE, 1_000);
        repo.remove("gone.rs");
        repo.commit("remove", ALICE, 2_000);

        let index = ChangeIndex::build(&repo.repo).unwrap();
        let history = index.history("gone.rs");
        assert_eq!(history.len(), 2);
        assert_eq!((history[0].insertions, history[0].deletions), (0, 2));
        assert_eq!((history[1].insertions, history[1].deletions), (2, 0));
    }

    #[test]
    fn other_branches_are_indexed_and_merges_skipped() {
        let repo = TestRepo::new();
        repo.write("a.rs", "a\n");
        let root = repo.commit("root", ALICE, 1_000);
        repo.write("b.rs", "b\n");
        let side = repo.commit_to("refs/heads/side", &[root], "side", ALICE, 2_000);
        repo.write("a.rs", "a\nmore\n");
        let main = repo.commit_to("HEAD", &[root], "main", ALICE, 3_000);
        repo.commit_to("HEAD", &[main, side], "merge", ALICE, 4_000);

        let index = ChangeIndex::build(&repo.repo).unwrap();
        let oids: Vec<Oid> = index.commits().iter().map(|c| c.oid).collect();
        assert_eq!(oids, vec![main, side, root]);

        let counts = index.touch_counts();
        assert_eq!(counts["a.rs"], 2);
        assert_eq!(counts["b.rs"], 2);
    }

    #[test]
    fn rename_on_a_sibling_branch_is_not_a_successor() {
        let repo = TestRepo::new();
        repo.write("a.txt", &five_lines());
        let root = repo.commit("add a", ALICE, 1_000);
        repo.write("a.txt", &(five_lines() + "appended\n"));
        let tip = repo.commit("edit a", ALICE, 2_000);

        // Forked from the root, so it never saw "edit a".
        repo.rename("a.txt", "b.txt");
        let moved = repo.commit_to("refs/heads/sibling", &[root], "move a", ALICE, 3_000);

        let index = ChangeIndex::build(&repo.repo).unwrap();
        let oids: Vec<Oid> = index.commits().iter().map(|c| c.oid).collect();
        assert_eq!(oids, vec![moved, tip, root]);
        assert!(index.descends_from(moved, root));
        assert!(!index.descends_from(moved, tip));

        assert!(index.renamed_to("a.txt", 1).is_none());
        let from_root = index.renamed_to("a.txt", 2).unwrap();
        assert_eq!(from_root.commit, moved);
    }

    #[test]
    fn commit_totals_cover_every_file() {
        let repo = TestRepo::new();
        repo.write("a.rs", "a\n");
        repo.write("b.rs", "b\n");
        repo.commit("add", ALICE, 1_000);
        repo.write("a.rs", "a\nmore\n");
        repo.write("b.rs", "changed\n");
        let edit = repo.commit("edit", ALICE, 2_000);

        let index = ChangeIndex::build(&repo.repo).unwrap();
        let commit = index.commit(edit).unwrap();
        assert_eq!((commit.insertions, commit.deletions), (2, 1));
        assert_eq!(commit.changes.len(), 2);
        assert!(index.commit(Oid::zero()).is_none());
    }

    #[test]
    fn renamed_from_ignores_unrelated_commits() {
        let repo = TestRepo::new();
        repo.write("x.txt", &five_lines());
        let c1 = repo.commit("add x", ALICE, 1_000);

        let index = ChangeIndex::build(&repo.repo).unwrap();
        assert!(index.renamed_from("x.txt", c1).is_none());
        assert!(index.renamed_to("x.txt", 0).is_none());
        assert!(index.renamed_from("x.txt", Oid::zero()).is_none());
    }
}
