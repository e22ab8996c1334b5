//! Most-committed files and their rename-spanning histories.
//!
//! The files touched by the most commits are selected first. Each one is
//! then stitched to the paths it was renamed from and renamed to, so a
//! file that moved around is reported once with its whole history under
//! its newest name.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;

use gitlore_core::HotspotConfig;
use tracing::debug;

use crate::changes::{ChangeIndex, StatEntry};

/// Which files are eligible, and how many to keep.
///
/// # Examples
///
/// ```
/// use gitlore_core::HotspotConfig;
/// use gitlore_mining::hotspots::HotspotOptions;
///
/// let opts = HotspotOptions::from(&HotspotConfig::default());
/// assert_eq!(opts.max_files, 15);
/// assert!(opts.accepts("src/lib.rs"));
/// assert!(!opts.accepts("Cargo.lock"));
/// ```
#[derive(Debug, Clone)]
pub struct HotspotOptions {
    /// Maximum number of files to select.
    pub max_files: usize,
    /// Recognised extensions without the dot. Empty accepts every file.
    pub extensions: Vec<String>,
}

impl Default for HotspotOptions {
    fn default() -> Self {
        Self::from(&HotspotConfig::default())
    }
}

impl From<&HotspotConfig> for HotspotOptions {
    fn from(config: &HotspotConfig) -> Self {
        Self {
            max_files: config.max_files,
            extensions: config.extensions.clone(),
        }
    }
}

impl HotspotOptions {
    /// Whether `path` has a recognised extension.
    #[must_use]
    pub fn accepts(&self, path: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        Path::new(path)
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| self.extensions.iter().any(|known| known == ext))
    }
}

/// The reconciled history of one logical file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHistory {
    /// Newest path of the file.
    pub path: String,
    /// Older paths the file was renamed from, newest first.
    pub aliases: Vec<String>,
    /// Line counts per commit, newest first.
    pub entries: Vec<StatEntry>,
}

/// Select the most-committed files and reconcile their rename chains.
///
/// Candidates are ranked by the number of distinct commits touching them
/// (ties broken by path). Walking candidates in rank order, each one not
/// yet claimed by an earlier chain absorbs the paths it was renamed from
/// and then the paths it was renamed to. An absorbed path is never
/// reported on its own.
///
/// # Examples
///
/// ```
/// use git2::Oid;
/// use gitlore_mining::changes::{ChangeIndex, ChangeStatus, FileChange, IndexedCommit};
/// use gitlore_mining::hotspots::{track_hotspots, HotspotOptions};
///
/// let index = ChangeIndex::from_commits(vec![IndexedCommit {
///     oid: Oid::from_bytes(&[1; 20]).unwrap(),
///     parents: Vec::new(),
///     insertions: 3,
///     deletions: 0,
///     changes: vec![FileChange {
///         path: "main.rs".into(),
///         status: ChangeStatus::Added,
///         insertions: 3,
///         deletions: 0,
///     }],
/// }]);
/// let files = track_hotspots(&index, &HotspotOptions::default());
/// assert_eq!(files.len(), 1);
/// assert_eq!(files[0].path, "main.rs");
/// ```
pub fn track_hotspots(index: &ChangeIndex, options: &HotspotOptions) -> Vec<FileHistory> {
    let candidates = select_candidates(index, options);
    debug!(candidates = candidates.len(), "hotspot candidates selected");

    let mut arena = Arena::new(index);
    let mut canonical = Vec::with_capacity(candidates.len());

    for path in &candidates {
        let id = arena.record(path);
        if arena.records[id].state != State::Free {
            continue;
        }
        arena.records[id].state = State::Canonical;
        arena.absorb_predecessors(id);
        arena.absorb_successors(id);
        canonical.push(id);
    }

    canonical
        .into_iter()
        .map(|id| {
            let record = &mut arena.records[id];
            let mut chain = std::mem::take(&mut record.chain);
            let path = chain.remove(0);
            FileHistory {
                path,
                aliases: chain,
                entries: std::mem::take(&mut record.entries),
            }
        })
        .collect()
}

/// Paths ranked by commit count, truncated to `max_files`.
fn select_candidates(index: &ChangeIndex, options: &HotspotOptions) -> Vec<String> {
    let mut counted: Vec<(&str, usize)> = index
        .touch_counts()
        .into_iter()
        .filter(|(path, _)| options.accepts(path))
        .collect();
    counted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    counted.truncate(options.max_files);
    counted.into_iter().map(|(path, _)| path.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Free,
    Canonical,
    Absorbed,
}

#[derive(Debug)]
struct FileRecord {
    /// Every path of the chain, newest first.
    chain: Vec<String>,
    entries: Vec<StatEntry>,
    state: State,
}

struct Arena<'a> {
    index: &'a ChangeIndex,
    records: Vec<FileRecord>,
    by_path: HashMap<String, usize>,
}

impl<'a> Arena<'a> {
    fn new(index: &'a ChangeIndex) -> Self {
        Self {
            index,
            records: Vec::new(),
            by_path: HashMap::new(),
        }
    }

    /// The record for `path`, fetching its history on first use.
    fn record(&mut self, path: &str) -> usize {
        if let Some(&id) = self.by_path.get(path) {
            return id;
        }
        let id = self.records.len();
        self.records.push(FileRecord {
            chain: vec![path.to_string()],
            entries: self.index.history(path),
            state: State::Free,
        });
        self.by_path.insert(path.to_string(), id);
        id
    }

    /// Claim a free record, or `None` if another chain already owns it.
    fn absorb(&mut self, id: usize) -> Option<FileRecord> {
        let record = &mut self.records[id];
        if record.state != State::Free {
            return None;
        }
        record.state = State::Absorbed;
        Some(FileRecord {
            chain: std::mem::take(&mut record.chain),
            entries: std::mem::take(&mut record.entries),
            state: State::Absorbed,
        })
    }

    /// Follow renames back in time from the oldest entry.
    fn absorb_predecessors(&mut self, id: usize) {
        loop {
            let record = &self.records[id];
            let (Some(oldest), Some(tail)) = (record.entries.last(), record.chain.last()) else {
                return;
            };
            let Some(link) = self.index.renamed_from(tail, oldest.commit) else {
                return;
            };
            let source = self.record(&link.from);
            let Some(absorbed) = self.absorb(source) else {
                return;
            };
            debug!(
                from = %link.from,
                to = %link.to,
                commit = %link.commit,
                "absorbed rename source"
            );

            let record = &mut self.records[id];
            record.entries.extend(absorbed.entries);
            record.chain.extend(absorbed.chain);
        }
    }

    /// Follow renames forward in time from the newest entry.
    fn absorb_successors(&mut self, id: usize) {
        loop {
            let record = &self.records[id];
            let (Some(newest), Some(head)) = (record.entries.first(), record.chain.first()) else {
                return;
            };
            let newest_commit = newest.commit;
            let Some(link) = self.index.renamed_to(head, newest.position) else {
                return;
            };
            let destination = self.record(&link.to);
            let Some(mut absorbed) = self.absorb(destination) else {
                return;
            };
            debug!(
                from = %link.from,
                to = %link.to,
                commit = %link.commit,
                "absorbed rename destination"
            );

            // A commit that touched both paths is kept once.
            if absorbed.entries.last().map(|entry| entry.commit) == Some(newest_commit) {
                absorbed.entries.pop();
            }
            let record = &mut self.records[id];
            absorbed.entries.append(&mut record.entries);
            absorbed.chain.append(&mut record.chain);
            record.entries = absorbed.entries;
            record.chain = absorbed.chain;
        }
    }
}
