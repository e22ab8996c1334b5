//! The analysis document and the pipeline that produces it.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use git2::Repository;
use gitlore_core::{GitloreConfig, GitloreError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::authors::{split_cohorts, AuthorDescription, AuthorIdentity, IdentityResolver};
use crate::changes::ChangeIndex;
use crate::hotspots::{track_hotspots, FileHistory, HotspotOptions};
use crate::summary::{summarize, LineStats, PercentileOptions};
use crate::walker::{walk_commits, CommitWalk, WalkOptions};

/// One commit as it appears in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// First line of the commit message.
    pub message: String,
    /// Canonical name of the resolved author.
    pub name: String,
    /// Full commit hash.
    pub sha: String,
    /// Canonical email of the resolved author.
    pub email: String,
    /// ISO-8601 author time with offset.
    pub time: String,
    /// Minutes since local midnight.
    pub local_day_minutes: u32,
    /// Minutes since local Monday midnight.
    pub local_weekday_minutes: u32,
    /// Lines added relative to the first parent.
    pub insertions: usize,
    /// Lines removed relative to the first parent.
    pub deletions: usize,
}

/// One commit's line counts for a hotspot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatEntry {
    /// Lines added to the file.
    pub insertions: usize,
    /// Lines removed from the file.
    pub deletions: usize,
    /// Position of the commit in [`Report::commits`].
    pub commit_index: usize,
    /// Path the file is reported under.
    pub file: String,
}

/// A hotspot file with its merged history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotspotFile {
    /// Newest path of the file within the walked history.
    pub file: String,
    /// Stat entries, newest first.
    pub commits: Vec<FileStatEntry>,
    /// Authors who touched the file, most active first.
    pub authors: Vec<AuthorDescription>,
}

/// The full analysis of one repository.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use gitlore_core::GitloreConfig;
/// use gitlore_mining::report::analyze;
///
/// let report = analyze(Path::new("."), &GitloreConfig::default()).unwrap();
/// println!("{}", serde_json::to_string_pretty(&report).unwrap());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Commits, newest first.
    pub commits: Vec<CommitRecord>,
    /// Main author cohort.
    pub authors: Vec<AuthorDescription>,
    /// Long-tail author cohort.
    pub low_commit_authors: Vec<AuthorDescription>,
    /// Earliest and latest commit time; empty without commits.
    pub time_extent: Vec<String>,
    /// Every commit time, ascending.
    pub times: Vec<String>,
    /// Summary of per-commit line counts, root commits excluded.
    pub line_stats: LineStats,
    /// Summary of per-file line counts over the hotspot files.
    pub filestats_line_stats: LineStats,
    /// Hotspot files, most committed first.
    pub files_with_max_commits: Vec<HotspotFile>,
}

/// Mine the repository at `path`.
///
/// # Errors
///
/// Returns [`GitloreError::RepositoryNotFound`] if no repository can be
/// opened at `path`, [`GitloreError::InvalidReference`] if the start
/// reference does not resolve, and [`GitloreError::Git`] if history
/// cannot be read. No partial report is produced.
pub fn analyze(path: &Path, config: &GitloreConfig) -> Result<Report> {
    let started = Instant::now();

    let repo = Repository::open(path).map_err(|err| {
        debug!(path = %path.display(), error = %err, "cannot open repository");
        GitloreError::RepositoryNotFound {
            path: path.display().to_string(),
        }
    })?;
    info!(path = %path.display(), "repository opened");

    let index = ChangeIndex::build(&repo)?;
    let walk = walk_commits(
        &repo,
        &WalkOptions {
            branch: config.walk.branch.clone(),
        },
        &index,
    )?;
    info!(
        commits = walk.commits.len(),
        merges_skipped = walk.merges_skipped,
        "commits walked"
    );

    let hotspots = track_hotspots(&index, &HotspotOptions::from(&config.hotspots));

    let report = assemble(walk, &hotspots, config);
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "time to analyze"
    );
    Ok(report)
}

fn assemble(walk: CommitWalk, hotspots: &[FileHistory], config: &GitloreConfig) -> Report {
    let walked = walk.commits;
    let percentile = PercentileOptions::from(&config.stats);

    // `order[k]` is the walk position of the k-th newest commit.
    let mut order: Vec<usize> = (0..walked.len()).collect();
    order.sort_by_cached_key(|&i| Reverse(walked[i].time_string()));
    let mut sorted_index = vec![0; walked.len()];
    for (k, &i) in order.iter().enumerate() {
        sorted_index[i] = k;
    }

    let mut resolver = IdentityResolver::new();
    let identity_of: Vec<usize> = walked
        .iter()
        .enumerate()
        .map(|(i, c)| resolver.resolve(&c.author_name, &c.author_email, sorted_index[i]))
        .collect();
    let identities = resolver.into_identities();

    let commits: Vec<CommitRecord> = order
        .iter()
        .map(|&i| {
            let commit = &walked[i];
            let identity = &identities[identity_of[i]];
            CommitRecord {
                message: commit.message.clone(),
                name: identity.name().to_string(),
                sha: commit.sha.clone(),
                email: identity.email().to_string(),
                time: commit.time_string(),
                local_day_minutes: commit.local_day_minutes(),
                local_weekday_minutes: commit.local_week_minutes(),
                insertions: commit.insertions,
                deletions: commit.deletions,
            }
        })
        .collect();
    let author_by_commit: Vec<usize> = order.iter().map(|&i| identity_of[i]).collect();

    let sampled: Vec<_> = walked.iter().filter(|c| !c.is_root).collect();
    let insertions: Vec<usize> = sampled.iter().map(|c| c.insertions).collect();
    let deletions: Vec<usize> = sampled.iter().map(|c| c.deletions).collect();
    let line_stats = summarize(&insertions, &deletions, &percentile);

    let times: Vec<String> = commits.iter().rev().map(|c| c.time.clone()).collect();
    let time_extent = match (times.first(), times.last()) {
        (Some(earliest), Some(latest)) => vec![earliest.clone(), latest.clone()],
        _ => Vec::new(),
    };

    let cohorts = split_cohorts(&identities, &config.authors);
    let describe = |ids: &[usize]| -> Vec<AuthorDescription> {
        ids.iter().map(|&id| identities[id].description()).collect()
    };

    let commit_index: HashMap<&str, usize> = commits
        .iter()
        .enumerate()
        .map(|(k, c)| (c.sha.as_str(), k))
        .collect();
    let files_with_max_commits: Vec<HotspotFile> = hotspots
        .iter()
        .filter_map(|history| hotspot_file(history, &commit_index, &author_by_commit, &identities))
        .collect();

    let (file_insertions, file_deletions): (Vec<usize>, Vec<usize>) = files_with_max_commits
        .iter()
        .flat_map(|file| &file.commits)
        .map(|entry| (entry.insertions, entry.deletions))
        .unzip();
    let filestats_line_stats = summarize(&file_insertions, &file_deletions, &percentile);

    Report {
        authors: describe(&cohorts.main),
        low_commit_authors: describe(&cohorts.long_tail),
        commits,
        time_extent,
        times,
        line_stats,
        filestats_line_stats,
        files_with_max_commits,
    }
}

/// Resolve a file history against the final commit order.
///
/// Entries for commits outside the walked history are dropped, and a file
/// left without entries is not reported. The file is reported under the
/// path of its newest remaining entry, so a rename made only on another
/// branch does not rename it.
fn hotspot_file(
    history: &FileHistory,
    commit_index: &HashMap<&str, usize>,
    author_by_commit: &[usize],
    identities: &[AuthorIdentity],
) -> Option<HotspotFile> {
    let mut kept = Vec::with_capacity(history.entries.len());
    for entry in &history.entries {
        let sha = entry.commit.to_string();
        match commit_index.get(sha.as_str()) {
            Some(&index) => kept.push((entry, index)),
            None => {
                debug!(
                    file = %history.path,
                    commit = %sha,
                    "dropping stat entry outside the walked history"
                );
            }
        }
    }
    let Some(&(newest, _)) = kept.first() else {
        debug!(file = %history.path, "hotspot has no walked commits");
        return None;
    };
    let file = newest.path.clone();
    if file != history.path {
        debug!(file = %file, newest = %history.path, "reporting hotspot under its walked path");
    }

    let commits: Vec<FileStatEntry> = kept
        .into_iter()
        .map(|(entry, index)| FileStatEntry {
            insertions: entry.insertions,
            deletions: entry.deletions,
            commit_index: index,
            file: file.clone(),
        })
        .collect();

    let mut author_ids: Vec<usize> = Vec::new();
    for entry in &commits {
        let id = author_by_commit[entry.commit_index];
        if !author_ids.contains(&id) {
            author_ids.push(id);
        }
    }
    author_ids.sort_by_key(|&id| {
        (
            Reverse(identities[id].commit_count()),
            identities[id].first_commit_index(),
        )
    });

    let authors: Vec<AuthorDescription> = author_ids
        .iter()
        .map(|&id| identities[id].description())
        .collect();
    debug!(
        file = %file,
        aliases = ?history.aliases,
        authors = ?authors.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
        "hotspot file"
    );

    Some(HotspotFile {
        file,
        commits,
        authors,
    })
}
