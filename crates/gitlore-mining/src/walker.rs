//! Commit graph traversal.
//!
//! Walks the history reachable from HEAD (or a configured branch) in
//! reverse-chronological order, skips merge commits, and extracts one
//! record per remaining commit with its first-parent line counts and the
//! author's local time of day and week. Line counts come from the
//! [`ChangeIndex`], which has already diffed every indexed commit.

use chrono::{DateTime, Datelike, FixedOffset, Offset, SecondsFormat, Timelike, Utc};
use git2::{Repository, Sort};
use gitlore_core::{GitloreError, Result};
use tracing::{debug, warn};

use crate::changes::{first_parent_diff, ChangeIndex};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Raw commit data extracted during the walk.
///
/// The author is recorded exactly as signed; identity resolution happens
/// later, once the final commit ordering is known.
///
/// # Examples
///
/// ```
/// use chrono::DateTime;
/// use gitlore_mining::walker::WalkedCommit;
///
/// let commit = WalkedCommit {
///     sha: "abc123".into(),
///     message: "fix: auth bug".into(),
///     author_name: "alice".into(),
///     author_email: "alice@example.com".into(),
///     time: DateTime::parse_from_rfc3339("2024-03-04T09:30:00+01:00").unwrap(),
///     insertions: 10,
///     deletions: 2,
///     is_root: false,
/// };
/// assert_eq!(commit.local_day_minutes(), 570);
/// assert_eq!(commit.local_week_minutes(), 570);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedCommit {
    /// Full commit hash.
    pub sha: String,
    /// First line of the commit message.
    pub message: String,
    /// Author name as recorded in the commit.
    pub author_name: String,
    /// Author email as recorded in the commit.
    pub author_email: String,
    /// Author timestamp in the author's own UTC offset.
    pub time: DateTime<FixedOffset>,
    /// Lines added relative to the first parent.
    pub insertions: usize,
    /// Lines removed relative to the first parent.
    pub deletions: usize,
    /// Whether the commit has no parent.
    pub is_root: bool,
}

impl WalkedCommit {
    /// ISO-8601 timestamp with the author's offset, e.g. `2024-03-04T09:30:00+01:00`.
    #[must_use]
    pub fn time_string(&self) -> String {
        format_time(&self.time)
    }

    /// Minutes elapsed since local midnight.
    #[must_use]
    pub fn local_day_minutes(&self) -> u32 {
        local_day_minutes(&self.time)
    }

    /// Minutes elapsed since local Monday midnight.
    #[must_use]
    pub fn local_week_minutes(&self) -> u32 {
        local_week_minutes(&self.time)
    }
}

/// Result of a commit walk.
#[derive(Debug, Clone, Default)]
pub struct CommitWalk {
    /// Non-merge commits in traversal order (newest first).
    pub commits: Vec<WalkedCommit>,
    /// Number of merge commits that were skipped.
    pub merges_skipped: usize,
}

/// Options for the commit walk.
///
/// # Examples
///
/// ```
/// use gitlore_mining::walker::WalkOptions;
///
/// let opts = WalkOptions::default();
/// assert!(opts.branch.is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
}

/// Walk the commit graph and extract one record per non-merge commit.
///
/// Per-commit line totals are read from `index`; a commit the index does
/// not hold is diffed on the spot.
///
/// # Errors
///
/// Returns [`GitloreError::InvalidReference`] if HEAD or the requested
/// branch cannot be resolved, and [`GitloreError::Git`] if the object
/// database cannot be read. Any error aborts the whole walk.
///
/// # Examples
///
/// ```no_run
/// use git2::Repository;
/// use gitlore_mining::changes::ChangeIndex;
/// use gitlore_mining::walker::{walk_commits, WalkOptions};
///
/// let repo = Repository::open(".").unwrap();
/// let index = ChangeIndex::build(&repo).unwrap();
/// let walk = walk_commits(&repo, &WalkOptions::default(), &index).unwrap();
/// for c in &walk.commits {
///     println!("{}: {} ({})", &c.sha[..7], c.message, c.author_name);
/// }
/// ```
pub fn walk_commits(
    repo: &Repository,
    options: &WalkOptions,
    index: &ChangeIndex,
) -> Result<CommitWalk> {
    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TIME)?;

    if let Some(ref branch) = options.branch {
        let oid = repo
            .resolve_reference_from_short_name(branch)
            .ok()
            .and_then(|reference| reference.peel_to_commit().ok())
            .map(|commit| commit.id())
            .ok_or_else(|| GitloreError::InvalidReference {
                reference: branch.clone(),
            })?;
        revwalk.push(oid)?;
    } else {
        revwalk
            .push_head()
            .map_err(|_| GitloreError::InvalidReference {
                reference: "HEAD".into(),
            })?;
    }

    let mut walk = CommitWalk::default();

    for oid_result in revwalk {
        let oid = oid_result?;
        let commit = repo.find_commit(oid)?;

        if commit.parent_count() > 1 {
            walk.merges_skipped += 1;
            continue;
        }

        let is_root = commit.parent_count() == 0;
        let (insertions, deletions) = if is_root {
            (0, 0)
        } else if let Some(indexed) = index.commit(oid) {
            (indexed.insertions, indexed.deletions)
        } else {
            debug!(commit = %oid, "commit missing from change index");
            let stats = first_parent_diff(repo, &commit)?.stats()?;
            (stats.insertions(), stats.deletions())
        };

        let author = commit.author();
        walk.commits.push(WalkedCommit {
            sha: oid.to_string(),
            message: String::from_utf8_lossy(commit.message_bytes())
                .lines()
                .next()
                .unwrap_or("")
                .to_string(),
            author_name: String::from_utf8_lossy(author.name_bytes()).into_owned(),
            author_email: String::from_utf8_lossy(author.email_bytes()).into_owned(),
            time: author_time(&author.when()),
            insertions,
            deletions,
            is_root,
        });
    }

    debug!(
        commits = walk.commits.len(),
        merges_skipped = walk.merges_skipped,
        "commit walk finished"
    );

    Ok(walk)
}

/// Interpret a git timestamp in its own UTC offset, not the host's.
///
/// An offset chrono cannot represent falls back to UTC, and a timestamp
/// outside chrono's range falls back to the epoch.
pub fn author_time(when: &git2::Time) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(when.offset_minutes() * 60).unwrap_or_else(|| Utc.fix());
    let utc = DateTime::from_timestamp(when.seconds(), 0).unwrap_or_else(|| {
        warn!(seconds = when.seconds(), "author time out of range, using the epoch");
        DateTime::default()
    });
    utc.with_timezone(&offset)
}

/// Format a timestamp as ISO-8601 with an explicit offset.
pub fn format_time(time: &DateTime<FixedOffset>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Minutes elapsed since local midnight.
pub fn local_day_minutes(time: &DateTime<FixedOffset>) -> u32 {
    time.hour() * 60 + time.minute()
}

/// Minutes elapsed since local Monday midnight.
pub fn local_week_minutes(time: &DateTime<FixedOffset>) -> u32 {
    time.weekday().num_days_from_monday() * MINUTES_PER_DAY + local_day_minutes(time)
}
