//! Commit history mining: commits, author identities, and rename-aware hotspots.
//!
//! Walks a repository with git2, clusters author name/email variants into
//! identities, follows the most-committed files across renames, and
//! summarizes line counts into a single serializable [`Report`].

pub mod authors;
pub mod changes;
pub mod hotspots;
pub mod report;
pub mod summary;
pub mod walker;

#[cfg(test)]
mod test_repo;

pub use report::{analyze, Report};
