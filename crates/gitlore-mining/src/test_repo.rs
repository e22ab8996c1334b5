//! Throwaway repositories with deterministic signatures for unit tests.

use git2::{IndexAddOption, Oid, Repository, Signature, Time};
use tempfile::TempDir;

pub(crate) struct TestRepo {
    pub dir: TempDir,
    pub repo: Repository,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { dir, repo }
    }

    pub fn write(&self, path: &str, content: &str) {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }

    pub fn remove(&self, path: &str) {
        std::fs::remove_file(self.dir.path().join(path)).unwrap();
    }

    pub fn rename(&self, from: &str, to: &str) {
        let dest = self.dir.path().join(to);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::rename(self.dir.path().join(from), dest).unwrap();
    }

    /// Commit the working tree on top of HEAD.
    pub fn commit(&self, message: &str, author: (&str, &str), seconds: i64) -> Oid {
        self.commit_at(message, author, seconds, 0)
    }

    /// Commit the working tree on top of HEAD with an explicit UTC offset.
    pub fn commit_at(
        &self,
        message: &str,
        author: (&str, &str),
        seconds: i64,
        offset_minutes: i32,
    ) -> Oid {
        let parents: Vec<Oid> = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.target())
            .into_iter()
            .collect();
        self.commit_full("HEAD", &parents, message, author, seconds, offset_minutes)
    }

    /// Commit the working tree to `update_ref` with explicit parents.
    pub fn commit_to(
        &self,
        update_ref: &str,
        parents: &[Oid],
        message: &str,
        author: (&str, &str),
        seconds: i64,
    ) -> Oid {
        self.commit_full(update_ref, parents, message, author, seconds, 0)
    }

    fn commit_full(
        &self,
        update_ref: &str,
        parents: &[Oid],
        message: &str,
        (name, email): (&str, &str),
        seconds: i64,
        offset_minutes: i32,
    ) -> Oid {
        let mut index = self.repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.update_all(["*"].iter(), None).unwrap();
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();

        let sig = Signature::new(name, email, &Time::new(seconds, offset_minutes)).unwrap();
        let parent_commits: Vec<git2::Commit<'_>> = parents
            .iter()
            .map(|oid| self.repo.find_commit(*oid).unwrap())
            .collect();
        let parent_refs: Vec<&git2::Commit<'_>> = parent_commits.iter().collect();

        self.repo
            .commit(Some(update_ref), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }
}
