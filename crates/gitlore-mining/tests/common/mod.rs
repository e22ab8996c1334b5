use std::path::Path;

use git2::{IndexAddOption, Oid, Repository, Signature, Time};
use tempfile::TempDir;

/// A scratch repository committed to with fixed signatures.
pub struct Scratch {
    pub dir: TempDir,
    repo: Repository,
}

#[allow(dead_code)]
impl Scratch {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, path: &str, content: &str) {
        let full = self.dir.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    pub fn remove(&self, path: &str) {
        std::fs::remove_file(self.dir.path().join(path)).unwrap();
    }

    pub fn rename(&self, from: &str, to: &str) {
        let dest = self.dir.path().join(to);
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::rename(self.dir.path().join(from), dest).unwrap();
    }

    /// Commit everything in the working tree on top of HEAD.
    pub fn commit(&self, message: &str, author: (&str, &str), seconds: i64) -> Oid {
        let parents: Vec<Oid> = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.target())
            .into_iter()
            .collect();
        self.commit_to("HEAD", &parents, message, author, seconds)
    }

    pub fn commit_to(
        &self,
        update_ref: &str,
        parents: &[Oid],
        message: &str,
        (name, email): (&str, &str),
        seconds: i64,
    ) -> Oid {
        let mut index = self.repo.index().unwrap();
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .unwrap();
        index.update_all(["*"].iter(), None).unwrap();
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();

        let sig = Signature::new(name, email, &Time::new(seconds, 0)).unwrap();
        let parents: Vec<git2::Commit<'_>> = parents
            .iter()
            .map(|oid| self.repo.find_commit(*oid).unwrap())
            .collect();
        let parents: Vec<&git2::Commit<'_>> = parents.iter().collect();

        self.repo
            .commit(Some(update_ref), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }
}

/// `n` lines long enough that a one-line edit keeps the file similar.
pub fn numbered_lines(n: usize) -> String {
    (1..=n)
        .map(|i| format!("this is line number {i} of a reasonably long file\n"))
        .collect()
}
