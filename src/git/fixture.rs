//! Throwaway repositories for tests

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use crate::core::util::command_exists;
use crate::git::repository::Repository;

pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// A fresh repository on branch `main`, or None when git is not installed
    pub fn new() -> Option<Self> {
        if !command_exists("git") {
            return None;
        }
        let repo = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        repo.git(&["init", "-q"]);
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        Some(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn open(&self) -> Repository {
        Repository::open(self.path(), "git").unwrap()
    }

    pub fn git(&self, args: &[&str]) -> String {
        self.git_as("Test User", "test@example.com", args)
    }

    pub fn git_as(&self, name: &str, email: &str, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .env("GIT_AUTHOR_NAME", name)
            .env("GIT_AUTHOR_EMAIL", email)
            .env("GIT_COMMITTER_NAME", name)
            .env("GIT_COMMITTER_EMAIL", email)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_CONFIG_GLOBAL", "/dev/null")
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    pub fn write(&self, relpath: &str, content: &str) {
        let path = self.path().join(relpath);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Write one file and commit it; returns the new HEAD ID
    pub fn commit_file(&self, relpath: &str, content: &str, message: &str) -> String {
        self.write(relpath, content);
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", message]);
        self.git(&["rev-parse", "HEAD"]).trim().to_string()
    }
}
