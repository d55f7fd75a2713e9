//! Repository handle
//!
//! Owns the working directory, the git binary to invoke and a lookup cache of
//! parsed commit objects. Cloning is cheap; clones share the cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::core::error::{GitError, Result};
use crate::core::frame;
use crate::git::command::GitCommand;
use crate::git::commit::{Commit, RawCommit};
use crate::git::object::ObjectId;

/// Default page size for paginated history listings
pub const COMMITS_RANGE_SIZE: usize = 50;

#[derive(Debug)]
struct RepoInner {
    path: PathBuf,
    git: String,
    commits: Mutex<HashMap<ObjectId, Arc<RawCommit>>>,
}

/// A git repository queried through the git binary
#[derive(Debug, Clone)]
pub struct Repository {
    inner: Arc<RepoInner>,
}

impl Repository {
    /// Open the repository containing `path`, failing with NotFound if git
    /// does not recognise it as one.
    pub fn open(path: impl AsRef<Path>, git: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let git = git.into();

        let is_repo = GitCommand::new(git.clone())
            .args(["rev-parse", "--git-dir"])
            .succeeds_in_dir(&path)?;
        if !is_repo {
            return Err(GitError::not_found(format!(
                "git repository at {}",
                path.display()
            )));
        }

        Ok(Self {
            inner: Arc::new(RepoInner {
                path,
                git,
                commits: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Start a git invocation with this repository's binary
    pub fn command<I, S>(&self, args: I) -> GitCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GitCommand::new(self.inner.git.clone()).args(args)
    }

    /// Run a buffered invocation in the repository directory
    pub fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command(args).run_in_dir(self.path())
    }

    /// Resolve any revision expression to a commit ID
    pub fn resolve_commit_id(&self, rev: &str) -> Result<ObjectId> {
        let stdout = self
            .command(["rev-parse", "--verify", "--quiet", "--end-of-options"])
            .arg(format!("{}^{{commit}}", rev))
            .run_in_dir_allow_empty(self.path())?;
        if stdout.trim().is_empty() {
            return Err(GitError::not_found(format!("commit {:?}", rev)));
        }
        stdout.parse()
    }

    /// Look up a commit by revision (ID, branch, tag, `HEAD~2`, ...)
    pub fn get_commit(&self, rev: &str) -> Result<Commit> {
        let id = self.resolve_commit_id(rev)?;
        self.get_commit_by_id(&id)
    }

    /// Look up a commit by ID, consulting the cache first
    pub fn get_commit_by_id(&self, id: &ObjectId) -> Result<Commit> {
        let cached = self
            .inner
            .commits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned();

        let raw = match cached {
            Some(raw) => raw,
            None => {
                let stdout = self.run(["cat-file", "commit", id.as_str()])?;
                let raw = Arc::new(RawCommit::parse(&stdout)?);
                self.inner
                    .commits
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(id.clone(), Arc::clone(&raw));
                raw
            }
        };

        Ok(Commit::new(self.clone(), id.clone(), raw))
    }

    /// Turn a newline-separated list of IDs into commits, in order
    fn parse_commit_list(&self, stdout: &str) -> Result<Vec<Commit>> {
        frame::lines(stdout)
            .into_iter()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| self.get_commit_by_id(&line.parse()?))
            .collect()
    }

    /// Number of commits reachable from `revision`, optionally only those
    /// touching `relpath`
    pub fn commits_count(&self, revision: &str, relpath: Option<&str>) -> Result<i64> {
        let mut cmd = self.command(["rev-list", "--count", revision]);
        if let Some(relpath) = relpath.filter(|p| !p.is_empty()) {
            cmd = cmd.args(["--", relpath]);
        }
        let stdout = cmd.run_in_dir(self.path())?;
        stdout
            .trim()
            .parse()
            .map_err(|_| GitError::ParseFailure(format!("commit count {:?}", stdout.trim())))
    }

    /// One page of history starting at `revision`; `page` is 1-based
    pub fn commits_by_range_size(&self, revision: &str, page: usize, size: usize) -> Result<Vec<Commit>> {
        if page == 0 || size == 0 {
            return Err(GitError::InvalidOptions(
                "page and size must be at least 1".to_string(),
            ));
        }
        let stdout = self.run([
            "log".to_string(),
            revision.to_string(),
            format!("--skip={}", (page - 1) * size),
            format!("--max-count={}", size),
            "--pretty=format:%H".to_string(),
        ])?;
        self.parse_commit_list(&stdout)
    }

    pub fn commits_by_range(&self, revision: &str, page: usize) -> Result<Vec<Commit>> {
        self.commits_by_range_size(revision, page, COMMITS_RANGE_SIZE)
    }

    /// All commits reachable from `id`, including `id` itself
    pub fn commits_before(&self, id: &ObjectId) -> Result<Vec<Commit>> {
        let stdout = self.run(["log", "--pretty=format:%H", id.as_str()])?;
        self.parse_commit_list(&stdout)
    }

    /// At most `limit` commits reachable from `id`
    pub fn commits_before_limit(&self, id: &ObjectId, limit: usize) -> Result<Vec<Commit>> {
        let stdout = self.run([
            "log".to_string(),
            format!("--max-count={}", limit),
            "--pretty=format:%H".to_string(),
            id.to_string(),
        ])?;
        self.parse_commit_list(&stdout)
    }

    /// Commits reachable from `last` but not from `before`: the half-open
    /// range `(before, last]`. Without `before`, everything reachable from
    /// `last`.
    pub fn commits_between(&self, last: &Commit, before: Option<&Commit>) -> Result<Vec<Commit>> {
        let range = match before {
            Some(before) => format!("{}..{}", before.id, last.id),
            None => last.id.to_string(),
        };
        let stdout = self.run(["rev-list".to_string(), range])?;
        self.parse_commit_list(&stdout)
    }

    /// Commits reachable from `id` whose message contains `keyword`,
    /// case-insensitively
    pub fn search_commits(&self, id: &ObjectId, keyword: &str) -> Result<Vec<Commit>> {
        let stdout = self.run([
            "log".to_string(),
            id.to_string(),
            "-i".to_string(),
            "--fixed-strings".to_string(),
            format!("--grep={}", keyword),
            "--pretty=format:%H".to_string(),
        ])?;
        self.parse_commit_list(&stdout)
    }

    /// Names of files that differ between two revisions
    pub fn files_changed(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let stdout = self.run(["diff", "--name-only", from, to, "--"])?;
        Ok(frame::lines(&stdout)
            .into_iter()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Most recent commit reachable from `id` that touched `relpath`
    pub fn commit_by_path_with_id(&self, id: &ObjectId, relpath: &str) -> Result<Commit> {
        let stdout = self.run(["log", "-1", "--pretty=format:%H", id.as_str(), "--", relpath])?;
        let last = stdout.trim();
        if last.is_empty() {
            return Err(GitError::not_found(format!("commit touching {:?}", relpath)));
        }
        self.get_commit_by_id(&last.parse()?)
    }

    /// Contents of the blob at `relpath` in `commit`'s tree, as text
    pub fn blob_at_path(&self, commit: &ObjectId, relpath: &str) -> Result<String> {
        let blob = self.blob_bytes_at_path(commit, relpath)?;
        Ok(String::from_utf8_lossy(&blob).into_owned())
    }

    /// Raw contents of the blob at `relpath` in `commit`'s tree
    pub fn blob_bytes_at_path(&self, commit: &ObjectId, relpath: &str) -> Result<Vec<u8>> {
        let listing = self.run(["ls-tree", commit.as_str(), "--", relpath])?;

        // `<mode> SP <type> SP <id> TAB <path>`
        let entry = frame::lines(&listing)
            .into_iter()
            .find_map(|line| {
                let (meta, path) = frame::split_pair(line, '\t')?;
                let parts = frame::fields(meta);
                (path == relpath && parts.len() == 3 && parts[1] == "blob").then(|| parts[2].to_string())
            })
            .ok_or_else(|| GitError::not_found(format!("{} at {}", relpath, commit.short())))?;

        debug!(blob = %entry, "reading {}", relpath);
        self.command(["cat-file", "blob", entry.as_str()])
            .run_bytes_in_dir(self.path())
    }

    /// Number of cached commit objects
    pub fn cached_commits(&self) -> usize {
        self.inner
            .commits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
