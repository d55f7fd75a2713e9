//! Commit model and parent-chain navigation

use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::core::error::{GitError, Result};
use crate::core::model::{Kind, ResultItem, Source};
use crate::git::object::{ObjectId, Signature};
use crate::git::repository::Repository;
use crate::git::status::CommitFileStatus;
use crate::git::submodule::SubModule;

/// Parsed `git cat-file commit` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommit {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl RawCommit {
    /// Parse a raw commit object: header lines, a blank line, then the message.
    /// Continuation lines (multi-line `gpgsig`, `mergetag`) and unknown headers
    /// are skipped.
    pub fn parse(text: &str) -> Result<Self> {
        let (headers, message) = text.split_once("\n\n").unwrap_or((text, ""));

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for line in headers.lines() {
            if line.starts_with(' ') {
                continue;
            }
            let Some((key, value)) = line.split_once(' ') else {
                continue;
            };
            match key {
                "tree" => tree = Some(value.parse()?),
                "parent" => parents.push(value.parse()?),
                "author" => author = Some(Signature::parse(value)?),
                "committer" => committer = Some(Signature::parse(value)?),
                _ => {}
            }
        }

        let missing = |header: &str| GitError::ParseFailure(format!("commit object without {} header", header));
        Ok(Self {
            tree: tree.ok_or_else(|| missing("tree"))?,
            parents,
            author: author.ok_or_else(|| missing("author"))?,
            committer: committer.ok_or_else(|| missing("committer"))?,
            message: message.to_string(),
        })
    }
}

/// Bytes of a blob inspected when sniffing its type
const SNIFF_LEN: usize = 1024;

/// Whether the leading bytes of a blob carry a known image signature
pub fn is_image_data(data: &[u8]) -> bool {
    image::guess_format(&data[..data.len().min(SNIFF_LEN)]).is_ok()
}

/// A commit, bound to the repository it was read from
#[derive(Debug, Clone)]
pub struct Commit {
    repo: Repository,
    pub id: ObjectId,
    raw: Arc<RawCommit>,
    pub(super) submodules: OnceCell<HashMap<String, SubModule>>,
}

/// Serializable commit metadata
#[derive(Debug, Serialize)]
pub struct CommitInfo<'a> {
    pub id: &'a ObjectId,
    pub tree: &'a ObjectId,
    pub author: &'a Signature,
    pub committer: &'a Signature,
    pub summary: &'a str,
    pub message: &'a str,
    pub parents: &'a [ObjectId],
    pub is_merge: bool,
}

impl Commit {
    pub(super) fn new(repo: Repository, id: ObjectId, raw: Arc<RawCommit>) -> Self {
        Self {
            repo,
            id,
            raw,
            submodules: OnceCell::new(),
        }
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn tree_id(&self) -> &ObjectId {
        &self.raw.tree
    }

    pub fn author(&self) -> &Signature {
        &self.raw.author
    }

    pub fn committer(&self) -> &Signature {
        &self.raw.committer
    }

    /// Full commit message
    pub fn message(&self) -> &str {
        &self.raw.message
    }

    /// First line of the commit message
    pub fn summary(&self) -> &str {
        self.raw.message.lines().next().unwrap_or("")
    }

    /// Parent IDs; the first is the mainline parent
    pub fn parents(&self) -> &[ObjectId] {
        &self.raw.parents
    }

    /// 0 for a root commit, 2+ for merges
    pub fn parent_count(&self) -> usize {
        self.raw.parents.len()
    }

    /// ID of the n-th parent (0-based)
    pub fn parent_id(&self, n: usize) -> Result<&ObjectId> {
        self.raw
            .parents
            .get(n)
            .ok_or_else(|| GitError::not_found(format!("parent #{} of {}", n, self.id.short())))
    }

    /// The n-th parent (0-based) as a full commit
    pub fn parent(&self, n: usize) -> Result<Commit> {
        let id = self.parent_id(n)?;
        self.repo.get_commit_by_id(id)
    }

    /// Most recent commit, from this commit's point of view, touching `relpath`
    pub fn get_commit_by_path(&self, relpath: &str) -> Result<Commit> {
        self.repo.commit_by_path_with_id(&self.id, relpath)
    }

    pub fn commits_count(&self) -> Result<i64> {
        self.repo.commits_count(self.id.as_str(), None)
    }

    pub fn commits_by_range_size(&self, page: usize, size: usize) -> Result<Vec<Commit>> {
        self.repo.commits_by_range_size(self.id.as_str(), page, size)
    }

    pub fn commits_by_range(&self, page: usize) -> Result<Vec<Commit>> {
        self.repo.commits_by_range(self.id.as_str(), page)
    }

    /// This commit and all of its ancestors
    pub fn commits_before(&self) -> Result<Vec<Commit>> {
        self.repo.commits_before(&self.id)
    }

    pub fn commits_before_limit(&self, limit: usize) -> Result<Vec<Commit>> {
        self.repo.commits_before_limit(&self.id, limit)
    }

    /// History back to, but excluding, `commit_id`. The end commit is
    /// resolved first, so an unknown ID fails with NotFound.
    pub fn commits_before_until(&self, commit_id: &str) -> Result<Vec<Commit>> {
        let end = self.repo.get_commit(commit_id)?;
        self.repo.commits_between(self, Some(&end))
    }

    pub fn search_commits(&self, keyword: &str) -> Result<Vec<Commit>> {
        self.repo.search_commits(&self.id, keyword)
    }

    pub fn files_changed_since(&self, past_commit: &str) -> Result<Vec<String>> {
        self.repo.files_changed(past_commit, self.id.as_str())
    }

    /// Files added, removed and modified by this commit
    pub fn file_status(&self) -> Result<CommitFileStatus> {
        self.repo.get_commit_file_status(self.id.as_str())
    }

    pub fn info(&self) -> CommitInfo<'_> {
        CommitInfo {
            id: &self.id,
            tree: self.tree_id(),
            author: self.author(),
            committer: self.committer(),
            summary: self.summary(),
            message: self.message(),
            parents: self.parents(),
            is_merge: self.parent_count() > 1,
        }
    }

    /// Whether the blob at `relpath` is an image. A path that does not name a
    /// blob in this commit is not an image.
    pub fn is_image_file(&self, relpath: &str) -> bool {
        match self.repo.blob_bytes_at_path(&self.id, relpath) {
            Ok(data) => is_image_data(&data),
            Err(e) => {
                debug!("{} is not a readable blob: {}", relpath, e);
                false
            }
        }
    }

    pub fn to_result_item(&self) -> ResultItem {
        let data = serde_json::to_value(self.info()).unwrap_or_default();
        ResultItem::commit(self.id.as_str(), self.summary())
            .with_data(data)
            .with_source(Source::CatFile)
    }
}

/// Map a commit listing to result items, in history order
pub fn commits_to_items(commits: &[Commit]) -> Vec<ResultItem> {
    commits
        .iter()
        .map(|c| c.to_result_item().with_source(Source::Log))
        .collect()
}

/// Result item for a plain list of paths
pub fn paths_item(commit: &Commit, paths: &[String]) -> ResultItem {
    ResultItem::structured(
        Kind::FileStatus,
        Source::Log,
        serde_json::json!({ "changed": paths }),
    )
    .with_commit(commit.id.as_str())
}

/// Result item for an image check of one path
pub fn image_item(commit: &Commit, relpath: &str, is_image: bool) -> ResultItem {
    ResultItem::structured(Kind::Blob, Source::CatFile, serde_json::json!({ "image": is_image }))
        .with_commit(commit.id.as_str())
        .with_path(relpath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::fixture::TestRepo;

    const TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";
    const P1: &str = "1111111111111111111111111111111111111111";
    const P2: &str = "2222222222222222222222222222222222222222";

    fn raw_text() -> String {
        format!(
            "tree {TREE}\nparent {P1}\nparent {P2}\n\
             author Ann <ann@example.com> 1577880000 +0000\n\
             committer Bob <bob@example.com> 1577883600 +0100\n\
             gpgsig -----BEGIN PGP SIGNATURE-----\n \n abc\n -----END PGP SIGNATURE-----\n\
             \nMerge branch 'x'\n\nDetails here.\n"
        )
    }

    #[test]
    fn test_raw_commit_parse() {
        let raw = RawCommit::parse(&raw_text()).unwrap();
        assert_eq!(raw.tree.as_str(), TREE);
        assert_eq!(raw.parents.len(), 2);
        assert_eq!(raw.parents[0].as_str(), P1);
        assert_eq!(raw.author.name, "Ann");
        assert_eq!(raw.committer.email, "bob@example.com");
        assert_eq!(raw.message, "Merge branch 'x'\n\nDetails here.\n");
    }

    #[test]
    fn test_raw_commit_root_without_message() {
        let text = format!(
            "tree {TREE}\nauthor A <a@b> 1 +0000\ncommitter A <a@b> 1 +0000\n"
        );
        let raw = RawCommit::parse(&text).unwrap();
        assert!(raw.parents.is_empty());
        assert_eq!(raw.message, "");
    }

    #[test]
    fn test_raw_commit_missing_tree() {
        let err = RawCommit::parse("author A <a@b> 1 +0000\n\nmsg").unwrap_err();
        assert_eq!(err.code(), "PARSE_FAILURE");
    }

    #[test]
    fn test_parent_round_trip() {
        let Some(repo) = TestRepo::new() else { return };
        repo.commit_file("a.txt", "one\n", "first");
        repo.commit_file("a.txt", "two\n", "second\n\nbody");

        let head = repo.open().get_commit("HEAD").unwrap();
        assert_eq!(head.summary(), "second");
        assert_eq!(head.parent_count(), 1);

        let parent = head.parent(0).unwrap();
        assert_eq!(&parent.id, &head.parents()[0]);
        assert_eq!(parent.summary(), "first");
        assert_eq!(parent.parent_count(), 0);

        let err = head.parent(head.parent_count()).unwrap_err();
        assert!(err.is_not_found());
        assert!(parent.parent_id(0).unwrap_err().is_not_found());
    }

    #[test]
    fn test_commit_lookup_is_cached() {
        let Some(repo) = TestRepo::new() else { return };
        repo.commit_file("a.txt", "one\n", "first");

        let handle = repo.open();
        let head = handle.get_commit("HEAD").unwrap();
        let again = handle.get_commit_by_id(&head.id).unwrap();
        assert_eq!(again.id, head.id);
        assert_eq!(handle.cached_commits(), 1);
    }

    #[test]
    fn test_unknown_commit_is_not_found() {
        let Some(repo) = TestRepo::new() else { return };
        repo.commit_file("a.txt", "one\n", "first");

        let err = repo.open().get_commit("no-such-branch").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_history_listings() {
        let Some(repo) = TestRepo::new() else { return };
        for i in 1..=5 {
            repo.commit_file("log.txt", &format!("{i}\n"), &format!("c{i}"));
        }
        let head = repo.open().get_commit("HEAD").unwrap();

        let all = head.commits_before().unwrap();
        let summaries: Vec<_> = all.iter().map(|c| c.summary().to_string()).collect();
        assert_eq!(summaries, vec!["c5", "c4", "c3", "c2", "c1"]);
        assert_eq!(head.commits_count().unwrap(), 5);

        assert_eq!(head.commits_before_limit(2).unwrap().len(), 2);

        let page2 = head.commits_by_range_size(2, 2).unwrap();
        let summaries: Vec<_> = page2.iter().map(|c| c.summary()).collect();
        assert_eq!(summaries, vec!["c3", "c2"]);
        assert!(head.commits_by_range_size(4, 2).unwrap().is_empty());
        assert_eq!(head.commits_by_range(1).unwrap().len(), 5);

        let c2 = &all[3];
        let until = head.commits_before_until(c2.id.as_str()).unwrap();
        let summaries: Vec<_> = until.iter().map(|c| c.summary()).collect();
        assert_eq!(summaries, vec!["c5", "c4", "c3"]);

        let missing = head.commits_before_until(&"f".repeat(40)).unwrap_err();
        assert!(missing.is_not_found());
    }

    #[test]
    fn test_commit_by_path_and_search() {
        let Some(repo) = TestRepo::new() else { return };
        repo.commit_file("a.txt", "a\n", "add a");
        repo.commit_file("b.txt", "b\n", "Fix B");
        repo.commit_file("c.txt", "c\n", "add c");
        let head = repo.open().get_commit("HEAD").unwrap();

        let last_a = head.get_commit_by_path("a.txt").unwrap();
        assert_eq!(last_a.summary(), "add a");
        assert!(head.get_commit_by_path("zzz.txt").unwrap_err().is_not_found());

        let found = head.search_commits("fix b").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].summary(), "Fix B");

        let first = &head.commits_before().unwrap()[2];
        let mut changed = head.files_changed_since(first.id.as_str()).unwrap();
        changed.sort();
        assert_eq!(changed, vec!["b.txt", "c.txt"]);
    }

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

    #[test]
    fn test_is_image_data() {
        assert!(is_image_data(PNG_HEADER));
        assert!(is_image_data(b"GIF89a\x01\0\x01\0"));
        assert!(!is_image_data(b"fn main() {}\n"));
        assert!(!is_image_data(b""));
    }

    #[test]
    fn test_is_image_file() {
        let Some(repo) = TestRepo::new() else { return };
        let mut png = PNG_HEADER.to_vec();
        // non-UTF-8 payload past the signature must survive the read
        png.extend((0..=255u8).cycle().take(4096));
        std::fs::write(repo.path().join("logo.png"), &png).unwrap();
        repo.commit_file("README.md", "# readme\n", "add logo");

        let head = repo.open().get_commit("HEAD").unwrap();
        assert!(head.is_image_file("logo.png"));
        assert!(!head.is_image_file("README.md"));
        assert!(!head.is_image_file("missing.png"));

        let blob = head.repo().blob_bytes_at_path(&head.id, "logo.png").unwrap();
        assert_eq!(blob, png);

        let item = image_item(&head, "logo.png", true);
        assert_eq!(item.kind, Kind::Blob);
        assert_eq!(item.path.as_deref(), Some("logo.png"));
        assert_eq!(item.data.unwrap()["image"], true);
    }

    #[test]
    fn test_to_result_item() {
        let Some(repo) = TestRepo::new() else { return };
        repo.commit_file("a.txt", "a\n", "subject line\n\nbody");
        let head = repo.open().get_commit("HEAD").unwrap();

        let item = head.to_result_item();
        assert_eq!(item.kind, Kind::Commit);
        assert_eq!(item.excerpt.as_deref(), Some("subject line"));
        let data = item.data.unwrap();
        assert_eq!(data["author"]["name"], "Test User");
        assert_eq!(data["parents"].as_array().unwrap().len(), 0);
    }
}
