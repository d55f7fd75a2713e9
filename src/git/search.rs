//! History-wide code search
//!
//! Two independent phases: a case-sensitive count of matching (commit, file)
//! pairs, and a case-insensitive fetch whose output is split into one block
//! per (commit, file) and paginated before any block is parsed.
//!
//! Both phases assume the repository is not written to while a search runs;
//! they are separate invocations and may otherwise observe different states.

use serde::Serialize;
use tracing::{debug, info};

use crate::core::error::{GitError, Result};
use crate::core::frame;
use crate::core::model::{ResultItem, ResultSet, Source};
use crate::git::repository::Repository;

/// Revisions passed to a single `git grep` invocation
const REV_BATCH: usize = 256;

/// Lines of context on each side of a hit
const CONTEXT_LINES: &str = "2";

/// One hit location with its surrounding context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub commit_id: String,
    pub path: String,
    /// Whole block: `commit:path` header followed by numbered context lines
    pub content: String,
}

/// A page of matches plus the history-wide total
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchesResults {
    pub number_matches: i64,
    pub results: Vec<Match>,
}

/// One page of parsed matches and the number of blocks across all pages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchPage {
    pub blocks: usize,
    pub matches: Vec<Match>,
}

/// Search parameters; `page` is 1-based
#[derive(Debug, Clone)]
pub struct RepoSearchOptions {
    pub keyword: String,
    /// Carried for the caller's own filtering; the search ignores it
    pub owner_id: i64,
    /// History ordering flag for the revision walk, e.g. `--date-order`
    pub order_by: String,
    pub page: usize,
    pub page_size: usize,
}

impl RepoSearchOptions {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            owner_id: 0,
            order_by: String::new(),
            page: 1,
            page_size: 10,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(GitError::InvalidOptions("page starts at 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(GitError::InvalidOptions("page size must be positive".to_string()));
        }
        if !self.order_by.is_empty() && !self.order_by.starts_with("--") {
            return Err(GitError::InvalidOptions(format!(
                "order must be a history ordering flag, got {:?}",
                self.order_by
            )));
        }
        Ok(())
    }
}

/// Count the `commit:path:count` lines of a count-only grep
pub fn count_matches(output: &str) -> i64 {
    frame::lines(output)
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .count() as i64
}

/// Split grep output into blocks, select one page and parse it.
///
/// Returns `None` when the output is empty (no hits anywhere) and an empty
/// page when `page` lies past the last block. The block count always covers
/// the whole output.
pub fn parse_match_page(output: &str, page: usize, page_size: usize) -> Result<Option<MatchPage>> {
    if output.trim().is_empty() {
        return Ok(None);
    }

    let blocks = frame::blocks(output);
    let start = page.saturating_sub(1).saturating_mul(page_size);
    if start >= blocks.len() {
        return Ok(Some(MatchPage {
            blocks: blocks.len(),
            matches: Vec::new(),
        }));
    }
    let end = page.saturating_mul(page_size).min(blocks.len());

    let matches = blocks[start..end]
        .iter()
        .map(|block| parse_block(block))
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(MatchPage {
        blocks: blocks.len(),
        matches,
    }))
}

fn parse_block(block: &str) -> Result<Match> {
    let header = frame::header(block)
        .ok_or_else(|| GitError::ParseFailure("match block without header".to_string()))?;
    let (commit_id, path) = frame::split_pair(header, ':').ok_or_else(|| {
        GitError::ParseFailure(format!("match header without commit:path: {:?}", header))
    })?;

    Ok(Match {
        commit_id: commit_id.to_string(),
        path: path.trim_matches(' ').to_string(),
        content: block.to_string(),
    })
}

impl Repository {
    /// Every commit reachable from any ref, in `order_by` order
    fn all_revisions(&self, order_by: &str) -> Result<Vec<String>> {
        let mut cmd = self.command(["rev-list", "--all"]);
        if !order_by.is_empty() {
            cmd = cmd.arg(order_by);
        }
        let stdout = cmd.run_in_dir(self.path())?;
        Ok(frame::lines(&stdout)
            .into_iter()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Run `git grep <grep_args> -e <keyword> <revs>` over all revisions in
    /// batches, joining the outputs with a blank line.
    fn grep_history(&self, grep_args: &[&str], keyword: &str, order_by: &str) -> Result<String> {
        let revisions = self.all_revisions(order_by)?;
        debug!(revisions = revisions.len(), "grepping history for {:?}", keyword);

        let mut outputs = Vec::new();
        for batch in revisions.chunks(REV_BATCH) {
            let stdout = self
                .command(["grep"])
                .args(grep_args.iter().copied())
                .args(["-e", keyword])
                .args(batch.iter().cloned())
                .arg("--")
                .run_in_dir_allow_empty(self.path())?;
            let stdout = stdout.trim_end_matches('\n');
            if !stdout.is_empty() {
                outputs.push(stdout.to_string());
            }
        }

        if outputs.is_empty() {
            return Ok(String::new());
        }
        let mut joined = outputs.join("\n\n");
        joined.push('\n');
        Ok(joined)
    }

    /// Number of (commit, file) pairs containing `keyword`, case-sensitively
    pub fn get_number_of_code_matches(&self, keyword: &str) -> Result<i64> {
        let output = self.grep_history(&["-F", "-c", "-I"], keyword, "")?;
        Ok(count_matches(&output))
    }

    /// One page of case-insensitive matches with two lines of context
    pub fn get_range_of_matches(&self, opts: &RepoSearchOptions) -> Result<Option<MatchPage>> {
        opts.validate()?;
        let output = self.grep_history(
            &[
                "-F",
                "-I",
                "-i",
                "-n",
                "--no-color",
                "--full-name",
                "--break",
                "--heading",
                "-B",
                CONTEXT_LINES,
                "-A",
                CONTEXT_LINES,
            ],
            &opts.keyword,
            &opts.order_by,
        )?;
        parse_match_page(&output, opts.page, opts.page_size)
    }

    /// Count and fetch one page; the first failing phase aborts the search
    pub fn search_matches_in_repo(&self, opts: &RepoSearchOptions) -> Result<MatchesResults> {
        opts.validate()?;
        let counted = self.get_number_of_code_matches(&opts.keyword)?;
        let page = self.get_range_of_matches(opts)?.unwrap_or_default();

        // the fetch is case-insensitive, so it can see hits the count did not;
        // its block count is the same for every page
        let number_matches = counted.max(page.blocks as i64);
        let results = page.matches;

        info!(
            keyword = %opts.keyword,
            owner_id = opts.owner_id,
            total = number_matches,
            page = opts.page,
            returned = results.len(),
            "code search finished"
        );
        Ok(MatchesResults {
            number_matches,
            results,
        })
    }
}

pub fn count_result_set(count: i64) -> ResultSet {
    let mut result_set = ResultSet::new();
    result_set.push(ResultItem::count(Source::Grep, count));
    result_set
}

pub fn matches_result_set(matches: &MatchesResults) -> ResultSet {
    let mut result_set = count_result_set(matches.number_matches);
    result_set.extend(
        matches
            .results
            .iter()
            .map(|m| ResultItem::match_result(&m.commit_id, &m.path, &m.content)),
    );
    result_set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::fixture::TestRepo;

    const GREP_OUTPUT: &str = "\
aaa:src/a.rs
1-fn a() {
2:    needle();
3-}

aaa:src/b.rs
7:Needle here

bbb:src/a.rs
1-fn a() {
2:    needle();
3-}
";

    #[test]
    fn test_count_matches() {
        assert_eq!(count_matches("aaa:src/a.rs:2\nbbb:src/a.rs:1\n"), 2);
        assert_eq!(count_matches("aaa:src/a.rs:2"), 1);
        assert_eq!(count_matches(""), 0);
    }

    #[test]
    fn test_empty_output_is_none() {
        assert_eq!(parse_match_page("", 1, 10).unwrap(), None);
        assert_eq!(parse_match_page("\n", 3, 10).unwrap(), None);
    }

    #[test]
    fn test_first_page() {
        let page = parse_match_page(GREP_OUTPUT, 1, 2).unwrap().unwrap();
        assert_eq!(page.blocks, 3);
        let page = page.matches;
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].commit_id, "aaa");
        assert_eq!(page[0].path, "src/a.rs");
        assert_eq!(page[0].content, "aaa:src/a.rs\n1-fn a() {\n2:    needle();\n3-}");
        assert_eq!(page[1].path, "src/b.rs");
    }

    #[test]
    fn test_partial_last_page() {
        let page = parse_match_page(GREP_OUTPUT, 2, 2).unwrap().unwrap().matches;
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].commit_id, "bbb");
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let page = parse_match_page(GREP_OUTPUT, 5, 2).unwrap().unwrap();
        assert!(page.matches.is_empty());
        assert_eq!(page.blocks, 3);
    }

    #[test]
    fn test_page_length_never_exceeds_page_size() {
        let total: usize = 3;
        for page_size in 1..5 {
            for page in 1..6 {
                let got = parse_match_page(GREP_OUTPUT, page, page_size).unwrap().unwrap();
                let expected = total.saturating_sub((page - 1) * page_size).min(page_size);
                assert_eq!(got.matches.len(), expected, "page {page} size {page_size}");
                assert_eq!(got.blocks, total);
            }
        }
    }

    #[test]
    fn test_path_is_trimmed_and_keeps_colons() {
        let page = parse_match_page("ccc: docs/a:b.md\n1:x\n", 1, 5).unwrap().unwrap().matches;
        assert_eq!(page[0].commit_id, "ccc");
        assert_eq!(page[0].path, "docs/a:b.md");
    }

    #[test]
    fn test_header_without_separator_is_parse_failure() {
        let err = parse_match_page("garbage\n1:x\n", 1, 5).unwrap_err();
        assert_eq!(err.code(), "PARSE_FAILURE");
    }

    #[test]
    fn test_options_validate() {
        assert!(RepoSearchOptions::new("x").validate().is_ok());

        let mut opts = RepoSearchOptions::new("x");
        opts.page = 0;
        assert!(opts.validate().is_err());

        let mut opts = RepoSearchOptions::new("x");
        opts.page_size = 0;
        assert!(opts.validate().is_err());

        let mut opts = RepoSearchOptions::new("x");
        opts.order_by = "HEAD".to_string();
        assert!(opts.validate().is_err());
        opts.order_by = "--date-order".to_string();
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_matches_result_set() {
        let results = MatchesResults {
            number_matches: 4,
            results: vec![Match {
                commit_id: "aaa".to_string(),
                path: "x.rs".to_string(),
                content: "aaa:x.rs\n1:y".to_string(),
            }],
        };
        let set = matches_result_set(&results);
        assert_eq!(set.len(), 2);
        assert_eq!(set.items[0].data.as_ref().unwrap()["count"], 4);
        assert_eq!(set.items[1].path.as_deref(), Some("x.rs"));
    }

    #[test]
    fn test_search_real_history() {
        let Some(repo) = TestRepo::new() else { return };
        repo.commit_file("a.txt", "alpha\nneedle one\nbeta\n", "first");
        repo.commit_file("b.txt", "Needle two\n", "second");
        let handle = repo.open();

        // case-sensitive count: a.txt in both commits
        assert_eq!(handle.get_number_of_code_matches("needle").unwrap(), 2);
        assert_eq!(handle.get_number_of_code_matches("absent").unwrap(), 0);
        assert_eq!(
            handle.get_range_of_matches(&RepoSearchOptions::new("absent")).unwrap(),
            None
        );

        let mut opts = RepoSearchOptions::new("needle");
        opts.page_size = 2;
        let results = handle.search_matches_in_repo(&opts).unwrap();
        assert_eq!(results.results.len(), 2);
        // a.txt@HEAD, b.txt@HEAD, a.txt@HEAD~1 are fetched case-insensitively
        assert_eq!(results.number_matches, 3);
        assert!(results.results[0].content.contains("needle one") || results.results[0].content.contains("Needle two"));

        opts.page = 2;
        let results = handle.search_matches_in_repo(&opts).unwrap();
        assert_eq!(results.results.len(), 1);
        assert_eq!(results.number_matches, 3);
    }

    #[test]
    fn test_search_total_is_the_same_on_every_page() {
        let Some(repo) = TestRepo::new() else { return };
        repo.commit_file("a.txt", "Needle\n", "first");
        repo.commit_file("b.txt", "NEEDLE\n", "second");
        repo.commit_file("c.txt", "needle\n", "third");
        let handle = repo.open();

        // a/b/c at HEAD, a/b at HEAD~1, a at HEAD~2
        let mut opts = RepoSearchOptions::new("needle");
        opts.page_size = 2;
        let mut returned = 0;
        for page in 1..=4 {
            opts.page = page;
            let results = handle.search_matches_in_repo(&opts).unwrap();
            assert_eq!(results.number_matches, 6, "page {page}");
            assert!(results.number_matches >= results.results.len() as i64);
            returned += results.results.len();
        }
        assert_eq!(returned, 6);
    }
}
