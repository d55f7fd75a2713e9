//! Per-author commit histogram and line-change totals
//!
//! Both aggregations are forgiving: counts that fail to parse contribute zero
//! and processing continues.

use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::error::Result;
use crate::core::frame;
use crate::core::model::{Kind, ResultItem, ResultSet, Source};
use crate::git::repository::Repository;

/// Date of the placeholder row emitted when an author has no commits
pub const PLACEHOLDER_DATE: &str = "00-000-0000";

/// Label used when no author filter is given
pub const ALL_USERS: &str = "all";

/// `day-month-year` bucket key, e.g. `01-Jan-2020`
const DATE_BUCKET_FORMAT: &str = "%d-%b-%Y";

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("Invalid NUMBER_RE regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitsPerUser {
    pub num_commits: i64,
    /// Grouping key, compared as a string
    pub date: String,
    pub user: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitsInfo {
    pub info: Vec<CommitsPerUser>,
    pub total: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsUser {
    pub insertions: i64,
    pub deletions: i64,
    pub author: String,
    /// Numstat lines attributed to the author
    pub files: usize,
}

/// Bucket key for an ISO-8601 author date, in the author's own zone
pub fn date_bucket(iso: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(iso.trim())
        .ok()
        .map(|date| date.format(DATE_BUCKET_FORMAT).to_string())
}

/// Collapse runs of equal adjacent keys into `count:key` lines.
///
/// Only adjacent duplicates merge, so a key that reappears after a different
/// key starts a new row.
pub fn uniq_count<'a>(keys: impl IntoIterator<Item = &'a str>) -> String {
    let mut output = String::new();
    let mut current: Option<(&str, i64)> = None;

    for key in keys {
        current = match current {
            Some((prev, n)) if prev == key => Some((prev, n + 1)),
            Some((prev, n)) => {
                output.push_str(&format!("{}:{}\n", n, prev));
                Some((key, 1))
            }
            None => Some((key, 1)),
        };
    }
    if let Some((prev, n)) = current {
        output.push_str(&format!("{}:{}\n", n, prev));
    }

    output
}

/// Parse `count:date` lines into histogram rows with a running total
pub fn parse_commits_histogram(text: &str, user: &str) -> CommitsInfo {
    let user = if user.is_empty() { ALL_USERS } else { user };
    let mut commits = CommitsInfo::default();

    for line in frame::lines(text) {
        if line.trim().is_empty() {
            continue;
        }
        let (count, date) = frame::split_pair(line, ':').unwrap_or((line, ""));
        let num_commits = count.trim().parse::<i64>().unwrap_or_else(|_| {
            warn!("unreadable commit count {:?}, using 0", count);
            0
        });

        commits.info.push(CommitsPerUser {
            num_commits,
            date: date.to_string(),
            user: user.to_string(),
        });
        commits.total += num_commits;
    }

    if commits.info.is_empty() {
        commits.info.push(CommitsPerUser {
            num_commits: 0,
            date: PLACEHOLDER_DATE.to_string(),
            user: user.to_string(),
        });
    }

    commits
}

/// The `added<TAB>deleted` columns of a numstat line, or the whole line when
/// it has no path column
fn numstat_counts(line: &str) -> &str {
    line.match_indices('\t')
        .nth(1)
        .map(|(i, _)| &line[..i])
        .unwrap_or(line)
}

/// Sum numstat output. A line contributes only when exactly two numbers are
/// found in its count columns; binary (`-\t-`) and malformed lines add zero.
pub fn parse_numstat(text: &str, author: &str) -> StatsUser {
    let mut stats = StatsUser {
        author: author.to_string(),
        ..Default::default()
    };

    for line in frame::lines(text) {
        if line.trim().is_empty() {
            continue;
        }
        stats.files += 1;

        let numbers: Vec<&str> = NUMBER_RE
            .find_iter(numstat_counts(line))
            .map(|m| m.as_str())
            .collect();
        if numbers.len() != 2 {
            debug!("no line counts in {:?}", line);
            continue;
        }
        stats.insertions += numbers[0].parse::<i64>().unwrap_or(0);
        stats.deletions += numbers[1].parse::<i64>().unwrap_or(0);
    }

    stats
}

impl Repository {
    /// Commits per day for `user` (all authors when empty), newest first
    pub fn commits_count_per_collaborator(&self, user: &str) -> Result<CommitsInfo> {
        let mut cmd = self.command(["log", "--pretty=format:%ad", "--date=iso-strict"]);
        if !user.is_empty() {
            cmd = cmd.arg(format!("--author={}", user));
        }
        let stdout = cmd.run_in_dir(self.path())?;

        let buckets: Vec<String> = frame::lines(&stdout)
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let bucket = date_bucket(line);
                if bucket.is_none() {
                    warn!("skipping unreadable author date {:?}", line);
                }
                bucket
            })
            .collect();

        let histogram = uniq_count(buckets.iter().map(String::as_str));
        Ok(parse_commits_histogram(&histogram, user))
    }

    /// Lines inserted and deleted by `user` (all authors when empty) up to now
    pub fn num_stat_commits_per_user(&self, user: &str) -> Result<StatsUser> {
        let mut cmd = self.command(["log", "--numstat", "--pretty=tformat:", "--until=now"]);
        if !user.is_empty() {
            cmd = cmd.arg(format!("--author={}", user));
        }
        let stdout = cmd.run_in_dir(self.path())?;
        Ok(parse_numstat(&stdout, user))
    }
}

pub fn commits_info_result_set(info: &CommitsInfo) -> ResultSet {
    let mut result_set: ResultSet = info
        .info
        .iter()
        .map(|row| {
            ResultItem::structured(
                Kind::Stats,
                Source::Log,
                serde_json::to_value(row).unwrap_or_default(),
            )
        })
        .collect();
    result_set.push(ResultItem::count(Source::Log, info.total));
    result_set
}

pub fn stats_user_result_set(stats: &StatsUser) -> ResultSet {
    let mut result_set = ResultSet::new();
    result_set.push(ResultItem::structured(
        Kind::Stats,
        Source::Log,
        serde_json::to_value(stats).unwrap_or_default(),
    ));
    result_set
}
