//! Unified Result Model
//!
//! Every subcommand maps its typed git query result to this model before
//! rendering output, so all commands share one stable output shape.

use serde::{Deserialize, Serialize};

/// The kind of result item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Commit,
    Match,
    Count,
    FileStatus,
    Submodule,
    Blob,
    Stats,
    Check,
    Error,
}

/// Which git query produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Grep,
    Log,
    CatFile,
    Tree,
    Doctor,
}

/// Error information for a result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeError {
    pub code: String,
    pub message: String,
}

impl ScopeError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// The unified result item that all commands produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultItem {
    /// The kind of this result
    pub kind: Kind,

    /// Commit the result belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    /// Repository-relative path, using '/' as separator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Human-readable text (match block, commit message, check line)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,

    /// Structured payload (commit metadata, file status sets, stats)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// How this result was obtained
    pub source: Source,

    /// Errors (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ScopeError>,
}

impl ResultItem {
    fn base(kind: Kind, source: Source) -> Self {
        Self {
            kind,
            commit: None,
            path: None,
            excerpt: None,
            data: None,
            source,
            errors: Vec::new(),
        }
    }

    /// Create a code search match result
    pub fn match_result(
        commit: impl Into<String>,
        path: impl Into<String>,
        excerpt: impl Into<String>,
    ) -> Self {
        let mut item = Self::base(Kind::Match, Source::Grep);
        item.commit = Some(commit.into());
        item.path = Some(path.into());
        item.excerpt = Some(excerpt.into());
        item
    }

    /// Create a commit result
    pub fn commit(id: impl Into<String>, summary: impl Into<String>) -> Self {
        let mut item = Self::base(Kind::Commit, Source::CatFile);
        item.commit = Some(id.into());
        item.excerpt = Some(summary.into());
        item
    }

    /// Create a count result
    pub fn count(source: Source, value: i64) -> Self {
        Self::base(Kind::Count, source).with_data(serde_json::json!({ "count": value }))
    }

    /// Create a submodule result
    pub fn submodule(path: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let mut item = Self::base(Kind::Submodule, Source::Tree);
        item.path = Some(path.into());
        item.excerpt = Some(url.clone());
        item.with_data(serde_json::json!({ "url": url }))
    }

    /// Create a dependency check result
    pub fn check(message: impl Into<String>) -> Self {
        let mut item = Self::base(Kind::Check, Source::Doctor);
        item.excerpt = Some(message.into());
        item
    }

    /// Create a result of an arbitrary kind carrying structured data
    pub fn structured(kind: Kind, source: Source, data: serde_json::Value) -> Self {
        Self::base(kind, source).with_data(data)
    }

    /// Create a new error result
    pub fn error(error: ScopeError) -> Self {
        let mut item = Self::base(Kind::Error, Source::Doctor);
        item.errors.push(error);
        item
    }

    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set structured data payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// Add an error
    pub fn with_error(mut self, error: ScopeError) -> Self {
        self.errors.push(error);
        self
    }
}

/// Result set containing multiple result items, kept in producer order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultSet {
    pub items: Vec<ResultItem>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, item: ResultItem) {
        self.items.push(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = ResultItem>) {
        self.items.extend(items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True if any item is an error item
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|item| item.kind == Kind::Error)
    }
}

impl IntoIterator for ResultSet {
    type Item = ResultItem;
    type IntoIter = std::vec::IntoIter<ResultItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl FromIterator<ResultItem> for ResultSet {
    fn from_iter<T: IntoIterator<Item = ResultItem>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
