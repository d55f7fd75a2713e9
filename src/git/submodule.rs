//! `.gitmodules` parsing, cached once per commit

use serde::Serialize;
use std::collections::HashMap;

use crate::core::error::{GitError, Result};
use crate::core::frame;
use crate::core::model::{ResultItem, ResultSet};
use crate::git::commit::Commit;

pub const GITMODULES: &str = ".gitmodules";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubModule {
    pub path: String,
    pub url: String,
}

/// Parse a `.gitmodules` blob into a path → submodule map.
///
/// Each `[submodule ...]` section is expected to assign `path` before `url`;
/// the `url` assignment closes the section. A `url` seen before any `path` in
/// its section is stored under the empty path.
pub fn parse_gitmodules(text: &str) -> HashMap<String, SubModule> {
    let mut modules = HashMap::new();
    let mut in_module = false;
    let mut path = String::new();

    for line in frame::lines(text) {
        let line = line.trim();
        if line.starts_with("[submodule") {
            in_module = true;
            path.clear();
            continue;
        }
        if !in_module {
            continue;
        }

        match frame::key_value(line) {
            Some(("path", value)) => path = value.to_string(),
            Some(("url", value)) => {
                modules.insert(
                    path.clone(),
                    SubModule {
                        path: path.clone(),
                        url: value.to_string(),
                    },
                );
                in_module = false;
            }
            _ => {}
        }
    }

    modules
}

impl Commit {
    /// Submodules declared in this commit's `.gitmodules`.
    ///
    /// Fails with NotFound when the commit has no `.gitmodules` blob or the
    /// blob declares no submodule. The map is built at most once per Commit.
    pub fn submodules(&self) -> Result<&HashMap<String, SubModule>> {
        self.submodules.get_or_try_init(|| {
            let blob = self.repo().blob_at_path(&self.id, GITMODULES)?;
            let modules = parse_gitmodules(&blob);
            if modules.is_empty() {
                return Err(GitError::not_found(format!(
                    "submodule section in {} at {}",
                    GITMODULES,
                    self.id.short()
                )));
            }
            Ok(modules)
        })
    }

    /// The submodule at `path`; `Ok(None)` when no submodule lives there
    pub fn submodule(&self, path: &str) -> Result<Option<&SubModule>> {
        Ok(self.submodules()?.get(path))
    }
}

/// Submodules sorted by path for stable output
pub fn submodules_result_set<'a>(commit: &Commit, modules: impl IntoIterator<Item = &'a SubModule>) -> ResultSet {
    let mut modules: Vec<&SubModule> = modules.into_iter().collect();
    modules.sort_by(|a, b| a.path.cmp(&b.path));
    modules
        .into_iter()
        .map(|m| ResultItem::submodule(&m.path, &m.url).with_commit(commit.id.as_str()))
        .collect()
}
