//! Doctor - git availability check

use std::path::Path;

use crate::core::model::{ResultItem, ResultSet, ScopeError};
use crate::core::util::command_exists;
use crate::git::command::GitCommand;

/// Status of the git binary
#[derive(Debug, Clone)]
pub struct DependencyStatus {
    pub name: String,
    pub available: bool,
    pub version: Option<String>,
    pub notes: Option<String>,
}

impl DependencyStatus {
    pub fn to_result_item(&self) -> ResultItem {
        let status = if self.available { "✓" } else { "✗" };
        let mut message = format!(
            "{} {} (required) - {}",
            status,
            self.name,
            self.version
                .as_ref()
                .map(|v| format!("found: {}", v))
                .unwrap_or_else(|| "not found".to_string())
        );
        if let Some(notes) = &self.notes {
            message.push_str(&format!("\n  Note: {}", notes));
        }

        let item = ResultItem::check(message);
        if self.available {
            item
        } else {
            item.with_error(ScopeError::new(
                "MISSING_DEPENDENCY",
                format!("{} is required but not found", self.name),
            ))
        }
    }
}

/// Check the configured git binary, running `git --version` from `root`
pub fn check_git(git: &str, root: &Path) -> DependencyStatus {
    let version = if command_exists(git) || Path::new(git).is_file() {
        GitCommand::new(git)
            .arg("--version")
            .run_in_dir(root)
            .ok()
            .map(|v| v.trim().to_string())
    } else {
        None
    };

    DependencyStatus {
        name: git.to_string(),
        available: version.is_some(),
        version,
        notes: Some("Install: https://git-scm.com/downloads (2.24 or newer)".to_string()),
    }
}

pub fn doctor_result_set(git: &str, root: &Path) -> ResultSet {
    let mut result_set = ResultSet::new();
    result_set.push(check_git(git, root).to_result_item());
    result_set
}
