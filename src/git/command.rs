//! git process invocation
//!
//! Builds argument vectors plus environment overrides and runs the git binary
//! either fully buffered or with piped stdout for streaming consumers.

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Output, Stdio};

use tracing::debug;

use crate::core::error::{GitError, Result};

/// Environment applied to every invocation so output is locale-stable and
/// never blocks on a credential prompt.
const DEFAULT_ENVS: [(&str, &str); 3] = [
    ("LC_ALL", "C"),
    ("LANG", "C"),
    ("GIT_TERMINAL_PROMPT", "0"),
];

/// A single git invocation
#[derive(Debug, Clone)]
pub struct GitCommand {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl GitCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            // paths with non-ASCII bytes must come through unquoted
            args: vec!["-c".to_string(), "core.quotepath=false".to_string()],
            envs: DEFAULT_ENVS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[allow(dead_code)]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Argument vector as a single line, for logs and error messages
    pub fn describe(&self) -> String {
        // skip the leading `-c core.quotepath=false`
        self.args[2..].join(" ")
    }

    fn build(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(dir).stdin(Stdio::null());
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    fn output_in_dir(&self, dir: &Path) -> Result<Output> {
        debug!(dir = %dir.display(), "git {}", self.describe());
        Ok(self.build(dir).output()?)
    }

    fn failure(&self, status: ExitStatus, stderr: &[u8]) -> GitError {
        GitError::ProcessFailure {
            args: self.describe(),
            status: status.to_string(),
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }

    /// Run to completion and return stdout; a non-zero exit is a ProcessFailure
    pub fn run_in_dir(&self, dir: &Path) -> Result<String> {
        let stdout = self.run_bytes_in_dir(dir)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// Like [`run_in_dir`](Self::run_in_dir), but stdout is returned untouched
    pub fn run_bytes_in_dir(&self, dir: &Path) -> Result<Vec<u8>> {
        let output = self.output_in_dir(dir)?;
        if !output.status.success() {
            return Err(self.failure(output.status, &output.stderr));
        }
        Ok(output.stdout)
    }

    /// Like [`run_in_dir`](Self::run_in_dir), but exit status 1 with no
    /// diagnostic output counts as an empty, successful result.
    ///
    /// `git grep` reports "no matches" and `git commit` reports "nothing to
    /// commit" this way.
    pub fn run_in_dir_allow_empty(&self, dir: &Path) -> Result<String> {
        let output = self.output_in_dir(dir)?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        if is_silent_exit_one(output.status, &output.stderr) {
            debug!("git {} exited 1 without diagnostics", self.describe());
            return Ok(String::new());
        }
        Err(self.failure(output.status, &output.stderr))
    }

    /// Run and report only whether git exited successfully
    pub fn succeeds_in_dir(&self, dir: &Path) -> Result<bool> {
        Ok(self.output_in_dir(dir)?.status.success())
    }

    /// Spawn with stdout and stderr piped for streaming consumption
    pub fn spawn_in_dir(&self, dir: &Path) -> Result<Child> {
        debug!(dir = %dir.display(), "git {} (streaming)", self.describe());
        let child = self
            .build(dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        Ok(child)
    }

    /// Build the ProcessFailure for a streamed invocation that exited badly
    pub fn streamed_failure(&self, status: ExitStatus, stderr: &str) -> GitError {
        self.failure(status, stderr.as_bytes())
    }
}

/// Exit code 1 with an empty stderr
pub fn is_silent_exit_one(status: ExitStatus, stderr: &[u8]) -> bool {
    status.code() == Some(1) && stderr.iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::util::command_exists;

    #[test]
    fn test_describe_skips_config_prefix() {
        let cmd = GitCommand::new("git").arg("log").args(["-1", "--name-status"]);
        assert_eq!(cmd.describe(), "log -1 --name-status");
    }

    #[test]
    fn test_default_envs_present() {
        let cmd = GitCommand::new("git").env("GIT_DIR", "/tmp/x");
        assert!(cmd.envs.iter().any(|(k, v)| k == "LC_ALL" && v == "C"));
        assert!(cmd.envs.iter().any(|(k, _)| k == "GIT_DIR"));
    }

    #[test]
    fn test_missing_binary_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitCommand::new("gitscope-no-such-binary")
            .arg("status")
            .run_in_dir(dir.path())
            .unwrap_err();
        assert_eq!(err.code(), "IO");
    }

    #[test]
    fn test_failure_carries_stderr() {
        if !command_exists("git") {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let err = GitCommand::new("git")
            .args(["rev-parse", "--git-dir"])
            .env("GIT_CEILING_DIRECTORIES", dir.path().to_string_lossy().to_string())
            .run_in_dir(dir.path())
            .unwrap_err();
        match err {
            GitError::ProcessFailure { args, stderr, .. } => {
                assert_eq!(args, "rev-parse --git-dir");
                assert!(stderr.contains("not a git repository"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
