// src/task/git.rs

use std::ffi::OsString;
use std::path::Path;

use crate::errors::{RepobatchError, Result};
use crate::repo::RepoInfo;

/// Appended to the output of any git command exiting non-zero.
pub const GIT_FAILURE_NOTE: &str = "Git did not complete successfully.";

/// Appended after [`GIT_FAILURE_NOTE`] when the task ignores failures.
pub const IGNORED_FAILURE_NOTE: &str = "Ignoring non relevant git error";

/// Arguments of one git invocation.
///
/// By default the command runs as `git -C <repo path> <args…>`. Commands that
/// must run outside any repository (`clone`, `ls-remote`) drop the `-C`
/// prefix with [`GitCommand::outside_repo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommand {
    args: Vec<String>,
    run_inside_repo: bool,
}

impl GitCommand {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            run_inside_repo: true,
        }
    }

    pub fn outside_repo(self) -> Self {
        self.with_run_inside_repo(false)
    }

    pub fn with_run_inside_repo(mut self, inside: bool) -> Self {
        self.run_inside_repo = inside;
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn runs_inside_repo(&self) -> bool {
        self.run_inside_repo
    }

    /// Human readable form, e.g. `git checkout main --`.
    pub fn cmd_line(&self) -> String {
        format!("git {}", self.args.join(" "))
    }

    /// Arguments passed to the git executable, including the `-C` prefix.
    pub fn full_args(&self, repo: &RepoInfo) -> Vec<OsString> {
        let mut full = Vec::with_capacity(self.args.len() + 2);
        if self.run_inside_repo {
            full.push(OsString::from("-C"));
            full.push(repo.fullpath().as_os_str().to_os_string());
        }
        full.extend(self.args.iter().map(OsString::from));
        full
    }
}

/// Reject an unresolved git executable before anything is started.
pub fn ensure_executable(git: &Path) -> Result<()> {
    if git.as_os_str().is_empty() {
        return Err(RepobatchError::GitExecutableMissing);
    }
    Ok(())
}

/// Output shown for a failed git command: the captured text followed by the
/// fixed failure notes.
pub fn decorate_failure_output(mut output: String, ignore_failure: bool) -> String {
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(GIT_FAILURE_NOTE);
    if ignore_failure {
        output.push('\n');
        output.push_str(IGNORED_FAILURE_NOTE);
    }
    output
}
