//! Version-control collaborators.
//!
//! All git access goes through the [`Executor`] seam; nothing here parses
//! repository internals beyond the one-line-per-commit log format.

use std::path::Path;

use crate::error::BuildError;
use crate::exec::Executor;

/// One commit of history: full identifier plus subject line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Full commit identifier.
    pub id: String,
    /// Commit subject (first message line).
    pub subject: String,
}

impl Commit {
    /// Convenience constructor used widely in tests.
    pub fn new(id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
        }
    }
}

/// Whether version-control features are available for this source root.
pub fn is_repo(root: &Path) -> bool {
    root.join(".git").is_dir()
}

/// Read commit history newest-first as (id, subject) pairs.
///
/// `--reflog` widens the walk to everything reachable from the reflog, so
/// history survives branch switches between packaging runs.
pub fn commit_history(executor: &dyn Executor, root: &Path) -> Result<Vec<Commit>, BuildError> {
    let root_arg = root.display().to_string();
    let result = executor.run(
        "git",
        &[
            "-C",
            &root_arg,
            "--no-pager",
            "log",
            "--reflog",
            "--no-color",
            "--pretty=format:%H,%s",
        ],
    )?;
    let commits = result
        .stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once(',') {
            Some((id, subject)) => Commit::new(id, subject),
            None => Commit::new(line, ""),
        })
        .collect();
    Ok(commits)
}

/// The configured committer identity, formatted `Name <email>`.
pub fn committer_identity(executor: &dyn Executor) -> Result<String, BuildError> {
    let name = executor.run("git", &["config", "user.name"])?;
    let email = executor.run("git", &["config", "user.email"])?;
    Ok(format!(
        "{} <{}>",
        name.stdout.trim(),
        email.stdout.trim()
    ))
}
