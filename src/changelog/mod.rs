//! Changelog derivation, formatting, and entry assembly.
//!
//! A changelog entry is built in three steps: a mode picks where the
//! change text comes from (a literal message, commit history since the
//! persisted checkpoint, or history up to an explicit commit), the text is
//! rendered as bullet lines, and the bullets are wrapped in the
//! title/body/trailer entry layout. Checkpoint persistence lives in
//! [`checkpoint`].

pub mod checkpoint;

use chrono::DateTime;

use crate::config::vocab::Urgency;
use crate::error::ChangelogError;
use crate::vcs::Commit;

/// Body text used when interactive input comes back empty.
pub const FALLBACK_MESSAGE: &str = "Repack of last version";

/// Changelog generation mode, selected on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// A literal message; `None` means prompt interactively.
    Message(Option<String>),
    /// Derive from commit history since the persisted checkpoint.
    Auto,
    /// Derive from commit history up to and including the given commit.
    FromCommit(String),
}

/// Parse the command-line spelling of a changelog mode.
///
/// `auto` and the `message=`/`from_commit_id=` prefixes are recognized;
/// any other non-empty text is taken as a literal message.
pub fn parse_mode(text: &str) -> Result<Mode, String> {
    if text.is_empty() {
        return Err("changelog mode cannot be empty".to_string());
    }
    if text == "auto" {
        return Ok(Mode::Auto);
    }
    if let Some(message) = text.strip_prefix("message=") {
        return Ok(Mode::Message(Some(message.to_string())));
    }
    if let Some(id) = text.strip_prefix("from_commit_id=") {
        return Ok(Mode::FromCommit(id.to_string()));
    }
    Ok(Mode::Message(Some(text.to_string())))
}

/// Outcome of deriving change text from commit history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derivation {
    /// Commits to render, newest first, and the commit id to persist as
    /// the new checkpoint once the run succeeds.
    Entries {
        /// Eligible commits, newest first.
        commits: Vec<Commit>,
        /// Id of the newest commit considered.
        checkpoint: String,
    },
    /// Nothing derivable; the caller must prompt for a message. The
    /// checkpoint still advances when eligible history was consumed.
    NeedsMessage {
        /// New checkpoint to persist, if history was consumed.
        checkpoint: Option<String>,
    },
}

/// Derive entries since the persisted checkpoint.
///
/// With no checkpoint on record the entire history counts as consumed
/// (the checkpoint advances to the newest commit) but no entries are
/// derived; the caller prompts for a message instead. With a checkpoint,
/// commits are collected newest-first until the checkpoint id matches by
/// prefix, and the boundary commit itself is dropped since a prior
/// changelog already covered it. A checkpoint matching nothing in history
/// is an error.
pub fn derive_auto(
    history: &[Commit],
    checkpoint: Option<&str>,
) -> Result<Derivation, ChangelogError> {
    let Some(boundary) = checkpoint else {
        return Ok(Derivation::NeedsMessage {
            checkpoint: history.first().map(|commit| commit.id.clone()),
        });
    };
    let Some(index) = history
        .iter()
        .position(|commit| commit.id.starts_with(boundary))
    else {
        return Err(ChangelogError::CommitNotFound(boundary.to_string()));
    };
    let eligible = &history[..index];
    match eligible.first() {
        Some(newest) => Ok(Derivation::Entries {
            commits: eligible.to_vec(),
            checkpoint: newest.id.clone(),
        }),
        None => Ok(Derivation::NeedsMessage { checkpoint: None }),
    }
}

/// Derive entries up to and including an explicit boundary commit.
///
/// Unlike [`derive_auto`], the boundary commit is part of the result. An
/// id matching nothing in history is an error.
pub fn derive_until(history: &[Commit], boundary: &str) -> Result<Derivation, ChangelogError> {
    let Some(index) = history
        .iter()
        .position(|commit| commit.id.starts_with(boundary))
    else {
        return Err(ChangelogError::CommitNotFound(boundary.to_string()));
    };
    let eligible = &history[..=index];
    match eligible.first() {
        Some(newest) => Ok(Derivation::Entries {
            commits: eligible.to_vec(),
            checkpoint: newest.id.clone(),
        }),
        None => Ok(Derivation::NeedsMessage { checkpoint: None }),
    }
}

/// Render derived commits as bullet lines, `* <subject> (<id>)`.
#[must_use]
pub fn format_commits(commits: &[Commit]) -> String {
    commits
        .iter()
        .map(|commit| format!("* {} ({})", commit.subject, commit.id))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a free-text message as bullet lines, one per non-empty line.
///
/// An effectively empty message falls back to [`FALLBACK_MESSAGE`].
#[must_use]
pub fn format_message(message: &str) -> String {
    let text = if message.trim().is_empty() {
        FALLBACK_MESSAGE
    } else {
        message
    };
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("* {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assemble a complete changelog entry.
///
/// Layout: title line `<package> (<version>) any; urgency=<urgency>`, the
/// change bullets indented by two spaces, and a trailer naming the
/// maintainer with an RFC-2822-style timestamp, all joined by blank
/// lines.
#[must_use]
pub fn assemble_entry<Tz: chrono::TimeZone>(
    package: &str,
    version: &str,
    urgency: Urgency,
    changes: &str,
    maintainer: &str,
    timestamp: &DateTime<Tz>,
) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let title = format!("{package} ({version}) any; urgency={urgency}");
    let body = changes
        .lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    let trailer = format!(
        " -- {maintainer}  {}",
        timestamp.format("%a, %d %b %Y %H:%M:%S %z")
    );
    [title, body, trailer].join("\n\n")
}
