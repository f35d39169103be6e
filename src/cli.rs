//! Command-line surface.
//!
//! A single command: build a package for the version given as the one
//! positional argument. The changelog flag doubles as a mode selector,
//! with a bare `-c` meaning "prompt me for the text".

use std::path::PathBuf;

use clap::Parser;

use crate::changelog::{self, Mode};
use crate::config::vocab::Urgency;

/// Top-level CLI entry point for the package builder.
#[derive(Parser, Debug)]
#[command(
    name = "debpack",
    about = "Build a Debian binary package from the current source tree"
)]
pub struct Cli {
    /// Version to tag the package with; a `-1` revision suffix is appended
    /// when none is present
    #[arg(value_name = "VERSION")]
    pub version: String,

    /// Generate a changelog entry: `auto`, `message=<text>`,
    /// `from_commit_id=<id>`, or free text; bare `-c` prompts for a message
    #[arg(short, long, num_args = 0..=1, value_parser = changelog::parse_mode)]
    pub changelog: Option<Option<Mode>>,

    /// Urgency recorded in the changelog entry
    #[arg(long, value_enum, default_value_t = Urgency::Medium)]
    pub urgency: Urgency,

    /// Directory to place the finished package in (default: the source root)
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Mark the package architecture-independent
    #[arg(short = 'a', long)]
    pub arch_all: bool,

    /// Upload the finished package to GitHub Releases via `gh`
    #[arg(long)]
    pub github_release: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The selected changelog mode; bare `-c` means prompt for a literal
    /// message, an absent flag means no changelog at all.
    #[must_use]
    pub fn changelog_mode(&self) -> Option<Mode> {
        self.changelog
            .clone()
            .map(|mode| mode.unwrap_or(Mode::Message(None)))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_version_only() {
        let cli = Cli::parse_from(["debpack", "2.4"]);
        assert_eq!(cli.version, "2.4");
        assert_eq!(cli.changelog_mode(), None);
        assert_eq!(cli.urgency, Urgency::Medium);
        assert!(!cli.arch_all);
        assert!(!cli.github_release);
        assert!(!cli.verbose);
    }

    #[test]
    fn missing_version_is_an_error() {
        assert!(Cli::try_parse_from(["debpack"]).is_err());
    }

    #[test]
    fn bare_changelog_flag_means_prompt() {
        let cli = Cli::parse_from(["debpack", "2.4", "-c"]);
        assert_eq!(cli.changelog_mode(), Some(Mode::Message(None)));
    }

    #[test]
    fn parse_changelog_auto() {
        let cli = Cli::parse_from(["debpack", "2.4", "-c", "auto"]);
        assert_eq!(cli.changelog_mode(), Some(Mode::Auto));
    }

    #[test]
    fn parse_changelog_literal_message() {
        let cli = Cli::parse_from(["debpack", "2.4", "--changelog", "message=Fix crash"]);
        assert_eq!(
            cli.changelog_mode(),
            Some(Mode::Message(Some("Fix crash".to_string())))
        );
    }

    #[test]
    fn parse_changelog_from_commit() {
        let cli = Cli::parse_from(["debpack", "2.4", "-c", "from_commit_id=abc123"]);
        assert_eq!(
            cli.changelog_mode(),
            Some(Mode::FromCommit("abc123".to_string()))
        );
    }

    #[test]
    fn unrecognized_changelog_value_is_a_literal_message() {
        let cli = Cli::parse_from(["debpack", "2.4", "-c", "Repack with new assets"]);
        assert_eq!(
            cli.changelog_mode(),
            Some(Mode::Message(Some("Repack with new assets".to_string())))
        );
    }

    #[test]
    fn parse_urgency() {
        let cli = Cli::parse_from(["debpack", "2.4", "--urgency", "high"]);
        assert_eq!(cli.urgency, Urgency::High);
    }

    #[test]
    fn parse_dest() {
        let cli = Cli::parse_from(["debpack", "2.4", "--dest", "/tmp/out"]);
        assert_eq!(cli.dest, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn parse_arch_all_short() {
        let cli = Cli::parse_from(["debpack", "2.4", "-a"]);
        assert!(cli.arch_all);
    }

    #[test]
    fn parse_github_release() {
        let cli = Cli::parse_from(["debpack", "2.4", "--github-release"]);
        assert!(cli.github_release);
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::parse_from(["debpack", "2.4", "-v"]);
        assert!(cli.verbose);
    }
}
