//! Command: publish a finished package to GitHub Releases.

use std::io;
use std::path::Path;

use tracing::info;

use crate::error::BuildError;
use crate::exec::{Executor, path_str};
use crate::prompt::Prompter;

/// Create a GitHub release tagged `v<version>` carrying the artifact.
///
/// `version` is the version as given on the command line, without the
/// appended revision suffix. When the pipeline generated changelog text it
/// is offered as the release notes; otherwise (or on decline) the notes
/// are read interactively, defaulting to empty.
pub fn run(
    executor: &dyn Executor,
    prompter: &mut dyn Prompter,
    version: &str,
    artifact: &Path,
    source_root: &Path,
    changes: Option<&str>,
) -> Result<(), BuildError> {
    if !executor.which("gh") {
        return Err(BuildError::MissingTool("gh"));
    }
    let notes = release_notes(prompter, changes)?;
    let tag = format!("v{version}");
    let result = executor.run_in(
        source_root,
        "gh",
        &[
            "release",
            "create",
            &tag,
            "-t",
            &tag,
            "--notes",
            &notes,
            path_str(artifact)?,
        ],
    )?;
    let url = result.stdout.trim();
    if !url.is_empty() {
        info!("release created: {url}");
    }
    Ok(())
}

fn release_notes(
    prompter: &mut dyn Prompter,
    changes: Option<&str>,
) -> Result<String, BuildError> {
    if let Some(changes) = changes
        && prompter
            .confirm("Use generated changelog as release notes?")
            .map_err(read_error)?
    {
        return Ok(changes.to_string());
    }
    prompter.read_multiline("Input notes:").map_err(read_error)
}

fn read_error(source: io::Error) -> BuildError {
    BuildError::Io {
        action: "read release notes input".to_string(),
        source,
    }
}
