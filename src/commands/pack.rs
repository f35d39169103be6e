//! Command: build a Debian binary package from a source tree.
//!
//! The pipeline runs in a fixed order: resolve the manifest, plan the
//! changelog (every prompt happens here, before any filesystem mutation),
//! stage the package tree, assemble and relocate the container, and
//! optionally publish. Removal of the staging tree and of stray files in
//! the source root is guaranteed regardless of outcome; the changelog
//! checkpoint only advances after an overall success.

use std::collections::HashSet;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use tracing::{debug, info, warn};

use crate::archive;
use crate::changelog::checkpoint::CheckpointStore;
use crate::changelog::{self, Derivation, Mode};
use crate::cli::Cli;
use crate::commands::release;
use crate::config::resolver::{self, ResolveContext};
use crate::config::vocab::Urgency;
use crate::config::{self, Manifest};
use crate::error::{BuildError, ChangelogError, CleanupWarning, PackError};
use crate::exec::Executor;
use crate::logging;
use crate::prompt::Prompter;
use crate::staging::StagingArea;
use crate::vcs::{self, Commit};

/// Everything the pipeline needs from changelog planning.
#[derive(Debug)]
struct ChangelogPlan {
    /// Bullet-formatted change text, also offered as release notes.
    changes: String,
    /// Fully assembled entry for the payload's doc file.
    entry: String,
    /// Commit id to persist once the run has succeeded.
    checkpoint: Option<String>,
}

/// Build a package for `source_root` per the command-line options.
///
/// Returns the path of the finished artifact.
///
/// # Errors
///
/// Returns an error if manifest resolution, changelog planning, staging,
/// or assembly fails. Cleanup still runs on every failure path.
pub fn run(
    opts: &Cli,
    source_root: &Path,
    executor: &dyn Executor,
    prompter: &mut dyn Prompter,
) -> Result<PathBuf> {
    let artifact = execute(opts, source_root, executor, prompter)?;
    Ok(artifact)
}

fn execute(
    opts: &Cli,
    source_root: &Path,
    executor: &dyn Executor,
    prompter: &mut dyn Prompter,
) -> Result<PathBuf, PackError> {
    let tool_version =
        option_env!("DEBPACK_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
    info!("debpack {tool_version}");

    logging::stage("Resolving configuration");
    let raw = config::load_raw(source_root)?;
    let ctx = ResolveContext {
        executor,
        source_root,
    };
    let (mut manifest, _) = resolver::resolve(raw, &ctx, &opts.version, opts.arch_all)?;
    info!("packaging {} {}", manifest.package, manifest.version);

    let plan = match opts.changelog_mode() {
        Some(mode) => {
            logging::stage("Generating changelog");
            let recorded = match mode {
                Mode::Auto => {
                    CheckpointStore::open_default().and_then(|store| store.load(&manifest.package))?
                }
                _ => None,
            };
            Some(plan_changelog(
                &mode,
                &manifest,
                opts.urgency,
                recorded.as_deref(),
                source_root,
                executor,
                prompter,
            )?)
        }
        None => None,
    };

    let snapshot = source_snapshot(source_root, &manifest.artifact_name())?;

    logging::stage("Staging package tree");
    let mut staging = StagingArea::create(&env::temp_dir(), &manifest.staging_dir_name())?;

    let built = build(
        opts,
        source_root,
        executor,
        prompter,
        &mut manifest,
        plan.as_ref(),
        &staging,
    );

    if let Err(warning) = staging.remove() {
        warn!("{warning}");
    }
    prune_strays(source_root, &snapshot);

    let artifact = built?;
    if let Some(checkpoint) = plan.as_ref().and_then(|plan| plan.checkpoint.as_deref()) {
        persist_checkpoint(&manifest.package, checkpoint);
    }
    Ok(artifact)
}

/// Populate the staging tree and assemble the container. Runs between the
/// pre-run snapshot and the guaranteed cleanup, so every error path here
/// still gets cleaned up by the caller.
fn build(
    opts: &Cli,
    source_root: &Path,
    executor: &dyn Executor,
    prompter: &mut dyn Prompter,
    manifest: &mut Manifest,
    plan: Option<&ChangelogPlan>,
    staging: &StagingArea,
) -> Result<PathBuf, PackError> {
    let staged = staging.stage_hook_scripts(source_root)?;
    if !staged.is_empty() {
        info!("staged {} maintainer script(s)", staged.len());
    }
    if let Some(plan) = plan {
        staging.write_changelog(&manifest.package, &plan.entry)?;
    }
    if staging.run_build_script(executor, source_root)? {
        debug!("build script finished");
    }
    staging.stage_build_files(&manifest.build_files, source_root)?;
    manifest.installed_size_kib = Some(staging.payload_size_kib()?);

    logging::stage("Assembling package");
    archive::write_format_marker(staging.root())?;
    archive::write_control_file(&staging.control_dir(), manifest)?;
    archive::compress_subtrees(executor, staging.root())?;
    let container = archive::build_container(staging.root(), &manifest.artifact_name())?;
    let dest_dir = opts.dest.as_deref().unwrap_or(source_root);
    let artifact = archive::relocate(&container, dest_dir)?;
    info!("Created package {}", artifact.display());

    if opts.github_release {
        logging::stage("Publishing GitHub release");
        release::run(
            executor,
            prompter,
            &opts.version,
            &artifact,
            source_root,
            plan.map(|plan| plan.changes.as_str()),
        )?;
    }
    Ok(artifact)
}

/// Produce the change text, assembled entry, and checkpoint candidate for
/// the selected mode. All prompting happens here, before staging begins.
fn plan_changelog(
    mode: &Mode,
    manifest: &Manifest,
    urgency: Urgency,
    recorded: Option<&str>,
    source_root: &Path,
    executor: &dyn Executor,
    prompter: &mut dyn Prompter,
) -> Result<ChangelogPlan, ChangelogError> {
    let (changes, checkpoint) = match mode {
        Mode::Message(text) => {
            let message = match text {
                Some(text) => text.clone(),
                None => read_message(prompter, "Please enter a changelog:")?,
            };
            (changelog::format_message(&message), None)
        }
        Mode::Auto => {
            let history = repo_history(source_root, executor)?;
            let prompt = match recorded {
                None => format!(
                    "No changelog checkpoint for {} yet; please enter a changelog:",
                    manifest.package
                ),
                Some(_) => "No new git commits; please enter a changelog:".to_string(),
            };
            derived_changes(changelog::derive_auto(&history, recorded)?, &prompt, prompter)?
        }
        Mode::FromCommit(id) => {
            let history = repo_history(source_root, executor)?;
            derived_changes(
                changelog::derive_until(&history, id)?,
                "Please enter a changelog:",
                prompter,
            )?
        }
    };
    let entry = changelog::assemble_entry(
        &manifest.package,
        &manifest.version,
        urgency,
        &changes,
        &manifest.maintainer,
        &Local::now(),
    );
    debug!("changelog entry:\n{entry}");
    Ok(ChangelogPlan {
        changes,
        entry,
        checkpoint,
    })
}

/// Turn a derivation into bullet text, prompting when history had nothing
/// to contribute.
fn derived_changes(
    derivation: Derivation,
    prompt: &str,
    prompter: &mut dyn Prompter,
) -> Result<(String, Option<String>), ChangelogError> {
    match derivation {
        Derivation::Entries {
            commits,
            checkpoint,
        } => Ok((changelog::format_commits(&commits), Some(checkpoint))),
        Derivation::NeedsMessage { checkpoint } => {
            let message = read_message(prompter, prompt)?;
            Ok((changelog::format_message(&message), checkpoint))
        }
    }
}

fn read_message(prompter: &mut dyn Prompter, prompt: &str) -> Result<String, ChangelogError> {
    prompter
        .read_multiline(prompt)
        .map_err(ChangelogError::Prompt)
}

fn repo_history(
    source_root: &Path,
    executor: &dyn Executor,
) -> Result<Vec<Commit>, ChangelogError> {
    if !vcs::is_repo(source_root) {
        return Err(ChangelogError::GitUnavailable);
    }
    Ok(vcs::commit_history(executor, source_root)?)
}

/// Names allowed to exist in the source root after the run: everything
/// that was there before, plus the artifact itself.
fn source_snapshot(
    source_root: &Path,
    artifact_name: &str,
) -> Result<HashSet<OsString>, BuildError> {
    let mut names = HashSet::new();
    let entries = fs::read_dir(source_root)
        .map_err(|source| BuildError::io("list source directory", source_root, source))?;
    for entry in entries {
        let entry = entry
            .map_err(|source| BuildError::io("list source directory", source_root, source))?;
        names.insert(entry.file_name());
    }
    names.insert(OsString::from(artifact_name));
    Ok(names)
}

/// Remove anything the run left behind in the source root that was not
/// there before. Failures here are warnings, never fatal.
fn prune_strays(source_root: &Path, snapshot: &HashSet<OsString>) {
    let entries = match fs::read_dir(source_root) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("cleanup: could not list {}: {err}", source_root.display());
            return;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        if snapshot.contains(&name) {
            continue;
        }
        let path = entry.path();
        info!("Removing {}", path.display());
        let removed = match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&path),
            Ok(_) => fs::remove_file(&path),
            Err(source) => Err(source),
        };
        if let Err(source) = removed {
            let warning = CleanupWarning::Remove { path, source };
            warn!("{warning}");
        }
    }
}

/// The package exists by the time this runs; a checkpoint that cannot be
/// written must not turn the run into a failure.
fn persist_checkpoint(package: &str, commit_id: &str) {
    let saved = CheckpointStore::open_default().and_then(|store| store.save(package, commit_id));
    match saved {
        Ok(()) => debug!("changelog checkpoint advanced to {commit_id}"),
        Err(err) => warn!("could not persist changelog checkpoint: {err}"),
    }
}
