//! Staged package tree construction.
//!
//! A staging area is a temporary directory named `<package>_<version>`
//! holding the two subtrees of a Debian package: `control/` for metadata
//! and maintainer hook scripts, `data/` for the installed payload. This
//! module populates both from the source project: hook scripts, the
//! changelog entry, the optional user build step, and the manifest's
//! build-file copies.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::{self, BuildFile};
use crate::error::{BuildError, CleanupWarning};
use crate::exec::{Executor, path_str};

/// Maintainer hook script names recognized inside the hook directory.
pub const HOOK_SCRIPTS: [&str; 14] = [
    "preinst",
    "new-preinst",
    "old-preinst",
    "postinst",
    "old-postinst",
    "conflictor's-postinst",
    "deconfigured's-postinst",
    "prerm",
    "old-prerm",
    "new-prerm",
    "postrm",
    "old-postrm",
    "disappearer's-postrm",
    "new-postrm",
];

/// Entry names excluded from recursive build-file copies at every depth.
const COPY_EXCLUDES: [&str; 3] = [config::PACK_DIR, ".git", ".gitignore"];

/// Name of the payload documentation file holding the changelog entry.
const CHANGELOG_FILE: &str = "changelog.Debian";

/// Temporary working tree for one package build.
///
/// Removal is normally driven by the orchestrator's cleanup phase through
/// [`StagingArea::remove`]; dropping an unremoved area removes it as a
/// backstop so no failure path leaks the tree.
#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
    removed: bool,
}

impl StagingArea {
    /// Create `<base>/<dir_name>` with empty `control/` and `data/`
    /// subtrees, replacing a stale tree left behind by a crashed earlier
    /// run.
    pub fn create(base: &Path, dir_name: &str) -> Result<Self, BuildError> {
        let root = base.join(dir_name);
        if fs::symlink_metadata(&root).is_ok() {
            warn!("removing stale staging directory {}", root.display());
            fs::remove_dir_all(&root)
                .map_err(|source| BuildError::io("remove stale staging directory", &root, source))?;
        }
        for subtree in ["control", "data"] {
            let dir = root.join(subtree);
            fs::create_dir_all(&dir)
                .map_err(|source| BuildError::io("create staging subtree", &dir, source))?;
        }
        Ok(Self {
            root,
            removed: false,
        })
    }

    /// The staging root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `control/` subtree.
    #[must_use]
    pub fn control_dir(&self) -> PathBuf {
        self.root.join("control")
    }

    /// The `data/` subtree.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Copy recognized maintainer hook scripts from the project's hook
    /// directory into `control/`, preserving names and permissions.
    /// Returns the names staged, in vocabulary order.
    pub fn stage_hook_scripts(&self, source_root: &Path) -> Result<Vec<&'static str>, BuildError> {
        let hooks = config::hooks_dir(source_root);
        let mut staged = Vec::new();
        for name in HOOK_SCRIPTS {
            let script = hooks.join(name);
            if script.is_file() {
                debug!("adding {name}");
                fs::copy(&script, self.control_dir().join(name))
                    .map_err(|source| BuildError::io("copy hook script", &script, source))?;
                staged.push(name);
            }
        }
        Ok(staged)
    }

    /// Write an assembled changelog entry into the payload's doc path,
    /// `data/usr/share/doc/<package>/changelog.Debian`.
    pub fn write_changelog(&self, package: &str, entry: &str) -> Result<PathBuf, BuildError> {
        let doc_dir = self
            .data_dir()
            .join("usr")
            .join("share")
            .join("doc")
            .join(package);
        fs::create_dir_all(&doc_dir)
            .map_err(|source| BuildError::io("create doc directory", &doc_dir, source))?;
        let path = doc_dir.join(CHANGELOG_FILE);
        // Tiny file; not worth gzipping.
        fs::write(&path, entry).map_err(|source| BuildError::io("write changelog", &path, source))?;
        Ok(path)
    }

    /// Run the user build script if the project has one, with `data/` as
    /// its working directory and the absolute source root and data root
    /// exposed as `SRC` and `DEST` on the child. Returns whether a script
    /// ran; a non-zero exit propagates as a [`BuildError`].
    pub fn run_build_script(
        &self,
        executor: &dyn Executor,
        source_root: &Path,
    ) -> Result<bool, BuildError> {
        let script = config::build_script_path(source_root);
        if !script.is_file() {
            debug!("no build script to execute");
            return Ok(false);
        }
        let data = self.data_dir();
        let program = path_str(&script)?;
        let src = path_str(source_root)?;
        let dest = path_str(&data)?;
        debug!("running build script {program}");
        executor.run_in_with_env(&data, program, &[], &[("SRC", src), ("DEST", dest)])?;
        Ok(true)
    }

    /// Copy the manifest's build files into the payload, in manifest
    /// order.
    pub fn stage_build_files(
        &self,
        files: &[BuildFile],
        source_root: &Path,
    ) -> Result<(), BuildError> {
        for file in files {
            let source = source_root.join(&file.source);
            if fs::symlink_metadata(&source).is_err() {
                return Err(BuildError::Stage(format!(
                    "copy source {} does not exist",
                    source.display()
                )));
            }
            let dest = self.resolve_dest(&file.dest, &source)?;
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .map_err(|source| BuildError::io("create destination directory", parent, source))?;
            }
            debug!("copying {} -> {}", source.display(), dest.display());
            copy_recursive(&source, &dest)?;
        }
        Ok(())
    }

    /// Payload size in kibibytes: the sum of regular-file sizes under
    /// `data/`, rounded up to the next kibibyte.
    pub fn payload_size_kib(&self) -> Result<u64, BuildError> {
        let mut bytes: u64 = 0;
        for entry in WalkDir::new(self.data_dir()) {
            let entry =
                entry.map_err(|source| BuildError::Stage(format!("walk payload: {source}")))?;
            if entry.file_type().is_file() {
                let meta = entry.metadata().map_err(|source| {
                    BuildError::Stage(format!("stat {}: {source}", entry.path().display()))
                })?;
                bytes += meta.len();
            }
        }
        Ok(bytes.div_ceil(1024))
    }

    /// Remove the staging tree. A tree that is already gone, or resists
    /// removal, is a [`CleanupWarning`] for the caller to log, never an
    /// abort.
    pub fn remove(&mut self) -> Result<(), CleanupWarning> {
        self.removed = true;
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                Err(CleanupWarning::StagingGone {
                    path: self.root.clone(),
                })
            }
            Err(source) => Err(CleanupWarning::Remove {
                path: self.root.clone(),
                source,
            }),
        }
    }

    /// Apply the destination conventions: a leading separator is read as
    /// relative to the payload root, a trailing separator means "copy
    /// into this directory" and appends the source's file name.
    fn resolve_dest(&self, dest: &str, source: &Path) -> Result<PathBuf, BuildError> {
        let trimmed = dest.strip_prefix('/').unwrap_or(dest);
        let base = self.data_dir().join(trimmed);
        if trimmed.ends_with('/') {
            let name = source.file_name().ok_or_else(|| {
                BuildError::Stage(format!(
                    "cannot derive a file name from {}",
                    source.display()
                ))
            })?;
            Ok(base.join(name))
        } else {
            Ok(base)
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if !self.removed {
            let _ = fs::remove_dir_all(&self.root);
        }
    }
}

/// Copy `source` to `dest`: regular files byte-for-byte with permissions,
/// symlinks recreated rather than followed, directories recursively with
/// packaging-internal entries excluded at every depth.
fn copy_recursive(source: &Path, dest: &Path) -> Result<(), BuildError> {
    let meta = fs::symlink_metadata(source)
        .map_err(|source_err| BuildError::io("inspect copy source", source, source_err))?;
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        recreate_symlink(source, dest)
    } else if file_type.is_dir() {
        fs::create_dir_all(dest).map_err(|source_err| BuildError::io("create directory", dest, source_err))?;
        let entries = fs::read_dir(source)
            .map_err(|source_err| BuildError::io("read directory", source, source_err))?;
        for entry in entries {
            let entry =
                entry.map_err(|source_err| BuildError::io("read directory", source, source_err))?;
            let name = entry.file_name();
            if is_excluded(&name) {
                continue;
            }
            copy_recursive(&entry.path(), &dest.join(&name))?;
        }
        Ok(())
    } else {
        fs::copy(source, dest).map_err(|source_err| BuildError::io("copy file", source, source_err))?;
        Ok(())
    }
}

fn is_excluded(name: &OsStr) -> bool {
    name.to_str().is_some_and(|name| COPY_EXCLUDES.contains(&name))
}

#[cfg(unix)]
fn recreate_symlink(source: &Path, dest: &Path) -> Result<(), BuildError> {
    let target =
        fs::read_link(source).map_err(|source_err| BuildError::io("read symlink", source, source_err))?;
    if fs::symlink_metadata(dest).is_ok() {
        let _ = fs::remove_file(dest);
    }
    std::os::unix::fs::symlink(&target, dest)
        .map_err(|source_err| BuildError::io("create symlink", dest, source_err))
}

#[cfg(not(unix))]
fn recreate_symlink(source: &Path, _dest: &Path) -> Result<(), BuildError> {
    Err(BuildError::Stage(format!(
        "cannot recreate symlink {} on this platform",
        source.display()
    )))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedExecutor;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, contents).expect("write");
    }

    fn area(base: &Path) -> StagingArea {
        StagingArea::create(base, "widget_1.0-1").expect("create staging area")
    }

    // -----------------------------------------------------------------------
    // Tree lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn create_builds_control_and_data_subtrees() {
        let base = tempfile::tempdir().expect("tempdir");
        let staging = area(base.path());
        assert!(staging.control_dir().is_dir());
        assert!(staging.data_dir().is_dir());
        assert_eq!(staging.root(), base.path().join("widget_1.0-1"));
    }

    #[test]
    fn create_replaces_a_stale_tree() {
        let base = tempfile::tempdir().expect("tempdir");
        let stale = base.path().join("widget_1.0-1").join("leftover.txt");
        write(&stale, "old run");
        let staging = area(base.path());
        assert!(!stale.exists());
        assert!(staging.data_dir().is_dir());
    }

    #[test]
    fn remove_deletes_the_tree() {
        let base = tempfile::tempdir().expect("tempdir");
        let mut staging = area(base.path());
        let root = staging.root().to_path_buf();
        staging.remove().expect("remove");
        assert!(!root.exists());
    }

    #[test]
    fn removing_an_already_gone_tree_is_a_warning() {
        let base = tempfile::tempdir().expect("tempdir");
        let mut staging = area(base.path());
        staging.remove().expect("remove");
        let warning = staging.remove().expect_err("second remove should warn");
        assert!(matches!(warning, CleanupWarning::StagingGone { .. }));
    }

    #[test]
    fn dropping_an_unremoved_area_cleans_up() {
        let base = tempfile::tempdir().expect("tempdir");
        let root = {
            let staging = area(base.path());
            staging.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    // -----------------------------------------------------------------------
    // Hook scripts
    // -----------------------------------------------------------------------

    #[test]
    fn recognized_hook_scripts_are_copied_into_control() {
        let base = tempfile::tempdir().expect("tempdir");
        let project = tempfile::tempdir().expect("tempdir");
        let hooks = config::hooks_dir(project.path());
        write(&hooks.join("postinst"), "#!/bin/sh\nexit 0\n");
        write(&hooks.join("prerm"), "#!/bin/sh\nexit 0\n");
        write(&hooks.join("README"), "not a hook");

        let staging = area(base.path());
        let staged = staging
            .stage_hook_scripts(project.path())
            .expect("stage hooks");

        assert_eq!(staged, vec!["postinst", "prerm"]);
        assert!(staging.control_dir().join("postinst").is_file());
        assert!(staging.control_dir().join("prerm").is_file());
        assert!(!staging.control_dir().join("README").exists());
    }

    #[test]
    fn missing_hook_directory_stages_nothing() {
        let base = tempfile::tempdir().expect("tempdir");
        let project = tempfile::tempdir().expect("tempdir");
        let staging = area(base.path());
        let staged = staging
            .stage_hook_scripts(project.path())
            .expect("stage hooks");
        assert!(staged.is_empty());
    }

    // -----------------------------------------------------------------------
    // Changelog placement
    // -----------------------------------------------------------------------

    #[test]
    fn changelog_lands_under_the_package_doc_path() {
        let base = tempfile::tempdir().expect("tempdir");
        let staging = area(base.path());
        let path = staging
            .write_changelog("widget", "widget (1.0-1) any; urgency=medium")
            .expect("write changelog");
        assert_eq!(
            path,
            staging
                .data_dir()
                .join("usr/share/doc/widget/changelog.Debian")
        );
        let contents = fs::read_to_string(path).expect("read");
        assert!(contents.starts_with("widget (1.0-1)"));
    }

    // -----------------------------------------------------------------------
    // Build script
    // -----------------------------------------------------------------------

    #[test]
    fn absent_build_script_is_skipped() {
        let base = tempfile::tempdir().expect("tempdir");
        let project = tempfile::tempdir().expect("tempdir");
        let staging = area(base.path());
        let executor = ScriptedExecutor::succeeding();
        let ran = staging
            .run_build_script(&executor, project.path())
            .expect("run");
        assert!(!ran);
        assert!(executor.calls().is_empty());
    }

    #[test]
    fn build_script_is_invoked_when_present() {
        let base = tempfile::tempdir().expect("tempdir");
        let project = tempfile::tempdir().expect("tempdir");
        write(&config::build_script_path(project.path()), "#!/bin/sh\n");
        let staging = area(base.path());
        let executor = ScriptedExecutor::succeeding();
        let ran = staging
            .run_build_script(&executor, project.path())
            .expect("run");
        assert!(ran);
        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].ends_with(".debpack/build"));
    }

    #[test]
    fn failing_build_script_aborts() {
        let base = tempfile::tempdir().expect("tempdir");
        let project = tempfile::tempdir().expect("tempdir");
        write(&config::build_script_path(project.path()), "#!/bin/sh\n");
        let staging = area(base.path());
        let executor =
            ScriptedExecutor::with_responses(vec![(false, "make: *** error".to_string())]);
        let err = staging
            .run_build_script(&executor, project.path())
            .expect_err("should fail");
        assert!(matches!(err, BuildError::CommandFailed { .. }));
    }

    // -----------------------------------------------------------------------
    // Build-file copies
    // -----------------------------------------------------------------------

    #[test]
    fn file_copies_to_an_exact_destination_path() {
        let base = tempfile::tempdir().expect("tempdir");
        let project = tempfile::tempdir().expect("tempdir");
        write(&project.path().join("widget.sh"), "#!/bin/sh\necho hi\n");
        let staging = area(base.path());
        staging
            .stage_build_files(
                &[BuildFile {
                    source: "widget.sh".to_string(),
                    dest: "/usr/bin/widget".to_string(),
                }],
                project.path(),
            )
            .expect("stage");
        let copied = staging.data_dir().join("usr/bin/widget");
        assert_eq!(
            fs::read_to_string(copied).expect("read"),
            "#!/bin/sh\necho hi\n"
        );
    }

    #[test]
    fn trailing_separator_copies_into_the_directory() {
        let base = tempfile::tempdir().expect("tempdir");
        let project = tempfile::tempdir().expect("tempdir");
        write(&project.path().join("assets/logo.txt"), "logo");
        let staging = area(base.path());
        staging
            .stage_build_files(
                &[BuildFile {
                    source: "assets/logo.txt".to_string(),
                    dest: "/usr/share/widget/".to_string(),
                }],
                project.path(),
            )
            .expect("stage");
        assert!(
            staging
                .data_dir()
                .join("usr/share/widget/logo.txt")
                .is_file()
        );
    }

    #[test]
    fn directory_copies_recursively_excluding_packaging_internals() {
        let base = tempfile::tempdir().expect("tempdir");
        let project = tempfile::tempdir().expect("tempdir");
        write(&project.path().join("tree/keep.txt"), "keep");
        write(&project.path().join("tree/.gitignore"), "ignored");
        write(&project.path().join("tree/.git/config"), "git");
        write(&project.path().join("tree/sub/.debpack/config.json"), "{}");
        write(&project.path().join("tree/sub/nested.txt"), "nested");

        let staging = area(base.path());
        staging
            .stage_build_files(
                &[BuildFile {
                    source: "tree".to_string(),
                    dest: "/opt/widget".to_string(),
                }],
                project.path(),
            )
            .expect("stage");

        let dest = staging.data_dir().join("opt/widget");
        assert!(dest.join("keep.txt").is_file());
        assert!(dest.join("sub/nested.txt").is_file());
        assert!(!dest.join(".gitignore").exists());
        assert!(!dest.join(".git").exists());
        assert!(!dest.join("sub/.debpack").exists());
    }

    #[test]
    fn missing_copy_source_is_a_stage_error() {
        let base = tempfile::tempdir().expect("tempdir");
        let project = tempfile::tempdir().expect("tempdir");
        let staging = area(base.path());
        let err = staging
            .stage_build_files(
                &[BuildFile {
                    source: "no-such-file".to_string(),
                    dest: "/usr/bin/widget".to_string(),
                }],
                project.path(),
            )
            .expect_err("should fail");
        assert!(err.to_string().contains("does not exist"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_recreated_not_followed() {
        let base = tempfile::tempdir().expect("tempdir");
        let project = tempfile::tempdir().expect("tempdir");
        write(&project.path().join("tree/real.txt"), "real");
        std::os::unix::fs::symlink("real.txt", project.path().join("tree/link.txt"))
            .expect("symlink");

        let staging = area(base.path());
        staging
            .stage_build_files(
                &[BuildFile {
                    source: "tree".to_string(),
                    dest: "/opt/widget".to_string(),
                }],
                project.path(),
            )
            .expect("stage");

        let link = staging.data_dir().join("opt/widget/link.txt");
        let meta = fs::symlink_metadata(&link).expect("lstat");
        assert!(meta.file_type().is_symlink());
        assert_eq!(fs::read_link(&link).expect("readlink"), Path::new("real.txt"));
    }

    // -----------------------------------------------------------------------
    // Payload size
    // -----------------------------------------------------------------------

    #[test]
    fn payload_size_rounds_up_to_kibibytes() {
        let base = tempfile::tempdir().expect("tempdir");
        let staging = area(base.path());
        write(&staging.data_dir().join("one.bin"), "x");
        fs::write(staging.data_dir().join("two.bin"), vec![0_u8; 2048]).expect("write");
        assert_eq!(staging.payload_size_kib().expect("size"), 3);
    }

    #[test]
    fn empty_payload_has_zero_size() {
        let base = tempfile::tempdir().expect("tempdir");
        let staging = area(base.path());
        assert_eq!(staging.payload_size_kib().expect("size"), 0);
    }
}
