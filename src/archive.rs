//! Control rendering, subtree compression, and container assembly.
//!
//! The finished artifact is an ar archive holding exactly three members
//! in a fixed order: the `debian-binary` format marker, then the
//! compressed `control` and `data` streams. Compression goes through the
//! tar collaborator; the container itself is assembled in-process.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Manifest;
use crate::error::BuildError;
use crate::exec::Executor;

/// Contents of the `debian-binary` format marker.
pub const FORMAT_VERSION: &str = "2.0\n";

/// Container members in their load-bearing order; package readers expect
/// exactly this sequence.
const MEMBERS: [&str; 3] = ["debian-binary", "control.tar.gz", "data.tar.gz"];

/// Write the format marker file at the staging root.
pub fn write_format_marker(staging_root: &Path) -> Result<(), BuildError> {
    let path = staging_root.join("debian-binary");
    fs::write(&path, FORMAT_VERSION)
        .map_err(|source| BuildError::io("write format marker", &path, source))
}

/// Render the control file: `Key: value` lines in a fixed order, keys
/// title-cased on `-` boundaries, list values joined with `", "`, and
/// description continuation lines indented by one space.
///
/// The manifest's installed size must have been computed by staging.
pub fn render_control(manifest: &Manifest) -> Result<String, BuildError> {
    let size = manifest
        .installed_size_kib
        .ok_or_else(|| BuildError::Stage("installed size has not been computed".to_string()))?;
    let fields: [(&str, String); 9] = [
        ("section", manifest.section.clone()),
        ("priority", manifest.priority.clone()),
        ("depends", manifest.depends.join(", ")),
        ("maintainer", manifest.maintainer.clone()),
        ("description", continuation_indented(&manifest.description)),
        ("package", manifest.package.clone()),
        ("version", manifest.version.clone()),
        ("installed-size", size.to_string()),
        ("architecture", manifest.architecture.clone()),
    ];
    let mut out = String::new();
    for (key, value) in fields {
        out.push_str(&title_case_key(key));
        out.push_str(": ");
        out.push_str(&value);
        out.push('\n');
    }
    Ok(out)
}

/// Render and write the control file into the staged `control/` subtree.
pub fn write_control_file(control_dir: &Path, manifest: &Manifest) -> Result<(), BuildError> {
    let text = render_control(manifest)?;
    debug!("writing control file with contents:\n{text}");
    let path = control_dir.join("control");
    fs::write(&path, text).map_err(|source| BuildError::io("write control file", &path, source))
}

/// Compress `control/` and `data/` into `control.tar.gz` and
/// `data.tar.gz` at the staging root, then delete the staged subtrees.
///
/// tar pipes through pigz rather than using dpkg's own builder; the
/// stock builder compresses single-threaded. `--sort=name` fixes member
/// ordering so the streams are deterministic.
pub fn compress_subtrees(executor: &dyn Executor, staging_root: &Path) -> Result<(), BuildError> {
    for subtree in ["control", "data"] {
        debug!("zipping {subtree}");
        let archive = format!("{subtree}.tar.gz");
        executor.run_in(
            staging_root,
            "tar",
            &[
                "--use-compress-program=pigz",
                "--sort=name",
                "-cf",
                &archive,
                "-C",
                subtree,
                ".",
            ],
        )?;
        let dir = staging_root.join(subtree);
        fs::remove_dir_all(&dir)
            .map_err(|source| BuildError::io("remove staged subtree", &dir, source))?;
    }
    Ok(())
}

/// Concatenate the format marker and the two compressed streams into the
/// final ar container at the staging root. Returns the container path.
pub fn build_container(staging_root: &Path, artifact_name: &str) -> Result<PathBuf, BuildError> {
    let container_path = staging_root.join(artifact_name);
    let file = File::create(&container_path)
        .map_err(|source| BuildError::io("create container", &container_path, source))?;
    let mut builder = ar::Builder::new(file);
    for member in MEMBERS {
        let path = staging_root.join(member);
        builder
            .append_path(&path)
            .map_err(|source| BuildError::io("append container member", &path, source))?;
    }
    Ok(container_path)
}

/// Move the finished container into the destination directory, falling
/// back to copy-then-remove when the rename crosses filesystems.
pub fn relocate(artifact: &Path, dest_dir: &Path) -> Result<PathBuf, BuildError> {
    let name = artifact.file_name().ok_or_else(|| {
        BuildError::Stage(format!(
            "container path {} has no file name",
            artifact.display()
        ))
    })?;
    let target = dest_dir.join(name);
    match fs::rename(artifact, &target) {
        Ok(()) => Ok(target),
        Err(_) => {
            fs::copy(artifact, &target)
                .map_err(|source| BuildError::io("copy container", &target, source))?;
            fs::remove_file(artifact)
                .map_err(|source| BuildError::io("remove container", artifact, source))?;
            Ok(target)
        }
    }
}

fn title_case_key(key: &str) -> String {
    key.split('-')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Indent every line after the first by one space, the control-file
/// continuation convention.
fn continuation_indented(text: &str) -> String {
    let mut lines = text.lines();
    let Some(first) = lines.next() else {
        return String::new();
    };
    let mut out = first.to_string();
    for line in lines {
        out.push_str("\n ");
        out.push_str(line);
    }
    out
}
