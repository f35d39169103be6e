//! Project layout, manifest loading, and the resolved package model.
//!
//! A packaged project keeps its inputs under a `.debpack/` directory at the
//! source root: the JSON manifest, an optional build script, and optional
//! maintainer hook scripts. This module knows those paths, reads the raw
//! manifest, and defines the [`Manifest`] type that resolution produces.

pub mod resolver;
pub mod vocab;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Directory holding all packaging inputs inside the source root.
pub const PACK_DIR: &str = ".debpack";

/// Manifest file name inside [`PACK_DIR`].
pub const MANIFEST_FILE: &str = "config.json";

/// Optional executable build script inside [`PACK_DIR`].
pub const BUILD_SCRIPT: &str = "build";

/// Directory of maintainer hook scripts inside [`PACK_DIR`].
pub const HOOKS_DIR: &str = "maintainer_scripts";

/// Path of the manifest file under `source_root`.
#[must_use]
pub fn manifest_path(source_root: &Path) -> PathBuf {
    source_root.join(PACK_DIR).join(MANIFEST_FILE)
}

/// Path of the optional build script under `source_root`.
#[must_use]
pub fn build_script_path(source_root: &Path) -> PathBuf {
    source_root.join(PACK_DIR).join(BUILD_SCRIPT)
}

/// Path of the maintainer hook script directory under `source_root`.
#[must_use]
pub fn hooks_dir(source_root: &Path) -> PathBuf {
    source_root.join(PACK_DIR).join(HOOKS_DIR)
}

/// Read the manifest under `source_root` into its raw key/value map.
///
/// A missing file maps to [`ConfigError::ManifestNotFound`] so the caller
/// can surface the "wrong directory" message; any parsed document whose
/// root is not a JSON object is rejected.
pub fn load_raw(source_root: &Path) -> Result<Map<String, Value>, ConfigError> {
    let path = manifest_path(source_root);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::ManifestNotFound);
        }
        Err(source) => return Err(ConfigError::ManifestRead { path, source }),
    };
    match serde_json::from_str(text.trim())? {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::ManifestShape),
    }
}

/// One copy step from the source tree into the staged payload.
///
/// `dest` is relative to the payload root once its leading separator is
/// stripped; a trailing separator means "copy into this directory".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFile {
    /// Path relative to the source root.
    pub source: String,
    /// Destination inside the payload.
    pub dest: String,
}

/// Fully resolved package description.
///
/// Every field except `installed_size_kib` is final before staging begins;
/// the installed size is only knowable after the payload exists and is
/// filled in by the staging phase.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Package name, derived from the source root's basename.
    pub package: String,
    /// Version including its revision suffix.
    pub version: String,
    /// Archive section, drawn from the fixed vocabulary.
    pub section: String,
    /// Installation priority, drawn from the fixed vocabulary.
    pub priority: String,
    /// Package dependencies, order preserved.
    pub depends: Vec<String>,
    /// Maintainer as `Name <email>`.
    pub maintainer: String,
    /// Normalized description: lines trimmed, blank lines replaced by `.`.
    pub description: String,
    /// Target architecture, a dpkg architecture name or `all`.
    pub architecture: String,
    /// Payload size in kibibytes, filled in after staging.
    pub installed_size_kib: Option<u64>,
    /// Copy steps from the `build.files` mapping, in manifest order.
    pub build_files: Vec<BuildFile>,
    /// Unrecognized manifest keys, passed through untouched.
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// Name of the temporary staging directory for this package.
    #[must_use]
    pub fn staging_dir_name(&self) -> String {
        format!("{}_{}", self.package, self.version)
    }

    /// File name of the finished artifact.
    #[must_use]
    pub fn artifact_name(&self) -> String {
        format!("{}_{}_{}.deb", self.package, self.version, self.architecture)
    }
}
