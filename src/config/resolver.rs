//! Manifest resolution: defaulting, transforming, and validating keys.
//!
//! Resolution walks a fixed, ordered table of field descriptors. Each
//! descriptor names a manifest key and carries a default (or marks the key
//! required), an optional validation predicate, a transform, and a flag
//! choosing whether validation runs on the raw value or on the transformed
//! one. Absent keys with a default produce a [`ResolutionWarning`]; absent
//! keys without one abort resolution. Keys outside the table pass through
//! untouched.
//!
//! Defaults that probe the environment (committer identity, host
//! architecture) run lazily, only when the key is actually absent.

use std::path::Path;
use std::str::FromStr as _;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use super::vocab::{Priority, Section};
use super::{BuildFile, Manifest};
use crate::error::ConfigError;
use crate::exec::Executor;
use crate::platform;
use crate::vcs;

#[allow(clippy::expect_used)] // patterns are literals
static REVISION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-[0-9]$").expect("literal pattern"));

#[allow(clippy::expect_used)] // patterns are literals
static MAINTAINER_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".+ <.+@.+\..+>").expect("literal pattern"));

/// Environment handles the resolver may consult while computing defaults
/// and transforms.
pub struct ResolveContext<'a> {
    /// Runs the committer-identity and host-architecture probes.
    pub executor: &'a dyn Executor,
    /// Source project root; its basename becomes the package name.
    pub source_root: &'a Path,
}

/// Record of a key that fell back to its default during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionWarning {
    /// The manifest key that was absent.
    pub key: &'static str,
    /// Rendering of the applied default.
    pub value: String,
}

impl std::fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Using default for {} ({})", self.key, self.value)
    }
}

/// When a field's validation predicate runs relative to its transform.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ValidateOrder {
    /// Validate the raw manifest value, then transform it.
    BeforeTransform,
    /// Transform the value, then validate the result.
    AfterTransform,
}

/// How an absent key obtains its value.
enum FieldDefault {
    /// No default; absence aborts resolution.
    Required,
    /// A fixed default value.
    Fixed(fn() -> Value),
    /// A default computed from the environment.
    Probe(fn(&ResolveContext<'_>) -> Result<Value, ConfigError>),
}

/// One row of the resolution table.
struct FieldSpec {
    key: &'static str,
    default: FieldDefault,
    validate: Option<fn(&Value) -> bool>,
    order: ValidateOrder,
    transform: fn(&ResolveContext<'_>, &'static str, Value) -> Result<Value, ConfigError>,
}

/// The resolution table. Order is load-bearing: it fixes which keys are
/// handled (and warned about) first and prefixes the control file layout.
static FIELDS: [FieldSpec; 7] = [
    FieldSpec {
        key: "section",
        default: FieldDefault::Required,
        validate: Some(is_section_name),
        order: ValidateOrder::AfterTransform,
        transform: trim_string,
    },
    FieldSpec {
        key: "priority",
        default: FieldDefault::Fixed(default_priority),
        validate: Some(is_priority_name),
        order: ValidateOrder::AfterTransform,
        transform: trim_string,
    },
    FieldSpec {
        key: "depends",
        default: FieldDefault::Fixed(default_depends),
        validate: None,
        order: ValidateOrder::AfterTransform,
        transform: trim_string_list,
    },
    FieldSpec {
        key: "maintainer",
        default: FieldDefault::Probe(probe_maintainer),
        validate: Some(is_maintainer_shape),
        order: ValidateOrder::AfterTransform,
        transform: flatten_maintainer,
    },
    FieldSpec {
        key: "description",
        default: FieldDefault::Required,
        validate: None,
        order: ValidateOrder::AfterTransform,
        transform: normalize_description,
    },
    FieldSpec {
        key: "architecture_all",
        default: FieldDefault::Fixed(default_architecture_all),
        validate: Some(Value::is_boolean),
        order: ValidateOrder::BeforeTransform,
        transform: resolve_architecture,
    },
    FieldSpec {
        key: "build",
        default: FieldDefault::Required,
        validate: Some(is_build_shape),
        order: ValidateOrder::BeforeTransform,
        transform: keep,
    },
];

/// Resolve a raw manifest map into a [`Manifest`].
///
/// `cli_version` is the version given on the command line, before the
/// revision-suffix rule is applied. `arch_all` forces `architecture_all`
/// to true regardless of what the manifest says.
pub fn resolve(
    raw: Map<String, Value>,
    ctx: &ResolveContext<'_>,
    cli_version: &str,
    arch_all: bool,
) -> Result<(Manifest, Vec<ResolutionWarning>), ConfigError> {
    let mut remaining = raw;
    if arch_all {
        remaining.insert("architecture_all".to_string(), Value::Bool(true));
    }

    let mut warnings = Vec::new();
    let mut resolved: Map<String, Value> = Map::new();
    for spec in &FIELDS {
        let value = match remaining.remove(spec.key) {
            Some(value) => value,
            None => apply_default(spec, ctx, &mut warnings)?,
        };
        let value = run_field(spec, ctx, value)?;
        resolved.insert(spec.key.to_string(), value);
    }

    let manifest = Manifest {
        package: package_name(ctx.source_root)?,
        version: versioned(cli_version),
        section: take_string(&mut resolved, "section")?,
        priority: take_string(&mut resolved, "priority")?,
        depends: take_string_list(&mut resolved, "depends")?,
        maintainer: take_string(&mut resolved, "maintainer")?,
        description: take_string(&mut resolved, "description")?,
        architecture: take_string(&mut resolved, "architecture_all")?,
        installed_size_kib: None,
        build_files: take_build_files(&mut resolved)?,
        extra: remaining,
    };
    Ok((manifest, warnings))
}

fn apply_default(
    spec: &FieldSpec,
    ctx: &ResolveContext<'_>,
    warnings: &mut Vec<ResolutionWarning>,
) -> Result<Value, ConfigError> {
    let value = match spec.default {
        FieldDefault::Required => return Err(ConfigError::MissingKey { key: spec.key }),
        FieldDefault::Fixed(make) => make(),
        FieldDefault::Probe(probe) => probe(ctx)?,
    };
    let warning = ResolutionWarning {
        key: spec.key,
        value: display_value(&value),
    };
    warn!("{warning}");
    warnings.push(warning);
    Ok(value)
}

fn run_field(
    spec: &FieldSpec,
    ctx: &ResolveContext<'_>,
    value: Value,
) -> Result<Value, ConfigError> {
    let check = |value: &Value| match spec.validate {
        Some(pred) if !pred(value) => Err(validation_error(spec.key, value)),
        _ => Ok(()),
    };
    match spec.order {
        ValidateOrder::BeforeTransform => {
            check(&value)?;
            (spec.transform)(ctx, spec.key, value)
        }
        ValidateOrder::AfterTransform => {
            let value = (spec.transform)(ctx, spec.key, value)?;
            check(&value)?;
            Ok(value)
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_priority() -> Value {
    Value::String("optional".to_string())
}

fn default_depends() -> Value {
    Value::Array(Vec::new())
}

fn default_architecture_all() -> Value {
    Value::Bool(false)
}

fn probe_maintainer(ctx: &ResolveContext<'_>) -> Result<Value, ConfigError> {
    Ok(Value::String(vcs::committer_identity(ctx.executor)?))
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

fn trim_string(
    _: &ResolveContext<'_>,
    key: &'static str,
    value: Value,
) -> Result<Value, ConfigError> {
    match value {
        Value::String(s) => Ok(Value::String(s.trim().to_string())),
        other => Err(validation_error(key, &other)),
    }
}

fn trim_string_list(
    _: &ResolveContext<'_>,
    key: &'static str,
    value: Value,
) -> Result<Value, ConfigError> {
    match value {
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                match item.as_str() {
                    Some(text) => out.push(Value::String(text.trim().to_string())),
                    None => return Err(validation_error(key, &Value::Array(items.clone()))),
                }
            }
            Ok(Value::Array(out))
        }
        other => Err(validation_error(key, &other)),
    }
}

/// Accepts either a preformatted `Name <email>` string or a
/// `{ "name": ..., "email": ... }` object; the shape check runs afterwards
/// in both cases.
fn flatten_maintainer(
    _: &ResolveContext<'_>,
    key: &'static str,
    value: Value,
) -> Result<Value, ConfigError> {
    match value {
        Value::String(s) => Ok(Value::String(s.trim().to_string())),
        Value::Object(fields) => {
            let name = fields.get("name").and_then(Value::as_str).map(str::to_string);
            let email = fields.get("email").and_then(Value::as_str).map(str::to_string);
            match (name, email) {
                (Some(name), Some(email)) => Ok(Value::String(format!("{name} <{email}>"))),
                _ => Err(validation_error(key, &Value::Object(fields))),
            }
        }
        other => Err(validation_error(key, &other)),
    }
}

/// Trims every line and replaces blank lines with `.`, the control-file
/// paragraph separator. Continuation indentation is applied when the
/// control file is rendered, not here.
fn normalize_description(
    _: &ResolveContext<'_>,
    key: &'static str,
    value: Value,
) -> Result<Value, ConfigError> {
    match value {
        Value::String(text) => {
            let normalized = text
                .split('\n')
                .map(|line| {
                    let line = line.trim();
                    if line.is_empty() { "." } else { line }
                })
                .collect::<Vec<_>>()
                .join("\n");
            Ok(Value::String(normalized))
        }
        other => Err(validation_error(key, &other)),
    }
}

/// `true` means architecture-independent; `false` resolves the host
/// architecture through dpkg.
fn resolve_architecture(
    ctx: &ResolveContext<'_>,
    key: &'static str,
    value: Value,
) -> Result<Value, ConfigError> {
    match value {
        Value::Bool(true) => Ok(Value::String("all".to_string())),
        Value::Bool(false) => Ok(Value::String(platform::host_architecture(ctx.executor)?)),
        other => Err(validation_error(key, &other)),
    }
}

fn keep(_: &ResolveContext<'_>, _: &'static str, value: Value) -> Result<Value, ConfigError> {
    Ok(value)
}

// ---------------------------------------------------------------------------
// Validation predicates
// ---------------------------------------------------------------------------

fn is_section_name(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| Section::from_str(s).is_ok())
}

fn is_priority_name(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| Priority::from_str(s).is_ok())
}

fn is_maintainer_shape(value: &Value) -> bool {
    value.as_str().is_some_and(|s| MAINTAINER_SHAPE.is_match(s))
}

fn is_build_shape(value: &Value) -> bool {
    value
        .get("files")
        .and_then(Value::as_object)
        .is_some_and(|files| files.values().all(Value::is_string))
}

// ---------------------------------------------------------------------------
// Computed fields and extraction
// ---------------------------------------------------------------------------

fn package_name(source_root: &Path) -> Result<String, ConfigError> {
    source_root
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ConfigError::PackageName {
            path: source_root.to_path_buf(),
        })
}

/// Apply the revision-suffix rule: a version without a trailing
/// `-<digit>` gets `-1` appended.
fn versioned(cli_version: &str) -> String {
    if REVISION_SUFFIX.is_match(cli_version) {
        cli_version.to_string()
    } else {
        format!("{cli_version}-1")
    }
}

/// Render a JSON value for warning and error messages: strings bare,
/// everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn validation_error(key: &'static str, value: &Value) -> ConfigError {
    ConfigError::Validation {
        key,
        value: display_value(value),
    }
}

fn take_string(resolved: &mut Map<String, Value>, key: &'static str) -> Result<String, ConfigError> {
    match resolved.remove(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(validation_error(key, &other)),
        None => Err(ConfigError::MissingKey { key }),
    }
}

fn take_string_list(
    resolved: &mut Map<String, Value>,
    key: &'static str,
) -> Result<Vec<String>, ConfigError> {
    match resolved.remove(key) {
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                match item.as_str() {
                    Some(text) => out.push(text.to_string()),
                    None => return Err(validation_error(key, &Value::Array(items.clone()))),
                }
            }
            Ok(out)
        }
        Some(other) => Err(validation_error(key, &other)),
        None => Err(ConfigError::MissingKey { key }),
    }
}

fn take_build_files(resolved: &mut Map<String, Value>) -> Result<Vec<BuildFile>, ConfigError> {
    let Some(build) = resolved.remove("build") else {
        return Err(ConfigError::MissingKey { key: "build" });
    };
    let files = match build.get("files").and_then(Value::as_object) {
        Some(files) => files,
        None => return Err(validation_error("build", &build)),
    };
    Ok(files
        .iter()
        .map(|(source, dest)| BuildFile {
            source: source.clone(),
            dest: dest.as_str().unwrap_or_default().to_string(),
        })
        .collect())
}
