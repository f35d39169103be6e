//! Debian binary package builder.
//!
//! Builds a `.deb` from a JSON manifest kept in the source tree: the
//! payload is staged under a temporary root, compressed through `tar` and
//! `pigz`, and wrapped together with its control metadata in an `ar`
//! container. Changelog entries can be derived from git history using a
//! per-package checkpoint, so consecutive builds pick up where the last
//! one left off.
//!
//! The public API is organised into four layers:
//!
//! - **[`config`]**: manifest loading, defaulting, and validation
//! - **[`changelog`]**: change-text derivation, entry assembly, checkpoints
//! - **[`staging`]** and **[`archive`]**: payload staging and container assembly
//! - **[`commands`]**: top-level orchestration (`pack`, release upload)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod archive;
pub mod changelog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod platform;
pub mod prompt;
pub mod staging;
pub mod vcs;
