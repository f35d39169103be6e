//! Closed vocabularies used by manifest validation.
//!
//! Debian policy fixes the set of archive sections and priorities; the
//! manifest keeps the raw strings, and these enums only decide whether a
//! given string belongs to the vocabulary.

use strum_macros::{Display, EnumString};

/// Archive section a package may declare.
///
/// Names mirror the Debian policy list verbatim.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Section {
    Admin,
    CliMono,
    Comm,
    Database,
    Debug,
    Devel,
    Doc,
    Editors,
    Education,
    Electronics,
    Embedded,
    Fonts,
    Games,
    Gnome,
    GnuR,
    Gnustep,
    Graphics,
    Hamradio,
    Haskell,
    Httpd,
    Interpreters,
    Introspection,
    Java,
    Javascript,
    Kde,
    Kernel,
    Libdevel,
    Libs,
    Lisp,
    Localization,
    Mail,
    Math,
    Metapackages,
    Misc,
    Net,
    News,
    Ocaml,
    Oldlibs,
    Otherosfs,
    Perl,
    Php,
    Python,
    Ruby,
    Rust,
    Science,
    Shells,
    Sound,
    Tasks,
    Tex,
    Text,
    Utils,
    Vcs,
    Video,
    Web,
    #[strum(serialize = "x11")]
    X11,
    Xfce,
    Zope,
}

/// Installation priority a package may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    /// Necessary for the system to function.
    Required,
    /// Expected on any reasonable installation.
    Important,
    /// Part of a standard character-mode system.
    Standard,
    /// The default for most packages.
    Optional,
}

/// Urgency recorded in the changelog entry title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, clap::ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum Urgency {
    /// Routine upload.
    Low,
    /// The default for most uploads.
    #[default]
    Medium,
    /// Fixes a serious problem.
    High,
    /// Fixes a critical problem in a released version.
    Emergency,
    /// Handled like emergency.
    Critical,
}
