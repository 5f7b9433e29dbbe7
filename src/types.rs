//! Plain data types shared by the builder and the file layer.
//!
//! # Search paths
//!
//! A [`SearchPath`] names a place a config file may live. Each variant is
//! expanded into one concrete candidate per supported extension, and the
//! candidates are tried **in list order**: the first file that exists is the
//! one that gets loaded. Later candidates are never consulted once a file is
//! found; there is no merging between files.
//!
//! With app name `myapp` and the default formats the default list
//! (`[Cwd, Etc]`) expands to:
//!
//! ```text
//! ./myapp.toml  ./myapp.yaml  ./myapp.yml  ./myapp.json
//! /etc/myapp/config.toml  /etc/myapp/config.yaml  ...
//! ```
//!
//! An explicit file (`--config <path>` or
//! [`config_file()`](crate::FlagfigBuilder::config_file)) skips the search.

use std::fmt;
use std::path::{Path, PathBuf};

/// Where to look for a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPath {
    /// `./<name>.<ext>` in the working directory.
    Cwd,
    /// `/etc/<app>/config.<ext>`.
    Etc,
    /// `/etc/<name>.<ext>`.
    EtcFlat,
    /// Platform config directory (XDG on Linux, `~/Library/Application Support`
    /// on macOS): `<config_dir>/config.<ext>`.
    Platform,
    /// `<dir>/<name>.<ext>` for an explicit directory.
    Dir(PathBuf),
    /// A single file, used as-is regardless of the configured formats.
    File(PathBuf),
}

/// Supported config file formats, picked by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Toml,
    Yaml,
    Json,
}

impl FileFormat {
    pub const ALL: [FileFormat; 3] = [FileFormat::Toml, FileFormat::Yaml, FileFormat::Json];

    /// Extensions tried for this format, in order.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            FileFormat::Toml => &["toml"],
            FileFormat::Yaml => &["yaml", "yml"],
            FileFormat::Json => &["json"],
        }
    }

    /// Format of a file by its extension. Unknown or missing extensions are
    /// read as TOML.
    pub fn from_path(path: &Path) -> FileFormat {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("yaml" | "yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileFormat::Toml => "toml",
            FileFormat::Yaml => "yaml",
            FileFormat::Json => "json",
        })
    }
}

/// Everything a single resolution run needs to know about its inputs,
/// fixed before any source is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionPolicy {
    /// Fail when the config file is missing or unusable instead of skipping it.
    pub strict: bool,
    /// Prepended verbatim to every environment variable name.
    pub env_prefix: String,
    /// Whether environment variables are consulted at all.
    pub use_env: bool,
    /// Explicit config file; when set the search list is ignored.
    pub config_file: Option<PathBuf>,
    /// Concrete candidate files, in lookup order.
    pub search_paths: Vec<PathBuf>,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            strict: false,
            env_prefix: String::new(),
            use_env: true,
            config_file: None,
            search_paths: Vec::new(),
        }
    }
}
