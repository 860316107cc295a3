//! Resolve settings.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Options for one resolve call.
///
/// A `Settings` value is an immutable snapshot: providers receive it by
/// shared reference and never mutate it. Use [`Settings::builder`] or
/// [`Settings::new`]; both apply the cross-field rules of
/// [`Settings::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(name = "build_raw", private, validate = "Self::validate"))]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Directory that patterns are resolved against.
    #[builder(default = "default_cwd()")]
    pub cwd: PathBuf,

    /// Maximum depth of directory traversal, relative to each task base.
    #[builder(default = "usize::MAX")]
    pub deep: usize,

    /// Additional exclusion patterns, written in positive form.
    #[builder(default)]
    pub ignore: Vec<String>,

    /// Allow patterns to match entries that begin with a period.
    #[builder(default = "false")]
    pub dot: bool,

    /// Emit entry objects instead of plain paths.
    #[builder(default = "false")]
    pub object_mode: bool,

    /// Attach filesystem metadata to emitted entries. Implies `object_mode`.
    #[builder(default = "false")]
    pub stats: bool,

    /// Emit only files.
    #[builder(default = "true")]
    pub only_files: bool,

    /// Emit only directories. Disables `only_files`.
    #[builder(default = "false")]
    pub only_directories: bool,

    /// Descend into symlinked directories.
    #[builder(default = "true")]
    pub follow_symbolic_links: bool,

    /// Fail when a symbolic link target cannot be read.
    #[builder(default = "false")]
    pub throw_error_on_broken_symbolic_link: bool,

    /// Never emit the same path twice within one call.
    #[builder(default = "true")]
    pub unique: bool,

    /// Append a trailing slash to directory paths.
    #[builder(default = "false")]
    pub mark_directories: bool,

    /// Emit absolute paths.
    #[builder(default = "false")]
    pub absolute: bool,

    /// Recognise `{a,b}` and `{1..3}`.
    #[builder(default = "true")]
    pub brace_expansion: bool,

    /// Case-sensitive matching.
    #[builder(default = "true")]
    pub case_sensitive_match: bool,

    /// Recognise extglob groups such as `@(a|b)`.
    #[builder(default = "true")]
    pub extglob: bool,

    /// Let `**` match across directory separators.
    #[builder(default = "true")]
    pub globstar: bool,

    /// Match slash-less patterns against the base name of each entry.
    #[builder(default = "false")]
    pub base_name_match: bool,

    /// Treat every traversal error as non-fatal.
    #[builder(default = "false")]
    pub suppress_errors: bool,

    /// Number of tasks resolved in parallel (0 = available parallelism).
    #[builder(default = "0")]
    pub concurrency: usize,
}

fn default_cwd() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl SettingsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref cwd) = self.cwd {
            if cwd.as_os_str().is_empty() {
                return Err("Working directory cannot be empty".to_string());
            }
        }
        Ok(())
    }

    /// Build normalized settings.
    pub fn build(&self) -> Result<Settings, SettingsBuilderError> {
        self.build_raw().map(Settings::normalized)
    }
}

impl Settings {
    /// Create a new settings builder.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Create default settings rooted at `cwd`.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            deep: usize::MAX,
            ignore: Vec::new(),
            dot: false,
            object_mode: false,
            stats: false,
            only_files: true,
            only_directories: false,
            follow_symbolic_links: true,
            throw_error_on_broken_symbolic_link: false,
            unique: true,
            mark_directories: false,
            absolute: false,
            brace_expansion: true,
            case_sensitive_match: true,
            extglob: true,
            globstar: true,
            base_name_match: false,
            suppress_errors: false,
            concurrency: 0,
        }
        .normalized()
    }

    /// Apply the cross-field rules.
    ///
    /// `only_directories` wins over `only_files`, `stats` implies
    /// `object_mode` and a zero `concurrency` is resolved to the available
    /// hardware parallelism.
    pub fn normalized(mut self) -> Self {
        if self.only_directories {
            self.only_files = false;
        }
        if self.stats {
            self.object_mode = true;
        }
        if self.concurrency == 0 {
            self.concurrency = default_concurrency();
        }
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(default_cwd())
    }
}
