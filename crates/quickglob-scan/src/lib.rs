//! Filesystem resolution for quickglob.
//!
//! This crate turns glob patterns into the entries they match, using jwalk
//! for parallel directory traversal.
//!
//! # Overview
//!
//! Patterns are grouped into tasks by base directory (see
//! [`generate_tasks`]). Each task walks its base once and runs every entry
//! through the filter pipeline:
//!
//! - **Deep filter** prunes directories that cannot contain a match
//! - **Entry filter** applies type, pattern, exclusion and uniqueness rules
//! - **Error filter** decides which traversal errors are fatal
//!
//! Three execution modes share that pipeline: [`glob_sync`], [`glob`] and
//! [`glob_stream`].
//!
//! # Example
//!
//! ```rust,no_run
//! use quickglob_scan::{Settings, glob_sync};
//!
//! let settings = Settings::new("/path/to/project");
//! let entries = glob_sync(vec!["src/**/*.rs", "!**/target/**"], &settings).unwrap();
//!
//! for entry in entries {
//!     println!("{entry}");
//! }
//! ```
//!
//! # Streaming
//!
//! ```rust,no_run
//! use quickglob_scan::{Settings, glob_stream};
//!
//! # async fn run() -> Result<(), quickglob_scan::GlobError> {
//! let mut stream = glob_stream("**/*.md", &Settings::default())?;
//! while let Some(entry) = stream.recv().await {
//!     println!("{}", entry?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod filters;
mod future;
pub mod provider;
mod resolver;
mod stream;
mod sync;
mod transform;
mod unique;
pub mod walker;

pub use future::glob;
pub use resolver::{GlobResolver, Patterns};
pub use stream::{GlobStream, glob_stream};
pub use sync::glob_sync;
pub use transform::EntryTransformer;
pub use unique::UniqueTracker;
pub use walker::{JwalkWalker, WalkEntry, WalkOptions, Walker};

// Re-export core types for convenience
pub use quickglob_core::{
    Entry, EntryItem, EntryKind, EntryStats, ErrorKind, GlobError, Matcher, MatcherOptions,
    Settings, SettingsBuilder, Task,
};
pub use quickglob_core::pattern::escape_path;

/// Validate `patterns` and build their tasks.
pub fn generate_tasks(
    patterns: impl Into<Patterns>,
    settings: &Settings,
) -> Result<Vec<Task>, GlobError> {
    GlobResolver::new(settings.clone()).tasks(patterns)
}

/// Whether `pattern` needs a matcher under `settings`, as opposed to a
/// plain existence check.
pub fn is_dynamic_pattern(pattern: &str, settings: &Settings) -> bool {
    let options = quickglob_core::PatternOptions::from(settings);
    quickglob_core::pattern::is_dynamic_pattern(pattern, &options)
}
