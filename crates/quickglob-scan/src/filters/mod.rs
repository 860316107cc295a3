//! Decisions applied to walker output.
//!
//! - [`DeepFilter`] decides whether a directory is read at all.
//! - [`EntryFilter`] decides whether a yielded entry is emitted.
//! - [`ErrorFilter`] decides whether a traversal error aborts the call.

mod deep;
mod entry;
mod error;

pub use deep::DeepFilter;
pub use entry::EntryFilter;
pub use error::ErrorFilter;

/// Exclusions written as absolute paths are matched against absolute paths.
pub(crate) fn is_absolute_pattern(pattern: &str) -> bool {
    std::path::Path::new(pattern).is_absolute() || pattern.starts_with('/')
}

/// Join a task base and a base-relative path into a cwd-relative path.
pub(crate) fn join_base(base: &str, relative: &str) -> String {
    match base {
        "" | "." => relative.to_string(),
        _ if base.ends_with('/') => format!("{base}{relative}"),
        _ => format!("{base}/{relative}"),
    }
}
