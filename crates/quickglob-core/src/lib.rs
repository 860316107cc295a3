//! Core types and pattern analysis for quickglob.
//!
//! This crate holds everything that can be decided without touching the
//! filesystem: pattern classification, base directory extraction, depth
//! estimates, task construction, matcher compilation and the settings,
//! entry and error types shared by the rest of the workspace.

mod entry;
mod error;
mod extglob;
pub mod matcher;
pub mod pattern;
mod settings;
mod task;

pub use entry::{Entry, EntryItem, EntryKind, EntryStats, path_to_slash};
pub use error::{ErrorKind, GlobError, INVALID_PATTERNS_MESSAGE};
pub use matcher::{Matcher, MatcherOptions};
pub use pattern::{Pattern, PatternOptions};
pub use settings::{Settings, SettingsBuilder, SettingsBuilderError};
pub use task::{Task, TaskBuilder, generate_tasks};
