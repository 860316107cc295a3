//! qglob - resolve glob patterns against the filesystem.
//!
//! Usage:
//!   qglob [OPTIONS] <PATTERN>...    Print matching entries
//!   qglob tasks <PATTERN>...        Print the traversal tasks as JSON
//!   qglob escape <PATH>             Escape a path for use in a pattern
//!   qglob is-dynamic <PATTERN>      Check whether a pattern needs a matcher
//!   qglob --help                    Show help

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr};
use futures::StreamExt;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use quickglob_scan::{EntryItem, GlobResolver, Settings, escape_path, generate_tasks};

#[derive(Parser)]
#[command(
    name = "qglob",
    version,
    about = "Fast glob resolution over real filesystems",
    long_about = "qglob matches glob patterns against the filesystem while reading as \
                  few directories as possible.\n\n\
                  Patterns starting with `!` exclude matches. Set RUST_LOG=debug to \
                  see what is walked and skipped.",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Patterns to resolve
    patterns: Vec<String>,

    #[command(flatten)]
    glob: GlobArgs,

    /// Execution mode
    #[arg(long, value_enum, default_value_t = Mode::Sync)]
    mode: Mode,

    /// Sort results by path
    #[arg(long)]
    sort: bool,

    /// Print one JSON value per line
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the traversal tasks built from the patterns
    Tasks {
        /// Patterns to plan
        #[arg(required = true)]
        patterns: Vec<String>,

        #[command(flatten)]
        glob: GlobArgs,
    },

    /// Escape glob syntax in a path
    Escape {
        /// Path to escape
        path: String,
    },

    /// Check whether a pattern needs a matcher
    IsDynamic {
        /// Pattern to check
        pattern: String,

        #[command(flatten)]
        glob: GlobArgs,
    },
}

/// Options that map onto [`Settings`].
#[derive(Args, Clone)]
struct GlobArgs {
    /// Working directory (defaults to the current directory)
    #[arg(short = 'C', long)]
    cwd: Option<PathBuf>,

    /// Exclude entries matching this pattern (repeatable)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Maximum directory depth below each base directory
    #[arg(short, long)]
    deep: Option<usize>,

    /// Match entries whose names start with a period
    #[arg(long)]
    dot: bool,

    /// Return directories only
    #[arg(long)]
    only_dirs: bool,

    /// Return every entry type, not just files
    #[arg(long, alias = "no-only-files")]
    all_types: bool,

    /// Do not descend into symlinked directories
    #[arg(long)]
    no_follow: bool,

    /// Allow the same path more than once
    #[arg(long)]
    no_unique: bool,

    /// Append `/` to directories
    #[arg(long)]
    mark_dirs: bool,

    /// Print absolute paths
    #[arg(long)]
    absolute: bool,

    /// Treat `{a,b}` literally
    #[arg(long)]
    no_brace: bool,

    /// Match case-insensitively
    #[arg(long)]
    ignore_case: bool,

    /// Treat extglob syntax literally
    #[arg(long)]
    no_extglob: bool,

    /// Treat `**` like `*`
    #[arg(long)]
    no_globstar: bool,

    /// Match slash-less patterns against the final path segment
    #[arg(long)]
    base_name: bool,

    /// Skip unreadable entries instead of failing
    #[arg(long)]
    suppress_errors: bool,

    /// Print entry size next to each path
    #[arg(long)]
    stats: bool,

    /// Maximum number of tasks running at once (0 = available cores)
    #[arg(long, default_value = "0")]
    concurrency: usize,
}

impl GlobArgs {
    fn settings(&self) -> Result<Settings> {
        let cwd = match &self.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir().wrap_err("Failed to read current directory")?,
        };

        let mut builder = Settings::builder();
        builder
            .cwd(cwd)
            .ignore(self.ignore.clone())
            .dot(self.dot)
            .stats(self.stats)
            .only_files(!self.all_types && !self.only_dirs)
            .only_directories(self.only_dirs)
            .follow_symbolic_links(!self.no_follow)
            .unique(!self.no_unique)
            .mark_directories(self.mark_dirs)
            .absolute(self.absolute)
            .brace_expansion(!self.no_brace)
            .case_sensitive_match(!self.ignore_case)
            .extglob(!self.no_extglob)
            .globstar(!self.no_globstar)
            .base_name_match(self.base_name)
            .suppress_errors(self.suppress_errors)
            .concurrency(self.concurrency);

        if let Some(deep) = self.deep {
            builder.deep(deep);
        }

        builder.build().wrap_err("Invalid settings")
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
enum Mode {
    /// Resolve on the main thread
    #[default]
    Sync,
    /// Resolve tasks concurrently, print when done
    Async,
    /// Print entries as they are found
    Stream,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Command::Tasks { patterns, glob }) => {
            let settings = glob.settings()?;
            let tasks = generate_tasks(patterns, &settings).wrap_err("Failed to build tasks")?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        Some(Command::Escape { path }) => {
            println!("{}", escape_path(&path));
        }
        Some(Command::IsDynamic { pattern, glob }) => {
            let settings = glob.settings()?;
            println!("{}", quickglob_scan::is_dynamic_pattern(&pattern, &settings));
        }
        None => {
            let settings = cli.glob.settings()?;
            let output = Output {
                json: cli.json,
                stats: settings.stats,
            };
            run_glob(cli.patterns, settings, cli.mode, cli.sort, &output).await?;
        }
    }

    Ok(())
}

/// Resolve patterns and print the results.
async fn run_glob(
    patterns: Vec<String>,
    settings: Settings,
    mode: Mode,
    sort: bool,
    output: &Output,
) -> Result<()> {
    tracing::debug!(?mode, patterns = patterns.len(), "resolving");
    let resolver = GlobResolver::new(settings);

    let mut items = match mode {
        Mode::Sync => resolver
            .resolve_sync(patterns)
            .wrap_err("Failed to resolve patterns")?,
        Mode::Async => resolver
            .resolve(patterns)
            .await
            .wrap_err("Failed to resolve patterns")?,
        Mode::Stream => {
            let mut stream = resolver
                .stream(patterns)
                .wrap_err("Failed to resolve patterns")?;

            if !sort {
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                while let Some(item) = stream.next().await {
                    let item = item.wrap_err("Failed to resolve patterns")?;
                    output.write(&mut out, &item)?;
                }
                return Ok(());
            }

            let mut items = Vec::new();
            while let Some(item) = stream.next().await {
                items.push(item.wrap_err("Failed to resolve patterns")?);
            }
            items
        }
    };

    if sort {
        items.sort_by_cached_key(EntryItem::path);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for item in &items {
        output.write(&mut out, item)?;
    }

    Ok(())
}

/// How results are printed.
struct Output {
    json: bool,
    stats: bool,
}

impl Output {
    fn write(&self, out: &mut impl Write, item: &EntryItem) -> Result<()> {
        if self.json {
            writeln!(out, "{}", serde_json::to_string(item)?)?;
            return Ok(());
        }

        let size = item
            .as_entry()
            .and_then(|entry| entry.stats.as_ref())
            .map(|stats| stats.size);

        match size {
            Some(size) if self.stats => writeln!(out, "{:>10}  {}", format_size(size), item)?,
            _ => writeln!(out, "{item}")?,
        }

        Ok(())
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
