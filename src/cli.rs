//! Command-line interface definitions for driftmark.
//!
//! This module defines the CLI structure using clap, including all
//! subcommands and their arguments. The main entry point is the [`Cli`]
//! struct.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::error::{DriftError, Result};
use crate::select::Selection;


/// Main command-line interface for driftmark.
#[derive(Parser)]
#[command(
    name = "driftmark",
    bin_name = "driftmark",
    author,
    version,
    about = "Track per-module content fingerprints across a monorepo and diff them against named markers",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    global_opts: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Get the global options
    pub fn global_opts(&self) -> &GlobalOpts {
        &self.global_opts
    }

    /// Get the command
    pub fn command(&self) -> &Commands {
        &self.command
    }

    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Global options that apply to all driftmark commands.
#[derive(Parser)]
pub struct GlobalOpts {
    /// Path to the repository root (defaults to the current directory)
    #[arg(long, global = true, default_value = ".", env = "DRIFTMARK_ROOT")]
    root: PathBuf,

    /// Path to the module manifest (defaults to `<root>/driftmark.json`)
    #[arg(long, global = true, env = "DRIFTMARK_MANIFEST_PATH")]
    manifest_path: Option<PathBuf>,

    /// Path to the fingerprint store (defaults to
    /// `<root>/driftmark.fingerprints.json`)
    #[arg(long, global = true, env = "DRIFTMARK_STORE_PATH")]
    store_path: Option<PathBuf>,

    /// Enable verbose output (use multiple times for more verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count, env = "DRIFTMARK_VERBOSE")]
    verbose: u8,

    /// Silence all output except for errors
    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        env = "DRIFTMARK_QUIET"
    )]
    quiet: bool,
}

impl GlobalOpts {
    /// The repository root as declared (possibly relative).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The absolute, cleaned repository root.
    pub fn get_root(&self) -> PathBuf {
        normalize_path(&self.root)
    }

    /// The manifest path exactly as given, if any.
    pub fn manifest_path(&self) -> Option<&Path> {
        self.manifest_path.as_deref()
    }

    /// The store path exactly as given, if any.
    pub fn store_path(&self) -> Option<&Path> {
        self.store_path.as_deref()
    }

    /// The effective manifest path (absolute).
    pub fn get_manifest_path(&self) -> PathBuf {
        let path = self
            .manifest_path
            .clone()
            .unwrap_or_else(|| self.root.join("driftmark.json"));
        normalize_path(path)
    }

    /// The effective store path (absolute).
    pub fn get_store_path(&self) -> PathBuf {
        let path = self
            .store_path
            .clone()
            .unwrap_or_else(|| self.root.join("driftmark.fingerprints.json"));
        normalize_path(path)
    }

    /// Get the verbose level
    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn quiet(&self) -> bool {
        self.quiet
    }
}

/// Module selection flags shared by all subcommands.
///
/// At most one criterion may be given; with none, explicit `--module` names
/// are used, and with no names at all the selection defaults to every
/// module.
#[derive(Debug, Args, Default)]
pub struct SelectArgs {
    /// Operate on the named module (repeatable)
    #[arg(short, long = "module", value_name = "NAME")]
    modules: Vec<String>,

    /// Operate on every module in the graph
    #[arg(long, conflicts_with_all = ["modules", "upstream_of", "downstream_of"])]
    all: bool,

    /// Operate on a module and everything it depends on
    #[arg(long, value_name = "NAME", conflicts_with_all = ["modules", "downstream_of"])]
    upstream_of: Option<String>,

    /// Operate on a module and everything that depends on it
    #[arg(long, value_name = "NAME", conflicts_with = "modules")]
    downstream_of: Option<String>,
}

impl SelectArgs {
    /// Converts the parsed flags into a [`Selection`].
    pub fn to_selection(&self) -> Result<Selection> {
        match (
            self.all,
            &self.upstream_of,
            &self.downstream_of,
            self.modules.is_empty(),
        ) {
            (true, None, None, true) => Ok(Selection::All),
            (false, Some(name), None, true) => Ok(Selection::UpstreamOf(name.clone())),
            (false, None, Some(name), true) => Ok(Selection::DownstreamOf(name.clone())),
            (false, None, None, false) => Ok(Selection::Named(self.modules.clone())),
            (false, None, None, true) => Ok(Selection::All),
            _ => Err(DriftError::ConfigError {
                message: "Only one selection criterion may be given".to_string(),
            }),
        }
    }

    /// Builds selection args for explicit module names (for programmatic
    /// use and tests).
    pub fn named(modules: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            modules: modules.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Available driftmark subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Save the current fingerprints of the selected modules under one or
    /// more markers
    ///
    /// Fingerprints are computed once per module and merged into every
    /// marker's sub-mapping in a single store write. Existing records for
    /// other modules and markers are left untouched.
    Mark {
        /// Marker name to save under (repeatable)
        #[arg(short = 'k', long = "marker", value_name = "MARKER", default_values = ["default"])]
        markers: Vec<String>,

        #[command(flatten)]
        select: SelectArgs,
    },

    /// Report which selected modules changed since a marker was last set
    ///
    /// Prints, per marker, the changed/total counts, a percentage, and the
    /// module names grouped by change reason.
    Info {
        /// Marker name to compare against (repeatable)
        #[arg(short = 'k', long = "marker", value_name = "MARKER", default_values = ["default"])]
        markers: Vec<String>,

        #[command(flatten)]
        select: SelectArgs,
    },

    /// Remove the selected modules' records from a marker
    Clear {
        /// Marker name to clear from
        #[arg(short = 'k', long = "marker", value_name = "MARKER", default_value = "default")]
        marker: String,

        #[command(flatten)]
        select: SelectArgs,
    },
}

/// Normalize a path to be absolute and clean, without requiring it to exist.
///
/// Relative paths are resolved against the current directory; `.` and `..`
/// components are folded away textually. Symlinks are not resolved.
pub(crate) fn normalize_path(path: impl AsRef<Path>) -> PathBuf {
    use std::path::Component;

    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            // Popping at the root is a no-op, which makes `/..` collapse to
            // `/` as the filesystem itself would.
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    normalized
}
