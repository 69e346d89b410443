//! Error types for driftmark.
//!
//! All fallible operations in this crate return [`Result`], whose error type
//! is [`DriftError`]. Errors are defined with `thiserror` and carry `miette`
//! diagnostics so the CLI can render codes and help text.
//!
//! Fingerprint computation errors are never downgraded: an unreadable source
//! file or a cyclic dependency graph aborts the whole command rather than
//! being coerced into a "changed" answer, since a fingerprint produced from
//! partial input cannot be trusted.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error types that can occur in driftmark operations.
#[derive(Error, Debug, Diagnostic)]
pub enum DriftError {
    /// File system I/O error while reading module sources or the store.
    ///
    /// Always carries the offending path. Raised for unreadable files,
    /// failed directory walks, and memory mapping failures.
    #[error("I/O error accessing '{path}'")]
    #[diagnostic(code(driftmark::io_error))]
    IoError {
        /// The path that caused the I/O error
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Attempted to hash a non-regular file (symlink).
    ///
    /// Symbolic links are rejected rather than followed so that a link
    /// retarget cannot silently alias two modules' contents.
    #[error("Invalid file type for '{path}': {message}")]
    #[diagnostic(
        code(driftmark::file::invalid_type),
        help("driftmark only fingerprints regular files under module path roots.")
    )]
    InvalidFileType {
        /// The path of the invalid file
        path: PathBuf,
        /// Description of the file type issue
        message: String,
    },

    /// A cycle was found while recursing over internal module dependencies.
    ///
    /// The graph provider is expected to supply an acyclic graph; this error
    /// turns a would-be infinite recursion into a clear configuration error
    /// naming the offending chain.
    #[error("Dependency cycle detected: {}", chain.join(" -> "))]
    #[diagnostic(
        code(driftmark::graph::cycle),
        help("Break the cycle by removing one of the internal dependency edges listed above.")
    )]
    DependencyCycle {
        /// The module chain that closes the cycle, ending at the repeated
        /// module
        chain: Vec<String>,
    },

    /// A module name was requested that the dependency graph does not define.
    #[error("Unknown module '{0}'")]
    #[diagnostic(
        code(driftmark::graph::unknown_module),
        help("Check the module name against the manifest at the repository root.")
    )]
    UnknownModule(
        /// The module name that could not be resolved
        String,
    ),

    /// The manifest describing the module graph could not be parsed.
    #[error("Failed to parse manifest '{path}'")]
    #[diagnostic(
        code(driftmark::manifest::parse_error),
        help("The manifest must be a JSON document listing every module and its edges.")
    )]
    ManifestParseError {
        /// Path to the manifest file
        path: PathBuf,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The persisted fingerprint store could not be decoded.
    ///
    /// Decoding is all-or-nothing: a partially-trusted store would silently
    /// misreport modules as up-to-date, so any malformed field fails the
    /// whole load.
    #[error("Failed to decode fingerprint store '{path}'")]
    #[diagnostic(
        code(driftmark::store::decode_error),
        help("The store file is corrupt. Remove it to start from a clean slate.")
    )]
    StoreDecodeError {
        /// Path to the store file
        path: PathBuf,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The fingerprint store could not be serialized for writing.
    #[error("Failed to encode fingerprint store")]
    #[diagnostic(code(driftmark::store::encode_error))]
    StoreEncodeError(#[source] serde_json::Error),

    /// A digest string in the store did not round-trip.
    ///
    /// Digests are encoded as `<algorithm>:<hex>`; anything else is treated
    /// as corruption and fails the store load.
    #[error("Invalid digest encoding: '{0}'")]
    #[diagnostic(
        code(driftmark::digest::parse_error),
        help("Digests are encoded as '<algorithm>:<hex>', e.g. 'blake3:af13...'")
    )]
    DigestParseError(
        /// The string that failed to parse
        String,
    ),

    /// Aggregation was invoked with zero digests.
    ///
    /// Callers must guarantee at least one input; the empty-category sentinel
    /// exists precisely so this never happens for a well-formed module.
    #[error("Cannot aggregate an empty set of digests")]
    #[diagnostic(code(driftmark::digest::empty_aggregate))]
    EmptyAggregate,

    /// Invalid configuration or store version mismatch.
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(driftmark::config::error),
        help("Check the required configuration parameters.")
    )]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },
}

/// Type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DriftError>;
