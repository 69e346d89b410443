//! # driftmark
//!
//! A tool that tracks, for every module of a multi-module repository, a
//! content fingerprint capturing everything which could make that module's
//! build output stale: its own sources, tests and resources, its declared
//! external dependencies, and the fingerprints of every internal module it
//! depends on.
//!
//! ## Overview
//!
//! Fingerprints are saved under named *markers* (e.g. `build`, `deploy`) in
//! a human-readable JSON store at the repository root. A later run diffs
//! freshly computed fingerprints against a marker to answer "has anything
//! affecting module X changed since marker M was last set?" — and explains
//! *why*, down to which input category changed first.
//!
//! ## Key properties
//!
//! - **Content-based**: BLAKE3 digests over file bytes plus path, never
//!   timestamps
//! - **Hierarchical**: a module's `final` digest folds in the `final`
//!   digests of its internal dependencies, so changes propagate upward
//!   through the graph
//! - **Diamond-safe**: shared transitive dependencies are computed exactly
//!   once per invocation via an explicit memoization cache
//! - **Trustworthy**: unreadable files and cyclic graphs abort the run;
//!   errors are never downgraded to "treat as changed"
//!
//! ## Architecture
//!
//! - [`cli`]: Command-line interface definitions using clap
//! - [`commands`]: Implementation of the `mark`, `info` and `clear`
//!   subcommands
//! - [`compare`]: Comparison of current fingerprints against stored markers
//! - [`digest`]: Digest values and their `<algorithm>:<hex>` encoding
//! - [`error`]: Error types and handling with thiserror + miette
//! - [`fingerprint`]: Per-module fingerprint computation over the graph
//! - [`graph`]: The module dependency graph and its manifest loader
//! - [`logging`]: Verbosity-gated stderr output
//! - [`select`]: Resolution of module selection criteria
//! - [`store`]: The persisted marker → module → record store
//!
//! Internal modules (not part of the public API):
//! - `hashing`: BLAKE3 file hashing and order-independent aggregation
//!
//! ## Usage
//!
//! ```bash
//! # Record the current state of every module under the "build" marker:
//! driftmark mark -k build
//!
//! # Later, see what changed and why:
//! driftmark info -k build
//!
//! # Only inspect one module and its dependency cone:
//! driftmark info -k build --upstream-of core/app
//! ```
//!
//! ## Library usage
//!
//! The core is exposed as a library for integration into other tools:
//!
//! ```no_run
//! use driftmark::compare::CompareContext;
//! use driftmark::digest::HashAlgorithm;
//! use driftmark::graph::DependencyGraph;
//! use driftmark::store::FingerprintStore;
//!
//! # fn main() -> driftmark::error::Result<()> {
//! let graph = DependencyGraph::load(
//!     std::path::Path::new("driftmark.json"),
//!     std::path::Path::new("."),
//! )?;
//! let store = FingerprintStore::new("driftmark.fingerprints.json");
//!
//! let mut ctx = CompareContext::new(HashAlgorithm::Blake3, &graph, &store)?;
//! if ctx.is_changed("build", "core/app")? {
//!     println!("core/app needs rebuilding");
//! }
//! # Ok(())
//! # }
//! ```

// Re-export public modules for library usage
pub mod cli;
pub mod commands;
pub mod compare;
pub mod digest;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod logging;
pub mod select;
pub mod store;

// Internal modules
mod hashing;
