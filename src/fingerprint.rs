//! Per-module input fingerprinting.
//!
//! For each module this computes five named sub-digests — `sources`,
//! `tests`, `resources`, `deps` and `upstream` — plus a `final` digest
//! aggregating all five. The `upstream` digest folds in the `final` digest
//! of every internal module the module depends on, so a change anywhere in a
//! module's transitive dependency cone changes its own `final` digest.
//!
//! Recursion over the graph is synchronous depth-first and memoized in an
//! explicit [`FingerprintCache`] passed through every call: shared
//! ("diamond") dependencies are computed exactly once per invocation, and no
//! hidden global cache can leak results between runs.

use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::digest::{Digest, HashAlgorithm};
use crate::error::{DriftError, Result};
use crate::graph::{DependencyGraph, Module};
use crate::hashing::{aggregate, hash_tree};


/// The named sub-fingerprints of a module.
///
/// The order of the variants is the fixed priority order used when
/// explaining why a module changed: a module's own code changing is reported
/// before a dependency changing, even when both differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FingerprintKind {
    /// Source path roots
    Sources,
    /// Test path roots
    Tests,
    /// Resource path roots
    Resources,
    /// Declared external dependencies
    Deps,
    /// Final digests of internal dependencies
    Upstream,
}

impl FingerprintKind {
    /// All kinds in priority order.
    pub const ALL: [FingerprintKind; 5] = [
        FingerprintKind::Sources,
        FingerprintKind::Tests,
        FingerprintKind::Resources,
        FingerprintKind::Deps,
        FingerprintKind::Upstream,
    ];

    /// The lowercase name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            FingerprintKind::Sources => "sources",
            FingerprintKind::Tests => "tests",
            FingerprintKind::Resources => "resources",
            FingerprintKind::Deps => "deps",
            FingerprintKind::Upstream => "upstream",
        }
    }
}

/// The complete fingerprint of one module at one point in time.
///
/// All five content digests are always present; a category with no
/// configured paths holds the canonical empty-input digest. The timestamp is
/// informational only and takes no part in equality comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    /// Digest over all files under the source path roots
    pub sources: Digest,
    /// Digest over all files under the test path roots
    pub tests: Digest,
    /// Digest over all files under the resource path roots
    pub resources: Digest,
    /// Digest of the normalized declared-dependency list
    pub deps: Digest,
    /// Aggregate of the final digests of internal dependencies
    pub upstream: Digest,
    /// Aggregate of the five digests above
    #[serde(rename = "final")]
    pub final_digest: Digest,
    /// Milliseconds since the UNIX epoch when the record was computed
    #[serde(rename = "timestamp")]
    pub timestamp_millis: u64,
}

impl FingerprintRecord {
    /// The digest for one sub-fingerprint kind.
    pub fn digest(&self, kind: FingerprintKind) -> &Digest {
        match kind {
            FingerprintKind::Sources => &self.sources,
            FingerprintKind::Tests => &self.tests,
            FingerprintKind::Resources => &self.resources,
            FingerprintKind::Deps => &self.deps,
            FingerprintKind::Upstream => &self.upstream,
        }
    }
}

/// Transient memoization of fingerprint records for one invocation.
///
/// Created fresh per command run and discarded afterwards; never persisted.
/// Passing it explicitly keeps traversal results reproducible and lets tests
/// observe how many modules were actually computed.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    records: HashMap<String, FingerprintRecord>,
}

impl FingerprintCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached record for a module, if already computed this run.
    pub fn get(&self, name: &str) -> Option<&FingerprintRecord> {
        self.records.get(name)
    }

    /// Number of modules computed so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no module has been computed yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert(&mut self, name: String, record: FingerprintRecord) {
        self.records.insert(name, record);
    }
}

/// Computes the fingerprint record for one module, memoizing into `cache`.
///
/// Upstream modules are computed recursively (and cached) as a side effect.
///
/// # Errors
///
/// Fails on unreadable files, unknown module names, and cyclic internal
/// dependency edges. Errors always propagate; a partial fingerprint is never
/// produced.
pub fn compute_fingerprint(
    algorithm: HashAlgorithm,
    graph: &DependencyGraph,
    name: &str,
    cache: &mut FingerprintCache,
) -> Result<FingerprintRecord> {
    let mut visiting = Vec::new();
    compute_inner(algorithm, graph, name, cache, &mut visiting)
}

fn compute_inner(
    algorithm: HashAlgorithm,
    graph: &DependencyGraph,
    name: &str,
    cache: &mut FingerprintCache,
    visiting: &mut Vec<String>,
) -> Result<FingerprintRecord> {
    if let Some(record) = cache.get(name) {
        return Ok(record.clone());
    }

    if visiting.iter().any(|entry| entry == name) {
        let mut chain = visiting.clone();
        chain.push(name.to_string());
        return Err(DriftError::DependencyCycle { chain });
    }

    let module = graph.module(name)?;
    visiting.push(name.to_string());

    let sources = category_digest(algorithm, module, &module.sources)?;
    let tests = category_digest(algorithm, module, &module.tests)?;
    let resources = category_digest(algorithm, module, &module.resources)?;
    let deps = deps_digest(algorithm, module);

    let mut upstream_finals = Vec::with_capacity(module.internal.len());
    for dep in &module.internal {
        let dep_record = compute_inner(algorithm, graph, dep, cache, visiting)?;
        upstream_finals.push(dep_record.final_digest);
    }
    let upstream = if upstream_finals.is_empty() {
        Digest::empty(algorithm)
    } else {
        aggregate(algorithm, &upstream_finals)?
    };

    let final_digest = aggregate(
        algorithm,
        &[
            sources.clone(),
            tests.clone(),
            resources.clone(),
            deps.clone(),
            upstream.clone(),
        ],
    )?;

    visiting.pop();

    let record = FingerprintRecord {
        sources,
        tests,
        resources,
        deps,
        upstream,
        final_digest,
        timestamp_millis: now_millis(),
    };

    cache.insert(name.to_string(), record.clone());
    Ok(record)
}

/// Hashes every file under the given path roots and aggregates the result.
///
/// Zero configured roots (or roots containing zero files) yield the
/// canonical empty-input digest, so two modules both lacking a category
/// compare equal. A configured root that does not exist is an error, not an
/// empty category: silently ignoring it would hide a misconfigured module.
fn category_digest(
    algorithm: HashAlgorithm,
    module: &Module,
    roots: &[std::path::PathBuf],
) -> Result<Digest> {
    let mut digests = Vec::new();
    for root in roots {
        let path = resolve_root(module, root);
        digests.extend(hash_tree(algorithm, &path)?);
    }

    if digests.is_empty() {
        Ok(Digest::empty(algorithm))
    } else {
        aggregate(algorithm, &digests)
    }
}

fn resolve_root(module: &Module, root: &Path) -> std::path::PathBuf {
    if root.is_absolute() {
        root.to_path_buf()
    } else {
        module.root.join(root)
    }
}

/// Hashes the declared external dependency list.
///
/// Dependencies are sorted by name/version before serialization so that
/// declaration order never affects the digest. A module with no declared
/// dependencies gets the empty-input digest.
fn deps_digest(algorithm: HashAlgorithm, module: &Module) -> Digest {
    let mut deps = module.dependencies.clone();
    deps.sort();

    let mut buffer = String::new();
    for dep in &deps {
        buffer.push_str(&dep.name);
        buffer.push('=');
        buffer.push_str(&dep.version);
        buffer.push('\n');
    }

    Digest::of_bytes(algorithm, buffer.as_bytes())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
