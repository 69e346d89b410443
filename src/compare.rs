//! Comparison of current fingerprints against a stored marker.
//!
//! A [`CompareContext`] snapshots the persisted store exactly once at
//! creation; every comparison made through it uses that one snapshot, so a
//! concurrent `mark` elsewhere cannot perturb an in-flight report. Fresh
//! fingerprints are computed lazily and memoized in the context's cache.
//!
//! The core exposes only data — booleans, [`ChangeReason`] values and
//! counts. Formatting belongs to the presentation layer.

use std::collections::{BTreeMap, BTreeSet};

use crate::digest::HashAlgorithm;
use crate::error::Result;
use crate::fingerprint::{FingerprintCache, FingerprintKind, FingerprintRecord, compute_fingerprint};
use crate::graph::DependencyGraph;
use crate::store::{FingerprintStore, StoreState};


/// Why a module is (or is not) considered changed relative to a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeReason {
    /// No record was ever stored for this module under the marker.
    NewProject,
    /// The first sub-fingerprint kind, in priority order, whose digest
    /// differs from the stored one.
    Changed(FingerprintKind),
    /// The final digests differ but every sub-kind matches. This can only
    /// happen if the store was corrupted or the aggregation scheme changed
    /// between versions; it is reported rather than coerced to another
    /// reason.
    Unknown,
    /// The final digests are equal.
    UpToDate,
}

impl ChangeReason {
    /// The lowercase name used for report grouping.
    pub fn name(self) -> &'static str {
        match self {
            ChangeReason::NewProject => "new-project",
            ChangeReason::Changed(kind) => kind.name(),
            ChangeReason::Unknown => "unknown",
            ChangeReason::UpToDate => "up-to-date",
        }
    }

    /// Returns `true` if the reason means the module changed.
    pub fn is_changed(self) -> bool {
        !matches!(self, ChangeReason::UpToDate)
    }
}

/// Comparison data for one marker over a set of modules.
///
/// This is the full payload handed to the presentation layer; it contains
/// no formatted strings.
#[derive(Debug, Clone)]
pub struct MarkerReport {
    /// The marker the comparison ran against
    pub marker: String,
    /// Number of modules inspected
    pub total: usize,
    /// Number of modules considered changed
    pub changed: usize,
    /// Module names grouped by change reason
    pub groups: BTreeMap<ChangeReason, Vec<String>>,
}

impl MarkerReport {
    /// Changed modules as a percentage of the total (0 when empty).
    pub fn percent_changed(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.changed as f64 * 100.0 / self.total as f64
        }
    }
}

/// A comparison run over one snapshot of the store.
pub struct CompareContext<'a> {
    algorithm: HashAlgorithm,
    graph: &'a DependencyGraph,
    snapshot: StoreState,
    cache: FingerprintCache,
}

impl<'a> CompareContext<'a> {
    /// Creates a context, reading the store snapshot once.
    ///
    /// # Errors
    ///
    /// Fails if the store exists but cannot be loaded.
    pub fn new(
        algorithm: HashAlgorithm,
        graph: &'a DependencyGraph,
        store: &FingerprintStore,
    ) -> Result<Self> {
        Ok(Self {
            algorithm,
            graph,
            snapshot: store.read()?,
            cache: FingerprintCache::new(),
        })
    }

    /// Creates a context over an already-loaded snapshot.
    pub fn with_snapshot(
        algorithm: HashAlgorithm,
        graph: &'a DependencyGraph,
        snapshot: StoreState,
    ) -> Self {
        Self {
            algorithm,
            graph,
            snapshot,
            cache: FingerprintCache::new(),
        }
    }

    /// The freshly computed record for a module (memoized per context).
    pub fn current(&mut self, module: &str) -> Result<FingerprintRecord> {
        compute_fingerprint(self.algorithm, self.graph, module, &mut self.cache)
    }

    /// Returns `true` iff the module's current `final` digest differs from
    /// the one stored under `(marker, module)`, or no record is stored.
    pub fn is_changed(&mut self, marker: &str, module: &str) -> Result<bool> {
        Ok(self.explain(marker, module)?.is_changed())
    }

    /// Classifies why a module is considered changed.
    ///
    /// Sub-kinds are checked in the fixed priority order
    /// [`FingerprintKind::ALL`]; the first mismatch is reported even when
    /// later kinds also differ, so "this module's own code changed" wins
    /// over "something it depends on changed".
    pub fn explain(&mut self, marker: &str, module: &str) -> Result<ChangeReason> {
        let current = self.current(module)?;

        let Some(stored) = self.snapshot.record(marker, module) else {
            return Ok(ChangeReason::NewProject);
        };

        if current.final_digest == stored.final_digest {
            return Ok(ChangeReason::UpToDate);
        }

        for kind in FingerprintKind::ALL {
            if current.digest(kind) != stored.digest(kind) {
                return Ok(ChangeReason::Changed(kind));
            }
        }

        Ok(ChangeReason::Unknown)
    }

    /// Builds the comparison report for one marker over a module set.
    pub fn report(&mut self, marker: &str, modules: &BTreeSet<String>) -> Result<MarkerReport> {
        let mut groups: BTreeMap<ChangeReason, Vec<String>> = BTreeMap::new();
        let mut changed = 0;

        for module in modules {
            let reason = self.explain(marker, module)?;
            if reason.is_changed() {
                changed += 1;
            }
            groups.entry(reason).or_default().push(module.clone());
        }

        Ok(MarkerReport {
            marker: marker.to_string(),
            total: modules.len(),
            changed,
            groups,
        })
    }
}
