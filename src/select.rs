//! Module selection.
//!
//! Resolves user-facing selection criteria into the concrete set of module
//! names a command operates on. The fingerprinting core receives only the
//! resolved set and performs no selection logic itself.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::graph::DependencyGraph;

/// Selection criteria for the modules a command targets.
#[derive(Debug, Clone, Default)]
pub enum Selection {
    /// Every module in the graph.
    #[default]
    All,
    /// Explicitly named modules.
    Named(Vec<String>),
    /// A module plus everything it transitively depends on.
    UpstreamOf(String),
    /// A module plus everything that transitively depends on it.
    DownstreamOf(String),
}

impl Selection {
    /// Resolves the criteria to a concrete set of module names.
    ///
    /// An empty result is not an error; callers decide whether to treat it
    /// as one.
    ///
    /// # Errors
    ///
    /// Returns an error if any named module does not exist in the graph.
    pub fn resolve(&self, graph: &DependencyGraph) -> Result<BTreeSet<String>> {
        match self {
            Selection::All => Ok(graph.module_names().map(str::to_string).collect()),
            Selection::Named(names) => {
                let mut selected = BTreeSet::new();
                for name in names {
                    graph.module(name)?;
                    selected.insert(name.clone());
                }
                Ok(selected)
            }
            Selection::UpstreamOf(name) => {
                graph.module(name)?;
                let mut selected = BTreeSet::new();
                let mut pending = vec![name.clone()];
                while let Some(current) = pending.pop() {
                    if !selected.insert(current.clone()) {
                        continue;
                    }
                    for dep in &graph.module(&current)?.internal {
                        pending.push(dep.clone());
                    }
                }
                Ok(selected)
            }
            Selection::DownstreamOf(name) => {
                graph.module(name)?;
                let mut selected = BTreeSet::new();
                let mut pending = vec![name.clone()];
                while let Some(current) = pending.pop() {
                    if !selected.insert(current.clone()) {
                        continue;
                    }
                    for dependent in graph.direct_dependents(&current) {
                        pending.push(dependent.to_string());
                    }
                }
                Ok(selected)
            }
        }
    }
}
