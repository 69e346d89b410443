//! The module dependency graph and its manifest loader.
//!
//! Module discovery is an external concern: this crate reads a pre-built
//! graph from a `driftmark.json` manifest at the repository root and exposes
//! name lookup plus forward/reverse edge traversal. The fingerprinting core
//! never parses module definitions itself.
//!
//! The manifest is expected to describe an acyclic graph; the fingerprinter
//! still detects cycles during traversal and reports the offending chain.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DriftError, Result};

/// A declared external dependency of a module, as a name/version pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalDep {
    /// Dependency name (group/artifact-style, namespace optional)
    pub name: String,
    /// Declared version string
    pub version: String,
}

/// A single module of the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// Qualified module name, e.g. `core/util`
    pub name: String,

    /// Module root directory, relative to the repository root in the
    /// manifest; resolved to an absolute path at load time.
    pub root: PathBuf,

    /// Source path roots, relative to the module root
    #[serde(default)]
    pub sources: Vec<PathBuf>,

    /// Test path roots, relative to the module root
    #[serde(default)]
    pub tests: Vec<PathBuf>,

    /// Resource path roots, relative to the module root
    #[serde(default)]
    pub resources: Vec<PathBuf>,

    /// Declared external dependencies
    #[serde(default)]
    pub dependencies: Vec<ExternalDep>,

    /// Names of internal modules this module depends on
    #[serde(default)]
    pub internal: Vec<String>,
}

/// On-disk shape of the manifest file.
#[derive(Debug, Deserialize)]
struct Manifest {
    modules: Vec<Module>,
}

/// The full dependency graph, keyed by module name.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    modules: BTreeMap<String, Module>,
}

impl DependencyGraph {
    /// Builds a graph from a list of modules, validating name uniqueness and
    /// edge targets.
    pub fn from_modules(modules: Vec<Module>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for module in modules {
            let name = module.name.clone();
            if map.insert(name.clone(), module).is_some() {
                return Err(DriftError::ConfigError {
                    message: format!("Duplicate module name '{name}' in manifest"),
                });
            }
        }

        // Every internal edge must point at a defined module.
        for module in map.values() {
            for dep in &module.internal {
                if !map.contains_key(dep) {
                    return Err(DriftError::UnknownModule(dep.clone()));
                }
            }
        }

        Ok(Self { modules: map })
    }

    /// Loads the graph from a manifest file, resolving each module root
    /// against `repo_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read or parsed, a module
    /// name is duplicated, or an internal edge names an unknown module.
    pub fn load(manifest_path: &Path, repo_root: &Path) -> Result<Self> {
        let text = fs::read_to_string(manifest_path).map_err(|source| DriftError::IoError {
            path: manifest_path.to_path_buf(),
            source,
        })?;

        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|source| DriftError::ManifestParseError {
                path: manifest_path.to_path_buf(),
                source,
            })?;

        let mut modules = manifest.modules;
        for module in &mut modules {
            if module.root.is_relative() {
                module.root = repo_root.join(&module.root);
            }
        }

        Self::from_modules(modules)
    }

    /// Looks up a module by name.
    pub fn module(&self, name: &str) -> Result<&Module> {
        self.modules
            .get(name)
            .ok_or_else(|| DriftError::UnknownModule(name.to_string()))
    }

    /// All module names in deterministic (sorted) order.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Names of modules that directly depend on `name` (reverse edges).
    pub fn direct_dependents(&self, name: &str) -> Vec<&str> {
        self.modules
            .values()
            .filter(|module| module.internal.iter().any(|dep| dep == name))
            .map(|module| module.name.as_str())
            .collect()
    }
}
