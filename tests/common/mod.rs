use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A throwaway monorepo on disk: module directories plus a `driftmark.json`
/// manifest describing the graph.
///
/// Dropping the fixture removes the whole tree.
pub struct MonorepoFixture {
    temp_dir: TempDir,
    modules: Vec<ModuleSpec>,
}

struct ModuleSpec {
    name: String,
    dependencies: Vec<(String, String)>,
    internal: Vec<String>,
}

impl MonorepoFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create fixture directory"),
            modules: Vec::new(),
        }
    }

    /// Repository root of the fixture.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of the fingerprint store inside the fixture.
    pub fn store_path(&self) -> PathBuf {
        self.root().join("driftmark.fingerprints.json")
    }

    /// Adds a module with a `src` root containing one source file, declared
    /// external dependencies, and internal edges. Call
    /// [`write_manifest`](Self::write_manifest) after the last module.
    pub fn add_module(
        &mut self,
        name: &str,
        dependencies: &[(&str, &str)],
        internal: &[&str],
    ) -> &mut Self {
        let src = self.root().join(name).join("src");
        fs::create_dir_all(&src).expect("failed to create module src");
        fs::write(src.join("main.rs"), format!("{name} v1")).expect("failed to write source");

        self.modules.push(ModuleSpec {
            name: name.to_string(),
            dependencies: dependencies
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            internal: internal.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Writes the manifest for all modules added so far.
    pub fn write_manifest(&self) {
        let modules: Vec<serde_json::Value> = self
            .modules
            .iter()
            .map(|spec| {
                serde_json::json!({
                    "name": spec.name,
                    "root": spec.name,
                    "sources": ["src"],
                    "dependencies": spec
                        .dependencies
                        .iter()
                        .map(|(n, v)| serde_json::json!({"name": n, "version": v}))
                        .collect::<Vec<_>>(),
                    "internal": spec.internal,
                })
            })
            .collect();

        let manifest = serde_json::json!({ "modules": modules });
        fs::write(
            self.root().join("driftmark.json"),
            serde_json::to_string_pretty(&manifest).unwrap(),
        )
        .expect("failed to write manifest");
    }

    /// Overwrites a module's source file, changing its content fingerprint.
    pub fn edit_source(&self, module: &str, contents: &str) {
        fs::write(self.root().join(module).join("src/main.rs"), contents)
            .expect("failed to edit source");
    }
}
