//! Implementation of driftmark subcommands.
//!
//! The main entry point is [`execute`], which loads the dependency graph
//! from the manifest, opens the fingerprint store, and dispatches to the
//! appropriate command. Command functions own all user-facing formatting;
//! the comparison core only hands them data.

use std::path::Path;

use crate::cli::{Cli, Commands, SelectArgs};
use crate::compare::{CompareContext, MarkerReport};
use crate::digest::HashAlgorithm;
use crate::error::Result;
use crate::fingerprint::{FingerprintCache, FingerprintRecord, compute_fingerprint};
use crate::graph::DependencyGraph;
use crate::logging::Logger;
use crate::store::FingerprintStore;


/// Saves the current fingerprints of the selected modules under every given
/// marker.
///
/// Records are computed once per module with a single shared cache, then
/// merged into all markers in one combined store write, so `mark -k build
/// -k deploy` never hashes a module twice and never leaves the store with
/// only half the markers updated.
pub fn mark(
    algorithm: HashAlgorithm,
    graph: &DependencyGraph,
    store: &FingerprintStore,
    markers: &[String],
    select: &SelectArgs,
    logger: Logger,
) -> Result<()> {
    let modules = select.to_selection()?.resolve(graph)?;
    if modules.is_empty() {
        logger.info("No modules matched the selection; nothing to mark");
        return Ok(());
    }

    let mut cache = FingerprintCache::new();
    let mut records: Vec<(String, FingerprintRecord)> = Vec::with_capacity(modules.len());
    for module in &modules {
        let record = compute_fingerprint(algorithm, graph, module, &mut cache)?;
        logger.verbose(2, format!("  {module}: {}", record.final_digest));
        records.push((module.clone(), record));
    }

    store.update(|mut state| {
        for marker in markers {
            for (module, record) in &records {
                state.insert_record(marker, module, record.clone());
            }
        }
        state
    })?;

    logger.info(format!(
        "Marked {} module{} under {} marker{} ({})",
        modules.len(),
        plural(modules.len()),
        markers.len(),
        plural(markers.len()),
        markers.join(", ")
    ));
    logger.verbose(1, format!("Store: {}", store.path().display()));

    Ok(())
}

/// Reports which selected modules changed since each marker was last set.
pub fn info(
    algorithm: HashAlgorithm,
    graph: &DependencyGraph,
    store: &FingerprintStore,
    markers: &[String],
    select: &SelectArgs,
    logger: Logger,
) -> Result<()> {
    let modules = select.to_selection()?.resolve(graph)?;
    if modules.is_empty() {
        logger.info("No modules matched the selection");
        return Ok(());
    }

    // One snapshot and one computation cache across all markers: a
    // concurrent mark cannot perturb this run, and no module is hashed more
    // than once.
    let mut ctx = CompareContext::new(algorithm, graph, store)?;
    for marker in markers {
        let report = ctx.report(marker, &modules)?;
        print_report(&report, logger);
    }

    Ok(())
}

/// Removes the selected modules' records from a marker.
pub fn clear(
    graph: &DependencyGraph,
    store: &FingerprintStore,
    marker: &str,
    select: &SelectArgs,
    logger: Logger,
) -> Result<()> {
    let modules = select.to_selection()?.resolve(graph)?;
    if modules.is_empty() {
        logger.info("No modules matched the selection; nothing to clear");
        return Ok(());
    }

    let mut removed = 0;
    store.update(|mut state| {
        for module in &modules {
            if state.remove_record(marker, module) {
                removed += 1;
            }
        }
        state
    })?;

    logger.info(format!(
        "Cleared {removed} record{} from marker '{marker}'",
        plural(removed)
    ));

    Ok(())
}

fn print_report(report: &MarkerReport, logger: Logger) {
    logger.info(format!(
        "Marker '{}': {}/{} module{} changed ({:.1}%)",
        report.marker,
        report.changed,
        report.total,
        plural(report.total),
        report.percent_changed()
    ));

    for (reason, modules) in &report.groups {
        logger.info(format!("  {}: {}", reason.name(), modules.join(", ")));
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

/// Execute commands based on the parsed CLI arguments.
pub fn execute(cli: &Cli) -> Result<()> {
    execute_with_dir(cli, None)
}

/// Execute commands with an explicit working directory.
///
/// The repository root from the CLI is resolved against `working_dir` when
/// relative; useful for tests and for invocations from outside the repo.
pub fn execute_with_dir(cli: &Cli, working_dir: Option<&Path>) -> Result<()> {
    let logger = Logger::new(cli.global_opts().verbose(), cli.global_opts().quiet());

    let (root, manifest_path, store_path) = match working_dir {
        Some(dir) => {
            let root = resolve_against(dir, cli.global_opts().root());
            let manifest_path = cli
                .global_opts()
                .manifest_path()
                .map(|path| resolve_against(dir, path))
                .unwrap_or_else(|| root.join("driftmark.json"));
            let store_path = cli
                .global_opts()
                .store_path()
                .map(|path| resolve_against(dir, path))
                .unwrap_or_else(|| root.join("driftmark.fingerprints.json"));
            (root, manifest_path, store_path)
        }
        None => (
            cli.global_opts().get_root(),
            cli.global_opts().get_manifest_path(),
            cli.global_opts().get_store_path(),
        ),
    };

    let graph = DependencyGraph::load(&manifest_path, &root)?;
    let store = FingerprintStore::new(store_path);

    // The hash algorithm is defaulted once here and threaded explicitly
    // through every call below.
    let algorithm = HashAlgorithm::default();

    match cli.command() {
        Commands::Mark { markers, select } => {
            mark(algorithm, &graph, &store, markers, select, logger)
        }
        Commands::Info { markers, select } => {
            info(algorithm, &graph, &store, markers, select, logger)
        }
        Commands::Clear { marker, select } => clear(&graph, &store, marker, select, logger),
    }
}

fn resolve_against(base: &Path, path: &Path) -> std::path::PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
