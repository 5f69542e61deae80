use anyhow::Result;
use dashmap::DashMap;
use log::{debug, info, trace, warn};
use monodep_core::{
    BuiltinModules, DevFileClassifier, FileImports, ManifestResolver, NodeModulesResolver,
    PackageManifest, SourceFile, WorkspaceGraph, collect_source_files, imports_for,
};
use rayon::prelude::*;
use std::{path::PathBuf, thread};

use crate::{
    config::{Config, DynamicImportPolicy, Settings},
    consistency::find_version_mismatches,
    internal::find_internal_issues,
    ownership::find_ownership_issues,
    package::{AnalysisTables, analyze_package},
    peers::{check_declared_peers, check_installed_peers},
    types::{CheckResult, PackageReport},
};

pub fn run_dependency_check(mut cfg: Config) -> Result<CheckResult> {
    info!("Starting dependency check");
    cfg.initialize()?;
    let root = cfg.root()?.clone();
    let settings = cfg.settings();
    debug!("Effective settings: {:?}", settings);

    let graph = WorkspaceGraph::build(&root)?;
    let resolver = NodeModulesResolver::new(&root);
    Ok(analyze_workspace(&graph, &settings, &resolver))
}

/// Runs every analyzer over an already-built workspace graph.
pub fn analyze_workspace(
    graph: &WorkspaceGraph,
    settings: &Settings,
    resolver: &dyn ManifestResolver,
) -> CheckResult {
    let classifier = DevFileClassifier::default();
    let builtins = BuiltinModules::default();
    let tables = AnalysisTables { builtins: &builtins, ignore: &settings.ignore };

    // Thread-safe parse cache shared by every package
    let import_cache: DashMap<PathBuf, FileImports> = DashMap::new();

    info!("Processing {} packages in parallel", graph.packages().len());
    let mut packages: Vec<PackageReport> = graph
        .packages()
        .par_iter()
        .map(|package| {
            debug!("Thread {:?} processing: {}", thread::current().id(), package.name);
            let files = scan_package(graph, package, &classifier, &import_cache);
            analyze_package(package, graph.root(), &files, &tables)
        })
        .collect();

    if settings.dynamic_imports == DynamicImportPolicy::Off {
        trace!("Dynamic import reporting is off");
        packages.iter_mut().for_each(|p| p.dynamic_imports.clear());
    }

    let manifests = graph.packages();
    let root = graph.root_package();

    let version_mismatches = find_version_mismatches(manifests, &settings.ignore);
    let internal_issues = find_internal_issues(manifests, &packages, &settings.ignore);
    let mut peer_issues = check_declared_peers(manifests, root, &settings.ignore);

    let installed_peers = if settings.installed_peers {
        info!("Validating peers of installed dependencies");
        let (issues, stats) =
            check_installed_peers(manifests, root, resolver, settings.peer_budget, &settings.ignore);
        peer_issues.extend(issues);
        Some(stats)
    } else {
        None
    };

    let ownership_issues = settings
        .ownership
        .map(|policy| find_ownership_issues(manifests, &packages, policy, &settings.ignore))
        .unwrap_or_default();

    let result = CheckResult {
        root: graph.root().to_path_buf(),
        packages,
        version_mismatches,
        internal_issues,
        peer_issues,
        ownership_issues,
        installed_peers,
        dynamic_import_policy: settings.dynamic_imports,
        files_analyzed: import_cache.len(),
    };
    info!(
        "Dependency check complete. Found {} blocking issues in {} files",
        result.blocking_issue_count(),
        result.files_analyzed
    );
    result
}

/// Lists a package's own source files and parses them in parallel. Files of
/// nested workspace packages are left to those packages.
fn scan_package(
    graph: &WorkspaceGraph,
    package: &PackageManifest,
    classifier: &DevFileClassifier,
    import_cache: &DashMap<PathBuf, FileImports>,
) -> Vec<(SourceFile, FileImports)> {
    let exclusions = graph.nested_exclusions(package);
    trace!("Excluding nested packages of '{}': {:?}", package.name, exclusions);

    let files = match collect_source_files(&package.dir, &exclusions, classifier) {
        Ok(files) => files,
        Err(e) => {
            warn!("Error scanning package '{}': {:#}", package.name, e);
            return Vec::new();
        }
    };

    files
        .into_par_iter()
        .map(|file| {
            let imports = match imports_for(&file.path, import_cache) {
                Ok(imports) => imports,
                Err(e) => {
                    warn!("Error parsing imports for {}: {:#}", file.path.display(), e);
                    FileImports::default()
                }
            };
            (file, imports)
        })
        .collect()
}
