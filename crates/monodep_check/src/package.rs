use log::{debug, trace};
use monodep_core::{
    BuiltinModules, DependencyKind, FileImports, FileKind, PackageManifest, SourceFile,
    is_type_declaration_package, package_name, relative_slash_path,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use crate::{
    config::IgnoreList,
    types::{
        DynamicImport, MissingDependency, PackageImportSummary, PackageReport, UnusedDependency,
        WrongTypeDependency, WrongTypeDirection,
    },
};

/// Read-only lookup tables shared by every package analysis.
pub struct AnalysisTables<'a> {
    pub builtins: &'a BuiltinModules,
    pub ignore: &'a IgnoreList,
}

/// Reduces the imports of one package's files into usage sets and compares
/// them with the package manifest.
pub fn analyze_package(
    package: &PackageManifest,
    workspace_root: &Path,
    files: &[(SourceFile, FileImports)],
    tables: &AnalysisTables,
) -> PackageReport {
    debug!("Analyzing package '{}' ({} files)", package.name, files.len());
    let (summary, importers) = reduce_imports(package, files, tables.builtins);

    let unused = find_unused(package, &summary, tables.ignore);
    let missing = find_missing(package, &summary, &importers, tables.ignore);
    let wrong_type = find_wrong_type(package, &summary, tables.ignore);

    let dynamic_imports = files
        .iter()
        .flat_map(|(file, imports)| {
            let rel = relative_slash_path(&file.path, &package.dir);
            imports.dynamic.iter().map(move |d| DynamicImport {
                package: package.name.clone(),
                file: rel.clone(),
                line: d.line,
                expression: d.expression.clone(),
            })
        })
        .collect();

    debug!(
        "Package '{}': {} prod imports, {} dev imports, {} unused, {} missing, {} wrong type",
        package.name,
        summary.prod_imports.len(),
        summary.dev_imports.len(),
        unused.len(),
        missing.len(),
        wrong_type.len()
    );

    let dir = match relative_slash_path(&package.dir, workspace_root) {
        rel if rel.is_empty() => ".".to_string(),
        rel => rel,
    };

    PackageReport {
        package: package.name.clone(),
        dir,
        files_scanned: files.len(),
        summary,
        unused,
        missing,
        wrong_type,
        dynamic_imports,
    }
}

/// Builds the prod/dev import sets plus, per package name, the files importing it.
///
/// Value imports are reduced before type-only imports, so a type usage never
/// demotes a runtime usage regardless of file order.
fn reduce_imports(
    package: &PackageManifest,
    files: &[(SourceFile, FileImports)],
    builtins: &BuiltinModules,
) -> (PackageImportSummary, BTreeMap<String, BTreeSet<String>>) {
    let mut summary = PackageImportSummary::default();
    let mut importers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for (file, imports) in files {
        let rel = relative_slash_path(&file.path, &package.dir);
        for name in imports.value_specifiers().filter_map(|s| package_name(s, builtins)) {
            importers.entry(name.clone()).or_default().insert(rel.clone());
            match file.kind {
                FileKind::Prod => summary.prod_imports.insert(name),
                FileKind::Dev => summary.dev_imports.insert(name),
            };
        }
    }

    for (file, imports) in files {
        let rel = relative_slash_path(&file.path, &package.dir);
        for name in imports.type_specifiers().filter_map(|s| package_name(s, builtins)) {
            importers.entry(name.clone()).or_default().insert(rel.clone());
            if !summary.prod_imports.contains(&name) {
                trace!("Type-only import of '{}' counted as dev usage", name);
                summary.dev_imports.insert(name);
            }
        }
    }

    (summary, importers)
}

fn find_unused(
    package: &PackageManifest,
    summary: &PackageImportSummary,
    ignore: &IgnoreList,
) -> Vec<UnusedDependency> {
    package
        .declared_names()
        .into_iter()
        .filter(|name| !is_type_declaration_package(name) && !ignore.is_ignored(name))
        .filter(|name| !summary.imports(name))
        .map(|name| {
            let declared_as = package.declared_kinds(name);
            let fields: Vec<&str> = declared_as.iter().map(|k| k.field()).collect();
            UnusedDependency {
                package: package.name.clone(),
                dependency: name.to_string(),
                detail: format!("'{}' is declared in {} but never imported", name, fields.join(", ")),
                declared_as,
            }
        })
        .collect()
}

fn find_missing(
    package: &PackageManifest,
    summary: &PackageImportSummary,
    importers: &BTreeMap<String, BTreeSet<String>>,
    ignore: &IgnoreList,
) -> Vec<MissingDependency> {
    summary
        .all_imports()
        .into_iter()
        .filter(|name| *name != package.name && !ignore.is_ignored(name))
        .filter(|name| !package.declares(name))
        .map(|name| {
            let files: Vec<String> =
                importers.get(name).map(|f| f.iter().cloned().collect()).unwrap_or_default();
            MissingDependency {
                package: package.name.clone(),
                dependency: name.to_string(),
                detail: format!(
                    "'{}' is imported by {} file(s) but not declared in package.json",
                    name,
                    files.len()
                ),
                files,
            }
        })
        .collect()
}

fn find_wrong_type(
    package: &PackageManifest,
    summary: &PackageImportSummary,
    ignore: &IgnoreList,
) -> Vec<WrongTypeDependency> {
    let exempt = |name: &str| {
        is_type_declaration_package(name)
            || package.declares_as(name, DependencyKind::Peer)
            || ignore.is_ignored(name)
    };
    let mut issues = Vec::new();

    for name in package.dev_dependencies.keys() {
        let also_runtime = package.declares_as(name, DependencyKind::Runtime)
            || package.declares_as(name, DependencyKind::Optional);
        if summary.prod_imports.contains(name) && !also_runtime && !exempt(name) {
            issues.push(WrongTypeDependency {
                package: package.name.clone(),
                dependency: name.clone(),
                direction: WrongTypeDirection::ShouldBeRuntime,
                detail: format!(
                    "'{}' is used in production code but declared in devDependencies",
                    name
                ),
            });
        }
    }

    for name in package.dependencies.keys() {
        if summary.dev_imports.contains(name)
            && !summary.prod_imports.contains(name)
            && !exempt(name)
        {
            issues.push(WrongTypeDependency {
                package: package.name.clone(),
                dependency: name.clone(),
                direction: WrongTypeDirection::ShouldBeDev,
                detail: format!(
                    "'{}' is only used in development code but declared in dependencies",
                    name
                ),
            });
        }
    }

    issues
}
