use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use log::{debug, info, trace, warn};
use serde::Deserialize;
use std::{
    collections::{BTreeSet, HashSet},
    fs,
    path::{Path, PathBuf},
};

use crate::{
    constants::{MANIFEST_FILE, PNPM_WORKSPACE_FILE},
    manifest::PackageManifest,
};

/// Every package of the monorepo, root first, then members ordered by directory.
#[derive(Debug, Clone)]
pub struct WorkspaceGraph {
    root: PathBuf,
    packages: Vec<PackageManifest>,
}

#[derive(Debug, Deserialize)]
struct PnpmWorkspace {
    #[serde(default)]
    packages: Vec<String>,
}

impl WorkspaceGraph {
    pub fn build(root: &Path) -> Result<Self> {
        info!("Building workspace graph from {}", root.display());
        fs::read_dir(root)
            .with_context(|| format!("Workspace root {} is not readable", root.display()))?;

        let root_manifest_path = root.join(MANIFEST_FILE);
        let root_manifest = if root_manifest_path.is_file() {
            let fallback = root.file_name().and_then(|n| n.to_str()).unwrap_or("root");
            match PackageManifest::load(&root_manifest_path, fallback) {
                Ok(mut m) => {
                    m.is_root = true;
                    Some(m)
                }
                Err(e) => {
                    warn!("Skipping root manifest: {:#}", e);
                    None
                }
            }
        } else {
            debug!("No root manifest at {}", root_manifest_path.display());
            None
        };

        let patterns = workspace_patterns(root, root_manifest.as_ref());
        debug!("Workspace patterns: {:?}", patterns);

        let mut packages = Vec::new();
        let mut seen_names = HashSet::new();
        if let Some(m) = root_manifest {
            seen_names.insert(m.name.clone());
            packages.push(m);
        }

        for dir in discover_member_dirs(root, &patterns) {
            let rel = relative_slash_path(&dir, root);
            match PackageManifest::load(&dir.join(MANIFEST_FILE), &rel) {
                Ok(m) => {
                    if !seen_names.insert(m.name.clone()) {
                        warn!("Duplicate package name '{}' in {}, skipping", m.name, rel);
                        continue;
                    }
                    trace!("Loaded workspace package '{}' from {}", m.name, rel);
                    packages.push(m);
                }
                Err(e) => warn!("Skipping workspace package: {:#}", e),
            }
        }

        info!("Workspace graph has {} packages", packages.len());
        Ok(Self { root: root.to_path_buf(), packages })
    }

    /// Builds a graph from already-loaded manifests. The manifest whose `dir`
    /// equals `root` is flagged as the root package.
    pub fn from_packages(root: &Path, packages: Vec<PackageManifest>) -> Self {
        let packages = packages
            .into_iter()
            .map(|mut m| {
                m.is_root = m.dir == root;
                m
            })
            .collect();
        Self { root: root.to_path_buf(), packages }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn packages(&self) -> &[PackageManifest] {
        &self.packages
    }

    pub fn root_package(&self) -> Option<&PackageManifest> {
        self.packages.iter().find(|p| p.is_root)
    }

    pub fn get(&self, name: &str) -> Option<&PackageManifest> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Patterns, relative to `package.dir`, covering the directories of every
    /// other package nested inside it.
    pub fn nested_exclusions(&self, package: &PackageManifest) -> Vec<String> {
        self.packages
            .iter()
            .filter(|other| other.dir != package.dir && other.dir.starts_with(&package.dir))
            .map(|other| relative_slash_path(&other.dir, &package.dir))
            .collect()
    }
}

/// Resolves the membership patterns: `pnpm-workspace.yaml` first, then the
/// root manifest's `workspaces` field. Empty means single-package.
pub fn workspace_patterns(root: &Path, root_manifest: Option<&PackageManifest>) -> Vec<String> {
    let pnpm_path = root.join(PNPM_WORKSPACE_FILE);
    if pnpm_path.is_file() {
        match fs::read_to_string(&pnpm_path)
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_yaml::from_str::<PnpmWorkspace>(&s).map_err(anyhow::Error::from))
        {
            Ok(ws) => {
                debug!("Using {} patterns from {}", ws.packages.len(), PNPM_WORKSPACE_FILE);
                return ws.packages;
            }
            Err(e) => warn!("Ignoring invalid {}: {:#}", pnpm_path.display(), e),
        }
    }

    root_manifest.map(|m| m.workspace_patterns.clone()).unwrap_or_default()
}

fn build_glob(pattern: &str) -> Option<Glob> {
    match GlobBuilder::new(pattern).literal_separator(true).build() {
        Ok(glob) => Some(glob),
        Err(e) => {
            warn!("Ignoring invalid workspace pattern '{}': {}", pattern, e);
            None
        }
    }
}

fn normalize_pattern(pattern: &str) -> String {
    let p = pattern.trim().replace('\\', "/");
    let p = p.trim_start_matches("./");
    p.trim_end_matches('/').to_string()
}

fn build_pattern_sets(patterns: &[String]) -> (GlobSet, GlobSet) {
    let mut includes = GlobSetBuilder::new();
    let mut excludes = GlobSetBuilder::new();
    for raw in patterns {
        let (negated, pattern) = match raw.trim().strip_prefix('!') {
            Some(rest) => (true, normalize_pattern(rest)),
            None => (false, normalize_pattern(raw)),
        };
        if pattern.is_empty() {
            continue;
        }
        if let Some(glob) = build_glob(&pattern) {
            if negated {
                excludes.add(glob);
            } else {
                includes.add(glob);
            }
        }
    }
    let empty = || GlobSet::empty();
    (includes.build().unwrap_or_else(|_| empty()), excludes.build().unwrap_or_else(|_| empty()))
}

/// Finds member directories matching `patterns`, sorted, never including `root`.
pub fn discover_member_dirs(root: &Path, patterns: &[String]) -> Vec<PathBuf> {
    if patterns.is_empty() {
        return Vec::new();
    }
    let (includes, excludes) = build_pattern_sets(patterns);
    if includes.is_empty() {
        return Vec::new();
    }

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(true)
        .git_ignore(true)
        .filter_entry(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            name != "node_modules" && name != ".git"
        })
        .build();

    let mut dirs = BTreeSet::new();
    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        if entry.file_name() != MANIFEST_FILE || !path.is_file() {
            continue;
        }
        let Some(dir) = path.parent() else { continue };
        if dir == root {
            continue;
        }
        let rel = relative_slash_path(dir, root);
        if includes.is_match(&rel) && !excludes.is_match(&rel) {
            trace!("Workspace member matched: {}", rel);
            dirs.insert(dir.to_path_buf());
        }
    }

    debug!("Discovered {} workspace member directories", dirs.len());
    dirs.into_iter().collect()
}

/// `path` relative to `base`, with `/` separators.
pub fn relative_slash_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, path: &str, content: &str) -> PathBuf {
        let file_path = dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    #[test]
    fn test_pnpm_workspace_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "name": "root" }"#);
        create_test_file(root, "pnpm-workspace.yaml", "packages:\n  - 'packages/*'\n");
        create_test_file(root, "packages/a/package.json", r#"{ "name": "a" }"#);
        create_test_file(root, "packages/b/package.json", r#"{ "name": "b" }"#);
        create_test_file(root, "other/c/package.json", r#"{ "name": "c" }"#);

        let graph = WorkspaceGraph::build(root).unwrap();
        let names: Vec<&str> = graph.packages().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["root", "a", "b"]);
        assert!(graph.root_package().unwrap().is_root);
        assert!(!graph.get("a").unwrap().is_root);
    }

    #[test]
    fn test_manifest_workspaces_object() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(
            root,
            "package.json",
            r#"{ "name": "root", "workspaces": { "packages": ["apps/*"] } }"#,
        );
        create_test_file(root, "apps/web/package.json", r#"{ "name": "web" }"#);

        let graph = WorkspaceGraph::build(root).unwrap();
        assert_eq!(graph.packages().len(), 2);
        assert!(graph.get("web").is_some());
    }

    #[test]
    fn test_pnpm_file_takes_precedence_over_manifest_field() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "name": "root", "workspaces": ["apps/*"] }"#);
        create_test_file(root, "pnpm-workspace.yaml", "packages:\n  - libs/*\n");
        create_test_file(root, "apps/web/package.json", r#"{ "name": "web" }"#);
        create_test_file(root, "libs/util/package.json", r#"{ "name": "util" }"#);

        let graph = WorkspaceGraph::build(root).unwrap();
        assert!(graph.get("util").is_some());
        assert!(graph.get("web").is_none());
    }

    #[test]
    fn test_single_package_default() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "name": "solo" }"#);
        create_test_file(root, "packages/a/package.json", r#"{ "name": "a" }"#);

        let graph = WorkspaceGraph::build(root).unwrap();
        assert_eq!(graph.packages().len(), 1);
        assert_eq!(graph.packages()[0].name, "solo");
    }

    #[test]
    fn test_invalid_member_manifest_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "name": "root", "workspaces": ["packages/*"] }"#);
        create_test_file(root, "packages/good/package.json", r#"{ "name": "good" }"#);
        create_test_file(root, "packages/bad/package.json", "{ broken");

        let graph = WorkspaceGraph::build(root).unwrap();
        let names: Vec<&str> = graph.packages().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["root", "good"]);
    }

    #[test]
    fn test_negated_pattern_and_single_star() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(
            root,
            "package.json",
            r#"{ "name": "root", "workspaces": ["packages/*", "!packages/legacy"] }"#,
        );
        create_test_file(root, "packages/a/package.json", r#"{ "name": "a" }"#);
        create_test_file(root, "packages/legacy/package.json", r#"{ "name": "legacy" }"#);
        create_test_file(root, "packages/a/nested/package.json", r#"{ "name": "nested" }"#);

        let graph = WorkspaceGraph::build(root).unwrap();
        assert!(graph.get("a").is_some());
        assert!(graph.get("legacy").is_none());
        assert!(graph.get("nested").is_none());
    }

    #[test]
    fn test_node_modules_never_members() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "name": "root", "workspaces": ["**"] }"#);
        create_test_file(root, "packages/a/package.json", r#"{ "name": "a" }"#);
        create_test_file(root, "node_modules/dep/package.json", r#"{ "name": "dep" }"#);

        let graph = WorkspaceGraph::build(root).unwrap();
        assert!(graph.get("a").is_some());
        assert!(graph.get("dep").is_none());
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "name": "root", "workspaces": ["packages/*"] }"#);
        create_test_file(root, "packages/a/package.json", r#"{ "name": "dup" }"#);
        create_test_file(root, "packages/b/package.json", r#"{ "name": "dup" }"#);

        let graph = WorkspaceGraph::build(root).unwrap();
        assert_eq!(graph.packages().len(), 2);
        assert!(graph.get("dup").unwrap().dir.ends_with("packages/a"));
    }

    #[test]
    fn test_unreadable_root_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");
        assert!(WorkspaceGraph::build(&missing).is_err());
    }

    #[test]
    fn test_nested_exclusions_for_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "package.json", r#"{ "name": "root", "workspaces": ["packages/*"] }"#);
        create_test_file(root, "packages/a/package.json", r#"{ "name": "a" }"#);

        let graph = WorkspaceGraph::build(root).unwrap();
        let root_pkg = graph.root_package().unwrap();
        assert_eq!(graph.nested_exclusions(root_pkg), vec!["packages/a".to_string()]);
        assert!(graph.nested_exclusions(graph.get("a").unwrap()).is_empty());
    }
}
