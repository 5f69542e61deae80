use log::trace;
use path_clean::clean;
use std::path::{Path, PathBuf};

use crate::constants::MANIFEST_FILE;

/// Locates the installed `package.json` of a dependency as seen from a
/// consuming package.
pub trait ManifestResolver: Send + Sync {
    /// Path of the installed manifest of `dependency` visible from `from_dir`,
    /// or `None` when it is not installed.
    fn resolve_manifest(&self, dependency: &str, from_dir: &Path) -> Option<PathBuf>;
}

/// Node-style lookup: `node_modules/<dependency>/package.json` in `from_dir`
/// and each ancestor up to the workspace root. Symlinked installs (pnpm) are
/// canonicalised so the same install always resolves to the same path.
pub struct NodeModulesResolver {
    workspace_root: PathBuf,
}

impl NodeModulesResolver {
    pub fn new(workspace_root: &Path) -> Self {
        Self { workspace_root: workspace_root.to_path_buf() }
    }
}

impl ManifestResolver for NodeModulesResolver {
    fn resolve_manifest(&self, dependency: &str, from_dir: &Path) -> Option<PathBuf> {
        trace!("Walking up from {:?} to find node_modules for '{}'", from_dir, dependency);
        let mut current_dir = from_dir;

        loop {
            let candidate = current_dir.join("node_modules").join(dependency).join(MANIFEST_FILE);
            if candidate.is_file() {
                let resolved = candidate
                    .canonicalize()
                    .unwrap_or_else(|_| PathBuf::from(clean(candidate.to_string_lossy().as_ref())));
                trace!("Resolved '{}' to {}", dependency, resolved.display());
                return Some(resolved);
            }

            // Stop at workspace root
            if current_dir == self.workspace_root {
                break;
            }

            current_dir = current_dir.parent()?;
        }

        trace!("'{}' is not installed for {:?}", dependency, from_dir);
        None
    }
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
    fn test_resolves_from_package_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let manifest =
            create_test_file(root, "packages/a/node_modules/dep/package.json", r#"{"name":"dep"}"#);

        let resolver = NodeModulesResolver::new(root);
        let resolved = resolver.resolve_manifest("dep", &root.join("packages/a")).unwrap();
        assert_eq!(resolved, manifest.canonicalize().unwrap());
    }

    #[test]
    fn test_walks_up_to_hoisted_install() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("packages/a")).unwrap();
        let manifest = create_test_file(root, "node_modules/@scope/dep/package.json", "{}");

        let resolver = NodeModulesResolver::new(root);
        let resolved = resolver.resolve_manifest("@scope/dep", &root.join("packages/a")).unwrap();
        assert_eq!(resolved, manifest.canonicalize().unwrap());
    }

    #[test]
    fn test_nearest_install_wins() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let local = create_test_file(root, "packages/a/node_modules/dep/package.json", "{}");
        create_test_file(root, "node_modules/dep/package.json", "{}");

        let resolver = NodeModulesResolver::new(root);
        let resolved = resolver.resolve_manifest("dep", &root.join("packages/a")).unwrap();
        assert_eq!(resolved, local.canonicalize().unwrap());
    }

    #[test]
    fn test_does_not_look_above_workspace_root() {
        let temp_dir = TempDir::new().unwrap();
        let outer = temp_dir.path();
        create_test_file(outer, "node_modules/dep/package.json", "{}");
        let root = outer.join("repo");
        fs::create_dir_all(&root).unwrap();

        let resolver = NodeModulesResolver::new(&root);
        assert!(resolver.resolve_manifest("dep", &root).is_none());
    }
}
