//! Mapping import specifiers to package names.

use std::collections::HashSet;

use crate::constants::{BUILTIN_PREFIXES, NODE_BUILTINS, RUNTIME_BUILTINS};

/// Modules provided by the platform or an embedded runtime, never by a
/// dependency. Built once and shared read-only.
#[derive(Debug, Clone)]
pub struct BuiltinModules {
    prefixes: Vec<String>,
    platform: HashSet<String>,
    runtime: HashSet<String>,
}

impl Default for BuiltinModules {
    fn default() -> Self {
        Self::new(
            BUILTIN_PREFIXES.iter().map(|s| s.to_string()),
            NODE_BUILTINS.iter().map(|s| s.to_string()),
            RUNTIME_BUILTINS.iter().map(|s| s.to_string()),
        )
    }
}

impl BuiltinModules {
    pub fn new(
        prefixes: impl IntoIterator<Item = String>,
        platform: impl IntoIterator<Item = String>,
        runtime: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            prefixes: prefixes.into_iter().collect(),
            platform: platform.into_iter().collect(),
            runtime: runtime.into_iter().collect(),
        }
    }

    /// Prefixed specifiers are always built-in; anything else must be listed
    /// exactly, subpaths included (`fs/promises`). `buffer/` and
    /// `process/browser` resolve to registry polyfills.
    pub fn is_builtin(&self, specifier: &str) -> bool {
        if self.prefixes.iter().any(|p| specifier.starts_with(p.as_str())) {
            return true;
        }
        self.platform.contains(specifier) || self.runtime.contains(specifier)
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../")
}

fn is_absolute(specifier: &str) -> bool {
    if specifier.starts_with('/') || specifier.starts_with('\\') {
        return true;
    }
    // C:\ or C:/
    let bytes = specifier.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && matches!(bytes[2], b'/' | b'\\')
}

fn is_url_like(specifier: &str) -> bool {
    ["http:", "https:", "data:", "file:"].iter().any(|p| specifier.starts_with(p))
}

/// The package an import specifier refers to, or `None` for anything that is
/// not an external package: relative or absolute paths, subpath imports
/// (`#internal`), URLs and built-ins.
pub fn package_name(specifier: &str, builtins: &BuiltinModules) -> Option<String> {
    let specifier = specifier.trim();
    if specifier.is_empty()
        || is_relative(specifier)
        || is_absolute(specifier)
        || specifier.starts_with('#')
        || is_url_like(specifier)
        || builtins.is_builtin(specifier)
    {
        return None;
    }

    let mut parts = specifier.split('/');
    let first = parts.next()?;
    if let Some(scope) = first.strip_prefix('@') {
        let name = parts.next().unwrap_or_default();
        if scope.is_empty() || name.is_empty() {
            return None;
        }
        Some(format!("{first}/{name}"))
    } else {
        Some(first.to_string())
    }
}

/// Packages that only ship type declarations.
pub fn is_type_declaration_package(name: &str) -> bool {
    name.starts_with("@types/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(spec: &str) -> Option<String> {
        package_name(spec, &BuiltinModules::default())
    }

    #[test]
    fn test_unscoped_and_scoped_names() {
        assert_eq!(name("lodash"), Some("lodash".to_string()));
        assert_eq!(name("lodash/fp/map"), Some("lodash".to_string()));
        assert_eq!(name("@scope/pkg"), Some("@scope/pkg".to_string()));
        assert_eq!(name("@scope/pkg/sub/path"), Some("@scope/pkg".to_string()));
    }

    #[test]
    fn test_relative_and_absolute_are_dropped() {
        assert_eq!(name("./local"), None);
        assert_eq!(name("../up"), None);
        assert_eq!(name("."), None);
        assert_eq!(name("/abs/path"), None);
        assert_eq!(name("C:\\win\\path"), None);
    }

    #[test]
    fn test_builtins_are_dropped() {
        assert_eq!(name("fs"), None);
        assert_eq!(name("fs/promises"), None);
        assert_eq!(name("node:fs"), None);
        assert_eq!(name("node:test"), None);
        assert_eq!(name("bun:sqlite"), None);
        assert_eq!(name("bun"), None);
        // Registry packages that only look similar
        assert_eq!(name("fs-extra"), Some("fs-extra".to_string()));
        assert_eq!(name("events-polyfill"), Some("events-polyfill".to_string()));
    }

    #[test]
    fn test_unlisted_builtin_subpaths_are_registry_packages() {
        assert_eq!(name("process/browser"), Some("process".to_string()));
        assert_eq!(name("buffer/"), Some("buffer".to_string()));
        assert_eq!(name("util/"), Some("util".to_string()));
        assert_eq!(name("util/types"), None);
        assert_eq!(name("stream/promises"), None);
    }

    #[test]
    fn test_subpath_imports_and_urls_are_dropped() {
        assert_eq!(name("#internal/utils"), None);
        assert_eq!(name("https://esm.sh/react"), None);
    }

    #[test]
    fn test_malformed_scoped_names_are_dropped() {
        assert_eq!(name("@/components/Button"), None);
        assert_eq!(name("@scope"), None);
    }

    #[test]
    fn test_injected_tables() {
        let builtins = BuiltinModules::new(
            vec!["deno:".to_string()],
            vec!["fs".to_string()],
            vec!["electron".to_string()],
        );
        assert_eq!(package_name("electron", &builtins), None);
        assert_eq!(package_name("deno:x", &builtins), None);
        assert_eq!(package_name("node:fs", &builtins), Some("node:fs".to_string()));
    }

    #[test]
    fn test_type_declaration_packages() {
        assert!(is_type_declaration_package("@types/node"));
        assert!(!is_type_declaration_package("typescript"));
    }
}
