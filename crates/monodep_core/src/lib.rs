//! Core building blocks for monodep.
//!
//! This crate provides the per-package inputs of the dependency checks:
//! - Loading `package.json` manifests and the workspace package graph
//! - Enumerating source files and classifying them as dev or prod
//! - Extracting value, type-only and dynamic imports from JS/TS files
//! - Mapping import specifiers to package names
//! - Resolving installed dependency manifests from `node_modules`

mod classifier;
mod config;
mod constants;
mod manifest;
mod parser;
mod resolver;
mod scanner;
mod specifier;
mod types;
mod workspace;

// Re-export public API
pub use classifier::{ClassifiedPath, ClassifierRule, DevFileClassifier};
pub use config::{default_root, find_git_root, find_workspace_root};
pub use constants::{JS_TS_EXTENSIONS, PROJECT_CONFIG_FILE};
pub use manifest::{PackageManifest, is_local_link_range};
pub use parser::{extract_imports, imports_for};
pub use resolver::{ManifestResolver, NodeModulesResolver};
pub use scanner::collect_source_files;
pub use specifier::{BuiltinModules, is_type_declaration_package, package_name};
pub use types::{
    DependencyKind, DynamicCandidate, FileImports, FileKind, ImportKind, ImportRecord, SourceFile,
};
pub use workspace::{WorkspaceGraph, relative_slash_path};
