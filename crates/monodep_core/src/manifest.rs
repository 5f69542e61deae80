use anyhow::{Context, Result};
use log::trace;
use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use crate::types::DependencyKind;

/// Range prefixes that point at a local directory rather than a registry version.
const LOCAL_LINK_PROTOCOLS: &[&str] = &["workspace:", "file:", "link:"];

pub fn is_local_link_range(range: &str) -> bool {
    let range = range.trim();
    LOCAL_LINK_PROTOCOLS.iter().any(|p| range.starts_with(p))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    peer_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    optional_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    peer_dependencies_meta: BTreeMap<String, PeerMeta>,
    workspaces: Option<WorkspacesField>,
}

#[derive(Debug, Default, Deserialize)]
struct PeerMeta {
    #[serde(default)]
    optional: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkspacesField {
    Simple(Vec<String>),
    Extended {
        #[serde(default)]
        packages: Vec<String>,
    },
}

/// A parsed `package.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    pub name: String,
    pub version: Option<String>,
    /// Absolute directory containing the manifest
    pub dir: PathBuf,
    pub is_root: bool,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
    pub peer_dependencies: BTreeMap<String, String>,
    pub optional_dependencies: BTreeMap<String, String>,
    /// Peers flagged `optional: true` in `peerDependenciesMeta`
    pub optional_peers: BTreeSet<String>,
    /// Raw `workspaces` patterns, only meaningful on the root manifest
    pub workspace_patterns: Vec<String>,
}

impl PackageManifest {
    /// Reads and parses the manifest at `path`. `fallback_name` names a manifest
    /// that has no `name` field.
    pub fn load(path: &Path, fallback_name: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&content, dir, fallback_name)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str, dir: PathBuf, fallback_name: &str) -> Result<Self> {
        let raw: RawManifest = serde_json::from_str(content)?;
        let name = match raw.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                trace!("Manifest in {} has no name, using '{}'", dir.display(), fallback_name);
                fallback_name.to_string()
            }
        };
        let workspace_patterns = match raw.workspaces {
            Some(WorkspacesField::Simple(patterns)) => patterns,
            Some(WorkspacesField::Extended { packages }) => packages,
            None => Vec::new(),
        };
        let optional_peers = raw
            .peer_dependencies_meta
            .into_iter()
            .filter(|(_, meta)| meta.optional)
            .map(|(name, _)| name)
            .collect();

        Ok(Self {
            name,
            version: raw.version,
            dir,
            is_root: false,
            dependencies: raw.dependencies,
            dev_dependencies: raw.dev_dependencies,
            peer_dependencies: raw.peer_dependencies,
            optional_dependencies: raw.optional_dependencies,
            optional_peers,
            workspace_patterns,
        })
    }

    pub fn deps(&self, kind: DependencyKind) -> &BTreeMap<String, String> {
        match kind {
            DependencyKind::Runtime => &self.dependencies,
            DependencyKind::Dev => &self.dev_dependencies,
            DependencyKind::Peer => &self.peer_dependencies,
            DependencyKind::Optional => &self.optional_dependencies,
        }
    }

    /// Whether `name` is declared under any of the four kinds.
    pub fn declares(&self, name: &str) -> bool {
        DependencyKind::ALL.iter().any(|k| self.deps(*k).contains_key(name))
    }

    pub fn declares_as(&self, name: &str, kind: DependencyKind) -> bool {
        self.deps(kind).contains_key(name)
    }

    pub fn declared_kinds(&self, name: &str) -> Vec<DependencyKind> {
        DependencyKind::ALL.into_iter().filter(|k| self.deps(*k).contains_key(name)).collect()
    }

    /// Union of all declared dependency names.
    pub fn declared_names(&self) -> BTreeSet<&str> {
        DependencyKind::ALL
            .iter()
            .flat_map(|k| self.deps(*k).keys().map(String::as_str))
            .collect()
    }

    /// First range declared for `name`, searching `kinds` in order.
    pub fn find_range(&self, name: &str, kinds: &[DependencyKind]) -> Option<&str> {
        kinds.iter().find_map(|k| self.deps(*k).get(name).map(String::as_str))
    }

    /// Iterates `(kind, name, range)` over the given kinds, kind by kind.
    pub fn entries<'a>(
        &'a self,
        kinds: &'a [DependencyKind],
    ) -> impl Iterator<Item = (DependencyKind, &'a str, &'a str)> + 'a {
        kinds.iter().flat_map(move |k| {
            self.deps(*k).iter().map(move |(name, range)| (*k, name.as_str(), range.as_str()))
        })
    }
}
