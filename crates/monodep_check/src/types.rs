use monodep_core::DependencyKind;
use serde::Serialize;
use std::{collections::BTreeSet, path::PathBuf};

use crate::config::DynamicImportPolicy;

/// Package names imported by one package, split by usage context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageImportSummary {
    pub prod_imports: BTreeSet<String>,
    pub dev_imports: BTreeSet<String>,
}

impl PackageImportSummary {
    pub fn imports(&self, name: &str) -> bool {
        self.prod_imports.contains(name) || self.dev_imports.contains(name)
    }

    pub fn all_imports(&self) -> BTreeSet<&str> {
        self.prod_imports.iter().chain(&self.dev_imports).map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnusedDependency {
    pub package: String,
    pub dependency: String,
    pub declared_as: Vec<DependencyKind>,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingDependency {
    pub package: String,
    pub dependency: String,
    /// Importing files, relative to the package directory
    pub files: Vec<String>,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrongTypeDirection {
    /// Declared as a dev dependency but used in production code
    ShouldBeRuntime,
    /// Declared as a runtime dependency but only used in development code
    ShouldBeDev,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrongTypeDependency {
    pub package: String,
    pub dependency: String,
    pub direction: WrongTypeDirection,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicImport {
    pub package: String,
    pub file: String,
    pub line: usize,
    pub expression: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageReport {
    pub package: String,
    /// Package directory relative to the workspace root
    pub dir: String,
    pub files_scanned: usize,
    pub summary: PackageImportSummary,
    pub unused: Vec<UnusedDependency>,
    pub missing: Vec<MissingDependency>,
    pub wrong_type: Vec<WrongTypeDependency>,
    pub dynamic_imports: Vec<DynamicImport>,
}

impl PackageReport {
    pub fn has_dependency_issues(&self) -> bool {
        !self.unused.is_empty() || !self.missing.is_empty() || !self.wrong_type.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionUsage {
    pub range: String,
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionMismatch {
    pub dependency: String,
    pub versions: Vec<VersionUsage>,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InternalIssueKind {
    /// Workspace package referenced with a registry range instead of a local link
    NotWorkspaceProtocol,
    /// Workspace package imported without being declared
    UndeclaredInternalImport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InternalIssue {
    pub kind: InternalIssueKind,
    pub package: String,
    pub dependency: String,
    pub range: Option<String>,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeerIssueKind {
    MissingPeer,
    IncompatiblePeer,
    InstalledMissingPeer,
    InstalledIncompatiblePeer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerIssue {
    pub kind: PeerIssueKind,
    pub package: String,
    pub peer: String,
    pub required: String,
    pub provided: Option<String>,
    /// Installed dependency that declares the peer, for installed-level issues
    pub via: Option<String>,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OwnershipIssueKind {
    RootSharedCandidate,
    LocalDeclarationCandidate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnershipIssue {
    pub kind: OwnershipIssueKind,
    pub dependency: String,
    pub packages: Vec<String>,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TruncationReason {
    ManifestCap,
    Deadline,
}

/// Diagnostics of the installed-peer traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledPeerStats {
    pub manifests_loaded: usize,
    pub cache_hits: usize,
    pub truncated: Option<TruncationReason>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub root: PathBuf,
    pub packages: Vec<PackageReport>,
    pub version_mismatches: Vec<VersionMismatch>,
    pub internal_issues: Vec<InternalIssue>,
    pub peer_issues: Vec<PeerIssue>,
    pub ownership_issues: Vec<OwnershipIssue>,
    pub installed_peers: Option<InstalledPeerStats>,
    pub dynamic_import_policy: DynamicImportPolicy,
    pub files_analyzed: usize,
}

impl CheckResult {
    pub fn dynamic_import_count(&self) -> usize {
        self.packages.iter().map(|p| p.dynamic_imports.len()).sum()
    }

    /// Number of issues that fail the check. Ownership suggestions never count;
    /// dynamic imports count only under the strict policy.
    pub fn blocking_issue_count(&self) -> usize {
        let per_package: usize = self
            .packages
            .iter()
            .map(|p| p.unused.len() + p.missing.len() + p.wrong_type.len())
            .sum();
        let dynamic = if self.dynamic_import_policy == DynamicImportPolicy::Strict {
            self.dynamic_import_count()
        } else {
            0
        };
        per_package
            + self.version_mismatches.len()
            + self.internal_issues.len()
            + self.peer_issues.len()
            + dynamic
    }

    pub fn has_blocking_issues(&self) -> bool {
        self.blocking_issue_count() > 0
    }
}
