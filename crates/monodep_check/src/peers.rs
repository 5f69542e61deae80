use log::{debug, info, trace};
use monodep_core::{DependencyKind, ManifestResolver, PackageManifest, is_local_link_range};
use regex::Regex;
use std::{
    collections::{BTreeSet, HashMap},
    path::PathBuf,
    sync::LazyLock,
    time::Instant,
};

use crate::{
    config::{IgnoreList, PeerBudget},
    types::{InstalledPeerStats, PeerIssue, PeerIssueKind, TruncationReason},
};

/// Kinds that can provide a peer declared by a workspace package.
const PROVIDER_KINDS: [DependencyKind; 3] =
    [DependencyKind::Runtime, DependencyKind::Dev, DependencyKind::Optional];

/// Kinds whose installed manifests are inspected.
const INSTALLED_KINDS: [DependencyKind; 3] =
    [DependencyKind::Runtime, DependencyKind::Dev, DependencyKind::Optional];

static VERSION_TOKEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?").ok());

/// Best-effort concrete version of a provider range: leading comparators are
/// stripped and the first `major.minor.patch` token is taken.
pub fn normalize_provider_version(range: &str) -> Option<String> {
    let stripped = range.trim_start_matches(|c: char| "^~>=<v".contains(c) || c.is_whitespace());
    let regex = VERSION_TOKEN.as_ref()?;
    regex.find(stripped).map(|m| m.as_str().to_string())
}

/// Whether a provider range satisfies a peer requirement. Unparseable inputs
/// on either side count as satisfied.
pub fn peer_satisfied(required: &str, provided: &str) -> bool {
    let Ok(range) = node_semver::Range::parse(required) else {
        trace!("Unparseable peer range '{}', treating as satisfied", required);
        return true;
    };
    let Some(version) = normalize_provider_version(provided) else {
        trace!("No concrete version in '{}', treating as satisfied", provided);
        return true;
    };
    match node_semver::Version::parse(&version) {
        Ok(v) => range.satisfies(&v),
        Err(_) => true,
    }
}

fn root_provider<'a>(
    root: Option<&'a PackageManifest>,
    package: &PackageManifest,
    peer: &str,
    kinds: &[DependencyKind],
) -> Option<&'a str> {
    root.filter(|r| r.dir != package.dir).and_then(|r| r.find_range(peer, kinds))
}

/// Checks every workspace package's own peer declarations against what the
/// package or the workspace root provides.
pub fn check_declared_peers(
    packages: &[PackageManifest],
    root: Option<&PackageManifest>,
    ignore: &IgnoreList,
) -> Vec<PeerIssue> {
    let mut issues = Vec::new();

    for package in packages {
        for (peer, required) in &package.peer_dependencies {
            if is_local_link_range(required) || ignore.is_ignored(peer) {
                continue;
            }
            let provided = package
                .find_range(peer, &PROVIDER_KINDS)
                .or_else(|| root_provider(root, package, peer, &PROVIDER_KINDS));

            match provided {
                None => issues.push(PeerIssue {
                    kind: PeerIssueKind::MissingPeer,
                    package: package.name.clone(),
                    peer: peer.clone(),
                    required: required.clone(),
                    provided: None,
                    via: None,
                    detail: format!(
                        "peer '{}@{}' is not provided by the package or the workspace root",
                        peer, required
                    ),
                }),
                Some(provided) if !peer_satisfied(required, provided) => issues.push(PeerIssue {
                    kind: PeerIssueKind::IncompatiblePeer,
                    package: package.name.clone(),
                    peer: peer.clone(),
                    required: required.clone(),
                    provided: Some(provided.to_string()),
                    via: None,
                    detail: format!(
                        "peer '{}' requires '{}' but '{}' is provided",
                        peer, required, provided
                    ),
                }),
                Some(_) => trace!("Peer '{}' of '{}' is satisfied", peer, package.name),
            }
        }
    }

    debug!("Found {} declared peer issues", issues.len());
    issues
}

/// Walks the installed manifests of workspace dependencies and validates the
/// peers they declare, within a manifest cap and a deadline.
struct InstalledPeerWalk<'a> {
    resolver: &'a dyn ManifestResolver,
    budget: PeerBudget,
    deadline: Instant,
    ignore: &'a IgnoreList,
    cache: HashMap<PathBuf, Option<PackageManifest>>,
    stats: InstalledPeerStats,
}

impl<'a> InstalledPeerWalk<'a> {
    fn budget_exhausted(&mut self) -> bool {
        let reason = if self.stats.manifests_loaded >= self.budget.max_manifests {
            Some(TruncationReason::ManifestCap)
        } else if Instant::now() >= self.deadline {
            Some(TruncationReason::Deadline)
        } else {
            None
        };
        if let Some(reason) = reason {
            info!(
                "Installed peer check stopped early ({:?}) after {} manifests",
                reason, self.stats.manifests_loaded
            );
            self.stats.truncated = Some(reason);
            return true;
        }
        false
    }

    fn load(&mut self, path: PathBuf, dependency: &str) -> Option<&PackageManifest> {
        if self.cache.contains_key(&path) {
            self.stats.cache_hits += 1;
        } else {
            self.stats.manifests_loaded += 1;
            let manifest = match PackageManifest::load(&path, dependency) {
                Ok(m) => Some(m),
                Err(e) => {
                    trace!("Skipping installed manifest: {:#}", e);
                    None
                }
            };
            self.cache.insert(path.clone(), manifest);
        }
        self.cache.get(&path).and_then(Option::as_ref)
    }

    fn check_package(
        &mut self,
        package: &PackageManifest,
        root: Option<&PackageManifest>,
        issues: &mut Vec<PeerIssue>,
    ) -> bool {
        let mut seen: BTreeSet<&str> = BTreeSet::new();

        for (_, dependency, range) in package.entries(&INSTALLED_KINDS) {
            if !seen.insert(dependency)
                || is_local_link_range(range)
                || self.ignore.is_ignored(dependency)
            {
                continue;
            }
            if self.budget_exhausted() {
                return false;
            }
            let Some(path) = self.resolver.resolve_manifest(dependency, &package.dir) else {
                trace!("'{}' is not installed for '{}'", dependency, package.name);
                continue;
            };
            let ignore = self.ignore;
            let Some(installed) = self.load(path, dependency) else {
                continue;
            };

            for (peer, required) in &installed.peer_dependencies {
                if installed.optional_peers.contains(peer)
                    || *peer == package.name
                    || is_local_link_range(required)
                    || ignore.is_ignored(peer)
                {
                    continue;
                }
                let provided = package
                    .find_range(peer, &DependencyKind::ALL)
                    .or_else(|| root_provider(root, package, peer, &DependencyKind::ALL));

                let (kind, detail) = match provided {
                    None => (
                        PeerIssueKind::InstalledMissingPeer,
                        format!(
                            "'{}' needs peer '{}@{}', which '{}' does not provide",
                            dependency, peer, required, package.name
                        ),
                    ),
                    Some(provided) if !peer_satisfied(required, provided) => (
                        PeerIssueKind::InstalledIncompatiblePeer,
                        format!(
                            "'{}' needs peer '{}@{}' but '{}' is provided",
                            dependency, peer, required, provided
                        ),
                    ),
                    Some(_) => continue,
                };
                issues.push(PeerIssue {
                    kind,
                    package: package.name.clone(),
                    peer: peer.clone(),
                    required: required.clone(),
                    provided: provided.map(str::to_string),
                    via: Some(dependency.to_string()),
                    detail,
                });
            }
        }
        true
    }
}

/// Validates peers declared by installed dependencies of every workspace
/// package. Stops silently once the budget is spent; the returned stats
/// record whether and why.
pub fn check_installed_peers(
    packages: &[PackageManifest],
    root: Option<&PackageManifest>,
    resolver: &dyn ManifestResolver,
    budget: PeerBudget,
    ignore: &IgnoreList,
) -> (Vec<PeerIssue>, InstalledPeerStats) {
    let mut walk = InstalledPeerWalk {
        resolver,
        budget,
        deadline: Instant::now() + budget.timeout,
        ignore,
        cache: HashMap::new(),
        stats: InstalledPeerStats::default(),
    };
    let mut issues = Vec::new();

    for package in packages {
        if !walk.check_package(package, root, &mut issues) {
            break;
        }
    }

    debug!(
        "Installed peer check: {} issues, {} manifests loaded, {} cache hits",
        issues.len(),
        walk.stats.manifests_loaded,
        walk.stats.cache_hits
    );
    (issues, walk.stats)
}
