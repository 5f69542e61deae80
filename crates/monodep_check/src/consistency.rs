use log::{debug, trace};
use monodep_core::{DependencyKind, PackageManifest, is_local_link_range};
use std::collections::{BTreeSet, HashMap};

use crate::{
    config::IgnoreList,
    types::{VersionMismatch, VersionUsage},
};

const CHECKED_KINDS: [DependencyKind; 3] =
    [DependencyKind::Runtime, DependencyKind::Dev, DependencyKind::Optional];

/// Declared ranges of one dependency, in first-seen order.
#[derive(Default)]
struct RangeIndex {
    ranges: Vec<(String, BTreeSet<String>)>,
}

impl RangeIndex {
    fn record(&mut self, range: &str, package: &str) {
        match self.ranges.iter_mut().find(|(r, _)| r == range) {
            Some((_, packages)) => {
                packages.insert(package.to_string());
            }
            None => self.ranges.push((range.to_string(), BTreeSet::from([package.to_string()]))),
        }
    }
}

/// Finds dependencies declared with more than one distinct range across the
/// workspace. Local-link ranges and ignored names are not compared.
pub fn find_version_mismatches(
    packages: &[PackageManifest],
    ignore: &IgnoreList,
) -> Vec<VersionMismatch> {
    let mut order: Vec<String> = Vec::new();
    let mut index: HashMap<String, RangeIndex> = HashMap::new();

    for package in packages {
        for (_, name, range) in package.entries(&CHECKED_KINDS) {
            if is_local_link_range(range) || ignore.is_ignored(name) {
                trace!("Skipping '{}@{}' in '{}'", name, range, package.name);
                continue;
            }
            if !index.contains_key(name) {
                order.push(name.to_string());
            }
            index.entry(name.to_string()).or_default().record(range, &package.name);
        }
    }

    let mismatches: Vec<VersionMismatch> = order
        .into_iter()
        .filter_map(|name| {
            let entry = index.remove(&name)?;
            if entry.ranges.len() < 2 {
                return None;
            }
            let versions: Vec<VersionUsage> = entry
                .ranges
                .into_iter()
                .map(|(range, packages)| VersionUsage {
                    range,
                    packages: packages.into_iter().collect(),
                })
                .collect();
            let listed: Vec<&str> = versions.iter().map(|v| v.range.as_str()).collect();
            Some(VersionMismatch {
                detail: format!("'{}' is declared with {} different ranges: {}", name, versions.len(), listed.join(", ")),
                dependency: name,
                versions,
            })
        })
        .collect();

    debug!("Found {} version mismatches", mismatches.len());
    mismatches
}
