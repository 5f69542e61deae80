use log::debug;
use monodep_core::PackageManifest;
use std::collections::{BTreeMap, BTreeSet};

use crate::{
    config::{IgnoreList, OwnershipPolicy},
    types::{OwnershipIssue, OwnershipIssueKind, PackageReport},
};

/// Non-root packages importing each external dependency, split by usage
/// context.
#[derive(Debug, Default)]
struct UsageIndex<'a> {
    prod: BTreeMap<&'a str, BTreeSet<&'a str>>,
    dev: BTreeMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> UsageIndex<'a> {
    fn build(
        packages: &'a [PackageManifest],
        reports: &'a [PackageReport],
        ignore: &IgnoreList,
    ) -> Self {
        let workspace_names: BTreeSet<&str> = packages.iter().map(|p| p.name.as_str()).collect();
        let root_names: BTreeSet<&str> =
            packages.iter().filter(|p| p.is_root).map(|p| p.name.as_str()).collect();
        let external = |name: &str| !workspace_names.contains(name) && !ignore.is_ignored(name);

        let mut index = Self::default();
        for report in reports.iter().filter(|r| !root_names.contains(r.package.as_str())) {
            let user = report.package.as_str();
            for name in report.summary.prod_imports.iter().filter(|n| external(n.as_str())) {
                index.prod.entry(name.as_str()).or_default().insert(user);
            }
            for name in report.summary.dev_imports.iter().filter(|n| external(n.as_str())) {
                index.dev.entry(name.as_str()).or_default().insert(user);
            }
        }
        index
    }

    /// Packages importing each dependency in any context, sorted by dependency.
    fn importers(&self) -> BTreeMap<&'a str, BTreeSet<&'a str>> {
        let mut all = self.prod.clone();
        for (name, users) in &self.dev {
            all.entry(*name).or_default().extend(users.iter().copied());
        }
        all
    }
}

/// Suggests where shared dependencies should be declared. Informational only.
pub fn find_ownership_issues(
    packages: &[PackageManifest],
    reports: &[PackageReport],
    policy: OwnershipPolicy,
    ignore: &IgnoreList,
) -> Vec<OwnershipIssue> {
    let index = UsageIndex::build(packages, reports, ignore);
    let importers = index.importers();
    let root = packages.iter().find(|p| p.is_root);
    let declared_at_root = |name: &str| root.is_some_and(|r| r.declares(name));

    let issues: Vec<OwnershipIssue> = match policy {
        OwnershipPolicy::RootShared => importers
            .iter()
            .filter(|(name, users)| users.len() >= 2 && !declared_at_root(name))
            .map(|(name, users)| OwnershipIssue {
                kind: OwnershipIssueKind::RootSharedCandidate,
                dependency: name.to_string(),
                packages: users.iter().map(|u| u.to_string()).collect(),
                detail: format!(
                    "'{}' is used by {} packages and could be declared once at the workspace root",
                    name,
                    users.len()
                ),
            })
            .collect(),
        OwnershipPolicy::WorkspaceExplicit => importers
            .iter()
            .filter(|(name, _)| declared_at_root(name))
            .filter_map(|(name, users)| {
                let undeclared: Vec<String> = users
                    .iter()
                    .filter(|user| {
                        packages.iter().find(|p| p.name == **user).is_some_and(|p| !p.declares(name))
                    })
                    .map(|u| u.to_string())
                    .collect();
                if undeclared.is_empty() {
                    return None;
                }
                Some(OwnershipIssue {
                    kind: OwnershipIssueKind::LocalDeclarationCandidate,
                    dependency: name.to_string(),
                    detail: format!(
                        "'{}' is declared at the workspace root but imported by {} without a local declaration",
                        name,
                        undeclared.join(", ")
                    ),
                    packages: undeclared,
                })
            })
            .collect(),
    };

    debug!("Found {} ownership suggestions ({:?})", issues.len(), policy);
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PackageImportSummary;
    use std::path::PathBuf;

    fn manifest(name: &str, json: &str, is_root: bool) -> PackageManifest {
        let mut m = PackageManifest::parse(json, PathBuf::from(format!("/repo/{name}")), name).unwrap();
        m.is_root = is_root;
        m
    }

    fn report(name: &str, prod: &[&str], dev: &[&str]) -> PackageReport {
        PackageReport {
            package: name.to_string(),
            summary: PackageImportSummary {
                prod_imports: prod.iter().map(|s| s.to_string()).collect(),
                dev_imports: dev.iter().map(|s| s.to_string()).collect(),
            },
            ..PackageReport::default()
        }
    }

    #[test]
    fn test_root_shared_candidate() {
        let packages = vec![
            manifest("root", "{}", true),
            manifest("a", r#"{ "dependencies": { "lodash": "^4.0.0" } }"#, false),
            manifest("b", r#"{ "devDependencies": { "lodash": "^4.0.0" } }"#, false),
        ];
        let reports = vec![
            report("root", &["lodash"], &[]),
            report("a", &["lodash", "b", "zod"], &[]),
            report("b", &[], &["lodash"]),
        ];

        let issues =
            find_ownership_issues(&packages, &reports, OwnershipPolicy::RootShared, &IgnoreList::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, OwnershipIssueKind::RootSharedCandidate);
        assert_eq!(issues[0].dependency, "lodash");
        assert_eq!(issues[0].packages, vec!["a", "b"]);
    }

    #[test]
    fn test_usage_index_splits_prod_and_dev() {
        let packages = vec![
            manifest("root", "{}", true),
            manifest("a", "{}", false),
            manifest("b", "{}", false),
        ];
        let reports = vec![
            report("root", &["react"], &[]),
            report("a", &["react", "b"], &["vitest"]),
            report("b", &[], &["react", "vitest"]),
        ];
        let index = UsageIndex::build(&packages, &reports, &IgnoreList::default());

        assert_eq!(index.prod.get("react"), Some(&BTreeSet::from(["a"])));
        assert_eq!(index.dev.get("react"), Some(&BTreeSet::from(["b"])));
        assert_eq!(index.dev.get("vitest"), Some(&BTreeSet::from(["a", "b"])));
        assert!(!index.prod.contains_key("b"));
        assert_eq!(index.importers().get("react"), Some(&BTreeSet::from(["a", "b"])));
    }

    #[test]
    fn test_root_declaration_removes_candidate() {
        let packages = vec![
            manifest("root", r#"{ "devDependencies": { "lodash": "^4.0.0" } }"#, true),
            manifest("a", "{}", false),
            manifest("b", "{}", false),
        ];
        let reports = vec![report("a", &["lodash"], &[]), report("b", &["lodash"], &[])];

        let issues =
            find_ownership_issues(&packages, &reports, OwnershipPolicy::RootShared, &IgnoreList::default());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_workspace_explicit_names_undeclared_packages() {
        let packages = vec![
            manifest("root", r#"{ "devDependencies": { "vitest": "^1.0.0", "zod": "^3.0.0" } }"#, true),
            manifest("a", r#"{ "devDependencies": { "vitest": "^1.0.0" } }"#, false),
            manifest("b", "{}", false),
        ];
        let reports = vec![
            report("a", &[], &["vitest"]),
            report("b", &["zod"], &["vitest"]),
        ];

        let issues = find_ownership_issues(
            &packages,
            &reports,
            OwnershipPolicy::WorkspaceExplicit,
            &IgnoreList::default(),
        );
        let found: Vec<(&str, Vec<String>)> =
            issues.iter().map(|i| (i.dependency.as_str(), i.packages.clone())).collect();
        assert_eq!(
            found,
            vec![("vitest", vec!["b".to_string()]), ("zod", vec!["b".to_string()])]
        );
        assert!(issues.iter().all(|i| i.kind == OwnershipIssueKind::LocalDeclarationCandidate));
    }
}
