use log::{debug, trace};
use monodep_core::{DependencyKind, PackageManifest, is_local_link_range};
use std::collections::BTreeSet;

use crate::{
    config::IgnoreList,
    types::{InternalIssue, InternalIssueKind, PackageReport},
};

/// Checks how workspace packages reference each other.
///
/// `reports` are matched to `packages` by package name.
pub fn find_internal_issues(
    packages: &[PackageManifest],
    reports: &[PackageReport],
    ignore: &IgnoreList,
) -> Vec<InternalIssue> {
    let workspace_names: BTreeSet<&str> = packages.iter().map(|p| p.name.as_str()).collect();
    let mut issues = Vec::new();

    for package in packages {
        for (kind, name, range) in package.entries(&DependencyKind::ALL) {
            if name == package.name
                || !workspace_names.contains(name)
                || is_local_link_range(range)
                || ignore.is_ignored(name)
            {
                continue;
            }
            trace!("'{}' references workspace package '{}' as '{}'", package.name, name, range);
            issues.push(InternalIssue {
                kind: InternalIssueKind::NotWorkspaceProtocol,
                package: package.name.clone(),
                dependency: name.to_string(),
                range: Some(range.to_string()),
                detail: format!(
                    "workspace package '{}' is declared in {} as '{}' instead of a workspace link",
                    name,
                    kind.field(),
                    range
                ),
            });
        }

        let Some(report) = reports.iter().find(|r| r.package == package.name) else {
            continue;
        };
        for name in report.summary.all_imports() {
            if name == package.name
                || !workspace_names.contains(name)
                || package.declares(name)
                || ignore.is_ignored(name)
            {
                continue;
            }
            issues.push(InternalIssue {
                kind: InternalIssueKind::UndeclaredInternalImport,
                package: package.name.clone(),
                dependency: name.to_string(),
                range: None,
                detail: format!("workspace package '{}' is imported but not declared", name),
            });
        }
    }

    debug!("Found {} internal reference issues", issues.len());
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PackageImportSummary;
    use std::path::PathBuf;

    fn manifest(name: &str, json: &str) -> PackageManifest {
        PackageManifest::parse(json, PathBuf::from(format!("/repo/{name}")), name).unwrap()
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
    fn test_registry_range_for_workspace_package() {
        let packages = vec![
            manifest("a", r#"{ "dependencies": { "b": "1.2.3" } }"#),
            manifest("b", r#"{ "version": "1.2.3" }"#),
        ];
        let issues = find_internal_issues(&packages, &[], &IgnoreList::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, InternalIssueKind::NotWorkspaceProtocol);
        assert_eq!(issues[0].package, "a");
        assert_eq!(issues[0].dependency, "b");
        assert_eq!(issues[0].range.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_workspace_link_is_accepted() {
        let packages = vec![
            manifest("a", r#"{ "dependencies": { "b": "workspace:*" }, "devDependencies": { "c": "file:../c" } }"#),
            manifest("b", "{}"),
            manifest("c", "{}"),
        ];
        assert!(find_internal_issues(&packages, &[], &IgnoreList::default()).is_empty());
    }

    #[test]
    fn test_peer_registry_range_for_workspace_package() {
        let packages = vec![
            manifest("a", r#"{ "peerDependencies": { "b": "^1.0.0", "c": "workspace:^" } }"#),
            manifest("b", "{}"),
            manifest("c", "{}"),
        ];
        let issues = find_internal_issues(&packages, &[], &IgnoreList::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, InternalIssueKind::NotWorkspaceProtocol);
        assert_eq!(issues[0].dependency, "b");
        assert!(issues[0].detail.contains("peerDependencies"));
    }

    #[test]
    fn test_undeclared_internal_import() {
        let packages = vec![
            manifest("a", r#"{ "dependencies": { "c": "workspace:*" } }"#),
            manifest("b", "{}"),
            manifest("c", "{}"),
        ];
        let reports = vec![report("a", &["b", "c", "react"], &["a"])];

        let issues = find_internal_issues(&packages, &reports, &IgnoreList::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, InternalIssueKind::UndeclaredInternalImport);
        assert_eq!(issues[0].dependency, "b");
        assert_eq!(issues[0].range, None);
    }
}
