use std::{
    env,
    io::{self, Write},
    path::{Component, Path, PathBuf},
};

use anyhow::Result;
use colored::{ColoredString, Colorize};
use log::{debug, trace};

use crate::{
    config::DynamicImportPolicy,
    types::{
        CheckResult, InternalIssueKind, OwnershipIssueKind, PackageReport, PeerIssueKind,
        TruncationReason, WrongTypeDirection,
    },
};

/// Path of `relative_to_root` as seen from the current directory, so that
/// terminals can turn it into a link.
fn relativize_to_cwd(root: &Path, relative_to_root: &str) -> String {
    let Ok(cwd) = env::current_dir() else {
        debug!("Failed to get current directory");
        return relative_to_root.to_string();
    };
    let target = root.join(relative_to_root);
    match make_relative(&target, &cwd) {
        Some(rel) => {
            trace!("Relativized '{}' to '{}'", relative_to_root, rel.display());
            rel.to_string_lossy().replace('\\', "/")
        }
        None => relative_to_root.to_string(),
    }
}

/// Relative path from `base` to `target`; `None` when they share no root.
fn make_relative(target: &Path, base: &Path) -> Option<PathBuf> {
    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = base.components().collect();
    if target.first() != base.first() {
        return None;
    }

    let common = target.iter().zip(&base).take_while(|(t, b)| t == b).count();
    let mut result = PathBuf::new();
    for _ in common..base.len() {
        result.push("..");
    }
    for component in &target[common..] {
        result.push(component.as_os_str());
    }

    if result.as_os_str().is_empty() { Some(PathBuf::from(".")) } else { Some(result) }
}

fn branch(idx: usize, len: usize) -> ColoredString {
    if idx + 1 == len { "└──".dimmed() } else { "├──".dimmed() }
}

fn package_path(root: &Path, report: &PackageReport, file: &str) -> String {
    let rel = if report.dir == "." { file.to_string() } else { format!("{}/{}", report.dir, file) };
    relativize_to_cwd(root, &rel)
}

pub fn print_no_issues_message<W: Write>(writer: &mut W, result: &CheckResult) -> io::Result<()> {
    debug!("No blocking issues");
    writeln!(
        writer,
        "{} No dependency issues found in {} packages",
        "✓".green().bold(),
        result.packages.len()
    )?;
    writer.flush()?;
    Ok(())
}

/// Writes the whole result as pretty-printed JSON.
pub fn print_json<W: Write>(writer: &mut W, result: &CheckResult) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, result)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Human-readable report: package sections first, then workspace-wide
/// sections, then a summary.
pub fn print_report<W: Write>(writer: &mut W, result: &CheckResult) -> io::Result<()> {
    debug!("Printing report for {} packages", result.packages.len());

    for report in &result.packages {
        if report.has_dependency_issues() || !report.dynamic_imports.is_empty() {
            print_package(writer, report, result)?;
        }
    }
    print_workspace_sections(writer, result)?;
    print_summary(writer, result)?;

    writer.flush()?;
    Ok(())
}

fn print_package<W: Write>(
    writer: &mut W,
    report: &PackageReport,
    result: &CheckResult,
) -> io::Result<()> {
    trace!("Printing package: {}", report.package);
    writeln!(
        writer,
        "{} {}",
        report.package.bright_white().bold(),
        format!("({})", relativize_to_cwd(&result.root, &report.dir)).dimmed()
    )?;

    if !report.unused.is_empty() {
        writeln!(writer, "  {}", "Unused dependencies".yellow().bold())?;
        for (idx, u) in report.unused.iter().enumerate() {
            let fields: Vec<&str> = u.declared_as.iter().map(|k| k.field()).collect();
            writeln!(
                writer,
                "  {}  {} {}",
                branch(idx, report.unused.len()),
                u.dependency.red(),
                format!("({})", fields.join(", ")).dimmed()
            )?;
        }
    }

    if !report.missing.is_empty() {
        writeln!(writer, "  {}", "Missing dependencies".yellow().bold())?;
        for (idx, m) in report.missing.iter().enumerate() {
            writeln!(writer, "  {}  {}", branch(idx, report.missing.len()), m.dependency.red())?;
            for file in &m.files {
                writeln!(writer, "        {}", package_path(&result.root, report, file).blue())?;
            }
        }
    }

    if !report.wrong_type.is_empty() {
        writeln!(writer, "  {}", "Wrong dependency type".yellow().bold())?;
        for (idx, w) in report.wrong_type.iter().enumerate() {
            let hint = match w.direction {
                WrongTypeDirection::ShouldBeRuntime => "move to dependencies",
                WrongTypeDirection::ShouldBeDev => "move to devDependencies",
            };
            writeln!(
                writer,
                "  {}  {} {}",
                branch(idx, report.wrong_type.len()),
                w.dependency.red(),
                format!("({hint})").dimmed()
            )?;
        }
    }

    if !report.dynamic_imports.is_empty() {
        let title = "Dynamic imports";
        let title = match result.dynamic_import_policy {
            DynamicImportPolicy::Strict => title.red().bold(),
            _ => title.cyan().bold(),
        };
        writeln!(writer, "  {}", title)?;
        for (idx, d) in report.dynamic_imports.iter().enumerate() {
            writeln!(
                writer,
                "  {}  {}:{} {}",
                branch(idx, report.dynamic_imports.len()),
                package_path(&result.root, report, &d.file).blue(),
                d.line,
                d.expression.replace('\n', " ").dimmed()
            )?;
        }
    }

    writeln!(writer)?;
    Ok(())
}

fn print_workspace_sections<W: Write>(writer: &mut W, result: &CheckResult) -> io::Result<()> {
    if !result.version_mismatches.is_empty() {
        writeln!(writer, "{}", "Version mismatches".yellow().bold())?;
        for m in &result.version_mismatches {
            writeln!(writer, "  {}", m.dependency.red())?;
            for (idx, v) in m.versions.iter().enumerate() {
                writeln!(
                    writer,
                    "  {}  {} {}",
                    branch(idx, m.versions.len()),
                    v.range.cyan(),
                    v.packages.join(", ").dimmed()
                )?;
            }
        }
        writeln!(writer)?;
    }

    if !result.internal_issues.is_empty() {
        writeln!(writer, "{}", "Workspace references".yellow().bold())?;
        for (idx, i) in result.internal_issues.iter().enumerate() {
            let label = match i.kind {
                InternalIssueKind::NotWorkspaceProtocol => "not a workspace link",
                InternalIssueKind::UndeclaredInternalImport => "undeclared import",
            };
            writeln!(
                writer,
                "  {}  {} -> {} {}",
                branch(idx, result.internal_issues.len()),
                i.package.bright_white(),
                i.dependency.red(),
                format!("({label})").dimmed()
            )?;
        }
        writeln!(writer)?;
    }

    if !result.peer_issues.is_empty() {
        writeln!(writer, "{}", "Peer dependencies".yellow().bold())?;
        for (idx, p) in result.peer_issues.iter().enumerate() {
            let label = match p.kind {
                PeerIssueKind::MissingPeer | PeerIssueKind::InstalledMissingPeer => "missing",
                PeerIssueKind::IncompatiblePeer | PeerIssueKind::InstalledIncompatiblePeer => {
                    "incompatible"
                }
            };
            let via = p.via.as_deref().map(|v| format!(" via {v}")).unwrap_or_default();
            writeln!(
                writer,
                "  {}  {}{}: {}@{} {}",
                branch(idx, result.peer_issues.len()),
                p.package.bright_white(),
                via.dimmed(),
                p.peer.red(),
                p.required,
                format!("({label}, provided: {})", p.provided.as_deref().unwrap_or("none")).dimmed()
            )?;
        }
        writeln!(writer)?;
    }

    if let Some(stats) = &result.installed_peers
        && let Some(reason) = stats.truncated
    {
        let reason = match reason {
            TruncationReason::ManifestCap => "manifest limit reached",
            TruncationReason::Deadline => "time limit reached",
        };
        writeln!(
            writer,
            "{} Installed peer check incomplete: {} after {} manifests\n",
            "ℹ".blue(),
            reason,
            stats.manifests_loaded
        )?;
    }

    if !result.ownership_issues.is_empty() {
        writeln!(writer, "{}", "Ownership suggestions".blue().bold())?;
        for (idx, o) in result.ownership_issues.iter().enumerate() {
            let hint = match o.kind {
                OwnershipIssueKind::RootSharedCandidate => "declare at the workspace root",
                OwnershipIssueKind::LocalDeclarationCandidate => "declare locally in",
            };
            writeln!(
                writer,
                "  {}  {} {} {}",
                branch(idx, result.ownership_issues.len()),
                o.dependency.cyan(),
                hint.dimmed(),
                o.packages.join(", ")
            )?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn print_summary<W: Write>(writer: &mut W, result: &CheckResult) -> io::Result<()> {
    let count = |f: fn(&PackageReport) -> usize| -> usize { result.packages.iter().map(f).sum() };

    writeln!(writer, "{}", "─".repeat(60).dimmed())?;
    writeln!(writer, "{}", "Summary".bold())?;
    writeln!(writer, "  Unused: {}", count(|p| p.unused.len()).to_string().yellow())?;
    writeln!(writer, "  Missing: {}", count(|p| p.missing.len()).to_string().yellow())?;
    writeln!(writer, "  Wrong type: {}", count(|p| p.wrong_type.len()).to_string().yellow())?;
    writeln!(
        writer,
        "  Version mismatches: {}",
        result.version_mismatches.len().to_string().yellow()
    )?;
    writeln!(
        writer,
        "  Workspace references: {}",
        result.internal_issues.len().to_string().yellow()
    )?;
    writeln!(writer, "  Peer dependencies: {}", result.peer_issues.len().to_string().yellow())?;
    if result.dynamic_import_policy != DynamicImportPolicy::Off {
        writeln!(writer, "  Dynamic imports: {}", result.dynamic_import_count().to_string().cyan())?;
    }
    writeln!(
        writer,
        "  Blocking issues: {}",
        result.blocking_issue_count().to_string().red().bold()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DynamicImport, UnusedDependency, VersionMismatch, VersionUsage};
    use monodep_core::DependencyKind;

    fn render(result: &CheckResult) -> String {
        let mut out = Vec::new();
        print_report(&mut out, result).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn result_with(packages: Vec<PackageReport>) -> CheckResult {
        CheckResult {
            root: PathBuf::from("/repo"),
            packages,
            version_mismatches: Vec::new(),
            internal_issues: Vec::new(),
            peer_issues: Vec::new(),
            ownership_issues: Vec::new(),
            installed_peers: None,
            dynamic_import_policy: DynamicImportPolicy::Warn,
            files_analyzed: 0,
        }
    }

    #[test]
    fn test_make_relative_child_dir() {
        let result = make_relative(Path::new("/project/src/components/Button.tsx"), Path::new("/project/src"));
        assert_eq!(result, Some(PathBuf::from("components/Button.tsx")));
    }

    #[test]
    fn test_make_relative_sibling_dir() {
        let result = make_relative(Path::new("/project/apps/web/index.ts"), Path::new("/project/apps/api"));
        assert_eq!(result, Some(PathBuf::from("../web/index.ts")));
    }

    #[test]
    fn test_make_relative_same_path() {
        let result = make_relative(Path::new("/project/src"), Path::new("/project/src"));
        assert_eq!(result, Some(PathBuf::from(".")));
    }

    #[test]
    fn test_make_relative_multiple_levels_up() {
        let result = make_relative(Path::new("/project/file.ts"), Path::new("/project/apps/web/src"));
        assert_eq!(result, Some(PathBuf::from("../../../file.ts")));
    }

    #[test]
    fn test_report_lists_package_and_workspace_sections() {
        let mut result = result_with(vec![PackageReport {
            package: "web".to_string(),
            dir: "apps/web".to_string(),
            unused: vec![UnusedDependency {
                package: "web".to_string(),
                dependency: "left-pad".to_string(),
                declared_as: vec![DependencyKind::Runtime],
                detail: String::new(),
            }],
            dynamic_imports: vec![DynamicImport {
                package: "web".to_string(),
                file: "src/plugins.ts".to_string(),
                line: 12,
                expression: "`./plugins/${name}`".to_string(),
            }],
            ..PackageReport::default()
        }]);
        result.version_mismatches.push(VersionMismatch {
            dependency: "react".to_string(),
            versions: vec![
                VersionUsage { range: "^17.0.0".to_string(), packages: vec!["a".to_string()] },
                VersionUsage { range: "^18.0.0".to_string(), packages: vec!["b".to_string()] },
            ],
            detail: String::new(),
        });

        let out = render(&result);
        assert!(out.contains("Unused dependencies"));
        assert!(out.contains("left-pad"));
        assert!(out.contains("Dynamic imports"));
        assert!(out.contains("plugins.ts"));
        assert!(out.contains("Version mismatches"));
        assert!(out.contains("^17.0.0"));
        assert!(out.contains("Summary"));
    }

    #[test]
    fn test_clean_packages_are_not_listed() {
        let result = result_with(vec![PackageReport {
            package: "quiet-package".to_string(),
            dir: ".".to_string(),
            ..PackageReport::default()
        }]);
        let out = render(&result);
        assert!(!out.contains("quiet-package"));
    }

    #[test]
    fn test_json_output_is_valid() {
        let result = result_with(vec![PackageReport {
            package: "web".to_string(),
            dir: ".".to_string(),
            ..PackageReport::default()
        }]);
        let mut out = Vec::new();
        print_json(&mut out, &result).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["packages"][0]["package"], "web");
        assert_eq!(value["dynamicImportPolicy"], "warn");
        assert!(value["versionMismatches"].as_array().unwrap().is_empty());
    }
}
