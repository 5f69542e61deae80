//! Dependency consistency checks for JavaScript/TypeScript monorepos.
//!
//! This crate compares what every workspace package imports with what its
//! `package.json` declares, then looks across the workspace for version
//! drift, misdeclared internal references, unmet peer dependencies and,
//! optionally, dependencies that could be declared elsewhere.
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use clap::Parser;
//! use monodep_check::{Config, run_dependency_check};
//! use std::io::{BufWriter, Write};
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = Config::parse_from(["check", "--root", "/path/to/monorepo"]);
//! let result = run_dependency_check(cfg)?;
//!
//! let mut stdout = BufWriter::new(std::io::stdout());
//! if result.has_blocking_issues() {
//!     monodep_check::print_report(&mut stdout, &result)?;
//! } else {
//!     monodep_check::print_no_issues_message(&mut stdout, &result)?;
//! }
//! stdout.flush()?;
//! # Ok(())
//! # }
//! ```

mod checker;
mod config;
mod consistency;
mod internal;
mod ownership;
mod package;
mod peers;
mod reporter;
mod types;

// Re-export public API
pub use checker::{analyze_workspace, run_dependency_check};
pub use config::{
    Config, DynamicImportPolicy, IgnoreList, OwnershipPolicy, PeerBudget, ProjectConfig, Settings,
    load_project_config,
};
pub use consistency::find_version_mismatches;
pub use internal::find_internal_issues;
pub use ownership::find_ownership_issues;
pub use package::{AnalysisTables, analyze_package};
pub use peers::{
    check_declared_peers, check_installed_peers, normalize_provider_version, peer_satisfied,
};
pub use reporter::{print_json, print_no_issues_message, print_report};
pub use types::{
    CheckResult, DynamicImport, InstalledPeerStats, InternalIssue, InternalIssueKind,
    MissingDependency, OwnershipIssue, OwnershipIssueKind, PackageImportSummary, PackageReport,
    PeerIssue, PeerIssueKind, TruncationReason, UnusedDependency, VersionMismatch, VersionUsage,
    WrongTypeDependency, WrongTypeDirection,
};
