use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::{debug, info, warn};
use monodep_core::PROJECT_CONFIG_FILE;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_MAX_INSTALLED_MANIFESTS: usize = 2000;
pub const DEFAULT_INSTALLED_PEER_TIMEOUT_MS: u64 = 5000;

/// How dynamic `import()` / `require()` calls with non-literal arguments are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DynamicImportPolicy {
    /// Do not report them
    Off,
    /// Report them for review without failing
    #[default]
    Warn,
    /// Report them and fail the check
    Strict,
}

/// Where shared dependencies are expected to be declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OwnershipPolicy {
    /// Dependencies used by several packages belong in the root manifest
    RootShared,
    /// Every package declares what it imports, even if the root does too
    WorkspaceExplicit,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "check")]
#[command(about = "Check declared dependencies against imports in a JS/TS monorepo")]
pub struct Config {
    /// Root directory of the workspace (defaults to the enclosing workspace or git root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Dependency name or glob pattern to ignore (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore: Vec<String>,

    /// Report dependency placement suggestions under the given policy
    #[arg(long, value_enum)]
    pub ownership: Option<OwnershipPolicy>,

    /// Validate peer dependencies of installed packages
    #[arg(long)]
    pub installed_peers: bool,

    /// Maximum number of installed manifests read by the installed-peer check
    #[arg(long)]
    pub max_installed_manifests: Option<usize>,

    /// Time budget of the installed-peer check, in milliseconds
    #[arg(long)]
    pub installed_peer_timeout_ms: Option<u64>,

    /// How to report dynamic imports with non-literal arguments
    #[arg(long, value_enum)]
    pub dynamic_imports: Option<DynamicImportPolicy>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    #[clap(skip)]
    pub project: ProjectConfig,
}

/// Contents of `monodep.json` at the workspace root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectConfig {
    pub ignore: Vec<String>,
    pub ownership: Option<OwnershipPolicy>,
    pub dynamic_imports: Option<DynamicImportPolicy>,
    pub installed_peers: Option<bool>,
    pub max_installed_manifests: Option<usize>,
    pub installed_peer_timeout_ms: Option<u64>,
}

/// Reads `monodep.json` from `root`. A missing file gives the default
/// configuration; an invalid one is reported and ignored.
pub fn load_project_config(root: &Path) -> ProjectConfig {
    let path = root.join(PROJECT_CONFIG_FILE);
    if !path.is_file() {
        debug!("No {} found in {}", PROJECT_CONFIG_FILE, root.display());
        return ProjectConfig::default();
    }

    let parsed = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))
        .and_then(|s| {
            serde_json::from_str::<ProjectConfig>(&s)
                .with_context(|| format!("Failed to parse {}", path.display()))
        });
    match parsed {
        Ok(cfg) => {
            debug!("Loaded project config: {:?}", cfg);
            cfg
        }
        Err(e) => {
            warn!("Ignoring invalid configuration: {:#}", e);
            ProjectConfig::default()
        }
    }
}

impl Config {
    /// Initialize the config by resolving the root directory and loading the project config
    pub fn initialize(&mut self) -> Result<()> {
        let root = if let Some(r) = self.root.take() {
            debug!("Using provided root directory: {:?}", r);
            r.canonicalize().unwrap_or(r)
        } else {
            debug!("No root provided, searching for workspace root");
            monodep_core::default_root()?
        };
        info!("Using root directory: {}", root.display());

        self.project = load_project_config(&root);
        self.root = Some(root);
        Ok(())
    }

    /// Get the root directory, returning an error if not initialized
    pub fn root(&self) -> Result<&PathBuf> {
        self.root
            .as_ref()
            .ok_or_else(|| anyhow!("Config not initialized - call initialize() first"))
    }

    /// Command-line values, then `monodep.json`, then defaults.
    pub fn settings(&self) -> Settings {
        let patterns: Vec<String> =
            self.project.ignore.iter().chain(&self.ignore).cloned().collect();
        Settings {
            ignore: IgnoreList::new(&patterns),
            ownership: self.ownership.or(self.project.ownership),
            dynamic_imports: self
                .dynamic_imports
                .or(self.project.dynamic_imports)
                .unwrap_or_default(),
            installed_peers: self.installed_peers
                || self.project.installed_peers.unwrap_or(false),
            peer_budget: PeerBudget {
                max_manifests: self
                    .max_installed_manifests
                    .or(self.project.max_installed_manifests)
                    .unwrap_or(DEFAULT_MAX_INSTALLED_MANIFESTS),
                timeout: Duration::from_millis(
                    self.installed_peer_timeout_ms
                        .or(self.project.installed_peer_timeout_ms)
                        .unwrap_or(DEFAULT_INSTALLED_PEER_TIMEOUT_MS),
                ),
            },
        }
    }
}

/// Limits of the installed-peer traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerBudget {
    pub max_manifests: usize,
    pub timeout: Duration,
}

impl Default for PeerBudget {
    fn default() -> Self {
        Self {
            max_manifests: DEFAULT_MAX_INSTALLED_MANIFESTS,
            timeout: Duration::from_millis(DEFAULT_INSTALLED_PEER_TIMEOUT_MS),
        }
    }
}

/// Effective options of one run.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub ignore: IgnoreList,
    pub ownership: Option<OwnershipPolicy>,
    pub dynamic_imports: DynamicImportPolicy,
    pub installed_peers: bool,
    pub peer_budget: PeerBudget,
}

/// Dependency names excluded from every check, by exact name or glob.
#[derive(Debug, Clone)]
pub struct IgnoreList {
    set: GlobSet,
}

impl Default for IgnoreList {
    fn default() -> Self {
        Self { set: GlobSet::empty() }
    }
}

impl IgnoreList {
    pub fn new(patterns: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!("Ignoring invalid ignore pattern '{}': {}", pattern, e),
            }
        }
        let set = builder.build().unwrap_or_else(|e| {
            warn!("Failed to build ignore list: {}", e);
            GlobSet::empty()
        });
        Self { set }
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.set.is_match(name)
    }
}
