use anyhow::{Result, anyhow};
use log::{debug, trace};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::constants::{MANIFEST_FILE, PNPM_WORKSPACE_FILE};

pub fn find_git_root() -> Result<PathBuf> {
    debug!("Searching for git root");
    let mut current_dir = env::current_dir()?;
    trace!("Starting search from: {:?}", current_dir);

    loop {
        let git_dir = current_dir.join(".git");
        trace!("Checking for .git at: {:?}", git_dir);
        if git_dir.exists() {
            debug!("Found git root at: {:?}", current_dir);
            return Ok(current_dir);
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => {
                debug!("Could not find .git directory in any parent folder");
                return Err(anyhow!("Could not find .git directory in any parent folder"));
            }
        }
    }
}

fn declares_workspaces(manifest: &Path) -> bool {
    fs::read_to_string(manifest)
        .ok()
        .and_then(|s| serde_json::from_str::<serde_json::Value>(&s).ok())
        .is_some_and(|v| v.get("workspaces").is_some())
}

/// Nearest ancestor of `start` (inclusive) that is a monorepo root: it holds a
/// `pnpm-workspace.yaml` or a `package.json` with a `workspaces` field.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    debug!("Searching for workspace root from {:?}", start);
    let mut current = Some(start);

    while let Some(dir) = current {
        if dir.join(PNPM_WORKSPACE_FILE).is_file() || declares_workspaces(&dir.join(MANIFEST_FILE))
        {
            debug!("Found workspace root at: {:?}", dir);
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }

    None
}

/// Root to analyse when none is given: the workspace root above the current
/// directory, else the git root, else the current directory.
pub fn default_root() -> Result<PathBuf> {
    let cwd = env::current_dir()?;
    if let Some(root) = find_workspace_root(&cwd) {
        return Ok(root);
    }
    Ok(find_git_root().unwrap_or(cwd))
}
