use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder, escape};
use ignore::WalkBuilder;
use log::{debug, trace, warn};
use std::path::Path;

use crate::{
    classifier::DevFileClassifier,
    constants::{JS_TS_EXTENSIONS, SKIPPED_DIRS, SKIPPED_FILES},
    types::SourceFile,
};

/// Builds a matcher for directories to exclude. Each entry is a literal
/// relative path and covers the directory itself and everything below it.
fn exclusion_set(dirs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for dir in dirs {
        let literal = escape(dir.trim_end_matches('/'));
        builder.add(Glob::new(&literal)?);
        builder.add(Glob::new(&format!("{literal}/**"))?);
    }
    Ok(builder.build()?)
}

/// Enumerates source files under `dir` and classifies each one.
///
/// `exclude` holds directories relative to `dir` (typically nested workspace
/// packages) whose contents belong to another package.
pub fn collect_source_files(
    dir: &Path,
    exclude: &[String],
    classifier: &DevFileClassifier,
) -> Result<Vec<SourceFile>> {
    debug!("Collecting source files under {}", dir.display());
    let excluded = exclusion_set(exclude)?;
    let base = dir.to_path_buf();

    let walker = WalkBuilder::new(dir)
        .hidden(false)
        .ignore(true)
        .git_ignore(true)
        .filter_entry(move |e| {
            if !e.file_type().is_some_and(|t| t.is_dir()) {
                return true;
            }
            let name = e.file_name().to_str().unwrap_or_default();
            if SKIPPED_DIRS.contains(&name) {
                return false;
            }
            let rel = e.path().strip_prefix(&base).unwrap_or(e.path());
            let rel = rel.to_string_lossy().replace('\\', "/");
            rel.is_empty() || !excluded.is_match(&rel)
        })
        .build();

    let mut files: Vec<SourceFile> = Vec::new();
    for res in walker {
        let dent = match res {
            Ok(dent) => dent,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        let p = dent.path();
        if !dent.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if p.file_name().and_then(|n| n.to_str()).is_some_and(|n| SKIPPED_FILES.contains(&n)) {
            trace!("Skipping generated file: {}", p.display());
            continue;
        }

        if let Some(ext) = p.extension().and_then(|e| e.to_str())
            && JS_TS_EXTENSIONS.contains(&ext)
        {
            let rel = p.strip_prefix(dir).unwrap_or(p);
            let kind = classifier.classify(rel);
            trace!("Found {:?} source file: {}", kind, rel.display());
            files.push(SourceFile { path: p.to_path_buf(), kind });
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!("Collected {} source files under {}", files.len(), dir.display());
    Ok(files)
}
