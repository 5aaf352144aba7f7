//! File discovery and filtering.
//!
//! Discovery walks the tree under the scan root, pruning excluded
//! directories before they are opened, so traversal cost scales with the
//! surviving tree rather than the whole repository. Filtering then drops
//! oversized and pattern-excluded files and partitions the remainder so
//! priority files are analyzed first.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::WalkDir;

use super::{ScanError, ScanOptions, ScanTarget};

/// Discover all files under `root`, in sorted deterministic order.
///
/// Directory names matching a non-glob exclusion are pruned without
/// descending. Unreadable entries below the root are logged and skipped.
///
/// # Errors
///
/// Returns a [`ScanError`] when the root itself cannot be read.
pub fn discover_files(root: &Path, exclusions: &[String]) -> Result<Vec<PathBuf>, ScanError> {
    let excluded_dirs: HashSet<&str> = exclusions
        .iter()
        .filter(|pattern| !pattern.contains('*'))
        .map(String::as_str)
        .collect();

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            // Never prune the root itself.
            if entry.depth() == 0 {
                return true;
            }
            if entry.file_type().is_dir() {
                let name = entry.file_name().to_string_lossy();
                if excluded_dirs.contains(name.as_ref()) {
                    log::trace!("pruning excluded directory: {}", entry.path().display());
                    return false;
                }
            }
            true
        });

    for result in walker {
        match result {
            Ok(entry) => {
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
            Err(e) => {
                if e.depth() == 0 {
                    return Err(ScanError::RootUnreadable { source: e });
                }
                log::warn!("skipping unreadable entry: {e}");
            }
        }
    }

    Ok(files)
}

/// Filter discovered files and order them priority-first.
///
/// Drops files that match an exclusion glob, exceed `max_file_size`, or
/// whose metadata cannot be read. The returned order is a stable
/// partition: every priority file before every non-priority file, with
/// discovery order preserved inside each group. Surfacing the most
/// informative files first is scan policy, not an optimization.
pub fn filter_and_prioritize(
    files: Vec<PathBuf>,
    root: &Path,
    options: &ScanOptions,
) -> Vec<ScanTarget> {
    let exclude_matcher = build_matcher(root, &options.exclusions);
    let priority_matcher = build_matcher(root, &options.priority_patterns);

    let mut priority = Vec::new();
    let mut normal = Vec::new();

    for path in files {
        if matches(&exclude_matcher, &path, root) {
            log::trace!("excluded by pattern: {}", path.display());
            continue;
        }

        let size = match std::fs::metadata(&path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                continue;
            }
        };
        if size > options.max_file_size {
            log::debug!("skipping large file: {} ({size} bytes)", path.display());
            continue;
        }

        let is_priority = matches(&priority_matcher, &path, root);
        let target = ScanTarget { path, is_priority };
        if is_priority {
            priority.push(target);
        } else {
            normal.push(target);
        }
    }

    priority.extend(normal);
    priority
}

/// Compile glob patterns into a gitignore-style matcher rooted at the
/// scan root. Invalid patterns are logged and dropped.
fn build_matcher(root: &Path, patterns: &[String]) -> Option<Gitignore> {
    let mut builder = GitignoreBuilder::new(root);
    for pattern in patterns {
        if let Err(e) = builder.add_line(None, pattern) {
            log::warn!("invalid pattern '{pattern}': {e}");
        }
    }

    match builder.build() {
        Ok(matcher) if !matcher.is_empty() => Some(matcher),
        Ok(_) => None,
        Err(e) => {
            log::warn!("failed to build pattern matcher: {e}");
            None
        }
    }
}

fn matches(matcher: &Option<Gitignore>, path: &Path, root: &Path) -> bool {
    let Some(matcher) = matcher else {
        return false;
    };
    let relative = path.strip_prefix(root).unwrap_or(path);
    matcher.matched(relative, false).is_ignore()
}
