//! Local tree enumeration
//!
//! Walks a directory and returns every regular file below it. Symlinks are
//! never followed while walking; each one is classified by its target, so a
//! link to a file is returned and a link to a directory is skipped like any
//! other directory. Dangling links are skipped with a warning.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::path::utf8_name;

/// List all non-directory entries below `root`, sorted by path
///
/// Re-walks the tree on every call. Fails with [`Error::PathNotFound`] when
/// `root` does not exist and with [`Error::InvalidPath`] when a name below it
/// is not valid UTF-8.
pub fn list_files(root: &Path) -> Result<Vec<PathBuf>> {
    walk(root, |_| true)
}

/// List files below `root` whose `/`-joined relative path matches `pattern`
///
/// `**` matches across directory levels, `*` and `?` stay within one.
pub fn list_matching(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = compile_pattern(pattern)?;
    walk(root, |relative| pattern.matches_with(relative, match_options()))
}

/// Sum of the sizes of `paths`, following symlinks
pub fn total_size(paths: &[PathBuf]) -> Result<u64> {
    let mut total = 0;
    for path in paths {
        total += std::fs::metadata(path)?.len();
    }
    Ok(total)
}

/// Compile a glob pattern, reporting syntax errors as invalid paths
pub fn compile_pattern(pattern: &str) -> Result<glob::Pattern> {
    glob::Pattern::new(pattern).map_err(|e| Error::InvalidPath(format!("Invalid pattern: {e}")))
}

/// Options shared by local and remote pattern matching
pub fn match_options() -> glob::MatchOptions {
    glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

fn walk(root: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(Error::PathNotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| match e.into_io_error() {
            Some(io) => Error::Io(io),
            None => Error::General("filesystem loop while walking".to_string()),
        })?;

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        if file_type.is_symlink() {
            match std::fs::metadata(entry.path()) {
                Ok(target) if target.is_dir() => continue,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %entry.path().display(),
                        error = %e,
                        "Skipping dangling symlink"
                    );
                    continue;
                }
            }
        }

        let relative = relative_slash_path(root, entry.path())?;
        if keep(&relative) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    tracing::debug!(root = %root.display(), files = files.len(), "Enumerated local tree");
    Ok(files)
}

fn relative_slash_path(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let segments = relative
        .components()
        .map(|c| utf8_name(c.as_os_str(), path))
        .collect::<Result<Vec<_>>>()?;
    Ok(segments.join("/"))
}
