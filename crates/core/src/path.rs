//! Mapping between local paths and bucket keys
//!
//! Keys are built by plain string concatenation: `key = prefix + relative`.
//! No separator is ever inserted between the two, so a prefix meant to act as
//! a folder must already end with `/`.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Characters that start a glob wildcard
const WILDCARDS: [char; 4] = ['*', '?', '[', '{'];

/// Build the key for `path`, a file below `root`, under `prefix`
///
/// The relative part is joined with `/` regardless of the platform separator.
/// Fails with [`Error::InvalidPath`] when `path` is not strictly inside `root`
/// or when one of its components is not valid UTF-8.
pub fn to_key(root: &Path, prefix: &str, path: &Path) -> Result<String> {
    let root = lexical_normalize(root);
    let path = lexical_normalize(path);

    let relative = path.strip_prefix(&root).map_err(|_| {
        Error::InvalidPath(format!(
            "{} is not inside {}",
            path.display(),
            root.display()
        ))
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(s) => segments.push(utf8_name(s, &path)?),
            _ => {
                return Err(Error::InvalidPath(format!(
                    "{} is not inside {}",
                    path.display(),
                    root.display()
                )));
            }
        }
    }

    if segments.is_empty() {
        return Err(Error::InvalidPath(format!(
            "{} is the root itself, not a file inside it",
            path.display()
        )));
    }

    Ok(format!("{prefix}{}", segments.join("/")))
}

/// Resolve where `key` lands below `destination_root`
///
/// Strips `prefix` from the key, splits the remainder on `/` and returns the
/// directory to create together with the file name. Empty segments in the
/// middle of a key are collapsed; `.` and `..` segments are rejected so a key
/// can never escape the destination.
pub fn to_local_path(
    destination_root: &Path,
    prefix: &str,
    key: &str,
) -> Result<(PathBuf, String)> {
    let rest = key
        .strip_prefix(prefix)
        .ok_or_else(|| Error::KeyPrefixMismatch {
            key: key.to_string(),
            prefix: prefix.to_string(),
        })?;

    let mut segments: Vec<&str> = rest.split('/').collect();
    let file_name = match segments.pop() {
        Some(name) if !name.is_empty() => name,
        _ => return Err(Error::EmptyObjectName(key.to_string())),
    };

    if is_relative_segment(file_name) {
        return Err(relative_segment_error(key));
    }

    let mut directory = destination_root.to_path_buf();
    for segment in segments.into_iter().filter(|s| !s.is_empty()) {
        if is_relative_segment(segment) {
            return Err(relative_segment_error(key));
        }
        directory.push(segment);
    }

    Ok((directory, file_name.to_string()))
}

/// Borrow a path component as UTF-8
///
/// Keys are UTF-8, so a name that is not cannot be mapped without losing
/// bytes. `path` is only used for the error message.
pub fn utf8_name<'a>(name: &'a OsStr, path: &Path) -> Result<&'a str> {
    name.to_str()
        .ok_or_else(|| Error::InvalidPath(format!("{} is not valid UTF-8", path.display())))
}

fn is_relative_segment(segment: &str) -> bool {
    segment == "." || segment == ".."
}

fn relative_segment_error(key: &str) -> Error {
    Error::InvalidPath(format!("key '{key}' contains a relative segment"))
}

/// Last `/`-separated segment of a key
pub fn base_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Key used by the flat, non-recursive transfers: `destination/name`
///
/// A trailing `/` on the destination is not doubled. Without a destination the
/// bare name is used.
pub fn flat_key(destination: Option<&str>, name: &str) -> String {
    match destination.map(|d| d.trim_end_matches('/')) {
        Some(d) if !d.is_empty() => format!("{d}/{name}"),
        _ => name.to_string(),
    }
}

/// Normalize a user-supplied prefix
///
/// Keys never begin with `/`, so a leading one is dropped. Nothing is appended:
/// `data` and `data/` stay distinct prefixes.
pub fn normalize_prefix(prefix: Option<&str>) -> String {
    prefix.unwrap_or_default().trim_start_matches('/').to_string()
}

/// Literal part of a glob pattern, up to its first wildcard
pub fn pattern_prefix(pattern: &str) -> &str {
    match pattern.find(WILDCARDS) {
        Some(idx) => &pattern[..idx],
        None => pattern,
    }
}

/// Remove `.` components and resolve `..` without touching the filesystem
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_key_joins_without_separator() {
        let root = Path::new("/data/run");
        let key = to_key(root, "backup/", Path::new("/data/run/a/b.txt")).unwrap();
        assert_eq!(key, "backup/a/b.txt");

        // The prefix is concatenated verbatim
        let key = to_key(root, "backup", Path::new("/data/run/b.txt")).unwrap();
        assert_eq!(key, "backupb.txt");
    }

    #[test]
    fn test_to_key_empty_prefix() {
        let key = to_key(Path::new("/r"), "", Path::new("/r/x/y/z.bin")).unwrap();
        assert_eq!(key, "x/y/z.bin");
    }

    #[test]
    fn test_to_key_normalizes_dots() {
        let key = to_key(Path::new("/r/./sub"), "", Path::new("/r/sub/d/../f.txt")).unwrap();
        assert_eq!(key, "f.txt");
    }

    #[test]
    fn test_to_key_outside_root() {
        let err = to_key(Path::new("/r/sub"), "", Path::new("/r/other/f.txt")).unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));

        let err = to_key(Path::new("/r/sub"), "", Path::new("/r/sub/../f.txt")).unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[test]
    fn test_to_key_root_itself() {
        let err = to_key(Path::new("/r"), "p/", Path::new("/r")).unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_to_key_rejects_non_utf8_names() {
        use std::os::unix::ffi::OsStrExt;

        let root = Path::new("/r");
        for name in [&b"a\xff"[..], &b"a\xfe"[..]] {
            let path = root.join("dir").join(OsStr::from_bytes(name));
            let err = to_key(root, "p/", &path).unwrap_err();
            assert!(matches!(err, Error::InvalidPath(ref m) if m.contains("UTF-8")));
        }

        let path = root.join(OsStr::from_bytes(b"d\xff")).join("f.txt");
        assert!(matches!(to_key(root, "", &path), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_to_local_path_nested() {
        let (dir, name) = to_local_path(Path::new("/dl"), "backup/", "backup/a/b/c.txt").unwrap();
        assert_eq!(dir, PathBuf::from("/dl/a/b"));
        assert_eq!(name, "c.txt");
    }

    #[test]
    fn test_to_local_path_top_level() {
        let (dir, name) = to_local_path(Path::new("/dl"), "backup/", "backup/c.txt").unwrap();
        assert_eq!(dir, PathBuf::from("/dl"));
        assert_eq!(name, "c.txt");
    }

    #[test]
    fn test_to_local_path_prefix_without_separator() {
        let (dir, name) = to_local_path(Path::new("/dl"), "backup", "backup/a/c.txt").unwrap();
        assert_eq!(dir, PathBuf::from("/dl/a"));
        assert_eq!(name, "c.txt");
    }

    #[test]
    fn test_to_local_path_mismatch() {
        let err = to_local_path(Path::new("/dl"), "backup/", "other/c.txt").unwrap_err();
        assert!(matches!(err, Error::KeyPrefixMismatch { .. }));
    }

    #[test]
    fn test_to_local_path_empty_name() {
        let err = to_local_path(Path::new("/dl"), "backup/", "backup/").unwrap_err();
        assert!(matches!(err, Error::EmptyObjectName(_)));

        let err = to_local_path(Path::new("/dl"), "backup/", "backup/folder/").unwrap_err();
        assert!(matches!(err, Error::EmptyObjectName(_)));
    }

    #[test]
    fn test_to_local_path_rejects_parent_segments() {
        let err = to_local_path(Path::new("/dl"), "", "a/../../etc/passwd").unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }

    #[test]
    fn test_round_trip() {
        let root = Path::new("/src/tree");
        let dest = Path::new("/dst");
        let cases = ["f.txt", "a/f.txt", "a/b/c/deep.tar.gz"];

        for prefix in ["", "p/", "nested/prefix/", "flat-"] {
            for rel in cases {
                let key = to_key(root, prefix, &root.join(rel)).unwrap();
                let (dir, name) = to_local_path(dest, prefix, &key).unwrap();

                let rel = Path::new(rel);
                let expected_dir = match rel.parent() {
                    Some(parent) => dest.join(parent),
                    None => dest.to_path_buf(),
                };
                assert_eq!(dir, expected_dir, "prefix {prefix:?}, rel {rel:?}");
                assert_eq!(name, rel.file_name().unwrap().to_string_lossy());
            }
        }
    }

    #[test]
    fn test_flat_key() {
        assert_eq!(flat_key(None, "a.txt"), "a.txt");
        assert_eq!(flat_key(Some(""), "a.txt"), "a.txt");
        assert_eq!(flat_key(Some("dest"), "a.txt"), "dest/a.txt");
        assert_eq!(flat_key(Some("dest/"), "a.txt"), "dest/a.txt");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("a/b/c.txt"), "c.txt");
        assert_eq!(base_name("c.txt"), "c.txt");
        assert_eq!(base_name("a/"), "");
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(None), "");
        assert_eq!(normalize_prefix(Some("/data/")), "data/");
        assert_eq!(normalize_prefix(Some("data")), "data");
    }

    #[test]
    fn test_pattern_prefix() {
        assert_eq!(pattern_prefix("logs/2024/*.gz"), "logs/2024/");
        assert_eq!(pattern_prefix("**/*"), "");
        assert_eq!(pattern_prefix("exact/key.txt"), "exact/key.txt");
        assert_eq!(pattern_prefix("img?.png"), "img");
    }
}
