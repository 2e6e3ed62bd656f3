//! Tree scanner: enumerates the candidate files under a root directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ScanError;

/// Recursively list `root`, depth first.
///
/// Directories are always listed (before their contents). Plain files are
/// listed only when their absolute path matches `filter`. A `root` that is
/// itself a file is returned on its own, regardless of `filter`.
///
/// Subtrees that cannot be read because of permissions are skipped silently.
/// Ordering follows the filesystem's listing order.
pub fn scan(root: &Path, filter: &Regex) -> Result<Vec<PathBuf>, ScanError> {
    let root = std::path::absolute(root).map_err(|source| ScanError::Resolve {
        path: root.to_path_buf(),
        source,
    })?;
    debug!(path = %root.display(), "Scanning directory tree");

    let metadata = std::fs::metadata(&root).map_err(|source| ScanError::Resolve {
        path: root.clone(),
        source,
    })?;
    if !metadata.is_dir() {
        return Ok(vec![root]);
    }

    let mut items = Vec::new();
    for entry in WalkDir::new(&root).min_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                if is_permission_denied(&err) {
                    debug!(path = ?err.path(), "Skipping unreadable entry");
                    continue;
                }
                if err.loop_ancestor().is_some() {
                    warn!(path = ?err.path(), "Skipping symlink loop");
                    continue;
                }
                if err.depth() == 0 {
                    return Err(ScanError::Walk {
                        path: root.clone(),
                        source: err,
                    });
                }
                // Dangling symlinks and entries that vanished mid-walk.
                if let Some(path) = err.path() {
                    if filter.is_match(&path.to_string_lossy()) {
                        warn!(file = %path.display(), error = %err, "Listing unresolvable entry");
                        items.push(path.to_path_buf());
                    } else {
                        debug!(file = %path.display(), error = %err, "Skipping unresolvable entry");
                    }
                }
                continue;
            }
        };

        let path = entry.into_path();
        if path.is_dir() {
            items.push(path);
            continue;
        }
        if !filter.is_match(&path.to_string_lossy()) {
            debug!(file = %path.display(), "Skipping file due to invalid file type");
            continue;
        }
        items.push(path);
    }
    Ok(items)
}

fn is_permission_denied(err: &walkdir::Error) -> bool {
    err.io_error()
        .map(|e| e.kind() == ErrorKind::PermissionDenied)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FILE_FILTER;
    use std::fs;
    use tempfile::tempdir;

    fn filter() -> Regex {
        Regex::new(DEFAULT_FILE_FILTER).unwrap()
    }

    #[test]
    fn lists_matching_files_and_every_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs/nested")).unwrap();
        fs::create_dir_all(root.join("images")).unwrap();
        fs::write(root.join("readme.md"), "# hi").unwrap();
        fs::write(root.join("docs/report.pdf"), "pdf").unwrap();
        fs::write(root.join("docs/nested/notes.txt"), "notes").unwrap();
        fs::write(root.join("images/logo.png"), "png").unwrap();

        let mut found = scan(root, &filter()).unwrap();
        found.sort();

        let mut expected = vec![
            root.join("docs"),
            root.join("docs/nested"),
            root.join("docs/nested/notes.txt"),
            root.join("docs/report.pdf"),
            root.join("images"),
            root.join("readme.md"),
        ];
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn directory_precedes_its_contents() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/c.md"), "c").unwrap();

        let found = scan(dir.path(), &filter()).unwrap();
        let pos = |p: PathBuf| found.iter().position(|f| *f == p).unwrap();
        assert!(pos(dir.path().join("a")) < pos(dir.path().join("a/b")));
        assert!(pos(dir.path().join("a/b")) < pos(dir.path().join("a/b/c.md")));
    }

    #[test]
    fn plain_file_root_is_returned_regardless_of_filter() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("photo.png");
        fs::write(&file, "png").unwrap();

        let found = scan(&file, &filter()).unwrap();
        assert_eq!(found, vec![file]);
    }

    #[test]
    fn filter_sees_the_absolute_path() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("keep")).unwrap();
        fs::write(dir.path().join("keep/a.bin"), "a").unwrap();
        fs::write(dir.path().join("b.bin"), "b").unwrap();

        let only_keep = Regex::new(r"/keep/[^/]+$").unwrap();
        let found = scan(dir.path(), &only_keep).unwrap();
        assert!(found.contains(&dir.path().join("keep/a.bin")));
        assert!(!found.contains(&dir.path().join("b.bin")));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_does_not_abort_the_scan() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("good.md"), "good").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.png"), dir.path().join("broken.png")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.pdf"), dir.path().join("broken.pdf")).unwrap();

        let mut found = scan(dir.path(), &filter()).unwrap();
        found.sort();
        assert_eq!(
            found,
            vec![dir.path().join("broken.pdf"), dir.path().join("good.md")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_listed_but_not_entered() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        let open = dir.path().join("open");
        fs::create_dir_all(&locked).unwrap();
        fs::create_dir_all(&open).unwrap();
        fs::write(locked.join("secret.md"), "s").unwrap();
        fs::write(open.join("public.md"), "p").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not restrict root.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = scan(dir.path(), &filter());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let found = result.unwrap();
        assert!(found.contains(&locked));
        assert!(!found.iter().any(|p| p.starts_with(&locked) && *p != locked));
        assert!(found.contains(&open.join("public.md")));
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let err = scan(&dir.path().join("absent"), &filter()).unwrap_err();
        assert!(matches!(err, ScanError::Resolve { .. }));
    }
}
