//! Sealed archive format.
//!
//! A gzip-compressed tar stream built in memory. Entries are added in
//! sorted order so the same tree always yields the same entry sequence.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder, HeaderMode};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{Result, VaultError};

/// Archive the manifest paths below `root`.
///
/// Paths are relative to `root`. Missing paths are skipped, nested
/// duplicates collapse into their ancestor, and any entry whose first
/// component appears in `exclude` is left out. Symlinks are stored as links.
pub fn pack(root: &Path, manifest: &[String], exclude: &[&str]) -> Result<Vec<u8>> {
    let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    builder.mode(HeaderMode::Complete);
    builder.follow_symlinks(false);

    let mut entries = 0usize;
    for top in roots(manifest) {
        if is_excluded(&top, exclude) {
            trace!(path = %top.display(), "excluded from archive");
            continue;
        }
        let abs = root.join(&top);
        if fs::symlink_metadata(&abs).is_err() {
            debug!(path = %top.display(), "manifest path missing, skipped");
            continue;
        }

        for entry in WalkDir::new(&abs).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            let name = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| VaultError::InvalidEntry(entry.path().to_path_buf()))?;
            if is_excluded(name, exclude) {
                continue;
            }
            if entry.file_type().is_dir() {
                builder.append_dir(name, entry.path())?;
            } else {
                builder.append_path_with_name(entry.path(), name)?;
            }
            entries += 1;
        }
    }

    let bytes = builder.into_inner()?.finish()?;
    debug!(entries, bytes = bytes.len(), "archive packed");
    Ok(bytes)
}

/// Extract an archive produced by [`pack`] over `root`.
///
/// Existing files are overwritten; permissions and modification times are
/// restored. Returns the number of entries written.
///
/// # Errors
///
/// `VaultError::InvalidEntry` if an entry would land outside `root`.
pub fn unpack(root: &Path, bytes: &[u8]) -> Result<usize> {
    let mut archive = Archive::new(GzDecoder::new(bytes));
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_overwrite(true);

    let mut entries = 0usize;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        if !entry.unpack_in(root)? {
            return Err(VaultError::InvalidEntry(path).into());
        }
        entries += 1;
    }
    debug!(entries, root = %root.display(), "archive unpacked");
    Ok(entries)
}

/// Normalized manifest paths without entries already covered by an ancestor.
fn roots(manifest: &[String]) -> Vec<PathBuf> {
    let all: BTreeSet<PathBuf> = manifest
        .iter()
        .map(|p| normalize(p))
        .filter(|p| !p.as_os_str().is_empty())
        .collect();
    all.iter()
        .filter(|p| !p.ancestors().skip(1).any(|a| all.contains(a)))
        .cloned()
        .collect()
}

fn normalize(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect()
}

fn is_excluded(path: &Path, exclude: &[&str]) -> bool {
    match path.components().next() {
        Some(Component::Normal(first)) => exclude.iter().any(|e| first == *e),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manifest(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_pack_unpack_restores_tree() {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("group_vars")).unwrap();
        fs::write(src.path().join("group_vars/all"), "x: 1\n").unwrap();
        fs::write(src.path().join("hosts.yml"), "all: {}\n").unwrap();

        let bytes = pack(src.path(), &manifest(&["hosts.yml", "group_vars"]), &[]).unwrap();

        let dst = TempDir::new().unwrap();
        let count = unpack(dst.path(), &bytes).unwrap();
        assert_eq!(count, 3);
        assert_eq!(fs::read_to_string(dst.path().join("group_vars/all")).unwrap(), "x: 1\n");
        assert_eq!(fs::read_to_string(dst.path().join("hosts.yml")).unwrap(), "all: {}\n");
    }

    #[test]
    fn test_pack_is_deterministic() {
        let src = TempDir::new().unwrap();
        for name in ["b", "a", "c"] {
            fs::write(src.path().join(name), name).unwrap();
        }
        let first = pack(src.path(), &manifest(&["c", "a", "b"]), &[]).unwrap();
        let second = pack(src.path(), &manifest(&["a", "b", "c"]), &[]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_excluded_paths_are_skipped() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("deployment.key"), "secret").unwrap();
        fs::write(src.path().join("hosts.yml"), "").unwrap();

        let bytes = pack(
            src.path(),
            &manifest(&["deployment.key", "hosts.yml"]),
            &["deployment.key"],
        )
        .unwrap();

        let dst = TempDir::new().unwrap();
        unpack(dst.path(), &bytes).unwrap();
        assert!(dst.path().join("hosts.yml").exists());
        assert!(!dst.path().join("deployment.key").exists());
    }

    #[test]
    fn test_missing_paths_are_ignored() {
        let src = TempDir::new().unwrap();
        let bytes = pack(src.path(), &manifest(&["nope.yml"]), &[]).unwrap();
        let dst = TempDir::new().unwrap();
        assert_eq!(unpack(dst.path(), &bytes).unwrap(), 0);
    }

    #[test]
    fn test_nested_manifest_entries_collapse() {
        assert_eq!(
            roots(&manifest(&["host_vars/web1", "host_vars", "./hosts.yml"])),
            vec![PathBuf::from("host_vars"), PathBuf::from("hosts.yml")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions_survive() {
        use std::os::unix::fs::PermissionsExt;

        let src = TempDir::new().unwrap();
        let script = src.path().join("run.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).unwrap();

        let bytes = pack(src.path(), &manifest(&["run.sh"]), &[]).unwrap();
        let dst = TempDir::new().unwrap();
        unpack(dst.path(), &bytes).unwrap();

        let mode = fs::metadata(dst.path().join("run.sh")).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o750);
    }
}
