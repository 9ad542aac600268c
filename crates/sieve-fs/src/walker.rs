use std::fs::{self, Metadata};
use std::path::Path;

use sieve_core::SieveResult;

use crate::entry::Entry;
use crate::snapshot::Snapshot;

#[cfg(unix)]
fn mode_of(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn mode_of(meta: &Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

fn mtime_ms(meta: &Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Recursive depth-first traversal of `dir`, in lexicographic order.
///
/// Symbolic links are stat'd through to their target (so content
/// changes behind a symlink are detected) but are never recursed into:
/// a symlinked directory is represented as a single leaf entry at its
/// own path, matching the "remain represented at their original path"
/// rule — this also sidesteps symlink cycles.
pub fn walk(dir: &Path) -> SieveResult<Snapshot<Entry>> {
    let mut out = Vec::new();
    walk_into(dir, "", &mut out)?;
    Ok(Snapshot::from_entries(out))
}

fn walk_into(base: &Path, rel: &str, out: &mut Vec<Entry>) -> SieveResult<()> {
    let dir_path = if rel.is_empty() {
        base.to_path_buf()
    } else {
        base.join(rel)
    };

    let mut children: Vec<_> = fs::read_dir(&dir_path)?.collect::<std::io::Result<Vec<_>>>()?;
    children.sort_by_key(|e| e.file_name());

    for child in children {
        let file_type = child.file_type()?;
        let name = child.file_name().to_string_lossy().into_owned();
        let child_rel = if rel.is_empty() {
            name
        } else {
            format!("{rel}/{name}")
        };

        if file_type.is_symlink() {
            let meta = fs::metadata(child.path())?;
            out.push(Entry {
                relative_path: child_rel,
                size: meta.len(),
                mtime: mtime_ms(&meta),
                mode: mode_of(&meta),
            });
        } else if file_type.is_dir() {
            let meta = child.metadata()?;
            out.push(Entry {
                relative_path: format!("{child_rel}/"),
                size: 0,
                mtime: mtime_ms(&meta),
                mode: mode_of(&meta),
            });
            walk_into(base, &child_rel, out)?;
        } else {
            let meta = child.metadata()?;
            out.push(Entry {
                relative_path: child_rel,
                size: meta.len(),
                mtime: mtime_ms(&meta),
                mode: mode_of(&meta),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, write};

    #[test]
    fn walk_orders_parent_before_children() {
        let dir = tempfile::tempdir().unwrap();
        create_dir_all(dir.path().join("a/bar")).unwrap();
        write(dir.path().join("a/foo.js"), b"x").unwrap();
        write(dir.path().join("a/bar/bar.js"), b"y").unwrap();

        let snap = walk(dir.path()).unwrap();
        let paths: Vec<&str> = snap.entries().iter().map(|e| e.relative_path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["a/", "a/bar/", "a/bar/bar.js", "a/foo.js"]
        );
    }
}
