use std::cmp::Ordering;

use crate::entry::TreeItem;
use crate::snapshot::Snapshot;

/// The five filesystem operations a patch can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Mkdir,
    Rmdir,
    Unlink,
    Create,
    Change,
}

/// One step of a `Patch`. `entry` is the destination state for
/// `Mkdir`/`Create`/`Change`, and absent for `Unlink`/`Rmdir`.
#[derive(Debug, Clone)]
pub struct PatchOp<E> {
    pub op: Op,
    pub relative_path: String,
    pub entry: Option<E>,
}

pub type Patch<E> = Vec<PatchOp<E>>;

/// Deduplicate a patch by `(op, relative_path)`, keeping the first
/// occurrence — used by the engine when appending invalidation patches
/// to a tree diff.
pub fn dedup_patch<E>(patch: Patch<E>) -> Patch<E> {
    let mut seen = std::collections::HashSet::new();
    patch
        .into_iter()
        .filter(|p| seen.insert((p.op, p.relative_path.clone())))
        .collect()
}

/// Diff two snapshots into an ordered patch.
///
/// Additions (`mkdir`/`create`) are emitted in ascending lexicographic
/// order, so a directory's `mkdir` always precedes its children's
/// `create`/`mkdir`. Removals (`rmdir`/`unlink`) are emitted in
/// descending order, so a directory's `rmdir` always follows its
/// children's removal — both are required for the patch to be a valid
/// sequence of filesystem operations when replayed in order.
pub fn diff<E: TreeItem>(prev: &Snapshot<E>, next: &Snapshot<E>) -> Patch<E> {
    let prev_entries = prev.entries();
    let next_entries = next.entries();

    let mut additions = Vec::new();
    let mut changes = Vec::new();
    let mut removals = Vec::new();

    let mut i = 0;
    let mut j = 0;
    while i < prev_entries.len() || j < next_entries.len() {
        match (prev_entries.get(i), next_entries.get(j)) {
            (Some(pe), Some(ne)) => match pe.relative_path().cmp(ne.relative_path()) {
                Ordering::Equal => {
                    if pe.differs_from(ne) {
                        changes.push(change_op(ne));
                    }
                    i += 1;
                    j += 1;
                }
                Ordering::Less => {
                    removals.push(remove_op(pe));
                    i += 1;
                }
                Ordering::Greater => {
                    additions.push(add_op(ne));
                    j += 1;
                }
            },
            (Some(pe), None) => {
                removals.push(remove_op(pe));
                i += 1;
            }
            (None, Some(ne)) => {
                additions.push(add_op(ne));
                j += 1;
            }
            (None, None) => unreachable!(),
        }
    }

    removals.reverse();

    let mut patch = additions;
    patch.extend(changes);
    patch.extend(removals);
    patch
}

fn add_op<E: TreeItem>(entry: &E) -> PatchOp<E> {
    PatchOp {
        op: if entry.is_directory() { Op::Mkdir } else { Op::Create },
        relative_path: entry.relative_path().to_string(),
        entry: Some(entry.clone()),
    }
}

fn change_op<E: TreeItem>(entry: &E) -> PatchOp<E> {
    PatchOp {
        op: Op::Change,
        relative_path: entry.relative_path().to_string(),
        entry: Some(entry.clone()),
    }
}

fn remove_op<E: TreeItem>(entry: &E) -> PatchOp<E> {
    PatchOp {
        op: if entry.is_directory() { Op::Rmdir } else { Op::Unlink },
        relative_path: entry.relative_path().to_string(),
        entry: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;

    fn entry(path: &str, size: u64, mtime: i64) -> Entry {
        Entry {
            relative_path: path.to_string(),
            size,
            mtime,
            mode: 0o644,
        }
    }

    #[test]
    fn create_and_change_and_unlink() {
        let prev = Snapshot::from_entries(vec![entry("a.js", 1, 1), entry("b.js", 1, 1)]);
        let next = Snapshot::from_entries(vec![entry("a.js", 2, 2), entry("c.js", 1, 1)]);

        let patch = diff(&prev, &next);
        let ops: Vec<(Op, &str)> = patch.iter().map(|p| (p.op, p.relative_path.as_str())).collect();

        assert_eq!(ops, vec![(Op::Create, "c.js"), (Op::Change, "a.js"), (Op::Unlink, "b.js")]);
    }

    #[test]
    fn rmdir_follows_children_unlink() {
        let prev = Snapshot::from_entries(vec![
            Entry { relative_path: "a/".into(), size: 0, mtime: 0, mode: 0o755 },
            entry("a/b.js", 1, 1),
        ]);
        let next = Snapshot::<Entry>::empty();

        let patch = diff(&prev, &next);
        let ops: Vec<(Op, &str)> = patch.iter().map(|p| (p.op, p.relative_path.as_str())).collect();
        assert_eq!(ops, vec![(Op::Unlink, "a/b.js"), (Op::Rmdir, "a/")]);
    }

    #[test]
    fn no_changes_yields_empty_patch() {
        let snap = Snapshot::from_entries(vec![entry("a.js", 1, 1)]);
        assert!(diff(&snap, &snap).is_empty());
    }
}
