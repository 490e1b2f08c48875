use super::entry::{Entry, Stage};
use super::key::PathKey;
use std::collections::BTreeMap;

/// The in-memory index: an ordered mapping from path to entry, plus the
/// dirty flags that track whether a reload or rewrite is owed.
#[derive(Debug, Default)]
pub struct Index {
    entries: BTreeMap<PathKey, Entry>,
    /// Set whenever an entry is added, removed, or updated in a way that
    /// requires a rewrite on the next `write()`.
    pub content_changed: bool,
    /// Set when only cached stat data (not content) has drifted — still
    /// worth a rewrite to keep future `isModified` checks cheap, but not
    /// a semantic change to what's staged.
    pub stat_dirty: bool,
    /// The on-disk mtime (ns) this container was last read at or written
    /// to, used by `reread_if_necessary`.
    pub(super) remembered_mtime_ns: Option<i64>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in path order.
    pub fn members(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn members_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.values_mut()
    }

    /// Look up an entry by its already-normalized key. Per §9's resolved
    /// open question, keys are normalized at insertion time
    /// (`Repository::git_internal_slash`), so this is a plain
    /// byte-equality lookup with no per-call normalization.
    pub fn get_entry(&self, name: &[u8]) -> Option<&Entry> {
        self.entries.get(&PathKey::new(name.to_vec()))
    }

    pub fn get_entry_mut(&mut self, name: &[u8]) -> Option<&mut Entry> {
        self.entries.get_mut(&PathKey::new(name.to_vec()))
    }

    /// Insert or replace the entry at this path, marking the container
    /// dirty. Invariant (1): at most one entry per name (stage 0 only,
    /// per this crate's narrower-than-spec write precondition).
    pub fn add(&mut self, entry: Entry) {
        self.entries.insert(entry.path_key(), entry);
        self.content_changed = true;
    }

    /// Remove the entry at `name`, returning it if present.
    pub fn remove(&mut self, name: &[u8]) -> Option<Entry> {
        let removed = self.entries.remove(&PathKey::new(name.to_vec()));
        if removed.is_some() {
            self.content_changed = true;
        }
        removed
    }

    /// All entries at a stage other than `Merged` — invariant (4) forbids
    /// writing while any of these are present.
    pub fn unmerged_paths(&self) -> Vec<&Entry> {
        self.entries
            .values()
            .filter(|e| !matches!(e.flags.stage(), Ok(Stage::Merged)))
            .collect()
    }

    pub(super) fn replace_all(&mut self, entries: BTreeMap<PathKey, Entry>) {
        self.entries = entries;
        self.content_changed = false;
        self.stat_dirty = false;
    }

    pub(super) fn entries(&self) -> &BTreeMap<PathKey, Entry> {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::entry::{Flags, MODE_REGULAR};

    fn sample_entry(name: &str) -> Entry {
        Entry {
            ctime_ns: 0,
            mtime_ns: 0,
            dev: -1,
            ino: -1,
            mode: MODE_REGULAR,
            uid: -1,
            gid: -1,
            size: 0,
            object_id: [0u8; 20],
            flags: Flags::new(Stage::Merged, name.len()),
            name: name.as_bytes().to_vec(),
        }
    }

    #[test]
    fn add_then_get_entry_round_trips() {
        let mut index = Index::new();
        index.add(sample_entry("a.txt"));
        assert!(index.content_changed);
        assert_eq!(index.get_entry(b"a.txt").unwrap().name, b"a.txt");
    }

    #[test]
    fn members_are_in_sorted_order() {
        let mut index = Index::new();
        for name in ["z", "a", "m"] {
            index.add(sample_entry(name));
        }
        let names: Vec<_> = index.members().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec![b"a".to_vec(), b"m".to_vec(), b"z".to_vec()]);
    }

    #[test]
    fn remove_clears_entry() {
        let mut index = Index::new();
        index.add(sample_entry("a.txt"));
        assert!(index.remove(b"a.txt").is_some());
        assert!(index.get_entry(b"a.txt").is_none());
    }

    #[test]
    fn unmerged_paths_detects_non_zero_stage() {
        let mut index = Index::new();
        let mut conflicted = sample_entry("c.txt");
        conflicted.flags = Flags::new(Stage::Ours, "c.txt".len());
        index.add(conflicted);
        assert_eq!(index.unmerged_paths().len(), 1);
    }
}
