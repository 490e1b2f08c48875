use super::container::Index;
use super::entry::Entry;
use super::error::{IndexError, Result};
use crate::repo::Repository;
use std::path::Path;

/// Working-tree bridge (§4.G): `add`/`remove`/`checkout`/`isModified`
/// against the filesystem, layered over the plain container operations.
impl Index {
    /// Stage `abs_path` (must be inside `repo`'s working tree): if an
    /// entry already exists at this path, refresh it in place via
    /// `Entry::update` (so stat-cache/mode-flip semantics run); otherwise
    /// construct a new entry from the file (§4.D `add`).
    pub fn add_path(&mut self, repo: &Repository, abs_path: &Path) -> Result<()> {
        let relative = repo.strip_work_dir(abs_path).ok_or_else(|| IndexError::PathOutsideWorkdir {
            path: abs_path.to_path_buf(),
            workdir: repo.root().to_path_buf(),
        })?;
        let name = Repository::git_internal_slash(relative);

        if let Some(entry) = self.get_entry_mut(&name) {
            entry.update(repo, abs_path)?;
            self.content_changed = true;
            log::debug!("updated staged {:?}", String::from_utf8_lossy(&name));
            return Ok(());
        }

        let entry = Entry::from_file(repo, abs_path, &name)?;
        self.add(entry);
        log::debug!("staged {:?}", String::from_utf8_lossy(&name));
        Ok(())
    }

    /// Unstage the entry at `repo_relative_name`, returning whether it
    /// was present.
    pub fn remove_path(&mut self, repo_relative_name: &[u8]) -> bool {
        let removed = self.remove(repo_relative_name).is_some();
        if removed {
            log::debug!("unstaged {:?}", String::from_utf8_lossy(repo_relative_name));
        }
        removed
    }

    /// Restore every staged entry to the working tree under `repo`.
    pub fn checkout(&self, repo: &Repository) -> Result<()> {
        for entry in self.members() {
            self.checkout_entry(repo, entry)?;
        }
        Ok(())
    }

    /// Restore a single entry's content (and executable bit, when
    /// `core.filemode` applies) to its path in the working tree.
    pub fn checkout_entry(&self, repo: &Repository, entry: &Entry) -> Result<()> {
        let rel = String::from_utf8_lossy(&entry.name).into_owned();
        let abs_path = repo.root().join(rel);
        if let Some(parent) = abs_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = repo.open_blob(&entry.object_id)?;
        std::fs::write(&abs_path, data)?;

        if repo.filemode() && crate::fsutil::supports_execute() {
            crate::fsutil::set_execute(&abs_path, entry.mode == super::entry::MODE_EXECUTABLE)?;
        }

        log::debug!("checked out {:?}", abs_path);
        Ok(())
    }

    /// Whether the entry at `name` disagrees with the working tree.
    /// `force_content_check` controls whether an ambiguous timestamp
    /// match falls back to hashing the file (§4.B `isModified` step 9).
    pub fn is_modified(&self, repo: &Repository, name: &[u8], force_content_check: bool) -> Result<bool> {
        let entry = self
            .get_entry(name)
            .ok_or_else(|| IndexError::CorruptIndex(format!(
                "no such staged path: {:?}",
                String::from_utf8_lossy(name)
            )))?;
        let abs_path = repo.root().join(String::from_utf8_lossy(name).into_owned());
        entry.is_modified(repo, &abs_path, force_content_check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_checkout_round_trips_content() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let file_path = dir.path().join("a.txt");
        std::fs::write(&file_path, b"hello\n").unwrap();

        let mut index = Index::new();
        index.add_path(&repo, &file_path).unwrap();
        assert_eq!(index.len(), 1);

        std::fs::remove_file(&file_path).unwrap();
        index.checkout(&repo).unwrap();
        assert_eq!(std::fs::read(&file_path).unwrap(), b"hello\n");
    }

    #[test]
    fn add_path_outside_workdir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut index = Index::new();
        let outside = std::env::temp_dir().join("definitely-not-in-the-repo.txt");
        std::fs::write(&outside, b"x").unwrap();
        let result = index.add_path(&repo, &outside);
        assert!(matches!(result, Err(IndexError::PathOutsideWorkdir { .. })));
        let _ = std::fs::remove_file(&outside);
    }

    #[test]
    fn is_modified_detects_content_change() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let file_path = dir.path().join("a.txt");
        std::fs::write(&file_path, b"hello\n").unwrap();

        let mut index = Index::new();
        index.add_path(&repo, &file_path).unwrap();

        assert!(!index.is_modified(&repo, b"a.txt", true).unwrap());

        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::write(&file_path, b"goodbye\n").unwrap();
        assert!(index.is_modified(&repo, b"a.txt", true).unwrap());
    }

    #[test]
    fn add_path_routes_existing_entry_through_update() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let file_path = dir.path().join("a.txt");
        std::fs::write(&file_path, b"hello\n").unwrap();

        let mut index = Index::new();
        index.add_path(&repo, &file_path).unwrap();
        let original_id = index.get_entry(b"a.txt").unwrap().object_id;

        crate::fsutil::set_execute(&file_path, true).unwrap();
        index.add_path(&repo, &file_path).unwrap();

        assert_eq!(index.len(), 1);
        let updated = index.get_entry(b"a.txt").unwrap();
        assert_eq!(updated.object_id, original_id);
        assert_eq!(updated.mode, super::entry::MODE_EXECUTABLE);
    }
}
