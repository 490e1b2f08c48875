use super::entry::Entry;
use super::error::{IndexError, Result};
use super::header::Header;
use super::key::PathKey;
use fs2::FileExt;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// Removes the lockfile (and temp file, if still present) on drop unless
/// explicitly disarmed — the manual `finally`-equivalent the spec's §5
/// "clear on all exit paths including error paths" contract requires,
/// made robust to early `?`-returns.
struct CleanupGuard<'a> {
    lock_path: &'a Path,
    tmp_path: &'a Path,
    armed: bool,
}

impl<'a> CleanupGuard<'a> {
    fn new(lock_path: &'a Path, tmp_path: &'a Path) -> Self {
        Self {
            lock_path,
            tmp_path,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = std::fs::remove_file(self.lock_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("failed to remove index lock {:?}: {e}", self.lock_path);
            }
        }
        if let Err(e) = std::fs::remove_file(self.tmp_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("failed to remove index tmp file {:?}: {e}", self.tmp_path);
            }
        }
    }
}

pub struct IndexWriter;

impl IndexWriter {
    /// Emit header + entries + trailing digest into a locked temp file,
    /// then atomically swap it into place at `index_path`.
    ///
    /// Invariant (4): refuses to write if any entry is above stage 0
    /// (`IndexError::UnsupportedState`).
    pub fn write(
        index_path: &Path,
        lock_path: &Path,
        tmp_path: &Path,
        entries: &BTreeMap<PathKey, Entry>,
    ) -> Result<()> {
        check_write_ok(entries)?;

        let lock_file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    IndexError::IndexBusy
                } else {
                    IndexError::Io(e)
                }
            })?;
        let guard = CleanupGuard::new(lock_path, tmp_path);
        lock_file.try_lock_exclusive().map_err(|_| IndexError::IndexBusy)?;
        log::debug!("acquired index lock at {:?}", lock_path);

        let mut body = Vec::new();
        let header = Header {
            entry_count: entries.len() as u32,
        };
        header.write_to(&mut body)?;
        for entry in entries.values() {
            entry.write_to(&mut body)?;
        }

        let mut hasher = Sha1::new();
        hasher.update(&body);
        let digest = hasher.finalize();
        body.extend_from_slice(&digest);

        {
            let mut tmp_file = File::create(tmp_path)?;
            use std::io::Write;
            tmp_file.write_all(&body)?;
            tmp_file.sync_all()?;
            log::debug!("wrote {} bytes to {:?}", body.len(), tmp_path);
        }

        std::fs::rename(tmp_path, index_path)?;
        log::debug!("renamed {:?} -> {:?}", tmp_path, index_path);

        guard.disarm();
        let _ = std::fs::remove_file(lock_path);
        Ok(())
    }
}

/// Invariant (4): write requires all entries at stage 0.
fn check_write_ok(entries: &BTreeMap<PathKey, Entry>) -> Result<()> {
    for entry in entries.values() {
        let stage = entry.flags.stage()?;
        if !matches!(stage, super::entry::Stage::Merged) {
            return Err(IndexError::UnsupportedState {
                path: String::from_utf8_lossy(&entry.name).into_owned(),
                stage: stage.as_u8(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::entry::{Flags, Stage, MODE_REGULAR};

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
            object_id: [1u8; 20],
            flags: Flags::new(Stage::Merged, name.len()),
            name: name.as_bytes().to_vec(),
        }
    }

    #[test]
    fn writes_atomically_and_cleans_up_lock() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("index");
        let lock_path = dir.path().join("index.lock");
        let tmp_path = dir.path().join("index.tmp");

        let mut entries = BTreeMap::new();
        let e = sample_entry("a.txt");
        entries.insert(e.path_key(), e);

        IndexWriter::write(&index_path, &lock_path, &tmp_path, &entries).unwrap();

        assert!(index_path.exists());
        assert!(!lock_path.exists());
        assert!(!tmp_path.exists());
    }

    #[test]
    fn rejects_unmerged_stage() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("index");
        let lock_path = dir.path().join("index.lock");
        let tmp_path = dir.path().join("index.tmp");

        let mut conflicted = sample_entry("c.txt");
        conflicted.flags = Flags::new(Stage::Ours, "c.txt".len());
        let mut entries = BTreeMap::new();
        entries.insert(conflicted.path_key(), conflicted);

        let result = IndexWriter::write(&index_path, &lock_path, &tmp_path, &entries);
        assert!(matches!(result, Err(IndexError::UnsupportedState { .. })));
        assert!(!lock_path.exists());
    }

    #[test]
    fn refuses_to_write_while_locked() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("index");
        let lock_path = dir.path().join("index.lock");
        let tmp_path = dir.path().join("index.tmp");

        let _held = File::create(&lock_path).unwrap();

        let entries = BTreeMap::new();
        let result = IndexWriter::write(&index_path, &lock_path, &tmp_path, &entries);
        assert!(matches!(result, Err(IndexError::IndexBusy)));
    }
}
