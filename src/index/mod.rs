//! The staging index: an ordered mapping from path to entry that
//! mediates between the working tree and the object database.

pub mod container;
pub mod entry;
pub mod error;
pub mod header;
pub mod key;
pub mod reader;
pub mod tree_bridge;
pub mod worktree;
pub mod writer;

pub use container::Index;
pub use entry::{Entry, Flags, Stage};
pub use error::{IndexError, Result};
pub use key::PathKey;

use crate::repo::Repository;
use reader::IndexReader;
use writer::IndexWriter;

impl Index {
    /// Load the index from `<repo>/index`. An index file that doesn't
    /// exist yet reads as empty, matching a freshly initialized
    /// repository. §4.E's partial-read safety: a parse failure never
    /// touches the container the caller already has — this always
    /// either returns a fully-populated new `Index` or an error.
    pub fn read(repo: &Repository) -> Result<Self> {
        let path = repo.index_path();
        if !path.exists() {
            return Ok(Index::new());
        }

        let parsed = IndexReader::read_checked(&path)?;
        let mut index = Index::new();
        index.replace_all(parsed.entries);
        Ok(index)
    }

    /// Reload from disk only if the on-disk file's mtime has moved past
    /// what this container last saw — otherwise a no-op. Idempotent.
    pub fn reread_if_necessary(&mut self, repo: &Repository) -> Result<()> {
        let path = repo.index_path();
        let on_disk_mtime_ns = match std::fs::metadata(&path) {
            Ok(metadata) => Some(mtime_ns(&metadata)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        if on_disk_mtime_ns == self.remembered_mtime_ns {
            return Ok(());
        }

        let reloaded = Index::read(repo)?;
        *self = reloaded;
        self.remembered_mtime_ns = on_disk_mtime_ns;
        repo.on_index_changed();
        Ok(())
    }

    /// Serialize and atomically persist this index to `<repo>/index`,
    /// then notify `repo.on_index_changed()`.
    pub fn write(&mut self, repo: &Repository) -> Result<()> {
        IndexWriter::write(
            &repo.index_path(),
            &repo.index_lock_path(),
            &repo.index_tmp_path(),
            self.entries(),
        )?;
        repo.on_index_changed();

        if let Ok(metadata) = std::fs::metadata(repo.index_path()) {
            self.remembered_mtime_ns = Some(mtime_ns(&metadata));
        }
        self.content_changed = false;
        self.stat_dirty = false;
        Ok(())
    }
}

#[cfg(unix)]
fn mtime_ns(metadata: &std::fs::Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    metadata.mtime() * 1_000_000_000 + metadata.mtime_nsec()
}

#[cfg(not(unix))]
fn mtime_ns(_metadata: &std::fs::Metadata) -> i64 {
    0
}
