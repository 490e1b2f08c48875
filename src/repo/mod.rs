//! The repository: the out-of-scope collaborator that owns the working
//! directory root, the loaded configuration, and the object database
//! location the index reads and writes through. Kept to exactly the
//! contract §6 lists — `open_blob`, `strip_work_dir`,
//! `git_internal_slash`, `on_index_changed` — plus the path helpers the
//! index's reader/writer need to find `index`, `index.lock`, `index.tmp`.

use crate::config::Config;
use crate::object::{self, ObjectId};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the metadata directory inside a working tree, analogous to
/// `.git`.
pub const REPO_DIR: &str = ".gitdex";

#[derive(Debug)]
pub struct Repository {
    /// Working-tree root (the directory containing `.gitdex`).
    root: PathBuf,
    pub config: Config,
}

impl Repository {
    /// Create `<root>/.gitdex/{objects,refs/heads}` and a default HEAD,
    /// matching the teacher's `init_repo` layout.
    pub fn init(root: &Path) -> io::Result<Self> {
        let dot = root.join(REPO_DIR);
        fs::create_dir_all(dot.join("objects"))?;
        fs::create_dir_all(dot.join("refs").join("heads"))?;
        let head_path = dot.join("HEAD");
        if !head_path.exists() {
            fs::write(head_path, "ref: refs/heads/master\n")?;
        }
        log::debug!("initialized repository at {:?}", root);
        Self::open(root)
    }

    /// Open an existing repository rooted at `root`, loading its config.
    pub fn open(root: &Path) -> io::Result<Self> {
        let dot = root.join(REPO_DIR);
        let config = Config::read(&dot)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dot_dir(&self) -> PathBuf {
        self.root.join(REPO_DIR)
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.dot_dir().join("objects")
    }

    pub fn index_path(&self) -> PathBuf {
        self.dot_dir().join("index")
    }

    pub fn index_lock_path(&self) -> PathBuf {
        self.dot_dir().join("index.lock")
    }

    pub fn index_tmp_path(&self) -> PathBuf {
        self.dot_dir().join("index.tmp")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.dot_dir()
    }

    /// Whether the executable bit should be tracked/compared at all.
    pub fn filemode(&self) -> bool {
        self.config.filemode()
    }

    /// Read a blob's content out of the object database.
    pub fn open_blob(&self, id: &ObjectId) -> io::Result<Vec<u8>> {
        object::read_blob(&self.objects_dir(), id)
    }

    /// Write `data` as a blob and return its object id.
    pub fn write_blob(&self, data: &[u8]) -> io::Result<ObjectId> {
        object::write_blob(&self.objects_dir(), data)
    }

    /// Strip the working-tree root off an absolute path, yielding the
    /// repo-relative path the index stores entries under. Returns `None`
    /// if `path` is not under this repository's root.
    pub fn strip_work_dir<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.root).ok()
    }

    /// Normalize a repo-relative path to the `/`-separated byte form the
    /// index keys on, regardless of the host path separator.
    pub fn git_internal_slash(path: &Path) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, component) in path.components().enumerate() {
            if i > 0 {
                out.push(b'/');
            }
            out.extend_from_slice(component.as_os_str().to_string_lossy().as_bytes());
        }
        out
    }

    /// Hook point called after every successful index write. A no-op
    /// today; grounds future cache invalidation without this crate
    /// needing to define what invalidates.
    pub fn on_index_changed(&self) {
        log::debug!("index changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(repo.objects_dir().exists());
        assert!(dir.path().join(REPO_DIR).join("refs").join("heads").exists());
        assert!(dir.path().join(REPO_DIR).join("HEAD").exists());
    }

    #[test]
    fn strip_work_dir_rejects_foreign_paths() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(repo.strip_work_dir(Path::new("/somewhere/else")).is_none());
        let inside = dir.path().join("src").join("main.rs");
        assert_eq!(
            repo.strip_work_dir(&inside).unwrap(),
            Path::new("src").join("main.rs")
        );
    }

    #[test]
    fn git_internal_slash_joins_components_with_forward_slash() {
        let path = Path::new("src").join("index").join("mod.rs");
        assert_eq!(Repository::git_internal_slash(&path), b"src/index/mod.rs");
    }
}
