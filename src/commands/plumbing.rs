//! The thin plumbing CLI surface the index needs to be exercised from a
//! shell: `init`, `hash-object`, `add`, `read-index`, `write-tree`,
//! `checkout --file`, `config`. Higher-level porcelain (branch/log/merge/
//! diff/status/gc/commit) is out of scope (§1) and was dropped in the
//! trim pass.

use crate::index::Index;
use crate::index::IndexError;
use crate::object;
use crate::repo::Repository;
use std::path::{Path, PathBuf};

pub fn cmd_init(root: &Path) -> Result<(), IndexError> {
    Repository::init(root)?;
    println!("Initialized empty repository in {:?}", root.join(crate::repo::REPO_DIR));
    Ok(())
}

pub fn cmd_hash_object(root: &Path, file: &Path, write: bool) -> Result<String, IndexError> {
    let repo = Repository::open(root)?;
    let data = std::fs::read(file)?;
    let id = if write {
        repo.write_blob(&data)?
    } else {
        object::compute_blob_sha1(&data)
    };
    Ok(hex::encode(id))
}

pub fn cmd_add(root: &Path, file: &Path) -> Result<(), IndexError> {
    let repo = Repository::open(root)?;
    let mut index = Index::read(&repo)?;
    let abs_path = if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    };
    index.add_path(&repo, &abs_path)?;
    index.write(&repo)?;
    Ok(())
}

pub fn cmd_read_index(root: &Path) -> Result<Vec<(String, String, u32)>, IndexError> {
    let repo = Repository::open(root)?;
    let index = Index::read(&repo)?;
    Ok(index
        .members()
        .map(|e| {
            (
                String::from_utf8_lossy(&e.name).into_owned(),
                hex::encode(e.object_id),
                e.mode,
            )
        })
        .collect())
}

pub fn cmd_write_tree(root: &Path) -> Result<String, IndexError> {
    let repo = Repository::open(root)?;
    let index = Index::read(&repo)?;
    let id = crate::index::tree_bridge::write_tree(&repo, &index)?;
    Ok(hex::encode(id))
}

pub fn cmd_checkout_file(root: &Path, name: &str) -> Result<(), IndexError> {
    let repo = Repository::open(root)?;
    let index = Index::read(&repo)?;
    let entry = index.get_entry(name.as_bytes()).ok_or_else(|| {
        IndexError::CorruptIndex(format!("no such staged path: {name:?}"))
    })?;
    index.checkout_entry(&repo, entry)
}

pub enum ConfigAction {
    Get,
    Set(String),
}

pub fn cmd_config(root: &Path, key: &str, action: ConfigAction) -> Result<Option<String>, IndexError> {
    let dir = root.join(crate::repo::REPO_DIR);
    match action {
        ConfigAction::Get => Ok(Some(crate::config::get_config(&dir, key)?)),
        ConfigAction::Set(value) => {
            crate::config::set_config(&dir, key, &value)?;
            Ok(None)
        }
    }
}

/// Resolve the repository root: the current directory, unless
/// overridden (used by the CLI entry point).
pub fn current_root() -> std::io::Result<PathBuf> {
    std::env::current_dir()
}
