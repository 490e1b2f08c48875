//! The object database: the out-of-scope collaborator the index reads
//! blob sizes from and writes blobs/trees through. Kept to exactly the
//! contract the index needs — `write_blob`, `read_blob`, `blob_size`,
//! and tree (de)serialization — nothing about commits, refs, or packing.

pub mod blob;
pub mod tree;

pub use blob::{blob_size, compute_blob_sha1, read_blob, write_blob};
pub use tree::{read_tree_object, write_tree_object, RawTreeEntry};

use std::io;
use std::path::{Path, PathBuf};

/// Object id: a raw 20-byte SHA-1 digest.
pub type ObjectId = [u8; 20];

/// Loose-object storage layout shared by blobs and trees:
/// `<repo>/objects/<first two hex chars>/<remaining 38 hex chars>`.
pub(crate) fn object_path(objects_dir: &Path, id: &ObjectId) -> PathBuf {
    let hex = hex::encode(id);
    objects_dir.join(&hex[..2]).join(&hex[2..])
}

pub(crate) fn ensure_objects_dir(objects_dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(objects_dir)
}
