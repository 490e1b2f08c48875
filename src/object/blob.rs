use super::{ensure_objects_dir, object_path, ObjectId};
use crate::utils::{compress_data, decompress_data, sha1_bytes};
use std::fs;
use std::io;
use std::path::Path;

/// Create a blob object (`"blob <len>\0<data>"`, zlib-compressed) from
/// raw bytes and store it under `objects_dir`, returning its object id.
/// A no-op if the object already exists, matching loose-object storage
/// semantics elsewhere in the object database.
pub fn write_blob(objects_dir: &Path, data: &[u8]) -> io::Result<ObjectId> {
    let header = format!("blob {}\0", data.len());
    let mut store = Vec::with_capacity(header.len() + data.len());
    store.extend_from_slice(header.as_bytes());
    store.extend_from_slice(data);

    let id = sha1_bytes(&store);
    let path = object_path(objects_dir, &id);

    if !path.exists() {
        ensure_objects_dir(path.parent().unwrap())?;
        fs::write(&path, compress_data(&store)?)?;
    }

    Ok(id)
}

/// Read a blob's content back out, stripping the `"blob <len>\0"` header.
pub fn read_blob(objects_dir: &Path, id: &ObjectId) -> io::Result<Vec<u8>> {
    let path = object_path(objects_dir, id);
    let compressed = fs::read(&path)?;
    let content = decompress_data(&compressed)?;

    let null_pos = content
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "invalid blob object"))?;

    Ok(content[null_pos + 1..].to_vec())
}

/// Look up the uncompressed size of a stored blob without reading its
/// full content, for `Entry::from_tree_entry`'s size backfill. Returns
/// `None` on any I/O failure — the caller treats this as recoverable
/// and stores `size = -1`.
pub fn blob_size(objects_dir: &Path, id: &ObjectId) -> Option<i64> {
    read_blob(objects_dir, id).ok().map(|data| data.len() as i64)
}

/// The object id a blob with this content would have, without writing
/// anything — used by `isModified`'s content-level comparison.
pub fn compute_blob_sha1(data: &[u8]) -> ObjectId {
    let header = format!("blob {}\0", data.len());
    let mut store = Vec::with_capacity(header.len() + data.len());
    store.extend_from_slice(header.as_bytes());
    store.extend_from_slice(data);
    sha1_bytes(&store)
}
