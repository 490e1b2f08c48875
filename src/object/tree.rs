use super::{ensure_objects_dir, object_path, ObjectId};
use crate::utils::{compress_data, decompress_data, sha1_bytes};
use std::fs;
use std::io;
use std::path::Path;

/// One row of a tree object: a single path component (no `/`), its mode,
/// and the id of the blob or subtree it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTreeEntry {
    pub mode: u32,
    pub name: Vec<u8>,
    pub id: ObjectId,
}

const TREE_MODE: u32 = 0o040000;

/// Canonical tree-entry ordering: byte-lexicographic, but a tree entry's
/// name compares as though it had a trailing `/` — the same rule real
/// git uses so two implementations building the same directory always
/// produce the same tree object id.
fn canonical_cmp(a: &RawTreeEntry, b: &RawTreeEntry) -> std::cmp::Ordering {
    let mut an = a.name.clone();
    if a.mode == TREE_MODE {
        an.push(b'/');
    }
    let mut bn = b.name.clone();
    if b.mode == TREE_MODE {
        bn.push(b'/');
    }
    an.cmp(&bn)
}

/// Serialize `entries` into a `"tree <size>\0<rows>"` object, write it to
/// the object database (a no-op if already present), and return its id.
pub fn write_tree_object(objects_dir: &Path, entries: &[RawTreeEntry]) -> io::Result<ObjectId> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(canonical_cmp);

    let mut content = Vec::new();
    for entry in &sorted {
        content.extend_from_slice(format!("{:o} ", entry.mode).as_bytes());
        content.extend_from_slice(&entry.name);
        content.push(0);
        content.extend_from_slice(&entry.id);
    }

    let header = format!("tree {}\0", content.len());
    let mut full = header.into_bytes();
    full.extend_from_slice(&content);

    let id = sha1_bytes(&full);
    let path = object_path(objects_dir, &id);

    if !path.exists() {
        ensure_objects_dir(path.parent().unwrap())?;
        fs::write(&path, compress_data(&full)?)?;
    }

    Ok(id)
}

/// Parse a stored tree object back into its rows.
pub fn read_tree_object(objects_dir: &Path, id: &ObjectId) -> io::Result<Vec<RawTreeEntry>> {
    let path = object_path(objects_dir, id);
    let compressed = fs::read(&path)?;
    let data = decompress_data(&compressed)?;

    let header_end = data
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "invalid tree object"))?;
    let header = String::from_utf8_lossy(&data[..header_end]);
    if !header.starts_with("tree ") {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "not a tree object"));
    }

    let mut entries = Vec::new();
    let mut offset = header_end + 1;

    while offset < data.len() {
        let space_pos = data[offset..]
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed tree entry"))?;
        let mode = u32::from_str_radix(
            std::str::from_utf8(&data[offset..offset + space_pos])
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "malformed tree mode"))?,
            8,
        )
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "malformed tree mode"))?;
        offset += space_pos + 1;

        let nul_pos = data[offset..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "malformed tree entry name"))?;
        let name = data[offset..offset + nul_pos].to_vec();
        offset += nul_pos + 1;

        if offset + 20 > data.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "truncated tree entry id",
            ));
        }
        let mut id = [0u8; 20];
        id.copy_from_slice(&data[offset..offset + 20]);
        offset += 20;

        entries.push(RawTreeEntry { mode, name, id });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let objects_dir = dir.path().join("objects");
        let entries = vec![
            RawTreeEntry {
                mode: 0o100644,
                name: b"a.txt".to_vec(),
                id: [1u8; 20],
            },
            RawTreeEntry {
                mode: TREE_MODE,
                name: b"sub".to_vec(),
                id: [2u8; 20],
            },
        ];
        let id = write_tree_object(&objects_dir, &entries).unwrap();
        let parsed = read_tree_object(&objects_dir, &id).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed.iter().any(|e| e.name == b"a.txt"));
        assert!(parsed.iter().any(|e| e.name == b"sub" && e.mode == TREE_MODE));
    }

    #[test]
    fn directories_sort_as_if_slash_terminated() {
        // "b.txt" (file) must sort before "b" (directory), because '.'
        // (0x2e) < '/' (0x2f) under the canonical comparator.
        let mut entries = vec![
            RawTreeEntry {
                mode: TREE_MODE,
                name: b"b".to_vec(),
                id: [2u8; 20],
            },
            RawTreeEntry {
                mode: 0o100644,
                name: b"b.txt".to_vec(),
                id: [1u8; 20],
            },
        ];
        entries.sort_by(canonical_cmp);
        assert_eq!(entries[0].name, b"b.txt");
        assert_eq!(entries[1].name, b"b");
    }

    #[test]
    fn empty_tree_has_stable_id() {
        let dir = tempfile::tempdir().unwrap();
        let objects_dir = dir.path().join("objects");
        let id = write_tree_object(&objects_dir, &[]).unwrap();
        // sha1("tree 0\0")
        assert_eq!(hex::encode(id), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }
}
