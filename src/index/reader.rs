use super::entry::Entry;
use super::error::{IndexError, Result};
use super::header::Header;
use super::key::PathKey;
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// The parsed result of reading an on-disk index: the ordered entries
/// and the header's declared count (for sanity-checking against what
/// was actually parsed).
pub struct ParsedIndex {
    pub entries: BTreeMap<PathKey, Entry>,
}

/// Parse header, entries, and trailing digest out of `path`.
///
/// Per §4.E's partial-read safety (§9 open question), parsing happens
/// entirely into a scratch map; nothing about a previously loaded index
/// is touched here — the caller (`Index::read`) is responsible for the
/// swap only once this returns `Ok`.
pub struct IndexReader;

impl IndexReader {
    /// Verify the trailing SHA-1 digest against the parsed bytes
    /// (§4.E's strengthening over the teacher, §9's resolved open
    /// question). Returns `IndexError::CorruptIndex` on mismatch.
    pub fn read_checked(path: &Path) -> Result<ParsedIndex> {
        Self::read(path, true)
    }

    /// Skip digest verification, for recovery tooling that must inspect
    /// a possibly-corrupt file.
    pub fn read_unchecked(path: &Path) -> Result<ParsedIndex> {
        Self::read(path, false)
    }

    fn read(path: &Path, verify_digest: bool) -> Result<ParsedIndex> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut all_bytes = Vec::new();
        reader.read_to_end(&mut all_bytes)?;

        if all_bytes.len() < 20 {
            return Err(IndexError::CorruptIndex(
                "file too short to contain a trailing digest".into(),
            ));
        }
        let (body, digest) = all_bytes.split_at(all_bytes.len() - 20);

        if verify_digest {
            let mut hasher = Sha1::new();
            hasher.update(body);
            let computed = hasher.finalize();
            if computed.as_slice() != digest {
                return Err(IndexError::CorruptIndex(
                    "trailing digest does not match file contents".into(),
                ));
            }
        }

        let mut cursor = std::io::Cursor::new(body);
        let header = Header::read_from(&mut cursor)?;

        let mut entries = BTreeMap::new();
        for _ in 0..header.entry_count {
            let entry = Entry::read_from(&mut cursor)?;
            entries.insert(entry.path_key(), entry);
        }

        if entries.len() != header.entry_count as usize {
            return Err(IndexError::CorruptIndex(format!(
                "header declared {} entries but {} unique paths were parsed",
                header.entry_count,
                entries.len()
            )));
        }

        log::debug!("read {} index entries from {:?}", entries.len(), path);
        Ok(ParsedIndex { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::entry::{Flags, Stage, MODE_REGULAR};
    use crate::index::writer::IndexWriter;

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
            object_id: [3u8; 20],
            flags: Flags::new(Stage::Merged, name.len()),
            name: name.as_bytes().to_vec(),
        }
    }

    #[test]
    fn round_trips_through_writer() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("index");
        let lock_path = dir.path().join("index.lock");
        let tmp_path = dir.path().join("index.tmp");

        let mut entries = BTreeMap::new();
        let e = sample_entry("a.txt");
        entries.insert(e.path_key(), e);

        IndexWriter::write(&index_path, &lock_path, &tmp_path, &entries).unwrap();

        let parsed = IndexReader::read_checked(&index_path).unwrap();
        assert_eq!(parsed.entries.len(), 1);
    }

    #[test]
    fn corrupted_digest_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("index");
        let lock_path = dir.path().join("index.lock");
        let tmp_path = dir.path().join("index.tmp");

        let entries = BTreeMap::new();
        IndexWriter::write(&index_path, &lock_path, &tmp_path, &entries).unwrap();

        let mut bytes = std::fs::read(&index_path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&index_path, bytes).unwrap();

        assert!(IndexReader::read_checked(&index_path).is_err());
        // Unchecked reads still succeed since there are no entries to parse.
        assert!(IndexReader::read_unchecked(&index_path).is_ok());
    }

    #[test]
    fn rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("index");
        std::fs::write(&index_path, b"short").unwrap();
        assert!(IndexReader::read_checked(&index_path).is_err());
    }
}
