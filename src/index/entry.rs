use super::error::{IndexError, Result};
use super::key::PathKey;
use crate::object::ObjectId;
use crate::repo::Repository;
use std::io::{self, Read, Write};
use std::path::Path;

/// Fixed-size portion of a serialized entry, before the variable-length
/// name: 2×(ctime secs, ctime ns) + 2×(mtime secs, mtime ns) + dev + ino
/// + mode + uid + gid + size + 20-byte id + 2-byte flags, all i32/u32
/// except the id (20 bytes) and flags (2 bytes): 10×4 + 20 + 2 = 62.
pub const ENTRY_PREFIX_LEN: usize = 62;

/// Total on-disk length of an entry with a name of `name_len` bytes,
/// including the NUL terminator and zero padding to the next 8-byte
/// boundary (at least one padding byte beyond the terminator).
pub fn padded_entry_len(name_len: usize) -> usize {
    (ENTRY_PREFIX_LEN + name_len + 8) & !7
}

/// `flags` bit layout (§3 Original): bit15 assume-valid, bit14
/// update-needed, bits13-12 stage, bits11-0 name length (0xFFF sentinel
/// for names ≥ 4095 bytes).
const ASSUME_VALID_BIT: u16 = 0x8000;
const UPDATE_NEEDED_BIT: u16 = 0x4000;
const STAGE_SHIFT: u16 = 12;
const STAGE_MASK: u16 = 0x3000;
const NAME_LEN_MASK: u16 = 0x0FFF;
pub const NAME_LEN_SENTINEL: u16 = 0x0FFF;

pub const MODE_REGULAR: u32 = 0o100644;
pub const MODE_EXECUTABLE: u32 = 0o100755;
pub const MODE_SYMLINK: u32 = 0o120000;
pub const MODE_GITLINK: u32 = 0o040000;

/// A stage in the three-way merge state machine a path can occupy.
/// Stage 0 (`Merged`) is the only stage this crate's writer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Merged = 0,
    Base = 1,
    Ours = 2,
    Theirs = 3,
}

impl Stage {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(n: u8) -> Result<Self> {
        match n {
            0 => Ok(Stage::Merged),
            1 => Ok(Stage::Base),
            2 => Ok(Stage::Ours),
            3 => Ok(Stage::Theirs),
            other => Err(IndexError::CorruptIndex(format!("invalid stage {other}"))),
        }
    }
}

/// Typed wrapper over the on-disk `flags` field. Never exposes raw bit
/// arithmetic to callers outside this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags(u16);

impl Flags {
    pub fn new(stage: Stage, name_len: usize) -> Self {
        let len_bits = (name_len.min(NAME_LEN_SENTINEL as usize)) as u16;
        Flags(((stage.as_u8() as u16) << STAGE_SHIFT) | len_bits)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn from_raw(raw: u16) -> Self {
        Flags(raw)
    }

    pub fn assume_valid(self) -> bool {
        self.0 & ASSUME_VALID_BIT != 0
    }

    pub fn set_assume_valid(&mut self, value: bool) {
        if value {
            self.0 |= ASSUME_VALID_BIT;
        } else {
            self.0 &= !ASSUME_VALID_BIT;
        }
    }

    pub fn update_needed(self) -> bool {
        self.0 & UPDATE_NEEDED_BIT != 0
    }

    pub fn set_update_needed(&mut self, value: bool) {
        if value {
            self.0 |= UPDATE_NEEDED_BIT;
        } else {
            self.0 &= !UPDATE_NEEDED_BIT;
        }
    }

    pub fn stage(self) -> Result<Stage> {
        Stage::from_u8(((self.0 & STAGE_MASK) >> STAGE_SHIFT) as u8)
    }

    pub fn name_len(self) -> u16 {
        self.0 & NAME_LEN_MASK
    }
}

/// One row of the index: a path, its mode, cached stat metadata, an
/// object id, and merge-stage/validity flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub ctime_ns: i64,
    pub mtime_ns: i64,
    pub dev: i32,
    pub ino: i32,
    pub mode: u32,
    pub uid: i32,
    pub gid: i32,
    pub size: i32,
    pub object_id: ObjectId,
    pub flags: Flags,
    pub name: Vec<u8>,
}

impl Entry {
    pub fn path_key(&self) -> PathKey {
        PathKey::new(self.name.clone())
    }

    /// Build an entry from a working-tree file: stats the file, writes
    /// its content as a blob, and fills in mode from the executable bit
    /// (when the platform and `core.filemode` both support it).
    pub fn from_file(repo: &Repository, abs_path: &Path, repo_relative: &[u8]) -> Result<Self> {
        let metadata = std::fs::symlink_metadata(abs_path)?;
        let data = std::fs::read(abs_path)?;
        let object_id = repo.write_blob(&data)?;

        let mode = if metadata.file_type().is_symlink() {
            MODE_SYMLINK
        } else if repo.filemode() && crate::fsutil::supports_execute() && crate::fsutil::can_execute(abs_path)? {
            MODE_EXECUTABLE
        } else {
            MODE_REGULAR
        };

        let (ctime_ns, mtime_ns, dev, ino, uid, gid) = stat_fields(&metadata);

        Ok(Entry {
            ctime_ns,
            mtime_ns,
            dev,
            ino,
            mode,
            uid,
            gid,
            size: data.len().min(i32::MAX as usize) as i32,
            object_id,
            flags: Flags::new(Stage::Merged, repo_relative.len()),
            name: repo_relative.to_vec(),
        })
    }

    /// Build an entry from a tree entry read out of the object database
    /// (`readTree`, §4.H). Stat fields are zeroed since there is no
    /// working-tree file backing it yet; `size` is backfilled from the
    /// object database when available, `-1` otherwise.
    pub fn from_tree_entry(
        repo: &Repository,
        name: Vec<u8>,
        mode: u32,
        object_id: ObjectId,
    ) -> Self {
        let size = crate::object::blob_size(&repo.objects_dir(), &object_id)
            .map(|n| n.min(i32::MAX as i64) as i32)
            .unwrap_or_else(|| {
                log::warn!("blob size lookup failed for entry {:?}", String::from_utf8_lossy(&name));
                -1
            });

        Entry {
            ctime_ns: 0,
            mtime_ns: 0,
            dev: -1,
            ino: -1,
            mode,
            uid: -1,
            gid: -1,
            size,
            object_id,
            flags: Flags::new(Stage::Merged, name.len()),
            name,
        }
    }

    /// Refresh this entry against the current state of `abs_path`
    /// (§4.B `update(file)`): re-stats mtime/size, flips `mode` to
    /// executable when `core.filemode` is on and the on-disk bit
    /// disagrees, and — if any of that indicates a change — re-hashes
    /// the file and updates `size`/`object_id`. Returns whether the
    /// entry's content-level state changed (object id differed, per
    /// §9's compare-before-assign resolution, or the mode flipped).
    pub fn update(&mut self, repo: &Repository, abs_path: &Path) -> Result<bool> {
        let metadata = std::fs::symlink_metadata(abs_path)?;
        let (_, file_mtime_ns, _, _, _, _) = stat_fields(&metadata);

        let mut modified = file_mtime_ns != self.mtime_ns;
        self.mtime_ns = file_mtime_ns;

        if metadata.len() as i64 != self.size as i64 {
            modified = true;
        }

        let mut mode_changed = false;
        if repo.filemode() && crate::fsutil::supports_execute() {
            let is_exec = crate::fsutil::can_execute(abs_path)?;
            let was_exec = self.mode == MODE_EXECUTABLE;
            if is_exec != was_exec {
                self.mode = if is_exec { MODE_EXECUTABLE } else { MODE_REGULAR };
                modified = true;
                mode_changed = true;
            }
        }

        if !modified {
            return Ok(false);
        }

        let data = std::fs::read(abs_path)?;
        let new_id = repo.write_blob(&data)?;
        self.size = data.len().min(i32::MAX as usize) as i32;
        let id_changed = new_id != self.object_id;
        self.object_id = new_id;

        Ok(id_changed || mode_changed)
    }

    /// Predicate used to detect working-tree divergence (§4.B
    /// `isModified`), implemented as the full 9-step algorithm:
    /// assume-valid and update-needed short-circuit first, then file
    /// presence, mode-specific checks (executable bit / conservative
    /// true for symlinks and unrecognized modes / gitlink directory
    /// presence), size, and finally a timestamp comparison that falls
    /// back to content hashing only when `force_content_check` is set.
    pub fn is_modified(
        &self,
        repo: &Repository,
        abs_path: &Path,
        force_content_check: bool,
    ) -> Result<bool> {
        // 1
        if self.flags.assume_valid() {
            return Ok(false);
        }
        // 2
        if self.flags.update_needed() {
            return Ok(true);
        }

        // 3
        let metadata = match std::fs::symlink_metadata(abs_path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };

        match self.mode {
            // 4: regular (or executable) file — compare the exec bit
            // when it's tracked at all.
            MODE_REGULAR | MODE_EXECUTABLE => {
                if repo.filemode() && crate::fsutil::supports_execute() {
                    let is_exec = crate::fsutil::can_execute(abs_path)?;
                    let was_exec = self.mode == MODE_EXECUTABLE;
                    if is_exec != was_exec {
                        return Ok(true);
                    }
                }
            }
            // 6: gitlink/tree — modified iff the target directory is gone.
            MODE_GITLINK => {
                return Ok(!abs_path.is_dir());
            }
            // 5: symlink or any unrecognized mode — conservative true.
            _ => return Ok(true),
        }

        // 7
        if metadata.len() as i64 != self.size as i64 {
            return Ok(true);
        }

        // 8: some platforms only resolve mtimes to whole seconds; when
        // this entry's stored mtime is itself second-granular, round
        // the filesystem's timestamp the same way before comparing.
        let (_, file_mtime_ns, _, _, _, _) = stat_fields(&metadata);
        let file_mtime_ns = if self.mtime_ns % 1_000_000_000 == 0 {
            (file_mtime_ns / 1_000_000_000) * 1_000_000_000
        } else {
            file_mtime_ns
        };

        // 9
        if file_mtime_ns == self.mtime_ns {
            return Ok(false);
        }
        if !force_content_check {
            return Ok(true);
        }
        let data = std::fs::read(abs_path)?;
        let current_id = crate::object::compute_blob_sha1(&data);
        Ok(current_id != self.object_id)
    }

    /// Serialize this entry's fixed-size prefix, name, and zero padding.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let ctime_secs = (self.ctime_ns / 1_000_000_000) as i32;
        let ctime_nanos = (self.ctime_ns % 1_000_000_000) as i32;
        let mtime_secs = (self.mtime_ns / 1_000_000_000) as i32;
        let mtime_nanos = (self.mtime_ns % 1_000_000_000) as i32;

        out.write_all(&ctime_secs.to_be_bytes())?;
        out.write_all(&ctime_nanos.to_be_bytes())?;
        out.write_all(&mtime_secs.to_be_bytes())?;
        out.write_all(&mtime_nanos.to_be_bytes())?;
        out.write_all(&self.dev.to_be_bytes())?;
        out.write_all(&self.ino.to_be_bytes())?;
        out.write_all(&self.mode.to_be_bytes())?;
        out.write_all(&self.uid.to_be_bytes())?;
        out.write_all(&self.gid.to_be_bytes())?;
        out.write_all(&self.size.to_be_bytes())?;
        out.write_all(&self.object_id)?;
        out.write_all(&self.flags.raw().to_be_bytes())?;
        out.write_all(&self.name)?;

        let total = padded_entry_len(self.name.len());
        let written = ENTRY_PREFIX_LEN + self.name.len();
        out.write_all(&vec![0u8; total - written])?;

        Ok(())
    }

    /// Parse one entry, including its padded name, from `input`.
    pub fn read_from<R: Read>(input: &mut R) -> Result<Self> {
        let mut prefix = [0u8; ENTRY_PREFIX_LEN];
        input.read_exact(&mut prefix)?;

        let ctime_secs = i32::from_be_bytes(prefix[0..4].try_into().unwrap());
        let ctime_nanos = i32::from_be_bytes(prefix[4..8].try_into().unwrap());
        let mtime_secs = i32::from_be_bytes(prefix[8..12].try_into().unwrap());
        let mtime_nanos = i32::from_be_bytes(prefix[12..16].try_into().unwrap());
        let dev = i32::from_be_bytes(prefix[16..20].try_into().unwrap());
        let ino = i32::from_be_bytes(prefix[20..24].try_into().unwrap());
        let mode = u32::from_be_bytes(prefix[24..28].try_into().unwrap());
        let uid = i32::from_be_bytes(prefix[28..32].try_into().unwrap());
        let gid = i32::from_be_bytes(prefix[32..36].try_into().unwrap());
        let size = i32::from_be_bytes(prefix[36..40].try_into().unwrap());
        let mut object_id = [0u8; 20];
        object_id.copy_from_slice(&prefix[40..60]);
        let flags_raw = u16::from_be_bytes(prefix[60..62].try_into().unwrap());
        let flags = Flags::from_raw(flags_raw);

        let declared_len = flags.name_len() as usize;
        let name = if declared_len < NAME_LEN_SENTINEL as usize {
            let mut name = vec![0u8; declared_len];
            input.read_exact(&mut name)?;
            name
        } else {
            // Sentinel: the name runs until the NUL terminator.
            let mut name = Vec::new();
            let mut byte = [0u8; 1];
            loop {
                input.read_exact(&mut byte)?;
                if byte[0] == 0 {
                    break;
                }
                name.push(byte[0]);
            }
            // read_exact above consumed the terminator; padding below
            // still applies based on the prefix + actual name length.
            let total = padded_entry_len(name.len());
            let consumed = ENTRY_PREFIX_LEN + name.len() + 1;
            if total > consumed {
                let mut pad = vec![0u8; total - consumed];
                input.read_exact(&mut pad)?;
            }
            return Ok(Entry {
                ctime_ns: ctime_secs as i64 * 1_000_000_000 + ctime_nanos as i64,
                mtime_ns: mtime_secs as i64 * 1_000_000_000 + mtime_nanos as i64,
                dev,
                ino,
                mode,
                uid,
                gid,
                size,
                object_id,
                flags,
                name,
            });
        };

        let total = padded_entry_len(name.len());
        let consumed = ENTRY_PREFIX_LEN + name.len();
        if total > consumed {
            let mut pad = vec![0u8; total - consumed];
            input.read_exact(&mut pad)?;
        }

        if flags.name_len() as usize != name.len().min(NAME_LEN_SENTINEL as usize) {
            return Err(IndexError::CorruptIndex(format!(
                "name length mismatch: flags say {}, parsed {}",
                flags.name_len(),
                name.len()
            )));
        }

        Ok(Entry {
            ctime_ns: ctime_secs as i64 * 1_000_000_000 + ctime_nanos as i64,
            mtime_ns: mtime_secs as i64 * 1_000_000_000 + mtime_nanos as i64,
            dev,
            ino,
            mode,
            uid,
            gid,
            size,
            object_id,
            flags,
            name,
        })
    }
}

#[cfg(unix)]
fn stat_fields(metadata: &std::fs::Metadata) -> (i64, i64, i32, i32, i32, i32) {
    use std::os::unix::fs::MetadataExt;
    (
        metadata.ctime() * 1_000_000_000 + metadata.ctime_nsec(),
        metadata.mtime() * 1_000_000_000 + metadata.mtime_nsec(),
        metadata.dev() as i32,
        metadata.ino() as i32,
        metadata.uid() as i32,
        metadata.gid() as i32,
    )
}

#[cfg(not(unix))]
fn stat_fields(_metadata: &std::fs::Metadata) -> (i64, i64, i32, i32, i32, i32) {
    (0, 0, -1, -1, -1, -1)
}
