//! Filesystem abstraction: executable-bit support.
//!
//! Kept narrow, per the collaborator contract the index consumes:
//! `can_execute`, `set_execute`, `supports_execute`.

use std::io;
use std::path::Path;

/// Whether this platform's filesystem can represent the executable bit
/// at all. Index modification checks that compare against the bit
/// should be skipped when this is false.
pub fn supports_execute() -> bool {
    cfg!(unix)
}

/// Whether `path` currently has any owner/group/other execute bit set.
#[cfg(unix)]
pub fn can_execute(path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::metadata(path)?.permissions();
    Ok(perms.mode() & 0o111 != 0)
}

#[cfg(not(unix))]
pub fn can_execute(_path: &Path) -> io::Result<bool> {
    Ok(false)
}

/// Set or clear the executable bits (`rwxr-xr-x` vs `rw-r--r--`) on `path`.
#[cfg(unix)]
pub fn set_execute(path: &Path, executable: bool) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    let mode = if executable { 0o755 } else { 0o644 };
    perms.set_mode(mode);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
pub fn set_execute(_path: &Path, _executable: bool) -> io::Result<()> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn toggles_executable_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.sh");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"#!/bin/sh\n").unwrap();
        drop(f);

        assert!(!can_execute(&path).unwrap());
        set_execute(&path, true).unwrap();
        assert!(can_execute(&path).unwrap());
        set_execute(&path, false).unwrap();
        assert!(!can_execute(&path).unwrap());
    }
}
