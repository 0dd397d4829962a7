//! Executable permission bits.

use std::path::Path;

/// Makes a file executable, same as `chmod a+x`.
///
/// Returns `Ok(true)` on success and `Ok(false)` when the filesystem does not
/// support POSIX permissions; on such filesystems execution does not require
/// the bit, so the caller decides whether the outcome matters.
pub fn make_executable(path: &Path) -> std::io::Result<bool> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(perms.mode() | 0o111);
        std::fs::set_permissions(path, perms)?;
        Ok(true)
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(false)
    }
}
