//! The `lstat(2)` wrapper component B uses to turn a raw entry into [`FileMeta`].
use crate::error::{DuError, OsFailure};
use crate::model::FileMeta;
use std::ffi::CString;
use std::mem::MaybeUninit;
use std::os::unix::ffi::OsStrExt as _;
use std::path::Path;

/// Runs `lstat` on `path` (does not follow the final symlink, matching the spec's `FileMeta`
/// contract) and extracts the handful of fields the counter needs.
pub fn lstat_path(path: &Path) -> Result<FileMeta, DuError> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| DuError::InvalidArgument(format!("path contains NUL byte: {}", path.display())))?;

    let mut stat_buf = MaybeUninit::<libc::stat>::uninit();

    // SAFETY: `c_path` is NUL-terminated and `stat_buf` is valid for writes of `sizeof(stat)`.
    let rc = unsafe { libc::lstat(c_path.as_ptr(), stat_buf.as_mut_ptr()) };

    if rc != 0 {
        let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
        return Err(match OsFailure::classify(errno) {
            OsFailure::AccessDenied => DuError::AccessDenied(path.to_path_buf()),
            OsFailure::NotFound => DuError::NotFound(path.to_path_buf()),
            OsFailure::Other => DuError::Io(path.to_path_buf(), std::io::Error::from_raw_os_error(errno)),
        });
    }

    // SAFETY: `lstat` returning 0 guarantees `stat_buf` was fully initialised by the kernel.
    let stat = unsafe { stat_buf.assume_init() };

    Ok(FileMeta {
        size: stat.st_size.max(0) as u64,
        uid: stat.st_uid,
        dev: stat.st_dev,
        inode: stat.st_ino,
        nlink: stat.st_nlink as u64,
        mode: stat.st_mode as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lstat_reports_size_and_owner() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        fs::write(&file, b"hello!").unwrap();

        let meta = lstat_path(&file).unwrap();
        assert_eq!(meta.size, 6);
        assert!(!meta.is_dir());
        assert_eq!(meta.nlink, 1);
    }

    #[test]
    fn lstat_of_directory_reports_is_dir() {
        let dir = tempfile::tempdir().unwrap();
        let meta = lstat_path(dir.path()).unwrap();
        assert!(meta.is_dir());
    }

    #[test]
    fn lstat_of_missing_path_is_not_found() {
        let err = lstat_path(Path::new("/no/such/path/at/all")).unwrap_err();
        assert!(matches!(err, DuError::NotFound(_)));
    }
}
