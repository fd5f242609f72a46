//! Component A: the directory reader.
//!
//! Enumerates a directory with a raw `getdents64(2)` syscall so that callers which already
//! trust the kernel-supplied `d_type` never have to pay for a per-entry `lstat`. Grounded on the
//! reference crate's `syscalls.rs`/`fs/iter.rs` `GetDents` iterator, simplified to the single
//! x86_64/aarch64-or-libc-fallback path this tool actually needs (no inline assembly: the
//! `libc::syscall` wrapper already compiles to the same single `syscall` instruction, and
//! keeping it in safe-ish libc form avoids retargeting asm for every new architecture the
//! reference crate supports).
use crate::error::{DuError, OsFailure};
use crate::model::{EntryKind, RawEntry};
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt as _;
use std::path::Path;

/// Matches the reference crate's `BUFFER_SIZE` reasoning: large enough that a typical directory
/// is read in one `getdents64` call, small enough to live on the stack without risking overflow
/// under deep worker-thread recursion.
const BUFFER_SIZE: usize = 8 * 4096;

/// Linux's `DT_DIR`; the only `d_type` value component A treats specially (everything else that
/// isn't `DT_UNKNOWN` is a non-directory `File` for this tool's purposes — subdivision into
/// regular/char/block/etc is not part of the accounting model).
const DT_DIR: u8 = 4;
const DT_UNKNOWN: u8 = 0;

fn open_dir(path: &Path) -> Result<i32, DuError> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| DuError::InvalidArgument(format!("path contains NUL byte: {}", path.display())))?;

    // SAFETY: `c_path` is a valid NUL-terminated string for the duration of this call.
    let fd = unsafe {
        libc::open(
            c_path.as_ptr(),
            libc::O_DIRECTORY | libc::O_CLOEXEC | libc::O_NONBLOCK | libc::O_RDONLY,
        )
    };

    if fd < 0 {
        let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
        return Err(match OsFailure::classify(errno) {
            OsFailure::AccessDenied => DuError::AccessDenied(path.to_path_buf()),
            OsFailure::NotFound => DuError::NotFound(path.to_path_buf()),
            OsFailure::Other => DuError::Io(path.to_path_buf(), std::io::Error::from_raw_os_error(errno)),
        });
    }

    Ok(fd)
}

/// A directory enumerator that yields raw `(name, kind)` pairs without stat-ing any of them.
/// Closes its file descriptor on drop, including when the consumer stops iterating early.
pub struct DirReader {
    fd: i32,
    buffer: Box<[u8; BUFFER_SIZE]>,
    cursor: usize,
    filled: usize,
    end_of_stream: bool,
}

impl DirReader {
    pub fn open(path: &Path) -> Result<Self, DuError> {
        let fd = open_dir(path)?;
        Ok(Self {
            fd,
            buffer: Box::new([0u8; BUFFER_SIZE]),
            cursor: 0,
            filled: 0,
            end_of_stream: false,
        })
    }

    fn refill(&mut self) -> bool {
        if self.end_of_stream {
            return false;
        }

        // SAFETY: `self.fd` is a valid, open directory file descriptor owned by this struct and
        // `self.buffer` is valid for writes of `BUFFER_SIZE` bytes.
        let read = unsafe {
            libc::syscall(
                libc::SYS_getdents64,
                self.fd,
                self.buffer.as_mut_ptr(),
                BUFFER_SIZE,
            )
        };

        if read <= 0 {
            self.end_of_stream = true;
            return false;
        }

        self.filled = read as usize;
        self.cursor = 0;
        true
    }
}

impl Drop for DirReader {
    fn drop(&mut self) {
        // SAFETY: `self.fd` is owned exclusively by this struct and closed exactly once.
        unsafe {
            libc::close(self.fd);
        }
    }
}

impl Iterator for DirReader {
    type Item = RawEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.cursor >= self.filled && !self.refill() {
                return None;
            }

            // `dirent64` layout: d_ino: u64, d_off: i64, d_reclen: u16, d_type: u8, d_name: [u8]
            // (NUL-terminated, variable length). Offsets below match every Linux target this
            // tool runs on (glibc and musl agree on this layout).
            const D_RECLEN_OFFSET: usize = 16;
            const D_TYPE_OFFSET: usize = 18;
            const D_NAME_OFFSET: usize = 19;

            let base = self.cursor;
            let reclen = u16::from_ne_bytes([
                self.buffer[base + D_RECLEN_OFFSET],
                self.buffer[base + D_RECLEN_OFFSET + 1],
            ]) as usize;

            if reclen == 0 || base + reclen > self.filled {
                // Corrupt or truncated record; stop rather than read out of bounds.
                self.end_of_stream = true;
                return None;
            }

            let d_type = self.buffer[base + D_TYPE_OFFSET];
            let name_start = base + D_NAME_OFFSET;
            let name_region = &self.buffer[name_start..base + reclen];
            let nul = name_region.iter().position(|&b| b == 0).unwrap_or(name_region.len());
            let name = &name_region[..nul];

            self.cursor += reclen;

            if name == b"." || name == b".." {
                continue;
            }

            let kind = match d_type {
                DT_DIR => EntryKind::Dir,
                DT_UNKNOWN => EntryKind::Unknown,
                _ => EntryKind::File,
            };

            return Some(RawEntry {
                name: Box::from(name),
                kind,
            });
        }
    }
}
