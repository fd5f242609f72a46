use core::fmt;

/// Top level error type for the library and binary.
#[derive(Debug)]
pub enum DuError {
    /// A directory could not be opened or read due to a permission error (`EACCES`).
    AccessDenied(std::path::PathBuf),
    /// A path vanished mid-traversal (`ENOENT`).
    NotFound(std::path::PathBuf),
    /// Any other OS error encountered while reading a directory or statting an entry.
    Io(std::path::PathBuf, std::io::Error),
    /// An `--include`/`--exclude` pattern failed to compile.
    Regex(crate::regexfilter::ParseRegexError),
    /// A `-k/--size-limit` argument had a malformed unit suffix.
    Size(crate::units::ParseSizeError),
    /// A CLI argument combination is invalid on its own terms (e.g. a root is not a directory).
    InvalidArgument(String),
}

impl fmt::Display for DuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessDenied(path) => {
                write!(f, "access denied to directory {}", path.display())
            }
            Self::NotFound(path) => {
                write!(f, "could not access dir,file or file in dir {}", path.display())
            }
            Self::Io(path, err) => write!(f, "{}: {err}", path.display()),
            Self::Regex(err) => write!(f, "{err}"),
            Self::Size(err) => write!(f, "{err}"),
            Self::InvalidArgument(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DuError {}

impl From<crate::regexfilter::ParseRegexError> for DuError {
    fn from(err: crate::regexfilter::ParseRegexError) -> Self {
        Self::Regex(err)
    }
}

impl From<crate::units::ParseSizeError> for DuError {
    fn from(err: crate::units::ParseSizeError) -> Self {
        Self::Size(err)
    }
}

/// Classifies a raw `errno` value the way the per-directory counter needs to: the handful of
/// cases that are skip-and-log rather than fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFailure {
    AccessDenied,
    NotFound,
    Other,
}

impl OsFailure {
    #[must_use]
    #[inline]
    pub const fn classify(errno: i32) -> Self {
        match errno {
            libc::EACCES => Self::AccessDenied,
            libc::ENOENT => Self::NotFound,
            _ => Self::Other,
        }
    }
}
