//! Low-level filesystem access: component A (the directory reader) and the `lstat` wrapper
//! component B uses to build [`FileMeta`](crate::model::FileMeta).
mod dirent;
mod meta;

pub use dirent::DirReader;
pub use meta::lstat_path;
