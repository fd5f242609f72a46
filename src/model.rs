//! The data model from the design: transient directory entries and file metadata, the
//! per-directory result record, and the post-traversal tree index.
use std::collections::HashMap;
use std::path::PathBuf;

/// Sentinel `parent_inode` anchoring root directories in [`TreeIndex::tree`].
pub const ROOT_PARENT: u64 = 0;

/// How an entry presents itself in a raw directory listing, before any stat has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
    Unknown,
}

/// One `(name, kind)` pair as yielded by the directory reader (component A). Transient: never
/// held past the per-directory counter that consumes it.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub name: Box<[u8]>,
    pub kind: EntryKind,
}

/// The fields of an `lstat(2)` result the counter actually needs.
#[derive(Debug, Clone, Copy)]
pub struct FileMeta {
    pub size: u64,
    pub uid: u32,
    pub dev: u64,
    pub inode: u64,
    pub nlink: u64,
    pub mode: u32,
}

impl FileMeta {
    #[must_use]
    #[inline]
    pub const fn is_dir(&self) -> bool {
        self.mode & libc::S_IFMT == libc::S_IFDIR
    }
}

/// Per-directory, per-uid count/size buckets. Keyed by uid so `--user` output and the
/// non-`--user` aggregate (summed across uids) share one representation.
pub type UidBuckets = HashMap<u32, u64>;

/// The output of one invocation of the per-directory counter (component B).
#[derive(Debug, Clone)]
pub struct DirResult {
    pub name: Box<[u8]>,
    pub parent_inode: u64,
    pub inode: u64,
    pub per_uid_count: UidBuckets,
    pub per_uid_size: UidBuckets,
}

impl DirResult {
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.per_uid_count.values().sum()
    }

    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.per_uid_size.values().sum()
    }

    /// Adds `count` files and `size` bytes to `uid`'s buckets.
    pub fn add(&mut self, uid: u32, count: u64, size: u64) {
        *self.per_uid_count.entry(uid).or_insert(0) += count;
        *self.per_uid_size.entry(uid).or_insert(0) += size;
    }

    /// Merges another directory's buckets into this one (the roll-up step in component F).
    pub fn merge(&mut self, other: &UidBuckets, sizes: &UidBuckets) {
        for (&uid, &count) in other {
            *self.per_uid_count.entry(uid).or_insert(0) += count;
        }
        for (&uid, &size) in sizes {
            *self.per_uid_size.entry(uid).or_insert(0) += size;
        }
    }
}

/// A unit of work instructing a worker to descend into `dir_path.join(name)`.
#[derive(Debug, Clone)]
pub struct Job {
    pub dir_path: PathBuf,
    pub name: Box<[u8]>,
    pub parent_inode: u64,
    pub inode: u64,
}

/// The two post-traversal mappings the collector (component F) walks.
#[derive(Debug, Default)]
pub struct TreeIndex {
    /// Directories only, keyed by inode.
    pub all: HashMap<u64, DirResult>,
    /// `parent_inode -> ordered list of child inode`, in the order results arrived.
    pub tree: HashMap<u64, Vec<u64>>,
}

impl TreeIndex {
    pub fn insert(&mut self, result: DirResult) {
        let inode = result.inode;
        let parent = result.parent_inode;
        self.all.insert(inode, result);
        self.tree.entry(parent).or_default().push(inode);
    }
}
