//! Component F: the tree assembler and collector.
//!
//! Consumes every [`DirResult`] into a [`TreeIndex`], then walks it depth-first per root,
//! rolling subtree buckets up into their parents (unless `--exclude-subdirs` is set) and
//! applying the output filters from §4.F/§4.G.
use crate::model::{DirResult, TreeIndex, UidBuckets};
use crate::regexfilter::PathFilter;
use std::collections::HashSet;
use std::os::unix::ffi::OsStrExt as _;
use std::path::{Path, PathBuf};

/// Filter/shape knobs for [`collect_all`], taken directly off the CLI.
#[derive(Debug, Clone)]
pub struct CollectConfig {
    pub max_depth: Option<u32>,
    pub file_limit: u64,
    pub size_limit: u64,
    pub exclude_subdirs: bool,
    pub user_mode: bool,
}

/// One emitted output line: `uid` is `Some` only in `--user` mode.
#[derive(Debug, Clone)]
pub struct Row {
    pub uid: Option<u32>,
    pub count: u64,
    pub size: u64,
    pub path: PathBuf,
}

fn join_path(dir: &Path, name: &[u8]) -> PathBuf {
    let mut bytes = dir.as_os_str().as_bytes().to_vec();
    if bytes.last() != Some(&b'/') {
        bytes.push(b'/');
    }
    bytes.extend_from_slice(name);
    PathBuf::from(std::ffi::OsString::from_vec(bytes))
}

/// Runs `collect` for every root, in the caller's (already deduplicated) order, appending
/// emitted rows to `rows`.
pub fn collect_all(
    tree: &TreeIndex,
    roots: &[(u64, PathBuf)],
    filter: &PathFilter,
    config: &CollectConfig,
    rows: &mut Vec<Row>,
) {
    let mut rolled_up = HashSet::new();
    for (inode, path) in roots {
        collect(*inode, path.clone(), 0, tree, filter, config, &mut rolled_up, rows);
    }
}

/// Depth-first walk of one subtree. Returns this directory's buckets after roll-up, so the
/// caller (its parent, or nothing for a root) can merge them further up.
fn collect(
    inode: u64,
    path: PathBuf,
    depth: u32,
    tree: &TreeIndex,
    filter: &PathFilter,
    config: &CollectConfig,
    rolled_up: &mut HashSet<u64>,
    rows: &mut Vec<Row>,
) -> (UidBuckets, UidBuckets) {
    // A subdirectory that failed to open produces no DirResult; §9 treats it as a zero-bucket
    // leaf rather than aborting the whole walk.
    let Some(result) = tree.all.get(&inode) else {
        return (UidBuckets::new(), UidBuckets::new());
    };

    let mut counts = result.per_uid_count.clone();
    let mut sizes = result.per_uid_size.clone();

    if let Some(children) = tree.tree.get(&inode) {
        for &child_inode in children {
            let Some(child_result) = tree.all.get(&child_inode) else {
                continue;
            };
            let child_path = join_path(&path, &child_result.name);
            let (child_counts, child_sizes) = collect(
                child_inode,
                child_path,
                depth + 1,
                tree,
                filter,
                config,
                rolled_up,
                rows,
            );

            if !config.exclude_subdirs && rolled_up.insert(child_inode) {
                merge_into(&mut counts, &child_counts);
                merge_into(&mut sizes, &child_sizes);
            }
        }
    }

    emit(&path, depth, &counts, &sizes, filter, config, rows);

    (counts, sizes)
}

fn merge_into(into: &mut UidBuckets, from: &UidBuckets) {
    for (&uid, &value) in from {
        *into.entry(uid).or_insert(0) += value;
    }
}

fn emit(
    path: &Path,
    depth: u32,
    counts: &UidBuckets,
    sizes: &UidBuckets,
    filter: &PathFilter,
    config: &CollectConfig,
    rows: &mut Vec<Row>,
) {
    let total_count: u64 = counts.values().sum();
    let total_size: u64 = sizes.values().sum();

    if total_count == 0 && total_size == 0 {
        let path_bytes = path.as_os_str().as_bytes();
        if filter.is_excluded(path_bytes) || filter.fails_include(path_bytes) {
            return;
        }
    }

    if let Some(max_depth) = config.max_depth {
        if depth > max_depth {
            return;
        }
    }

    if config.user_mode {
        let mut uids: Vec<u32> = counts.keys().chain(sizes.keys()).copied().collect();
        uids.sort_unstable();
        uids.dedup();
        for uid in uids {
            let count = *counts.get(&uid).unwrap_or(&0);
            let size = *sizes.get(&uid).unwrap_or(&0);
            if count > config.file_limit || size > config.size_limit {
                rows.push(Row {
                    uid: Some(uid),
                    count,
                    size,
                    path: path.to_path_buf(),
                });
            }
        }
    } else if total_count >= config.file_limit && total_size >= config.size_limit {
        rows.push(Row {
            uid: None,
            count: total_count,
            size: total_size,
            path: path.to_path_buf(),
        });
    }
}
