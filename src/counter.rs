//! Component B: the per-directory counter.
//!
//! Implements the algorithm from §4.B of the design: partition entries into dirs/files without
//! stat-ing directories, fan out `lstat` over large file lists, apply include/exclude filters,
//! dedup hard-linked files against the shared [`InodeSet`], and emit both a [`DirResult`] and the
//! child [`Job`]s to descend into.
use crate::error::DuError;
use crate::fs::{lstat_path, DirReader};
use crate::inode_set::InodeSet;
use crate::model::{DirResult, EntryKind, FileMeta, Job, RawEntry, UidBuckets};
use crate::regexfilter::PathFilter;
use std::os::unix::ffi::OsStrExt as _;
use std::path::{Path, PathBuf};
use std::thread;

/// Above this many plain files, `lstat` calls are fanned out across helper threads (§4.B step 3).
pub const LARGE_DIR_THRESHOLD: usize = 1000;
/// Number of contiguous slices a large file list is split into (§4.B step 3 / §5: `SPLIT = 2`).
pub const SPLIT: usize = 2;
/// A progress update is emitted every this many files counted within one directory (§4.B).
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// What one call to [`count_directory`] produced.
pub enum CounterOutcome {
    /// The directory was read successfully; contains the emitted result and the subdirectory
    /// jobs the dispatcher should enqueue.
    Counted {
        result: DirResult,
        children: Vec<Job>,
    },
    /// `opendir`/`lstat` on the directory itself failed with `EACCES` or `ENOENT`. Already
    /// logged to stderr; the job is still considered complete (no `DirResult` is emitted, per
    /// §4.B's "emitting an empty `DirResult` would corrupt the tree").
    Skipped,
    /// Any other OS error on the directory itself. The job still completes (the barrier must
    /// not stall), but the run as a whole should report a non-zero exit code once traversal
    /// finishes.
    Fatal(DuError),
}

fn join_bytes(dir: &Path, name: &[u8]) -> PathBuf {
    let mut path = dir.as_os_str().as_bytes().to_vec();
    if path.last() != Some(&b'/') {
        path.push(b'/');
    }
    path.extend_from_slice(name);
    PathBuf::from(std::ffi::OsString::from_vec(path))
}

/// Runs the full per-directory algorithm for `job`.
///
/// `on_progress(count_delta, size_delta, path)` is invoked every [`PROGRESS_INTERVAL`] counted
/// files and once more at the end of the directory (even if the final delta is zero), feeding
/// component E.
pub fn count_directory(
    job: &Job,
    filter: &PathFilter,
    inode_set: &InodeSet,
    mut on_progress: impl FnMut(u64, u64, &Path),
) -> CounterOutcome {
    let abs_path = join_bytes(&job.dir_path, &job.name);

    let reader = match DirReader::open(&abs_path) {
        Ok(reader) => reader,
        Err(DuError::AccessDenied(path)) => {
            eprintln!("# access denied to directory {}", path.display());
            return CounterOutcome::Skipped;
        }
        Err(DuError::NotFound(path)) => {
            eprintln!("# could not access dir,file or file in dir {}", path.display());
            return CounterOutcome::Skipped;
        }
        Err(other) => {
            eprintln!("{other}");
            return CounterOutcome::Fatal(other);
        }
    };

    let mut dirs: Vec<RawEntry> = Vec::new();
    let mut files: Vec<RawEntry> = Vec::new();

    for entry in reader {
        let entry_path = join_bytes(&abs_path, &entry.name);
        if filter.is_excluded(entry_path.as_os_str().as_bytes()) {
            continue;
        }
        match entry.kind {
            EntryKind::Dir => dirs.push(entry),
            EntryKind::File | EntryKind::Unknown => files.push(entry),
        }
    }

    let statted_files = stat_files(&abs_path, files);

    let mut per_uid_count = UidBuckets::new();
    let mut per_uid_size = UidBuckets::new();
    let mut children = Vec::new();
    let mut counted_since_progress = 0u64;
    let mut size_since_progress = 0u64;
    let mut count_acc = 0u64;
    let mut size_acc = 0u64;

    for (entry, meta) in statted_files {
        let Some(meta) = meta else { continue };

        if matches!(entry.kind, EntryKind::Unknown) && meta.is_dir() {
            dirs.push(entry);
            continue;
        }

        let entry_path = join_bytes(&abs_path, &entry.name);
        if filter.fails_include(entry_path.as_os_str().as_bytes()) {
            continue;
        }

        let charge_size = meta.nlink <= 1 || inode_set.first_sighting(meta.dev, meta.inode);
        let size = if charge_size { meta.size } else { 0 };

        *per_uid_count.entry(meta.uid).or_insert(0) += 1;
        *per_uid_size.entry(meta.uid).or_insert(0) += size;

        count_acc += 1;
        size_acc += size;
        counted_since_progress += 1;
        size_since_progress += size;
        if counted_since_progress >= PROGRESS_INTERVAL {
            on_progress(counted_since_progress, size_since_progress, &abs_path);
            counted_since_progress = 0;
            size_since_progress = 0;
        }
    }

    for subdir in dirs {
        let subdir_path = join_bytes(&abs_path, &subdir.name);
        let meta = match lstat_path(&subdir_path) {
            Ok(meta) => meta,
            Err(DuError::AccessDenied(path)) => {
                eprintln!("# access denied to directory {}", path.display());
                continue;
            }
            Err(DuError::NotFound(path)) => {
                eprintln!("# could not access dir,file or file in dir {}", path.display());
                continue;
            }
            Err(other) => {
                eprintln!("{other}");
                continue;
            }
        };

        if !filter.fails_include(subdir_path.as_os_str().as_bytes()) {
            *per_uid_count.entry(meta.uid).or_insert(0) += 1;
            *per_uid_size.entry(meta.uid).or_insert(0) += meta.size;
            count_acc += 1;
            size_acc += meta.size;
        }

        children.push(Job {
            dir_path: abs_path.clone(),
            name: subdir.name,
            parent_inode: job.inode,
            inode: meta.inode,
        });
    }

    on_progress(counted_since_progress, size_since_progress, &abs_path);
    let _ = (count_acc, size_acc);

    CounterOutcome::Counted {
        result: DirResult {
            name: job.name.clone(),
            parent_inode: job.parent_inode,
            inode: job.inode,
            per_uid_count,
            per_uid_size,
        },
        children,
    }
}

/// Stats `files` inline, or fanned out across [`SPLIT`] threads when the list is large enough
/// (§4.B step 3 / §5). Returns `None` metadata for entries whose `lstat` failed (e.g. a file
/// deleted between the directory read and the stat); those entries are dropped by the caller.
fn stat_files(dir: &Path, files: Vec<RawEntry>) -> Vec<(RawEntry, Option<FileMeta>)> {
    if files.len() <= LARGE_DIR_THRESHOLD {
        return stat_slice(dir, files);
    }

    let mid = files.len() / SPLIT;
    let (first_half, second_half) = files.split_at(mid);
    let first_half = first_half.to_vec();
    let second_half = second_half.to_vec();

    thread::scope(|scope| {
        let handle = scope.spawn(|| stat_slice(dir, second_half));
        let mut first_results = stat_slice(dir, first_half);
        let mut second_results = handle.join().unwrap_or_default();
        first_results.append(&mut second_results);
        first_results
    })
}

fn stat_slice(dir: &Path, files: Vec<RawEntry>) -> Vec<(RawEntry, Option<FileMeta>)> {
    files
        .into_iter()
        .map(|entry| {
            let path = join_bytes(dir, &entry.name);
            let meta = lstat_path(&path).ok();
            (entry, meta)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn job_for(dir: &Path, name: &str, inode: u64) -> Job {
        Job {
            dir_path: dir.to_path_buf(),
            name: Box::from(name.as_bytes()),
            parent_inode: 0,
            inode,
        }
    }

    #[test]
    fn counts_files_and_enqueues_subdirs() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("r");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("f1"), vec![0u8; 10]).unwrap();
        fs::write(root.join("f2"), vec![0u8; 20]).unwrap();
        fs::create_dir(root.join("d")).unwrap();
        fs::write(root.join("d").join("f3"), vec![0u8; 5]).unwrap();

        let root_inode = lstat_path(&root).unwrap().inode;
        let job = job_for(tmp.path(), "r", root_inode);
        let inode_set = InodeSet::new();
        let filter = PathFilter::default();

        let outcome = count_directory(&job, &filter, &inode_set, |_, _, _| {});
        let CounterOutcome::Counted { result, children } = outcome else {
            panic!("expected Counted");
        };

        assert_eq!(result.total_count(), 3); // f1, f2, d (own entry)
        assert_eq!(result.total_size(), 30);
        assert_eq!(children.len(), 1);
        assert_eq!(&*children[0].name, b"d");
    }

    #[test]
    fn hard_linked_file_charged_once() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("r");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("f1"), vec![0u8; 100]).unwrap();
        fs::hard_link(root.join("f1"), root.join("f2")).unwrap();

        let root_inode = lstat_path(&root).unwrap().inode;
        let job = job_for(tmp.path(), "r", root_inode);
        let inode_set = InodeSet::new();
        let filter = PathFilter::default();

        let CounterOutcome::Counted { result, .. } =
            count_directory(&job, &filter, &inode_set, |_, _, _| {})
        else {
            panic!("expected Counted");
        };

        assert_eq!(result.total_count(), 2);
        assert_eq!(result.total_size(), 100);
    }

    #[test]
    fn missing_directory_is_skipped_not_emitted() {
        let job = job_for(Path::new("/no/such/parent"), "missing", 1);
        let inode_set = InodeSet::new();
        let filter = PathFilter::default();

        assert!(matches!(
            count_directory(&job, &filter, &inode_set, |_, _, _| {}),
            CounterOutcome::Skipped
        ));
    }

    #[test]
    fn include_filter_prunes_local_charge_but_keeps_descent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("r");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("f1"), vec![0u8; 10]).unwrap();
        fs::create_dir(root.join("d")).unwrap();

        let root_inode = lstat_path(&root).unwrap().inode;
        let job = job_for(tmp.path(), "r", root_inode);
        let inode_set = InodeSet::new();
        let filter = PathFilter::new(Some(r".*/d"), None).unwrap();

        let CounterOutcome::Counted { result, children } =
            count_directory(&job, &filter, &inode_set, |_, _, _| {})
        else {
            panic!("expected Counted");
        };

        assert_eq!(result.total_count(), 0);
        assert_eq!(children.len(), 1, "subdir must still be enqueued for descent");
    }
}
