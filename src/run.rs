//! Wires the collaborators together: CLI args in, exit code out. Kept separate from `main.rs`
//! so the whole pipeline is covered by library-level integration tests.
use crate::cli::Args;
use crate::error::DuError;
use crate::fs::lstat_path;
use crate::model::{Job, ROOT_PARENT};
use crate::output::{print_header, print_row};
use crate::pool::{self, ProgressUpdate};
use crate::regexfilter::PathFilter;
use crate::status;
use crate::tree::{collect_all, CollectConfig};
use crate::units::parse_size_limit;
use crate::users::UserNames;
use crossbeam_channel::unbounded;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// CLI parse / invalid argument, matching §6's exit code 2.
pub const EXIT_PARSE_ERROR: i32 = 2;
/// Success, no fatal errors encountered (directory-level access errors are not fatal).
pub const EXIT_SUCCESS: i32 = 0;
/// At least one job hit a non-skip OS error (§7.iii); partial results were still emitted.
pub const EXIT_FATAL: i32 = 1;

/// Canonicalizes and deduplicates the user-supplied roots: sorts by canonical path and drops any
/// root that is a prefix directory of a preceding one (§4.F). Inaccessible roots are logged and
/// skipped rather than treated as fatal (§7.v).
fn resolve_roots(raw_roots: &[PathBuf]) -> Vec<PathBuf> {
    let roots = if raw_roots.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        raw_roots.to_vec()
    };

    let mut canonical: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        match root.canonicalize() {
            Ok(path) => canonical.push(path),
            Err(err) => eprintln!("# could not access dir,file or file in dir {}: {err}", root.display()),
        }
    }

    canonical.sort();
    let mut deduped: Vec<PathBuf> = Vec::with_capacity(canonical.len());
    for path in canonical {
        let is_nested = deduped.iter().any(|kept: &PathBuf| path.starts_with(kept));
        if !is_nested {
            deduped.push(path);
        }
    }
    deduped
}

fn seed_jobs(roots: &[PathBuf]) -> Vec<(Job, PathBuf)> {
    let mut jobs = Vec::with_capacity(roots.len());
    for root in roots {
        let meta = match lstat_path(root) {
            Ok(meta) => meta,
            Err(err) => {
                eprintln!("# {err}");
                continue;
            }
        };

        let dir_path = root.parent().map(PathBuf::from).unwrap_or_default();
        let name: Box<[u8]> = root
            .file_name()
            .map(|n| Box::from(std::os::unix::ffi::OsStrExt::as_bytes(n)))
            .unwrap_or_else(|| Box::from(&b""[..]));

        jobs.push((
            Job {
                dir_path,
                name,
                parent_inode: ROOT_PARENT,
                inode: meta.inode,
            },
            root.clone(),
        ));
    }
    jobs
}

/// Runs the whole pipeline once; returns the process exit code.
pub fn run(args: Args) -> i32 {
    let size_limit = match args.size_limit.as_deref().map(parse_size_limit).transpose() {
        Ok(value) => value,
        Err(err) => {
            eprintln!("{}", DuError::from(err));
            return EXIT_PARSE_ERROR;
        }
    };
    let thresholds = args.thresholds(size_limit);

    let filter = match PathFilter::new(args.include.as_deref(), args.exclude.as_deref()) {
        Ok(filter) => filter,
        Err(err) => {
            eprintln!("{}", DuError::from(err));
            return EXIT_PARSE_ERROR;
        }
    };
    let filter = Arc::new(filter);

    let roots = resolve_roots(&args.roots);
    let seeded = seed_jobs(&roots);
    if seeded.is_empty() {
        // Every root was inaccessible; still print the header for a predictable shape.
        print_header(args.user, args.quiet);
        return EXIT_SUCCESS;
    }

    let root_paths: Vec<(u64, PathBuf)> = seeded.iter().map(|(job, path)| (job.inode, path.clone())).collect();
    let jobs: Vec<Job> = seeded.into_iter().map(|(job, _)| job).collect();

    let user_names = UserNames::load();

    let status_interval = args.status.and_then(|seconds| {
        if seconds <= 0.0 {
            None
        } else {
            Some(Duration::from_secs_f64(seconds))
        }
    });
    let (progress_tx, progress_rx) = if status_interval.is_some() {
        let (tx, rx) = unbounded::<ProgressUpdate>();
        (Some(tx), Some(rx))
    } else {
        (None, None)
    };
    let status_handle = progress_rx.and_then(|rx| status::spawn(rx, status_interval));

    let results = pool::traverse(jobs, Arc::clone(&filter), args.workers.max(1), progress_tx);

    let mut tree = crate::model::TreeIndex::default();
    let mut had_fatal = false;
    let mut results = results;
    for result in &mut results {
        tree.insert(result);
    }
    had_fatal |= results.had_fatal();

    if let Some(handle) = status_handle {
        let _ = handle.join();
    }

    let config = CollectConfig {
        max_depth: args.max_depth,
        file_limit: thresholds.file_limit,
        size_limit: thresholds.size_limit,
        exclude_subdirs: args.exclude_subdirs,
        user_mode: args.user,
    };

    let mut rows = Vec::new();
    collect_all(&tree, &root_paths, &filter, &config, &mut rows);

    print_header(args.user, args.quiet);
    for row in &rows {
        print_row(row, &user_names, args.human_readable);
    }

    if had_fatal {
        EXIT_FATAL
    } else {
        EXIT_SUCCESS
    }
}
