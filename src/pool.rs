//! Components C and D: the worker pool and the dispatcher/barrier.
//!
//! Grounded directly on the reference crate's `walk/finder.rs`: a `crossbeam-deque`
//! work-stealing injector plus per-worker local deques, a `PendingGuard` that decrements an
//! atomic outstanding-work counter on every job completion and flips a shutdown flag at zero,
//! and a `BatchSender` that coalesces results before sending them down a bounded
//! `crossbeam-channel` to cut channel contention.
use crate::counter::{count_directory, CounterOutcome};
use crate::inode_set::InodeSet;
use crate::model::{DirResult, Job};
use crate::regexfilter::PathFilter;
use crossbeam_channel::{bounded, Receiver, Sender};
use crossbeam_deque::{Injector, Steal, Stealer, Worker};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Batch size a worker accumulates before flushing to the result channel (§5).
const RESULT_BATCH_LIMIT: usize = 256;
/// Channel capacity is a small multiple of the worker count, matching the reference crate's
/// `RESULT_CHANNEL_FACTOR` — enough to absorb bursts without unbounded memory growth.
const RESULT_CHANNEL_FACTOR: usize = 4;

/// A progress update forwarded to the status reporter (component E): files counted and bytes
/// charged since the last update, and the path being processed when it fired.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub count_delta: u64,
    pub size_delta: u64,
    pub path: std::path::PathBuf,
}

struct BatchSender {
    items: Vec<DirResult>,
    tx: Sender<Vec<DirResult>>,
}

impl BatchSender {
    fn new(tx: Sender<Vec<DirResult>>) -> Self {
        Self {
            items: Vec::with_capacity(RESULT_BATCH_LIMIT),
            tx,
        }
    }

    fn push(&mut self, item: DirResult) {
        self.items.push(item);
        if self.items.len() >= RESULT_BATCH_LIMIT {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let batch = std::mem::replace(&mut self.items, Vec::with_capacity(RESULT_BATCH_LIMIT));
        let _ = self.tx.send(batch);
    }
}

impl Drop for BatchSender {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Decrements the shared outstanding-work counter on drop (i.e. whenever a job finishes, by
/// whatever path) and raises the shutdown flag once nothing is outstanding — the barrier from
/// §4.D.
struct PendingGuard<'guard> {
    pending: &'guard AtomicUsize,
    shutdown: &'guard AtomicBool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shutdown.store(true, Ordering::Relaxed);
        }
    }
}

fn find_task(
    local: &Worker<Job>,
    injector: &Injector<Job>,
    stealers: &[Stealer<Job>],
) -> Option<Job> {
    if let Some(job) = local.pop() {
        return Some(job);
    }

    loop {
        match injector.steal_batch_and_pop(local) {
            Steal::Success(job) => return Some(job),
            Steal::Retry => continue,
            Steal::Empty => {}
        }

        let mut retry = false;
        for stealer in stealers {
            match stealer.steal() {
                Steal::Success(job) => return Some(job),
                Steal::Retry => retry = true,
                Steal::Empty => {}
            }
        }

        if !retry {
            return None;
        }
    }
}

/// Runs the traversal: seeds `roots` onto a work-stealing injector, spawns `worker_count`
/// threads to drain it via [`count_directory`], and blocks until the barrier fires. Returns a
/// [`ResultIter`] over the [`DirResult`] batches as they complete, for the collector (component
/// F) to consume; [`ResultIter::had_fatal`] reports whether any directory-level OS error other
/// than access-denied/not-found was hit (§7.iii).
pub fn traverse(
    roots: Vec<Job>,
    filter: Arc<PathFilter>,
    worker_count: usize,
    progress_tx: Option<Sender<ProgressUpdate>>,
) -> ResultIter {
    let worker_count = worker_count.max(1);
    let result_capacity = worker_count.saturating_mul(RESULT_CHANNEL_FACTOR).max(1);
    let (result_tx, result_rx): (_, Receiver<Vec<DirResult>>) = bounded(result_capacity);

    let injector = Arc::new(Injector::new());
    let pending = Arc::new(AtomicUsize::new(1)); // 1 until the seed push below completes
    let shutdown = Arc::new(AtomicBool::new(false));
    let inode_set = Arc::new(InodeSet::new());
    let had_fatal = Arc::new(AtomicBool::new(false));

    let mut local_workers = Vec::with_capacity(worker_count);
    let mut stealers = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let worker = Worker::new_fifo();
        stealers.push(worker.stealer());
        local_workers.push(worker);
    }
    let stealers = Arc::new(stealers);

    pending.fetch_add(roots.len(), Ordering::Relaxed);
    for job in roots {
        injector.push(job);
    }
    // Release the initial placeholder unit now that real work is seeded.
    if pending.fetch_sub(1, Ordering::AcqRel) == 1 {
        shutdown.store(true, Ordering::Relaxed);
    }

    let mut handles = Vec::with_capacity(worker_count);
    for (index, local) in local_workers.into_iter().enumerate() {
        let injector = Arc::clone(&injector);
        let stealers_all = Arc::clone(&stealers);
        let pending = Arc::clone(&pending);
        let shutdown = Arc::clone(&shutdown);
        let inode_set = Arc::clone(&inode_set);
        let had_fatal = Arc::clone(&had_fatal);
        let filter = Arc::clone(&filter);
        let result_tx = result_tx.clone();
        let progress_tx = progress_tx.clone();

        let handle = thread::Builder::new()
            .name(format!("duc-worker-{index}"))
            .spawn(move || {
                let mut batch = BatchSender::new(result_tx);
                let sibling_stealers: Vec<_> = stealers_all
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, s)| s.clone())
                    .collect();

                loop {
                    let Some(job) = find_task(&local, &injector, &sibling_stealers) else {
                        if shutdown.load(Ordering::Relaxed) && local.is_empty() && injector.is_empty()
                        {
                            break;
                        }
                        thread::yield_now();
                        continue;
                    };

                    let _guard = PendingGuard {
                        pending: &pending,
                        shutdown: &shutdown,
                    };

                    let result = run_job(
                        &job,
                        &filter,
                        &inode_set,
                        &had_fatal,
                        progress_tx.as_ref(),
                        |child| {
                            pending.fetch_add(1, Ordering::Relaxed);
                            local.push(child);
                        },
                    );
                    if let Some(result) = result {
                        batch.push(result);
                    }
                }
            })
            .expect("failed to spawn worker thread");
        handles.push(handle);
    }

    // Dropping our local `result_tx` lets the channel close once every worker's clone is
    // dropped — the batched-sender analogue of the source tool's single sentinel result.
    drop(result_tx);

    ResultIter {
        receiver: result_rx,
        buffer: Vec::new().into_iter(),
        _handles: handles,
        had_fatal,
    }
}

fn run_job(
    job: &Job,
    filter: &PathFilter,
    inode_set: &InodeSet,
    had_fatal: &AtomicBool,
    progress_tx: Option<&Sender<ProgressUpdate>>,
    mut enqueue: impl FnMut(Job),
) -> Option<DirResult> {
    let outcome = count_directory(job, filter, inode_set, |count_delta, size_delta, path| {
        if let Some(tx) = progress_tx {
            let _ = tx.send(ProgressUpdate {
                count_delta,
                size_delta,
                path: path.to_path_buf(),
            });
        }
    });

    match outcome {
        CounterOutcome::Counted { result, children } => {
            for child in children {
                enqueue(child);
            }
            Some(result)
        }
        CounterOutcome::Skipped => None,
        CounterOutcome::Fatal(_) => {
            had_fatal.store(true, Ordering::Relaxed);
            None
        }
    }
}

/// Iterator over completed [`DirResult`]s, also tracking whether any job hit a non-skip OS
/// error (see [`traverse`]).
pub struct ResultIter {
    receiver: Receiver<Vec<DirResult>>,
    buffer: std::vec::IntoIter<DirResult>,
    _handles: Vec<thread::JoinHandle<()>>,
    had_fatal: Arc<AtomicBool>,
}

impl ResultIter {
    #[must_use]
    pub fn had_fatal(&self) -> bool {
        self.had_fatal.load(Ordering::Relaxed)
    }
}

impl Iterator for ResultIter {
    type Item = DirResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(item);
            }
            match self.receiver.recv() {
                Ok(batch) => self.buffer = batch.into_iter(),
                Err(_) => return None,
            }
        }
    }
}
