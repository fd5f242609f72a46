//! Component E: the status reporter.
//!
//! A background thread that drains [`ProgressUpdate`]s from the pool and prints a rate-limited
//! `eprintln!` line — no logging crate, matching how the rest of this tool reports diagnostics.
use crate::pool::ProgressUpdate;
use crate::units::human_readable;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Spawns the status thread. Returns `None` immediately (and drops `rx`) when `interval` is
/// `None`, matching the CLI's `-s/--status` contract: a non-positive or absent interval disables
/// status reporting entirely rather than printing at some default rate.
pub fn spawn(rx: Receiver<ProgressUpdate>, interval: Option<Duration>) -> Option<thread::JoinHandle<()>> {
    let interval = interval?;

    Some(
        thread::Builder::new()
            .name("duc-status".into())
            .spawn(move || run(&rx, interval))
            .expect("failed to spawn status thread"),
    )
}

fn run(rx: &Receiver<ProgressUpdate>, interval: Duration) {
    let mut last_emit = Instant::now();
    let mut last_emit_count: u64 = 0;
    let mut cum_count: u64 = 0;
    let mut cum_size: u64 = 0;
    let mut last_path = std::path::PathBuf::new();

    loop {
        match rx.recv_timeout(interval) {
            Ok(update) => {
                cum_count += update.count_delta;
                cum_size += update.size_delta;
                last_path = update.path;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                emit(&mut last_emit, &mut last_emit_count, cum_count, cum_size, &last_path, interval, true);
                return;
            }
        }

        emit(&mut last_emit, &mut last_emit_count, cum_count, cum_size, &last_path, interval, false);
    }
}

/// Prints one status line, throttled to at most once per `interval` (§4.E). The rate is the
/// count delta since the *previous* emission, not the lifetime average.
fn emit(
    last_emit: &mut Instant,
    last_emit_count: &mut u64,
    cum_count: u64,
    cum_size: u64,
    path: &std::path::Path,
    interval: Duration,
    force: bool,
) {
    let now = Instant::now();
    let elapsed = now.duration_since(*last_emit);
    if !force && elapsed < interval {
        return;
    }

    let elapsed_secs = elapsed.as_secs_f64().max(0.001);
    let rate = ((cum_count - *last_emit_count) as f64 / elapsed_secs).round() as u64;
    eprintln!(
        "{rate} {cum_count} {} {}",
        human_readable(cum_size),
        path.display()
    );

    *last_emit = now;
    *last_emit_count = cum_count;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::path::PathBuf;

    #[test]
    fn none_interval_disables_reporter() {
        let (_tx, rx) = unbounded();
        assert!(spawn(rx, None).is_none());
    }

    #[test]
    fn reporter_drains_until_sender_drops() {
        let (tx, rx) = unbounded();
        let handle = spawn(rx, Some(Duration::from_millis(5))).unwrap();
        tx.send(ProgressUpdate {
            count_delta: 3,
            size_delta: 30,
            path: PathBuf::from("/tmp/x"),
        })
        .unwrap();
        drop(tx);
        handle.join().unwrap();
    }
}
