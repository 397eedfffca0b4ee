//! Bounded-concurrency executor for deferred resize tasks.
//!
//! Tasks are queued in submission order and launched while fewer than
//! `max_parallel` are in flight. Every completion immediately launches the
//! next queued task, so the pool stays full until the queue is empty rather
//! than advancing in fixed batches.
//!
//! Work runs on a dedicated rayon pool sized to `max_parallel`. The queue and
//! counters live behind one mutex shared with the workers; a condvar wakes
//! [`TaskScheduler::drain_and_close`] when the last task settles.
//!
//! An output that already exists at submission time is skipped. The check is
//! a snapshot: two submissions of the same output before either finishes
//! both run. Builds are single-process so this only costs duplicate work.
//!
//! A failed task is recorded and never retried; the remaining tasks still
//! run, and the first failure is returned from `drain_and_close`.

use crate::imaging::{BackendError, ImageBackend, ResizeTask, execute_resize};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Resize to {} failed: {source}", output.display())]
    TaskFailed {
        output: PathBuf,
        #[source]
        source: BackendError,
    },
}

/// Progress notifications, sent on the optional event channel.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    Queued(ResizeTask),
    /// The output already existed when the task was submitted.
    Skipped(ResizeTask),
    Started(ResizeTask),
    Finished(ResizeTask),
    Failed { task: ResizeTask, error: String },
}

/// Totals for one scheduler lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerReport {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub peak_in_flight: usize,
}

#[derive(Default)]
struct State {
    queue: VecDeque<ResizeTask>,
    in_flight: usize,
    peak_in_flight: usize,
    completed: usize,
    skipped: usize,
    failures: Vec<(PathBuf, BackendError)>,
}

struct Shared {
    state: Mutex<State>,
    settled: Condvar,
    backend: Arc<dyn ImageBackend>,
    events: Option<Sender<TaskEvent>>,
    max_parallel: usize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: TaskEvent) {
        if let Some(events) = &self.events {
            // The receiver going away only silences progress output.
            let _ = events.send(event);
        }
    }

    /// Pop queued tasks up to the parallelism bound, marking them in flight.
    fn take_ready(&self) -> Vec<ResizeTask> {
        let mut state = self.lock();
        let mut ready = Vec::new();
        while state.in_flight < self.max_parallel {
            let Some(task) = state.queue.pop_front() else {
                break;
            };
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
            ready.push(task);
        }
        ready
    }
}

/// Run one task on a pool worker, then refill the pool from the queue.
fn run_task(shared: Arc<Shared>, task: ResizeTask) {
    shared.emit(TaskEvent::Started(task.clone()));
    log::debug!("resizing {task}");

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        execute_resize(shared.backend.as_ref(), &task)
    }))
    .unwrap_or_else(|_| {
        Err(BackendError::ProcessingFailed(format!(
            "resize of {} panicked",
            task.source.display()
        )))
    });

    let output = task.output.clone();
    match result {
        Ok(()) => {
            shared.emit(TaskEvent::Finished(task));
            let mut state = shared.lock();
            state.in_flight -= 1;
            state.completed += 1;
        }
        Err(e) => {
            log::error!("resize to {} failed: {}", output.display(), e);
            shared.emit(TaskEvent::Failed {
                task,
                error: e.to_string(),
            });
            let mut state = shared.lock();
            state.in_flight -= 1;
            state.failures.push((output, e));
        }
    }

    for next in shared.take_ready() {
        let shared = Arc::clone(&shared);
        rayon::spawn(move || run_task(shared, next));
    }
    shared.settled.notify_all();
}

pub struct TaskScheduler {
    pool: rayon::ThreadPool,
    shared: Arc<Shared>,
}

impl TaskScheduler {
    /// `max_parallel` below 1 is treated as 1.
    pub fn new(
        max_parallel: usize,
        backend: Arc<dyn ImageBackend>,
        events: Option<Sender<TaskEvent>>,
    ) -> Result<Self, SchedulerError> {
        let max_parallel = max_parallel.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_parallel)
            .thread_name(|i| format!("respimg-resize-{i}"))
            .build()?;
        Ok(Self {
            pool,
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                settled: Condvar::new(),
                backend,
                events,
                max_parallel,
            }),
        })
    }

    pub fn max_parallel(&self) -> usize {
        self.shared.max_parallel
    }

    /// Queue tasks whose outputs do not exist yet and start launching.
    pub fn submit(&self, tasks: impl IntoIterator<Item = ResizeTask>) {
        {
            let mut state = self.shared.lock();
            for task in tasks {
                if task.output.exists() {
                    state.skipped += 1;
                    self.shared.emit(TaskEvent::Skipped(task));
                } else {
                    self.shared.emit(TaskEvent::Queued(task.clone()));
                    state.queue.push_back(task);
                }
            }
        }
        for task in self.shared.take_ready() {
            let shared = Arc::clone(&self.shared);
            self.pool.spawn(move || run_task(shared, task));
        }
    }

    /// Block until the queue is empty and nothing is in flight.
    pub fn drain_and_close(self) -> Result<SchedulerReport, SchedulerError> {
        let mut state = self.shared.lock();
        while !(state.queue.is_empty() && state.in_flight == 0) {
            state = self
                .shared
                .settled
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let report = SchedulerReport {
            completed: state.completed,
            skipped: state.skipped,
            failed: state.failures.len(),
            peak_in_flight: state.peak_in_flight,
        };
        let failures = std::mem::take(&mut state.failures);
        drop(state);

        match failures.into_iter().next() {
            Some((output, source)) => Err(SchedulerError::TaskFailed { output, source }),
            None => Ok(report),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, task};
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn out(tmp: &TempDir, name: &str) -> String {
        tmp.path().join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn never_exceeds_max_parallel() {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(MockBackend::new().with_resize_delay(Duration::from_millis(20)));
        let scheduler = TaskScheduler::new(3, backend.clone(), None).unwrap();

        scheduler.submit((0..12).map(|i| task(&out(&tmp, &format!("{i}.jpg")))));
        let report = scheduler.drain_and_close().unwrap();

        assert_eq!(report.completed, 12);
        assert!(backend.peak_in_flight() <= 3, "peak {}", backend.peak_in_flight());
        assert!(report.peak_in_flight <= 3);
        assert_eq!(backend.resize_outputs().len(), 12);
    }

    #[test]
    fn single_slot_runs_in_submission_order() {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(MockBackend::new());
        let scheduler = TaskScheduler::new(1, backend.clone(), None).unwrap();

        let names: Vec<String> = (0..6).map(|i| out(&tmp, &format!("{i}.jpg"))).collect();
        scheduler.submit(names.iter().map(|n| task(n)));
        scheduler.drain_and_close().unwrap();

        assert_eq!(backend.resize_outputs(), names);
    }

    #[test]
    fn submissions_accumulate_across_calls() {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(MockBackend::new());
        let scheduler = TaskScheduler::new(2, backend.clone(), None).unwrap();

        scheduler.submit(vec![task(&out(&tmp, "a.jpg"))]);
        scheduler.submit(vec![task(&out(&tmp, "b.jpg")), task(&out(&tmp, "c.jpg"))]);
        let report = scheduler.drain_and_close().unwrap();

        assert_eq!(report.completed, 3);
    }

    #[test]
    fn existing_outputs_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let existing = out(&tmp, "done.jpg");
        std::fs::write(&existing, b"").unwrap();
        let backend = Arc::new(MockBackend::new());
        let scheduler = TaskScheduler::new(2, backend.clone(), None).unwrap();

        scheduler.submit(vec![task(&existing), task(&out(&tmp, "new.jpg"))]);
        let report = scheduler.drain_and_close().unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.completed, 1);
        assert_eq!(backend.resize_outputs(), vec![out(&tmp, "new.jpg")]);
    }

    #[test]
    fn failure_is_reported_and_others_still_run() {
        let tmp = TempDir::new().unwrap();
        let backend = Arc::new(MockBackend::new());
        backend.fail_output(out(&tmp, "b.jpg"));
        let scheduler = TaskScheduler::new(1, backend.clone(), None).unwrap();

        scheduler.submit(["a.jpg", "b.jpg", "c.jpg"].map(|n| task(&out(&tmp, n))));
        let err = scheduler.drain_and_close().unwrap_err();

        match err {
            SchedulerError::TaskFailed { output, .. } => {
                assert_eq!(output, tmp.path().join("b.jpg"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(backend.resize_outputs().len(), 3);
    }

    #[test]
    fn drain_with_nothing_submitted() {
        let backend = Arc::new(MockBackend::new());
        let scheduler = TaskScheduler::new(4, backend, None).unwrap();
        assert_eq!(scheduler.drain_and_close().unwrap(), SchedulerReport::default());
    }

    #[test]
    fn zero_parallelism_is_clamped() {
        let backend = Arc::new(MockBackend::new());
        let scheduler = TaskScheduler::new(0, backend, None).unwrap();
        assert_eq!(scheduler.max_parallel(), 1);
    }

    #[test]
    fn events_follow_task_lifecycle() {
        let tmp = TempDir::new().unwrap();
        let existing = out(&tmp, "done.jpg");
        std::fs::write(&existing, b"").unwrap();
        let backend = Arc::new(MockBackend::new());
        backend.fail_output(out(&tmp, "bad.jpg"));
        let (tx, rx) = mpsc::channel();
        let scheduler = TaskScheduler::new(1, backend, Some(tx)).unwrap();

        scheduler.submit(vec![
            task(&out(&tmp, "ok.jpg")),
            task(&existing),
            task(&out(&tmp, "bad.jpg")),
        ]);
        assert!(scheduler.drain_and_close().is_err());

        let kinds: Vec<&str> = rx
            .try_iter()
            .map(|e| match e {
                TaskEvent::Queued(_) => "queued",
                TaskEvent::Skipped(_) => "skipped",
                TaskEvent::Started(_) => "started",
                TaskEvent::Finished(_) => "finished",
                TaskEvent::Failed { .. } => "failed",
            })
            .collect();
        assert_eq!(kinds.iter().filter(|k| **k == "queued").count(), 2);
        assert_eq!(kinds.iter().filter(|k| **k == "skipped").count(), 1);
        assert_eq!(kinds.iter().filter(|k| **k == "started").count(), 2);
        assert_eq!(kinds.iter().filter(|k| **k == "finished").count(), 1);
        assert_eq!(kinds.iter().filter(|k| **k == "failed").count(), 1);
    }
}
