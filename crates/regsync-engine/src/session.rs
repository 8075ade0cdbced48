//! Sync sessions: the bounded worker pool and its dispatcher.
//!
//! A session owns a fresh copy-task queue, status queue, and slot array.
//! One dispatcher task pulls copy instructions off the queue and assigns
//! each to a free worker slot; a slot is reused only after its previous
//! occupant has been joined, which bounds live concurrency at exactly the
//! pool size. Queue, status log, and the production-finished flag share a
//! single lock with the cancellation drain.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use regsync_core::CancelToken;
use regsync_store::{CopyObjectRequest, ObjectStore};

/// Pause between slot scans when every slot is occupied and running.
const SLOT_SCAN_WAIT: Duration = Duration::from_millis(100);

/// Longer pause when the queue is momentarily empty but the producer has
/// not finished yet.
const EMPTY_QUEUE_WAIT: Duration = Duration::from_secs(1);

/// Queue and flag state guarded by the session's single lock.
#[derive(Debug, Default)]
struct SessionState {
    tasks: VecDeque<CopyObjectRequest>,
    outcomes: VecDeque<bool>,
    production_finished: bool,
}

/// State shared between the producer (planner), the dispatcher, the
/// workers, and the cancellation path.
#[derive(Debug)]
pub(crate) struct SessionShared {
    state: Mutex<SessionState>,
    task_ready: Notify,
    cancel: CancelToken,
}

impl SessionShared {
    fn new(cancel: CancelToken) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            task_ready: Notify::new(),
            cancel,
        }
    }

    fn push_task(&self, task: CopyObjectRequest) {
        self.state.lock().tasks.push_back(task);
        self.task_ready.notify_one();
    }

    fn try_pop(&self) -> Option<CopyObjectRequest> {
        self.state.lock().tasks.pop_front()
    }

    fn push_outcome(&self, success: bool) {
        self.state.lock().outcomes.push_back(success);
    }

    fn production_finished(&self) -> bool {
        self.state.lock().production_finished
    }

    fn finish_production(&self) {
        self.state.lock().production_finished = true;
        self.task_ready.notify_waiters();
    }

    /// Whether the dispatcher may exit: nothing more will be produced and
    /// the queue is observably empty.
    fn is_drained(&self) -> bool {
        let state = self.state.lock();
        state.production_finished && state.tasks.is_empty()
    }

    /// Cancellation drain: end production early and drop every task that
    /// has not been handed to a worker yet. In-flight copies finish.
    fn drain_for_cancel(&self) {
        let mut state = self.state.lock();
        state.production_finished = true;
        let dropped = state.tasks.len();
        state.tasks.clear();
        drop(state);
        if dropped > 0 {
            debug!(dropped, "cancellation cleared pending copy tasks");
        }
        self.task_ready.notify_waiters();
    }

    /// AND-reduce every recorded task outcome, draining the status queue.
    fn drain_outcomes(&self) -> bool {
        let mut state = self.state.lock();
        let mut all_ok = true;
        while let Some(outcome) = state.outcomes.pop_front() {
            all_ok &= outcome;
        }
        all_ok
    }
}

/// One execution of the worker-pool pipeline against a bounded unit of
/// work.
///
/// Lifecycle: [`SyncSession::new`] (fresh queues and slots),
/// [`SyncSession::start`] (launch the dispatcher), producer pushes tasks
/// via [`SyncSession::push_task`], then [`SyncSession::finalize`] joins
/// everything and reports the aggregate result. A session is consumed by
/// `finalize` and never reused.
#[derive(Debug)]
pub struct SyncSession {
    shared: Arc<SessionShared>,
    store: Arc<dyn ObjectStore>,
    pool_size: usize,
    dispatcher: Option<JoinHandle<()>>,
}

impl SyncSession {
    /// Create a session with fresh queues and `pool_size` worker slots.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, pool_size: usize, cancel: CancelToken) -> Self {
        Self {
            shared: Arc::new(SessionShared::new(cancel)),
            store,
            pool_size: pool_size.max(1),
            dispatcher: None,
        }
    }

    /// Launch the dispatcher. Tasks pushed before or after this call are
    /// both fine; the dispatcher waits for production to finish.
    pub fn start(&mut self) {
        let shared = Arc::clone(&self.shared);
        let store = Arc::clone(&self.store);
        let pool_size = self.pool_size;
        self.dispatcher = Some(tokio::spawn(run_dispatcher(shared, store, pool_size)));
    }

    /// Enqueue one copy instruction. Never blocks.
    pub fn push_task(&self, task: CopyObjectRequest) {
        self.shared.push_task(task);
    }

    /// Mark production finished, join the dispatcher (which joins every
    /// worker), and AND-reduce the status queue.
    ///
    /// A session during which cancellation was requested reports failure
    /// even when every task succeeded.
    pub async fn finalize(mut self) -> bool {
        self.shared.finish_production();
        if let Some(handle) = self.dispatcher.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "dispatcher task failed");
                return false;
            }
        }
        let all_ok = self.shared.drain_outcomes();
        all_ok && !self.shared.cancel.is_cancelled()
    }
}

/// Dispatcher: owns the queue→slot handoff for one session.
async fn run_dispatcher(
    shared: Arc<SessionShared>,
    store: Arc<dyn ObjectStore>,
    pool_size: usize,
) {
    debug!(pool_size, "starting sync consumer");
    let mut slots: Vec<Option<JoinHandle<()>>> = (0..pool_size).map(|_| None).collect();

    loop {
        if shared.cancel.is_cancelled() {
            shared.drain_for_cancel();
        }
        if shared.is_drained() {
            break;
        }

        let Some(task) = shared.try_pop() else {
            if shared.production_finished() {
                // Drained; the loop head will observe it and exit.
                continue;
            }
            // Momentarily empty queue while the producer is still running:
            // back off for longer than the slot scan does.
            tokio::select! {
                () = shared.task_ready.notified() => {}
                () = tokio::time::sleep(EMPTY_QUEUE_WAIT) => {}
                () = shared.cancel.cancelled() => {}
            }
            continue;
        };

        let index = acquire_slot(&slots).await;
        if let Some(previous) = slots[index].take() {
            // Reusing a slot waits for its prior occupant, so no more than
            // pool_size copies ever run at once.
            let _ = previous.await;
        }
        let worker_shared = Arc::clone(&shared);
        let worker_store = Arc::clone(&store);
        slots[index] = Some(tokio::spawn(run_worker(worker_shared, worker_store, task)));
    }

    for slot in &mut slots {
        if let Some(occupant) = slot.take() {
            let _ = occupant.await;
        }
    }
    debug!("sync consumer finished");
}

/// Scan for a slot that is empty or whose occupant has finished, backing
/// off briefly between scans.
async fn acquire_slot(slots: &[Option<JoinHandle<()>>]) -> usize {
    loop {
        let free = slots
            .iter()
            .position(|slot| slot.as_ref().is_none_or(JoinHandle::is_finished));
        if let Some(index) = free {
            return index;
        }
        tokio::time::sleep(SLOT_SCAN_WAIT).await;
    }
}

/// One worker execution: perform the copy and record the outcome. The
/// status push happens under the session lock; the copy itself runs fully
/// in parallel with other slots.
async fn run_worker(
    shared: Arc<SessionShared>,
    store: Arc<dyn ObjectStore>,
    task: CopyObjectRequest,
) {
    debug!(
        key = %task.key,
        target_bucket = %task.target_bucket,
        "worker syncing key"
    );
    let success = match store.copy_object(&task).await {
        Ok(()) => {
            debug!(key = %task.key, "worker finished syncing key");
            true
        }
        Err(e) => {
            error!(
                key = %task.key,
                target_bucket = %task.target_bucket,
                error = %e,
                "object copy failed"
            );
            false
        }
    };
    shared.push_outcome(success);
}
