//! Render thread executor
//!
//! All core callbacks happen on one dedicated thread. The executor owns that
//! thread and the core behind it: callers hand it closures, and the render
//! loop runs them in submission order between frame steps. Blocking calls are
//! answered through a condvar latch so any thread can query the core without
//! touching it directly.

use crate::core::RetroCore;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// Frame interval used before a session configures the refresh rate (60 FPS).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16667);

/// Work item executed on the render thread.
type Job = Box<dyn FnOnce(&EngineCell) + Send + 'static>;

/// Per-frame callback. Returns true when it stepped the core, which tells the
/// render loop to pace the next iteration instead of sleeping indefinitely.
type FrameTick = Box<dyn FnMut(&EngineCell) -> bool + Send + 'static>;

/// Shared cell holding the emulation core.
///
/// The lock is taken for the span of a single core callback. Closures that
/// need several callbacks take it once per callback rather than holding it
/// across executor calls, so a job may re-enter the executor without
/// deadlocking on its own core lock.
pub struct EngineCell {
    core: Mutex<Box<dyn RetroCore>>,
}

impl EngineCell {
    fn new(core: Box<dyn RetroCore>) -> Self {
        Self {
            core: Mutex::new(core),
        }
    }

    /// Run one callback against the core under the cell lock.
    pub fn with_core<R>(&self, f: impl FnOnce(&mut dyn RetroCore) -> R) -> R {
        let mut core = self.core.lock();
        f(core.as_mut())
    }
}

/// One-shot latch a blocking caller parks on until its job finishes.
struct CallSlot<R> {
    state: Mutex<SlotState<R>>,
    condvar: Condvar,
}

struct SlotState<R> {
    /// Set exactly once, by completion or by the job being dropped unexecuted
    finished: bool,
    value: Option<R>,
}

impl<R> CallSlot<R> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                finished: false,
                value: None,
            }),
            condvar: Condvar::new(),
        }
    }

    fn finish(&self, value: Option<R>) {
        let mut state = self.state.lock();
        state.finished = true;
        state.value = value;
        self.condvar.notify_all();
    }

    /// Block until the slot is finished. Robust against spurious wakeups.
    fn wait(&self) -> Option<R> {
        let mut state = self.state.lock();
        while !state.finished {
            self.condvar.wait(&mut state);
        }
        state.value.take()
    }
}

/// Releases a waiting caller no matter how its job ends.
///
/// The job closure owns the guard. If the closure runs to completion it
/// reports the produced value; if the closure panics or is dropped without
/// running (queue cleared during shutdown), the guard's drop reports `None`
/// so the caller never blocks forever.
struct CompletionGuard<R> {
    slot: Arc<CallSlot<R>>,
    completed: bool,
}

impl<R> CompletionGuard<R> {
    fn new(slot: Arc<CallSlot<R>>) -> Self {
        Self {
            slot,
            completed: false,
        }
    }

    fn complete(mut self, value: R) {
        self.completed = true;
        self.slot.finish(Some(value));
    }
}

impl<R> Drop for CompletionGuard<R> {
    fn drop(&mut self) {
        if !self.completed {
            self.slot.finish(None);
        }
    }
}

/// State shared between the executor handle and the render loop.
struct ExecutorShared {
    /// Pending jobs, drained in FIFO order each loop iteration
    queue: Mutex<VecDeque<Job>>,
    /// Signals new jobs and shutdown to the render loop
    condvar: Condvar,
    /// Once set, no further jobs are accepted
    shutdown: AtomicBool,
    /// The core, reachable only from render-loop context
    cell: EngineCell,
    /// Target spacing between frame ticks
    frame_interval: Mutex<Duration>,
    /// Installed per-frame callback, if any
    tick: Mutex<Option<FrameTick>>,
    /// Set when a new tick is installed, so an idle loop wakes to run it
    tick_changed: AtomicBool,
}

/// Owner of the render thread and the job queue feeding it.
pub struct RenderThreadExecutor {
    shared: Arc<ExecutorShared>,
    /// Identity of the spawned thread, used to detect re-entrant calls
    render_thread: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RenderThreadExecutor {
    /// Spawn the render thread around the given core.
    pub fn new(core: Box<dyn RetroCore>, frame_interval: Duration) -> Self {
        let shared = Arc::new(ExecutorShared {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
            cell: EngineCell::new(core),
            frame_interval: Mutex::new(frame_interval),
            tick: Mutex::new(None),
            tick_changed: AtomicBool::new(false),
        });

        let loop_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || render_loop(loop_shared));
        let render_thread = handle.thread().id();
        tracing::debug!("Render thread started");

        Self {
            shared,
            render_thread,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Queue a job for the render thread. Returns false once shutdown began.
    pub fn post(&self, f: impl FnOnce(&EngineCell) + Send + 'static) -> bool {
        if thread::current().id() == self.render_thread {
            // Already on the render thread; run in place so the effect is
            // ordered before anything queued afterwards.
            f(&self.shared.cell);
            return true;
        }
        self.post_job(Box::new(f))
    }

    /// Run a job on the render thread and block until it produces a value.
    ///
    /// Invoked from the render thread itself, the job runs inline; a queued
    /// round trip would deadlock against the loop that is executing us.
    /// Returns `None` when the executor shut down before the job could run.
    pub fn call<R, F>(&self, f: F) -> Option<R>
    where
        R: Send + 'static,
        F: FnOnce(&EngineCell) -> R + Send + 'static,
    {
        if thread::current().id() == self.render_thread {
            return Some(f(&self.shared.cell));
        }

        let slot = Arc::new(CallSlot::new());
        let guard = CompletionGuard::new(Arc::clone(&slot));
        // A rejected post drops the closure, which drops the guard, which
        // finishes the slot with None. Waiting is therefore always safe.
        self.post_job(Box::new(move |cell| {
            let value = f(cell);
            guard.complete(value);
        }));
        slot.wait()
    }

    /// Install the per-frame callback. At most one is active at a time.
    pub fn set_frame_tick(&self, tick: impl FnMut(&EngineCell) -> bool + Send + 'static) {
        *self.shared.tick.lock() = Some(Box::new(tick));
        // Flag and notify under the queue lock so a loop between its
        // predicate check and its park cannot miss the wakeup.
        let _queue = self.shared.queue.lock();
        self.shared.tick_changed.store(true, Ordering::Release);
        self.shared.condvar.notify_all();
    }

    /// Change the pacing interval between frame ticks.
    pub fn set_frame_interval(&self, interval: Duration) {
        *self.shared.frame_interval.lock() = interval;
    }

    /// Whether the calling thread is the render thread.
    pub fn on_render_thread(&self) -> bool {
        thread::current().id() == self.render_thread
    }

    fn post_job(&self, job: Job) -> bool {
        let mut queue = self.shared.queue.lock();
        if self.shared.shutdown.load(Ordering::Acquire) {
            return false;
        }
        queue.push_back(job);
        self.shared.condvar.notify_one();
        true
    }

    /// Stop the render thread and join it. Jobs still queued when the loop
    /// exits are dropped, releasing their callers. Idempotent.
    pub fn shutdown(&self) {
        let handle = self.handle.lock().take();
        let Some(handle) = handle else {
            return;
        };

        tracing::info!("Shutting down render thread");
        {
            // Same lock discipline as set_frame_tick: no waiter may park
            // after missing the flag.
            let _queue = self.shared.queue.lock();
            self.shared.shutdown.store(true, Ordering::Release);
            self.shared.condvar.notify_all();
        }

        if thread::current().id() == self.render_thread {
            // A render job cannot join its own thread. The loop exits after
            // the current job and the thread finishes detached.
            return;
        }
        if handle.join().is_err() {
            tracing::error!("Render thread terminated by panic");
        }
    }
}

impl Drop for RenderThreadExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn render_loop(shared: Arc<ExecutorShared>) {
    loop {
        // Drain pending jobs first so control operations are never starved
        // by frame stepping.
        loop {
            let job = shared.queue.lock().pop_front();
            match job {
                Some(job) => run_job(&shared, job),
                None => break,
            }
        }

        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }

        let frame_start = Instant::now();
        shared.tick_changed.store(false, Ordering::Release);
        let stepped = {
            let mut tick = shared.tick.lock();
            match tick.as_mut() {
                Some(tick) => tick(&shared.cell),
                None => false,
            }
        };

        if stepped {
            // Pace to the target interval, but wake early for new jobs.
            let deadline = frame_start + *shared.frame_interval.lock();
            let mut queue = shared.queue.lock();
            while queue.is_empty() && !shared.shutdown.load(Ordering::Acquire) {
                if shared.condvar.wait_until(&mut queue, deadline).timed_out() {
                    break;
                }
            }
        } else {
            // Nothing to step; sleep until a job, a new tick or shutdown
            // arrives.
            let mut queue = shared.queue.lock();
            while queue.is_empty()
                && !shared.shutdown.load(Ordering::Acquire)
                && !shared.tick_changed.load(Ordering::Acquire)
            {
                shared.condvar.wait(&mut queue);
            }
        }
    }

    // Unexecuted jobs still hold waiting callers. Drop them so their
    // completion guards release the waiters.
    let leftover: Vec<Job> = shared.queue.lock().drain(..).collect();
    let count = leftover.len();
    drop(leftover);
    if count > 0 {
        tracing::debug!("Dropped {} queued jobs during shutdown", count);
    }
    tracing::debug!("Render thread exited");
}

fn run_job(shared: &Arc<ExecutorShared>, job: Job) {
    // Containment of last resort. Guarded core calls catch their own panics
    // before this; a panic here still must not take the render loop down.
    let result = panic::catch_unwind(AssertUnwindSafe(|| job(&shared.cell)));
    if result.is_err() {
        tracing::error!("Render job panicked");
    }
}
