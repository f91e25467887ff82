//! Session lifecycle state
//!
//! Host lifecycle callbacks and render-surface callbacks both advance the
//! same state machine. The phase moves forward on the render thread; a small
//! set of atomic flags carries the cross-thread gates: whether stepping is
//! allowed, whether the host wants the session running, and whether a fault
//! froze everything.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Externally observable session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Core constructed, waiting for the first render surface
    Created,
    /// Surface attached, game load in progress
    SurfaceReady,
    /// Game loaded but not stepping
    GameLoaded,
    /// Stepping one frame per tick
    Resumed,
    /// Stepping suspended until the next resume
    Paused,
    /// Torn down, terminal
    Destroyed,
    /// Frozen by a core fault, terminal
    Aborted,
}

/// Lifecycle state shared between the host threads and the render thread.
pub struct Lifecycle {
    phase: Mutex<LifecyclePhase>,
    /// Monotonic fault flag; once set the stored phase no longer matters
    aborted: Arc<AtomicBool>,
    /// Gates the per-frame step
    ready: Arc<AtomicBool>,
    /// Host-requested run state, applied once the game is loaded
    want_resumed: AtomicBool,
    /// One-shot guard around game loading
    game_loaded: AtomicBool,
    destroyed: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(LifecyclePhase::Created),
            aborted: Arc::new(AtomicBool::new(false)),
            ready: Arc::new(AtomicBool::new(false)),
            want_resumed: AtomicBool::new(false),
            game_loaded: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Current phase. Reports `Aborted` once the abort flag is set,
    /// whatever phase was stored before the fault.
    pub fn phase(&self) -> LifecyclePhase {
        if self.aborted.load(Ordering::Acquire) {
            return LifecyclePhase::Aborted;
        }
        *self.phase.lock()
    }

    pub fn set_phase(&self, phase: LifecyclePhase) {
        let mut current = self.phase.lock();
        if *current != phase {
            tracing::info!("Lifecycle: {:?} -> {:?}", *current, phase);
            *current = phase;
        }
    }

    /// Abort flag handle, shared with the fault guard.
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.aborted)
    }

    /// Ready flag handle, shared with the frame tick.
    pub fn ready_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.ready)
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn set_want_resumed(&self, wanted: bool) {
        self.want_resumed.store(wanted, Ordering::Release);
    }

    pub fn wants_resume(&self) -> bool {
        self.want_resumed.load(Ordering::Acquire)
    }

    pub fn mark_game_loaded(&self) {
        self.game_loaded.store(true, Ordering::Release);
    }

    pub fn is_game_loaded(&self) -> bool {
        self.game_loaded.load(Ordering::Acquire)
    }

    /// Claim teardown. Only the first caller gets `true`.
    pub fn begin_destroy(&self) -> bool {
        !self.destroyed.swap(true, Ordering::AcqRel)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
