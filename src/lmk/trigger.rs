//! Debounced pressure trigger.
//!
//! The trigger is called on every pressure update. It schedules a decision
//! pass only when the magnitude reaches `pressure_max` and no pass is pending
//! or running; everything else is coalesced into the pass already in flight.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::sync::Arc;
use tracing::debug;

const IDLE: u8 = 0;
const PENDING: u8 = 1;
const RUNNING: u8 = 2;

/// Pass lifecycle shared by the trigger, the queue and running passes.
#[derive(Debug)]
struct PassState(AtomicU8);

impl PassState {
    fn load(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }

    fn store(&self, state: u8) {
        self.0.store(state, Ordering::Release);
    }
}

/// Pending-pass flag plus the sending half of the pass queue.
#[derive(Debug)]
pub struct PassTrigger {
    state: Arc<PassState>,
    queue: SyncSender<()>,
}

/// Receiving half, owned by the worker that runs passes.
#[derive(Debug)]
pub struct PassQueue {
    state: Arc<PassState>,
    queue: Receiver<()>,
}

/// Marks a pass as running; the trigger returns to idle when this is dropped.
#[derive(Debug)]
pub struct PassGuard {
    state: Arc<PassState>,
}

/// Creates a trigger and the queue its passes are delivered on.
pub fn channel() -> (Arc<PassTrigger>, PassQueue) {
    let (tx, rx) = mpsc::sync_channel(1);
    let state = Arc::new(PassState(AtomicU8::new(IDLE)));
    let trigger = Arc::new(PassTrigger {
        state: Arc::clone(&state),
        queue: tx,
    });
    (trigger, PassQueue { state, queue: rx })
}

impl PassTrigger {
    /// Handles one pressure update. Returns `true` if a pass was scheduled.
    pub fn on_pressure(&self, magnitude: u64, pressure_max: u64) -> bool {
        if magnitude < pressure_max {
            return false;
        }

        if self
            .state
            .0
            .compare_exchange(IDLE, PENDING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(magnitude, "pass already pending or running, coalescing");
            return false;
        }

        if self.queue.try_send(()).is_err() {
            // Worker gone: nothing will ever clear the flag otherwise.
            self.state.store(IDLE);
            return false;
        }

        debug!(magnitude, pressure_max, "decision pass scheduled");
        true
    }

    pub fn is_idle(&self) -> bool {
        self.state.load() == IDLE
    }

    pub fn is_running(&self) -> bool {
        self.state.load() == RUNNING
    }
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.state.store(IDLE);
    }
}

impl PassQueue {
    fn begin(&self) -> PassGuard {
        self.state.store(RUNNING);
        PassGuard {
            state: Arc::clone(&self.state),
        }
    }

    /// Blocks until a pass is scheduled. `None` once every trigger handle is gone.
    pub fn wait(&self) -> Option<PassGuard> {
        self.queue.recv().ok().map(|_| self.begin())
    }

    /// Non-blocking variant of [`PassQueue::wait`].
    pub fn try_wait(&self) -> Option<PassGuard> {
        match self.queue.try_recv() {
            Ok(()) => Some(self.begin()),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}
