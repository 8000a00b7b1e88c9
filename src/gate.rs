//! Reader/writer admission gate for a single file handle.
//!
//! Any number of readers may be inside the gate at once, or exactly one
//! writer, never both. The gate is deliberately *unfair*: an arriving reader
//! only checks for an active writer, never for a waiting one, so a
//! continuous stream of overlapping readers can hold a writer off
//! indefinitely. Callers that need fairness should serialize readers
//! themselves.

use parking_lot::{Condvar, Mutex};

#[derive(Debug, Default)]
struct GateState {
    readers: usize,
    writer: bool,
}

/// N-readers-or-one-writer admission gate.
///
/// All waits are blocking and unbounded; there are no timeouts and no
/// cancellation. One `RwGate` belongs to exactly one handle and is never
/// shared across handles.
#[derive(Debug, Default)]
pub struct RwGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl RwGate {
    /// Create a gate in its initial unlocked state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter as a reader. Blocks while a writer is inside.
    pub fn enter_reader(&self) {
        let mut state = self.state.lock();
        while state.writer {
            self.cond.wait(&mut state);
        }
        state.readers += 1;
    }

    /// Exit as a reader. The last reader out wakes any waiting writers.
    pub fn exit_reader(&self) {
        let mut state = self.state.lock();
        state.readers -= 1;
        if state.readers == 0 {
            self.cond.notify_all();
        }
    }

    /// Enter as the exclusive writer. Blocks while any reader or another
    /// writer is inside.
    pub fn enter_writer(&self) {
        let mut state = self.state.lock();
        while state.writer || state.readers > 0 {
            self.cond.wait(&mut state);
        }
        state.writer = true;
    }

    /// Exit as the writer, waking all waiters.
    pub fn exit_writer(&self) {
        let mut state = self.state.lock();
        state.writer = false;
        self.cond.notify_all();
    }
}
