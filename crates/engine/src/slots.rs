//! In-flight admission slots.
//!
//! A slot is held by a task from admission until its terminal transition.
//! Slots are keyed by task id, so releasing twice for the same task can never
//! free somebody else's slot.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use vidgen_core::TaskId;

pub struct InFlightSlots {
    max: usize,
    held: Mutex<HashSet<TaskId>>,
}

impl InFlightSlots {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            held: Mutex::new(HashSet::with_capacity(max)),
        }
    }

    /// Take a slot for `id` if one is free. Returns `false` when at capacity
    /// or when `id` already holds a slot.
    pub fn try_acquire(&self, id: TaskId) -> bool {
        let mut held = self.lock();
        if held.len() >= self.max {
            return false;
        }
        held.insert(id)
    }

    /// Give back the slot held by `id`. Returns `false` if it held none.
    pub fn release(&self, id: TaskId) -> bool {
        self.lock().remove(&id)
    }

    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn available(&self) -> usize {
        self.max.saturating_sub(self.in_flight())
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<TaskId>> {
        // The set is never left half-updated, so a poisoned lock is still usable.
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
