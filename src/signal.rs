//! Rendezvous signal: a zero-capacity wake-up
//!
//! A notification is handed to a receiver that is parked at that instant,
//! or dropped. Nothing is ever queued, and the sender never blocks waiting
//! for a receiver to show up.
//!
//! Receivers register with [`Rendezvous::listen`]. The returned [`Listener`]
//! holds the signal lock until it parks, so any state the caller inspects
//! while holding it is checked atomically with respect to [`Rendezvous::try_notify`].

use std::collections::VecDeque;
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    /// Registered listeners not yet notified, oldest first.
    parked: VecDeque<u64>,
    /// Listeners that were handed a notification but have not woken yet.
    delivered: Vec<u64>,
}

impl State {
    fn take_delivery(&mut self, id: u64) -> bool {
        match self.delivered.iter().position(|&d| d == id) {
            Some(pos) => {
                self.delivered.swap_remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Wake-up notification delivered only to an already parked receiver.
#[derive(Debug, Default)]
pub struct Rendezvous {
    state: Mutex<State>,
    cond: Condvar,
}

impl Rendezvous {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands a notification to the longest-parked listener.
    ///
    /// Returns false without blocking when nobody is parked; the
    /// notification is then discarded.
    pub fn try_notify(&self) -> bool {
        let mut state = self.state.lock();
        match state.parked.pop_front() {
            Some(id) => {
                state.delivered.push(id);
                drop(state);
                self.cond.notify_all();
                true
            }
            None => false,
        }
    }

    /// Registers a receiver. It counts as parked from now on.
    ///
    /// # Deadlocks
    ///
    /// The listener holds this signal's lock until it parks or is dropped.
    /// Calling [`Rendezvous::try_notify`], [`Rendezvous::parked`] or
    /// `listen` on the same signal while holding it deadlocks the caller.
    pub fn listen(&self) -> Listener<'_> {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id = state.next_id.wrapping_add(1);
        state.parked.push_back(id);
        Listener {
            cond: &self.cond,
            state,
            id,
        }
    }

    /// Parks until notified.
    pub fn wait(&self) {
        self.listen().wait();
    }

    /// Number of listeners currently parked.
    pub fn parked(&self) -> usize {
        self.state.lock().parked.len()
    }
}

/// A registered receiver on a [`Rendezvous`].
///
/// Dropping it without waiting deregisters it.
pub struct Listener<'a> {
    cond: &'a Condvar,
    state: MutexGuard<'a, State>,
    id: u64,
}

impl Listener<'_> {
    /// Parks until a notification is delivered to this listener.
    pub fn wait(mut self) {
        while !self.state.take_delivery(self.id) {
            self.cond.wait(&mut self.state);
        }
    }

    /// Parks until notified or until `deadline` passes.
    ///
    /// Returns true if notified. A delivery that raced the deadline still
    /// counts.
    pub fn wait_until(mut self, deadline: Instant) -> bool {
        loop {
            if self.state.take_delivery(self.id) {
                return true;
            }
            if self.cond.wait_until(&mut self.state, deadline).timed_out() {
                return self.state.take_delivery(self.id);
            }
        }
    }
}

impl Drop for Listener<'_> {
    fn drop(&mut self) {
        let id = self.id;
        self.state.parked.retain(|&p| p != id);
        self.state.delivered.retain(|&d| d != id);
    }
}
