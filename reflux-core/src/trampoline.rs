// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Work-in-progress counter that serializes re-entrant signals into a loop.
//!
//! An operator that reacts to "continue" signals (a source completed, demand changed)
//! would naturally call itself recursively: subscribing the next source may complete
//! it synchronously, which subscribes the next one, and so on until the stack
//! overflows. A [`Trampoline`] turns those calls into iterations instead. Every
//! signal increments an atomic counter. Only the caller that moves it from zero runs
//! the step function, and it keeps running it until the counter drops back to zero.
//! Every other caller only increments and returns.
//!
//! The state handed to the step function is therefore touched by one thread at a
//! time, without a lock: exclusive access follows from winning the 0 → 1 transition.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Outcome of one step of a drain loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Step done; keep looping while signals are pending
    Continue,
    /// Leave immediately and never drain again
    Halt,
}

/// Drain-loop state guarded by a work-in-progress counter.
///
/// After a step returns [`Drain::Halt`] the counter never returns to zero, so the
/// trampoline stays closed: later signals are absorbed without running any step.
/// Operators halt once they have delivered a terminal signal or seen a cancel.
pub struct Trampoline<S> {
    wip: AtomicUsize,
    state: UnsafeCell<S>,
}

// SAFETY: `state` is only reached through `step`/`fast` closures, which run on the
// single thread that moved `wip` away from zero, so `S` only needs to move between
// threads, never to be shared.
unsafe impl<S: Send> Send for Trampoline<S> {}
unsafe impl<S: Send> Sync for Trampoline<S> {}

impl<S> Trampoline<S> {
    /// Creates an idle trampoline owning `state`.
    pub const fn new(state: S) -> Self {
        Self {
            wip: AtomicUsize::new(0),
            state: UnsafeCell::new(state),
        }
    }

    /// Records one signal and, if no other caller is draining, runs `step` once per
    /// pending signal.
    ///
    /// Use this when each signal stands for one unit of work that must not be merged
    /// with others, such as "the current source completed, subscribe the next one".
    pub fn signal<F>(&self, mut step: F)
    where
        F: FnMut(&mut S) -> Drain,
    {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        loop {
            if step(self.state_mut()) == Drain::Halt {
                return;
            }
            if self.wip.fetch_sub(1, Ordering::AcqRel) == 1 {
                return;
            }
        }
    }

    /// Records one signal and, if no other caller is draining, runs `step` until no
    /// signal is pending. Signals that arrive during a step are folded into a single
    /// further step.
    pub fn drain<F>(&self, step: F)
    where
        F: FnMut(&mut S) -> Drain,
    {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        self.drain_loop(step);
    }

    /// Fast path: if nobody is draining, runs `fast` with exclusive access and
    /// returns its result, then drains whatever signals arrived meanwhile with `step`.
    ///
    /// Returns `None` without running anything when another caller is draining; the
    /// caller must then park its update where `step` will find it and call
    /// [`drain`](Self::drain).
    pub fn try_enter<R, F, G>(&self, fast: F, step: G) -> Option<R>
    where
        F: FnOnce(&mut S) -> R,
        G: FnMut(&mut S) -> Drain,
    {
        if self
            .wip
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let result = fast(self.state_mut());
        if self.wip.fetch_sub(1, Ordering::AcqRel) != 1 {
            self.drain_loop(step);
        }
        Some(result)
    }

    fn drain_loop<F>(&self, mut step: F)
    where
        F: FnMut(&mut S) -> Drain,
    {
        let mut missed = 1;
        loop {
            if step(self.state_mut()) == Drain::Halt {
                return;
            }
            missed = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if missed == 0 {
                return;
            }
        }
    }

    #[allow(clippy::mut_from_ref)]
    fn state_mut(&self) -> &mut S {
        // SAFETY: only called by the thread that moved `wip` from zero and before it
        // brings `wip` back to zero. Re-entrant calls from inside a step see a
        // non-zero counter and return before reaching this point, so no second
        // reference can exist.
        unsafe { &mut *self.state.get() }
    }
}
