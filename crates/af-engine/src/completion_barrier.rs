// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-flag rendezvous between the static and dynamic analysis pipelines
//! (§4.10). Whichever pipeline sets the second flag fires the downstream
//! callback exactly once; the callback itself runs detached so its
//! failure never feeds back into either pipeline's own completion path.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

#[derive(Debug, Default)]
struct BarrierState {
    static_completed: bool,
    dynamic_completed: bool,
    fired: bool,
}

/// Per-task completion barrier. Cheap to clone; every clone shares the
/// same underlying flags.
#[derive(Clone, Default)]
pub struct CompletionBarrier {
    state: Arc<Mutex<BarrierState>>,
}

impl CompletionBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark static analysis complete and, if dynamic analysis already
    /// completed and the callback has not already fired, spawn it.
    ///
    /// Returns `true` only on the call that actually triggers the callback
    /// (useful for tests; production callers can ignore the return value).
    pub fn mark_static_completed<F, Fut>(&self, on_both_complete: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let should_fire = {
            let mut state = self.state.lock();
            state.static_completed = true;
            let both_done = state.static_completed && state.dynamic_completed;
            let fire_now = both_done && !state.fired;
            if fire_now {
                state.fired = true;
            }
            fire_now
        };
        if should_fire {
            tokio::spawn(async move {
                on_both_complete().await;
            });
        }
        should_fire
    }

    pub fn mark_dynamic_completed<F, Fut>(&self, on_both_complete: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let should_fire = {
            let mut state = self.state.lock();
            state.dynamic_completed = true;
            let both_done = state.static_completed && state.dynamic_completed;
            let fire_now = both_done && !state.fired;
            if fire_now {
                state.fired = true;
            }
            fire_now
        };
        if should_fire {
            tokio::spawn(async move {
                on_both_complete().await;
            });
        }
        should_fire
    }

    pub fn is_complete(&self) -> bool {
        let state = self.state.lock();
        state.static_completed && state.dynamic_completed
    }
}

#[cfg(test)]
#[path = "completion_barrier_tests.rs"]
mod tests;
