//! Window Counter Store
//!
//! Fixed-window hit counters per scope. A window opens on the first hit after
//! the previous one expired and admits `capacity` units until it closes; bursts
//! at window boundaries are allowed, matching the remote enforcer.
//!
//! Uses `tokio::time::Instant` so tests can drive the clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::quota::{QuotaDescriptor, MAX_WINDOW_SECS};
use super::scope::ScopeKey;

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

/// Outcome of applying a hit to a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Whether the units were admitted
    pub allowed: bool,

    /// Units counted in the window after this hit
    pub count: u32,

    /// Units still available in the window
    pub remaining: u32,

    pub window_start: Instant,

    pub reset_at: Instant,
}

impl WindowHit {
    /// Time until the window closes
    pub fn retry_after(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Read-only view of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStats {
    pub count: u32,
    pub remaining: u32,
    /// Zero when no window is open
    pub resets_in: Duration,
}

/// Shared fixed-window counters
#[derive(Debug, Clone, Default)]
pub struct WindowCounterStore {
    windows: Arc<Mutex<HashMap<ScopeKey, WindowState>>>,
}

/// End of a window opened at `start`, never past the clock's range
fn window_end(start: Instant, descriptor: &QuotaDescriptor) -> Instant {
    start
        .checked_add(descriptor.window())
        .or_else(|| start.checked_add(Duration::from_secs(MAX_WINDOW_SECS)))
        .unwrap_or(start)
}

impl WindowCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `cost` units if the window has room; rejected hits are not counted
    pub fn hit(&self, key: &ScopeKey, descriptor: &QuotaDescriptor, cost: u32) -> WindowHit {
        self.apply(key, descriptor, cost, false)
    }

    /// Count `cost` units unconditionally, for calls that already happened
    pub fn consume(&self, key: &ScopeKey, descriptor: &QuotaDescriptor, cost: u32) -> WindowHit {
        self.apply(key, descriptor, cost, true)
    }

    fn apply(&self, key: &ScopeKey, descriptor: &QuotaDescriptor, cost: u32, force: bool) -> WindowHit {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        let state = windows.entry(key.clone()).or_insert(WindowState {
            count: 0,
            window_start: now,
        });

        if now >= window_end(state.window_start, descriptor) {
            state.count = 0;
            state.window_start = now;
        }

        let allowed = state.count.saturating_add(cost) <= descriptor.capacity();
        if allowed || force {
            state.count = state.count.saturating_add(cost);
        }

        WindowHit {
            allowed,
            count: state.count,
            remaining: descriptor.capacity().saturating_sub(state.count),
            window_start: state.window_start,
            reset_at: window_end(state.window_start, descriptor),
        }
    }

    /// Remove `cost` units from the current window, never below zero
    pub fn decrement(&self, key: &ScopeKey, cost: u32) {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = windows.get_mut(key) {
            state.count = state.count.saturating_sub(cost);
        }
    }

    /// Undo an admitted hit, unless its window has since been replaced
    pub fn revert(&self, key: &ScopeKey, hit: &WindowHit, cost: u32) {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = windows.get_mut(key) {
            if state.window_start == hit.window_start {
                state.count = state.count.saturating_sub(cost);
            }
        }
    }

    pub fn window_stats(&self, key: &ScopeKey, descriptor: &QuotaDescriptor) -> WindowStats {
        let now = Instant::now();
        let windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        match windows.get(key) {
            Some(state) if now < window_end(state.window_start, descriptor) => WindowStats {
                count: state.count,
                remaining: descriptor.capacity().saturating_sub(state.count),
                resets_in: window_end(state.window_start, descriptor).saturating_duration_since(now),
            },
            _ => WindowStats {
                count: 0,
                remaining: descriptor.capacity(),
                resets_in: Duration::ZERO,
            },
        }
    }

    /// Number of scopes with a window
    pub fn len(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
