//! Trailing-edge debounce with a max-wait ceiling.
//!
//! A plain state machine driven by the caller's clock: callers ask for the
//! [`Debounce::deadline`], sleep until it, then [`Debounce::poll`]. Calls that
//! arrive while an execution is running are queued and turn into exactly one
//! follow-up once [`Debounce::complete`] is reported.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Pending {
        first_call: Instant,
        last_call: Instant,
    },
    Executing {
        queued: Option<(Instant, Instant)>,
    },
}

#[derive(Debug, Clone)]
pub struct Debounce {
    wait: Duration,
    max_wait: Duration,
    state: DebounceState,
}

impl Debounce {
    /// `max_wait` below `wait` is raised to `wait`.
    pub fn new(wait: Duration, max_wait: Duration) -> Self {
        Self {
            wait,
            max_wait: max_wait.max(wait),
            state: DebounceState::Idle,
        }
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, DebounceState::Pending { .. })
    }

    pub fn is_executing(&self) -> bool {
        matches!(self.state, DebounceState::Executing { .. })
    }

    /// Record a request.
    pub fn call(&mut self, now: Instant) {
        self.state = match self.state {
            DebounceState::Idle => DebounceState::Pending {
                first_call: now,
                last_call: now,
            },
            DebounceState::Pending { first_call, .. } => DebounceState::Pending {
                first_call,
                last_call: now,
            },
            DebounceState::Executing { queued } => DebounceState::Executing {
                queued: Some((queued.map(|(first, _)| first).unwrap_or(now), now)),
            },
        };
    }

    /// When the pending execution becomes due. `None` unless pending.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            DebounceState::Pending {
                first_call,
                last_call,
            } => Some((last_call + self.wait).min(first_call + self.max_wait)),
            _ => None,
        }
    }

    /// Start executing if the deadline has passed. Returns true when the caller
    /// should run the action now.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.state = DebounceState::Executing { queued: None };
                true
            }
            _ => false,
        }
    }

    /// Execute a pending request immediately.
    pub fn flush(&mut self) -> bool {
        if self.is_pending() {
            self.state = DebounceState::Executing { queued: None };
            true
        } else {
            false
        }
    }

    /// Report that the execution finished. Requests queued meanwhile become pending.
    pub fn complete(&mut self) {
        if let DebounceState::Executing { queued } = self.state {
            self.state = match queued {
                Some((first_call, last_call)) => DebounceState::Pending {
                    first_call,
                    last_call,
                },
                None => DebounceState::Idle,
            };
        }
    }

    /// Drop any pending or queued request.
    pub fn cancel(&mut self) {
        self.state = DebounceState::Idle;
    }
}
