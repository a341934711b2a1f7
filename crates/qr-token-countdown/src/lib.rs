#![warn(missing_docs)]
//! # qr-token-countdown
//!
//! ## Purpose
//! Tracks how long a token remains valid and signals its expiration exactly
//! once.
//!
//! ## Responsibilities
//! - Derive remaining seconds and progress from an absolute expiration instant.
//! - Model the `Active -> Expiring -> Inert` lifecycle with explicit
//!   transitions.
//! - Drive the lifecycle from a cancellable one-second timer task.
//!
//! ## Data flow
//! Display mounts a token -> [`Countdown::activate`] captures the initial
//! window -> [`CountdownTimer::spawn`] ticks once per second and emits
//! [`CountdownEvent`]s tagged with the owner's generation.
//!
//! ## Ownership and lifetimes
//! The timer task owns its [`Countdown`]. The caller owns only the
//! [`CountdownTimer`] handle; dropping it aborts the task.
//!
//! ## Example
//! ```rust
//! use qr_token_countdown::{Countdown, CountdownPhase};
//!
//! let mut countdown = Countdown::activate(1_000, 999_000);
//! assert_eq!(countdown.remaining_seconds(), 1);
//! countdown.tick();
//! assert_eq!(countdown.phase(), CountdownPhase::Expiring);
//! assert!(countdown.take_expiration());
//! assert!(!countdown.take_expiration());
//! ```

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Interval between countdown ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Lifecycle phase of one countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownPhase {
    /// Ticking once per second.
    Active,
    /// Reached zero; expiration signal not yet consumed.
    Expiring,
    /// Expiration signal consumed; no further transitions.
    Inert,
}

/// Snapshot of remaining time used for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountdownState {
    /// Whole seconds left.
    pub remaining_seconds: u64,
    /// Share of the validity window left, in `[0, 100]`.
    pub progress_percent: f64,
}

/// Countdown state machine for one token.
#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    remaining_seconds: u64,
    total_seconds: u64,
    phase: CountdownPhase,
}

impl Countdown {
    /// Activates a countdown for a token expiring at `expires_at` unix
    /// seconds, observed at `now_ms` unix milliseconds.
    ///
    /// A window that is already closed starts in [`CountdownPhase::Expiring`].
    pub fn activate(expires_at: i64, now_ms: i64) -> Self {
        let remaining_ms = expires_at.saturating_mul(1_000).saturating_sub(now_ms);
        let remaining_seconds = u64::try_from(remaining_ms.div_euclid(1_000)).unwrap_or(0);
        let phase = if remaining_seconds == 0 {
            CountdownPhase::Expiring
        } else {
            CountdownPhase::Active
        };

        Self {
            remaining_seconds,
            total_seconds: remaining_seconds,
            phase,
        }
    }

    /// Returns current phase.
    pub fn phase(&self) -> CountdownPhase {
        self.phase
    }

    /// Returns whole seconds left.
    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    /// Returns the window length captured at activation.
    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    /// Returns `100 * remaining / total`, or `0` for an empty window.
    pub fn progress_percent(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        100.0 * self.remaining_seconds as f64 / self.total_seconds as f64
    }

    /// Returns a rendering snapshot.
    pub fn state(&self) -> CountdownState {
        CountdownState {
            remaining_seconds: self.remaining_seconds,
            progress_percent: self.progress_percent(),
        }
    }

    /// Advances one second.
    ///
    /// Decrementing from 1 stops the countdown at 0 and enters
    /// [`CountdownPhase::Expiring`]. Ticks outside `Active` are ignored.
    pub fn tick(&mut self) {
        if self.phase != CountdownPhase::Active {
            return;
        }

        if self.remaining_seconds <= 1 {
            self.remaining_seconds = 0;
            self.phase = CountdownPhase::Expiring;
        } else {
            self.remaining_seconds -= 1;
        }
    }

    /// Consumes the pending expiration signal.
    ///
    /// Returns `true` exactly once per countdown, on the call that moves
    /// `Expiring` to `Inert`.
    pub fn take_expiration(&mut self) -> bool {
        if self.phase == CountdownPhase::Expiring {
            self.phase = CountdownPhase::Inert;
            true
        } else {
            false
        }
    }
}

/// Event emitted by a running [`CountdownTimer`].
#[derive(Debug, Clone, PartialEq)]
pub enum CountdownEvent {
    /// One second elapsed.
    Tick {
        /// Generation of the owner that spawned the timer.
        generation: u64,
        /// State after the tick.
        state: CountdownState,
    },
    /// Countdown reached zero. Sent once, after the final tick.
    Expired {
        /// Generation of the owner that spawned the timer.
        generation: u64,
    },
}

impl CountdownEvent {
    /// Returns the generation tag carried by the event.
    pub fn generation(&self) -> u64 {
        match self {
            Self::Tick { generation, .. } | Self::Expired { generation } => *generation,
        }
    }
}

/// Handle to a timer task driving one [`Countdown`].
///
/// Dropping the handle aborts the task; no event is produced afterwards.
#[derive(Debug)]
pub struct CountdownTimer {
    generation: u64,
    task: JoinHandle<()>,
}

impl CountdownTimer {
    /// Spawns a timer on the current tokio runtime.
    ///
    /// An already-expired countdown emits `Expired` immediately without
    /// waiting for a tick.
    pub fn spawn(
        mut countdown: Countdown,
        generation: u64,
        events: UnboundedSender<CountdownEvent>,
    ) -> Self {
        let task = tokio::spawn(async move {
            if countdown.take_expiration() {
                let _ = events.send(CountdownEvent::Expired { generation });
                return;
            }

            let mut interval = tokio::time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                countdown.tick();

                let tick = CountdownEvent::Tick {
                    generation,
                    state: countdown.state(),
                };
                if events.send(tick).is_err() {
                    tracing::debug!(generation, "countdown receiver dropped");
                    return;
                }

                if countdown.take_expiration() {
                    tracing::debug!(generation, "countdown expired");
                    let _ = events.send(CountdownEvent::Expired { generation });
                    return;
                }
            }
        });

        Self { generation, task }
    }

    /// Returns the generation tag this timer emits.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` once the task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for countdown transitions.

    use super::*;

    #[test]
    fn activation_floors_partial_seconds() {
        let countdown = Countdown::activate(1_300, 1_000_500);
        assert_eq!(countdown.remaining_seconds(), 299);
        assert_eq!(countdown.total_seconds(), 299);
        assert_eq!(countdown.progress_percent(), 100.0);
        assert_eq!(countdown.phase(), CountdownPhase::Active);
    }

    #[test]
    fn past_expiration_starts_expiring_with_zero_progress() {
        let mut countdown = Countdown::activate(10, 20_000);
        assert_eq!(countdown.remaining_seconds(), 0);
        assert_eq!(countdown.progress_percent(), 0.0);
        assert_eq!(countdown.phase(), CountdownPhase::Expiring);
        assert!(countdown.take_expiration());
        assert_eq!(countdown.phase(), CountdownPhase::Inert);
    }

    #[test]
    fn ticks_after_inert_are_ignored() {
        let mut countdown = Countdown::activate(2, 0);
        countdown.tick();
        countdown.tick();
        assert!(countdown.take_expiration());
        countdown.tick();
        assert_eq!(countdown.remaining_seconds(), 0);
        assert!(!countdown.take_expiration());
    }
}
