//! Timer interface used for precommand timeouts.
//!
//! The gate only needs one-shot timers it can start, stop, and ask whether
//! they are still pending. [`TokioScheduler`] provides them on top of the tokio
//! timer wheel; tests or embedders with their own event loop can supply
//! another [`Scheduler`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Callback run when a timer fires.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// A one-shot timer created by a [`Scheduler`].
pub trait Timer: Send {
    /// Arms the timer. Calling `start` on a started or stopped timer does nothing.
    fn start(&mut self);

    /// Disarms the timer. Once `stop` returns, the callback will not run.
    fn stop(&mut self);

    /// Returns `true` while the timer is armed and has not fired yet.
    fn is_running(&self) -> bool;
}

/// Creates timers.
pub trait Scheduler: Send + Sync + 'static {
    /// Creates a stopped timer that runs `on_fire` once `after` has elapsed
    /// following [`Timer::start`].
    fn create_timer(&self, after: Duration, on_fire: TimerCallback) -> Box<dyn Timer>;
}

/// A shared scheduler trait object.
pub type BoxedScheduler = Arc<dyn Scheduler>;

// =============================================================================
// Tokio implementation
// =============================================================================

/// [`Scheduler`] backed by `tokio::time`.
///
/// Timers are spawned onto the current tokio runtime when started, so
/// [`Timer::start`] must be called from within a runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    /// Creates a new scheduler.
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for TokioScheduler {
    fn create_timer(&self, after: Duration, on_fire: TimerCallback) -> Box<dyn Timer> {
        Box::new(TokioTimer {
            after,
            on_fire: Some(on_fire),
            token: CancellationToken::new(),
            running: Arc::new(AtomicBool::new(false)),
        })
    }
}

struct TokioTimer {
    after: Duration,
    on_fire: Option<TimerCallback>,
    token: CancellationToken,
    /// Cleared by whichever of `stop` and the sleep finishes first.
    running: Arc<AtomicBool>,
}

impl Timer for TokioTimer {
    fn start(&mut self) {
        let Some(on_fire) = self.on_fire.take() else {
            return;
        };

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let token = self.token.clone();
        let after = self.after;

        tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(after) => {
                    if running.swap(false, Ordering::SeqCst) {
                        trace!(?after, "Timer fired");
                        on_fire();
                    }
                }
                () = token.cancelled() => {}
            }
        });
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.on_fire = None;
        self.token.cancel();
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
