//! The precondition gate run before command matching.
//!
//! Every precommand of every plugin must accept a message before any command
//! sees it. Synchronous checks answer immediately; deferred checks answer
//! through a [`Completion`], possibly long after they were started.
//!
//! # Modes
//!
//! - [`GateMode::Concurrent`] starts every check up front and waits for the
//!   answers in whatever order they arrive. The first `false` rejects the
//!   message at once; checks still running are not canceled, their answers
//!   are simply dropped.
//! - [`GateMode::Sequential`] runs the checks one after the other and stops
//!   at the first `false`.
//!
//! # Timeouts
//!
//! A deferred check with a timeout (its own, or the gate's default) that has
//! not completed in time counts as its default result. Whichever of the real
//! completion and the timeout comes first wins; the other is ignored.

use std::sync::{Arc, Weak};
use std::time::Duration;

use brass_core::{BoxedScheduler, Scheduler, Timer};
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::context::{TriggerContext, parse_bool_literal};
use crate::error::{DispatchError, DispatchResult};
use crate::route::PreCheck;
use crate::trigger::{PreCommandTrigger, TriggerLabel};

// ============================================================================
// Configuration
// ============================================================================

/// How precommands are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Start every check at once and reject on the first `false` to arrive.
    #[default]
    Concurrent,
    /// Run checks in registration order, stopping at the first `false`.
    Sequential,
}

/// Gate settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Evaluation mode.
    pub mode: GateMode,
    /// Timeout in milliseconds for deferred checks that declare none.
    pub default_timeout_ms: Option<u64>,
}

impl GateConfig {
    /// The default timeout as a [`Duration`].
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}

// ============================================================================
// Completion
// ============================================================================

struct CompletionState {
    sender: Option<oneshot::Sender<bool>>,
    timer: Option<Box<dyn Timer>>,
}

/// Reports the result of a deferred precommand check.
///
/// Cheap to clone; all clones share one result slot. The first call to
/// [`complete`](Self::complete) (or the timeout, if one is set) decides the
/// result. Dropping every clone without completing counts as the trigger's
/// default result.
#[derive(Clone)]
pub struct Completion {
    state: Arc<Mutex<CompletionState>>,
    label: TriggerLabel,
}

impl Completion {
    /// Creates a completion, arming a timer on `scheduler` when `timeout` is set.
    pub(crate) fn new(
        label: TriggerLabel,
        default: bool,
        timeout: Option<Duration>,
        scheduler: &dyn Scheduler,
    ) -> (Self, oneshot::Receiver<bool>) {
        let (sender, receiver) = oneshot::channel();
        let state = Arc::new(Mutex::new(CompletionState {
            sender: Some(sender),
            timer: None,
        }));

        if let Some(timeout) = timeout {
            let weak = Arc::downgrade(&state);
            let timer_label = label.clone();
            let mut timer = scheduler.create_timer(
                timeout,
                Box::new(move || fire_timeout(&weak, &timer_label, default, timeout)),
            );
            timer.start();
            state.lock().timer = Some(timer);
        }

        (Self { state, label }, receiver)
    }

    /// Reports the check's result.
    ///
    /// Returns `false` if the result was already decided, by an earlier call
    /// or by the timeout; the value is then ignored.
    pub fn complete(&self, accept: bool) -> bool {
        let mut state = self.state.lock();
        let Some(sender) = state.sender.take() else {
            debug!(
                plugin = self.label.plugin(),
                precommand = self.label.name(),
                accept,
                "Ignoring late precommand completion"
            );
            return false;
        };

        if let Some(timer) = state.timer.as_mut() {
            if timer.is_running() {
                timer.stop();
            }
        }

        // The gate may have decided already; then nobody is listening.
        let _ = sender.send(accept);
        true
    }

    /// Returns `true` once the result has been decided.
    pub fn is_completed(&self) -> bool {
        self.state.lock().sender.is_none()
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("label", &self.label)
            .field("completed", &self.is_completed())
            .finish()
    }
}

fn fire_timeout(
    state: &Weak<Mutex<CompletionState>>,
    label: &TriggerLabel,
    default: bool,
    timeout: Duration,
) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let Some(sender) = state.lock().sender.take() else {
        return;
    };

    if sender.is_closed() {
        trace!(plugin = label.plugin(), "Precommand timed out after the gate decided");
        return;
    }

    warn!(
        plugin = label.plugin(),
        precommand = label.name(),
        ?timeout,
        default,
        "Precommand timed out, using its default result"
    );
    let _ = sender.send(default);
}

// ============================================================================
// Gate
// ============================================================================

enum Pending {
    Ready(bool),
    Waiting(BoxFuture<'static, bool>),
}

/// Evaluates precommand triggers for one message.
#[derive(Clone)]
pub struct PreconditionGate {
    config: GateConfig,
    scheduler: BoxedScheduler,
}

impl PreconditionGate {
    /// Creates a gate that arms its timeouts on `scheduler`.
    pub fn new(config: GateConfig, scheduler: BoxedScheduler) -> Self {
        Self { config, scheduler }
    }

    /// The gate settings.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Returns `Ok(true)` if every trigger accepts the message in `ctx`.
    ///
    /// With no triggers the message is accepted without waiting.
    pub async fn evaluate(
        &self,
        triggers: &[PreCommandTrigger],
        ctx: &TriggerContext,
    ) -> DispatchResult<bool> {
        if triggers.is_empty() {
            return Ok(true);
        }

        match self.config.mode {
            GateMode::Sequential => self.evaluate_sequential(triggers, ctx).await,
            GateMode::Concurrent => self.evaluate_concurrent(triggers, ctx).await,
        }
    }

    async fn evaluate_sequential(
        &self,
        triggers: &[PreCommandTrigger],
        ctx: &TriggerContext,
    ) -> DispatchResult<bool> {
        for trigger in triggers {
            let accepted = match self.start(trigger, ctx)? {
                Pending::Ready(accepted) => accepted,
                Pending::Waiting(answer) => answer.await,
            };
            if !accepted {
                log_rejection(trigger.label());
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn evaluate_concurrent(
        &self,
        triggers: &[PreCommandTrigger],
        ctx: &TriggerContext,
    ) -> DispatchResult<bool> {
        let total = triggers.len();
        let mut completed = 0;
        let mut accepted = true;
        let mut waiting = FuturesUnordered::new();

        for trigger in triggers {
            match self.start(trigger, ctx)? {
                Pending::Ready(result) => {
                    completed += 1;
                    accepted &= result;
                    if !accepted {
                        log_rejection(trigger.label());
                        return Ok(false);
                    }
                }
                Pending::Waiting(answer) => {
                    let label = trigger.label();
                    waiting.push(async move { (label, answer.await) });
                }
            }
        }

        while let Some((label, result)) = waiting.next().await {
            completed += 1;
            accepted &= result;
            trace!(completed, total, result, "Precommand completed");
            if !accepted {
                log_rejection(label);
                return Ok(false);
            }
        }

        Ok(accepted)
    }

    fn start(&self, trigger: &PreCommandTrigger, ctx: &TriggerContext) -> DispatchResult<Pending> {
        let label = trigger.label();
        let pending = match &trigger.check {
            PreCheck::Predicate(check) => Pending::Ready(check(ctx)),
            PreCheck::Flag(property) => Pending::Ready(property.get()),
            PreCheck::Literal(property) => {
                let value = property.get();
                let accepted = parse_bool_literal(&value).ok_or_else(|| {
                    DispatchError::InvalidBoolLiteral {
                        plugin: label.plugin().to_owned(),
                        property: property.name().to_owned(),
                        value: value.clone(),
                    }
                })?;
                Pending::Ready(accepted)
            }
            PreCheck::Deferred(check) => {
                let default = trigger.default_result();
                let timeout = trigger.timeout().or(self.config.default_timeout());
                let (completion, receiver) =
                    Completion::new(label.clone(), default, timeout, &*self.scheduler);

                check(ctx.clone(), completion);

                let label = label.clone();
                Pending::Waiting(Box::pin(async move {
                    receiver.await.unwrap_or_else(|_| {
                        warn!(
                            plugin = label.plugin(),
                            precommand = label.name(),
                            default,
                            "Precommand dropped its completion, using its default result"
                        );
                        default
                    })
                }))
            }
        };
        Ok(pending)
    }
}

impl std::fmt::Debug for PreconditionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreconditionGate")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn log_rejection(label: &TriggerLabel) {
    debug!(
        plugin = label.plugin(),
        precommand = label.name(),
        "Precommand rejected the message"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use brass_core::{MessageData, MessageEvent, TokioScheduler, TryParseRegistry};
    use tokio::time::Instant;

    use super::*;
    use crate::bot::test_support::recording_handle;
    use crate::property::Property;

    fn gate(mode: GateMode) -> PreconditionGate {
        PreconditionGate::new(
            GateConfig {
                mode,
                default_timeout_ms: None,
            },
            Arc::new(TokioScheduler::new()),
        )
    }

    fn context() -> TriggerContext {
        let data = MessageData::new("!admin list").with_channel("#six").with_nick("mallory");
        TriggerContext::new(
            recording_handle("bot").0,
            MessageEvent::channel(data).into(),
            Arc::new(TryParseRegistry::new()),
        )
    }

    fn label(name: &str) -> TriggerLabel {
        TriggerLabel::new("test".into(), Some(name.to_owned()))
    }

    fn predicate(result: bool, calls: &Arc<AtomicUsize>) -> PreCommandTrigger {
        let calls = Arc::clone(calls);
        PreCommandTrigger::new(
            label("predicate"),
            None,
            true,
            PreCheck::Predicate(Arc::new(move |_: &TriggerContext| {
                calls.fetch_add(1, Ordering::SeqCst);
                result
            })),
        )
    }

    fn deferred<F>(timeout: Option<Duration>, default: bool, check: F) -> PreCommandTrigger
    where
        F: Fn(TriggerContext, Completion) + Send + Sync + 'static,
    {
        PreCommandTrigger::new(label("deferred"), timeout, default, PreCheck::Deferred(Arc::new(check)))
    }

    #[tokio::test]
    async fn test_no_triggers_accepts() {
        assert!(gate(GateMode::Concurrent).evaluate(&[], &context()).await.unwrap());
    }

    #[tokio::test]
    async fn test_all_true_accepts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let triggers = vec![
            predicate(true, &calls),
            deferred(None, false, |_, done| {
                done.complete(true);
            }),
        ];
        for mode in [GateMode::Concurrent, GateMode::Sequential] {
            assert!(gate(mode).evaluate(&triggers, &context()).await.unwrap());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_sequential_stops_at_first_false() {
        let calls = Arc::new(AtomicUsize::new(0));
        let triggers = vec![
            predicate(true, &calls),
            predicate(false, &calls),
            predicate(true, &calls),
        ];
        let accepted = gate(GateMode::Sequential)
            .evaluate(&triggers, &context())
            .await
            .unwrap();
        assert!(!accepted);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_false_rejects_without_waiting_for_others() {
        let held = Arc::new(Mutex::new(Vec::new()));
        let keep = Arc::clone(&held);
        let triggers = vec![
            // Never completes and has no timeout.
            deferred(None, true, move |_, done| keep.lock().push(done)),
            deferred(None, true, |_, done| {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    done.complete(false);
                });
            }),
        ];

        let accepted = gate(GateMode::Concurrent)
            .evaluate(&triggers, &context())
            .await
            .unwrap();
        assert!(!accepted);
        assert_eq!(held.lock().len(), 1);
        assert!(!held.lock()[0].is_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_uses_default() {
        let held = Arc::new(Mutex::new(Vec::new()));
        let keep = Arc::clone(&held);
        let timeout = Duration::from_secs(2);
        let triggers = vec![deferred(Some(timeout), false, move |_, done| keep.lock().push(done))];

        let started = Instant::now();
        let accepted = gate(GateMode::Concurrent)
            .evaluate(&triggers, &context())
            .await
            .unwrap();
        assert!(!accepted);
        assert!(started.elapsed() >= timeout);

        // The real answer arrives too late and changes nothing.
        let completion = held.lock().pop().unwrap();
        assert!(completion.is_completed());
        assert!(!completion.complete(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_default_true_accepts() {
        let held = Arc::new(Mutex::new(Vec::new()));
        let keep = Arc::clone(&held);
        let triggers = vec![deferred(
            Some(Duration::from_millis(500)),
            true,
            move |_, done| keep.lock().push(done),
        )];
        assert!(gate(GateMode::Sequential).evaluate(&triggers, &context()).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_default_timeout_applies() {
        let held = Arc::new(Mutex::new(Vec::new()));
        let keep = Arc::clone(&held);
        let gate = PreconditionGate::new(
            GateConfig {
                mode: GateMode::Concurrent,
                default_timeout_ms: Some(100),
            },
            Arc::new(TokioScheduler::new()),
        );
        let triggers = vec![deferred(None, false, move |_, done| keep.lock().push(done))];

        let started = Instant::now();
        assert!(!gate.evaluate(&triggers, &context()).await.unwrap());
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_before_timeout_wins() {
        let triggers = vec![deferred(Some(Duration::from_secs(1)), false, |_, done| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                assert!(done.complete(true));
                assert!(!done.complete(false));
            });
        })];

        let started = Instant::now();
        assert!(gate(GateMode::Concurrent).evaluate(&triggers, &context()).await.unwrap());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    /// Counts timer starts and stops; its timers never fire.
    #[derive(Default)]
    struct CountingScheduler {
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
    }

    struct CountingTimer {
        running: bool,
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
    }

    impl Timer for CountingTimer {
        fn start(&mut self) {
            self.running = true;
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&mut self) {
            self.running = false;
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn is_running(&self) -> bool {
            self.running
        }
    }

    impl Scheduler for CountingScheduler {
        fn create_timer(
            &self,
            _after: Duration,
            _on_fire: brass_core::TimerCallback,
        ) -> Box<dyn Timer> {
            Box::new(CountingTimer {
                running: false,
                starts: Arc::clone(&self.starts),
                stops: Arc::clone(&self.stops),
            })
        }
    }

    #[tokio::test]
    async fn test_completion_stops_pending_timer() {
        let scheduler = Arc::new(CountingScheduler::default());
        let (starts, stops) = (Arc::clone(&scheduler.starts), Arc::clone(&scheduler.stops));
        let gate = PreconditionGate::new(GateConfig::default(), scheduler);

        let held = Arc::new(Mutex::new(Vec::new()));
        let keep = Arc::clone(&held);
        let triggers = vec![deferred(Some(Duration::from_secs(5)), false, move |_, done| {
            done.complete(true);
            keep.lock().push(done);
        })];

        assert!(gate.evaluate(&triggers, &context()).await.unwrap());
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        // A second completion is ignored and leaves the timer alone.
        let completion = held.lock().pop().unwrap();
        assert!(!completion.complete(false));
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_completion_uses_default() {
        let triggers = vec![deferred(None, false, |_, done| drop(done))];
        assert!(!gate(GateMode::Concurrent).evaluate(&triggers, &context()).await.unwrap());

        let triggers = vec![deferred(None, true, |_, done| drop(done))];
        assert!(gate(GateMode::Concurrent).evaluate(&triggers, &context()).await.unwrap());
    }

    #[tokio::test]
    async fn test_property_checks() {
        let on = Arc::new(parking_lot::RwLock::new(true));
        let flag = PreCommandTrigger::new(
            label("On"),
            None,
            true,
            PreCheck::Flag(Property::shared("On", Arc::clone(&on))),
        );
        let gate = gate(GateMode::Concurrent);
        assert!(gate.evaluate(std::slice::from_ref(&flag), &context()).await.unwrap());

        *on.write() = false;
        assert!(!gate.evaluate(std::slice::from_ref(&flag), &context()).await.unwrap());

        let literal = PreCommandTrigger::new(
            label("Mode"),
            None,
            true,
            PreCheck::Literal(Property::read_only("Mode", || "off".to_string())),
        );
        assert!(!gate.evaluate(&[literal], &context()).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_literal_is_error() {
        let literal = PreCommandTrigger::new(
            label("Mode"),
            None,
            true,
            PreCheck::Literal(Property::read_only("Mode", || "maybe".to_string())),
        );
        let err = gate(GateMode::Concurrent)
            .evaluate(&[literal], &context())
            .await
            .unwrap_err();
        match err {
            DispatchError::InvalidBoolLiteral { property, value, .. } => {
                assert_eq!(property, "Mode");
                assert_eq!(value, "maybe");
            }
        }
    }
}
