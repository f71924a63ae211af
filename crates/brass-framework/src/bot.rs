//! The per-bot dispatcher.
//!
//! A [`Bot`] owns the plugins registered on it and their triggers, flattened
//! in registration order. Each inbound event goes through one pipeline:
//!
//! - **Messages**: every precommand must accept (see [`gate`](crate::gate)),
//!   then commands are tried in order until one consumes the message.
//! - **Joins / parts**: every join (part) trigger whose channel restriction
//!   allows it runs, in order. No gate, no prefix, no pattern.
//!
//! ```rust,ignore
//! let mut bot = Bot::new(client, BotConfig::default());
//! bot.register(admin.clone())?;
//! bot.register(Arc::new(DbPlugin::new(admin)))?;
//!
//! let outcome = bot.on_channel_message(data).await?;
//! ```
//!
//! Registration takes `&mut self` and dispatch `&self`, so a bot can only be
//! shared for dispatch (e.g. through [`Bot::into_service`]) once it is fully
//! registered.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use brass_core::{
    ApiResult, BoxedClient, BoxedScheduler, Channel, InboundEvent, JoinEvent, MessageData,
    MessageEvent, PartEvent, TokioScheduler, TryParseRegistry,
};
use futures::future::BoxFuture;
use tower::Service;
use tracing::{Instrument, debug, debug_span, trace};

use crate::context::TriggerContext;
use crate::error::{DispatchError, DispatchResult, RegistrationError};
use crate::gate::{GateConfig, PreconditionGate};
use crate::registry::{Plugin, PluginTriggers};
use crate::trigger::{CommandTrigger, JoinTrigger, MembershipTrigger, PartTrigger, PreCommandTrigger};

/// The prefix used when neither a command nor its plugin sets one.
pub const DEFAULT_PREFIX: &str = "!";

// ============================================================================
// BotHandle
// ============================================================================

/// A cheap, cloneable reference to a bot's client and settings.
///
/// Plugins receive one in [`Plugin::attach`] and every handler can reach it
/// through [`TriggerContext::bot`].
#[derive(Clone)]
pub struct BotHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    client: BoxedClient,
    default_prefix: String,
}

impl BotHandle {
    /// Creates a handle around `client`.
    pub fn new(client: BoxedClient, default_prefix: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                client,
                default_prefix: default_prefix.into(),
            }),
        }
    }

    /// The chat client.
    pub fn client(&self) -> &BoxedClient {
        &self.inner.client
    }

    /// The bot's own nickname.
    pub fn nickname(&self) -> &str {
        self.inner.client.nickname()
    }

    /// The bot-wide command prefix.
    pub fn default_prefix(&self) -> &str {
        &self.inner.default_prefix
    }

    /// Sends `text` to a channel or nickname.
    pub async fn send_message(&self, target: &str, text: &str) -> ApiResult<()> {
        self.inner.client.send_message(target, text).await
    }

    /// Looks up a tracked channel.
    pub fn channel(&self, name: &str) -> Option<Channel> {
        self.inner.client.channel(name)
    }

    /// Joins a channel.
    pub async fn join_channel(&self, name: &str) -> ApiResult<()> {
        self.inner.client.join_channel(name).await
    }
}

impl fmt::Debug for BotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotHandle")
            .field("nickname", &self.nickname())
            .field("default_prefix", &self.default_prefix())
            .finish()
    }
}

// ============================================================================
// Bot
// ============================================================================

/// Settings for a [`Bot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    /// Command prefix used when neither the command nor its plugin sets one.
    pub default_prefix: String,
    /// Precommand gate settings.
    pub gate: GateConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            default_prefix: DEFAULT_PREFIX.to_string(),
            gate: GateConfig::default(),
        }
    }
}

/// What happened to a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A precommand rejected the message.
    Rejected,
    /// A command consumed the message.
    Handled,
    /// The gate passed but no command consumed the message.
    Unmatched,
    /// A join or part ran this many triggers.
    Notified(usize),
}

/// Routes events from one chat client to the plugins registered on it.
pub struct Bot {
    handle: BotHandle,
    gate: PreconditionGate,
    parsers: Arc<TryParseRegistry>,
    plugins: Vec<Arc<dyn Plugin>>,
    commands: Vec<CommandTrigger>,
    precommands: Vec<PreCommandTrigger>,
    joins: Vec<JoinTrigger>,
    parts: Vec<PartTrigger>,
}

impl Bot {
    /// Creates a bot with tokio timers and the global parse registry.
    pub fn new(client: BoxedClient, config: BotConfig) -> Self {
        let scheduler: BoxedScheduler = Arc::new(TokioScheduler::new());
        Self {
            handle: BotHandle::new(client, config.default_prefix),
            gate: PreconditionGate::new(config.gate, scheduler),
            parsers: TryParseRegistry::global(),
            plugins: Vec::new(),
            commands: Vec::new(),
            precommands: Vec::new(),
            joins: Vec::new(),
            parts: Vec::new(),
        }
    }

    /// Uses `scheduler` for precommand timeouts.
    pub fn with_scheduler(mut self, scheduler: BoxedScheduler) -> Self {
        self.gate = PreconditionGate::new(self.gate.config().clone(), scheduler);
        self
    }

    /// Uses `parsers` instead of the global parse registry.
    pub fn with_parsers(mut self, parsers: Arc<TryParseRegistry>) -> Self {
        self.parsers = parsers;
        self
    }

    /// A handle to this bot's client and settings.
    pub fn handle(&self) -> &BotHandle {
        &self.handle
    }

    /// The parse registry handlers coerce with.
    pub fn parsers(&self) -> &Arc<TryParseRegistry> {
        &self.parsers
    }

    /// Registers `plugin`, appending its triggers after those of earlier plugins.
    ///
    /// The plugin is attached to this bot before its routes are read. On
    /// error nothing is added.
    pub fn register<P: Plugin>(&mut self, plugin: Arc<P>) -> Result<(), RegistrationError> {
        let plugin: Arc<dyn Plugin> = plugin;
        let address = Arc::as_ptr(&plugin) as *const ();
        if self
            .plugins
            .iter()
            .any(|p| Arc::as_ptr(p) as *const () == address)
        {
            return Err(RegistrationError::AlreadyRegistered {
                plugin: plugin.name().to_owned(),
            });
        }

        let PluginTriggers {
            commands,
            precommands,
            joins,
            parts,
        } = PluginTriggers::collect(Arc::clone(&plugin), &self.handle)?;

        self.commands.extend(commands);
        self.precommands.extend(precommands);
        self.joins.extend(joins);
        self.parts.extend(parts);

        debug!(plugin = plugin.name(), index = self.plugins.len(), "Registered plugin");
        self.plugins.push(plugin);
        Ok(())
    }

    /// Registered plugins, in registration order.
    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    /// All command triggers, in dispatch order.
    pub fn commands(&self) -> &[CommandTrigger] {
        &self.commands
    }

    /// All precommand triggers, in registration order.
    pub fn precommands(&self) -> &[PreCommandTrigger] {
        &self.precommands
    }

    /// All join triggers, in dispatch order.
    pub fn joins(&self) -> &[JoinTrigger] {
        &self.joins
    }

    /// All part triggers, in dispatch order.
    pub fn parts(&self) -> &[PartTrigger] {
        &self.parts
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Dispatches one inbound event.
    pub async fn dispatch(&self, event: InboundEvent) -> DispatchResult<DispatchOutcome> {
        let span = debug_span!(
            "dispatch",
            event = event.event_name(),
            nick = event.data().nick.as_deref().unwrap_or(""),
        );

        async move {
            let ctx = TriggerContext::new(self.handle.clone(), event, Arc::clone(&self.parsers));
            let outcome = match ctx.event() {
                InboundEvent::Message(message) => self.dispatch_message(&ctx, message).await?,
                InboundEvent::Join(join) => {
                    DispatchOutcome::Notified(self.notify(&self.joins, &join.channel, &ctx).await)
                }
                InboundEvent::Part(part) => {
                    DispatchOutcome::Notified(self.notify(&self.parts, &part.channel, &ctx).await)
                }
            };
            trace!(?outcome, "Dispatch finished");
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    /// Dispatches a message received in a channel.
    pub async fn on_channel_message(&self, data: MessageData) -> DispatchResult<DispatchOutcome> {
        self.dispatch(MessageEvent::channel(data).into()).await
    }

    /// Dispatches a direct message.
    pub async fn on_query_message(&self, data: MessageData) -> DispatchResult<DispatchOutcome> {
        self.dispatch(MessageEvent::query(data).into()).await
    }

    /// Dispatches a channel join.
    pub async fn on_join(&self, event: JoinEvent) -> DispatchResult<DispatchOutcome> {
        self.dispatch(event.into()).await
    }

    /// Dispatches a channel part.
    pub async fn on_part(&self, event: PartEvent) -> DispatchResult<DispatchOutcome> {
        self.dispatch(event.into()).await
    }

    async fn dispatch_message(
        &self,
        ctx: &TriggerContext,
        message: &MessageEvent,
    ) -> DispatchResult<DispatchOutcome> {
        if !self.gate.evaluate(&self.precommands, ctx).await? {
            return Ok(DispatchOutcome::Rejected);
        }

        let bot_prefix = self.handle.default_prefix();
        for trigger in &self.commands {
            let Some(matched) = trigger.match_message(message, bot_prefix) else {
                continue;
            };

            debug!(
                plugin = trigger.label().plugin(),
                command = trigger.label().name(),
                pattern = trigger.pattern().as_str(),
                "Command matched"
            );

            if trigger.invoke(ctx.with_match(matched)).await {
                return Ok(DispatchOutcome::Handled);
            }
        }

        Ok(DispatchOutcome::Unmatched)
    }

    async fn notify(
        &self,
        triggers: &[MembershipTrigger],
        channel: &str,
        ctx: &TriggerContext,
    ) -> usize {
        let mut count = 0;
        for trigger in triggers.iter().filter(|t| t.applies_to(channel)) {
            trace!(plugin = trigger.label().plugin(), "Running membership trigger");
            trigger.invoke(ctx.clone()).await;
            count += 1;
        }
        count
    }

    /// Wraps the bot in a cloneable [`tower::Service`].
    pub fn into_service(self) -> BotService {
        BotService::new(Arc::new(self))
    }
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("handle", &self.handle)
            .field("gate", &self.gate)
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("commands", &self.commands.len())
            .field("precommands", &self.precommands.len())
            .field("joins", &self.joins.len())
            .field("parts", &self.parts.len())
            .finish()
    }
}

// ============================================================================
// Tower Service
// ============================================================================

/// A registered [`Bot`] as a [`tower::Service`], so middleware can wrap dispatch.
///
/// ```rust,ignore
/// use tower::ServiceBuilder;
///
/// let service = ServiceBuilder::new()
///     .concurrency_limit(1)
///     .service(bot.into_service());
/// ```
#[derive(Clone, Debug)]
pub struct BotService {
    bot: Arc<Bot>,
}

impl BotService {
    /// Wraps a shared bot.
    pub fn new(bot: Arc<Bot>) -> Self {
        Self { bot }
    }

    /// The wrapped bot.
    pub fn bot(&self) -> &Arc<Bot> {
        &self.bot
    }
}

impl Service<InboundEvent> for BotService {
    type Response = DispatchOutcome;
    type Error = DispatchError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: InboundEvent) -> Self::Future {
        let bot = Arc::clone(&self.bot);
        Box::pin(async move { bot.dispatch(event).await })
    }
}

impl From<Bot> for BotService {
    fn from(bot: Bot) -> Self {
        bot.into_service()
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tower::ServiceExt;

    use super::test_support::RecordingClient;
    use super::*;
    use crate::route::{OnCommand, OnJoin, OnPart, PreCommand, Route};

    struct Echo {
        prefix: Option<&'static str>,
        gate: bool,
    }

    impl Plugin for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn default_prefix(&self) -> Option<&str> {
            self.prefix
        }

        fn routes(self: Arc<Self>) -> Vec<Route> {
            let gate = self.gate;
            vec![
                Route::pre_command(PreCommand::new(), move |_| gate),
                Route::on_command(OnCommand::new("echo (?<text>.+)"), |ctx| async move {
                    ctx.param::<String>("text")
                }),
            ]
        }
    }

    struct Counter {
        name: &'static str,
        hits: Arc<AtomicUsize>,
    }

    impl Plugin for Counter {
        fn name(&self) -> &str {
            self.name
        }

        fn routes(self: Arc<Self>) -> Vec<Route> {
            let on_echo = Arc::clone(&self.hits);
            let on_join = Arc::clone(&self.hits);
            let on_part = Arc::clone(&self.hits);
            vec![
                Route::on_command(OnCommand::new("echo"), move |_| {
                    let hits = Arc::clone(&on_echo);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                    }
                }),
                Route::on_join(OnJoin::new(), move |_| {
                    let hits = Arc::clone(&on_join);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                    }
                }),
                Route::on_part(OnPart::new().channel("#six"), move |_| {
                    let hits = Arc::clone(&on_part);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                    }
                }),
            ]
        }
    }

    fn bot() -> (Bot, Arc<RecordingClient>) {
        let client = RecordingClient::new("brass");
        let bot = Bot::new(client.clone(), BotConfig::default())
            .with_parsers(Arc::new(TryParseRegistry::new()));
        (bot, client)
    }

    fn line(text: &str) -> MessageData {
        MessageData::new(text).with_channel("#six").with_nick("txdv")
    }

    #[tokio::test]
    async fn test_first_registered_command_wins() {
        let (mut bot, client) = bot();
        let hits = Arc::new(AtomicUsize::new(0));
        bot.register(Arc::new(Echo { prefix: None, gate: true })).unwrap();
        bot.register(Arc::new(Counter { name: "counter", hits: Arc::clone(&hits) }))
            .unwrap();

        let outcome = bot.on_channel_message(line("!echo hi")).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(client.sent(), vec![("#six".to_string(), "hi".to_string())]);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        // Only the counter's bare pattern matches here.
        let outcome = bot.on_channel_message(line("!echo")).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejecting_precommand_blocks_all_plugins() {
        let (mut bot, client) = bot();
        let hits = Arc::new(AtomicUsize::new(0));
        bot.register(Arc::new(Counter { name: "counter", hits: Arc::clone(&hits) }))
            .unwrap();
        bot.register(Arc::new(Echo { prefix: None, gate: false })).unwrap();

        let outcome = bot.on_channel_message(line("!echo")).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Rejected);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(client.sent().is_empty());
    }

    #[tokio::test]
    async fn test_plugin_prefix_overrides_bot_prefix() {
        let (mut bot, client) = bot();
        bot.register(Arc::new(Echo { prefix: Some("."), gate: true })).unwrap();

        let outcome = bot.on_channel_message(line("!echo hi")).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Unmatched);
        let outcome = bot.on_query_message(MessageData::new(".echo hi").with_nick("txdv")).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(client.sent(), vec![("txdv".to_string(), "hi".to_string())]);
    }

    #[tokio::test]
    async fn test_membership_events_notify_every_trigger() {
        let (mut bot, _client) = bot();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        bot.register(Arc::new(Counter { name: "a", hits: Arc::clone(&first) })).unwrap();
        bot.register(Arc::new(Counter { name: "b", hits: Arc::clone(&second) })).unwrap();

        let outcome = bot.on_join(JoinEvent::new("#six", "alice")).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Notified(2));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        let outcome = bot.on_part(PartEvent::new("#seven", "alice")).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Notified(0));
        let outcome = bot.on_part(PartEvent::new("#six", "alice")).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Notified(2));
    }

    #[tokio::test]
    async fn test_same_instance_cannot_register_twice() {
        let (mut bot, _client) = bot();
        let echo = Arc::new(Echo { prefix: None, gate: true });
        bot.register(Arc::clone(&echo)).unwrap();
        let err = bot.register(echo).unwrap_err();
        assert!(matches!(err, RegistrationError::AlreadyRegistered { .. }));
        assert_eq!(bot.plugins().len(), 1);
        assert_eq!(bot.commands().len(), 1);

        // A second instance of the same type is fine.
        bot.register(Arc::new(Echo { prefix: None, gate: true })).unwrap();
        assert_eq!(bot.commands().len(), 2);
        assert_eq!(bot.precommands().len(), 2);
    }

    #[tokio::test]
    async fn test_service_dispatch() {
        let (mut bot, client) = bot();
        bot.register(Arc::new(Echo { prefix: None, gate: true })).unwrap();
        let mut service = bot.into_service();

        let mut task = tokio_test::task::spawn(());
        task.enter(|cx, _| assert!(service.poll_ready(cx).is_ready()));

        let event: InboundEvent = MessageEvent::channel(line("!echo tower")).into();
        let outcome = service.clone().oneshot(event).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(client.sent().len(), 1);
        assert_eq!(service.bot().commands().len(), 1);
    }
}
