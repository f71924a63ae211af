//! Routing descriptors and the routes plugins declare with them.
//!
//! A plugin lists its routes from [`Plugin::routes`](crate::Plugin::routes),
//! each pairing a descriptor with a handler or a [`Property`]:
//!
//! | Descriptor | Route constructors |
//! |---|---|
//! | [`OnCommand`] | [`Route::on_command`], [`Route::on_command_property`] |
//! | [`PreCommand`] | [`Route::pre_command`], [`Route::pre_command_inspect`], [`Route::pre_command_async`], [`Route::pre_command_deferred`], [`Route::pre_command_property`] |
//! | [`OnJoin`] | [`Route::on_join`] |
//! | [`OnPart`] | [`Route::on_part`] |
//!
//! ```rust,ignore
//! fn routes(self: Arc<Self>) -> Vec<Route> {
//!     let this = Arc::clone(&self);
//!     vec![
//!         Route::pre_command(PreCommand::new(), move |ctx| this.is_admin(ctx.nick())),
//!         Route::on_command(OnCommand::new(r"db get (?<key>(\w+))"), move |ctx| {
//!             let this = Arc::clone(&self);
//!             async move { this.get(ctx.param("key")?) }
//!         }),
//!     ]
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use brass_core::MessageType;
use futures::future::BoxFuture;

use crate::context::TriggerContext;
use crate::gate::Completion;
use crate::property::{AnyProperty, Property};
use crate::response::HandlerResponse;

// ============================================================================
// Descriptors
// ============================================================================

/// Routes matching messages to a handler or property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnCommand {
    /// Regular expression run against the message with the prefix stripped.
    pub pattern: String,
    /// Which messages the command accepts.
    pub message_type: MessageType,
    /// Prefix override; falls back to the plugin's, then the bot's.
    pub prefix: Option<String>,
    /// Only accept messages sent to this channel.
    pub channel: Option<String>,
}

impl OnCommand {
    /// Creates a command descriptor accepting every message type.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            message_type: MessageType::All,
            prefix: None,
            channel: None,
        }
    }

    /// Restricts the command to channel or direct messages.
    pub fn message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    /// Overrides the command prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Restricts the command to one channel.
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

/// Gates every command on a check.
///
/// `timeout` and `default` only apply to asynchronous checks: if the check
/// has not completed after `timeout`, it counts as `default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreCommand {
    /// How long to wait for an asynchronous check.
    pub timeout: Option<Duration>,
    /// Result used when the check times out or is abandoned.
    pub default: bool,
}

impl Default for PreCommand {
    fn default() -> Self {
        Self {
            timeout: None,
            default: true,
        }
    }
}

impl PreCommand {
    /// Creates a precommand descriptor without a timeout, defaulting to accept.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout for asynchronous checks.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the result used on timeout.
    pub fn default_result(mut self, accept: bool) -> Self {
        self.default = accept;
        self
    }
}

/// Runs a handler for every channel join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnJoin {
    /// Only fire for joins of this channel.
    pub channel: Option<String>,
}

impl OnJoin {
    /// Creates a descriptor firing for every join.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the handler to one channel.
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

/// Runs a handler for every channel part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnPart {
    /// Only fire for parts of this channel.
    pub channel: Option<String>,
}

impl OnPart {
    /// Creates a descriptor firing for every part.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the handler to one channel.
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

// ============================================================================
// Handler shapes
// ============================================================================

/// A type-erased command, join or part handler.
pub(crate) type BoxedHandler = Arc<dyn Fn(TriggerContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// Writes a property from the context; `false` means the command did not apply.
pub(crate) type PropertyBinder = Arc<dyn Fn(&TriggerContext) -> bool + Send + Sync>;

/// A synchronous precommand check.
pub(crate) type Predicate = Arc<dyn Fn(&TriggerContext) -> bool + Send + Sync>;

/// A precommand check that reports through a [`Completion`].
pub(crate) type DeferredCheck = Arc<dyn Fn(TriggerContext, Completion) + Send + Sync>;

fn box_handler<F, Fut, R>(handler: F) -> BoxedHandler
where
    F: Fn(TriggerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: HandlerResponse + 'static,
{
    Arc::new(move |ctx: TriggerContext| -> BoxFuture<'static, ()> {
        let fut = handler(ctx.clone());
        Box::pin(async move {
            fut.await.respond(&ctx).await;
        })
    })
}

pub(crate) enum CommandAction {
    Handler(BoxedHandler),
    Property(PropertyBinder),
}

pub(crate) enum PreCheck {
    Predicate(Predicate),
    Deferred(DeferredCheck),
    Flag(Property<bool>),
    Literal(Property<String>),
}

pub(crate) enum PreCheckSource {
    Check(PreCheck),
    /// Checked for a supported type when the plugin registers.
    Property(Box<dyn AnyProperty>),
}

pub(crate) enum RouteKind {
    Command {
        descriptor: OnCommand,
        action: CommandAction,
    },
    PreCommand {
        descriptor: PreCommand,
        source: PreCheckSource,
    },
    Join {
        descriptor: OnJoin,
        handler: BoxedHandler,
    },
    Part {
        descriptor: OnPart,
        handler: BoxedHandler,
    },
}

// ============================================================================
// Route
// ============================================================================

/// One routing declaration of a plugin.
pub struct Route {
    pub(crate) name: Option<String>,
    pub(crate) kind: RouteKind,
}

impl Route {
    fn new(kind: RouteKind) -> Self {
        Self { name: None, kind }
    }

    /// Names the route in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Routes matching messages to an async handler.
    ///
    /// A matched function command always consumes the message; unresolved
    /// parameters reach the handler as `None`.
    pub fn on_command<F, Fut, R>(descriptor: OnCommand, handler: F) -> Self
    where
        F: Fn(TriggerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: HandlerResponse + 'static,
    {
        Self::new(RouteKind::Command {
            descriptor,
            action: CommandAction::Handler(box_handler(handler)),
        })
    }

    /// Routes matching messages to a property setter.
    ///
    /// The capture group named like the property is coerced into `T` and
    /// written. If the group is absent, coercion fails, or the property is
    /// read-only, the command counts as not matched and dispatch moves on.
    pub fn on_command_property<T>(descriptor: OnCommand, property: Property<T>) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        let name = property.name().to_owned();
        let binder: PropertyBinder = Arc::new(move |ctx: &TriggerContext| {
            if !property.is_writable() {
                return false;
            }
            ctx.capture(property.name())
                .and_then(|text| ctx.coerce::<T>(text))
                .is_some_and(|value| property.set(value))
        });

        Self::new(RouteKind::Command {
            descriptor,
            action: CommandAction::Property(binder),
        })
        .named(name)
    }

    /// Gates commands on a synchronous predicate.
    pub fn pre_command<F>(descriptor: PreCommand, check: F) -> Self
    where
        F: Fn(&TriggerContext) -> bool + Send + Sync + 'static,
    {
        Self::new(RouteKind::PreCommand {
            descriptor,
            source: PreCheckSource::Check(PreCheck::Predicate(Arc::new(check))),
        })
    }

    /// Observes every message before commands run, without gating.
    pub fn pre_command_inspect<F>(descriptor: PreCommand, inspect: F) -> Self
    where
        F: Fn(&TriggerContext) + Send + Sync + 'static,
    {
        Self::pre_command(descriptor, move |ctx| {
            inspect(ctx);
            true
        })
    }

    /// Gates commands on an async check.
    ///
    /// The future is spawned onto the tokio runtime and keeps running even if
    /// the gate has already decided; its result is then ignored.
    pub fn pre_command_async<F, Fut>(descriptor: PreCommand, check: F) -> Self
    where
        F: Fn(TriggerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self::pre_command_deferred(descriptor, move |ctx, completion| {
            let fut = check(ctx);
            tokio::spawn(async move {
                completion.complete(fut.await);
            });
        })
    }

    /// Gates commands on a check that reports through a [`Completion`].
    ///
    /// The check may complete inline or hand the completion off to other
    /// work. Only the first completion (or the timeout) counts.
    pub fn pre_command_deferred<F>(descriptor: PreCommand, check: F) -> Self
    where
        F: Fn(TriggerContext, Completion) + Send + Sync + 'static,
    {
        Self::new(RouteKind::PreCommand {
            descriptor,
            source: PreCheckSource::Check(PreCheck::Deferred(Arc::new(check))),
        })
    }

    /// Gates commands on a property.
    ///
    /// `bool` properties are read directly. `String` properties must hold a
    /// boolean literal (`1`/`on`/`true`, `0`/`off`/`false`). Any other type
    /// fails registration with
    /// [`RegistrationError::UnsupportedPropertyType`](crate::RegistrationError).
    pub fn pre_command_property<T>(descriptor: PreCommand, property: Property<T>) -> Self
    where
        T: Send + Sync + 'static,
    {
        let name = property.name().to_owned();
        Self::new(RouteKind::PreCommand {
            descriptor,
            source: PreCheckSource::Property(Box::new(property)),
        })
        .named(name)
    }

    /// Runs an async handler for every join.
    pub fn on_join<F, Fut, R>(descriptor: OnJoin, handler: F) -> Self
    where
        F: Fn(TriggerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: HandlerResponse + 'static,
    {
        Self::new(RouteKind::Join {
            descriptor,
            handler: box_handler(handler),
        })
    }

    /// Runs an async handler for every part.
    pub fn on_part<F, Fut, R>(descriptor: OnPart, handler: F) -> Self
    where
        F: Fn(TriggerContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: HandlerResponse + 'static,
    {
        Self::new(RouteKind::Part {
            descriptor,
            handler: box_handler(handler),
        })
    }

    /// Short name of the route kind.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            RouteKind::Command { .. } => "command",
            RouteKind::PreCommand { .. } => "precommand",
            RouteKind::Join { .. } => "join",
            RouteKind::Part { .. } => "part",
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Route");
        s.field("kind", &self.kind_name()).field("name", &self.name);
        match &self.kind {
            RouteKind::Command { descriptor, .. } => s.field("descriptor", descriptor),
            RouteKind::PreCommand { descriptor, .. } => s.field("descriptor", descriptor),
            RouteKind::Join { descriptor, .. } => s.field("descriptor", descriptor),
            RouteKind::Part { descriptor, .. } => s.field("descriptor", descriptor),
        };
        s.finish()
    }
}
