//! Triggers: routes bound to their plugin, ready for dispatch.
//!
//! Triggers are built by the [registry](crate::registry) when a plugin
//! registers and never change afterwards.

use std::sync::Arc;
use std::time::Duration;

use brass_core::{MessageEvent, MessageType};
use tracing::trace;

use crate::context::TriggerContext;
use crate::pattern::{MatchResult, Pattern};
use crate::route::{BoxedHandler, CommandAction, PreCheck};

/// Owner and label of a trigger, for logs.
#[derive(Debug, Clone)]
pub struct TriggerLabel {
    plugin: Arc<str>,
    name: Option<Arc<str>>,
}

impl TriggerLabel {
    pub(crate) fn new(plugin: Arc<str>, name: Option<String>) -> Self {
        Self {
            plugin,
            name: name.map(Into::into),
        }
    }

    /// Name of the owning plugin.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Route name, if one was given.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

// ============================================================================
// Commands
// ============================================================================

/// A command route bound to its plugin.
pub struct CommandTrigger {
    label: TriggerLabel,
    pattern: Pattern,
    message_type: MessageType,
    prefix: Option<String>,
    channel: Option<String>,
    action: CommandAction,
}

impl CommandTrigger {
    /// `prefix` is the route's own prefix or else the plugin default.
    pub(crate) fn new(
        label: TriggerLabel,
        pattern: Pattern,
        message_type: MessageType,
        prefix: Option<String>,
        channel: Option<String>,
        action: CommandAction,
    ) -> Self {
        Self {
            label,
            pattern,
            message_type,
            prefix,
            channel,
            action,
        }
    }

    /// Owner and name.
    pub fn label(&self) -> &TriggerLabel {
        &self.label
    }

    /// The compiled pattern.
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Which messages the command accepts.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// The channel restriction, if any.
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Returns `true` if this command writes a property.
    pub fn is_property(&self) -> bool {
        matches!(self.action, CommandAction::Property(_))
    }

    /// The prefix in effect: the route's, else the plugin's, else `bot_default`.
    pub fn resolve_prefix<'a>(&'a self, bot_default: &'a str) -> &'a str {
        self.prefix.as_deref().unwrap_or(bot_default)
    }

    /// Matches `event` against this command.
    ///
    /// Checks the type filter, the channel restriction and the prefix, then
    /// runs the pattern over the text after the prefix.
    pub fn match_message(&self, event: &MessageEvent, bot_default: &str) -> Option<MatchResult> {
        if !self.message_type.accepts(event.kind) {
            return None;
        }

        if let Some(required) = &self.channel {
            let channel = event.data.channel.as_deref()?;
            if !channel.eq_ignore_ascii_case(required) {
                return None;
            }
        }

        let prefix = self.resolve_prefix(bot_default);
        let rest = event.data.message.strip_prefix(prefix)?;
        self.pattern.match_text(rest)
    }

    /// Runs the handler or writes the property.
    ///
    /// Returns `true` if the command consumed the message.
    pub(crate) async fn invoke(&self, ctx: TriggerContext) -> bool {
        match &self.action {
            CommandAction::Handler(handler) => {
                handler(ctx).await;
                true
            }
            CommandAction::Property(bind) => {
                let bound = bind(&ctx);
                if !bound {
                    trace!(
                        plugin = self.label.plugin(),
                        property = self.label.name(),
                        "Property command did not bind"
                    );
                }
                bound
            }
        }
    }
}

impl std::fmt::Debug for CommandTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTrigger")
            .field("label", &self.label)
            .field("pattern", &self.pattern)
            .field("message_type", &self.message_type)
            .field("prefix", &self.prefix)
            .field("channel", &self.channel)
            .field("property", &self.is_property())
            .finish()
    }
}

// ============================================================================
// Precommands
// ============================================================================

/// A precommand route bound to its plugin.
pub struct PreCommandTrigger {
    label: TriggerLabel,
    timeout: Option<Duration>,
    default: bool,
    pub(crate) check: PreCheck,
}

impl PreCommandTrigger {
    pub(crate) fn new(
        label: TriggerLabel,
        timeout: Option<Duration>,
        default: bool,
        check: PreCheck,
    ) -> Self {
        Self {
            label,
            timeout,
            default,
            check,
        }
    }

    /// Owner and name.
    pub fn label(&self) -> &TriggerLabel {
        &self.label
    }

    /// How long an asynchronous check may take.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Result used when an asynchronous check times out or is abandoned.
    pub fn default_result(&self) -> bool {
        self.default
    }

    /// Returns `true` if the check reports through a completion.
    pub fn is_deferred(&self) -> bool {
        matches!(self.check, PreCheck::Deferred(_))
    }
}

impl std::fmt::Debug for PreCommandTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreCommandTrigger")
            .field("label", &self.label)
            .field("timeout", &self.timeout)
            .field("default", &self.default)
            .field("deferred", &self.is_deferred())
            .finish()
    }
}

// ============================================================================
// Joins and parts
// ============================================================================

/// A join or part route bound to its plugin.
pub struct MembershipTrigger {
    label: TriggerLabel,
    channel: Option<String>,
    handler: BoxedHandler,
}

/// A join route bound to its plugin.
pub type JoinTrigger = MembershipTrigger;

/// A part route bound to its plugin.
pub type PartTrigger = MembershipTrigger;

impl MembershipTrigger {
    pub(crate) fn new(label: TriggerLabel, channel: Option<String>, handler: BoxedHandler) -> Self {
        Self {
            label,
            channel,
            handler,
        }
    }

    /// Owner and name.
    pub fn label(&self) -> &TriggerLabel {
        &self.label
    }

    /// Returns `true` unless a channel restriction excludes `channel`.
    pub fn applies_to(&self, channel: &str) -> bool {
        self.channel
            .as_deref()
            .is_none_or(|required| required.eq_ignore_ascii_case(channel))
    }

    pub(crate) async fn invoke(&self, ctx: TriggerContext) {
        (self.handler)(ctx).await;
    }
}

impl std::fmt::Debug for MembershipTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipTrigger")
            .field("label", &self.label)
            .field("channel", &self.channel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brass_core::MessageData;
    use futures::future::BoxFuture;

    fn command(pattern: &str, message_type: MessageType, prefix: Option<&str>) -> CommandTrigger {
        CommandTrigger::new(
            TriggerLabel::new("test".into(), None),
            Pattern::compile(pattern).unwrap(),
            message_type,
            prefix.map(str::to_owned),
            None,
            CommandAction::Property(Arc::new(|_: &TriggerContext| true)),
        )
    }

    fn channel_message(text: &str) -> MessageEvent {
        MessageEvent::channel(MessageData::new(text).with_channel("#six").with_nick("txdv"))
    }

    #[test]
    fn test_prefix_is_required() {
        let trigger = command(r"db set (?<key>(\w+)) (?<value>(.+))", MessageType::All, None);
        let m = trigger
            .match_message(&channel_message("!db set color blue"), "!")
            .unwrap();
        assert_eq!(m.get("key"), Some("color"));
        assert_eq!(m.get("value"), Some("blue"));
        assert!(trigger.match_message(&channel_message("db set color blue"), "!").is_none());
    }

    #[test]
    fn test_prefix_resolution_order() {
        let own = command("db$", MessageType::All, Some("."));
        assert_eq!(own.resolve_prefix("!"), ".");
        assert!(own.match_message(&channel_message(".db"), "!").is_some());
        assert!(own.match_message(&channel_message("!db"), "!").is_none());

        let inherited = command("db$", MessageType::All, None);
        assert_eq!(inherited.resolve_prefix("~"), "~");
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        let trigger = command("x", MessageType::All, Some("bot:"));
        assert!(trigger.match_message(&channel_message("BOT:x"), "!").is_none());
        assert!(trigger.match_message(&channel_message("bot:x"), "!").is_some());
    }

    #[test]
    fn test_message_type_filter() {
        let query = MessageEvent::query(MessageData::new("!db").with_nick("txdv"));
        let channel = channel_message("!db");

        let only_channel = command("db$", MessageType::Channel, None);
        assert!(only_channel.match_message(&channel, "!").is_some());
        assert!(only_channel.match_message(&query, "!").is_none());

        let only_query = command("db$", MessageType::Query, None);
        assert!(only_query.match_message(&channel, "!").is_none());
        assert!(only_query.match_message(&query, "!").is_some());

        let all = command("db$", MessageType::All, None);
        assert!(all.match_message(&channel, "!").is_some());
        assert!(all.match_message(&query, "!").is_some());
    }

    #[test]
    fn test_channel_restriction() {
        let trigger = CommandTrigger::new(
            TriggerLabel::new("test".into(), None),
            Pattern::compile("db$").unwrap(),
            MessageType::All,
            None,
            Some("#SIX".into()),
            CommandAction::Property(Arc::new(|_: &TriggerContext| true)),
        );
        assert!(trigger.match_message(&channel_message("!db"), "!").is_some());

        let elsewhere = MessageEvent::channel(MessageData::new("!db").with_channel("#seven"));
        assert!(trigger.match_message(&elsewhere, "!").is_none());

        let query = MessageEvent::query(MessageData::new("!db").with_nick("txdv"));
        assert!(trigger.match_message(&query, "!").is_none());
    }

    #[test]
    fn test_membership_channel_restriction() {
        let handler: BoxedHandler =
            Arc::new(|_: TriggerContext| -> BoxFuture<'static, ()> { Box::pin(async {}) });
        let any = MembershipTrigger::new(TriggerLabel::new("p".into(), None), None, handler.clone());
        assert!(any.applies_to("#six"));

        let six = MembershipTrigger::new(TriggerLabel::new("p".into(), None), Some("#six".into()), handler);
        assert!(six.applies_to("#Six"));
        assert!(!six.applies_to("#seven"));
    }
}
