//! Per-event context handed to every trigger, and the parameter binder.
//!
//! [`TriggerContext`] carries the inbound event, the bot it arrived on, the
//! pattern match (for commands) and the parse registry. Handlers pull their
//! arguments out of it with [`TriggerContext::param`], which resolves a
//! parameter by type and by name:
//!
//! 1. **Injection**: if `T` is one of the context objects in scope
//!    ([`MessageEvent`], [`MessageData`], [`MatchResult`], [`JoinEvent`],
//!    [`PartEvent`], [`ReplyCode`], [`Channel`], [`BotHandle`]) it is
//!    returned directly.
//! 2. **Capture**: if a capture group called `name` is present, its text is
//!    coerced into `T` (see [`coerce`]).
//! 3. **Field**: for `String` parameters, a known field of the event whose
//!    name matches `name` case-insensitively (see [`TriggerContext::field`]).
//!
//! Anything else resolves to `None`; the handler decides what that means.
//!
//! ```rust,ignore
//! async fn set(ctx: TriggerContext) -> Option<String> {
//!     let key: String = ctx.param("key")?;
//!     let count: u32 = ctx.param("count").unwrap_or(1);
//!     let nick: String = ctx.param("nick")?;
//!     Some(format!("{nick} set {key} x{count}"))
//! }
//! ```

use std::any::{Any, TypeId};
use std::sync::Arc;

use brass_core::{
    ApiError, ApiResult, Channel, InboundEvent, JoinEvent, MessageData, MessageEvent, MessageType,
    PartEvent, ReplyCode, TryParseRegistry,
};

use crate::bot::BotHandle;
use crate::pattern::MatchResult;

/// Context for one trigger invocation. Cheap to clone.
#[derive(Clone)]
pub struct TriggerContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    bot: BotHandle,
    event: Arc<InboundEvent>,
    matched: Option<MatchResult>,
    parsers: Arc<TryParseRegistry>,
}

impl TriggerContext {
    /// Creates a context for `event` without a pattern match.
    pub fn new(bot: BotHandle, event: InboundEvent, parsers: Arc<TryParseRegistry>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                bot,
                event: Arc::new(event),
                matched: None,
                parsers,
            }),
        }
    }

    /// Returns a copy of this context carrying `matched`.
    pub fn with_match(&self, matched: MatchResult) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                bot: self.inner.bot.clone(),
                event: Arc::clone(&self.inner.event),
                matched: Some(matched),
                parsers: Arc::clone(&self.inner.parsers),
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Context objects
    // ------------------------------------------------------------------------

    /// The bot the event arrived on.
    pub fn bot(&self) -> &BotHandle {
        &self.inner.bot
    }

    /// The inbound event.
    pub fn event(&self) -> &InboundEvent {
        &self.inner.event
    }

    /// The message event, for channel and direct messages.
    pub fn message_event(&self) -> Option<&MessageEvent> {
        match self.event() {
            InboundEvent::Message(m) => Some(m),
            _ => None,
        }
    }

    /// The join event, for joins.
    pub fn join_event(&self) -> Option<&JoinEvent> {
        match self.event() {
            InboundEvent::Join(j) => Some(j),
            _ => None,
        }
    }

    /// The part event, for parts.
    pub fn part_event(&self) -> Option<&PartEvent> {
        match self.event() {
            InboundEvent::Part(p) => Some(p),
            _ => None,
        }
    }

    /// Where a message was received; `None` for membership events.
    pub fn message_type(&self) -> Option<MessageType> {
        self.message_event().map(|m| m.kind)
    }

    /// The decoded line behind the event.
    pub fn data(&self) -> &MessageData {
        self.event().data()
    }

    /// The pattern match, for command triggers.
    pub fn matched(&self) -> Option<&MatchResult> {
        self.inner.matched.as_ref()
    }

    /// The parse registry used for generic coercion.
    pub fn parsers(&self) -> &TryParseRegistry {
        &self.inner.parsers
    }

    // ------------------------------------------------------------------------
    // Shorthands
    // ------------------------------------------------------------------------

    /// Nickname of whoever caused the event.
    pub fn nick(&self) -> Option<&str> {
        match self.event() {
            InboundEvent::Join(j) => Some(&j.who),
            InboundEvent::Part(p) => Some(&p.who),
            InboundEvent::Message(m) => m.data.nick.as_deref(),
        }
    }

    /// The channel the event happened in, if any.
    pub fn channel(&self) -> Option<&str> {
        match self.event() {
            InboundEvent::Join(j) => Some(&j.channel),
            InboundEvent::Part(p) => Some(&p.channel),
            InboundEvent::Message(m) => m.data.channel.as_deref(),
        }
    }

    /// Where a reply should go: the channel, or else the sender.
    pub fn target(&self) -> Option<&str> {
        self.channel().or_else(|| self.nick())
    }

    /// A present capture group of the pattern match.
    pub fn capture(&self, name: &str) -> Option<&str> {
        self.matched().and_then(|m| m.get(name))
    }

    /// Sends `text` to [`target`](Self::target).
    pub async fn reply(&self, text: &str) -> ApiResult<()> {
        match self.target() {
            Some(target) => self.bot().send_message(target, text).await,
            None => Err(ApiError::Other("event has no reply target".to_string())),
        }
    }

    // ------------------------------------------------------------------------
    // Parameter binding
    // ------------------------------------------------------------------------

    /// Resolves the handler parameter `name` of type `T`.
    ///
    /// See the [module documentation](self) for the resolution order.
    pub fn param<T: Clone + 'static>(&self, name: &str) -> Option<T> {
        if let Some(value) = self.inject::<T>() {
            return Some(value);
        }

        if let Some(value) = self.capture(name).and_then(|text| self.coerce::<T>(text)) {
            return Some(value);
        }

        if is::<T, String>() {
            return self.field(name).and_then(cast::<String, T>);
        }

        None
    }

    /// Coerces `text` into `T` using this context's parse registry.
    pub fn coerce<T: 'static>(&self, text: &str) -> Option<T> {
        coerce(self.parsers(), text)
    }

    /// Returns the named field of the event, matched case-insensitively.
    ///
    /// Join and part events know `who`/`nick` and `channel`/`chan` (and part
    /// events `reason`); every event falls back to the fields of its
    /// [`MessageData`]: `channel`/`chan`, `nickname`/`nick`/`name`, `target`,
    /// `from`, `host`, `ident`/`id`, `message`/`msg` and `rawmessage`/`rawmsg`/`raw`.
    pub fn field(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        let membership = match self.event() {
            InboundEvent::Join(j) => Some((&j.who, &j.channel, None)),
            InboundEvent::Part(p) => Some((&p.who, &p.channel, p.reason.as_ref())),
            InboundEvent::Message(_) => None,
        };

        if let Some((who, channel, reason)) = membership {
            match name.as_str() {
                "who" | "nick" => return Some(who.clone()),
                "channel" | "chan" => return Some(channel.clone()),
                "reason" => return reason.cloned(),
                _ => {}
            }
        }

        message_field(self.data(), &name)
    }

    fn inject<T: Clone + 'static>(&self) -> Option<T> {
        let event = self.event();
        let data = self.data();

        let found = match event {
            InboundEvent::Message(m) => downcast_clone::<_, T>(m),
            InboundEvent::Join(j) => downcast_clone::<_, T>(j),
            InboundEvent::Part(p) => downcast_clone::<_, T>(p),
        };

        found
            .or_else(|| downcast_clone::<_, T>(data))
            .or_else(|| self.matched().and_then(downcast_clone::<_, T>))
            .or_else(|| data.reply_code.as_ref().and_then(downcast_clone::<ReplyCode, T>))
            .or_else(|| downcast_clone::<_, T>(self.bot()))
            .or_else(|| {
                if is::<T, Channel>() {
                    self.channel()
                        .and_then(|name| self.bot().channel(name))
                        .and_then(cast::<Channel, T>)
                } else {
                    None
                }
            })
    }
}

impl std::fmt::Debug for TriggerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerContext")
            .field("event", &self.inner.event)
            .field("matched", &self.inner.matched)
            .finish_non_exhaustive()
    }
}

fn message_field(data: &MessageData, name: &str) -> Option<String> {
    match name {
        "channel" | "chan" => data.channel.clone(),
        "nickname" | "nick" | "name" => data.nick.clone(),
        "target" => data.target().map(str::to_owned),
        "from" => data.from.clone(),
        "host" => data.host.clone(),
        "ident" | "id" => data.ident.clone(),
        "message" | "msg" => Some(data.message.clone()),
        "rawmessage" | "rawmsg" | "raw" => Some(data.raw_message.clone()),
        _ => None,
    }
}

// ============================================================================
// Coercion
// ============================================================================

/// Parses the boolean literals `1`/`on`/`true` and `0`/`off`/`false`.
///
/// Matching is exact; any other text, including different casing, is `None`.
pub fn parse_bool_literal(text: &str) -> Option<bool> {
    match text {
        "1" | "on" | "true" => Some(true),
        "0" | "off" | "false" => Some(false),
        _ => None,
    }
}

macro_rules! parse_integer {
    ($text:expr, $target:expr; $($ty:ty),+ $(,)?) => {
        $(
            if $target == TypeId::of::<$ty>() {
                return Some(
                    $text
                        .parse::<$ty>()
                        .ok()
                        .map(|value| Box::new(value) as Box<dyn Any>),
                );
            }
        )+
    };
}

/// `Some(result)` if `target` is a primitive integer type, `None` otherwise.
fn parse_integer(target: TypeId, text: &str) -> Option<Option<Box<dyn Any>>> {
    parse_integer!(text, target; u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
    None
}

/// Converts captured text into `T`.
///
/// `String` passes through, `bool` follows [`parse_bool_literal`], the
/// primitive integers use their standard parsers, and every other type goes
/// through `parsers`. Failures are `None`.
pub fn coerce<T: 'static>(parsers: &TryParseRegistry, text: &str) -> Option<T> {
    let target = TypeId::of::<T>();

    let value = if target == TypeId::of::<String>() {
        Box::new(text.to_owned()) as Box<dyn Any>
    } else if target == TypeId::of::<bool>() {
        Box::new(parse_bool_literal(text)?) as Box<dyn Any>
    } else if let Some(parsed) = parse_integer(target, text) {
        parsed?
    } else {
        return parsers.parse::<T>(text);
    };

    value.downcast::<T>().ok().map(|value| *value)
}

fn is<T: 'static, U: 'static>() -> bool {
    TypeId::of::<T>() == TypeId::of::<U>()
}

fn cast<U: 'static, T: 'static>(value: U) -> Option<T> {
    (Box::new(value) as Box<dyn Any>)
        .downcast::<T>()
        .ok()
        .map(|value| *value)
}

fn downcast_clone<S: 'static, T: Clone + 'static>(value: &S) -> Option<T> {
    (value as &dyn Any).downcast_ref::<T>().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::test_support::recording_handle;
    use crate::pattern::Pattern;

    fn message_context(text: &str) -> TriggerContext {
        let data = MessageData::new(text)
            .with_channel("#six")
            .with_nick("txdv")
            .with_origin("tx", "example.org")
            .with_reply_code(ReplyCode(1));
        TriggerContext::new(
            recording_handle("bot").0,
            MessageEvent::channel(data).into(),
            Arc::new(TryParseRegistry::new()),
        )
    }

    #[test]
    fn test_bool_literals() {
        for text in ["1", "on", "true"] {
            assert_eq!(parse_bool_literal(text), Some(true));
        }
        for text in ["0", "off", "false"] {
            assert_eq!(parse_bool_literal(text), Some(false));
        }
        for text in ["", "yes", "TRUE", "On"] {
            assert_eq!(parse_bool_literal(text), None);
        }
    }

    #[test]
    fn test_coerce_builtin_types() {
        let parsers = TryParseRegistry::new();
        assert_eq!(coerce::<String>(&parsers, "x"), Some("x".to_string()));
        assert_eq!(coerce::<bool>(&parsers, "off"), Some(false));
        assert_eq!(coerce::<bool>(&parsers, "maybe"), None);
        assert_eq!(coerce::<i32>(&parsers, "-12"), Some(-12));
        assert_eq!(coerce::<u8>(&parsers, "300"), None);
        assert_eq!(coerce::<u64>(&parsers, "abc"), None);
    }

    #[test]
    fn test_coerce_uses_registry() {
        let parsers = TryParseRegistry::new();
        assert_eq!(coerce::<f64>(&parsers, "1.5"), None);
        parsers.register_from_str::<f64>();
        assert_eq!(coerce::<f64>(&parsers, "1.5"), Some(1.5));
    }

    #[test]
    fn test_message_fields() {
        let ctx = message_context("db get color");
        assert_eq!(ctx.field("Channel").as_deref(), Some("#six"));
        assert_eq!(ctx.field("chan").as_deref(), Some("#six"));
        assert_eq!(ctx.field("nickname").as_deref(), Some("txdv"));
        assert_eq!(ctx.field("NAME").as_deref(), Some("txdv"));
        assert_eq!(ctx.field("target").as_deref(), Some("#six"));
        assert_eq!(ctx.field("from").as_deref(), Some("txdv!tx@example.org"));
        assert_eq!(ctx.field("host").as_deref(), Some("example.org"));
        assert_eq!(ctx.field("id").as_deref(), Some("tx"));
        assert_eq!(ctx.field("msg").as_deref(), Some("db get color"));
        assert_eq!(ctx.field("raw").as_deref(), Some("db get color"));
        assert_eq!(ctx.field("unknown"), None);
    }

    #[test]
    fn test_query_target_is_sender() {
        let data = MessageData::new("hi").with_nick("alice");
        let ctx = TriggerContext::new(
            recording_handle("bot").0,
            MessageEvent::query(data).into(),
            Arc::new(TryParseRegistry::new()),
        );
        assert_eq!(ctx.param::<String>("target").as_deref(), Some("alice"));
        assert_eq!(ctx.message_type(), Some(MessageType::Query));
    }

    #[test]
    fn test_join_fields() {
        let ctx = TriggerContext::new(
            recording_handle("bot").0,
            JoinEvent::new("#six", "alice").into(),
            Arc::new(TryParseRegistry::new()),
        );
        assert_eq!(ctx.param::<String>("who").as_deref(), Some("alice"));
        assert_eq!(ctx.param::<String>("nick").as_deref(), Some("alice"));
        assert_eq!(ctx.param::<String>("channel").as_deref(), Some("#six"));
        assert_eq!(ctx.param::<JoinEvent>("args").map(|j| j.who), Some("alice".into()));
        assert!(ctx.param::<PartEvent>("args").is_none());
    }

    #[test]
    fn test_part_reason() {
        let ctx = TriggerContext::new(
            recording_handle("bot").0,
            PartEvent::new("#six", "bob").with_reason("bye").into(),
            Arc::new(TryParseRegistry::new()),
        );
        assert_eq!(ctx.field("reason").as_deref(), Some("bye"));
        assert_eq!(ctx.field("message").as_deref(), Some("bye"));
    }

    #[test]
    fn test_injection() {
        let ctx = message_context("hello");
        assert_eq!(ctx.param::<MessageData>("data").map(|d| d.message), Some("hello".into()));
        assert_eq!(
            ctx.param::<MessageEvent>("e").map(|e| e.kind),
            Some(MessageType::Channel)
        );
        assert_eq!(ctx.param::<ReplyCode>("code"), Some(ReplyCode(1)));
        assert_eq!(ctx.param::<Channel>("channel").map(|c| c.name), Some("#six".into()));
        assert!(ctx.param::<BotHandle>("bot").is_some());
        assert!(ctx.param::<MatchResult>("m").is_none());
    }

    #[test]
    fn test_capture_precedes_field() {
        let pattern = Pattern::compile("join (?<channel>(.+))").unwrap();
        let ctx = message_context("join #other");
        let ctx = ctx.with_match(pattern.match_text("join #other").unwrap());
        assert_eq!(ctx.param::<String>("channel").as_deref(), Some("#other"));
        assert!(ctx.param::<MatchResult>("m").is_some());
    }

    #[test]
    fn test_missing_capture_falls_back_to_field() {
        let pattern = Pattern::compile(r"flood (?<count>(\d+))").unwrap();
        let ctx = message_context("flood 3");
        let ctx = ctx.with_match(pattern.match_text("flood 3").unwrap());
        assert_eq!(ctx.param::<u32>("count"), Some(3));
        assert_eq!(ctx.param::<String>("channel").as_deref(), Some("#six"));
        assert_eq!(ctx.param::<u32>("missing"), None);
    }

    #[test]
    fn test_failed_coercion_is_absent() {
        let pattern = Pattern::compile(r"set (?<n>\w+)").unwrap();
        let ctx = message_context("set abc");
        let ctx = ctx.with_match(pattern.match_text("set abc").unwrap());
        assert_eq!(ctx.param::<i64>("n"), None);
        assert_eq!(ctx.param::<String>("n").as_deref(), Some("abc"));
    }
}
