//! Inbound event types.
//!
//! The chat client decodes the wire protocol and hands the framework one of
//! three event shapes, wrapped in [`InboundEvent`]:
//!
//! - [`MessageEvent`]: a channel or direct ("query") message
//! - [`JoinEvent`]: someone joined a channel
//! - [`PartEvent`]: someone left a channel
//!
//! Every event carries the structured [`MessageData`] of the line that
//! produced it, so handlers can always fall back to the raw fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Message Type Classification
// ============================================================================

/// Where a message was received, and which messages a command accepts.
///
/// Inbound messages are always [`Query`](MessageType::Query) or
/// [`Channel`](MessageType::Channel); [`All`](MessageType::All) only appears
/// as a command filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Accept both channel and direct messages.
    #[default]
    All,
    /// A direct message addressed to the bot.
    Query,
    /// A message sent to a channel the bot is in.
    Channel,
}

impl MessageType {
    /// Returns `true` if a command filtered by `self` accepts a message of `kind`.
    pub fn accepts(self, kind: MessageType) -> bool {
        self == MessageType::All || self == kind
    }

    /// Returns the lowercase name of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::All => "all",
            MessageType::Query => "query",
            MessageType::Channel => "channel",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(MessageType::All),
            "query" | "private" => Ok(MessageType::Query),
            "channel" => Ok(MessageType::Channel),
            _ => Err(()),
        }
    }
}

/// Numeric server reply code attached to a line, when the line carried one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplyCode(pub u16);

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

// ============================================================================
// Structured message data
// ============================================================================

/// Structured fields of one protocol line, as decoded by the chat client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageData {
    /// Channel the line was addressed to, if any.
    pub channel: Option<String>,
    /// Nickname of the sender.
    pub nick: Option<String>,
    /// Host part of the sender's prefix.
    pub host: Option<String>,
    /// Ident (user) part of the sender's prefix.
    pub ident: Option<String>,
    /// Full sender prefix (`nick!ident@host`).
    pub from: Option<String>,
    /// Message text.
    pub message: String,
    /// The undecoded line.
    pub raw_message: String,
    /// Server reply code, for numeric replies.
    pub reply_code: Option<ReplyCode>,
}

impl MessageData {
    /// Creates message data carrying only the given text.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            raw_message: message.clone(),
            message,
            ..Default::default()
        }
    }

    /// Sets the channel.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Sets the sender nickname.
    pub fn with_nick(mut self, nick: impl Into<String>) -> Self {
        self.nick = Some(nick.into());
        self.derive_from();
        self
    }

    /// Sets the sender ident and host.
    ///
    /// Together with the nickname this yields the full `from` prefix, in
    /// whichever order the two are set.
    pub fn with_origin(mut self, ident: impl Into<String>, host: impl Into<String>) -> Self {
        self.ident = Some(ident.into());
        self.host = Some(host.into());
        self.derive_from();
        self
    }

    fn derive_from(&mut self) {
        if let (Some(nick), Some(ident), Some(host)) = (&self.nick, &self.ident, &self.host) {
            self.from = Some(format!("{nick}!{ident}@{host}"));
        }
    }

    /// Sets the undecoded line.
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw_message = raw.into();
        self
    }

    /// Sets the server reply code.
    pub fn with_reply_code(mut self, code: ReplyCode) -> Self {
        self.reply_code = Some(code);
        self
    }

    /// Where a reply should go: the channel, or else the sender.
    pub fn target(&self) -> Option<&str> {
        self.channel.as_deref().or(self.nick.as_deref())
    }
}

// ============================================================================
// Events
// ============================================================================

/// A channel or direct message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// [`MessageType::Channel`] or [`MessageType::Query`].
    pub kind: MessageType,
    /// The decoded line.
    pub data: MessageData,
}

impl MessageEvent {
    /// Creates a channel message event.
    pub fn channel(data: MessageData) -> Self {
        Self {
            kind: MessageType::Channel,
            data,
        }
    }

    /// Creates a direct message event.
    pub fn query(data: MessageData) -> Self {
        Self {
            kind: MessageType::Query,
            data,
        }
    }
}

/// Someone joined a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEvent {
    /// The channel that was joined.
    pub channel: String,
    /// Nickname of whoever joined.
    pub who: String,
    /// The decoded JOIN line.
    pub data: MessageData,
}

impl JoinEvent {
    /// Creates a join event; the message data is filled from `channel` and `who`.
    pub fn new(channel: impl Into<String>, who: impl Into<String>) -> Self {
        let channel = channel.into();
        let who = who.into();
        let data = MessageData::new("")
            .with_channel(channel.clone())
            .with_nick(who.clone());
        Self { channel, who, data }
    }
}

/// Someone left a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartEvent {
    /// The channel that was left.
    pub channel: String,
    /// Nickname of whoever left.
    pub who: String,
    /// Optional part message.
    pub reason: Option<String>,
    /// The decoded PART line.
    pub data: MessageData,
}

impl PartEvent {
    /// Creates a part event; the message data is filled from `channel` and `who`.
    pub fn new(channel: impl Into<String>, who: impl Into<String>) -> Self {
        let channel = channel.into();
        let who = who.into();
        let data = MessageData::new("")
            .with_channel(channel.clone())
            .with_nick(who.clone());
        Self {
            channel,
            who,
            reason: None,
            data,
        }
    }

    /// Sets the part message.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.data.message.clone_from(&reason);
        self.reason = Some(reason);
        self
    }
}

/// Any event the framework routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Channel or direct message.
    Message(MessageEvent),
    /// Channel join.
    Join(JoinEvent),
    /// Channel part.
    Part(PartEvent),
}

impl InboundEvent {
    /// Short name used in logs and spans.
    pub fn event_name(&self) -> &'static str {
        match self {
            InboundEvent::Message(m) if m.kind == MessageType::Query => "query",
            InboundEvent::Message(_) => "channel",
            InboundEvent::Join(_) => "join",
            InboundEvent::Part(_) => "part",
        }
    }

    /// The decoded line behind this event.
    pub fn data(&self) -> &MessageData {
        match self {
            InboundEvent::Message(m) => &m.data,
            InboundEvent::Join(j) => &j.data,
            InboundEvent::Part(p) => &p.data,
        }
    }
}

impl From<MessageEvent> for InboundEvent {
    fn from(event: MessageEvent) -> Self {
        InboundEvent::Message(event)
    }
}

impl From<JoinEvent> for InboundEvent {
    fn from(event: JoinEvent) -> Self {
        InboundEvent::Join(event)
    }
}

impl From<PartEvent> for InboundEvent {
    fn from(event: PartEvent) -> Self {
        InboundEvent::Part(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts() {
        assert!(MessageType::All.accepts(MessageType::Query));
        assert!(MessageType::All.accepts(MessageType::Channel));
        assert!(MessageType::Channel.accepts(MessageType::Channel));
        assert!(!MessageType::Channel.accepts(MessageType::Query));
        assert!(!MessageType::Query.accepts(MessageType::Channel));
    }

    #[test]
    fn test_target_prefers_channel() {
        let data = MessageData::new("hi").with_nick("alice");
        assert_eq!(data.target(), Some("alice"));

        let data = data.with_channel("#six");
        assert_eq!(data.target(), Some("#six"));
    }

    #[test]
    fn test_origin_builds_prefix() {
        let data = MessageData::new("hi")
            .with_nick("alice")
            .with_origin("al", "example.org");
        assert_eq!(data.from.as_deref(), Some("alice!al@example.org"));
        assert_eq!(data.ident.as_deref(), Some("al"));
    }

    #[test]
    fn test_origin_before_nick_builds_prefix() {
        let data = MessageData::new("hi").with_origin("al", "example.org");
        assert_eq!(data.from, None);

        let data = data.with_nick("alice");
        assert_eq!(data.from.as_deref(), Some("alice!al@example.org"));
    }

    #[test]
    fn test_message_type_from_str() {
        assert_eq!("Channel".parse::<MessageType>(), Ok(MessageType::Channel));
        assert_eq!("private".parse::<MessageType>(), Ok(MessageType::Query));
        assert!("notice".parse::<MessageType>().is_err());
    }
}
