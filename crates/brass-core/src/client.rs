//! Chat client trait and related types.
//!
//! The framework never talks to the network itself. Everything it needs from
//! the protocol side (the bot's own nickname, sending text, looking up tracked
//! channels) goes through [`ChatClient`], which a protocol crate implements.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ApiResult;

/// A channel as tracked by the chat client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Channel {
    /// Channel name, including its sigil (e.g. `#six`).
    pub name: String,
    /// Current topic, if known.
    pub topic: Option<String>,
    /// Nicknames currently in the channel.
    pub users: Vec<String>,
}

impl Channel {
    /// Creates an empty channel record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Returns `true` if `nick` is in the channel.
    pub fn has_user(&self, nick: &str) -> bool {
        self.users.iter().any(|u| u.eq_ignore_ascii_case(nick))
    }
}

/// The chat-protocol client the framework routes events for.
///
/// # Example Implementation
///
/// ```rust,ignore
/// struct ConsoleClient;
///
/// #[async_trait]
/// impl ChatClient for ConsoleClient {
///     fn nickname(&self) -> &str { "bot" }
///
///     async fn send_message(&self, target: &str, text: &str) -> ApiResult<()> {
///         println!("-> {target}: {text}");
///         Ok(())
///     }
///
///     fn channel(&self, name: &str) -> Option<Channel> { Some(Channel::new(name)) }
///
///     async fn join_channel(&self, _name: &str) -> ApiResult<()> { Ok(()) }
///
///     fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> { self }
/// }
/// ```
#[async_trait]
pub trait ChatClient: Send + Sync + 'static {
    /// The bot's own nickname.
    fn nickname(&self) -> &str;

    /// Sends `text` to a channel or nickname.
    async fn send_message(&self, target: &str, text: &str) -> ApiResult<()>;

    /// Looks up a tracked channel by name.
    fn channel(&self, name: &str) -> Option<Channel>;

    /// Asks the server to join `name`.
    async fn join_channel(&self, name: &str) -> ApiResult<()>;

    /// Returns self as an `Arc<dyn Any>` so handlers can reach the concrete
    /// client. Implementors should simply return `self`.
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A shared chat client trait object.
pub type BoxedClient = Arc<dyn ChatClient>;
