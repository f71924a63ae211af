//! A chat client backed by stdin and stdout.
//!
//! Each input line is one inbound event:
//!
//! ```text
//! txdv #six !db set color blue     channel message from txdv in #six
//! txdv !db get color               direct message from txdv
//! *join alice #six                 alice joins #six
//! *part alice #six see you         alice leaves #six
//! ```
//!
//! Everything the bot sends is printed as `-> target: text`.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use brass::prelude::*;
use futures::Stream;
use parking_lot::RwLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

pub struct ConsoleClient {
    nickname: String,
    channels: RwLock<HashMap<String, Channel>>,
}

impl ConsoleClient {
    pub fn new(nickname: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            nickname: nickname.into(),
            channels: RwLock::new(HashMap::new()),
        })
    }

    /// Keeps channel membership in step with the events read from the console.
    fn track(&self, event: &InboundEvent) {
        let mut channels = self.channels.write();
        match event {
            InboundEvent::Join(join) => {
                let channel = channels
                    .entry(join.channel.to_lowercase())
                    .or_insert_with(|| Channel::new(&join.channel));
                if !channel.has_user(&join.who) {
                    channel.users.push(join.who.clone());
                }
            }
            InboundEvent::Part(part) => {
                if let Some(channel) = channels.get_mut(&part.channel.to_lowercase()) {
                    channel.users.retain(|u| !u.eq_ignore_ascii_case(&part.who));
                }
            }
            InboundEvent::Message(_) => {}
        }
    }

    /// Reads events from stdin until it closes.
    pub fn events(self: &Arc<Self>) -> impl Stream<Item = InboundEvent> + use<> {
        let client = Arc::clone(self);
        let lines = BufReader::new(tokio::io::stdin()).lines();

        futures::stream::unfold((client, lines), |(client, mut lines)| async move {
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match parse_line(&line) {
                        Some(event) => {
                            client.track(&event);
                            return Some((event, (client, lines)));
                        }
                        None if line.trim().is_empty() => {}
                        None => warn!(line = %line, "Unrecognized input"),
                    },
                    Ok(None) => return None,
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        return None;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl ChatClient for ConsoleClient {
    fn nickname(&self) -> &str {
        &self.nickname
    }

    async fn send_message(&self, target: &str, text: &str) -> ApiResult<()> {
        println!("-> {target}: {text}");
        Ok(())
    }

    fn channel(&self, name: &str) -> Option<Channel> {
        self.channels.read().get(&name.to_lowercase()).cloned()
    }

    async fn join_channel(&self, name: &str) -> ApiResult<()> {
        if !name.starts_with('#') {
            return Err(ApiError::UnknownChannel(name.to_owned()));
        }
        debug!(channel = name, "Joining");
        self.track(&JoinEvent::new(name, self.nickname.clone()).into());
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Parses one console line into an event.
pub fn parse_line(line: &str) -> Option<InboundEvent> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("*join ") {
        let (who, channel) = rest.trim().split_once(' ')?;
        return Some(JoinEvent::new(channel.trim(), who).into());
    }
    if let Some(rest) = line.strip_prefix("*part ") {
        let mut parts = rest.trim().splitn(3, ' ');
        let who = parts.next()?;
        let channel = parts.next()?;
        let event = PartEvent::new(channel, who);
        return Some(match parts.next() {
            Some(reason) => event.with_reason(reason),
            None => event,
        }
        .into());
    }

    let (nick, rest) = line.split_once(' ')?;
    let data = |text: &str| {
        MessageData::new(text)
            .with_nick(nick)
            .with_origin(nick, "console")
            .with_raw(line)
    };
    match rest.split_once(' ') {
        Some((channel, text)) if channel.starts_with('#') => {
            Some(MessageEvent::channel(data(text).with_channel(channel)).into())
        }
        _ => Some(MessageEvent::query(data(rest)).into()),
    }
}
