//! Handling of handler return values.

use async_trait::async_trait;
use tracing::{error, warn};

use crate::context::TriggerContext;

/// A value a command, join or part handler can return.
///
/// - `()` does nothing.
/// - `String` and `&'static str` are sent to the event's reply target.
/// - `Option<T>` handles `Some` and ignores `None`.
/// - `Result<T, E>` handles `Ok` and logs `Err`.
#[async_trait]
pub trait HandlerResponse: Send {
    /// Acts on this value for the event in `ctx`.
    async fn respond(self, ctx: &TriggerContext);
}

#[async_trait]
impl HandlerResponse for () {
    async fn respond(self, _ctx: &TriggerContext) {}
}

#[async_trait]
impl HandlerResponse for String {
    async fn respond(self, ctx: &TriggerContext) {
        let Some(target) = ctx.target() else {
            warn!("Handler returned a reply but the event has no target");
            return;
        };
        if let Err(e) = ctx.bot().send_message(target, &self).await {
            error!("Failed to send reply: {e}");
        }
    }
}

#[async_trait]
impl HandlerResponse for &'static str {
    async fn respond(self, ctx: &TriggerContext) {
        self.to_owned().respond(ctx).await;
    }
}

#[async_trait]
impl<T: HandlerResponse> HandlerResponse for Option<T> {
    async fn respond(self, ctx: &TriggerContext) {
        if let Some(t) = self {
            t.respond(ctx).await;
        }
    }
}

#[async_trait]
impl<T, E> HandlerResponse for Result<T, E>
where
    T: HandlerResponse,
    E: std::fmt::Display + Send,
{
    async fn respond(self, ctx: &TriggerContext) {
        match self {
            Ok(t) => t.respond(ctx).await,
            Err(e) => error!("Handler error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use brass_core::{JoinEvent, MessageData, MessageEvent, TryParseRegistry};

    use super::*;
    use crate::bot::test_support::recording_handle;

    #[test]
    fn test_replies_go_to_target() {
        let (bot, client) = recording_handle("bot");
        let query = MessageEvent::query(MessageData::new("!hi").with_nick("txdv"));
        let ctx = TriggerContext::new(bot.clone(), query.into(), Arc::new(TryParseRegistry::new()));

        tokio_test::block_on(async {
            "hello".respond(&ctx).await;
            None::<String>.respond(&ctx).await;
            Err::<String, _>("boom").respond(&ctx).await;
            Ok::<_, String>(Some("again".to_string())).respond(&ctx).await;
        });

        let join = TriggerContext::new(
            bot,
            JoinEvent::new("#six", "alice").into(),
            Arc::new(TryParseRegistry::new()),
        );
        tokio_test::block_on(String::from("Hello alice").respond(&join));

        assert_eq!(
            client.sent(),
            vec![
                ("txdv".to_string(), "hello".to_string()),
                ("txdv".to_string(), "again".to_string()),
                ("#six".to_string(), "Hello alice".to_string()),
            ]
        );
    }
}
