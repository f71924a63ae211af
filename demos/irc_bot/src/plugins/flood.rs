//! Channel joining and flood testing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use brass::prelude::*;
use tracing::info;

/// Pause between flood lines, written as `250ms` or `2s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interval(pub Duration);

impl Interval {
    fn parse(text: &str) -> Option<Self> {
        let duration = if let Some(ms) = text.strip_suffix("ms") {
            Duration::from_millis(ms.parse().ok()?)
        } else {
            Duration::from_secs(text.strip_suffix('s')?.parse().ok()?)
        };
        Some(Self(duration))
    }
}

register_try_parse!(Interval, Interval::parse);

#[derive(Default)]
pub struct FloodPlugin;

impl FloodPlugin {
    async fn flood(bot: &BotHandle, channel: &str, count: u32, interval: Interval) -> ApiResult<()> {
        let start = Instant::now();
        for i in 0..count {
            if i > 0 && !interval.0.is_zero() {
                tokio::time::sleep(interval.0).await;
            }
            bot.send_message(channel, "test string").await?;
        }
        info!(channel, count, elapsed = ?start.elapsed(), "Flood finished");
        Ok(())
    }
}

impl Plugin for FloodPlugin {
    fn name(&self) -> &str {
        "flood"
    }

    fn routes(self: Arc<Self>) -> Vec<Route> {
        let join = Route::on_command(OnCommand::new("join (?<channel>(.+))"), |ctx| async move {
            let channel: String = ctx.param("channel")?;
            Some(ctx.bot().join_channel(channel.trim()).await)
        });

        let flood = Route::on_command(
            OnCommand::new(r"flood (?<count>(\d+))(?: every (?<interval>\S+))?$"),
            |ctx| async move {
                // `channel` is not captured, so it binds to the channel the
                // command was sent in; direct messages have none.
                let channel: String = ctx.param("channel")?;
                let count: u32 = ctx.param("count")?;
                let interval: Interval = ctx.param("interval").unwrap_or_default();
                Some(Self::flood(ctx.bot(), &channel, count, interval).await)
            },
        );

        vec![join.named("join"), flood.named("flood")]
    }
}
