//! IRC Bot Demo
//!
//! Drives a Brass bot from the console: every stdin line is an inbound event
//! (see [`console`] for the syntax) and every reply is printed to stdout.
//!
//! # Plugins
//!
//! - `admin add|del <nick>`, `admin list`: manage the admin list
//! - `db`, `db on|off`, `db set|get|del ...`: an admin-only key/value store
//! - `join <channel>`, `flood <count> [every 250ms]`: channel utilities
//! - a greeter that says hello to everyone joining
//!
//! # Usage
//!
//! ```bash
//! cargo run --package irc-bot -- --admin txdv --join '#six'
//! ```
//!
//! ```text
//! txdv #six !db set color blue
//! txdv #six !db get color
//! -> #six: color:blue
//! ```

mod console;
mod plugins;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use brass::core::BoxedClient;
use brass::prelude::*;
use clap::Parser;
use tracing::{info, warn};

use crate::console::ConsoleClient;
use crate::plugins::{AdminConfig, AdminPlugin, DbPlugin, FloodPlugin, Greeter};

#[derive(Debug, Parser)]
#[command(name = "irc-bot", about = "A console-driven Brass bot")]
struct Args {
    /// Configuration file; `brass.toml` in the working directory otherwise.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The bot's nickname.
    #[arg(short, long, default_value = "bot")]
    nick: String,

    /// Initial admin, in addition to `[plugins.admin] admins`.
    #[arg(short, long)]
    admin: Option<String>,

    /// Channels to join on start, in addition to `bot.channels`.
    #[arg(long = "join")]
    channels: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let client = ConsoleClient::new(args.nick);
    let events = client.events();
    let boxed: BoxedClient = client;

    let mut builder = BrassRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    let mut runtime = builder.build(boxed)?;

    let mut admin_config: AdminConfig = runtime.plugin_config("admin")?;
    admin_config.admins.extend(args.admin);
    if admin_config.admins.is_empty() {
        warn!("No admins configured; admin and db commands are unavailable");
    }

    let admins = Arc::new(AdminPlugin::new(admin_config.admins));
    runtime.register(Arc::clone(&admins))?;
    runtime.register(Arc::new(DbPlugin::new(admins)))?;
    runtime.register(Arc::new(Greeter))?;
    runtime.register(Arc::new(FloodPlugin))?;

    for channel in extra_channels(&args.channels, &runtime.config().bot.channels) {
        runtime.bot().handle().join_channel(channel).await?;
    }

    info!(nick = runtime.bot().handle().nickname(), "Bot started, reading events from stdin");
    let stats = runtime.run(events).await?;
    info!(?stats, "Bot stopped");

    Ok(())
}

/// Requested channels that `run` will not already join from the configuration.
fn extra_channels<'a>(requested: &'a [String], configured: &[String]) -> Vec<&'a str> {
    let mut extra: Vec<&str> = Vec::new();
    for channel in requested {
        let known = configured
            .iter()
            .map(String::as_str)
            .chain(extra.iter().copied())
            .any(|c| c.eq_ignore_ascii_case(channel));
        if !known {
            extra.push(channel);
        }
    }
    extra
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_extra_channels_skip_configured() {
        let requested = channels(&["#six", "#seven", "#SEVEN"]);
        let configured = channels(&["#Six"]);
        assert_eq!(extra_channels(&requested, &configured), vec!["#seven"]);
        assert!(extra_channels(&[], &configured).is_empty());
    }
}
