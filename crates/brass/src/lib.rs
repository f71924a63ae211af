//! # Brass
//!
//! Declarative trigger routing for chat bots.
//!
//! ## Overview
//!
//! Plugins declare what they react to: commands matched by a regular
//! expression after a prefix, precommands that must all accept a message
//! before any command runs, and join/part handlers. A [`Bot`](prelude::Bot)
//! collects those declarations from every registered plugin and routes each
//! inbound event through them.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  event  ┌─────────────────────────────────────────────────┐
//! │ ChatClient │────────▶│ Bot                                             │
//! │ (protocol) │         │  message: precommands (all) ─▶ commands (first) │
//! └────────────┘◀────────│  join/part: every join/part trigger             │
//!      reply             └─────────────────────────────────────────────────┘
//! ```
//!
//! - **Core** ([`core`]): events, the chat client and scheduler traits, the
//!   parse registry
//! - **Framework** ([`framework`]): plugins, routes, triggers, the gate and
//!   the dispatcher
//! - **Runtime** ([`runtime`]): configuration, logging and the event loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brass::prelude::*;
//!
//! struct Db {
//!     store: Mutex<HashMap<String, String>>,
//! }
//!
//! impl Plugin for Db {
//!     fn routes(self: Arc<Self>) -> Vec<Route> {
//!         vec![Route::on_command(
//!             OnCommand::new(r"db set (?<key>(\w+)) (?<value>(.+))"),
//!             move |ctx| {
//!                 let db = Arc::clone(&self);
//!                 async move {
//!                     let key: String = ctx.param("key")?;
//!                     let value: String = ctx.param("value")?;
//!                     db.store.lock().insert(key.clone(), value);
//!                     Some(format!("{key} stored"))
//!                 }
//!             },
//!         )]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (client, events) = connect().await?;
//!     let mut runtime = BrassRuntime::builder().build(client)?;
//!     runtime.register(Arc::new(Db::default()))?;
//!     runtime.run(events).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use brass_core as core;
pub use brass_framework as framework;
pub use brass_runtime as runtime;

pub use brass_core::register_try_parse;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use brass::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use brass_runtime::{BrassConfig, BrassRuntime};

    // Plugins and routing declarations
    pub use brass_framework::{
        Completion, OnCommand, OnJoin, OnPart, Plugin, PreCommand, Property, Route,
    };

    // Dispatch
    pub use brass_framework::{
        Bot, BotConfig, BotHandle, DispatchOutcome, HandlerResponse, MatchResult, TriggerContext,
    };

    // Events and the client
    pub use brass_core::{
        ApiError, ApiResult, Channel, ChatClient, InboundEvent, JoinEvent, MessageData,
        MessageEvent, MessageType, PartEvent,
    };

    pub use brass_core::{TryParseRegistry, register_try_parse};
}
