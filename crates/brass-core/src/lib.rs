//! # Brass Core
//!
//! Foundation types for the Brass bot framework.
//!
//! This crate holds everything the routing layer shares with protocol
//! implementations, without depending on either:
//!
//! - **Events**: [`MessageEvent`], [`JoinEvent`], [`PartEvent`] and the
//!   structured [`MessageData`] they carry
//! - **Chat client**: the [`ChatClient`] trait the framework sends through
//! - **Scheduling**: one-shot [`Timer`]s from a [`Scheduler`], with a tokio
//!   implementation in [`TokioScheduler`]
//! - **Parsing**: the [`TryParseRegistry`] of text-to-value functions used to
//!   bind handler parameters, fed by [`register_try_parse!`]
//! - **Errors**: [`ApiError`] for client calls
//!
//! ```text
//! ┌─────────────┐  InboundEvent  ┌──────────────┐  handler  ┌──────────┐
//! │ ChatClient  │───────────────▶│  Dispatcher  │──────────▶│  Plugin  │
//! │ (protocol)  │◀───────────────│  (framework) │           └──────────┘
//! └─────────────┘  send_message  └──────────────┘
//! ```

pub mod client;
pub mod error;
pub mod event;
pub mod parse;
pub mod scheduler;

pub use client::{BoxedClient, Channel, ChatClient};
pub use error::{ApiError, ApiResult};
pub use event::{
    InboundEvent, JoinEvent, MessageData, MessageEvent, MessageType, PartEvent, ReplyCode,
};
pub use parse::{TRY_PARSE_REGISTRY, TryParseEntry, TryParseRegistry};
pub use scheduler::{BoxedScheduler, Scheduler, Timer, TimerCallback, TokioScheduler};

// Used by `register_try_parse!` expansions in downstream crates.
#[doc(hidden)]
pub use linkme;
