//! # Brass Framework
//!
//! Trigger registration and dispatch for the Brass bot framework.
//!
//! This layer provides:
//! - The [`Plugin`] trait and [`Route`] declarations ([`OnCommand`],
//!   [`PreCommand`], [`OnJoin`], [`OnPart`])
//! - Regex command matching with named captures ([`Pattern`])
//! - Parameter binding from captures, event fields and injected values
//!   ([`TriggerContext::param`])
//! - A precommand gate with synchronous and deferred checks and timeouts
//!   ([`PreconditionGate`])
//! - The per-bot dispatcher ([`Bot`]), also usable as a tower `Service`
//!
//! A message passes the gate only if every precommand of every plugin
//! accepts it. Commands are then tried in registration order and the first
//! one to consume the message wins. Joins and parts run every applicable
//! trigger.

pub mod bot;
pub mod context;
pub mod error;
pub mod gate;
pub mod pattern;
pub mod property;
pub mod registry;
pub mod response;
pub mod route;
pub mod trigger;

pub use bot::{Bot, BotConfig, BotHandle, BotService, DEFAULT_PREFIX, DispatchOutcome};
pub use context::{TriggerContext, coerce, parse_bool_literal};
pub use error::{DispatchError, DispatchResult, RegistrationError};
pub use gate::{Completion, GateConfig, GateMode, PreconditionGate};
pub use pattern::{MatchResult, Pattern};
pub use property::Property;
pub use registry::{Plugin, PluginTriggers};
pub use response::HandlerResponse;
pub use route::{OnCommand, OnJoin, OnPart, PreCommand, Route};
pub use trigger::{
    CommandTrigger, JoinTrigger, MembershipTrigger, PartTrigger, PreCommandTrigger, TriggerLabel,
};
