//! Brass Runtime - configuration, logging and the event loop for Brass bots.
//!
//! This crate provides:
//! - Layered configuration (`brass.toml`, profile files, `BRASS_*` environment)
//!   with validation ([`config`])
//! - Subscriber setup for `tracing` ([`LoggingBuilder`])
//! - [`BrassRuntime`], which builds the bot from configuration, registers
//!   plugins and dispatches a stream of inbound events one at a time
//!
//! ```ignore
//! use brass_runtime::BrassRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (client, events) = connect().await?;
//!
//!     let mut runtime = BrassRuntime::builder().build(client)?;
//!     runtime.register(Arc::new(Greeter::default()))?;
//!
//!     // Run until the connection closes or Ctrl+C
//!     runtime.run(events).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{BrassConfig, BotSettings, ConfigError, ConfigLoader, ConfigResult, LoggingConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{BrassRuntime, RuntimeBuilder, RuntimeStats};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
