//! Runtime orchestration: configuration, logging and the event loop.
//!
//! The runtime owns one [`Bot`] built from [`BrassConfig`]. The chat client
//! and the source of inbound events stay outside: the client is passed in
//! when the runtime is built, the events as a [`Stream`] when it runs.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use brass_runtime::BrassRuntime;
//!
//! let mut runtime = BrassRuntime::builder()
//!     .config_file("config/brass.toml")
//!     .build(client)?;
//!
//! let admin: AdminConfig = runtime.plugin_config("admin")?;
//! runtime.register(Arc::new(AdminPlugin::new(admin)))?;
//!
//! // Dispatches until the stream ends or Ctrl+C.
//! runtime.run(events).await?;
//! ```

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;

use brass_core::{BoxedClient, BoxedScheduler, InboundEvent, TryParseRegistry};
use brass_framework::{Bot, DispatchOutcome, DispatchResult, Plugin};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio::signal;
use tracing::{debug, error, info, warn};

use crate::config::{BrassConfig, ConfigLoader, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Counters for one [`BrassRuntime::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Events pulled from the stream.
    pub events: u64,
    /// Messages a command consumed.
    pub handled: u64,
    /// Messages a precommand rejected.
    pub rejected: u64,
    /// Messages no command consumed.
    pub unmatched: u64,
    /// Join or part events.
    pub membership: u64,
    /// Dispatches that failed.
    pub errors: u64,
}

impl RuntimeStats {
    fn record(&mut self, result: DispatchResult<DispatchOutcome>) {
        self.events += 1;
        match result {
            Ok(DispatchOutcome::Handled) => self.handled += 1,
            Ok(DispatchOutcome::Rejected) => self.rejected += 1,
            Ok(DispatchOutcome::Unmatched) => self.unmatched += 1,
            Ok(DispatchOutcome::Notified(_)) => self.membership += 1,
            Err(e) => {
                error!(error = %e, "Dispatch failed");
                self.errors += 1;
            }
        }
    }
}

/// Runs a configured [`Bot`] over a stream of inbound events.
pub struct BrassRuntime {
    config: BrassConfig,
    bot: Bot,
}

impl BrassRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Validates `config`, initializes logging from it and builds the bot.
    pub fn from_config(config: BrassConfig, client: BoxedClient) -> RuntimeResult<Self> {
        validate_config(&config)?;
        logging::init_from_config(&config.logging);
        Ok(Self::assemble(config, client))
    }

    fn assemble(config: BrassConfig, client: BoxedClient) -> Self {
        let bot = Bot::new(client, config.bot_config());
        info!(
            nickname = bot.handle().nickname(),
            default_prefix = %config.bot.default_prefix,
            gate_mode = ?config.gate.mode,
            "Runtime initialized from configuration"
        );
        Self { config, bot }
    }

    /// The configuration.
    pub fn config(&self) -> &BrassConfig {
        &self.config
    }

    /// The bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Registers a plugin on the bot.
    pub fn register<P: Plugin>(&mut self, plugin: Arc<P>) -> RuntimeResult<()> {
        let name = plugin.name().to_owned();
        self.bot.register(plugin)?;
        info!(plugin = %name, "Registered plugin");
        Ok(())
    }

    /// Deserializes the `[plugins.<plugin>]` section.
    ///
    /// A missing section yields `T::default()`.
    pub fn plugin_config<T>(&self, plugin: &str) -> RuntimeResult<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.config.plugins.get(plugin) {
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|source| RuntimeError::PluginConfig {
                    plugin: plugin.to_owned(),
                    source,
                })
            }
            None => {
                debug!(plugin, "No configuration found for plugin, using default");
                Ok(T::default())
            }
        }
    }

    /// Dispatches `events` until the stream ends or Ctrl+C (or SIGTERM).
    pub async fn run<S>(&self, events: S) -> RuntimeResult<RuntimeStats>
    where
        S: Stream<Item = InboundEvent>,
    {
        self.run_until(events, wait_for_shutdown()).await
    }

    /// Dispatches `events` until the stream ends or `shutdown` resolves.
    ///
    /// Events are dispatched one at a time; the next event is not pulled
    /// before the previous dispatch finished.
    pub async fn run_until<S, F>(&self, events: S, shutdown: F) -> RuntimeResult<RuntimeStats>
    where
        S: Stream<Item = InboundEvent>,
        F: Future<Output = ()>,
    {
        self.join_channels().await?;

        let mut events = pin!(events);
        let mut shutdown = pin!(shutdown);
        let mut stats = RuntimeStats::default();

        info!(plugins = self.bot.plugins().len(), "Brass runtime is running");

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                next = events.next() => match next {
                    Some(event) => stats.record(self.bot.dispatch(event).await),
                    None => {
                        info!("Event stream ended");
                        break;
                    }
                },
            }
        }

        info!(
            events = stats.events,
            handled = stats.handled,
            rejected = stats.rejected,
            errors = stats.errors,
            "Brass runtime stopped"
        );
        Ok(stats)
    }

    async fn join_channels(&self) -> RuntimeResult<()> {
        for channel in &self.config.bot.channels {
            self.bot.handle().join_channel(channel).await?;
            info!(channel = %channel, "Joined channel");
        }
        Ok(())
    }
}

impl std::fmt::Debug for BrassRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrassRuntime")
            .field("config", &self.config)
            .field("bot", &self.bot)
            .finish()
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => {}
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`BrassRuntime`].
///
/// ```rust,ignore
/// let runtime = BrassRuntime::builder()
///     .profile("production")
///     .search_path("/etc/brass")
///     .build(client)?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<BrassConfig>,
    scheduler: Option<BoxedScheduler>,
    parsers: Option<Arc<TryParseRegistry>>,
    init_logging: bool,
}

impl RuntimeBuilder {
    /// Creates a builder that loads configuration from the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            config: None,
            scheduler: None,
            parsers: None,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration below files and environment.
    pub fn merge(mut self, config: BrassConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `config` as is, without loading anything.
    pub fn config(mut self, config: BrassConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses `scheduler` for precommand timeouts.
    pub fn scheduler(mut self, scheduler: BoxedScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Uses `parsers` instead of the global parse registry.
    pub fn parsers(mut self, parsers: Arc<TryParseRegistry>) -> Self {
        self.parsers = Some(parsers);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads and validates the configuration and builds the runtime around `client`.
    pub fn build(self, client: BoxedClient) -> RuntimeResult<BrassRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };
        validate_config(&config)?;
        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let mut runtime = BrassRuntime::assemble(config, client);
        if let Some(scheduler) = self.scheduler {
            runtime.bot = runtime.bot.with_scheduler(scheduler);
        }
        if let Some(parsers) = self.parsers {
            runtime.bot = runtime.bot.with_parsers(parsers);
        }
        Ok(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
