//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while building or running a [`BrassRuntime`](crate::BrassRuntime).
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A plugin failed to register.
    #[error("Plugin registration failed: {0}")]
    Registration(#[from] brass_framework::RegistrationError),

    /// A plugin's configuration section did not deserialize.
    #[error("Failed to deserialize config for plugin '{plugin}': {source}")]
    PluginConfig {
        plugin: String,
        #[source]
        source: serde_json::Error,
    },

    /// The chat client failed.
    #[error("Client error: {0}")]
    Client(#[from] brass_core::ApiError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
