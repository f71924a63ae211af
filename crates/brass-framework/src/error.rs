//! Error types for the Brass framework.
//!
//! Routine non-matches (wrong prefix, pattern miss, failed coercion) are never
//! errors; they show up as [`DispatchOutcome::Unmatched`](crate::DispatchOutcome).
//! The types here cover misconfiguration only.

use thiserror::Error;

/// Fatal configuration errors raised while registering a plugin.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A command pattern failed to compile.
    #[error("invalid command pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as declared.
        pattern: String,
        /// The regex compiler's error.
        #[source]
        source: regex::Error,
    },

    /// A precommand was declared on a property that is neither `bool` nor `String`.
    #[error("precommand property '{property}' of plugin '{plugin}' has unsupported type '{type_name}'")]
    UnsupportedPropertyType {
        /// Owning plugin.
        plugin: String,
        /// Property name.
        property: String,
        /// The property's value type.
        type_name: &'static str,
    },

    /// The same plugin instance was registered twice on one bot.
    #[error("plugin '{plugin}' is already registered on this bot")]
    AlreadyRegistered {
        /// Plugin name.
        plugin: String,
    },
}

/// Errors that abort the dispatch of a single event.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// A `String` precommand property held something other than a boolean literal.
    #[error("precommand property '{property}' of plugin '{plugin}' holds '{value}', expected one of 1/on/true/0/off/false")]
    InvalidBoolLiteral {
        /// Owning plugin.
        plugin: String,
        /// Property name.
        property: String,
        /// The offending value.
        value: String,
    },
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
