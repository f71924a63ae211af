//! Plugins and the conversion of their routes into triggers.
//!
//! A plugin declares its routes once, at registration. The registry compiles
//! command patterns, checks precommand properties and returns the plugin's
//! trigger lists in declaration order. Any misconfiguration fails the whole
//! registration.

use std::sync::Arc;

use tracing::debug;

use crate::bot::BotHandle;
use crate::error::RegistrationError;
use crate::pattern::Pattern;
use crate::property::Property;
use crate::route::{PreCheck, PreCheckSource, Route, RouteKind};
use crate::trigger::{
    CommandTrigger, JoinTrigger, MembershipTrigger, PartTrigger, PreCommandTrigger, TriggerLabel,
};

/// An application component that reacts to chat events.
///
/// # Example
///
/// ```rust,ignore
/// struct Greeter {
///     bot: OnceLock<BotHandle>,
/// }
///
/// impl Plugin for Greeter {
///     fn name(&self) -> &str {
///         "greeter"
///     }
///
///     fn attach(&self, bot: &BotHandle) {
///         let _ = self.bot.set(bot.clone());
///     }
///
///     fn routes(self: Arc<Self>) -> Vec<Route> {
///         vec![Route::on_join(OnJoin::new(), |ctx| async move {
///             let who: String = ctx.param("who")?;
///             (who != ctx.bot().nickname()).then(|| format!("Hello {who}"))
///         })]
///     }
/// }
/// ```
pub trait Plugin: Send + Sync + 'static {
    /// Name used in logs and configuration.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Prefix for this plugin's commands that declare none; falls back to
    /// the bot's default.
    fn default_prefix(&self) -> Option<&str> {
        None
    }

    /// Called once with the owning bot, before [`routes`](Self::routes).
    fn attach(&self, _bot: &BotHandle) {}

    /// The plugin's routes, in declaration order.
    fn routes(self: Arc<Self>) -> Vec<Route>;
}

/// The triggers built from one plugin's routes.
#[derive(Debug, Default)]
pub struct PluginTriggers {
    /// Command triggers, in declaration order.
    pub commands: Vec<CommandTrigger>,
    /// Precommand triggers, in declaration order.
    pub precommands: Vec<PreCommandTrigger>,
    /// Join triggers, in declaration order.
    pub joins: Vec<JoinTrigger>,
    /// Part triggers, in declaration order.
    pub parts: Vec<PartTrigger>,
}

impl PluginTriggers {
    /// Attaches `plugin` to `bot` and builds its triggers.
    ///
    /// [`Plugin::attach`] runs first and is not undone when a route fails to
    /// build: the plugin keeps its handle even though the bot never adds it.
    pub fn collect<P: Plugin + ?Sized>(
        plugin: Arc<P>,
        bot: &BotHandle,
    ) -> Result<Self, RegistrationError> {
        plugin.attach(bot);

        let name: Arc<str> = plugin.name().into();
        let plugin_prefix = plugin.default_prefix().map(str::to_owned);

        let mut triggers = Self::default();
        for route in Arc::clone(&plugin).routes() {
            triggers.push(&name, plugin_prefix.as_deref(), route)?;
        }

        debug!(
            plugin = %name,
            commands = triggers.commands.len(),
            precommands = triggers.precommands.len(),
            joins = triggers.joins.len(),
            parts = triggers.parts.len(),
            "Collected plugin triggers"
        );

        Ok(triggers)
    }

    fn push(
        &mut self,
        plugin: &Arc<str>,
        plugin_prefix: Option<&str>,
        route: Route,
    ) -> Result<(), RegistrationError> {
        let label = TriggerLabel::new(Arc::clone(plugin), route.name);

        match route.kind {
            RouteKind::Command { descriptor, action } => {
                let pattern = Pattern::compile(&descriptor.pattern)?;
                let prefix = descriptor.prefix.or_else(|| plugin_prefix.map(str::to_owned));
                self.commands.push(CommandTrigger::new(
                    label,
                    pattern,
                    descriptor.message_type,
                    prefix,
                    descriptor.channel,
                    action,
                ));
            }
            RouteKind::PreCommand { descriptor, source } => {
                let check = match source {
                    PreCheckSource::Check(check) => check,
                    PreCheckSource::Property(property) => {
                        let any = property.as_any();
                        if let Some(flag) = any.downcast_ref::<Property<bool>>() {
                            PreCheck::Flag(flag.clone())
                        } else if let Some(text) = any.downcast_ref::<Property<String>>() {
                            PreCheck::Literal(text.clone())
                        } else {
                            return Err(RegistrationError::UnsupportedPropertyType {
                                plugin: plugin.to_string(),
                                property: property.name().to_owned(),
                                type_name: property.type_name(),
                            });
                        }
                    }
                };
                self.precommands.push(PreCommandTrigger::new(
                    label,
                    descriptor.timeout,
                    descriptor.default,
                    check,
                ));
            }
            RouteKind::Join { descriptor, handler } => {
                self.joins
                    .push(MembershipTrigger::new(label, descriptor.channel, handler));
            }
            RouteKind::Part { descriptor, handler } => {
                self.parts
                    .push(MembershipTrigger::new(label, descriptor.channel, handler));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use brass_core::MessageType;

    use super::*;
    use crate::bot::test_support::recording_handle;
    use crate::route::{OnCommand, OnJoin, OnPart, PreCommand};

    struct Sample {
        attached: OnceLock<String>,
        routes_saw_bot: OnceLock<bool>,
    }

    impl Sample {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                attached: OnceLock::new(),
                routes_saw_bot: OnceLock::new(),
            })
        }
    }

    impl Plugin for Sample {
        fn name(&self) -> &str {
            "sample"
        }

        fn default_prefix(&self) -> Option<&str> {
            Some(".")
        }

        fn attach(&self, bot: &BotHandle) {
            let _ = self.attached.set(bot.nickname().to_owned());
        }

        fn routes(self: Arc<Self>) -> Vec<Route> {
            let _ = self.routes_saw_bot.set(self.attached.get().is_some());
            vec![
                Route::on_command(OnCommand::new("first"), |_| async {}),
                Route::pre_command(PreCommand::new(), |_| true),
                Route::on_command(OnCommand::new("second").prefix("!"), |_| async {}),
                Route::on_join(OnJoin::new(), |_| async {}),
                Route::on_command_property(
                    OnCommand::new("(?<On>on|off)").message_type(MessageType::Channel),
                    Property::read_only("On", || true),
                ),
                Route::pre_command_property(PreCommand::new(), Property::read_only("On", || true)),
                Route::on_part(OnPart::new().channel("#six"), |_| async {}),
            ]
        }
    }

    #[test]
    fn test_collect_in_declaration_order() {
        let (bot, _client) = recording_handle("brass");
        let plugin = Sample::new();
        let triggers = PluginTriggers::collect(Arc::clone(&plugin), &bot).unwrap();

        assert_eq!(plugin.attached.get().map(String::as_str), Some("brass"));
        assert_eq!(plugin.routes_saw_bot.get(), Some(&true));

        let patterns: Vec<_> = triggers.commands.iter().map(|c| c.pattern().as_str()).collect();
        assert_eq!(patterns, vec!["first", "second", "(?<On>on|off)"]);
        assert_eq!(triggers.commands[0].resolve_prefix("!"), ".");
        assert_eq!(triggers.commands[1].resolve_prefix("~"), "!");
        assert!(triggers.commands[2].is_property());
        assert_eq!(triggers.commands[2].label().name(), Some("On"));
        assert_eq!(triggers.commands[2].message_type(), MessageType::Channel);

        assert_eq!(triggers.precommands.len(), 2);
        assert_eq!(triggers.joins.len(), 1);
        assert_eq!(triggers.parts.len(), 1);
        assert!(!triggers.parts[0].applies_to("#seven"));
        assert!(triggers.commands.iter().all(|c| c.label().plugin() == "sample"));
    }

    struct Broken {
        route: parking_lot::Mutex<Option<Route>>,
        attached: OnceLock<BotHandle>,
    }

    impl Broken {
        fn new(route: Route) -> Self {
            Self {
                route: parking_lot::Mutex::new(Some(route)),
                attached: OnceLock::new(),
            }
        }
    }

    impl Plugin for Broken {
        fn attach(&self, bot: &BotHandle) {
            let _ = self.attached.set(bot.clone());
        }

        fn routes(self: Arc<Self>) -> Vec<Route> {
            self.route.lock().take().into_iter().collect()
        }
    }

    #[test]
    fn test_invalid_pattern_fails_registration() {
        let (bot, _client) = recording_handle("brass");
        let plugin = Arc::new(Broken::new(Route::on_command(
            OnCommand::new("db (?<key>"),
            |_| async {},
        )));
        let err = PluginTriggers::collect(Arc::clone(&plugin), &bot).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidPattern { .. }));

        // The failed registration still attached the plugin.
        assert_eq!(plugin.attached.get().map(BotHandle::nickname), Some("brass"));
    }

    #[test]
    fn test_unsupported_property_type_fails_registration() {
        let (bot, _client) = recording_handle("brass");
        let plugin = Arc::new(Broken::new(Route::pre_command_property(
            PreCommand::new(),
            Property::read_only("Count", || 3u32),
        )));
        match PluginTriggers::collect(plugin, &bot).unwrap_err() {
            RegistrationError::UnsupportedPropertyType {
                property, type_name, ..
            } => {
                assert_eq!(property, "Count");
                assert_eq!(type_name, "u32");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_plugin_name() {
        let plugin = Broken::new(Route::on_join(OnJoin::new(), |_| async {}));
        assert!(plugin.name().ends_with("Broken"));
    }
}
