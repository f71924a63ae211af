//! Admin list management.

use std::sync::Arc;

use brass::prelude::*;
use parking_lot::RwLock;
use serde::Deserialize;

/// `[plugins.admin]` section of the configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub admins: Vec<String>,
}

pub struct AdminPlugin {
    admins: RwLock<Vec<String>>,
}

impl AdminPlugin {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: RwLock::new(admins.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_admin(&self, nick: &str) -> bool {
        self.admins.read().iter().any(|a| a == nick)
    }

    fn add(&self, admin: &str) -> String {
        let mut admins = self.admins.write();
        if admins.iter().any(|a| a == admin) {
            format!("{admin} is already an admin")
        } else {
            admins.push(admin.to_owned());
            format!("added {admin} to admins")
        }
    }

    fn remove(&self, admin: &str) -> String {
        let mut admins = self.admins.write();
        match admins.iter().position(|a| a == admin) {
            Some(index) => {
                admins.remove(index);
                format!("removed {admin} from the admin list")
            }
            None => format!("no such admin {admin}"),
        }
    }

    fn list(&self) -> String {
        let admins = self.admins.read();
        format!("{} admins: {}", admins.len(), admins.join(", "))
    }

    /// Runs `action` with the `admin` capture when the sender is an admin.
    fn guarded(
        self: &Arc<Self>,
        pattern: &str,
        action: fn(&AdminPlugin, &str) -> String,
    ) -> Route {
        let plugin = Arc::clone(self);
        Route::on_command(OnCommand::new(pattern), move |ctx| {
            let plugin = Arc::clone(&plugin);
            async move {
                let nick: String = ctx.param("nick")?;
                let admin: String = ctx.param("admin")?;
                plugin.is_admin(&nick).then(|| action(&plugin, admin.trim()))
            }
        })
    }
}

impl Plugin for AdminPlugin {
    fn name(&self) -> &str {
        "admin"
    }

    fn routes(self: Arc<Self>) -> Vec<Route> {
        let list = {
            let plugin = Arc::clone(&self);
            Route::on_command(OnCommand::new("admin list$"), move |ctx| {
                let plugin = Arc::clone(&plugin);
                async move {
                    let nick: String = ctx.param("nick")?;
                    plugin.is_admin(&nick).then(|| plugin.list())
                }
            })
        };

        vec![
            self.guarded("admin add (?<admin>(.+))", AdminPlugin::add)
                .named("add"),
            self.guarded("admin del (?<admin>(.+))", AdminPlugin::remove)
                .named("del"),
            list.named("list"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove() {
        let plugin = AdminPlugin::new(["txdv"]);
        assert_eq!(plugin.add("alice"), "added alice to admins");
        assert_eq!(plugin.add("alice"), "alice is already an admin");
        assert!(plugin.is_admin("alice"));

        assert_eq!(plugin.remove("alice"), "removed alice from the admin list");
        assert_eq!(plugin.remove("alice"), "no such admin alice");
        assert_eq!(plugin.list(), "1 admins: txdv");
    }
}
