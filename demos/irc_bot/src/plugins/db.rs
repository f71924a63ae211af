//! An in-memory key/value store that only admins may use.

use std::collections::HashMap;
use std::sync::Arc;

use brass::prelude::*;
use parking_lot::{Mutex, RwLock};

use super::AdminPlugin;

pub struct DbPlugin {
    admins: Arc<AdminPlugin>,
    on: Arc<RwLock<bool>>,
    store: Mutex<HashMap<String, String>>,
}

impl DbPlugin {
    pub fn new(admins: Arc<AdminPlugin>) -> Self {
        Self {
            admins,
            on: Arc::new(RwLock::new(true)),
            store: Mutex::new(HashMap::new()),
        }
    }

    fn status(&self) -> String {
        format!("service is {}", if *self.on.read() { "on" } else { "off" })
    }

    fn get(&self, key: &str) -> String {
        match self.store.lock().get(key) {
            Some(value) => format!("{key}:{value}"),
            None => "no such key".to_owned(),
        }
    }

    fn delete(&self, key: &str) -> String {
        match self.store.lock().remove(key) {
            Some(_) => format!("deleted key {key}"),
            None => "no such key".to_owned(),
        }
    }
}

impl Plugin for DbPlugin {
    fn name(&self) -> &str {
        "db"
    }

    fn routes(self: Arc<Self>) -> Vec<Route> {
        let on = Property::shared("On", Arc::clone(&self.on));

        let admins = Arc::clone(&self.admins);
        let admin_check = Route::pre_command(PreCommand::new(), move |ctx| {
            ctx.param::<String>("nick")
                .is_some_and(|nick| admins.is_admin(&nick))
        });

        let db = Arc::clone(&self);
        let status = Route::on_command(OnCommand::new("db$"), move |_ctx| {
            let db = Arc::clone(&db);
            async move { db.status() }
        });

        let db = Arc::clone(&self);
        let set = Route::on_command(
            OnCommand::new(r"db set (?<key>(\w+)) (?<value>(.+))"),
            move |ctx| {
                let db = Arc::clone(&db);
                async move {
                    let key: String = ctx.param("key")?;
                    let value: String = ctx.param("value")?;
                    db.store.lock().insert(key, value);
                    Some(())
                }
            },
        );

        let db = Arc::clone(&self);
        let get = Route::on_command(OnCommand::new(r"db get (?<key>(\w+))"), move |ctx| {
            let db = Arc::clone(&db);
            async move { ctx.param::<String>("key").map(|key| db.get(&key)) }
        });

        let db = Arc::clone(&self);
        let delete = Route::on_command(
            OnCommand::new(r"db (remove|rm|del|delete) (?<key>(\w+))"),
            move |ctx| {
                let db = Arc::clone(&db);
                async move { ctx.param::<String>("key").map(|key| db.delete(&key)) }
            },
        );

        vec![
            admin_check.named("admin_check"),
            Route::on_command_property(OnCommand::new("db (?<On>(on|off))$"), on.clone()),
            Route::pre_command_property(PreCommand::new(), on),
            status.named("status"),
            set.named("set"),
            get.named("get"),
            delete.named("delete"),
        ]
    }
}
