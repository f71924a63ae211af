mod admin;
mod db;
mod flood;
mod greeter;

pub use admin::{AdminConfig, AdminPlugin};
pub use db::DbPlugin;
pub use flood::{FloodPlugin, Interval};
pub use greeter::Greeter;
