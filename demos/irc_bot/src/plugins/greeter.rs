use std::sync::Arc;

use brass::prelude::*;

/// Greets everyone who joins a channel the bot is in.
#[derive(Default)]
pub struct Greeter;

impl Plugin for Greeter {
    fn name(&self) -> &str {
        "greeter"
    }

    fn routes(self: Arc<Self>) -> Vec<Route> {
        vec![Route::on_join(OnJoin::new(), |ctx| async move {
            let join = ctx.join_event()?;
            (join.who != ctx.bot().nickname()).then(|| format!("Hello {}", join.who))
        })]
    }
}
