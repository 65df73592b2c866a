use crate::{bot::Bot, client::Activity, context::EventContext, event::*, plugin::*};
use anyhow::Result;

/// Sets the presence once the connection to Discord is ready.
pub struct Ready;

async fn set_game(ctx: Arc<EventContext>) -> Result<EventHandled> {
    let game = ctx.bot.cfg.read().await.general.game_text.clone();
    ctx.client.set_activity(Activity::Playing(game)).await?;

    // Other ready hooks still need to run
    Ok(EventHandled::No)
}

#[serenity::async_trait]
impl Plugin for Ready {
    fn name(&self) -> &'static str {
        "ready"
    }

    async fn load(&self, bot: &Arc<Bot>) -> Result<()> {
        bot.hooks
            .register_fn(EventName::Ready, self.name(), set_game)
            .await;
        Ok(())
    }
}
