use crate::{bot::Bot, context::EventContext, event::*, plugin::*};
use anyhow::Result;

/// Other bots never get past the blacklist stage
pub struct IgnoreBots;

async fn ignore_bots(ctx: Arc<EventContext>) -> Result<EventHandled> {
    match ctx.message() {
        Some(msg) if msg.author.bot => Ok(EventHandled::Yes),
        _ => Ok(EventHandled::No),
    }
}

#[serenity::async_trait]
impl Plugin for IgnoreBots {
    fn name(&self) -> &'static str {
        "ignore_bots"
    }

    async fn load(&self, bot: &Arc<Bot>) -> Result<()> {
        bot.hooks
            .register_fn(EventName::MessageBeforeBlacklist, self.name(), ignore_bots)
            .await;
        Ok(())
    }
}
