use crate::{
    bot::Bot, context::EventContext, event::*, helper::*, log_event, logging::*, plugin::*,
};
use anyhow::Result;

/// Prints debug information about every event to stdout
pub struct Debug;

async fn debug(ctx: Arc<EventContext>) -> Result<EventHandled> {
    match &ctx.event {
        Event::Ready { user, servers } => {
            log_event!("Connected to {} server(s) as {}", servers, user.color());
        }
        Event::Message(msg) => {
            log_event!(
                "{}{} {}",
                msg.color(),
                Glue.color(),
                msg.human_format_content()
            );
        }
        Event::MessageDelete {
            message: Some(msg), ..
        } => {
            log_event!(
                "{} deleted message \"{}\"",
                msg.color(),
                msg.human_format_content()
            );
        }
        Event::MessageDelete {
            message_id,
            channel_id,
            ..
        } => {
            log_event!("Uncached message {} deleted in {}", message_id, channel_id);
        }
        Event::MessageEdit { before, after } => {
            let before = before
                .as_ref()
                .map(|msg| msg.human_format_content())
                .unwrap_or("<unknown-message>".to_owned());
            log_event!(
                "{} edited message \"{}\" to \"{}\"",
                after.color(),
                before,
                after.human_format_content()
            );
        }
        Event::MemberJoin { server, member } => {
            log_event!("{} joined {}", member.color(), server.color());
        }
        // Raw payloads duplicate the typed events above
        Event::Raw { .. } => {}
        Event::Error { source, .. } => {
            log_event!("Error reported by {}", source);
        }
    }

    Ok(EventHandled::No)
}

#[serenity::async_trait]
impl Plugin for Debug {
    fn name(&self) -> &'static str {
        "debug"
    }

    async fn load(&self, bot: &Arc<Bot>) -> Result<()> {
        bot.hooks
            .register_fn(HookTarget::All, self.name(), debug)
            .await;
        Ok(())
    }
}
