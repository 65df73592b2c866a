use crate::{
    bot::Bot,
    commands::Resolution,
    context::EventContext,
    event::*,
    plugin::*,
};
use anyhow::Result;

/// Turns prefixed messages into command invocations
pub struct Commands;

async fn invoke_command(ctx: Arc<EventContext>) -> Result<EventHandled> {
    let Event::Message(msg) = &ctx.event else {
        return Ok(EventHandled::No);
    };

    let prefix = ctx.bot.prefix_for(msg.server_id()).await;
    match ctx.bot.commands.resolve(&prefix, &msg.content).await {
        Resolution::NotFound => Ok(EventHandled::No),
        Resolution::Malformed(command) => {
            ctx.reply("generic.bad_quotes", &[("command", &command.name)])
                .await?;
            Ok(EventHandled::Yes)
        }
        Resolution::Found(invocation) => {
            invocation.run(ctx.clone(), msg.clone()).await;
            Ok(EventHandled::Yes)
        }
    }
}

#[serenity::async_trait]
impl Plugin for Commands {
    fn name(&self) -> &'static str {
        "commands"
    }

    async fn load(&self, bot: &Arc<Bot>) -> Result<()> {
        bot.hooks
            .register_fn(EventName::Message, self.name(), invoke_command)
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{self, member, run_command, RecordingClient};
    use std::sync::Arc;

    #[tokio::test]
    async fn unbalanced_quotes_get_a_reply() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());

        run_command(&bot, &client, member(20, "user", &[]), "?choice \"red wine").await;

        assert_eq!(
            client.sent(),
            vec![":x: Could not parse arguments for `choice`: unbalanced quotes.".to_owned()]
        );
    }

    #[tokio::test]
    async fn server_prefix_overrides_default() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());
        bot.store.set_key("config:123:prefix", "!").await.unwrap();

        run_command(&bot, &client, member(20, "user", &[]), "?info").await;
        assert!(client.sent().is_empty());

        run_command(&bot, &client, member(20, "user", &[]), "!info").await;
        assert_eq!(client.sent().len(), 1);
        assert!(client.sent()[0].contains("`!help`"));
    }

    #[tokio::test]
    async fn plain_chat_is_not_a_command() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());

        run_command(&bot, &client, member(20, "user", &[]), "info please").await;
        run_command(&bot, &client, member(20, "user", &[]), "?nosuchcommand").await;
        assert!(client.ops().is_empty());
    }
}
