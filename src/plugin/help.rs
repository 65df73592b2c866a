use crate::{bot::Bot, commands::Command, context::CommandContext, plugin::*};
use anyhow::Result;

pub struct Help;

async fn help(ctx: CommandContext) -> Result<()> {
    let prefix = ctx.bot().prefix_for(ctx.message.server_id()).await;

    let mut reply = String::new();
    reply.push_str("```\n");
    reply.push_str(ctx.locale().get("help.header"));
    reply.push('\n');
    for command in ctx.bot().commands.list().await {
        reply.push_str(&prefix);
        reply.push_str(&command.name);
        if !command.aliases.is_empty() {
            reply.push_str(&format!(" ({})", command.aliases.join(", ")));
        }
        if !command.help.is_empty() {
            reply.push_str(" - ");
            reply.push_str(&command.help);
        }
        reply.push('\n');
    }
    reply.push_str("```\n");

    ctx.send(&reply).await
}

#[serenity::async_trait]
impl Plugin for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    async fn load(&self, bot: &Arc<Bot>) -> Result<()> {
        bot.commands
            .register(
                self.name(),
                Command::new("help", help).help("show this help message"),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{self, member, run_command, RecordingClient};
    use std::sync::Arc;

    #[tokio::test]
    async fn lists_commands_with_aliases() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());

        run_command(&bot, &client, member(20, "user", &[]), "?help").await;

        let sent = client.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("```\nCommands:\n"));
        assert!(sent[0].contains("?help - show this help message\n"));
        assert!(sent[0].contains("?choice (choose)"));
    }
}
