use crate::{bot::Bot, commands::Command, context::CommandContext, plugin::*};
use anyhow::Result;

/// Owner commands re-running plugin registration
pub struct Reload;

async fn reload(ctx: CommandContext) -> Result<()> {
    let name = &ctx.args[0];

    match ctx.bot().reload_plugin(name).await {
        Ok(true) => ctx.reply("owner.reload.done", &[("plugin", name)]).await?,
        Ok(false) => {
            let known = ctx.bot().plugin_names().join(", ");
            return Err(ctx.user_error(
                "owner.reload.unknown",
                &[("plugin", name), ("known", &known)],
            ));
        }
        Err(err) => {
            ctx.reply(
                "owner.reload.failed",
                &[("plugin", name), ("error", &format!("{:#}", err))],
            )
            .await?
        }
    };
    Ok(())
}

async fn reload_all(ctx: CommandContext) -> Result<()> {
    let count = ctx.bot().reload_all().await?;
    ctx.reply("owner.reloadall.done", &[("count", &count.to_string())])
        .await?;
    Ok(())
}

#[serenity::async_trait]
impl Plugin for Reload {
    fn name(&self) -> &'static str {
        "reload"
    }

    async fn load(&self, bot: &Arc<Bot>) -> Result<()> {
        bot.commands
            .register(
                self.name(),
                Command::new("reload", reload)
                    .owner_only()
                    .min_args(1)
                    .help("re-register one plugin (bot owner only)"),
            )
            .await?;
        bot.commands
            .register(
                self.name(),
                Command::new("reloadall", reload_all)
                    .owner_only()
                    .help("reload config and every plugin (bot owner only)"),
            )
            .await?;
        Ok(())
    }
}
