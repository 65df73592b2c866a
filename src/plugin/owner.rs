use crate::{
    bot::Bot,
    client::Activity,
    commands::Command,
    context::CommandContext,
    plugin::*,
    store::{blacklist_key, override_key},
};
use anyhow::Result;

/// Presence, raw store access, blacklists and permission overrides
pub struct Owner;

async fn game(ctx: CommandContext) -> Result<()> {
    let game = ctx.text();
    ctx.client()
        .set_activity(Activity::Playing(game.clone()))
        .await?;
    ctx.reply("owner.game.done", &[("game", &game)]).await?;
    Ok(())
}

async fn game_stream(ctx: CommandContext) -> Result<()> {
    let activity = Activity::Streaming {
        name: ctx.args[0].clone(),
        url: ctx.args[1].clone(),
    };
    ctx.client().set_activity(activity).await?;
    ctx.reply("owner.game.stream", &[]).await?;
    Ok(())
}

async fn rget(ctx: CommandContext) -> Result<()> {
    let value = ctx.bot().store.get_key(&ctx.args[0]).await?;
    let value = value.as_deref().unwrap_or("None");
    ctx.reply("owner.rget.value", &[("value", value)]).await?;
    Ok(())
}

async fn blacklist(ctx: CommandContext) -> Result<()> {
    let server = ctx.server()?.id;
    let Some(user) = ctx.get_user().await else {
        return Err(ctx.user_error("generic.cannot_find_user", &[("user", &ctx.text())]));
    };

    let added = ctx
        .bot()
        .store
        .add_to_set(&blacklist_key(server), &user.id.to_string())
        .await?;
    let key = if added {
        "owner.blacklist.added"
    } else {
        "owner.blacklist.already"
    };
    ctx.reply(key, &[("user", &user.display_name)]).await?;
    Ok(())
}

async fn unblacklist(ctx: CommandContext) -> Result<()> {
    let server = ctx.server()?.id;
    let Some(user) = ctx.get_user().await else {
        return Err(ctx.user_error("generic.cannot_find_user", &[("user", &ctx.text())]));
    };

    let removed = ctx
        .bot()
        .store
        .remove_from_set(&blacklist_key(server), &user.id.to_string())
        .await?;
    let key = if removed {
        "owner.blacklist.removed"
    } else {
        "owner.blacklist.absent"
    };
    ctx.reply(key, &[("user", &user.display_name)]).await?;
    Ok(())
}

/// `<command> <role>`, with the command resolved to its primary name
async fn override_target(ctx: &CommandContext) -> Result<(String, String)> {
    let Some(command) = ctx.bot().commands.get(&ctx.args[0]).await else {
        return Err(ctx.user_error(
            "owner.override.unknown_command",
            &[("command", &ctx.args[0])],
        ));
    };
    let server = ctx.server()?.id;
    Ok((override_key(server, &command.name), command.name.clone()))
}

async fn add_override(ctx: CommandContext) -> Result<()> {
    let (key, command) = override_target(&ctx).await?;
    let role = &ctx.args[1];

    ctx.bot().store.add_to_set(&key, role).await?;
    ctx.reply(
        "owner.override.added",
        &[("role", role), ("command", &command)],
    )
    .await?;
    Ok(())
}

async fn remove_override(ctx: CommandContext) -> Result<()> {
    let (key, command) = override_target(&ctx).await?;
    let role = &ctx.args[1];

    let reply = if ctx.bot().store.remove_from_set(&key, role).await? {
        "owner.override.removed"
    } else {
        "owner.override.absent"
    };
    ctx.reply(reply, &[("role", role), ("command", &command)])
        .await?;
    Ok(())
}

#[serenity::async_trait]
impl Plugin for Owner {
    fn name(&self) -> &'static str {
        "owner"
    }

    async fn load(&self, bot: &Arc<Bot>) -> Result<()> {
        let commands = [
            Command::new("game", game)
                .owner_only()
                .min_args(1)
                .help("change the game the bot is playing"),
            Command::new("gamestream", game_stream)
                .owner_only()
                .min_args(2)
                .help("stream <name> at <url>"),
            Command::new("rget", rget)
                .owner_only()
                .min_args(1)
                .help("read a raw store key"),
            Command::new("blacklist", blacklist)
                .roles(&["Admin"])
                .min_args(1)
                .help("ignore a user on this server"),
            Command::new("unblacklist", unblacklist)
                .roles(&["Admin"])
                .min_args(1)
                .help("stop ignoring a user on this server"),
            Command::new("override", add_override)
                .roles(&["Admin"])
                .min_args(2)
                .help("let <role> use <command> on this server"),
            Command::new("unoverride", remove_override)
                .roles(&["Admin"])
                .min_args(2)
                .help("remove a role override"),
        ];
        for command in commands {
            bot.commands.register(self.name(), command).await?;
        }
        Ok(())
    }
}
