use crate::{bot::Bot, commands::Command, context::CommandContext, model::Member, plugin::*};
use anyhow::Result;

const MODERATORS: &[&str] = &["Admin", "Bot Commander"];
const MUTED_ROLE: &str = "Muted";
/// Upper bound of `delete`, not counting the command message itself
const MAX_DELETE: usize = 99;

/// Mute, ban, kick and bulk delete
pub struct Moderation;

/// The mentioned member, or a usage reply
fn mentioned(ctx: &CommandContext, usage: &str) -> Result<Member> {
    ctx.message
        .mentions
        .first()
        .cloned()
        .ok_or_else(|| ctx.user_error(usage, &[]))
}

fn muted_role(ctx: &CommandContext) -> Result<()> {
    if ctx.server()?.has_role(MUTED_ROLE) {
        Ok(())
    } else {
        Err(ctx.user_error("moderation.no_muted_role", &[]))
    }
}

async fn mute(ctx: CommandContext) -> Result<()> {
    muted_role(&ctx)?;
    let user = mentioned(&ctx, "moderation.mute.usage")?;
    let server = ctx.server()?.id;

    ctx.client().add_role(server, user.id, MUTED_ROLE).await?;
    ctx.reply(
        "moderation.mute.done",
        &[("user", &user.display_name), ("by", &ctx.author().display_name)],
    )
    .await?;
    Ok(())
}

async fn unmute(ctx: CommandContext) -> Result<()> {
    muted_role(&ctx)?;
    let user = mentioned(&ctx, "moderation.unmute.usage")?;
    let server = ctx.server()?.id;

    ctx.client().remove_role(server, user.id, MUTED_ROLE).await?;
    ctx.reply(
        "moderation.unmute.done",
        &[("user", &user.display_name), ("by", &ctx.author().display_name)],
    )
    .await?;
    Ok(())
}

async fn target(ctx: &CommandContext) -> Result<Member> {
    match ctx.get_user().await {
        Some(user) => Ok(user),
        None => Err(ctx.user_error("generic.cannot_find_user", &[("user", &ctx.text())])),
    }
}

async fn ban(ctx: CommandContext) -> Result<()> {
    let server = ctx.server()?.id;
    let user = target(&ctx).await?;

    ctx.client().ban(server, user.id).await?;
    ctx.reply(
        "moderation.ban.done",
        &[("user", &user.display_name), ("by", &ctx.author().display_name)],
    )
    .await?;
    Ok(())
}

async fn kick(ctx: CommandContext) -> Result<()> {
    let server = ctx.server()?.id;
    let user = target(&ctx).await?;

    ctx.client().kick(server, user.id).await?;
    ctx.reply(
        "moderation.kick.done",
        &[("user", &user.display_name), ("by", &ctx.author().display_name)],
    )
    .await?;
    Ok(())
}

async fn delete(ctx: CommandContext) -> Result<()> {
    let arg = &ctx.args[0];
    let Ok(count) = arg.parse::<usize>() else {
        return Err(ctx.user_error("generic.not_int", &[("val", arg)]));
    };
    if !(1..=MAX_DELETE).contains(&count) {
        return Err(ctx.user_error("moderation.delete.range", &[]));
    }

    // The command message goes too
    ctx.client()
        .delete_recent_messages(ctx.message.channel.id, count + 1)
        .await?;

    let key = if count == 1 {
        "moderation.delete.one"
    } else {
        "moderation.delete.many"
    };
    ctx.reply(
        key,
        &[
            ("count", &count.to_string()),
            ("by", &ctx.author().display_name),
        ],
    )
    .await?;
    Ok(())
}

#[serenity::async_trait]
impl Plugin for Moderation {
    fn name(&self) -> &'static str {
        "moderation"
    }

    async fn load(&self, bot: &Arc<Bot>) -> Result<()> {
        let commands = [
            Command::new("mute", mute)
                .roles(MODERATORS)
                .help("give a mentioned user the Muted role"),
            Command::new("unmute", unmute)
                .roles(MODERATORS)
                .help("take the Muted role away"),
            Command::new("ban", ban)
                .roles(MODERATORS)
                .min_args(1)
                .help("ban a user from the server"),
            Command::new("kick", kick)
                .roles(MODERATORS)
                .min_args(1)
                .help("kick a user from the server"),
            Command::new("delete", delete)
                .roles(MODERATORS)
                .min_args(1)
                .help("delete the last <count> messages"),
        ];
        for command in commands {
            bot.commands.register(self.name(), command).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::UserId,
        testing::{self, member, message, Op, RecordingClient},
    };
    use std::sync::Arc;

    fn admin() -> crate::model::Member {
        member(30, "admin", &["Admin"])
    }

    #[tokio::test]
    async fn delete_rejects_non_numbers_without_deleting() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());

        testing::run_command(&bot, &client, admin(), "?delete abc").await;

        let ops = client.ops();
        assert!(!ops.iter().any(|op| matches!(op, Op::Delete(..))));
        assert_eq!(client.sent(), vec![":x: `abc` is not a number.".to_owned()]);
    }

    #[tokio::test]
    async fn delete_removes_the_command_too() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());

        testing::run_command(&bot, &client, admin(), "?delete 5").await;
        testing::run_command(&bot, &client, admin(), "?delete 100").await;

        assert_eq!(
            client.ops(),
            vec![
                Op::Delete(testing::GENERAL, 6),
                Op::Send(
                    testing::GENERAL,
                    "**5 messages deleted by admin** :bomb:".to_owned()
                ),
                Op::Send(
                    testing::GENERAL,
                    ":x: You can delete between 1 and 99 messages at a time.".to_owned()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn mute_needs_a_mention() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());

        let mut msg = message(admin(), "?mute <@40>");
        msg.mentions.push(member(40, "noisy", &[]));
        bot.on_message(client.clone(), msg).await;
        bot.on_message(client.clone(), message(admin(), "?mute")).await;

        assert_eq!(
            client.ops(),
            vec![
                Op::AddRole(testing::server().id, UserId(40), "Muted".to_owned()),
                Op::Send(testing::GENERAL, "User noisy got muted by admin.".to_owned()),
                Op::Send(testing::GENERAL, "Usage: `mute @user`".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn members_without_moderator_roles_are_refused() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::with_members(vec![member(40, "victim", &[])]));

        testing::run_command(&bot, &client, member(20, "user", &["Member"]), "?ban victim").await;
        testing::run_command(&bot, &client, admin(), "?ban victim").await;

        assert_eq!(
            client.ops(),
            vec![
                Op::Send(
                    testing::GENERAL,
                    ":no_entry: You don't have permission to use `ban`.".to_owned()
                ),
                Op::Ban(testing::server().id, UserId(40)),
                Op::Send(testing::GENERAL, "victim got banned by admin!".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn moderator_override_allows_mute() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());
        bot.store
            .add_to_set("override:123:mute", "Moderator")
            .await
            .unwrap();

        let mut msg = message(member(31, "mod", &["Moderator"]), "?mute <@40>");
        msg.mentions.push(member(40, "noisy", &[]));
        bot.on_message(client.clone(), msg).await;

        assert!(client
            .ops()
            .contains(&Op::AddRole(testing::server().id, UserId(40), "Muted".to_owned())));
    }
}
