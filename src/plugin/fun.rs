use crate::{
    bot::Bot,
    commands::Command,
    context::CommandContext,
    helper::{format_duration, fullwidth},
    log_error,
    plugin::*,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rand::seq::SliceRandom;
use std::time::Duration;

/// Small commands anyone can use
pub struct Fun;

async fn choice(ctx: CommandContext) -> Result<()> {
    let chosen = ctx
        .args
        .choose(&mut rand::thread_rng())
        .cloned()
        .unwrap_or_default();
    ctx.reply("fun.chosen", &[("choice", &chosen)]).await?;
    Ok(())
}

async fn aesthetic(ctx: CommandContext) -> Result<()> {
    ctx.send(&fullwidth(&ctx.text())).await
}

async fn info(ctx: CommandContext) -> Result<()> {
    let prefix = ctx.bot().prefix_for(ctx.message.server_id()).await;
    ctx.reply("fun.commands", &[("prefix", &prefix)]).await?;
    Ok(())
}

async fn whois(ctx: CommandContext) -> Result<()> {
    let Some(user) = ctx.get_user().await else {
        return Err(ctx.user_error("generic.cannot_find_user", &[("user", &ctx.args[0])]));
    };

    ctx.reply(
        "fun.whois.response",
        &[
            ("name", &user.display_name),
            ("id", &user.id.to_string()),
            ("roles", &user.roles.join(", ")),
        ],
    )
    .await?;
    Ok(())
}

async fn uptime(ctx: CommandContext) -> Result<()> {
    ctx.reply(
        "fun.uptime.response",
        &[
            ("time", &format_duration(ctx.bot().uptime())),
            ("pid", &std::process::id().to_string()),
        ],
    )
    .await?;
    Ok(())
}

async fn stats(ctx: CommandContext) -> Result<()> {
    let servers = ctx.client().server_count().await;
    ctx.reply(
        "fun.stats.response",
        &[
            ("servers", &servers.to_string()),
            ("messages", &ctx.bot().message_count().to_string()),
            ("uptime", &format_duration(ctx.bot().uptime())),
        ],
    )
    .await?;
    Ok(())
}

async fn servinfo(ctx: CommandContext) -> Result<()> {
    let server = ctx.server()?;
    ctx.reply(
        "fun.servinfo",
        &[
            ("server", &server.name),
            ("id", &server.id.to_string()),
            ("channels", &server.channels.len().to_string()),
            ("members", &server.member_count.to_string()),
            ("created", &server.created_at),
        ],
    )
    .await?;
    Ok(())
}

/// `now` in the named zone, `None` for a zone the database does not know
fn time_in(zone: &str, now: DateTime<Utc>) -> Option<String> {
    let tz: Tz = zone.parse().ok()?;
    Some(now.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %z").to_string())
}

async fn timezone(ctx: CommandContext) -> Result<()> {
    let zone = ctx.args.first().map(String::as_str).unwrap_or("UTC");
    let Some(time) = time_in(zone, Utc::now()) else {
        return Err(ctx.user_error("fun.tz.unknown", &[("timezone", zone)]));
    };
    ctx.reply("fun.tz.result", &[("t", &time)]).await?;
    Ok(())
}

async fn remind(ctx: CommandContext) -> Result<()> {
    if ctx.args.len() < 2 {
        return Err(ctx.user_error("fun.reminder.no_args", &[]));
    }
    let Ok(secs) = ctx.args[0].parse::<u64>() else {
        return Err(ctx.user_error("generic.not_int", &[("val", &ctx.args[0])]));
    };

    let client = ctx.event.client.clone();
    let channel = ctx.message.channel.id;
    let text = ctx.locale().format(
        "fun.reminder.fire",
        &[
            ("mention", &ctx.author().mention()),
            ("message", &ctx.args[1..].join(" ")),
        ],
    );
    // Runs detached, the command returns right away
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(secs)).await;
        if let Err(err) = client.send_message(channel, &text).await {
            log_error!("Could not deliver reminder: {:#}", err);
        }
    });

    ctx.reply("fun.reminder.reminding", &[]).await?;
    Ok(())
}

#[serenity::async_trait]
impl Plugin for Fun {
    fn name(&self) -> &'static str {
        "fun"
    }

    async fn load(&self, bot: &Arc<Bot>) -> Result<()> {
        let commands = [
            Command::new("choice", choice)
                .alias("choose")
                .min_args(1)
                .help("make that hard choice for you"),
            Command::new("fullwidth", aesthetic)
                .min_args(1)
                .arg_error(":x: You must provide at least one word to fullwidth.")
                .help("ｆｕｌｌｗｉｄｔｈ some text"),
            Command::new("info", info)
                .alias("commands")
                .help("about the bot"),
            Command::new("whois", whois)
                .min_args(1)
                .help("show a user's id and roles"),
            Command::new("uptime", uptime).help("how long the bot has been running"),
            Command::new("stats", stats).help("bot statistics"),
            Command::new("servinfo", servinfo).help("information about this server"),
            Command::new("tz", timezone).help("current time in a time zone, UTC by default"),
            Command::new("remind", remind)
                .alias("remindme")
                .help("remind <seconds> <message>"),
        ];
        for command in commands {
            bot.commands.register(self.name(), command).await?;
        }
        Ok(())
    }
}
