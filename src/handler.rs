use crate::{
    bot::Bot,
    discord::{
        member_from_guild, member_from_user, message_from_serenity, server_from_guild,
        DiscordClient,
    },
    event::Event,
};
use serenity::all::{ChannelId, Context, GuildId, Member, Message, MessageId, MessageUpdateEvent, Ready};
use std::sync::Arc;

/// Discord event handler.  Converts serenity callbacks into bot events.
#[derive(Clone)]
pub struct Handler {
    bot: Arc<Bot>,
}

impl Handler {
    pub fn new(bot: Arc<Bot>) -> Self {
        Self { bot }
    }
}

fn client(ctx: Context) -> Arc<DiscordClient> {
    Arc::new(DiscordClient::new(ctx))
}

#[serenity::async_trait]
impl serenity::all::EventHandler for Handler {
    async fn ready(&self, discord_ctx: Context, ready: Ready) {
        let user = member_from_user(&ready.user);
        let servers = ready.guilds.len();
        self.bot.on_ready(client(discord_ctx), user, servers).await;
    }

    async fn message(&self, discord_ctx: Context, msg: Message) {
        let msg = message_from_serenity(&discord_ctx, &msg);
        self.bot.on_message(client(discord_ctx), msg).await;
    }

    async fn message_delete(
        &self,
        discord_ctx: Context,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        let message = discord_ctx
            .cache
            .message(channel_id, deleted_message_id)
            .map(|msg| message_from_serenity(&discord_ctx, &msg));
        let event = Event::MessageDelete {
            channel_id: crate::model::ChannelId(channel_id.get()),
            message_id: crate::model::MessageId(deleted_message_id.get()),
            server_id: guild_id.map(|id| crate::model::ServerId(id.get())),
            message,
        };
        self.bot.on_event(client(discord_ctx), event).await;
    }

    async fn message_update(
        &self,
        discord_ctx: Context,
        old_if_available: Option<Message>,
        new: Option<Message>,
        _event: MessageUpdateEvent,
    ) {
        // Without the cache there is no full message to pass on
        let Some(new) = new else {
            return;
        };
        let event = Event::MessageEdit {
            before: old_if_available.map(|old| message_from_serenity(&discord_ctx, &old)),
            after: message_from_serenity(&discord_ctx, &new),
        };
        self.bot.on_event(client(discord_ctx), event).await;
    }

    async fn guild_member_addition(&self, discord_ctx: Context, new_member: Member) {
        let converted = discord_ctx.cache.guild(new_member.guild_id).map(|guild| {
            (
                server_from_guild(&guild),
                member_from_guild(&guild, &new_member),
            )
        });
        let Some((server, member)) = converted else {
            return;
        };
        self.bot
            .on_event(client(discord_ctx), Event::MemberJoin { server, member })
            .await;
    }
}

#[serenity::async_trait]
impl serenity::all::RawEventHandler for Handler {
    async fn raw_event(&self, discord_ctx: Context, ev: serenity::all::Event) {
        let event = Event::raw(format!("{:?}", ev));
        self.bot.on_event(client(discord_ctx), event).await;
    }
}
