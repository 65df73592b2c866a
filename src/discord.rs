//! Serenity behind the `ChatClient` trait, and conversion of serenity values into the bot's
//! model.

use crate::{
    client::{Activity, ChatClient, PermissionEdit, RoleSpec},
    model::{Channel, ChannelId, Member, Message, MessageId, Server, ServerId, UserId},
};
use anyhow::{anyhow, Result};
use serenity::all::{
    ActivityData, ChannelType, Context, EditRole, GetMessages, Guild, GuildId, PermissionOverwrite,
    PermissionOverwriteType, Permissions, RoleId,
};

/// Most messages a single history request returns
const HISTORY_LIMIT: usize = 100;

/// Connection of one gateway event
pub struct DiscordClient {
    ctx: Context,
}

impl DiscordClient {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    async fn role_id(&self, server: ServerId, name: &str) -> Result<RoleId> {
        let roles = GuildId::new(server.0).roles(&self.ctx.http).await?;
        roles
            .values()
            .find(|role| role.name == name)
            .map(|role| role.id)
            .ok_or_else(|| anyhow!("Server {} has no role `{}`", server, name))
    }
}

fn channel_id(channel: ChannelId) -> serenity::all::ChannelId {
    serenity::all::ChannelId::new(channel.0)
}

fn user_id(user: UserId) -> serenity::all::UserId {
    serenity::all::UserId::new(user.0)
}

#[serenity::async_trait]
impl ChatClient for DiscordClient {
    async fn send_message(&self, channel: ChannelId, text: &str) -> Result<()> {
        channel_id(channel).say(&self.ctx.http, text).await?;
        Ok(())
    }

    async fn delete_recent_messages(&self, channel: ChannelId, count: usize) -> Result<usize> {
        let channel = channel_id(channel);
        let limit = count.min(HISTORY_LIMIT) as u8;
        let ids: Vec<serenity::all::MessageId> = channel
            .messages(&self.ctx.http, GetMessages::new().limit(limit))
            .await?
            .iter()
            .map(|msg| msg.id)
            .collect();

        // Bulk deletion needs at least two messages
        match ids.as_slice() {
            [] => {}
            [id] => channel.delete_message(&self.ctx.http, *id).await?,
            _ => channel.delete_messages(&self.ctx.http, &ids).await?,
        }
        Ok(ids.len())
    }

    async fn ban(&self, server: ServerId, user: UserId) -> Result<()> {
        GuildId::new(server.0)
            .ban(&self.ctx.http, user_id(user), 0)
            .await?;
        Ok(())
    }

    async fn kick(&self, server: ServerId, user: UserId) -> Result<()> {
        GuildId::new(server.0)
            .kick(&self.ctx.http, user_id(user))
            .await?;
        Ok(())
    }

    async fn add_role(&self, server: ServerId, user: UserId, role: &str) -> Result<()> {
        let role = self.role_id(server, role).await?;
        self.ctx
            .http
            .add_member_role(GuildId::new(server.0), user_id(user), role, None)
            .await?;
        Ok(())
    }

    async fn remove_role(&self, server: ServerId, user: UserId, role: &str) -> Result<()> {
        let role = self.role_id(server, role).await?;
        self.ctx
            .http
            .remove_member_role(GuildId::new(server.0), user_id(user), role, None)
            .await?;
        Ok(())
    }

    async fn create_role(&self, server: ServerId, role: &RoleSpec) -> Result<()> {
        let builder = EditRole::new()
            .name(&role.name)
            .colour(role.colour)
            .hoist(role.hoist)
            .permissions(Permissions::from_bits_truncate(role.permissions));
        GuildId::new(server.0)
            .create_role(&self.ctx, builder)
            .await?;
        Ok(())
    }

    async fn edit_permissions(
        &self,
        channel: ChannelId,
        user: UserId,
        edit: PermissionEdit,
    ) -> Result<()> {
        let overwrite = PermissionOverwrite {
            allow: Permissions::from_bits_truncate(edit.allow),
            deny: Permissions::from_bits_truncate(edit.deny),
            kind: PermissionOverwriteType::Member(user_id(user)),
        };
        channel_id(channel)
            .create_permission(&self.ctx.http, overwrite)
            .await?;
        Ok(())
    }

    async fn clear_permissions(&self, channel: ChannelId, user: UserId) -> Result<()> {
        channel_id(channel)
            .delete_permission(
                &self.ctx.http,
                PermissionOverwriteType::Member(user_id(user)),
            )
            .await?;
        Ok(())
    }

    async fn member_named(&self, server: ServerId, name: &str) -> Option<Member> {
        let guild = self.ctx.cache.guild(GuildId::new(server.0))?;
        let member = guild.member_named(name)?;
        Some(member_from_guild(&guild, member))
    }

    async fn server_count(&self) -> usize {
        self.ctx.cache.guilds().len()
    }

    async fn set_activity(&self, activity: Activity) -> Result<()> {
        let activity = match activity {
            Activity::Playing(name) => ActivityData::playing(name),
            Activity::Streaming { name, url } => ActivityData::streaming(name, url.as_str())?,
        };
        self.ctx.set_activity(Some(activity));
        Ok(())
    }
}

pub fn server_from_guild(guild: &Guild) -> Server {
    let mut channels: Vec<Channel> = guild
        .channels
        .values()
        .filter(|channel| channel.kind == ChannelType::Text)
        .map(|channel| Channel {
            id: ChannelId(channel.id.get()),
            name: channel.name.clone(),
        })
        .collect();
    channels.sort_by_key(|channel| channel.id.0);

    Server {
        id: ServerId(guild.id.get()),
        name: guild.name.clone(),
        owner_id: UserId(guild.owner_id.get()),
        channels,
        roles: guild.roles.values().map(|role| role.name.clone()).collect(),
        member_count: guild.member_count as usize,
        created_at: guild.id.created_at().to_string(),
    }
}

pub fn member_from_guild(guild: &Guild, member: &serenity::all::Member) -> Member {
    Member {
        id: UserId(member.user.id.get()),
        name: member.user.name.clone(),
        display_name: member.display_name().to_owned(),
        roles: member
            .roles
            .iter()
            .filter_map(|id| guild.roles.get(id))
            .map(|role| role.name.clone())
            .collect(),
        bot: member.user.bot,
    }
}

/// A user outside of any server
pub fn member_from_user(user: &serenity::all::User) -> Member {
    Member {
        id: UserId(user.id.get()),
        name: user.name.clone(),
        display_name: user.global_name.clone().unwrap_or_else(|| user.name.clone()),
        roles: Vec::new(),
        bot: user.bot,
    }
}

pub fn message_from_serenity(ctx: &Context, msg: &serenity::all::Message) -> Message {
    let direct = |user: &serenity::all::User| member_from_user(user);

    let (server, author, mentions, channel_name) = match msg.guild(&ctx.cache) {
        Some(guild) => {
            let in_guild = |user: &serenity::all::User| match guild.members.get(&user.id) {
                Some(member) => member_from_guild(&guild, member),
                None => direct(user),
            };
            (
                Some(server_from_guild(&guild)),
                in_guild(&msg.author),
                msg.mentions.iter().map(in_guild).collect(),
                guild
                    .channels
                    .get(&msg.channel_id)
                    .map(|channel| channel.name.clone())
                    .unwrap_or_default(),
            )
        }
        None => (
            None,
            direct(&msg.author),
            msg.mentions.iter().map(direct).collect(),
            String::new(),
        ),
    };

    Message {
        id: MessageId(msg.id.get()),
        channel: Channel {
            id: ChannelId(msg.channel_id.get()),
            name: channel_name,
        },
        server,
        author,
        content: msg.content.clone(),
        mentions,
    }
}
