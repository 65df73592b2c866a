//! Fixtures for unit tests: a chat client which records what the bot does, and a small server
//! with a handful of members.

use crate::{
    bot::Bot,
    client::{Activity, ChatClient, PermissionEdit, RoleSpec},
    config::Config,
    context::EventContext,
    event::Event,
    locale::Locales,
    model::{Channel, ChannelId, Member, Message, MessageId, Server, ServerId, UserId},
    store::TomlStore,
};
use anyhow::Result;
use std::{path::Path, sync::Arc, sync::Mutex};

/// `owner_id` of the test configuration
pub const BOT_OWNER: u64 = 1;
pub const GENERAL: ChannelId = ChannelId(500);
pub const DM_CHANNEL: ChannelId = ChannelId(900);

/// One outbound operation
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Send(ChannelId, String),
    Delete(ChannelId, usize),
    Ban(ServerId, UserId),
    Kick(ServerId, UserId),
    AddRole(ServerId, UserId, String),
    RemoveRole(ServerId, UserId, String),
    CreateRole(ServerId, RoleSpec),
    EditPermissions(ChannelId, UserId, PermissionEdit),
    ClearPermissions(ChannelId, UserId),
    SetActivity(Activity),
}

#[derive(Default)]
pub struct RecordingClient {
    ops: Mutex<Vec<Op>>,
    /// Members `member_named` can find
    pub members: Vec<Member>,
}

impl RecordingClient {
    pub fn with_members(members: Vec<Member>) -> Self {
        Self {
            ops: Mutex::default(),
            members,
        }
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().clone()
    }

    /// Texts of all sent messages
    pub fn sent(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Send(_, text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, op: Op) {
        self.ops.lock().unwrap().push(op);
    }
}

#[serenity::async_trait]
impl ChatClient for RecordingClient {
    async fn send_message(&self, channel: ChannelId, text: &str) -> Result<()> {
        self.record(Op::Send(channel, text.to_owned()));
        Ok(())
    }

    async fn delete_recent_messages(&self, channel: ChannelId, count: usize) -> Result<usize> {
        self.record(Op::Delete(channel, count));
        Ok(count)
    }

    async fn ban(&self, server: ServerId, user: UserId) -> Result<()> {
        self.record(Op::Ban(server, user));
        Ok(())
    }

    async fn kick(&self, server: ServerId, user: UserId) -> Result<()> {
        self.record(Op::Kick(server, user));
        Ok(())
    }

    async fn add_role(&self, server: ServerId, user: UserId, role: &str) -> Result<()> {
        self.record(Op::AddRole(server, user, role.to_owned()));
        Ok(())
    }

    async fn remove_role(&self, server: ServerId, user: UserId, role: &str) -> Result<()> {
        self.record(Op::RemoveRole(server, user, role.to_owned()));
        Ok(())
    }

    async fn create_role(&self, server: ServerId, role: &RoleSpec) -> Result<()> {
        self.record(Op::CreateRole(server, role.clone()));
        Ok(())
    }

    async fn edit_permissions(
        &self,
        channel: ChannelId,
        user: UserId,
        edit: PermissionEdit,
    ) -> Result<()> {
        self.record(Op::EditPermissions(channel, user, edit));
        Ok(())
    }

    async fn clear_permissions(&self, channel: ChannelId, user: UserId) -> Result<()> {
        self.record(Op::ClearPermissions(channel, user));
        Ok(())
    }

    async fn member_named(&self, _server: ServerId, name: &str) -> Option<Member> {
        self.members
            .iter()
            .find(|member| member.name == name || member.display_name == name)
            .cloned()
    }

    async fn server_count(&self) -> usize {
        1
    }

    async fn set_activity(&self, activity: Activity) -> Result<()> {
        self.record(Op::SetActivity(activity));
        Ok(())
    }
}

pub fn config() -> Config {
    let toml = format!(
        "[general]\ndiscord_token = \"test\"\nowner_id = {}\n",
        BOT_OWNER
    );
    Config::from_toml(&toml, Path::new("test.toml")).unwrap()
}

/// Bot with every plugin available but none loaded, over an in-memory store
pub fn bot() -> Arc<Bot> {
    Bot::new(config(), Arc::new(TomlStore::in_memory()), Locales::builtin())
}

pub async fn loaded_bot() -> Arc<Bot> {
    let bot = bot();
    bot.load_plugins().await;
    bot
}

/// Server 123, owned by user 2 (not the bot owner)
pub fn server() -> Server {
    Server {
        id: ServerId(123),
        name: "Navy".to_owned(),
        owner_id: UserId(2),
        channels: vec![
            Channel {
                id: GENERAL,
                name: "general".to_owned(),
            },
            Channel {
                id: ChannelId(501),
                name: "random".to_owned(),
            },
        ],
        roles: ["Admin", "Moderator", "Muted", "Member", "Bot Commander"]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        member_count: 42,
        created_at: "2016-01-01T00:00:00Z".to_owned(),
    }
}

pub fn member(id: u64, name: &str, roles: &[&str]) -> Member {
    Member {
        id: UserId(id),
        name: name.to_owned(),
        display_name: name.to_owned(),
        roles: roles.iter().map(|role| role.to_string()).collect(),
        bot: false,
    }
}

/// Message in #general of `server()`
pub fn message(author: Member, content: &str) -> Message {
    Message {
        id: MessageId(1000),
        channel: Channel {
            id: GENERAL,
            name: "general".to_owned(),
        },
        server: Some(server()),
        author,
        content: content.to_owned(),
        mentions: Vec::new(),
    }
}

pub fn dm(author: Member, content: &str) -> Message {
    Message {
        id: MessageId(1001),
        channel: Channel {
            id: DM_CHANNEL,
            name: String::new(),
        },
        server: None,
        author,
        content: content.to_owned(),
        mentions: Vec::new(),
    }
}

pub fn context(
    bot: &Arc<Bot>,
    client: &Arc<RecordingClient>,
    message: Message,
) -> Arc<EventContext> {
    Arc::new(EventContext::new(
        bot.clone(),
        client.clone(),
        Event::Message(message),
        bot.locales.get(None),
    ))
}

/// Run a command line through the whole message pipeline and wait for the command to finish
pub async fn run_command(
    bot: &Arc<Bot>,
    client: &Arc<RecordingClient>,
    author: Member,
    content: &str,
) -> crate::dispatch::Delivery {
    bot.on_message(client.clone(), message(author, content)).await
}
