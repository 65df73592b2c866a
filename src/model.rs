//! Chat platform values as the bot core sees them.
//!
//! The dispatch core never touches serenity types directly.  The gateway adapter in
//! `discord.rs` converts into these, which also lets tests build events by hand.

use std::collections::HashSet;
use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
        )]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map($name)
            }
        }
    };
}

id_type!(UserId);
id_type!(ChannelId);
id_type!(ServerId);
id_type!(MessageId);

/// A user, as seen from within a server when there is one.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    pub id: UserId,
    /// Global account name
    pub name: String,
    /// Per-server nickname, falling back to the account name
    pub display_name: String,
    /// Names of the roles held in the server.  Empty outside of a server.
    pub roles: Vec<String>,
    pub bot: bool,
}

impl Member {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    pub fn has_any_role(&self, roles: &HashSet<&str>) -> bool {
        self.roles.iter().any(|role| roles.contains(role.as_str()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Server {
    pub id: ServerId,
    pub name: String,
    pub owner_id: UserId,
    pub channels: Vec<Channel>,
    /// Role names defined on the server
    pub roles: Vec<String>,
    pub member_count: usize,
    pub created_at: String,
}

impl Server {
    pub fn channel_named(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.name == name)
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub channel: Channel,
    /// None for direct messages
    pub server: Option<Server>,
    pub author: Member,
    pub content: String,
    pub mentions: Vec<Member>,
}

impl Message {
    pub fn server_id(&self) -> Option<ServerId> {
        self.server.as_ref().map(|server| server.id)
    }
}
