//! Outbound operations on the chat platform.  Hooks and commands only talk to the platform
//! through this trait; `discord.rs` implements it with serenity.

use crate::model::{ChannelId, Member, ServerId, UserId};
use anyhow::Result;

/// Attributes of a role to create
#[derive(Clone, Debug, PartialEq)]
pub struct RoleSpec {
    pub name: String,
    pub colour: u32,
    pub hoist: bool,
    /// Permission bits
    pub permissions: u64,
}

/// Channel-level permission overwrite for one member, as permission bits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PermissionEdit {
    pub allow: u64,
    pub deny: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Activity {
    Playing(String),
    Streaming { name: String, url: String },
}

#[serenity::async_trait]
pub trait ChatClient: Send + Sync {
    async fn send_message(&self, channel: ChannelId, text: &str) -> Result<()>;
    /// Delete up to `count` of the newest messages.  Returns how many were deleted.
    async fn delete_recent_messages(&self, channel: ChannelId, count: usize) -> Result<usize>;
    async fn ban(&self, server: ServerId, user: UserId) -> Result<()>;
    async fn kick(&self, server: ServerId, user: UserId) -> Result<()>;
    async fn add_role(&self, server: ServerId, user: UserId, role: &str) -> Result<()>;
    async fn remove_role(&self, server: ServerId, user: UserId, role: &str) -> Result<()>;
    async fn create_role(&self, server: ServerId, role: &RoleSpec) -> Result<()>;
    async fn edit_permissions(
        &self,
        channel: ChannelId,
        user: UserId,
        edit: PermissionEdit,
    ) -> Result<()>;
    async fn clear_permissions(&self, channel: ChannelId, user: UserId) -> Result<()>;
    /// Look a member up by name or nickname
    async fn member_named(&self, server: ServerId, name: &str) -> Option<Member>;
    async fn server_count(&self) -> usize;
    async fn set_activity(&self, activity: Activity) -> Result<()>;
}
