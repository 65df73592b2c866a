//! Batch moderation from a JSON action document:
//!
//! ```text
//! {"action": "mute", "items": ["!troll", "#@all"]}
//! {"action": "clean-perms", "items": ["!troll", "#general"]}
//! {"action": "create-role", "items": [{"name": "DJ", "colour": "ff8800", "hoist": true}],
//!  "permissions": ["connect", "speak"]}
//! ```
//!
//! `!name` items are members, `#name` channels and `#@all` every channel of the server.  Objects
//! supply attributes.  `permissions` is either raw permission bits or a list of flag names.

use crate::{
    bot::Bot,
    client::{PermissionEdit, RoleSpec},
    commands::Command,
    context::CommandContext,
    model::{Channel, Member},
    plugin::*,
};
use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use serenity::all::Permissions;

pub struct Automod;

#[derive(Debug, Deserialize)]
struct Document {
    action: String,
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    permissions: PermissionSpec,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum PermissionSpec {
    Bits(u64),
    Names(Vec<String>),
    #[default]
    None,
}

impl PermissionSpec {
    fn to_permissions(&self) -> Permissions {
        match self {
            PermissionSpec::Bits(bits) => Permissions::from_bits_truncate(*bits),
            PermissionSpec::Names(names) => names
                .iter()
                .filter_map(|name| Permissions::from_name(&name.to_uppercase()))
                .fold(Permissions::empty(), |all, flag| all | flag),
            PermissionSpec::None => Permissions::empty(),
        }
    }
}

/// Items of a document, resolved against the server
#[derive(Debug, Default)]
struct Targets {
    members: Vec<Member>,
    channels: Vec<Channel>,
    attrs: Map<String, Value>,
}

async fn resolve(ctx: &CommandContext, items: &[Value]) -> Result<Targets> {
    let server = ctx.server()?;
    let no_such_item = |item: &str| ctx.user_error("automod.no_such_item", &[("item", item)]);

    let mut targets = Targets::default();
    for item in items {
        match item {
            Value::String(item) if item == "#@all" => {
                targets.channels.extend(server.channels.iter().cloned());
            }
            Value::String(item) => {
                if let Some(name) = item.strip_prefix('!') {
                    let member = ctx
                        .client()
                        .member_named(server.id, name)
                        .await
                        .ok_or_else(|| no_such_item(name))?;
                    targets.members.push(member);
                } else if let Some(name) = item.strip_prefix('#') {
                    let channel = server
                        .channel_named(name)
                        .ok_or_else(|| no_such_item(name))?;
                    targets.channels.push(channel.clone());
                }
            }
            Value::Object(attrs) => targets.attrs.extend(attrs.clone()),
            _ => {}
        }
    }
    Ok(targets)
}

/// Sending and reacting is denied, reading stays allowed
fn mute_edit() -> PermissionEdit {
    let deny = Permissions::SEND_MESSAGES
        | Permissions::SEND_TTS_MESSAGES
        | Permissions::ADD_REACTIONS
        | Permissions::EMBED_LINKS
        | Permissions::ATTACH_FILES
        | Permissions::MENTION_EVERYONE;
    let allow = Permissions::VIEW_CHANNEL | Permissions::READ_MESSAGE_HISTORY;
    PermissionEdit {
        allow: allow.bits(),
        deny: deny.bits(),
    }
}

/// `colour` as an integer or a hex string
fn parse_colour(value: Option<&Value>) -> Option<u32> {
    match value {
        None => Some(0),
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => u32::from_str_radix(s.trim_start_matches('#'), 16).ok(),
        Some(_) => None,
    }
}

async fn automod(ctx: CommandContext) -> Result<()> {
    let doc: Document = match serde_json::from_str(ctx.rest()) {
        Ok(doc) => doc,
        Err(err) => {
            return Err(ctx.user_error("automod.bad_document", &[("error", &err.to_string())]))
        }
    };
    let targets = resolve(&ctx, &doc.items).await?;
    let server = ctx.server()?;

    match doc.action.as_str() {
        "mute" => {
            for member in &targets.members {
                for channel in &targets.channels {
                    ctx.client()
                        .edit_permissions(channel.id, member.id, mute_edit())
                        .await?;
                    ctx.reply(
                        "automod.actions.mute",
                        &[("user", &member.display_name), ("chan", &channel.name)],
                    )
                    .await?;
                }
            }
        }
        "clean-perms" => {
            for member in &targets.members {
                for channel in &targets.channels {
                    ctx.client().clear_permissions(channel.id, member.id).await?;
                    ctx.reply(
                        "automod.actions.clean_perms",
                        &[("user", &member.display_name), ("chan", &channel.name)],
                    )
                    .await?;
                }
            }
        }
        "create-role" => {
            let Some(name) = targets.attrs.get("name").and_then(Value::as_str) else {
                return Err(ctx.user_error("automod.no_role_name", &[]));
            };
            let colour_attr = targets.attrs.get("colour");
            let Some(colour) = parse_colour(colour_attr) else {
                let val = colour_attr.map(Value::to_string).unwrap_or_default();
                return Err(ctx.user_error("generic.not_int", &[("val", &val)]));
            };
            let role = RoleSpec {
                name: name.to_owned(),
                colour,
                hoist: targets
                    .attrs
                    .get("hoist")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                permissions: doc.permissions.to_permissions().bits(),
            };
            ctx.client().create_role(server.id, &role).await?;
            ctx.reply(
                "automod.actions.role_create",
                &[("name", name), ("server", &server.name)],
            )
            .await?;
        }
        other => return Err(ctx.user_error("automod.actions.none", &[("action", other)])),
    }
    Ok(())
}

#[serenity::async_trait]
impl Plugin for Automod {
    fn name(&self) -> &'static str {
        "automod"
    }

    async fn load(&self, bot: &Arc<Bot>) -> Result<()> {
        bot.commands
            .register(
                self.name(),
                Command::new("automod", automod)
                    .roles(&["Admin"])
                    .min_args(1)
                    .help("run a JSON moderation action"),
            )
            .await?;
        Ok(())
    }
}
