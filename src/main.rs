mod bot;
mod client;
mod commands;
mod config;
mod context;
mod discord;
mod dispatch;
mod error;
mod event;
mod handler;
mod helper;
mod hooks;
mod locale;
mod logging;
mod model;
mod permissions;
mod plugin;
mod store;
#[cfg(test)]
mod testing;

use crate::{bot::Bot, config::Config, locale::Locales, store::TomlStore};
use serenity::{all::GatewayIntents, Client};
use std::{path::PathBuf, sync::Arc};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration path may be given as the only argument
    let path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => Config::default_path()?,
    };
    let cfg = Config::load(&path).await?;
    let token = cfg.general.discord_token.clone();
    let store = TomlStore::load(cfg.store_path()?).await?;
    let locales = Locales::load(cfg.general.locale_dir.as_deref()).await?;
    let bot = Bot::new(cfg, Arc::new(store), locales);
    let handler = handler::Handler::new(bot);

    // Things we want discord to tell us about.
    let intents = GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    Client::builder(&token, intents)
        .event_handler(handler.clone())
        .raw_event_handler(handler)
        .await?
        .start()
        .await
        .map_err(Into::into)
}
