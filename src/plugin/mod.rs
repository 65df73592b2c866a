use crate::bot::Bot;
use anyhow::Result;
use std::sync::Arc;

mod automod;
mod commands;
mod commits;
mod debug;
mod fun;
mod help;
mod ignore_bots;
mod moderation;
mod owner;
mod ready;
mod reload;

#[serenity::async_trait]
pub trait Plugin: Sync + Send {
    /// Plugin name.  Used by `reload` and `disabled_plugins`.
    fn name(&self) -> &'static str;
    /// Register the plugin's hooks and commands.  Runs again on reload; registering under the
    /// same names replaces the previous entries.  On error the loader removes everything the
    /// plugin registered.
    async fn load(&self, bot: &Arc<Bot>) -> Result<()>;
}

/// Ordered list of available plugins
pub fn plugins() -> Vec<Arc<dyn Plugin>> {
    vec![
        // Core bot operations
        Arc::new(ignore_bots::IgnoreBots),
        Arc::new(debug::Debug),
        Arc::new(commands::Commands),
        Arc::new(help::Help),
        Arc::new(ready::Ready),
        Arc::new(reload::Reload),
        Arc::new(owner::Owner),
        // Server management
        Arc::new(moderation::Moderation),
        Arc::new(automod::Automod),
        // Random stuff
        Arc::new(fun::Fun),
        Arc::new(commits::Commits),
    ]
}
