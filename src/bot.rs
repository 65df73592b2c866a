//! The bot context.  One `Bot` owns the registries, the store and the configuration, and is
//! passed explicitly to everything that needs it.  Tests build as many as they like.

use crate::{
    client::ChatClient,
    commands::CommandRegistry,
    config::Config,
    hooks::HookRegistry,
    locale::{Locale, Locales},
    log_error, log_internal,
    model::{ServerId, UserId},
    plugin::{self, Plugin},
    store::Store,
};
use anyhow::Result;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tokio::{
    sync::{Mutex, RwLock},
    task::JoinHandle,
};

pub struct Bot {
    pub cfg: RwLock<Config>,
    pub hooks: HookRegistry,
    pub commands: CommandRegistry,
    pub store: Arc<dyn Store>,
    pub locales: Locales,
    plugins: Vec<Arc<dyn Plugin>>,
    /// Set once the plugins have been loaded.  Messages are ignored until then.
    loaded: AtomicBool,
    started: Instant,
    message_count: AtomicU64,
    /// Connection of the latest ready event
    client: RwLock<Option<Arc<dyn ChatClient>>>,
    /// Long-running tasks, keyed by the plugin that owns them
    tasks: Mutex<HashMap<&'static str, JoinHandle<()>>>,
}

impl Bot {
    pub fn new(cfg: Config, store: Arc<dyn Store>, locales: Locales) -> Arc<Self> {
        Self::with_plugins(cfg, store, locales, plugin::plugins())
    }

    pub fn with_plugins(
        cfg: Config,
        store: Arc<dyn Store>,
        locales: Locales,
        plugins: Vec<Arc<dyn Plugin>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            cfg: RwLock::new(cfg),
            hooks: HookRegistry::new(),
            commands: CommandRegistry::new(),
            store,
            locales,
            plugins,
            loaded: AtomicBool::new(false),
            started: Instant::now(),
            message_count: AtomicU64::new(0),
            client: RwLock::new(None),
            tasks: Mutex::new(HashMap::new()),
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::Relaxed)
    }

    pub(crate) fn count_message(&self) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn client(&self) -> Option<Arc<dyn ChatClient>> {
        self.client.read().await.clone()
    }

    pub(crate) async fn set_client(&self, client: Arc<dyn ChatClient>) {
        *self.client.write().await = Some(client);
    }

    pub async fn is_owner(&self, user: UserId) -> bool {
        self.cfg.read().await.general.owner_id == user.0
    }

    /// Command prefix of a server, falling back to the configured default
    pub async fn prefix_for(&self, server: Option<ServerId>) -> String {
        if let Some(prefix) = self.server_config(server, "prefix").await {
            return prefix;
        }
        self.cfg.read().await.general.command_prefix.clone()
    }

    pub async fn locale_for(&self, server: Option<ServerId>) -> Arc<Locale> {
        let lang = self.server_config(server, "lang").await;
        self.locales.get(lang.as_deref())
    }

    async fn server_config(&self, server: Option<ServerId>, key: &str) -> Option<String> {
        let server = server?;
        match self.store.get_config(server, key).await {
            Ok(value) => value,
            Err(err) => {
                log_error!("Could not read `{}` of server {}: {:#}", key, server, err);
                None
            }
        }
    }

    pub fn plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins
            .iter()
            .find(|plugin| plugin.name() == name)
            .cloned()
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    /// Load every plugin which is not disabled.  A plugin that fails to load is rolled back and
    /// skipped; the others still load.  Returns how many plugins loaded.
    pub async fn load_plugins(self: &Arc<Self>) -> usize {
        let disabled = self.cfg.read().await.general.disabled_plugins.clone();

        let mut count = 0;
        for plugin in &self.plugins {
            if disabled.iter().any(|name| name == plugin.name()) {
                log_internal!("Skipping disabled plugin `{}`", plugin.name());
                continue;
            }
            if self.load_plugin(plugin.as_ref()).await.is_ok() {
                count += 1;
            }
        }

        self.loaded.store(true, Ordering::SeqCst);
        log_internal!("Loaded {} plugin(s)", count);
        count
    }

    /// Run a plugin's registration.  Registering again replaces the earlier entries, so this
    /// also serves as reload.  On failure everything the plugin registered is removed.
    pub async fn load_plugin(self: &Arc<Self>, plugin: &dyn Plugin) -> Result<()> {
        match plugin.load(self).await {
            Ok(()) => {
                log_internal!("Loaded plugin `{}`", plugin.name());
                Ok(())
            }
            Err(err) => {
                log_error!("Could not load plugin `{}`: {:#}", plugin.name(), err);
                self.unload_plugin(plugin.name()).await;
                Err(err)
            }
        }
    }

    pub async fn unload_plugin(&self, name: &str) {
        let hooks = self.hooks.unregister_plugin(name).await;
        let commands = self.commands.unregister_plugin(name).await;
        self.stop_task(name).await;
        log_internal!(
            "Unloaded plugin `{}` ({} hook(s), {} command(s))",
            name,
            hooks,
            commands
        );
    }

    /// Returns `Ok(false)` if there is no such plugin
    pub async fn reload_plugin(self: &Arc<Self>, name: &str) -> Result<bool> {
        let Some(plugin) = self.plugin(name) else {
            return Ok(false);
        };
        self.load_plugin(plugin.as_ref()).await?;
        Ok(true)
    }

    /// Re-read the configuration, then reload every enabled plugin and unload the disabled
    /// ones.  Returns how many plugins loaded.
    pub async fn reload_all(self: &Arc<Self>) -> Result<usize> {
        self.cfg.write().await.reload().await?;
        let disabled = self.cfg.read().await.general.disabled_plugins.clone();

        let mut count = 0;
        for plugin in &self.plugins {
            if disabled.iter().any(|name| name == plugin.name()) {
                self.unload_plugin(plugin.name()).await;
            } else if self.load_plugin(plugin.as_ref()).await.is_ok() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Keep `task` as the one running task of `owner`, stopping the previous one
    pub async fn replace_task(&self, owner: &'static str, task: JoinHandle<()>) {
        if let Some(previous) = self.tasks.lock().await.insert(owner, task) {
            previous.abort();
        }
    }

    pub async fn stop_task(&self, owner: &str) {
        if let Some(task) = self.tasks.lock().await.remove(owner) {
            task.abort();
        }
    }

    pub async fn has_task(&self, owner: &str) -> bool {
        self.tasks
            .lock()
            .await
            .get(owner)
            .is_some_and(|task| !task.is_finished())
    }
}
