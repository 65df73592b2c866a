//! Process-wide mapping from event to named hooks.
//!
//! Hooks are keyed by name within an event.  Registering a name again replaces the previous
//! hook in place, which is what makes reloading a plugin safe: the event never ends up with two
//! copies of the same hook.

use crate::{
    context::EventContext,
    event::{EventHandled, HookTarget},
    log_internal,
};
use anyhow::Result;
use std::{collections::HashMap, future::Future, sync::Arc};
use tokio::sync::RwLock;

#[serenity::async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self, ctx: Arc<EventContext>) -> Result<EventHandled>;
}

/// Plain `async fn(Arc<EventContext>) -> Result<EventHandled>` functions are hooks.
#[serenity::async_trait]
impl<F, Fut> Hook for F
where
    F: Fn(Arc<EventContext>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<EventHandled>> + Send + 'static,
{
    async fn call(&self, ctx: Arc<EventContext>) -> Result<EventHandled> {
        (self)(ctx).await
    }
}

/// Name derived from a hook function's path, e.g. `navalbot::plugin::ignore_bots::ignore_bots`
pub fn hook_name<F>(_: &F) -> &'static str {
    std::any::type_name::<F>()
}

#[derive(Clone)]
pub struct HookEntry {
    pub name: String,
    /// Plugin which registered the hook
    pub plugin: &'static str,
    hook: Arc<dyn Hook>,
}

impl HookEntry {
    pub async fn call(&self, ctx: Arc<EventContext>) -> Result<EventHandled> {
        self.hook.call(ctx).await
    }
}

#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<HookTarget, Vec<HookEntry>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the hook, or replace the one registered under the same name.  A replaced hook keeps
    /// its position in the dispatch order.
    pub async fn register(
        &self,
        target: impl Into<HookTarget>,
        plugin: &'static str,
        name: impl Into<String>,
        hook: impl Hook + 'static,
    ) {
        let target = target.into();
        let entry = HookEntry {
            name: name.into(),
            plugin,
            hook: Arc::new(hook),
        };
        log_internal!("Registered hook for `{}` -> `{}`", target, entry.name);

        let mut hooks = self.hooks.write().await;
        let bucket = hooks.entry(target).or_default();
        match bucket.iter_mut().find(|existing| existing.name == entry.name) {
            Some(existing) => *existing = entry,
            None => bucket.push(entry),
        }
    }

    /// Register a hook function under its own path
    pub async fn register_fn<F, Fut>(&self, target: impl Into<HookTarget>, plugin: &'static str, f: F)
    where
        F: Fn(Arc<EventContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<EventHandled>> + Send + 'static,
    {
        let name = hook_name(&f);
        self.register(target, plugin, name, f).await
    }

    /// Returns whether a hook was removed
    pub async fn unregister(&self, target: impl Into<HookTarget>, name: &str) -> bool {
        let mut hooks = self.hooks.write().await;
        let Some(bucket) = hooks.get_mut(&target.into()) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|entry| entry.name != name);
        before != bucket.len()
    }

    /// Drop every hook of a plugin.  Returns how many were removed.
    pub async fn unregister_plugin(&self, plugin: &str) -> usize {
        let mut hooks = self.hooks.write().await;
        let mut removed = 0;
        for bucket in hooks.values_mut() {
            let before = bucket.len();
            bucket.retain(|entry| entry.plugin != plugin);
            removed += before - bucket.len();
        }
        removed
    }

    /// Snapshot of the hooks for a target, in registration order.  Later registry changes do not
    /// affect a snapshot already taken.
    pub async fn list(&self, target: impl Into<HookTarget>) -> Vec<HookEntry> {
        self.hooks
            .read()
            .await
            .get(&target.into())
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventName;

    async fn first(_ctx: Arc<EventContext>) -> Result<EventHandled> {
        Ok(EventHandled::No)
    }

    async fn second(_ctx: Arc<EventContext>) -> Result<EventHandled> {
        Ok(EventHandled::Yes)
    }

    fn names(entries: &[HookEntry]) -> Vec<&str> {
        entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    #[tokio::test]
    async fn unknown_event_starts_empty() {
        let registry = HookRegistry::new();
        assert!(registry.list(EventName::MemberJoin).await.is_empty());
        assert!(!registry.unregister(EventName::MemberJoin, "nope").await);
    }

    #[tokio::test]
    async fn reregistering_a_name_keeps_exactly_one_entry() {
        let registry = HookRegistry::new();
        for _ in 0..3 {
            registry
                .register(EventName::Message, "test", "greeter", first)
                .await;
        }
        registry
            .register(EventName::Message, "test", "greeter", second)
            .await;

        let hooks = registry.list(EventName::Message).await;
        assert_eq!(names(&hooks), vec!["greeter"]);
    }

    #[tokio::test]
    async fn replacement_keeps_registration_order() {
        let registry = HookRegistry::new();
        registry.register(EventName::Message, "test", "a", first).await;
        registry.register(EventName::Message, "test", "b", first).await;
        registry.register(EventName::Message, "test", "a", second).await;

        assert_eq!(names(&registry.list(EventName::Message).await), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn function_hooks_are_named_after_their_path() {
        let registry = HookRegistry::new();
        registry.register_fn(EventName::Raw, "test", first).await;
        registry.register_fn(EventName::Raw, "test", first).await;
        registry.register_fn(EventName::Raw, "test", second).await;

        let hooks = registry.list(EventName::Raw).await;
        assert_eq!(hooks.len(), 2);
        assert!(hooks[0].name.ends_with("::first"));
        assert!(hooks[1].name.ends_with("::second"));
    }

    #[tokio::test]
    async fn snapshot_is_unaffected_by_later_changes() {
        let registry = HookRegistry::new();
        registry.register(EventName::Message, "test", "a", first).await;
        let snapshot = registry.list(EventName::Message).await;

        registry.unregister(EventName::Message, "a").await;
        registry.register(EventName::Message, "test", "b", first).await;

        assert_eq!(names(&snapshot), vec!["a"]);
        assert_eq!(names(&registry.list(EventName::Message).await), vec!["b"]);
    }

    #[tokio::test]
    async fn unregister_plugin_only_touches_that_plugin() {
        let registry = HookRegistry::new();
        registry.register(EventName::Message, "fun", "a", first).await;
        registry.register(HookTarget::All, "fun", "b", first).await;
        registry.register(EventName::Message, "debug", "c", first).await;

        assert_eq!(registry.unregister_plugin("fun").await, 2);
        assert_eq!(names(&registry.list(EventName::Message).await), vec!["c"]);
        assert!(registry.list(HookTarget::All).await.is_empty());
    }
}
