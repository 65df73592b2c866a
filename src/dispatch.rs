//! Delivery of inbound events to hooks.
//!
//! Every event name has a fixed dispatch mode.  Sequential events await their hooks one after
//! the other and stop at the first hook that reports the event as handled.  Concurrent events
//! spawn one task per hook.  Catch-all hooks are spawned for every inbound event and every
//! reported failure on top of that.  In both modes a failing hook is logged and forwarded to
//! the `on_error` hooks; it never stops its siblings and never reaches the caller.

use crate::{
    bot::Bot,
    client::ChatClient,
    context::EventContext,
    event::{DispatchMode, Event, EventHandled, EventName, HookTarget},
    hooks::HookEntry,
    log_error, log_internal,
    model::{Member, Message},
    store::{blacklist_key, GLOBAL_BLACKLIST},
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// What a dispatch did
pub struct Dispatched {
    pub handled: EventHandled,
    /// Hooks still running in the background
    pub tasks: Vec<JoinHandle<()>>,
}

impl Dispatched {
    fn unhandled(tasks: Vec<JoinHandle<()>>) -> Self {
        Self {
            handled: EventHandled::No,
            tasks,
        }
    }

    /// Wait for every spawned hook
    pub async fn join(self) -> EventHandled {
        for task in self.tasks {
            let _ = task.await;
        }
        self.handled
    }
}

/// How far an inbound message got through the pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Plugins are not loaded yet
    NotLoaded,
    /// A hook before the blacklist checks ended processing
    Halted,
    Blacklisted,
    DirectMessage,
    Empty,
    Delivered,
}

impl Bot {
    /// Run the hooks registered under `name`
    pub async fn dispatch(&self, name: EventName, ctx: Arc<EventContext>) -> Dispatched {
        let hooks = self.hooks.list(name).await;

        match name.mode() {
            DispatchMode::Sequential => {
                for hook in hooks {
                    match hook.call(ctx.clone()).await {
                        Ok(EventHandled::Yes) => {
                            log_internal!("`{}` handled by `{}`", name, hook.name);
                            return Dispatched {
                                handled: EventHandled::Yes,
                                tasks: Vec::new(),
                            };
                        }
                        Ok(EventHandled::No) => {}
                        Err(err) => {
                            self.report_failure(&ctx, &format!("{} -> {}", name, hook.name), &err)
                                .await
                        }
                    }
                }
                Dispatched::unhandled(Vec::new())
            }
            DispatchMode::Concurrent if name == EventName::Error => {
                Dispatched::unhandled(spawn_error_hooks(hooks, ctx))
            }
            DispatchMode::Concurrent => Dispatched::unhandled(spawn_hooks(name.as_str(), hooks, ctx)),
        }
    }

    /// Spawn every catch-all hook for one inbound event
    pub async fn dispatch_catch_all(&self, ctx: &Arc<EventContext>) -> Vec<JoinHandle<()>> {
        let hooks = self.hooks.list(HookTarget::All).await;
        spawn_hooks("*", hooks, ctx.clone())
    }

    /// Log a hook or command failure and hand it to the `on_error` and catch-all hooks
    pub async fn report_failure(&self, ctx: &EventContext, source: &str, err: &anyhow::Error) {
        log_error!("{} failed: {:#}", source, err);

        let mut hooks = self.hooks.list(EventName::Error).await;
        hooks.extend(self.hooks.list(HookTarget::All).await);
        if hooks.is_empty() {
            return;
        }
        let event = Event::Error {
            source: source.to_owned(),
            description: format!("{:#}", err),
        };
        spawn_error_hooks(hooks, Arc::new(ctx.with_event(event)));
    }

    /// Entry point for every event except messages
    pub async fn on_event(self: &Arc<Self>, client: Arc<dyn ChatClient>, event: Event) -> Dispatched {
        let locale = self.locale_for(event.server_id()).await;
        let name = event.name();
        let ctx = Arc::new(EventContext::new(self.clone(), client, event, locale));

        let mut tasks = self.dispatch_catch_all(&ctx).await;
        let mut dispatched = self.dispatch(name, ctx).await;
        tasks.append(&mut dispatched.tasks);
        dispatched.tasks = tasks;
        dispatched
    }

    /// The connection is up.  Plugins load on the first ready event.
    pub async fn on_ready(
        self: &Arc<Self>,
        client: Arc<dyn ChatClient>,
        user: Member,
        servers: usize,
    ) -> Dispatched {
        self.set_client(client.clone()).await;
        if !self.is_loaded() {
            self.load_plugins().await;
        }
        self.on_event(client, Event::Ready { user, servers }).await
    }

    /// The message pipeline: pre-blacklist hooks, blacklists, then the message hooks.
    pub async fn on_message(self: &Arc<Self>, client: Arc<dyn ChatClient>, message: Message) -> Delivery {
        if !self.is_loaded() {
            return Delivery::NotLoaded;
        }
        self.count_message();

        let server = message.server_id();
        let author = message.author.id.to_string();
        let channel = message.channel.id;
        let empty = message.content.trim().is_empty();

        let locale = self.locale_for(server).await;
        let ctx = Arc::new(EventContext::new(
            self.clone(),
            client.clone(),
            Event::Message(message),
            locale,
        ));
        self.dispatch_catch_all(&ctx).await;

        let before = self
            .dispatch(EventName::MessageBeforeBlacklist, ctx.clone())
            .await;
        if before.handled == EventHandled::Yes {
            return Delivery::Halted;
        }

        if self.in_set(GLOBAL_BLACKLIST, &author).await {
            return Delivery::Blacklisted;
        }

        let Some(server) = server else {
            let reply = ctx.locale.get("generic.no_dm");
            if let Err(err) = client.send_message(channel, reply).await {
                log_error!("Could not answer direct message: {:#}", err);
            }
            return Delivery::DirectMessage;
        };

        if self.in_set(&blacklist_key(server), &author).await {
            return Delivery::Blacklisted;
        }

        if empty {
            return Delivery::Empty;
        }

        self.dispatch(EventName::Message, ctx).await;
        Delivery::Delivered
    }

    /// Store failures count as "not a member" so the bot keeps answering
    async fn in_set(&self, key: &str, member: &str) -> bool {
        match self.store.get_set(key).await {
            Ok(set) => set.contains(member),
            Err(err) => {
                log_error!("Could not read `{}`: {:#}", key, err);
                false
            }
        }
    }
}

/// One task per hook.  Failures are reported through the bot.
fn spawn_hooks(
    source: &'static str,
    hooks: Vec<HookEntry>,
    ctx: Arc<EventContext>,
) -> Vec<JoinHandle<()>> {
    hooks
        .into_iter()
        .map(|hook| {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                if let Err(err) = hook.call(ctx.clone()).await {
                    ctx.bot
                        .report_failure(&ctx, &format!("{} -> {}", source, hook.name), &err)
                        .await;
                }
            })
        })
        .collect()
}

/// Error hooks failing are only logged, they are not reported again.
fn spawn_error_hooks(hooks: Vec<HookEntry>, ctx: Arc<EventContext>) -> Vec<JoinHandle<()>> {
    hooks
        .into_iter()
        .map(|hook| {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                if let Err(err) = hook.call(ctx).await {
                    log_error!("{} -> {} failed: {:#}", EventName::Error, hook.name, err);
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, dm, member, message, Op, RecordingClient};
    use anyhow::{anyhow, Result};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };
    use tokio::sync::mpsc;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    /// Hook which records its name and answers `handled`
    fn recording(log: &Log, name: &'static str, handled: EventHandled) -> impl crate::hooks::Hook {
        let log = log.clone();
        move |_ctx: Arc<EventContext>| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(name);
                Ok(handled)
            }
        }
    }

    fn counting(count: &Arc<AtomicUsize>) -> impl crate::hooks::Hook {
        let count = count.clone();
        move |_ctx: Arc<EventContext>| {
            let count = count.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(EventHandled::No)
            }
        }
    }

    async fn failing(_ctx: Arc<EventContext>) -> Result<EventHandled> {
        Err(anyhow!("hook exploded"))
    }

    fn raw() -> Event {
        Event::Raw {
            kind: "TypingStart".to_owned(),
            body: "{}".to_owned(),
        }
    }

    #[tokio::test]
    async fn sequential_dispatch_stops_at_the_first_handler() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());
        let log = Log::default();
        for (name, handled) in [
            ("a", EventHandled::No),
            ("b", EventHandled::Yes),
            ("c", EventHandled::No),
        ] {
            bot.hooks
                .register(EventName::Message, "test", name, recording(&log, name, handled))
                .await;
        }

        let ctx = testing::context(&bot, &client, message(member(20, "user", &[]), "hi"));
        let dispatched = bot.dispatch(EventName::Message, ctx).await;

        assert_eq!(dispatched.handled, EventHandled::Yes);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn sequential_failure_does_not_stop_later_hooks() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());
        let count = Arc::new(AtomicUsize::new(0));
        bot.hooks.register(EventName::MemberJoin, "test", "bad", failing).await;
        bot.hooks
            .register(EventName::MemberJoin, "test", "count", counting(&count))
            .await;

        let event = Event::MemberJoin {
            server: testing::server(),
            member: member(20, "newbie", &[]),
        };
        bot.on_event(client, event).await.join().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_failure_is_isolated_and_reported() {
        let bot = testing::bot();
        let client = Arc::new(RecordingClient::default());
        let count = Arc::new(AtomicUsize::new(0));
        let (errors_tx, mut errors) = mpsc::unbounded_channel();

        bot.hooks.register(EventName::Raw, "test", "bad", failing).await;
        bot.hooks
            .register(EventName::Raw, "test", "count", counting(&count))
            .await;
        bot.hooks
            .register(EventName::Error, "test", "collect", move |ctx: Arc<EventContext>| {
                let errors_tx = errors_tx.clone();
                async move {
                    if let Event::Error { source, description } = &ctx.event {
                        let _ = errors_tx.send((source.clone(), description.clone()));
                    }
                    Ok(EventHandled::No)
                }
            })
            .await;

        let dispatched = bot.on_event(client, raw()).await;
        assert_eq!(dispatched.tasks.len(), 2);
        dispatched.join().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        let (source, description) = errors.recv().await.unwrap();
        assert_eq!(source, "on_recv -> bad");
        assert_eq!(description, "hook exploded");
    }

    #[tokio::test]
    async fn failing_error_hooks_are_not_reported_again() {
        let bot = testing::bot();
        let client = Arc::new(RecordingClient::default());
        let count = Arc::new(AtomicUsize::new(0));
        bot.hooks.register(EventName::Raw, "test", "bad", failing).await;
        bot.hooks.register(EventName::Error, "test", "bad", failing).await;
        bot.hooks
            .register(EventName::Error, "test", "count", counting(&count))
            .await;

        bot.on_event(client, raw()).await.join().await;
        // Give the error hooks spawned by the failure a chance to run
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn catch_all_hooks_see_every_event() {
        let bot = testing::bot();
        let client = Arc::new(RecordingClient::default());
        let count = Arc::new(AtomicUsize::new(0));
        bot.hooks.register(HookTarget::All, "test", "all", counting(&count)).await;

        bot.on_event(client.clone(), raw()).await.join().await;
        let event = Event::MessageDelete {
            channel_id: testing::GENERAL,
            message_id: crate::model::MessageId(5),
            server_id: Some(testing::server().id),
            message: None,
        };
        bot.on_event(client, event).await.join().await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn catch_all_hooks_see_reported_failures() {
        let bot = testing::bot();
        let client = Arc::new(RecordingClient::default());
        let (sources_tx, mut sources) = mpsc::unbounded_channel();
        bot.hooks.register(EventName::Raw, "test", "bad", failing).await;
        bot.hooks
            .register(HookTarget::All, "test", "all", move |ctx: Arc<EventContext>| {
                let sources_tx = sources_tx.clone();
                async move {
                    if let Event::Error { source, .. } = &ctx.event {
                        let _ = sources_tx.send(source.clone());
                    }
                    Ok(EventHandled::No)
                }
            })
            .await;

        bot.on_event(client, raw()).await.join().await;

        assert_eq!(sources.recv().await.unwrap(), "on_recv -> bad");
    }

    #[tokio::test]
    async fn messages_are_ignored_until_plugins_load() {
        let bot = testing::bot();
        let client = Arc::new(RecordingClient::default());
        let msg = message(member(20, "user", &[]), "?info");

        assert_eq!(bot.on_message(client.clone(), msg).await, Delivery::NotLoaded);
        assert_eq!(bot.message_count(), 0);
        assert!(client.ops().is_empty());
    }

    #[tokio::test]
    async fn bots_are_halted_before_the_blacklist() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());
        let mut robot = member(20, "robot", &[]);
        robot.bot = true;

        assert_eq!(
            bot.on_message(client.clone(), message(robot, "?info")).await,
            Delivery::Halted
        );
        assert!(client.ops().is_empty());
        assert_eq!(bot.message_count(), 1);
    }

    #[tokio::test]
    async fn blacklists_stop_delivery() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());

        bot.store.add_to_set(GLOBAL_BLACKLIST, "20").await.unwrap();
        bot.store.add_to_set("blacklist:123", "21").await.unwrap();

        for id in [20, 21] {
            let msg = message(member(id, "user", &[]), "?info");
            assert_eq!(bot.on_message(client.clone(), msg).await, Delivery::Blacklisted);
        }
        let msg = message(member(22, "user", &[]), "?info");
        assert_eq!(bot.on_message(client.clone(), msg).await, Delivery::Delivered);
        assert_eq!(client.sent().len(), 1);
    }

    #[tokio::test]
    async fn direct_messages_get_a_refusal() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());

        let delivery = bot.on_message(client.clone(), dm(member(20, "user", &[]), "?info")).await;

        assert_eq!(delivery, Delivery::DirectMessage);
        assert_eq!(
            client.ops(),
            vec![Op::Send(testing::DM_CHANNEL, "I don't accept private messages.".to_owned())]
        );
    }

    #[tokio::test]
    async fn empty_messages_reach_no_hooks() {
        let bot = testing::loaded_bot().await;
        let client = Arc::new(RecordingClient::default());
        let count = Arc::new(AtomicUsize::new(0));
        bot.hooks
            .register(EventName::Message, "test", "count", counting(&count))
            .await;

        let delivery = bot.on_message(client, message(member(20, "user", &[]), "  ")).await;
        assert_eq!(delivery, Delivery::Empty);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ready_loads_plugins_once_and_runs_ready_hooks() {
        let bot = testing::bot();
        let client = Arc::new(RecordingClient::default());
        let me = member(99, "navalbot", &[]);

        bot.on_ready(client.clone(), me.clone(), 3).await.join().await;
        assert!(bot.is_loaded());
        assert!(bot.client().await.is_some());
        let commands = bot.commands.list().await.len();

        bot.on_ready(client.clone(), me, 3).await.join().await;
        assert_eq!(bot.commands.list().await.len(), commands);
        assert!(client
            .ops()
            .iter()
            .all(|op| matches!(op, Op::SetActivity(_))));
    }
}
