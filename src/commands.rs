//! Prefixed chat commands.
//!
//! A message resolves to a command by its first word after the prefix, matched exactly against
//! command names and aliases.  The rest of the line is split with shell quoting rules.  Before
//! the handler runs, the invocation passes the gating steps in a fixed order:
//!
//! ```text
//! RECEIVED -> PREFIX_MATCHED -> RESOLVED -> ARG_CHECKED -> AUTHORIZED -> EXECUTED
//! ```
//!
//! Too few arguments, a non-owner calling an owner-only command, and missing roles each end
//! the invocation with a reply in the channel.  The handler is never called in those cases.

use crate::{
    bot::Bot,
    context::{CommandContext, EventContext},
    error::{RegistryError, UserError},
    locale::Locale,
    log_error, log_internal,
    model::Message,
    permissions::is_authorized,
};
use anyhow::Result;
use std::{
    collections::{HashMap, HashSet},
    fmt,
    future::Future,
    sync::Arc,
};
use tokio::sync::RwLock;

#[serenity::async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, ctx: CommandContext) -> Result<()>;
}

/// Plain `async fn(CommandContext) -> Result<()>` functions are command handlers.
#[serenity::async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(CommandContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn call(&self, ctx: CommandContext) -> Result<()> {
        (self)(ctx).await
    }
}

/// Who may run a command
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Gate {
    Open,
    /// Members holding any of these roles, plus the per-server overrides
    Roles(HashSet<String>),
    /// Only the configured bot owner
    Owner,
}

pub struct Command {
    pub name: String,
    pub aliases: Vec<String>,
    pub gate: Gate,
    pub min_args: usize,
    /// Reply when fewer than `min_args` arguments are given
    pub arg_error: Option<String>,
    pub help: String,
    /// Plugin which registered the command.  Filled in on registration.
    pub plugin: &'static str,
    handler: Arc<dyn CommandHandler>,
}

impl Command {
    pub fn new(name: &str, handler: impl CommandHandler + 'static) -> Self {
        Self {
            name: name.to_owned(),
            aliases: Vec::new(),
            gate: Gate::Open,
            min_args: 0,
            arg_error: None,
            help: String::new(),
            plugin: "",
            handler: Arc::new(handler),
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_owned());
        self
    }

    pub fn roles(mut self, roles: &[&str]) -> Self {
        self.gate = Gate::Roles(roles.iter().map(|role| role.to_string()).collect());
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.gate = Gate::Owner;
        self
    }

    pub fn min_args(mut self, count: usize) -> Self {
        self.min_args = count;
        self
    }

    pub fn arg_error(mut self, reply: &str) -> Self {
        self.arg_error = Some(reply.to_owned());
        self
    }

    pub fn help(mut self, text: &str) -> Self {
        self.help = text.to_owned();
        self
    }

    /// Primary name followed by the aliases
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    fn rejection_reply(&self, rejection: Rejection, locale: &Locale) -> String {
        match rejection {
            Rejection::TooFewArgs => match &self.arg_error {
                Some(reply) => reply.clone(),
                None => locale.format(
                    "generic.not_enough_args",
                    &[
                        ("command", &self.name),
                        ("count", &self.min_args.to_string()),
                    ],
                ),
            },
            Rejection::NotOwner => locale.format("generic.not_owner", &[("command", &self.name)]),
            Rejection::Forbidden => locale.format("generic.forbidden", &[("command", &self.name)]),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("gate", &self.gate)
            .field("min_args", &self.min_args)
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}

/// Why an invocation was turned down before reaching its handler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    TooFewArgs,
    NotOwner,
    Forbidden,
}

/// How an invocation ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Executed,
    /// The handler ran and answered with a `UserError`
    UserError,
    /// The handler ran and failed unexpectedly
    Failed,
    Rejected(Rejection),
}

pub enum Resolution {
    /// Not a command at all
    NotFound,
    Found(Invocation),
    /// A known command, but its arguments could not be split
    Malformed(Arc<Command>),
}

pub struct Invocation {
    pub command: Arc<Command>,
    pub args: Vec<String>,
}

impl Invocation {
    /// Run the gating steps in order: argument count, owner, roles.
    pub async fn check(&self, bot: &Bot, message: &Message) -> Result<(), Rejection> {
        let command = &self.command;

        if self.args.len() < command.min_args {
            return Err(Rejection::TooFewArgs);
        }

        match &command.gate {
            Gate::Open => Ok(()),
            Gate::Owner if bot.is_owner(message.author.id).await => Ok(()),
            Gate::Owner => Err(Rejection::NotOwner),
            Gate::Roles(roles) => {
                let Some(server) = &message.server else {
                    return Err(Rejection::Forbidden);
                };
                if is_authorized(
                    bot.store.as_ref(),
                    &message.author,
                    server,
                    roles,
                    &command.name,
                )
                .await
                {
                    Ok(())
                } else {
                    Err(Rejection::Forbidden)
                }
            }
        }
    }

    /// Gate, then call the handler exactly once.  Never fails: rejections and user errors are
    /// answered in the channel, handler failures are reported.
    pub async fn run(self, event: Arc<EventContext>, message: Message) -> Outcome {
        let channel = message.channel.id;

        if let Err(rejection) = self.check(&event.bot, &message).await {
            let reply = self.command.rejection_reply(rejection, &event.locale);
            if let Err(err) = event.client.send_message(channel, &reply).await {
                log_error!("Could not send rejection for `{}`: {:#}", self.command.name, err);
            }
            return Outcome::Rejected(rejection);
        }

        let command = self.command;
        let ctx = CommandContext {
            event: event.clone(),
            message,
            command: command.name.clone(),
            args: self.args,
        };

        let Err(err) = command.handler.call(ctx).await else {
            return Outcome::Executed;
        };

        if let Some(user_error) = err.downcast_ref::<UserError>() {
            if let Err(err) = event.client.send_message(channel, &user_error.0).await {
                log_error!("Could not reply to `{}`: {:#}", command.name, err);
            }
            return Outcome::UserError;
        }

        event
            .bot
            .report_failure(&event, &format!("command -> {}", command.name), &err)
            .await;
        Outcome::Failed
    }
}

/// Every command name and alias, mapped to its command
#[derive(Default)]
pub struct CommandRegistry {
    names: RwLock<HashMap<String, Arc<Command>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a command, replacing an earlier registration of the same primary name by the same
    /// plugin.  Fails without changing anything if a name or alias belongs to a different command
    /// or to another plugin.
    pub async fn register(&self, plugin: &'static str, mut command: Command) -> Result<(), RegistryError> {
        command.plugin = plugin;

        let mut names = self.names.write().await;
        for name in command.names() {
            if let Some(existing) = names.get(name) {
                if existing.name != command.name || existing.plugin != plugin {
                    return Err(RegistryError::DuplicateName {
                        name: name.to_owned(),
                        owner: existing.name.clone(),
                    });
                }
            }
        }

        // Drop aliases of the previous registration, they may have changed
        names.retain(|_, existing| existing.name != command.name);

        let command = Arc::new(command);
        for name in command.names() {
            names.insert(name.to_owned(), command.clone());
        }
        log_internal!("Registered command `{}` ({})", command.name, plugin);

        Ok(())
    }

    /// Remove a command and all its aliases, given any of its names
    pub async fn unregister(&self, name: &str) -> bool {
        let mut names = self.names.write().await;
        let Some(primary) = names.get(name).map(|command| command.name.clone()) else {
            return false;
        };
        names.retain(|_, command| command.name != primary);
        true
    }

    /// Drop every command of a plugin.  Returns how many were removed.
    pub async fn unregister_plugin(&self, plugin: &str) -> usize {
        let mut names = self.names.write().await;
        let removed: HashSet<String> = names
            .values()
            .filter(|command| command.plugin == plugin)
            .map(|command| command.name.clone())
            .collect();
        names.retain(|_, command| command.plugin != plugin);
        removed.len()
    }

    pub async fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.names.read().await.get(name).cloned()
    }

    /// Every command once, sorted by name
    pub async fn list(&self) -> Vec<Arc<Command>> {
        let names = self.names.read().await;
        let mut commands: Vec<Arc<Command>> = names
            .iter()
            .filter(|(name, command)| **name == command.name)
            .map(|(_, command)| command.clone())
            .collect();
        commands.sort_by(|a, b| a.name.cmp(&b.name));
        commands
    }

    /// Resolve text which already had the prefix removed
    pub async fn lookup(&self, text: &str) -> Resolution {
        let text = text.trim_start();
        let (head, rest) = text
            .split_once(char::is_whitespace)
            .unwrap_or((text, ""));
        if head.is_empty() {
            return Resolution::NotFound;
        }

        let Some(command) = self.get(head).await else {
            return Resolution::NotFound;
        };

        match shlex::split(rest) {
            Some(args) => Resolution::Found(Invocation { command, args }),
            None => Resolution::Malformed(command),
        }
    }

    /// Resolve a raw message.  Text without the prefix is not a command.
    pub async fn resolve(&self, prefix: &str, text: &str) -> Resolution {
        match text.strip_prefix(prefix) {
            Some(rest) if !prefix.is_empty() => self.lookup(rest).await,
            _ => Resolution::NotFound,
        }
    }
}
