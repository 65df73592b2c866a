use crate::{
    bot::Bot,
    client::ChatClient,
    error::UserError,
    event::Event,
    locale::Locale,
    model::{Member, Message, Server},
};
use anyhow::{anyhow, Result};
use std::sync::Arc;

/// Everything a hook gets to see for one dispatch.  Built fresh for every inbound event and
/// shared read-only between the hooks of that dispatch.
pub struct EventContext {
    pub bot: Arc<Bot>,
    /// Connection the event arrived on
    pub client: Arc<dyn ChatClient>,
    pub event: Event,
    /// Locale of the server the event happened in
    pub locale: Arc<Locale>,
}

impl EventContext {
    pub fn new(
        bot: Arc<Bot>,
        client: Arc<dyn ChatClient>,
        event: Event,
        locale: Arc<Locale>,
    ) -> Self {
        Self {
            bot,
            client,
            event,
            locale,
        }
    }

    /// Same bot, client and locale, different payload
    pub fn with_event(&self, event: Event) -> Self {
        Self::new(
            self.bot.clone(),
            self.client.clone(),
            event,
            self.locale.clone(),
        )
    }

    pub fn message(&self) -> Option<&Message> {
        self.event.message()
    }

    pub async fn send(&self, text: &str) -> Result<()> {
        let channel = self
            .event
            .channel_id()
            .ok_or_else(|| anyhow!("No channel to reply to for {}", self.event.name()))?;
        self.client.send_message(channel, text).await
    }

    /// Format a locale template and send it to the channel the event came from
    pub async fn reply(&self, key: &str, args: &[(&str, &str)]) -> Result<String> {
        let text = self.locale.format(key, args);
        self.send(&text).await?;
        Ok(text)
    }
}

/// A message that resolved to a command, with its parsed arguments
pub struct CommandContext {
    pub event: Arc<EventContext>,
    pub message: Message,
    /// Primary name of the invoked command
    pub command: String,
    pub args: Vec<String>,
}

impl CommandContext {
    pub fn bot(&self) -> &Arc<Bot> {
        &self.event.bot
    }

    pub fn client(&self) -> &dyn ChatClient {
        self.event.client.as_ref()
    }

    pub fn locale(&self) -> &Locale {
        &self.event.locale
    }

    pub fn author(&self) -> &Member {
        &self.message.author
    }

    /// Server the command was sent in.  Direct messages never reach commands.
    pub fn server(&self) -> Result<&Server> {
        self.message
            .server
            .as_ref()
            .ok_or_else(|| self.user_error("generic.no_dm", &[]))
    }

    /// Arguments joined back into free text
    pub fn text(&self) -> String {
        self.args.join(" ")
    }

    /// Message text after the command word, unsplit
    pub fn rest(&self) -> &str {
        self.message
            .content
            .trim_start()
            .split_once(char::is_whitespace)
            .map_or("", |(_, rest)| rest.trim())
    }

    /// A user-facing error with a formatted locale template
    pub fn user_error(&self, key: &str, args: &[(&str, &str)]) -> anyhow::Error {
        UserError::new(self.locale().format(key, args)).into()
    }

    pub async fn send(&self, text: &str) -> Result<()> {
        self.client()
            .send_message(self.message.channel.id, text)
            .await
    }

    pub async fn reply(&self, key: &str, args: &[(&str, &str)]) -> Result<String> {
        let text = self.locale().format(key, args);
        self.send(&text).await?;
        Ok(text)
    }

    /// The first mentioned user, or else the member named by the arguments
    pub async fn get_user(&self) -> Option<Member> {
        if let Some(mentioned) = self.message.mentions.first() {
            return Some(mentioned.clone());
        }
        if self.args.is_empty() {
            return None;
        }
        let server = self.message.server_id()?;
        self.client().member_named(server, &self.text()).await
    }
}
