//! Serenity hands us one callback per gateway event.  The hook registry instead works on named
//! events, so callbacks are translated into an `Event` payload plus the `EventName` hooks are
//! registered under.

use crate::model::{ChannelId, Member, Message, MessageId, Server, ServerId};
use std::fmt;

/// Names hooks can be registered under
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventName {
    Ready,
    /// Runs before blacklist checks.  Any hook here may end processing of the message.
    MessageBeforeBlacklist,
    Message,
    MessageDelete,
    MessageEdit,
    MemberJoin,
    /// Every raw gateway payload
    Raw,
    /// Failures of other hooks
    Error,
}

/// How the hooks of one event are run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// Awaited one after the other in registration order; `EventHandled::Yes` stops the rest.
    Sequential,
    /// Each hook spawned as its own task.
    Concurrent,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::Ready => "on_ready",
            EventName::MessageBeforeBlacklist => "on_message_before_blacklist",
            EventName::Message => "on_message",
            EventName::MessageDelete => "on_message_delete",
            EventName::MessageEdit => "on_message_edit",
            EventName::MemberJoin => "on_member_join",
            EventName::Raw => "on_recv",
            EventName::Error => "on_error",
        }
    }

    pub fn mode(&self) -> DispatchMode {
        match self {
            EventName::Raw | EventName::Error => DispatchMode::Concurrent,
            _ => DispatchMode::Sequential,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook is registered against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookTarget {
    Event(EventName),
    /// Receives every inbound gateway event and every reported failure
    All,
}

impl From<EventName> for HookTarget {
    fn from(name: EventName) -> Self {
        HookTarget::Event(name)
    }
}

impl fmt::Display for HookTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HookTarget::Event(name) => name.fmt(f),
            HookTarget::All => f.write_str("*"),
        }
    }
}

/// A Discord event
#[derive(Clone, Debug)]
pub enum Event {
    Ready {
        user: Member,
        servers: usize,
    },
    Message(Message),
    MessageDelete {
        channel_id: ChannelId,
        message_id: MessageId,
        server_id: Option<ServerId>,
        /// Only available if the message was still cached
        message: Option<Message>,
    },
    MessageEdit {
        before: Option<Message>,
        after: Message,
    },
    MemberJoin {
        server: Server,
        member: Member,
    },
    Raw {
        kind: String,
        body: String,
    },
    Error {
        /// `event -> hook` that failed
        source: String,
        description: String,
    },
}

impl Event {
    /// A raw gateway payload from its `Debug` text.  The kind is the leading variant name, e.g.
    /// `TypingStart` for `TypingStart(TypingStartEvent { .. })`.
    pub fn raw(body: String) -> Self {
        let end = body
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(body.len());
        let kind = match &body[..end] {
            "" => "Unknown".to_owned(),
            kind => kind.to_owned(),
        };
        Event::Raw { kind, body }
    }

    pub fn name(&self) -> EventName {
        match self {
            Event::Ready { .. } => EventName::Ready,
            Event::Message(_) => EventName::Message,
            Event::MessageDelete { .. } => EventName::MessageDelete,
            Event::MessageEdit { .. } => EventName::MessageEdit,
            Event::MemberJoin { .. } => EventName::MemberJoin,
            Event::Raw { .. } => EventName::Raw,
            Event::Error { .. } => EventName::Error,
        }
    }

    /// The message this event is about, if any
    pub fn message(&self) -> Option<&Message> {
        match self {
            Event::Message(msg) => Some(msg),
            Event::MessageEdit { after, .. } => Some(after),
            Event::MessageDelete { message, .. } => message.as_ref(),
            _ => None,
        }
    }

    pub fn server_id(&self) -> Option<ServerId> {
        match self {
            Event::MessageDelete { server_id, .. } => *server_id,
            Event::MemberJoin { server, .. } => Some(server.id),
            _ => self.message().and_then(Message::server_id),
        }
    }

    /// Where replies to this event go
    pub fn channel_id(&self) -> Option<ChannelId> {
        match self {
            Event::MessageDelete { channel_id, .. } => Some(*channel_id),
            _ => self.message().map(|msg| msg.channel.id),
        }
    }
}

/// Result of a hook.  `Yes` means the event has been dealt with and, in sequential dispatch, no
/// further hooks should see it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventHandled {
    Yes,
    No,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    #[allow(dead_code)]
    struct TypingStartEvent {
        channel_id: u64,
    }

    #[derive(Debug)]
    #[allow(dead_code)]
    enum Gateway {
        TypingStart(TypingStartEvent),
        Resumed,
    }

    fn kind(event: &Event) -> &str {
        match event {
            Event::Raw { kind, .. } => kind,
            _ => panic!("not a raw event"),
        }
    }

    #[test]
    fn raw_kind_is_the_variant_name() {
        let typing = Event::raw(format!("{:?}", Gateway::TypingStart(TypingStartEvent { channel_id: 5 })));
        assert_eq!(typing.name(), EventName::Raw);
        assert_eq!(kind(&typing), "TypingStart");
        assert_eq!(kind(&Event::raw(format!("{:?}", Gateway::Resumed))), "Resumed");
        assert_eq!(kind(&Event::raw(String::new())), "Unknown");
    }

    #[test]
    fn raw_body_keeps_the_payload() {
        let event = Event::raw(format!("{:?}", Gateway::TypingStart(TypingStartEvent { channel_id: 5 })));
        let Event::Raw { body, .. } = event else {
            panic!("not a raw event");
        };
        assert_eq!(body, "TypingStart(TypingStartEvent { channel_id: 5 })");
    }
}
