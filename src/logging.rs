//! Logging to the terminal with colors

use crate::model::{Channel, Member, Message, Server};
use std::io::IsTerminal;
use std::sync::LazyLock;

const DEFAULT: &str = "\x1b[0m";
const FG_BLUE: &str = "\x1b[38;5;33m";
const FG_CYAN: &str = "\x1b[36m";
const FG_GRAY: &str = "\x1b[90m";
const FG_GREEN: &str = "\x1b[32m";
const FG_MAGENTA: &str = "\x1b[35m";
const FG_RED: &str = "\x1b[31m";
const FG_YELLOW: &str = "\x1b[33m";

pub enum Color {
    Default,
    Event,
    Internal,
    Error,
    User,
    Channel,
    Server,
    Glue,
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // Plain text when redirected to a file
        static STDOUT_IS_TERMINAL: LazyLock<bool> =
            LazyLock::new(|| std::io::stdout().is_terminal());

        if !*STDOUT_IS_TERMINAL {
            return Ok(());
        }

        write!(
            f,
            "{}",
            match self {
                Color::Default => DEFAULT,
                Color::Event => FG_YELLOW,
                Color::Internal => FG_MAGENTA,
                Color::Error => FG_RED,
                Color::User => FG_GREEN,
                Color::Channel => FG_CYAN,
                Color::Server => FG_BLUE,
                Color::Glue => FG_GRAY,
            }
        )
    }
}

/// One log line: a colored marker, then the message.  Use the `log_*` macros below.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_line {
    ($print:ident, $marker:literal, $color:ident, $fmtstr:expr $(, $args:expr)* $(,)?) => {{
        $print!(
            concat!("{}", $marker, "{} ", $fmtstr),
            $crate::logging::Color::$color,
            $crate::logging::Color::Default
            $(, $args)*
        )
    }};
}

/// Something happened on the chat service
#[macro_export]
macro_rules! log_event {
    ($($line:tt)+) => { $crate::__log_line!(println, "*", Event, $($line)+) };
}

/// Something happened inside the bot
#[macro_export]
macro_rules! log_internal {
    ($($line:tt)+) => { $crate::__log_line!(println, "+", Internal, $($line)+) };
}

/// System errors only.  Mistakes by users are answered in the channel, not logged here.
#[macro_export]
macro_rules! log_error {
    ($($line:tt)+) => { $crate::__log_line!(eprintln, "!", Error, $($line)+) };
}

pub trait PrintColor {
    fn color(&self) -> String;
}

// Field separator
pub struct Glue;
impl PrintColor for Glue {
    fn color(&self) -> String {
        format!("{}{}{}", Color::Glue, ":", Color::Default)
    }
}

impl PrintColor for Member {
    fn color(&self) -> String {
        let bot = if self.bot { " [BOT]" } else { "" };
        format!("{}{}{}{}", Color::User, self.display_name, bot, Color::Default)
    }
}

impl PrintColor for Channel {
    fn color(&self) -> String {
        let name = if self.name.is_empty() {
            "<direct-message>"
        } else {
            self.name.as_str()
        };
        format!("{}#{}{}", Color::Channel, name, Color::Default)
    }
}

impl PrintColor for Server {
    fn color(&self) -> String {
        format!("{}{}{}", Color::Server, self.name, Color::Default)
    }
}

impl PrintColor for Option<Server> {
    fn color(&self) -> String {
        match self {
            Some(server) => server.color(),
            None => format!("{}<direct-message>{}", Color::Server, Color::Default),
        }
    }
}

/// `server:#channel:author` prefix for a message
impl PrintColor for Message {
    fn color(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.server.color(),
            Glue.color(),
            self.channel.color(),
            Glue.color(),
            self.author.color(),
        )
    }
}
