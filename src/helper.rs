//! Miscellaneous convenience methods

use crate::model::Message;
use std::{collections::HashMap, time::Duration};

pub trait MessageHelper {
    fn human_format_content(&self) -> String;
}

impl MessageHelper for Message {
    /// Convert discord-formatted message content, which may contain non-user-friendly markup, to a
    /// human-friendly format.  User mentions become per-server display names.
    fn human_format_content(&self) -> String {
        let mut content = self.content.clone();

        // Create a mapping from mention strings to their names
        let mut mention_map: HashMap<String, String> = HashMap::new();
        for member in &self.mentions {
            let name = format!("@{}", member.display_name);
            mention_map.insert(format!("<@!{}>", member.id), name.clone());
            mention_map.insert(format!("<@{}>", member.id), name);
        }

        for (mention, name) in mention_map {
            content = content.replace(&mention, &name);
        }

        content
    }
}

/// `1d 2h 3m 4s`, leaving out leading zero units
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        secs % 86_400 / 3_600,
        secs % 3_600 / 60,
        secs % 60,
    );

    match (days, hours, minutes) {
        (0, 0, 0) => format!("{}s", seconds),
        (0, 0, _) => format!("{}m {}s", minutes, seconds),
        (0, _, _) => format!("{}h {}m {}s", hours, minutes, seconds),
        _ => format!("{}d {}h {}m {}s", days, hours, minutes, seconds),
    }
}

/// Printable ASCII to its fullwidth form.  Everything else is kept.
pub fn fullwidth(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '!'..='~' => char::from_u32(c as u32 + 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}
