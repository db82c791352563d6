//! Formatting helpers for messages and log lines

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};

use crate::application::errors::PlatformError;
use crate::domain::entities::{ChannelKind, ChannelRef, GuildSnapshot, Message, User};

static CLYDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(clyd)(e)").expect("valid clyde regex"));

/// Replace the "e" of any "clyde" in `username` with a Cyrillic "е" (or "Е").
///
/// Discord rejects webhook usernames containing "clyde".
pub fn sub_clyde(username: &str) -> String {
    CLYDE
        .replace_all(username, |caps: &Captures<'_>| {
            let e = if &caps[2] == "e" { "\u{0435}" } else { "\u{0415}" };
            format!("{}{}", &caps[1], e)
        })
        .into_owned()
}

/// Mention plus id, e.g. ``<@123> (`123`)``.
pub fn format_user(user: &User) -> String {
    format!("{} (`{}`)", user.mention(), user.id)
}

/// Mention plus location, e.g. `<#1> (Staff/#general)`; threads also show their parent.
pub fn format_channel(guild: &GuildSnapshot, channel: &ChannelRef) -> String {
    let parent = match channel.kind {
        ChannelKind::Thread => channel.parent_id.and_then(|id| guild.channel(id)),
        _ => None,
    };
    let category_id = match parent {
        Some(parent) => parent.parent_id,
        None => channel.parent_id,
    };
    let category = category_id
        .and_then(|id| guild.channel(id))
        .map(|c| c.name.as_str())
        .unwrap_or("None");

    let mut formatted = format!("{} ({}/#{}", channel.id.mention(), category, channel.name);
    if let Some(parent) = parent {
        formatted.push('/');
        formatted.push_str(&parent.name);
    }
    formatted.push(')');
    formatted
}

/// Log and swallow a 403 caused by the user blocking the bot. Returns
/// false when `error` is anything else and still needs handling.
pub fn handle_forbidden_from_block(error: &PlatformError, message: Option<&Message>) -> bool {
    if !error.is_blocked_by_user() {
        return false;
    }

    match message {
        Some(message) => tracing::info!(
            "Failed to send message to {} ({}) in channel {}: they have blocked the bot",
            message.author,
            message.author.user.id,
            message.channel_id
        ),
        None => tracing::info!("Failed to send message: the recipient has blocked the bot"),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::BLOCKED_BY_USER;

    #[test]
    fn test_sub_clyde_keeps_case() {
        assert_eq!(sub_clyde("Clyde"), "Clyd\u{0435}");
        assert_eq!(sub_clyde("CLYDE bot"), "CLYD\u{0415} bot");
        assert_eq!(sub_clyde("not clyd"), "not clyd");
    }

    #[test]
    fn test_format_user() {
        let user = User::new(42u64, "someone");
        assert_eq!(format_user(&user), "<@42> (`42`)");
    }

    #[test]
    fn test_format_channel_with_thread_parent() {
        let mut guild = GuildSnapshot::new(1u64, "guild");
        guild.channels = vec![
            ChannelRef::new(10u64, "Staff", ChannelKind::Category),
            ChannelRef::new(11u64, "general", ChannelKind::Text).with_parent(10u64),
            ChannelRef::new(12u64, "bugs", ChannelKind::Thread).with_parent(11u64),
        ];

        assert_eq!(format_channel(&guild, &guild.channels[1]), "<#11> (Staff/#general)");
        assert_eq!(format_channel(&guild, &guild.channels[2]), "<#12> (Staff/#bugs/general)");
    }

    #[test]
    fn test_only_blocks_are_swallowed() {
        assert!(handle_forbidden_from_block(
            &PlatformError::http(403, Some(BLOCKED_BY_USER), "blocked"),
            None
        ));
        assert!(!handle_forbidden_from_block(&PlatformError::http(403, Some(50001), "no access"), None));
    }
}
