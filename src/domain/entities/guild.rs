use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::{ChannelId, GuildId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Voice,
    Category,
    Thread,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
    /// Category for regular channels, parent channel for threads.
    pub parent_id: Option<ChannelId>,
}

impl ChannelRef {
    pub fn new(id: impl Into<ChannelId>, name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<ChannelId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }
}

/// What the local cache currently knows about a guild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildSnapshot {
    pub id: GuildId,
    pub name: String,
    pub role_count: usize,
    pub member_count: usize,
    pub channels: Vec<ChannelRef>,
}

static CHANNEL_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<#(\d{15,20})>$").expect("valid channel mention regex"));

impl GuildSnapshot {
    pub fn new(id: impl Into<GuildId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// A guild is only usable once every cache it depends on has been filled.
    pub fn is_cache_populated(&self) -> bool {
        self.role_count > 0 && self.member_count > 0 && !self.channels.is_empty()
    }

    pub fn channel(&self, id: ChannelId) -> Option<&ChannelRef> {
        self.channels.iter().find(|c| c.id == id)
    }

    pub fn has_channel(&self, id: ChannelId) -> bool {
        self.channel(id).is_some()
    }

    /// Convert a user-supplied argument (mention, id or name) into one of
    /// this guild's channels of the accepted kinds.
    pub fn find_channel(&self, argument: &str, kinds: &[ChannelKind]) -> Option<&ChannelRef> {
        let argument = argument.trim();
        let by_id = CHANNEL_MENTION
            .captures(argument)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .or_else(|| argument.chars().all(|c| c.is_ascii_digit()).then_some(argument))
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(ChannelId);

        let name = argument.trim_start_matches('#');
        self.channels
            .iter()
            .filter(|c| kinds.contains(&c.kind))
            .find(|c| match by_id {
                Some(id) => c.id == id,
                None => c.name.eq_ignore_ascii_case(name),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild() -> GuildSnapshot {
        let mut guild = GuildSnapshot::new(1u64, "test");
        guild.channels = vec![
            ChannelRef::new(111_111_111_111_111_111u64, "general", ChannelKind::Text),
            ChannelRef::new(222_222_222_222_222_222u64, "Lounge", ChannelKind::Voice),
            ChannelRef::new(333_333_333_333_333_333u64, "staff", ChannelKind::Category),
        ];
        guild
    }

    #[test]
    fn test_find_channel_by_mention_id_and_name() {
        let guild = guild();
        let kinds = [ChannelKind::Text, ChannelKind::Voice];

        let mention = guild.find_channel("<#111111111111111111>", &kinds);
        assert_eq!(mention.map(|c| c.name.as_str()), Some("general"));

        let raw = guild.find_channel("222222222222222222", &kinds);
        assert_eq!(raw.map(|c| c.name.as_str()), Some("Lounge"));

        let named = guild.find_channel("#lounge", &kinds);
        assert_eq!(named.map(|c| c.kind), Some(ChannelKind::Voice));
    }

    #[test]
    fn test_find_channel_respects_kinds() {
        let guild = guild();
        assert!(guild.find_channel("staff", &[ChannelKind::Text]).is_none());
        assert!(guild.find_channel("15", &[ChannelKind::Text]).is_none());
    }

    #[test]
    fn test_cache_populated_needs_roles_members_and_channels() {
        let mut guild = guild();
        assert!(!guild.is_cache_populated());
        guild.role_count = 3;
        assert!(!guild.is_cache_populated());
        guild.member_count = 10;
        assert!(guild.is_cache_populated());
        guild.channels.clear();
        assert!(!guild.is_cache_populated());
    }
}
