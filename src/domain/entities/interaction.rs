use super::{Author, ChannelId, GuildId, MessageId, OutgoingMessage};

/// An application (slash) command invocation.
#[derive(Debug, Clone)]
pub struct AppInteraction {
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub user: Author,
    pub command_name: String,
    pub options: Vec<(String, String)>,
}

impl AppInteraction {
    pub fn new(channel_id: impl Into<ChannelId>, user: Author, command_name: impl Into<String>) -> Self {
        Self {
            guild_id: None,
            channel_id: channel_id.into(),
            user,
            command_name: command_name.into(),
            options: Vec::new(),
        }
    }

    pub fn in_guild(mut self, guild_id: impl Into<GuildId>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((name.into(), value.into()));
        self
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A button press on one of the bot's messages.
#[derive(Debug, Clone)]
pub struct ComponentInteraction {
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user: Author,
    pub custom_id: String,
}

/// Response to an interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionReply {
    pub message: OutgoingMessage,
    /// Only visible to the user who interacted.
    pub ephemeral: bool,
}

impl InteractionReply {
    pub fn public(message: OutgoingMessage) -> Self {
        Self {
            message,
            ephemeral: false,
        }
    }

    pub fn ephemeral(message: OutgoingMessage) -> Self {
        Self {
            message,
            ephemeral: true,
        }
    }
}
