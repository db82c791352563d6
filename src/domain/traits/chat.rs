use async_trait::async_trait;

use crate::application::errors::PlatformError;
use crate::domain::entities::{ChannelId, GuildId, GuildSnapshot, MessageId, OutgoingMessage, UserId};

/// Where a set of application commands is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    Global,
    Guild(GuildId),
}

/// A string option of an application command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCommandOption {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// Registration payload for one application command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCommandSpec {
    pub name: String,
    pub description: String,
    pub options: Vec<AppCommandOption>,
}

/// ChatClient trait - abstraction over the chat platform client library
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Id of the bot's own user, once known.
    fn current_user_id(&self) -> Option<UserId>;

    /// Snapshot of a guild from the local cache.
    fn guild(&self, guild_id: GuildId) -> Option<GuildSnapshot>;

    async fn send_message(
        &self,
        channel_id: ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageId, PlatformError>;

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), PlatformError>;

    /// Show the typing indicator.
    async fn trigger_typing(&self, channel_id: ChannelId) -> Result<(), PlatformError>;

    /// Allow or deny `@everyone` sending (and speaking) in a channel.
    /// Returns false when the channel was already in the requested state.
    async fn set_send_permission(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        allow: bool,
    ) -> Result<bool, PlatformError>;

    /// Disconnect everyone from a voice channel, returning how many were moved.
    async fn disconnect_voice_members(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<usize, PlatformError>;

    /// Replace the application commands registered in `scope`.
    async fn sync_app_commands(
        &self,
        scope: SyncScope,
        commands: Vec<AppCommandSpec>,
    ) -> Result<usize, PlatformError>;

    /// Close the gateway connection.
    async fn close(&self);
}
